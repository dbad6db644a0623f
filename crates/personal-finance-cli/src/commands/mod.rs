pub mod debt;
pub mod investment;
pub mod taxes;

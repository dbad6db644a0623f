pub mod tables;
pub mod withholding;

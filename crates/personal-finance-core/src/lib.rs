pub mod error;
pub mod rounding;
pub mod time_value;
pub mod types;
pub mod validation;

#[cfg(feature = "debt")]
pub mod debt;

#[cfg(feature = "investment")]
pub mod investment;

#[cfg(feature = "taxes")]
pub mod taxes;

pub use error::FinanceError;
pub use types::*;
pub use validation::{FieldError, ValidationErrors};

/// Standard result type for all personal-finance operations
pub type FinanceResult<T> = Result<T, FinanceError>;

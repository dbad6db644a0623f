//! Field-keyed input validation.
//!
//! Entry points collect every violated rule before computing anything, so a
//! form can highlight all offending fields at once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FinanceError;
use crate::FinanceResult;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// Ordered collection of field errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// First reason recorded against `field`, if any.
    pub fn reason_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.reason.as_str())
    }

    /// `value > 0`
    pub fn positive(&mut self, field: &str, label: &str, value: Decimal) {
        if value <= Decimal::ZERO {
            self.push(field, format!("{label} must be positive"));
        }
    }

    /// `value >= 0`
    pub fn non_negative(&mut self, field: &str, label: &str, value: Decimal) {
        if value < Decimal::ZERO {
            self.push(field, format!("{label} must be non-negative"));
        }
    }

    /// `value <= max`
    pub fn at_most(&mut self, field: &str, label: &str, value: Decimal, max: Decimal) {
        if value > max {
            self.push(field, format!("{label} must be at most {max}"));
        }
    }

    /// `min <= value <= max` for whole-number counts.
    pub fn within(&mut self, field: &str, label: &str, value: u32, min: u32, max: u32) {
        if value < min || value > max {
            self.push(field, format!("{label} must be between {min} and {max}"));
        }
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> FinanceResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FinanceError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field, e.reason)?;
        }
        Ok(())
    }
}

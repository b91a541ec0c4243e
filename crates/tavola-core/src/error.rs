//! # Error Types
//!
//! Domain-specific error types for tavola-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tavola-core errors (this file)                                        │
//! │  ├── CoreError          - Domain rule violations                       │
//! │  ├── ValidationError    - One invalid field                            │
//! │  └── ValidationErrors   - Every invalid field of one payload           │
//! │                                                                         │
//! │  tavola-db errors (separate crate)                                     │
//! │  └── DbError            - Database operation failures                  │
//! │                                                                         │
//! │  HTTP errors (in apps/api)                                             │
//! │  └── ApiError           - {"detail": {"message", "code"}}              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → 4xx JSON               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// One or more products referenced by an order are missing.
    ///
    /// ## When This Occurs
    /// - A client submits an order with a stale or made-up product id
    /// - A product was deleted between browsing and checkout
    ///
    /// The ids are kept sorted so the message is stable.
    #[error("Products with ids '{{{}}}' do not exist.", join_ids(.ids))]
    ProductsDoNotExist { ids: Vec<i64> },

    /// An order total does not fit in `i64` cents.
    #[error("Order total exceeds the supported amount.")]
    TotalOverflow,

    /// Payload failed field validation.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(ValidationErrors::from(err))
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} must not be empty")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be greater than 0")]
    MustBePositive { field: String },

    /// Malformed value (email, phone number, base64 ...).
    #[error("{reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two order lines name the same product.
    #[error("Order items must be unique.")]
    DuplicateOrderItems,

    /// A sort key outside the entity's allow-list.
    #[error("Sort field '{value}' is not allowed. Allowed: {allowed}.")]
    SortFieldNotAllowed { value: String, allowed: String },
}

impl ValidationError {
    /// Name of the offending field, as it appears in the request.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. } => field,
            ValidationError::DuplicateOrderItems => "order_items",
            ValidationError::SortFieldNotAllowed { .. } => "sort",
        }
    }
}

// =============================================================================
// Validation Errors (collection)
// =============================================================================

/// All invalid fields of one payload, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    /// Records the error of a failed check; passes over `Ok`.
    pub fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(err) = result {
            self.0.push(err);
        }
    }

    /// Same as [`check`](Self::check) with the field name rewritten,
    /// for checks on nested payloads (`delivery_address.city`).
    pub fn check_nested(&mut self, prefix: &str, result: Result<(), ValidationErrors>) {
        if let Err(errors) = result {
            for err in errors.0 {
                self.0.push(prefix_field(prefix, err));
            }
        }
    }

    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn prefix_field(prefix: &str, err: ValidationError) -> ValidationError {
    let nest = |field: String| format!("{}.{}", prefix, field);
    match err {
        ValidationError::Required { field } => ValidationError::Required { field: nest(field) },
        ValidationError::TooShort { field, min } => ValidationError::TooShort {
            field: nest(field),
            min,
        },
        ValidationError::TooLong { field, max } => ValidationError::TooLong {
            field: nest(field),
            max,
        },
        ValidationError::OutOfRange { field, min, max } => ValidationError::OutOfRange {
            field: nest(field),
            min,
            max,
        },
        ValidationError::MustBePositive { field } => {
            ValidationError::MustBePositive { field: nest(field) }
        }
        ValidationError::InvalidFormat { field, reason } => ValidationError::InvalidFormat {
            field: nest(field),
            reason,
        },
        other => other,
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors(vec![err])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

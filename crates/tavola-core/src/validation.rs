//! # Validation Module
//!
//! Field validators and the [`Validate`] trait implemented by every request
//! payload.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Missing fields, wrong JSON types                                  │
//! │  └── → 422 from the API extractor                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, formats, positivity, unique order lines                  │
//! │  └── → 422 with one entry per invalid field                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (email, product name, category name)                       │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tavola_core::validation::{validate_email, validate_password};
//!
//! assert!(validate_email("chef@tavola.io").is_ok());
//! assert!(validate_password("short").is_err());
//! ```

use crate::error::{ValidationError, ValidationErrors};
use crate::order::has_unique_products;
use crate::types::{
    AddressChanges, CategoryChanges, NewAddress, NewCategory, NewEmployeeProfile, NewOrder,
    NewProduct, NewUser, NewUserByAdmin, ProductChanges, UserChanges,
};
use crate::{
    MAX_CATEGORY_NAME_LENGTH, MAX_FIRST_NAME_LENGTH, MAX_LAST_NAME_LENGTH, MAX_ORDER_QUANTITY,
    MAX_PRICE_CENTS, MAX_PRODUCT_NAME_LENGTH, MIN_PASSWORD_LENGTH,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest salary representable by the payroll column (99 999.99).
pub const MAX_SALARY_CENTS: i64 = 9_999_999;

/// Request payloads that can check themselves before any I/O happens.
pub trait Validate {
    /// Every invalid field, or `Ok(())`.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

// =============================================================================
// String Validators
// =============================================================================

/// Non-blank text of at most `max` characters.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Non-blank text without a length cap.
pub fn validate_not_blank(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - exactly one `@` with a non-empty local part
/// - a dotted domain whose labels are non-empty
/// - no whitespace, at most 254 characters
///
/// ## Example
/// ```rust
/// use tavola_core::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_ok());
/// assert!(validate_email("ada@localhost").is_err());
/// assert!(validate_email("not an email").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "value is not a valid email address".to_string(),
    };

    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a phone number in international notation.
///
/// ## Rules
/// - leading `+` and country code
/// - 7 to 15 digits; spaces and hyphens are ignored
///
/// ## Example
/// ```rust
/// use tavola_core::validation::validate_phone_number;
///
/// assert!(validate_phone_number("+48 600-700-800").is_ok());
/// assert!(validate_phone_number("600700800").is_err());
/// ```
pub fn validate_phone_number(phone: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "phone_number".to_string(),
        reason: "Provided phone number is incorrect.".to_string(),
    };

    let rest = phone.trim().strip_prefix('+').ok_or_else(invalid)?;

    if !rest
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err(invalid());
    }

    let digits = rest.chars().filter(char::is_ascii_digit).count();
    if !(7..=15).contains(&digits) || rest.starts_with('0') {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a new password.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Strictly positive integer (ids, quantities, street numbers).
pub fn validate_positive(field: &str, value: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Menu prices run from one cent to [`MAX_PRICE_CENTS`].
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(1..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// An order line asks for 1 to [`MAX_ORDER_QUANTITY`] units.
pub fn validate_quantity(field: &str, quantity: i64) -> ValidationResult<()> {
    if !(1..=MAX_ORDER_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_ORDER_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Payload Implementations
// =============================================================================

impl Validate for NewUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_text("first_name", &self.first_name, MAX_FIRST_NAME_LENGTH));
        errors.check(validate_text("last_name", &self.last_name, MAX_LAST_NAME_LENGTH));
        errors.check(validate_email(&self.email));
        errors.check(validate_password(&self.password));
        if let Some(phone) = &self.phone_number {
            errors.check(validate_phone_number(phone));
        }
        errors.into_result()
    }
}

impl Validate for NewEmployeeProfile {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !(0..=MAX_SALARY_CENTS).contains(&self.salary_cents) {
            errors.push(ValidationError::OutOfRange {
                field: "salary_cents".to_string(),
                min: 0,
                max: MAX_SALARY_CENTS,
            });
        }
        if self.available_holidays < 0 {
            errors.push(ValidationError::OutOfRange {
                field: "available_holidays".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        errors.into_result()
    }
}

impl Validate for NewUserByAdmin {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(user_errors) = self.user.validate() {
            for err in user_errors.errors() {
                errors.push(err.clone());
            }
        }
        if let Some(profile) = &self.employee_profile {
            errors.check_nested("employee_profile", profile.validate());
        }
        errors.into_result()
    }
}

impl Validate for UserChanges {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(first_name) = &self.first_name {
            errors.check(validate_text("first_name", first_name, MAX_FIRST_NAME_LENGTH));
        }
        if let Some(last_name) = &self.last_name {
            errors.check(validate_text("last_name", last_name, MAX_LAST_NAME_LENGTH));
        }
        if let Some(email) = &self.email {
            errors.check(validate_email(email));
        }
        if let Some(phone) = &self.phone_number {
            errors.check(validate_phone_number(phone));
        }
        errors.into_result()
    }
}

impl Validate for NewAddress {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_not_blank("city", &self.city));
        errors.check(validate_not_blank("street", &self.street));
        errors.check(validate_positive("street_number", self.street_number));
        errors.check(validate_not_blank("postal_code", &self.postal_code));
        errors.into_result()
    }
}

impl Validate for AddressChanges {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(city) = &self.city {
            errors.check(validate_not_blank("city", city));
        }
        if let Some(street) = &self.street {
            errors.check(validate_not_blank("street", street));
        }
        if let Some(number) = self.street_number {
            errors.check(validate_positive("street_number", number));
        }
        if let Some(postal_code) = &self.postal_code {
            errors.check(validate_not_blank("postal_code", postal_code));
        }
        errors.into_result()
    }
}

impl Validate for NewCategory {
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_text("name", &self.name, MAX_CATEGORY_NAME_LENGTH).map_err(ValidationErrors::from)
    }
}

impl Validate for CategoryChanges {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match &self.name {
            Some(name) => {
                validate_text("name", name, MAX_CATEGORY_NAME_LENGTH).map_err(ValidationErrors::from)
            }
            None => Ok(()),
        }
    }
}

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_text("name", &self.name, MAX_PRODUCT_NAME_LENGTH));
        errors.check(validate_price_cents("price_cents", self.price_cents));
        errors.check(validate_positive("category_id", self.category_id));
        if let Some(picture) = &self.picture_data {
            errors.check(validate_not_blank(
                "picture_data.base64_encoded_image",
                &picture.base64_encoded_image,
            ));
        }
        errors.into_result()
    }
}

impl Validate for ProductChanges {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check(validate_text("name", name, MAX_PRODUCT_NAME_LENGTH));
        }
        if let Some(price) = self.price_cents {
            errors.check(validate_price_cents("price_cents", price));
        }
        if let Some(category_id) = self.category_id {
            errors.check(validate_positive("category_id", category_id));
        }
        errors.into_result()
    }
}

impl Validate for NewOrder {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.order_items.is_empty() {
            errors.push(ValidationError::Required {
                field: "order_items".to_string(),
            });
        }

        for (index, item) in self.order_items.iter().enumerate() {
            errors.check(validate_positive(
                &format!("order_items[{}].product_id", index),
                item.product_id,
            ));
            errors.check(validate_quantity(
                &format!("order_items[{}].quantity", index),
                item.quantity,
            ));
        }

        if !has_unique_products(&self.order_items) {
            errors.push(ValidationError::DuplicateOrderItems);
        }

        errors.into_result()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! The account validation predicate: raw create-user input in, pass/fail plus
//! per-field messages out.

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required";

/// Candidate account fields as posted by a client. Missing fields
/// deserialize as empty strings so they fail validation rather than parsing.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UserInput {
    #[validate(
        length(min = 3, max = 32, message = "Username must be 3 to 32 characters"),
        custom(function = "username_charset")
    )]
    pub username: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub password_confirmation: String,
}

/// Result of running the predicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: FieldErrors,
}

fn username_charset(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_charset");
        err.message = Some("Username may only contain letters, digits, '_' and '-'".into());
        Err(err)
    }
}

/// Check a create-user payload. Each failing field gets one message.
pub fn validate_user_input(input: &UserInput) -> ValidationOutcome {
    let mut errors = FieldErrors::new();

    for (field, value) in [
        ("username", &input.username),
        ("email", &input.email),
        ("password", &input.password),
        ("passwordConfirmation", &input.password_confirmation),
    ] {
        if value.trim().is_empty() {
            errors.insert(field.to_string(), REQUIRED.to_string());
        }
    }

    if let Err(validation_errors) = input.validate() {
        for (field, field_errors) in validation_errors.field_errors() {
            let message = field_errors
                .iter()
                .find_map(|error| error.message.as_ref().map(|msg| msg.to_string()))
                .unwrap_or_else(|| format!("{} is invalid", field));
            errors.entry(field.to_string()).or_insert(message);
        }
    }

    if !input.password_confirmation.is_empty() && input.password != input.password_confirmation {
        errors
            .entry("passwordConfirmation".to_string())
            .or_insert_with(|| "Passwords must match".to_string());
    }

    ValidationOutcome {
        is_valid: errors.is_empty(),
        errors,
    }
}

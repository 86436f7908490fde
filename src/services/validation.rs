//! Input checks shared by services.
//!
//! HTTP requests are validated by the extractor already; these checks keep
//! the services safe for any other caller.

use validator::ValidateEmail;

use crate::domain::{NewAccount, UpdateAccount};
use crate::errors::{AppError, AppResult};

pub(crate) fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> AppResult<()> {
    if !email.validate_email() {
        return Err(AppError::validation(format!("'{}' is not a valid email", email)));
    }
    Ok(())
}

pub(crate) fn validate_new_account(input: &NewAccount) -> AppResult<()> {
    validate_name(&input.name)?;
    validate_email(&input.email)?;
    if input.password.is_empty() {
        return Err(AppError::validation("Password is required"));
    }
    Ok(())
}

pub(crate) fn validate_update(input: &UpdateAccount) -> AppResult<()> {
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    if let Some(email) = &input.email {
        validate_email(email)?;
    }
    Ok(())
}

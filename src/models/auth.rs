//! Authentication-related models and their input checks

use crate::error::FieldError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{ValidateEmail, ValidateLength};

pub const LOGIN_MIN_LENGTH: u64 = 3;
pub const LOGIN_MAX_LENGTH: u64 = 10;
pub const PASSWORD_MIN_LENGTH: u64 = 6;
pub const PASSWORD_MAX_LENGTH: u64 = 20;

static LOGIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]*$").expect("login pattern is a valid regex")
});

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Login / refresh response body; the refresh token travels in a cookie
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub login: String,
    pub password: String,
    pub email: String,
}

impl RegistrationRequest {
    /// Trim every field, matching how the values are stored
    pub fn trimmed(self) -> Self {
        Self {
            login: self.login.trim().to_string(),
            password: self.password.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let errors: Vec<FieldError> = [
            validate_login(&self.login),
            validate_password("password", &self.password),
            validate_email(&self.email),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// `{code}` body of registration-confirmation
#[derive(Debug, Deserialize)]
pub struct ConfirmRegistrationRequest {
    pub code: String,
}

impl ConfirmRegistrationRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        validate_code("code", &self.code).map_err(|e| vec![e])
    }
}

/// `{email}` body of email-resending and password-recovery
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

impl EmailRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        validate_email(self.email.trim()).map_err(|e| vec![e])
    }
}

/// `{newPassword, recoveryCode}` body of new-password
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPasswordRequest {
    pub new_password: String,
    pub recovery_code: String,
}

impl NewPasswordRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let errors: Vec<FieldError> = [
            validate_password("newPassword", self.new_password.trim()),
            validate_code("recoveryCode", &self.recovery_code),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub fn validate_login(login: &str) -> Result<(), FieldError> {
    if !login.validate_length(Some(LOGIN_MIN_LENGTH), Some(LOGIN_MAX_LENGTH), None) {
        return Err(FieldError::new(
            "login",
            format!(
                "login length must be between {} and {}",
                LOGIN_MIN_LENGTH, LOGIN_MAX_LENGTH
            ),
        ));
    }
    if !LOGIN_PATTERN.is_match(login) {
        return Err(FieldError::new(
            "login",
            "login may contain only letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

pub fn validate_password(field: &str, password: &str) -> Result<(), FieldError> {
    if !password.validate_length(Some(PASSWORD_MIN_LENGTH), Some(PASSWORD_MAX_LENGTH), None) {
        return Err(FieldError::new(
            field,
            format!(
                "password length must be between {} and {}",
                PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH
            ),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if !email.validate_email() {
        return Err(FieldError::new("email", "email is not a valid address"));
    }
    Ok(())
}

fn validate_code(field: &str, code: &str) -> Result<(), FieldError> {
    if code.trim().is_empty() {
        return Err(FieldError::new(field, "code must not be empty"));
    }
    Ok(())
}

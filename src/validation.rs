use thiserror::Error;

pub const MFA_CODE_MIN_LENGTH: usize = 6;

/// Problems caught before anything is sent to the server.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("The code must be at least {} digits", MFA_CODE_MIN_LENGTH)]
    CodeTooShort,
    #[error("The code may only contain digits")]
    CodeNotNumeric,
    #[error("The new password must be different from the current one")]
    PasswordUnchanged,
    #[error("Provide either a PEM encoded certificate or both subject and issuer DN")]
    CertificateIncomplete,
}

pub fn mfa_code(code: &str) -> Result<&str, ValidationError> {
    let code = code.trim();
    if code.chars().count() < MFA_CODE_MIN_LENGTH {
        return Err(ValidationError::CodeTooShort);
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::CodeNotNumeric);
    }
    Ok(code)
}

pub fn new_password<'a>(current: &str, updated: &'a str) -> Result<&'a str, ValidationError> {
    if updated.is_empty() {
        return Err(ValidationError::Required("New password"));
    }
    if updated == current {
        return Err(ValidationError::PasswordUnchanged);
    }
    Ok(updated)
}

pub fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(value)
    }
}

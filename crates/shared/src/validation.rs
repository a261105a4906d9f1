use crate::error::ValidationError;

pub const MAX_MESSAGE_CHARS: usize = 5000;

pub const USERNAME_CHARS: (usize, usize) = (3, 150);
pub const FULL_NAME_CHARS: (usize, usize) = (1, 255);
pub const PASSWORD_CHARS: (usize, usize) = (6, 128);

pub fn validate_message_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    let actual = text.chars().count();
    if actual > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong {
            max: MAX_MESSAGE_CHARS,
            actual,
        });
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    if full_name.trim().is_empty() {
        return Err(ValidationError::EmptyFullName);
    }
    check_length("full name", full_name, FULL_NAME_CHARS)
}

pub fn validate_registration(
    username: &str,
    full_name: &str,
    password: &str,
) -> Result<(), ValidationError> {
    check_length("username", username, USERNAME_CHARS)?;
    validate_full_name(full_name)?;
    check_length("password", password, PASSWORD_CHARS)
}

pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::Required("username"));
    }
    if password.is_empty() {
        return Err(ValidationError::Required("password"));
    }
    Ok(())
}

fn check_length(
    field: &'static str,
    value: &str,
    (min, max): (usize, usize),
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::FieldLength {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

use crate::error::{AppError, AppResult};
use crate::model::attendance::AttendanceStatus;

pub const MAX_NOTES_CHARS: usize = 500;

/// Statuses arrive as text so a bad value is a field error, not a decode failure.
pub fn parse_status(field: &str, raw: &str) -> AppResult<AttendanceStatus> {
    raw.parse()
        .map_err(|_| AppError::validation(field, "invalid status"))
}

/// Empty strings count as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn max_chars(field: &str, value: Option<&str>, max: usize) -> AppResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::validation(
            field,
            format!("{} may not be greater than {} characters", field, max),
        )),
        _ => Ok(()),
    }
}

pub fn required(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, format!("{} is required", field)));
    }
    max_chars(field, Some(value), max)
}

pub fn check_notes(field: &str, notes: Option<&str>) -> AppResult<()> {
    max_chars(field, notes, MAX_NOTES_CHARS)
}

/// A deliberately loose shape check: one `@`, non-empty local part and a dotted domain.
pub fn check_email(field: &str, email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(field, "Please provide a valid email address."))
    }
}

/// Input validators
///
/// Every user-supplied field goes through one of these before it touches a
/// store. Each validator returns the normalized value or a field-keyed
/// `ValidationError`, so handlers can report all failing fields at once via
/// `FieldErrors`.

use regex::Regex;
use lazy_static::lazy_static;
use std::collections::BTreeMap;

use crate::auth::Role;
use crate::error::ValidationError;

pub const MAX_EMAIL_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 72; // bcrypt input limit
pub const MAX_USERNAME_LENGTH: usize = 20;
pub const MAX_NAME_LENGTH: usize = 20;
pub const MAX_URL_LENGTH: usize = 100;
pub const MAX_TITLE_LENGTH: usize = 180;
pub const MAX_COMMENT_LENGTH: usize = 1000;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 50;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();

    static ref URL_REGEX: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
}

/// Accumulates per-field failures across several validators
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the failure (if any) and hand back the validated value
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(ValidationError::Fields(errors)) => {
                for (field, message) in errors {
                    self.errors.entry(field).or_insert(message);
                }
                None
            }
            Err(other) => {
                self.errors
                    .entry("request".to_string())
                    .or_insert_with(|| other.to_string());
                None
            }
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Fields(self.errors))
        }
    }
}

/// Validates and normalizes an email address (trimmed, lowercased)
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::field("email", "Email is required"));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::field(
            "email",
            format!("Email must be less than {} characters", MAX_EMAIL_LENGTH),
        ));
    }

    if !EMAIL_REGEX.is_match(trimmed) || trimmed.contains('\0') {
        return Err(ValidationError::field("email", "Invalid email address"));
    }

    Ok(trimmed.to_lowercase())
}

/// Validates password length; content rules are left to the user
pub fn is_valid_password(password: &str) -> Result<String, ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::field("password", "Password is required"));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::field(
            "password",
            format!("Password must be at least {} characters long.", MIN_PASSWORD_LENGTH),
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::field(
            "password",
            format!("Password must be at most {} bytes long.", MAX_PASSWORD_LENGTH),
        ));
    }

    Ok(password.to_string())
}

/// Parses an optional role; absent means `Role::User`
pub fn is_valid_role(role: Option<&str>) -> Result<Role, ValidationError> {
    match role {
        None => Ok(Role::User),
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| ValidationError::field("role", "Role must be either admin or user")),
    }
}

pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::field("username", "Username is required"));
    }

    if trimmed.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::field(
            "username",
            format!("Username must be less than {} characters", MAX_USERNAME_LENGTH),
        ));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::field(
            "username",
            "Username may only contain letters, digits, '-' and '_'",
        ));
    }

    Ok(trimmed.to_string())
}

/// First/last name; an empty string clears the field
pub fn is_valid_name(field: &str, name: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::field(
            field,
            format!("{} must be less than {} characters", field, MAX_NAME_LENGTH),
        ));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::field(field, format!("{} contains invalid characters", field)));
    }

    Ok(Some(trimmed.to_string()))
}

/// Social link URL; an empty string clears the field
pub fn is_valid_url(field: &str, url: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ValidationError::field(
            field,
            format!("{} URL must be less than {} characters", field, MAX_URL_LENGTH),
        ));
    }

    if !URL_REGEX.is_match(trimmed) {
        return Err(ValidationError::field(field, format!("Invalid {} URL", field)));
    }

    Ok(Some(trimmed.to_string()))
}

pub fn is_valid_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::field("title", "Title is required"));
    }

    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::field(
            "title",
            format!("Title must be less than {} characters", MAX_TITLE_LENGTH),
        ));
    }

    Ok(trimmed.to_string())
}

/// Non-empty free text with an optional character limit
pub fn is_valid_content(content: &str, max: Option<usize>) -> Result<String, ValidationError> {
    let trimmed = content.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::field("content", "Content is required"));
    }

    if let Some(max) = max {
        if trimmed.chars().count() > max {
            return Err(ValidationError::field(
                "content",
                format!("Content must be less than {} characters", max),
            ));
        }
    }

    Ok(trimmed.to_string())
}

/// Clamp-free pagination check: out-of-range values are rejected
pub fn is_valid_pagination(
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<(i64, i64), ValidationError> {
    let mut errors = FieldErrors::new();

    let limit = errors.check(match limit.unwrap_or(DEFAULT_PAGE_LIMIT) {
        l if (1..=MAX_PAGE_LIMIT).contains(&l) => Ok(l),
        _ => Err(ValidationError::field(
            "limit",
            format!("Limit must be between 1 and {}", MAX_PAGE_LIMIT),
        )),
    });

    let offset = errors.check(match offset.unwrap_or(0) {
        o if o >= 0 => Ok(o),
        _ => Err(ValidationError::field("offset", "Offset must be a positive integer")),
    });

    errors.into_result()?;
    Ok((limit.unwrap_or(DEFAULT_PAGE_LIMIT), offset.unwrap_or(0)))
}

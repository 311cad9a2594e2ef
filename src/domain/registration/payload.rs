//! Registration form snapshot.

use crate::domain::foundation::{EmailAddress, ValidationError};
use serde::{Deserialize, Serialize};

/// Validated registration details captured when the intent is created.
///
/// Credentials are deliberately absent; the account system collects
/// them after provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    pub email: EmailAddress,
    pub username: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub institution: Option<String>,
}

impl RegistrationPayload {
    pub fn new(
        email: &str,
        username: &str,
        full_name: &str,
        phone_number: Option<&str>,
        institution: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let email = EmailAddress::parse(email)?;

        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::empty_field("username"));
        }
        let len = username.chars().count() as i64;
        if !(3..=32).contains(&len) {
            return Err(ValidationError::out_of_range("username", 3, 32, len));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(ValidationError::invalid_format(
                "username",
                "only letters, digits, '_', '.' and '-' are allowed",
            ));
        }

        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::empty_field("full_name"));
        }

        let phone_number = match phone_number.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => Some(normalize_phone(raw)?),
            None => None,
        };

        let institution = institution
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .map(str::to_string);

        Ok(Self {
            email,
            username: username.to_lowercase(),
            full_name: full_name.to_string(),
            phone_number,
            institution,
        })
    }
}

/// Normalizes a phone number to international digits without `+`.
///
/// Accepts spaces, dashes and parentheses as separators.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let without_plus = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let mut digits = String::with_capacity(without_plus.len());
    for c in without_plus.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' => {}
            _ => {
                return Err(ValidationError::invalid_format(
                    "phone_number",
                    "must contain digits only",
                ))
            }
        }
    }

    let len = digits.len() as i64;
    if !(9..=15).contains(&len) {
        return Err(ValidationError::out_of_range("phone_number", 9, 15, len));
    }
    if digits.starts_with('0') {
        return Err(ValidationError::invalid_format(
            "phone_number",
            "must include the country code",
        ));
    }

    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_fields() {
        let payload = RegistrationPayload::new(
            " Reader@Law.ac.ke ",
            "Jurist_01",
            "  Ada Obi ",
            Some("+254 712-345 678"),
            Some("  "),
        )
        .unwrap();

        assert_eq!(payload.email.as_str(), "reader@law.ac.ke");
        assert_eq!(payload.username, "jurist_01");
        assert_eq!(payload.full_name, "Ada Obi");
        assert_eq!(payload.phone_number.as_deref(), Some("254712345678"));
        assert_eq!(payload.institution, None);
    }

    #[test]
    fn rejects_short_username() {
        let err = RegistrationPayload::new("a@b.co", "ab", "Name", None, None).unwrap_err();
        assert_eq!(err.field(), "username");
    }

    #[test]
    fn rejects_missing_full_name() {
        let err = RegistrationPayload::new("a@b.co", "abc", " ", None, None).unwrap_err();
        assert_eq!(err.field(), "full_name");
    }

    #[test]
    fn phone_requires_country_code_and_digits() {
        assert!(normalize_phone("0712345678").is_err());
        assert!(normalize_phone("+2547abc45678").is_err());
        assert!(normalize_phone("+1234").is_err());
        assert_eq!(normalize_phone("+44 (20) 7946 0958").unwrap(), "442079460958");
    }
}

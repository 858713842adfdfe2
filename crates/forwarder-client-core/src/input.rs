use crate::error::ValidationError;

/// Normalizes a user-entered phone number to the E.164-style form the backend
/// expects. A missing `+` is prepended exactly once.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyPhone);
    }
    let formatted = if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{trimmed}")
    };
    if formatted.len() == 1 {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(formatted)
}

pub fn normalize_verification_code(raw: &str) -> Result<String, ValidationError> {
    let collapsed = raw.split_whitespace().collect::<String>();
    if collapsed.is_empty() {
        return Err(ValidationError::EmptyVerificationCode);
    }
    Ok(collapsed)
}

/// Renders a phone number for logs without exposing it.
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let chars = phone.chars().collect::<Vec<_>>();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let head = chars.iter().take(2).collect::<String>();
    let tail = chars.iter().skip(chars.len() - 2).collect::<String>();
    format!("{head}****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_phone_prepends_plus_once() {
        assert_eq!(
            normalize_phone("5551234567").expect("phone"),
            "+5551234567"
        );
        assert_eq!(
            normalize_phone("+5551234567").expect("phone"),
            "+5551234567"
        );
        assert_eq!(
            normalize_phone("  447700900123 ").expect("phone"),
            "+447700900123"
        );
    }

    #[test]
    fn normalize_phone_is_idempotent() {
        for raw in ["1", "15551234567", "+1 555 123 4567", "++1"] {
            let once = normalize_phone(raw).expect("phone");
            let twice = normalize_phone(&once).expect("phone");
            assert_eq!(once, twice);
            if raw.starts_with('+') {
                assert_eq!(once, raw);
            } else {
                assert_eq!(once, format!("+{raw}"));
            }
        }
    }

    #[test]
    fn normalize_phone_rejects_blank_and_bare_prefix() {
        assert_eq!(normalize_phone("   "), Err(ValidationError::EmptyPhone));
        assert_eq!(normalize_phone("+"), Err(ValidationError::InvalidPhone));
    }

    #[test]
    fn verification_code_collapses_whitespace() {
        assert_eq!(
            normalize_verification_code(" 12 345 ").expect("code"),
            "12345"
        );
        assert_eq!(
            normalize_verification_code("\t"),
            Err(ValidationError::EmptyVerificationCode)
        );
    }

    #[test]
    fn mask_phone_keeps_only_edges() {
        assert_eq!(mask_phone("+5551234567"), "+5****67");
        assert_eq!(mask_phone("+123"), "****");
    }
}

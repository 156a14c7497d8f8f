use once_cell::sync::Lazy;
use regex::Regex;

// Customer identity formats for loan applications.
static ID_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][12]\d{8}$").unwrap());
static MOBILE_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^09\d{8}$").unwrap());
static LANDLINE_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0[2-8]\d{7,8}$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").unwrap());
static GMAIL_LOCAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+$").unwrap());

/// National ID: one uppercase letter, 1 or 2, then eight digits.
pub fn is_valid_id_number(value: &str) -> bool {
    ID_NUMBER.is_match(value)
}

/// Mobile (09xxxxxxxx) or landline (0 + area code + 7-8 digits).
pub fn is_valid_phone(value: &str) -> bool {
    MOBILE_PHONE.is_match(value) || LANDLINE_PHONE.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Onboarding emails must be a gmail address with a plain local part.
pub fn is_valid_onboarding_email(value: &str) -> bool {
    let local = value.strip_suffix("@gmail.com").unwrap_or(value);
    GMAIL_LOCAL.is_match(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A123456789", true)]
    #[case("B234567890", true)]
    #[case("a123456789", false)] // lowercase prefix
    #[case("A323456789", false)] // gender digit must be 1 or 2
    #[case("A12345678", false)] // too short
    #[case("A1234567890", false)] // too long
    fn id_number_format(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_valid_id_number(value), expected);
    }

    #[rstest]
    #[case("0912345678", true)] // mobile
    #[case("0223456789", true)] // Taipei landline, 8 digits
    #[case("037123456", true)] // 7-digit landline
    #[case("091234567", false)] // mobile too short
    #[case("0998765432", true)]
    #[case("12345678", false)]
    #[case("0912-345678", false)]
    fn phone_format(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_valid_phone(value), expected);
    }

    #[rstest]
    #[case("user@mail.example", true)]
    #[case("user@mail", false)]
    #[case("user mail.example", false)]
    #[case("@mail.example", false)]
    fn email_format(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_valid_email(value), expected);
    }

    #[rstest]
    #[case("wu.kai@gmail.com", true)]
    #[case("wu_kai+hr@gmail.com", true)]
    #[case("wu kai@gmail.com", false)]
    #[case("", false)]
    fn onboarding_email_format(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_valid_onboarding_email(value), expected);
    }
}

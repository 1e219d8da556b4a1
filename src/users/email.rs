use lazy_static::lazy_static;
use regex::Regex;

/// Lower-cases the domain part of an address and leaves the local part as entered.
///
/// Surrounding whitespace is dropped. Input without an `@` is returned trimmed
/// but otherwise untouched so that validation can reject it later.
pub fn normalize_email(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => trimmed.to_string(),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= 255 && EMAIL_RE.is_match(email)
}

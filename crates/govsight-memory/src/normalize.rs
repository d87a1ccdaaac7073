//! Key normalization shared by every read and write of the fact store.
//!
//! Rules, applied in order:
//! 1. Apostrophes (`'` and `’`) are removed, so `O'Fallon` becomes `ofallon`.
//! 2. Letters are lowercased; letters and digits are kept.
//! 3. Every other character (punctuation, symbols, underscores, whitespace)
//!    becomes a word separator.
//! 4. Runs of separators collapse to a single space and the ends are trimmed.
//!
//! `"Grandview, TX"` and `"grandview tx"` both normalize to `"grandview tx"`.

use govsight_types::error::{GovsightError, GovsightResult};
use govsight_types::fact::LookupKey;

/// Normalize an identifier (subject or attribute).
pub fn normalize(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\'' | '\u{2019}' => {}
            c if c.is_alphanumeric() => spaced.extend(c.to_lowercase()),
            _ => spaced.push(' '),
        }
    }
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a (subject, attribute) pair, rejecting pairs that collapse to empty.
pub fn normalize_key(subject: &str, attribute: &str) -> GovsightResult<LookupKey> {
    let subject_norm = normalize(subject);
    if subject_norm.is_empty() {
        return Err(GovsightError::MalformedKey(format!(
            "subject '{subject}' is empty after normalization"
        )));
    }
    let attribute_norm = normalize(attribute);
    if attribute_norm.is_empty() {
        return Err(GovsightError::MalformedKey(format!(
            "attribute '{attribute}' is empty after normalization"
        )));
    }
    Ok(LookupKey::new(subject_norm, attribute_norm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_and_case() {
        assert_eq!(normalize("Grandview, TX"), "grandview tx");
        assert_eq!(normalize("grandview tx"), "grandview tx");
        assert_eq!(normalize("  Grandview ,  TX. "), "grandview tx");
    }

    #[test]
    fn test_apostrophes_dropped() {
        assert_eq!(normalize("O'Fallon, MO"), "ofallon mo");
        assert_eq!(normalize("Coeur d\u{2019}Alene"), "coeur dalene");
    }

    #[test]
    fn test_separators() {
        assert_eq!(normalize("zip_code"), "zip code");
        assert_eq!(normalize("Winston-Salem"), "winston salem");
        assert_eq!(normalize("Zip\tCode"), "zip code");
    }

    #[test]
    fn test_non_ascii_letters_kept() {
        assert_eq!(normalize("San José"), "san josé");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("St. Louis, MO!!");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_malformed_key() {
        assert!(matches!(
            normalize_key("?!", "mayor"),
            Err(GovsightError::MalformedKey(_))
        ));
        assert!(matches!(
            normalize_key("grandview", "  ,"),
            Err(GovsightError::MalformedKey(_))
        ));
        let key = normalize_key("Grandview, TX", "Mayor").unwrap();
        assert_eq!(key, LookupKey::new("grandview tx", "mayor"));
    }
}

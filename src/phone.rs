//! Emergency phone number handling.

use crate::error::{Error, Result};
use crate::store::FileStore;

/// Storage key of the emergency contact number.
pub const EMERGENCY_NUMBER_KEY: &str = "emergencyNumber";

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;

/// Strip everything that is not an ASCII digit.
pub fn normalize_phone_number(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid_phone_number(raw: &str) -> bool {
    let digits = normalize_phone_number(raw).len();
    (MIN_DIGITS..=MAX_DIGITS).contains(&digits)
}

/// Validate and persist `raw`, returning the normalized number that was stored.
pub fn save_emergency_number(store: &FileStore, raw: &str) -> Result<String> {
    if !is_valid_phone_number(raw) {
        return Err(Error::InvalidPhoneNumber(raw.to_string()));
    }
    let normalized = normalize_phone_number(raw);
    store.set(EMERGENCY_NUMBER_KEY, &normalized)?;
    Ok(normalized)
}

/// The stored emergency number, `None` when unset or empty.
pub fn load_emergency_number(store: &FileStore) -> Result<Option<String>> {
    Ok(store
        .get(EMERGENCY_NUMBER_KEY)?
        .filter(|number| !number.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_formatting() {
        assert_eq!(normalize_phone_number("+1 (555) 010-9999"), "15550109999");
        assert_eq!(normalize_phone_number("abc"), "");
    }

    #[test]
    fn validity_is_seven_to_fifteen_digits() {
        assert!(!is_valid_phone_number("123-456"));
        assert!(is_valid_phone_number("123-4567"));
        assert!(is_valid_phone_number("+44 20 7946 0958"));
        assert!(is_valid_phone_number("123456789012345"));
        assert!(!is_valid_phone_number("1234567890123456"));
        assert!(!is_valid_phone_number(""));
    }

    #[test]
    fn save_stores_normalized_number() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(temp_dir.path().join("storage.json"));

        let saved = save_emergency_number(&store, "(555) 010-9999").expect("save");
        assert_eq!(saved, "5550109999");
        assert_eq!(
            load_emergency_number(&store).expect("load"),
            Some("5550109999".to_string())
        );
    }

    #[test]
    fn save_rejects_invalid_without_writing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(temp_dir.path().join("storage.json"));
        save_emergency_number(&store, "555-0100-99").expect("save");

        let err = save_emergency_number(&store, "911").unwrap_err();
        assert!(matches!(err, Error::InvalidPhoneNumber(_)));
        assert_eq!(
            load_emergency_number(&store).expect("load"),
            Some("555010099".to_string())
        );
    }

    #[test]
    fn empty_value_reads_as_unset() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(temp_dir.path().join("storage.json"));
        assert_eq!(load_emergency_number(&store).expect("load"), None);

        store.set(EMERGENCY_NUMBER_KEY, "").expect("set");
        assert_eq!(load_emergency_number(&store).expect("load"), None);
    }
}

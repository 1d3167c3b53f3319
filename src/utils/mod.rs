//! Small shared helpers: content hashing, CSV escaping, sentinel cleaning.

use sha2::{Digest, Sha256};

/// SHA-256 of `value`, as a lowercase hex string.
pub fn sha256_hex(value: &str) -> String {
    let mut digest = Sha256::new();
    digest.update(value.as_bytes());
    hex::encode(digest.finalize())
}

/// Escape a field value for CSV output.
///
/// Internal double quotes are doubled; the access-log `-` sentinel renders
/// as an empty field.
pub fn escape_csv(field: &str) -> String {
    if field == "-" {
        return String::new();
    }
    field.replace('"', "\"\"")
}

/// Map the access-log `-` sentinel to an empty string.
pub fn clean_field(raw: &str) -> String {
    if raw == "-" { String::new() } else { raw.to_string() }
}

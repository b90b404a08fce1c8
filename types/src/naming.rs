//! Generated constraint names
//!
//! Implicit constraint names are a prefix followed by a base-35 rendering of
//! a digest over the table name and the sorted column names, so the same
//! key always receives the same name regardless of column declaration order.

use sha2::{Digest, Sha256};

const RADIX_DIGITS: &[u8; 35] = b"0123456789abcdefghijklmnopqrstuvwxy";

/// Prefix for foreign key names
pub const FOREIGN_KEY_PREFIX: &str = "FK";
/// Prefix for unique key names
pub const UNIQUE_KEY_PREFIX: &str = "UK";
/// Prefix for index names
pub const INDEX_PREFIX: &str = "IDX";

/// Build a stable constraint name for `columns` on `table`
///
/// ```
/// use quarry_types::naming::generate_constraint_name;
///
/// let a = generate_constraint_name("FK", "orders", &["customer_id", "region"]);
/// let b = generate_constraint_name("FK", "orders", &["region", "customer_id"]);
/// assert_eq!(a, b);
/// assert!(a.starts_with("FK"));
/// ```
#[must_use]
pub fn generate_constraint_name<S: AsRef<str>>(prefix: &str, table: &str, columns: &[S]) -> String {
    let mut sorted: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut source = format!("table`{table}`");
    for column in sorted {
        source.push_str("column`");
        source.push_str(column);
        source.push('`');
    }

    format!("{prefix}{}", hashed_name(&source))
}

/// Base-35 digest of `source`
#[must_use]
pub fn hashed_name(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    to_radix_35(u128::from_be_bytes(bytes))
}

fn to_radix_35(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(RADIX_DIGITS[(value % 35) as usize]);
        value /= 35;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radix_35() {
        assert_eq!(to_radix_35(0), "0");
        assert_eq!(to_radix_35(34), "y");
        assert_eq!(to_radix_35(35), "10");
    }

    #[test]
    fn test_names_differ_by_table() {
        let a = generate_constraint_name(UNIQUE_KEY_PREFIX, "orders", &["code"]);
        let b = generate_constraint_name(UNIQUE_KEY_PREFIX, "invoices", &["code"]);
        assert_ne!(a, b);
        assert!(a.starts_with("UK"));
    }

    #[test]
    fn test_hash_is_alphanumeric() {
        let name = hashed_name("table`t`column`c`");
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!name.contains('z'));
    }
}

/// Normalizes a caller-supplied identifier for use in file and folder names
///
/// Every run of whitespace becomes a single `_`. Leading and trailing
/// whitespace is dropped, and an identifier with nothing left is treated
/// as absent.
///
/// # Example
///
/// ```
/// use sarcopipe_core::normalize_identifier;
///
/// assert_eq!(normalize_identifier("Jane  Doe"), Some("Jane_Doe".to_string()));
/// assert_eq!(normalize_identifier("   "), None);
/// ```
pub fn normalize_identifier(identifier: &str) -> Option<String> {
    let joined = identifier.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

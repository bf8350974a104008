//! Human-readable document sizes.

/// Format a byte count with decimal units, truncating toward zero.
///
/// | Range                  | Output        |
/// |------------------------|---------------|
/// | `< 10_000`             | `"<n> bytes"` |
/// | `< 10_000_000`         | `"<n/1e3> KB"`|
/// | `< 10_000_000_000`     | `"<n/1e6> MB"`|
/// | otherwise              | `"<n/1e9> GB"`|
pub fn describe_size(bytes: u64) -> String {
    if bytes < 10_000 {
        format!("{bytes} bytes")
    } else if bytes < 10_000_000 {
        format!("{} KB", bytes / 1_000)
    } else if bytes < 10_000_000_000 {
        format!("{} MB", bytes / 1_000_000)
    } else {
        format!("{} GB", bytes / 1_000_000_000)
    }
}

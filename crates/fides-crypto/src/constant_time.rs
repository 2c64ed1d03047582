use subtle::ConstantTimeEq;

/// Compare two byte slices in constant time.
///
/// When the lengths differ the result is `false`; the comparison still runs
/// over one of the inputs so the timing does not reveal the position of the
/// first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        let _ = a.ct_eq(a);
        return false;
    }
    a.ct_eq(b).into()
}

/// Constant-time comparison of two strings (UTF-8 bytes).
///
/// Used for secret-bearing identifiers and signature material where a
/// short-circuiting `==` would leak the length of the matching prefix.
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

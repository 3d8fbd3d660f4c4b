//! Canonical form of captured interpreter output.

/// Decode captured bytes and convert every `\r\n` to `\n`.
///
/// Invalid UTF-8 is replaced rather than rejected so a garbled capture still
/// shows up in the transcript and the diff.
pub fn normalize_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace("\r\n", "\n")
}

/// Returns true if `name` is a batch file name: one or more ASCII digits.
pub fn is_batch_file_name(name: &str) -> bool {
  !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Generates a batch filename from its creation timestamp.
/// Format: plain decimal milliseconds, e.g. `1700000000000`.
pub fn batch_filename(timestamp_ms: u64) -> String {
  timestamp_ms.to_string()
}

/// Parses the creation timestamp out of a batch filename.
///
/// Names that do not parse (including digit strings that overflow a `u64`)
/// map to 0, which makes them older than any retention threshold.
pub fn parse_batch_timestamp(name: &str) -> u64 {
  name.parse::<u64>().unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_batch_name_predicate() {
    assert!(is_batch_file_name("1700000000000"));
    assert!(is_batch_file_name("0"));
    assert!(!is_batch_file_name(""));
    assert!(!is_batch_file_name("1700000000000.tmp"));
    assert!(!is_batch_file_name("-12"));
    assert!(!is_batch_file_name("12 "));
    assert!(!is_batch_file_name("١٢٣")); // non-ASCII digits
  }

  #[test]
  fn test_filenames() {
    let ts = 1_700_000_000_123;
    let name = batch_filename(ts);
    assert_eq!(name, "1700000000123");
    assert_eq!(parse_batch_timestamp(&name), ts);
  }

  #[test]
  fn test_unparseable_timestamp_is_zero() {
    assert_eq!(parse_batch_timestamp("99999999999999999999999"), 0);
    assert_eq!(parse_batch_timestamp("garbage"), 0);
  }
}

use chrono::{SecondsFormat, Utc};

/// Parses a duration string into a number of milliseconds.
///
/// Accepts strings in the format `1d2h3m4s`; any combination of the suffixes
/// `s`, `m`, `h` and `d` is allowed as long as a number precedes each one.
/// Returns `None` for invalid input.
pub fn parse_duration(input: &str) -> Option<u128> {
    let mut total: u128 = 0;
    let mut chars = input.chars().peekable();

    while chars.peek().is_some() {
        let mut number_str = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                number_str.push(chars.next()?);
            } else {
                break;
            }
        }

        if number_str.is_empty() {
            return None;
        }

        let number: u128 = number_str.parse().ok()?;
        let multiplier = match chars.next()? {
            's' => 1000,
            'm' => 60 * 1000,
            'h' => 60 * 60 * 1000,
            'd' => 24 * 60 * 60 * 1000,
            _ => return None,
        };

        total = total.checked_add(number.checked_mul(multiplier)?)?;
    }

    Some(total)
}

/// Current UTC time as an ISO-8601 string with millisecond precision.
///
/// This is the format stored in a package document's `time` map.
pub fn iso8601_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current UTC time as milliseconds since the Unix epoch.
///
/// Used for the `fetched` stamp in the per-uplink cache entries.
pub fn epoch_ms_now() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(30_000));
        assert_eq!(parse_duration("2m"), Some(120_000));
        assert_eq!(parse_duration("1h30m"), Some(5_400_000));
        assert_eq!(parse_duration("1d"), Some(86_400_000));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("5x"), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration(""), Some(0));
    }

    #[test]
    fn test_iso8601_now_shape() {
        let now = iso8601_now();
        assert!(now.ends_with('Z'));
        assert!(now.contains('T'));
    }

    #[test]
    fn test_epoch_ms_now_advances() {
        let a = epoch_ms_now();
        let b = epoch_ms_now();
        assert!(b >= a);
    }
}

use std::sync::LazyLock;

use regex::Regex;

// All URL-safe characters, plus "@" for scoped package segments.
static SAFE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_.!~*'()@]+$").expect("valid regex"));

/// Names that can never be a package segment or a stored file.
///
/// `metadata.json` is the document resource itself; the others are
/// historically abused names.
const RESERVED_NAMES: &[&str] = &["node_modules", "__proto__", "favicon.ico", "metadata.json"];

/// Validates a single (unscoped) name segment.
///
/// A valid segment contains only URL-safe characters, does not start with
/// `.` or `-`, and is not one of the reserved names.
fn validate_segment(name: &str) -> bool {
    let lowered = name.to_lowercase();

    SAFE_NAME.is_match(&lowered)
        && !lowered.starts_with('.')
        && !lowered.starts_with('-')
        && !RESERVED_NAMES.contains(&lowered.as_str())
}

/// Validates a package name, allowing one `@scope/` prefix.
pub fn validate_package_name(name: &str) -> bool {
    let mut parts = name.splitn(2, '/');
    let first = match parts.next() {
        Some(first) => first,
        None => return false,
    };

    match parts.next() {
        // plain package
        None => validate_segment(first),
        // scoped package: "@scope/name"
        Some(rest) => {
            first.starts_with('@') && validate_segment(&first[1..]) && validate_segment(rest)
        }
    }
}

/// Validates a tarball file name.
///
/// File names are never scoped and must be a single safe segment.
pub fn validate_file_name(name: &str) -> bool {
    !name.contains('/') && validate_segment(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_plain_names() {
        assert!(validate_package_name("left-pad"));
        assert!(validate_package_name("some_pkg.js"));
        assert!(validate_package_name("Express"));
    }

    #[test]
    fn test_valid_scoped_names() {
        assert!(validate_package_name("@scope/pkg"));
        assert!(validate_package_name("@my-org/my.pkg"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!validate_package_name(".hidden"));
        assert!(!validate_package_name("-leading-dash"));
        assert!(!validate_package_name("node_modules"));
        assert!(!validate_package_name("__proto__"));
        assert!(!validate_package_name("metadata.json"));
        assert!(!validate_package_name("has space"));
        assert!(!validate_package_name("a/b"));
        assert!(!validate_package_name("@scope/"));
        assert!(!validate_package_name("../escape"));
    }

    #[test]
    fn test_file_names() {
        assert!(validate_file_name("pkg-1.0.0.tgz"));
        assert!(!validate_file_name("metadata.json"));
        assert!(!validate_file_name("@scope/pkg-1.0.0.tgz"));
        assert!(!validate_file_name(".part"));
    }
}

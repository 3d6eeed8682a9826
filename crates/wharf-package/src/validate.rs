use crate::{
    document::PackageDocument,
    error::{PackageError, Result},
};

/// Checks that a metadata document actually describes `name`.
///
/// Applied to every uplink response body and every publish payload before
/// it is allowed anywhere near local state. The typed document model
/// already guarantees the `versions` and `dist-tags` maps exist, so the
/// remaining structural check is the name match.
pub fn validate_metadata(doc: &PackageDocument, name: &str) -> Result<()> {
    if doc.name != name {
        return Err(PackageError::NameMismatch {
            expected: name.to_string(),
            actual: doc.name.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_name() {
        let doc = PackageDocument::template("pkg");
        assert!(validate_metadata(&doc, "pkg").is_ok());
    }

    #[test]
    fn test_name_mismatch() {
        let doc = PackageDocument::template("other");
        let err = validate_metadata(&doc, "pkg").unwrap_err();
        assert!(matches!(err, PackageError::NameMismatch { .. }));
    }
}

//! Parsing of strain names as shown in the browser, `Name (ASSEMBLY)`.

/// Extract the assembly accession from a `Name (ASSEMBLY)` string.
///
/// The accession is the last parenthesised group, so names may carry their
/// own parentheses. Returns `None` when there is no `(` separator, when
/// nothing follows it, or when the accession contains characters outside
/// `[A-Za-z0-9._-]`. The result is used as a file stem, so path separators
/// are never accepted.
pub fn parse_assembly(strain_name: &str) -> Option<&str> {
    let (_, rest) = strain_name.rsplit_once('(')?;
    let rest = rest.trim_end();
    let assembly = rest.strip_suffix(')').unwrap_or(rest).trim();

    if assembly.is_empty() || assembly.starts_with('.') {
        return None;
    }
    if !assembly
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return None;
    }
    Some(assembly)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_display_name() {
        assert_eq!(
            parse_assembly("Pseudomonas aeruginosa PAO1 (GCF_000006765.1)"),
            Some("GCF_000006765.1")
        );
        assert_eq!(parse_assembly("x(GCF_1.1)"), Some("GCF_1.1"));
    }

    #[test]
    fn test_name_with_own_parentheses() {
        assert_eq!(
            parse_assembly("P. aeruginosa (clinical) (GCF_1)"),
            Some("GCF_1")
        );
        assert_eq!(parse_assembly("Strain (ST235) (GCF_000404265.1)"), Some("GCF_000404265.1"));
    }

    #[test]
    fn test_missing_separator() {
        assert_eq!(parse_assembly("GCF_000006765.1"), None);
        assert_eq!(parse_assembly(""), None);
    }

    #[test]
    fn test_empty_accession() {
        assert_eq!(parse_assembly("Strain ()"), None);
        assert_eq!(parse_assembly("Strain ("), None);
    }

    #[test]
    fn test_rejects_path_like_accessions() {
        assert_eq!(parse_assembly("a (../../etc/passwd)"), None);
        assert_eq!(parse_assembly("a (..)"), None);
        assert_eq!(parse_assembly("a (dir/file)"), None);
    }
}

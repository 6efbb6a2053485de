use crate::models::{FormatTag, PackageSet};

/// Separator between packages in the bracketed format.
const CSV_SEPARATOR: &str = ", ";

/// Parse a raw inventory value into a [`PackageSet`].
///
/// Never fails. Degenerate input still yields a set: an empty value parses
/// to `{""}`, and that empty string counts as a package when diffing.
pub fn parse(raw: &str, format: FormatTag) -> PackageSet {
    match format {
        FormatTag::Newline => raw.split('\n').collect(),
        FormatTag::BracketedCsv => strip_bracket_prefix(raw).split(CSV_SEPARATOR).collect(),
    }
}

/// Drop everything up to the first `]` and the separator character after it.
fn strip_bracket_prefix(raw: &str) -> &str {
    match raw.find(']') {
        Some(idx) => {
            let mut rest = raw[idx + 1..].chars();
            rest.next();
            rest.as_str()
        }
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newline_list() {
        let set = parse("bash=5.1\ncurl=7.81\nbash=5.1", FormatTag::Newline);
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_sorted_vec(), vec!["bash=5.1", "curl=7.81"]);
    }

    #[test]
    fn test_newline_trailing_empty_token_is_kept() {
        let set = parse("bash=5.1\n", FormatTag::Newline);
        assert_eq!(set.to_sorted_vec(), vec!["", "bash=5.1"]);
    }

    #[test]
    fn test_bracketed_csv() {
        let set = parse("[rpm] foo-1.0, bar-2.0", FormatTag::BracketedCsv);
        assert_eq!(set, PackageSet::from_iter(["foo-1.0", "bar-2.0"]));
    }

    #[test]
    fn test_bracketed_csv_other_prefix_length() {
        let set = parse("[dpkg] foo-1.0, bar-2.0", FormatTag::BracketedCsv);
        assert_eq!(set, PackageSet::from_iter(["foo-1.0", "bar-2.0"]));
    }

    #[test]
    fn test_bracketed_without_prefix_splits_everything() {
        let set = parse("foo-1.0, bar-2.0", FormatTag::BracketedCsv);
        assert_eq!(set, PackageSet::from_iter(["foo-1.0", "bar-2.0"]));
    }

    #[test]
    fn test_empty_value_yields_empty_string_member() {
        for format in [FormatTag::Newline, FormatTag::BracketedCsv] {
            let set = parse("", format);
            assert_eq!(set.to_sorted_vec(), vec![String::new()]);
        }
        let set = parse("[rpm]", FormatTag::BracketedCsv);
        assert_eq!(set.to_sorted_vec(), vec![String::new()]);
    }

    #[test]
    fn test_reparse_of_serialized_set_is_stable() {
        let set = parse("zlib=1.2\nbash=5.1\nbash=5.1\ncurl=7.81", FormatTag::Newline);
        let serialized = set.to_sorted_vec().join("\n");
        assert_eq!(parse(&serialized, FormatTag::Newline), set);

        let set = parse("[rpm] foo-1.0, bar-2.0, foo-1.0", FormatTag::BracketedCsv);
        let serialized = format!("[rpm] {}", set.to_sorted_vec().join(CSV_SEPARATOR));
        assert_eq!(parse(&serialized, FormatTag::BracketedCsv), set);
    }
}

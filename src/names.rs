//! Author name handling: query tokens and fuzzy matching against free-text
//! author lists.

/// The first and last token of a full name, as used to build search queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub last: String,
}

impl NameParts {
    /// `"Jennifer G. Dy"` -> `first = "Jennifer"`, `last = "Dy"`.
    ///
    /// A single-token name uses that token for both. Returns `None` for a
    /// blank name.
    pub fn split(full_name: &str) -> Option<Self> {
        let mut tokens = full_name.split_whitespace();
        let first = tokens.next()?;
        let last = tokens.next_back().unwrap_or(first);
        Some(Self {
            first: first.to_string(),
            last: last.to_string(),
        })
    }

    /// `"first last"`.
    pub fn joined(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

/// Normalized tokens of a name: lowercase, split on whitespace and commas,
/// bracketed annotations such as `[US]` removed.
pub fn tokens(name: &str) -> Vec<String> {
    name.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.starts_with('['))
        .map(|t| {
            t.trim_matches(|c: char| !(c.is_alphanumeric() || c == '.' || c == '-' || c == '\''))
                .to_lowercase()
        })
        .filter(|t| !t.is_empty() && t != ".")
        .collect()
}

fn initial(token: &str) -> Option<char> {
    let bare = token.trim_end_matches('.');
    let mut chars = bare.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// Tokens match when equal, or when one is an initial of the other.
fn token_matches(a: &str, b: &str) -> bool {
    if a.trim_end_matches('.') == b.trim_end_matches('.') {
        return true;
    }
    match (initial(a), initial(b)) {
        (Some(i), None) => b.starts_with(i),
        (None, Some(i)) => a.starts_with(i),
        _ => false,
    }
}

fn contained(inner: &[String], outer: &[String]) -> bool {
    !inner.is_empty()
        && inner
            .iter()
            .all(|t| outer.iter().any(|o| token_matches(t, o)))
}

/// Symmetric subset match between two author names.
///
/// Every token of one name must match some token of the other, ignoring case
/// and treating an initial as matching any token that starts with it, so
/// `"J. Dy"` matches `"Jennifer Dy"` and `"Jennifer Dy"` matches
/// `"Jennifer G. Dy"`. Blank names never match.
pub fn is_a_match(a: &str, b: &str) -> bool {
    let a = tokens(a);
    let b = tokens(b);
    contained(&a, &b) || contained(&b, &a)
}

/// Whether any name in `candidates` matches `target`.
pub fn any_match<'a>(target: &str, candidates: impl IntoIterator<Item = &'a str>) -> bool {
    candidates.into_iter().any(|c| is_a_match(target, c))
}

/// Case-insensitive containment of `institution` in `affiliation`.
pub fn affiliation_matches(affiliation: &str, institution: &str) -> bool {
    let institution = institution.trim();
    !institution.is_empty() && affiliation.to_lowercase().contains(&institution.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_uses_first_and_last_token() {
        let parts = NameParts::split("  Jennifer G. Dy ").unwrap();
        assert_eq!(parts.first, "Jennifer");
        assert_eq!(parts.last, "Dy");
        assert_eq!(parts.joined(), "Jennifer Dy");
    }

    #[test]
    fn test_split_single_and_blank() {
        let parts = NameParts::split("Madonna").unwrap();
        assert_eq!(parts.first, "Madonna");
        assert_eq!(parts.last, "Madonna");
        assert!(NameParts::split("   ").is_none());
    }

    #[test]
    fn test_tokens_strip_noise() {
        assert_eq!(tokens("DY, Jennifer [US]"), vec!["dy", "jennifer"]);
        assert_eq!(tokens("Jean-Jacques Slotine"), vec!["jean-jacques", "slotine"]);
        assert_eq!(tokens("J. G. Dy"), vec!["j.", "g.", "dy"]);
    }

    #[test]
    fn test_initial_matches_full_name() {
        assert!(is_a_match("J. Dy", "Jennifer Dy"));
        assert!(is_a_match("Jennifer Dy", "J Dy"));
    }

    #[test]
    fn test_middle_name_subset() {
        assert!(is_a_match("Jennifer Dy", "Jennifer G. Dy"));
        assert!(is_a_match("jennifer g dy", "JENNIFER DY"));
    }

    #[test]
    fn test_reordered_tokens() {
        assert!(is_a_match("Dy, Jennifer", "Jennifer Dy"));
    }

    #[test]
    fn test_mismatch() {
        assert!(!is_a_match("Jennifer Dy", "Jennifer Doe"));
        assert!(!is_a_match("K. Dy", "Jennifer Dy"));
        assert!(!is_a_match("", "Jennifer Dy"));
        assert!(!is_a_match("", ""));
    }

    #[test]
    fn test_match_is_symmetric() {
        let names = [
            "J. Dy",
            "Jennifer Dy",
            "Jennifer G. Dy",
            "Dy",
            "Usama Fayyad",
            "U. M. Fayyad",
            "",
            "Jean-Jacques Slotine",
        ];
        for a in names {
            for b in names {
                assert_eq!(is_a_match(a, b), is_a_match(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_any_match() {
        assert!(any_match("Jennifer Dy", ["Alice Smith", "J. Dy"]));
        assert!(!any_match("Jennifer Dy", ["Alice Smith"]));
    }

    #[test]
    fn test_affiliation_matches() {
        assert!(affiliation_matches(
            "Dept. of ECE, Northeastern University, Boston",
            "northeastern university"
        ));
        assert!(!affiliation_matches("MIT", "Northeastern University"));
        assert!(!affiliation_matches("MIT", "  "));
    }
}

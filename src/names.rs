//! Project and extra names.

use lazy_static::lazy_static;
use regex::Regex;

/// Verify whether a project or extra name is validly formatted
pub fn valid_name(name: &str) -> bool {
    lazy_static! {
        static ref RE: Regex =
            Regex::new(r"^(?i)[a-z0-9]([a-z0-9._-]*[a-z0-9])?$").unwrap();
    }
    RE.is_match(name)
}

/// Normalize a name for comparison: lowercase, with runs of `.`, `-` and
/// `_` collapsed to a single dash. `Scikit_Learn` and `scikit-learn` are
/// the same project.
pub fn normalize_name(name: &str) -> String {
    lazy_static! {
        static ref SEPS: Regex = Regex::new(r"[-_.]+").unwrap();
    }
    SEPS.replace_all(name, "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, valid_name};

    #[test]
    fn test_valid_name() {
        assert!(valid_name("numpy"));
        assert!(valid_name("scikit-learn"));
        assert!(valid_name("zope.interface"));
        assert!(valid_name("A"));
        assert!(valid_name("pkg_2"));
        assert!(!valid_name(""));
        assert!(!valid_name("-numpy"));
        assert!(!valid_name("numpy-"));
        assert!(!valid_name("num py"));
        assert!(!valid_name("num!py"));
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Scikit_Learn"), "scikit-learn");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("pkg---name"), "pkg-name");
        assert_eq!(normalize_name("numpy"), "numpy");
    }
}

//! Single dependency specifiers.
//!
//! One logical manifest line names a project plus optional extras, then
//! either a version constraint expression or a direct URL reference, then
//! an optional environment marker:
//!
//! ```text
//! scikit-learn >= 0.20.0
//! gklearn[plot] (>=0.2, <1.0); python_version >= "3.6"
//! mosek @ https://download.mosek.com/mosek-9.2.zip
//! ```

use crate::names::{normalize_name, valid_name};
use lazy_static::lazy_static;
use pyreq_markers::{Marker, MarkerEnvironment};
use pyreq_version::SpecifierSet;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use url::Url;

#[derive(Debug)]
pub enum Error {
    MissingName(String),
    InvalidName(String),
    InvalidExtra(String),
    EmptyUrl(String),
    InvalidUrl(String, url::ParseError),
    TrailingInput(String, String),
    Version(pyreq_version::Error),
    Marker(pyreq_markers::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingName(line) => write!(f, "no project name in {:?}", line),
            Error::InvalidName(name) => write!(f, "invalid project name {:?}", name),
            Error::InvalidExtra(extra) => write!(f, "invalid extra name {:?}", extra),
            Error::EmptyUrl(line) => write!(f, "missing URL after @ in {:?}", line),
            Error::InvalidUrl(url, e) => write!(f, "invalid URL {:?}: {}", url, e),
            Error::TrailingInput(line, rest) => {
                write!(f, "unexpected trailing input {:?} in {:?}", rest, line)
            }
            Error::Version(e) => write!(f, "{}", e),
            Error::Marker(e) => write!(f, "invalid environment marker: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<pyreq_version::Error> for Error {
    fn from(e: pyreq_version::Error) -> Error {
        Error::Version(e)
    }
}

impl From<pyreq_markers::Error> for Error {
    fn from(e: pyreq_markers::Error) -> Error {
        Error::Marker(e)
    }
}

pub type Result<K> = std::result::Result<K, Error>;

/// Either a version constraint expression (possibly empty) or a direct
/// URL reference; a specifier never carries both.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionOrUrl {
    Specifiers(SpecifierSet),
    Url(Url),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub spec: VersionOrUrl,
    pub marker: Option<Marker>,
}

lazy_static! {
    static ref HEAD_RE: Regex = Regex::new(
        r"^\s*(?P<name>[A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[(?P<extras>[^\]]*)\]\s*)?(?P<rest>.*)$"
    )
    .unwrap();
}

/// Split at the first `;` that sits outside any quoted string.
fn split_marker(s: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                ';' => return (&s[..i], Some(&s[i + 1..])),
                _ => (),
            },
        }
    }
    (s, None)
}

impl Requirement {
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn specifiers(&self) -> Option<&SpecifierSet> {
        match &self.spec {
            VersionOrUrl::Specifiers(specs) => Some(specs),
            VersionOrUrl::Url(_) => None,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.spec {
            VersionOrUrl::Specifiers(_) => None,
            VersionOrUrl::Url(url) => Some(url),
        }
    }

    /// Whether this line is active in `env`. Lines without a marker
    /// always are.
    pub fn evaluate(&self, env: &MarkerEnvironment, extras: &[&str]) -> bool {
        match &self.marker {
            Some(marker) => marker.evaluate(env, extras),
            None => true,
        }
    }
}

impl FromStr for Requirement {
    type Err = Error;

    fn from_str(line: &str) -> Result<Requirement> {
        let caps = HEAD_RE
            .captures(line)
            .ok_or_else(|| Error::MissingName(line.trim().to_string()))?;

        let name = caps["name"].to_string();
        if !valid_name(&name) {
            return Err(Error::InvalidName(name));
        }

        let mut extras = vec![];
        if let Some(m) = caps.name("extras") {
            for extra in m.as_str().split(',') {
                let extra = extra.trim();
                if extra.is_empty() {
                    // "name[]" carries no extras; skip empty positions.
                    continue;
                }
                if !valid_name(extra) {
                    return Err(Error::InvalidExtra(extra.to_string()));
                }
                if !extras.iter().any(|e: &String| e == extra) {
                    extras.push(extra.to_string());
                }
            }
        }

        let rest = caps["rest"].trim();

        if let Some(after_at) = rest.strip_prefix('@') {
            // Direct reference. The URL runs to the next whitespace; an
            // environment marker may follow after a `;`.
            let after_at = after_at.trim_start();
            let (url_str, remainder) = match after_at.find(char::is_whitespace) {
                Some(pos) => (&after_at[..pos], after_at[pos..].trim_start()),
                None => (after_at, ""),
            };
            if url_str.is_empty() {
                return Err(Error::EmptyUrl(line.trim().to_string()));
            }
            let url = Url::parse(url_str)
                .map_err(|e| Error::InvalidUrl(url_str.to_string(), e))?;
            let marker = match remainder.strip_prefix(';') {
                Some(marker_text) => Some(marker_text.parse()?),
                None if remainder.is_empty() => None,
                None => {
                    return Err(Error::TrailingInput(
                        line.trim().to_string(),
                        remainder.to_string(),
                    ))
                }
            };
            return Ok(Requirement {
                name,
                extras,
                spec: VersionOrUrl::Url(url),
                marker,
            });
        }

        let (spec_part, marker_part) = split_marker(rest);
        let specs: SpecifierSet = spec_part.trim().parse()?;
        let marker = match marker_part {
            Some(text) => Some(text.parse()?),
            None => None,
        };
        Ok(Requirement {
            name,
            extras,
            spec: VersionOrUrl::Specifiers(specs),
            marker,
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        match &self.spec {
            VersionOrUrl::Specifiers(specs) => {
                if !specs.is_empty() {
                    write!(f, "{}", specs)?;
                }
                if let Some(marker) = &self.marker {
                    write!(f, "; {}", marker)?;
                }
            }
            VersionOrUrl::Url(url) => {
                write!(f, " @ {}", url)?;
                // The URL runs to the next whitespace, so the marker
                // separator needs one in front of it.
                if let Some(marker) = &self.marker {
                    write!(f, " ; {}", marker)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Requirement, VersionOrUrl};
    use pyreq_markers::MarkerEnvironment;
    use pyreq_version::Version;

    fn req(s: &str) -> Requirement {
        s.parse().unwrap()
    }

    #[test]
    fn test_bare_name() {
        let r = req("networkx");
        assert_eq!(r.name, "networkx");
        assert!(r.extras.is_empty());
        assert!(r.specifiers().unwrap().is_empty());
        assert!(r.marker.is_none());
    }

    #[test]
    fn test_name_and_specifiers() {
        let r = req("scikit-learn >= 0.20.0");
        assert_eq!(r.name, "scikit-learn");
        let specs = r.specifiers().unwrap();
        assert!(specs.matches(&"0.20.0".parse::<Version>().unwrap()));
        assert!(!specs.matches(&"0.19".parse::<Version>().unwrap()));
    }

    #[test]
    fn test_parenthesized_specifiers() {
        let r = req("gklearn (>=0.2, <1.0)");
        assert_eq!(r.specifiers().unwrap().len(), 2);
    }

    #[test]
    fn test_extras() {
        let r = req("gklearn[plot,preimage]>=0.2");
        assert_eq!(r.extras, vec!["plot", "preimage"]);
        // Duplicates collapse, order is kept.
        assert_eq!(req("a[x,y,x]").extras, vec!["x", "y"]);
        assert!(req("a[]").extras.is_empty());
    }

    #[test]
    fn test_marker() {
        let r = req("cvxpy; python_version >= \"3.6\"");
        assert!(r.marker.is_some());
        let mut env = MarkerEnvironment::default();
        env.python_version = "3.6".to_string();
        assert!(r.evaluate(&env, &[]));
        env.python_version = "2.7".to_string();
        assert!(!r.evaluate(&env, &[]));
    }

    #[test]
    fn test_marker_containing_semicolon_in_string() {
        let r = req("pkg; sys_platform == \"a;b\"");
        assert!(r.marker.is_some());
    }

    #[test]
    fn test_direct_reference() {
        let r = req("mosek @ https://download.mosek.com/stable/mosek.tar.bz2");
        assert_eq!(
            r.url().unwrap().as_str(),
            "https://download.mosek.com/stable/mosek.tar.bz2"
        );
        assert!(r.specifiers().is_none());
    }

    #[test]
    fn test_direct_reference_with_marker() {
        let r = req("mosek @ https://example.com/mosek.whl ; python_version >= \"3.6\"");
        assert!(r.url().is_some());
        assert!(r.marker.is_some());
    }

    #[test]
    fn test_errors() {
        match "".parse::<Requirement>() {
            Err(Error::MissingName(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        match ">=1.0".parse::<Requirement>() {
            Err(Error::MissingName(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        match "numpy-".parse::<Requirement>() {
            Err(Error::InvalidName(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        match "a[b!c]".parse::<Requirement>() {
            Err(Error::InvalidExtra(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        match "mosek @".parse::<Requirement>() {
            Err(Error::EmptyUrl(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        match "mosek @ not a url".parse::<Requirement>() {
            Err(Error::InvalidUrl(..)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        match "numpy >= abc".parse::<Requirement>() {
            Err(Error::Version(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        match "numpy; python_version >".parse::<Requirement>() {
            Err(Error::Marker(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(req("Scikit_Learn").normalized_name(), "scikit-learn");
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "numpy>=1.16.2",
            "gklearn[plot,preimage]>=0.2,<1.0",
            "cvxpy; python_version >= \"3.6\"",
            "mosek @ https://example.com/mosek.whl ; python_version >= \"3.6\"",
            "networkx",
        ] {
            let r: Requirement = text.parse().unwrap();
            assert_eq!(r.to_string(), text);
            assert_eq!(r.to_string().parse::<Requirement>().unwrap(), r);
        }
    }

    #[test]
    fn test_url_and_specifiers_are_distinct() {
        let r = req("numpy>=1.0");
        assert!(matches!(r.spec, VersionOrUrl::Specifiers(_)));
        let r = req("numpy @ https://example.com/numpy.whl");
        assert!(matches!(r.spec, VersionOrUrl::Url(_)));
    }
}

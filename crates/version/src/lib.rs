//! The Python version scheme.
//!
//! Versions as they appear in dependency manifests (`1.16.2`, `1.0rc1`,
//! `2.0.dev3+ubuntu.1`). Parsing accepts the scheme's many alternate
//! spellings and normalizes them; comparison follows the scheme's total
//! order, in which dev releases sort before pre-releases, pre-releases
//! before the final release, and post-releases after it.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

mod specifier;
pub use specifier::{Operator, Specifier, SpecifierSet};

#[derive(Debug)]
pub enum Error {
    InvalidVersion(String),
    InvalidSpecifier(String),
    LocalNotAllowed(String),
    WildcardNotAllowed(String),
    CompatibleReleaseTooShort(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidVersion(v) => write!(f, "invalid version: {:?}", v),
            Error::InvalidSpecifier(s) => write!(f, "invalid version specifier: {:?}", s),
            Error::LocalNotAllowed(s) => {
                write!(f, "local version label not allowed with this operator: {:?}", s)
            }
            Error::WildcardNotAllowed(s) => {
                write!(f, "wildcard only allowed with == and !=: {:?}", s)
            }
            Error::CompatibleReleaseTooShort(s) => {
                write!(f, "~= requires at least two release segments: {:?}", s)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<K> = std::result::Result<K, Error>;

lazy_static! {
    // One pattern for the whole scheme, alternate spellings included.
    static ref VERSION_RE: Regex = Regex::new(
        r"(?i)^\s*v?(?:(?P<epoch>[0-9]+)!)?(?P<release>[0-9]+(?:\.[0-9]+)*)(?:[-_\.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_\.]?(?P<pre_n>[0-9]+)?)?(?:(?:-(?P<post_n1>[0-9]+))|(?:[-_\.]?(?P<post_l>post|rev|r)[-_\.]?(?P<post_n2>[0-9]+)?))?(?:[-_\.]?(?P<dev_l>dev)[-_\.]?(?P<dev_n>[0-9]+)?)?(?:\+(?P<local>[a-z0-9]+(?:[-_\.][a-z0-9]+)*))?\s*$"
    )
    .unwrap();
}

/// Pre-release phase, in sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha,
    Beta,
    Rc,
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PreRelease::Alpha => write!(f, "a"),
            PreRelease::Beta => write!(f, "b"),
            PreRelease::Rc => write!(f, "rc"),
        }
    }
}

/// One dot-separated segment of a local version label.
///
/// Numeric segments outrank alphanumeric ones, so the variant order here
/// is significant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocalSegment {
    Str(String),
    Num(u64),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LocalSegment::Str(s) => write!(f, "{}", s),
            LocalSegment::Num(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Version {
    epoch: u32,
    release: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

// Comparison keys. A dev-only release sorts before any pre-release of the
// same release tuple, a missing dev segment sorts after any present one.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum PreKey {
    DevOnly,
    Pre(PreRelease, u64),
    Final,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum DevKey {
    Dev(u64),
    Final,
}

impl Version {
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre(&self) -> Option<(PreRelease, u64)> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    pub fn local(&self) -> &[LocalSegment] {
        &self.local
    }

    /// A dev or pre-release segment makes the version a pre-release.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn has_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// The version without its local label.
    pub fn public(&self) -> Version {
        Version {
            local: vec![],
            ..self.clone()
        }
    }

    /// Epoch and release segments only.
    pub fn base_version(&self) -> Version {
        Version {
            epoch: self.epoch,
            release: self.release.clone(),
            pre: None,
            post: None,
            dev: None,
            local: vec![],
        }
    }

    /// Release segment at `idx`, zero-padded past the end.
    pub fn release_at(&self, idx: usize) -> u64 {
        self.release.get(idx).copied().unwrap_or(0)
    }

    fn cmp_key(&self) -> (u32, &[u64], PreKey, Option<u64>, DevKey, &[LocalSegment]) {
        // Trailing zeros never separate versions: 1.0 == 1.0.0.
        let mut len = self.release.len();
        while len > 0 && self.release[len - 1] == 0 {
            len -= 1;
        }
        let pre = match (self.pre, self.post, self.dev) {
            (Some((phase, n)), _, _) => PreKey::Pre(phase, n),
            (None, None, Some(_)) => PreKey::DevOnly,
            (None, _, _) => PreKey::Final,
        };
        let dev = match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Final,
        };
        (
            self.epoch,
            &self.release[..len],
            pre,
            self.post,
            dev,
            &self.local,
        )
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Version) -> bool {
        self.cmp_key() == other.cmp_key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Version) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Version) -> std::cmp::Ordering {
        self.cmp_key().cmp(&other.cmp_key())
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cmp_key().hash(state);
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Version> {
        let caps = VERSION_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;
        let invalid = || Error::InvalidVersion(s.to_string());

        let epoch = match caps.name("epoch") {
            Some(m) => m.as_str().parse().map_err(|_| invalid())?,
            None => 0,
        };
        let release = caps["release"]
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<u64>>>()?;

        let pre = match caps.name("pre_l") {
            Some(m) => {
                let phase = match m.as_str().to_ascii_lowercase().as_str() {
                    "a" | "alpha" => PreRelease::Alpha,
                    "b" | "beta" => PreRelease::Beta,
                    _ => PreRelease::Rc,
                };
                if m.as_str().len() > 2 {
                    debug!("normalizing pre-release spelling {:?} in {:?}", m.as_str(), s);
                }
                let n = match caps.name("pre_n") {
                    Some(m) => m.as_str().parse().map_err(|_| invalid())?,
                    None => 0,
                };
                Some((phase, n))
            }
            None => None,
        };

        let post = if let Some(m) = caps.name("post_n1") {
            Some(m.as_str().parse().map_err(|_| invalid())?)
        } else if caps.name("post_l").is_some() {
            Some(match caps.name("post_n2") {
                Some(m) => m.as_str().parse().map_err(|_| invalid())?,
                None => 0,
            })
        } else {
            None
        };

        let dev = if caps.name("dev_l").is_some() {
            Some(match caps.name("dev_n") {
                Some(m) => m.as_str().parse().map_err(|_| invalid())?,
                None => 0,
            })
        } else {
            None
        };

        let local = match caps.name("local") {
            Some(m) => m
                .as_str()
                .to_ascii_lowercase()
                .split(['-', '_', '.'])
                .map(|seg| match seg.parse::<u64>() {
                    Ok(n) => LocalSegment::Num(n),
                    Err(_) => LocalSegment::Str(seg.to_string()),
                })
                .collect(),
            None => vec![],
        };

        Ok(Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((phase, n)) = self.pre {
            write!(f, "{}{}", phase, n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        if !self.local.is_empty() {
            let local: Vec<String> = self.local.iter().map(|s| s.to_string()).collect();
            write!(f, "+{}", local.join("."))?;
        }
        Ok(())
    }
}

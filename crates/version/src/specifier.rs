//! Version specifiers: a comparison operator and a version, as written in
//! manifest constraints (`>=1.16.2`, `~=2.2`, `==1.4.*`, `===zip-1981`).

use crate::{Error, Result, Version};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Compatible,
    Equal,
    NotEqual,
    LessEq,
    GreaterEq,
    Less,
    Greater,
    ArbitraryEqual,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Compatible => "~=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEq => "<=",
            Operator::GreaterEq => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::ArbitraryEqual => "===",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Specifier {
    op: Operator,
    // Parsed for every operator except ===, which compares literally.
    version: Option<Version>,
    text: String,
    wildcard: bool,
}

lazy_static! {
    static ref SPECIFIER_RE: Regex =
        Regex::new(r"^\s*(===|==|!=|~=|<=|>=|<|>)\s*(.*?)\s*$").unwrap();
}

impl Specifier {
    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether the written version is a pre-release, which widens the
    /// default admission policy of the containing set.
    pub fn mentions_prerelease(&self) -> bool {
        match &self.version {
            Some(v) => v.is_prerelease(),
            // === takes an arbitrary string; look at it only if it happens
            // to parse.
            None => Version::from_str(&self.text)
                .map(|v| v.is_prerelease())
                .unwrap_or(false),
        }
    }

    pub fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            Operator::ArbitraryEqual => candidate
                .to_string()
                .eq_ignore_ascii_case(&self.text),
            Operator::Equal => self.matches_equal(candidate),
            Operator::NotEqual => !self.matches_equal(candidate),
            Operator::LessEq => candidate.public() <= *self.spec_version(),
            Operator::GreaterEq => candidate.public() >= *self.spec_version(),
            Operator::Less => self.matches_less(candidate),
            Operator::Greater => self.matches_greater(candidate),
            Operator::Compatible => self.matches_compatible(candidate),
        }
    }

    fn spec_version(&self) -> &Version {
        // Only === carries no parsed version, and it never reaches here.
        self.version.as_ref().unwrap()
    }

    fn matches_equal(&self, candidate: &Version) -> bool {
        let spec = self.spec_version();
        if self.wildcard {
            return prefix_match(candidate, spec.epoch(), spec.release());
        }
        if spec.has_local() {
            candidate == spec
        } else {
            candidate.public() == *spec
        }
    }

    // An exclusive upper bound does not admit pre-releases of the bound
    // itself unless the bound is written as one.
    fn matches_less(&self, candidate: &Version) -> bool {
        let spec = self.spec_version();
        let public = candidate.public();
        if public >= *spec {
            return false;
        }
        if !spec.is_prerelease()
            && public.is_prerelease()
            && public.base_version() == spec.base_version()
        {
            return false;
        }
        true
    }

    // Likewise an exclusive lower bound does not admit post-releases or
    // local variants of the bound itself.
    fn matches_greater(&self, candidate: &Version) -> bool {
        let spec = self.spec_version();
        let public = candidate.public();
        if public <= *spec {
            return false;
        }
        if public.base_version() == spec.base_version() {
            if !spec.is_postrelease() && public.is_postrelease() {
                return false;
            }
            if candidate.has_local() {
                return false;
            }
        }
        true
    }

    fn matches_compatible(&self, candidate: &Version) -> bool {
        let spec = self.spec_version();
        if candidate.public() < *spec {
            return false;
        }
        // ~=X.Y.Z means >=X.Y.Z together with ==X.Y.*.
        let prefix = &spec.release()[..spec.release().len() - 1];
        prefix_match(candidate, spec.epoch(), prefix)
    }
}

/// Compare epoch and the zero-padded leading release segments; anything
/// past the written prefix, pre/post/dev included, is ignored.
fn prefix_match(candidate: &Version, epoch: u32, prefix: &[u64]) -> bool {
    if candidate.epoch() != epoch {
        return false;
    }
    prefix
        .iter()
        .enumerate()
        .all(|(i, &seg)| candidate.release_at(i) == seg)
}

impl FromStr for Specifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Specifier> {
        let caps = SPECIFIER_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidSpecifier(s.to_string()))?;
        let op = match &caps[1] {
            "~=" => Operator::Compatible,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<=" => Operator::LessEq,
            ">=" => Operator::GreaterEq,
            "<" => Operator::Less,
            ">" => Operator::Greater,
            "===" => Operator::ArbitraryEqual,
            _ => unreachable!(),
        };
        let text = caps[2].to_string();
        if text.is_empty() {
            return Err(Error::InvalidSpecifier(s.to_string()));
        }

        if op == Operator::ArbitraryEqual {
            return Ok(Specifier {
                op,
                version: None,
                text,
                wildcard: false,
            });
        }

        if let Some(prefix) = text.strip_suffix(".*") {
            if op != Operator::Equal && op != Operator::NotEqual {
                return Err(Error::WildcardNotAllowed(s.to_string()));
            }
            let version: Version = prefix.parse()?;
            if version.pre().is_some()
                || version.post().is_some()
                || version.dev().is_some()
                || version.has_local()
            {
                return Err(Error::InvalidSpecifier(s.to_string()));
            }
            return Ok(Specifier {
                op,
                version: Some(version),
                text,
                wildcard: true,
            });
        }

        let version: Version = text.parse()?;
        if version.has_local() && op != Operator::Equal && op != Operator::NotEqual {
            return Err(Error::LocalNotAllowed(s.to_string()));
        }
        if op == Operator::Compatible && version.release().len() < 2 {
            return Err(Error::CompatibleReleaseTooShort(s.to_string()));
        }
        Ok(Specifier {
            op,
            version: Some(version),
            text,
            wildcard: false,
        })
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.version {
            Some(v) => {
                write!(f, "{}{}", self.op, v)?;
                if self.wildcard {
                    write!(f, ".*")?;
                }
                Ok(())
            }
            None => write!(f, "{}{}", self.op, self.text),
        }
    }
}

/// A comma-separated conjunction of specifiers: `>=1.0,<2.0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecifierSet {
    specs: Vec<Specifier>,
}

impl SpecifierSet {
    pub fn new() -> SpecifierSet {
        SpecifierSet { specs: vec![] }
    }

    pub fn push(&mut self, spec: Specifier) {
        self.specs.push(spec);
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Specifier> {
        self.specs.iter()
    }

    /// Pre-release versions are only admitted by default when some member
    /// specifier is itself written against one.
    pub fn allows_prereleases(&self) -> bool {
        self.specs.iter().any(|s| s.mentions_prerelease())
    }

    pub fn matches(&self, candidate: &Version) -> bool {
        self.matches_with(candidate, None)
    }

    pub fn matches_with(&self, candidate: &Version, prereleases: Option<bool>) -> bool {
        let allowed = prereleases.unwrap_or_else(|| self.allows_prereleases());
        if candidate.is_prerelease() && !allowed {
            return false;
        }
        self.specs.iter().all(|s| s.matches(candidate))
    }
}

impl FromStr for SpecifierSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<SpecifierSet> {
        let mut inner = s.trim();
        // Requirement lines may parenthesize the whole set.
        if let Some(stripped) = inner.strip_prefix('(') {
            inner = stripped
                .strip_suffix(')')
                .ok_or_else(|| Error::InvalidSpecifier(s.to_string()))?
                .trim();
        }
        if inner.is_empty() {
            return Ok(SpecifierSet::new());
        }
        let specs = inner
            .split(',')
            .map(|part| {
                if part.trim().is_empty() {
                    Err(Error::InvalidSpecifier(s.to_string()))
                } else {
                    part.parse()
                }
            })
            .collect::<Result<Vec<Specifier>>>()?;
        Ok(SpecifierSet { specs })
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let specs: Vec<String> = self.specs.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", specs.join(","))
    }
}

//! Reading and writing manifest files.
//!
//! A manifest is consumed one logical line at a time: physical lines
//! joined on trailing backslashes, `#` comments stripped, blank lines
//! skipped. What remains is either a dependency specifier (optionally
//! carrying `--hash` options), an include of another manifest or
//! constraints file, an editable target, or an installer option.
//!
//! Reading resolves includes: entries from included files appear in the
//! entry stream with their own [`Origin`]. Writing emits the lines of the
//! root file only, so a read/write pair round-trips one file rather than
//! flattening a whole tree into it.

use crate::requirement::{self, Requirement};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum Error {
    Io(PathBuf, std::io::Error),
    Requirement(requirement::Error),
    UnknownOption(String),
    MissingOptionValue(String),
    UnexpectedOptionValue(String),
    InvalidHash(String),
    HashWithoutRequirement,
    IncludeCycle(PathBuf),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            Error::Requirement(e) => write!(f, "{}", e),
            Error::UnknownOption(flag) => write!(f, "unknown option {:?}", flag),
            Error::MissingOptionValue(flag) => write!(f, "option {} needs a value", flag),
            Error::UnexpectedOptionValue(line) => {
                write!(f, "unexpected trailing input on option line {:?}", line)
            }
            Error::InvalidHash(text) => {
                write!(f, "invalid --hash value {:?}, expected algorithm:digest", text)
            }
            Error::HashWithoutRequirement => {
                write!(f, "--hash is only valid after a dependency specifier")
            }
            Error::IncludeCycle(path) => {
                write!(f, "include cycle through {}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<requirement::Error> for Error {
    fn from(e: requirement::Error) -> Error {
        Error::Requirement(e)
    }
}

/// Where an entry or problem came from: file and first physical line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub file: PathBuf,
    pub line: u32,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// One logical line that failed to parse.
#[derive(Debug)]
pub struct Diagnostic {
    pub origin: Origin,
    pub text: String,
    pub error: Error,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.error)
    }
}

/// Installer options that may appear on their own line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    IndexUrl,
    ExtraIndexUrl,
    NoIndex,
    FindLinks,
    NoBinary,
    OnlyBinary,
    PreferBinary,
    Pre,
    TrustedHost,
    RequireHashes,
}

impl OptionKind {
    pub fn flag(&self) -> &'static str {
        match self {
            OptionKind::IndexUrl => "--index-url",
            OptionKind::ExtraIndexUrl => "--extra-index-url",
            OptionKind::NoIndex => "--no-index",
            OptionKind::FindLinks => "--find-links",
            OptionKind::NoBinary => "--no-binary",
            OptionKind::OnlyBinary => "--only-binary",
            OptionKind::PreferBinary => "--prefer-binary",
            OptionKind::Pre => "--pre",
            OptionKind::TrustedHost => "--trusted-host",
            OptionKind::RequireHashes => "--require-hashes",
        }
    }

    fn takes_value(&self) -> bool {
        matches!(
            self,
            OptionKind::IndexUrl
                | OptionKind::ExtraIndexUrl
                | OptionKind::FindLinks
                | OptionKind::NoBinary
                | OptionKind::OnlyBinary
                | OptionKind::TrustedHost
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    pub kind: OptionKind,
    pub value: Option<String>,
    pub origin: Origin,
}

/// A dependency specifier with its per-line `--hash` options.
#[derive(Debug, Clone, PartialEq)]
pub struct ReqEntry {
    pub requirement: Requirement,
    pub hashes: Vec<(String, String)>,
    /// True for lines read out of a constraints file.
    pub constraint: bool,
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Requirement(ReqEntry),
    Editable { target: String, origin: Origin },
    Include { path: PathBuf, constraints_only: bool, origin: Origin },
    Option(OptionEntry),
}

impl Entry {
    pub fn origin(&self) -> &Origin {
        match self {
            Entry::Requirement(req) => &req.origin,
            Entry::Editable { origin, .. } => origin,
            Entry::Include { origin, .. } => origin,
            Entry::Option(opt) => &opt.origin,
        }
    }

    fn to_line(&self) -> String {
        match self {
            Entry::Requirement(req) => {
                let mut line = req.requirement.to_string();
                for (algorithm, digest) in &req.hashes {
                    line.push_str(&format!(" --hash={}:{}", algorithm, digest));
                }
                line
            }
            Entry::Editable { target, .. } => format!("-e {}", target),
            Entry::Include { path, constraints_only, .. } => {
                let flag = if *constraints_only { "-c" } else { "-r" };
                format!("{} {}", flag, path.display())
            }
            Entry::Option(opt) => match &opt.value {
                Some(value) => format!("{} {}", opt.kind.flag(), value),
                None => opt.kind.flag().to_string(),
            },
        }
    }
}

lazy_static! {
    // A comment runs from a # at line start, or preceded by whitespace,
    // to the end of the line. A # inside a URL fragment survives.
    static ref COMMENT_RE: Regex = Regex::new(r"(^|\s)#.*$").unwrap();
    static ref ENV_VAR_RE: Regex = Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap();
    static ref HASH_SPLIT_RE: Regex = Regex::new(r"\s--hash(=|\s)").unwrap();
}

/// Join continuations and strip comments, yielding (first physical line
/// number, logical line) pairs for everything non-blank.
fn logical_lines(text: &str) -> Vec<(u32, String)> {
    let mut result = vec![];
    let mut buffer = String::new();
    let mut start_line = 0u32;
    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx as u32 + 1;
        if buffer.is_empty() {
            start_line = lineno;
        }
        if let Some(stripped) = raw.strip_suffix('\\') {
            buffer.push_str(stripped);
            continue;
        }
        buffer.push_str(raw);
        let logical = COMMENT_RE.replace(&buffer, "").trim().to_string();
        buffer.clear();
        if !logical.is_empty() {
            result.push((start_line, logical));
        }
    }
    if !buffer.is_empty() {
        // Trailing backslash on the last line; take what accumulated.
        let logical = COMMENT_RE.replace(&buffer, "").trim().to_string();
        if !logical.is_empty() {
            result.push((start_line, logical));
        }
    }
    result
}

fn expand_env_vars(line: &str) -> String {
    ENV_VAR_RE
        .replace_all(line, |caps: &regex::Captures| {
            match std::env::var(&caps[1]) {
                Ok(value) => value,
                Err(_) => {
                    debug!("environment variable {} is not set, keeping {}", &caps[1], &caps[0]);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

fn parse_hash(text: &str) -> Result<(String, String), Error> {
    let (algorithm, digest) = text
        .split_once(':')
        .ok_or_else(|| Error::InvalidHash(text.to_string()))?;
    if algorithm.is_empty()
        || digest.is_empty()
        || !digest.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(Error::InvalidHash(text.to_string()));
    }
    Ok((algorithm.to_lowercase(), digest.to_lowercase()))
}

struct Reader {
    // Canonical paths currently being read, for cycle detection.
    stack: Vec<PathBuf>,
    entries: Vec<Entry>,
    diagnostics: Vec<Diagnostic>,
}

impl Reader {
    fn new() -> Reader {
        Reader {
            stack: vec![],
            entries: vec![],
            diagnostics: vec![],
        }
    }

    fn fail(&mut self, origin: Origin, text: &str, error: Error) {
        self.diagnostics.push(Diagnostic {
            origin,
            text: text.to_string(),
            error,
        });
    }

    fn read_path(&mut self, path: &Path, constraints_only: bool, include_origin: Option<Origin>) {
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.stack.contains(&canonical) {
            let origin = include_origin.unwrap_or(Origin {
                file: path.to_path_buf(),
                line: 0,
            });
            self.fail(origin, "", Error::IncludeCycle(path.to_path_buf()));
            return;
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                let origin = include_origin.unwrap_or(Origin {
                    file: path.to_path_buf(),
                    line: 0,
                });
                self.fail(origin, "", Error::Io(path.to_path_buf(), e));
                return;
            }
        };
        self.stack.push(canonical);
        for (lineno, logical) in logical_lines(&text) {
            let origin = Origin {
                file: path.to_path_buf(),
                line: lineno,
            };
            let line = expand_env_vars(&logical);
            if line.starts_with('-') {
                self.handle_option_line(&line, origin, path, constraints_only);
            } else {
                self.handle_requirement_line(&line, origin, constraints_only);
            }
        }
        self.stack.pop();
    }

    fn handle_requirement_line(&mut self, line: &str, origin: Origin, constraint: bool) {
        let (req_part, hashes) = match HASH_SPLIT_RE.find(line) {
            Some(m) => {
                let mut hashes = vec![];
                for token in line[m.start()..].split_whitespace() {
                    let value = match token.strip_prefix("--hash=") {
                        Some(value) => value,
                        None if token == "--hash" => continue,
                        None => token,
                    };
                    match parse_hash(value) {
                        Ok(hash) => hashes.push(hash),
                        Err(e) => {
                            self.fail(origin.clone(), line, e);
                            return;
                        }
                    }
                }
                (&line[..m.start()], hashes)
            }
            None => (line, vec![]),
        };
        match req_part.parse::<Requirement>() {
            Ok(requirement) => self.entries.push(Entry::Requirement(ReqEntry {
                requirement,
                hashes,
                constraint,
                origin,
            })),
            Err(e) => self.fail(origin, line, e.into()),
        }
    }

    fn handle_option_line(
        &mut self,
        line: &str,
        origin: Origin,
        current: &Path,
        constraints_only: bool,
    ) {
        let mut tokens = line.split_whitespace();
        let first = tokens.next().unwrap();
        let (flag, inline_value) = match first.split_once('=') {
            Some((flag, value)) => (flag, Some(value.to_string())),
            None => (first, None),
        };

        // Includes and editables take the rest of the line so values may
        // contain spaces.
        let rest = line[first.len()..].trim();
        match flag {
            "-r" | "--requirement" | "-c" | "--constraint" => {
                let target = match inline_value {
                    Some(value) => value,
                    None if !rest.is_empty() => rest.to_string(),
                    None => {
                        self.fail(origin, line, Error::MissingOptionValue(flag.to_string()));
                        return;
                    }
                };
                let constraints = flag == "-c" || flag == "--constraint";
                let target_path = PathBuf::from(&target);
                let resolved = if target_path.is_absolute() {
                    target_path.clone()
                } else {
                    current
                        .parent()
                        .unwrap_or_else(|| Path::new("."))
                        .join(&target_path)
                };
                self.entries.push(Entry::Include {
                    path: target_path,
                    constraints_only: constraints,
                    origin: origin.clone(),
                });
                self.read_path(&resolved, constraints || constraints_only, Some(origin));
                return;
            }
            "-e" | "--editable" => {
                let target = match inline_value {
                    Some(value) => value,
                    None if !rest.is_empty() => rest.to_string(),
                    None => {
                        self.fail(origin, line, Error::MissingOptionValue(flag.to_string()));
                        return;
                    }
                };
                if constraints_only {
                    warn!("{}: editable target in a constraints file", origin);
                }
                self.entries.push(Entry::Editable { target, origin });
                return;
            }
            "--hash" => {
                self.fail(origin, line, Error::HashWithoutRequirement);
                return;
            }
            _ => (),
        }

        let kind = match flag {
            "-i" | "--index-url" => OptionKind::IndexUrl,
            "--extra-index-url" => OptionKind::ExtraIndexUrl,
            "--no-index" => OptionKind::NoIndex,
            "-f" | "--find-links" => OptionKind::FindLinks,
            "--no-binary" => OptionKind::NoBinary,
            "--only-binary" => OptionKind::OnlyBinary,
            "--prefer-binary" => OptionKind::PreferBinary,
            "--pre" => OptionKind::Pre,
            "--trusted-host" => OptionKind::TrustedHost,
            "--require-hashes" => OptionKind::RequireHashes,
            _ => {
                self.fail(origin, line, Error::UnknownOption(flag.to_string()));
                return;
            }
        };

        let value = match inline_value {
            Some(value) => Some(value),
            None => tokens.next().map(|t| t.to_string()),
        };
        if tokens.next().is_some() {
            self.fail(origin, line, Error::UnexpectedOptionValue(line.to_string()));
            return;
        }
        if kind.takes_value() && value.is_none() {
            self.fail(origin, line, Error::MissingOptionValue(flag.to_string()));
            return;
        }
        if !kind.takes_value() && value.is_some() {
            self.fail(origin, line, Error::UnexpectedOptionValue(line.to_string()));
            return;
        }
        self.entries.push(Entry::Option(OptionEntry { kind, value, origin }));
    }
}

/// An ordered view of one manifest file and everything it includes.
#[derive(Debug)]
pub struct Manifest {
    root: PathBuf,
    entries: Vec<Entry>,
}

impl Manifest {
    /// Read `path` strictly: the first malformed logical line is an error.
    pub fn read(path: impl AsRef<Path>) -> Result<Manifest, Diagnostic> {
        let path = path.as_ref();
        let mut reader = Reader::new();
        reader.read_path(path, false, None);
        if reader.diagnostics.is_empty() {
            Ok(Manifest {
                root: path.to_path_buf(),
                entries: reader.entries,
            })
        } else {
            Err(reader.diagnostics.remove(0))
        }
    }

    /// Parse every logical line of `path` (and of everything it
    /// includes), collecting one diagnostic per line that is not a valid
    /// dependency specifier, include, or option. An empty result means
    /// the whole manifest parses.
    pub fn check(path: impl AsRef<Path>) -> Vec<Diagnostic> {
        let mut reader = Reader::new();
        reader.read_path(path.as_ref(), false, None);
        reader.diagnostics
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Dependency entries in file order, constraints excluded.
    pub fn requirements(&self) -> impl Iterator<Item = &ReqEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Requirement(req) if !req.constraint => Some(req),
            _ => None,
        })
    }

    /// Entries read out of constraints files.
    pub fn constraints(&self) -> impl Iterator<Item = &ReqEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Requirement(req) if req.constraint => Some(req),
            _ => None,
        })
    }

    /// Write the root file's lines back out. Included files keep their
    /// `-r`/`-c` references and are not inlined.
    pub fn write_to<W: Write>(&self, to_file: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            if entry.origin().file != self.root {
                continue;
            }
            to_file.write_all(entry.to_line().as_bytes())?;
            to_file.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut out = vec![];
        // Writing to a Vec cannot fail.
        self.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::{Entry, Error, Manifest, OptionKind};
    use std::fs;
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const MANIFEST: &str = "\
# numeric stack
numpy>=1.16.2
scipy>=1.1.0
matplotlib>=3.1.0
networkx>=2.2
scikit-learn>=0.20.0

cvxpy>=1.0.31; python_version >= \"3.6\" # for preimage
cvxopt>=1.2.5 # for preimage
mosek>=9.2 # for preimage
";

    #[test]
    fn test_read_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "requirements.txt", MANIFEST);
        let manifest = Manifest::read(&path).unwrap();
        let names: Vec<String> = manifest
            .requirements()
            .map(|req| req.requirement.name.clone())
            .collect();
        assert_eq!(
            names,
            vec![
                "numpy",
                "scipy",
                "matplotlib",
                "networkx",
                "scikit-learn",
                "cvxpy",
                "cvxopt",
                "mosek"
            ]
        );
        // Comment-only and blank lines produce no entries; the marker
        // survives on the cvxpy line.
        let cvxpy = manifest
            .requirements()
            .find(|req| req.requirement.name == "cvxpy")
            .unwrap();
        assert!(cvxpy.requirement.marker.is_some());
        assert_eq!(cvxpy.origin.line, 8);
    }

    #[test]
    fn test_check_clean_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "requirements.txt", MANIFEST);
        assert!(Manifest::check(&path).is_empty());
    }

    #[test]
    fn test_check_reports_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "requirements.txt",
            "numpy>=1.16.2\nscipy >= oops\n\n==1.0\n",
        );
        let diagnostics = Manifest::check(&path);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].origin.line, 2);
        assert_eq!(diagnostics[1].origin.line, 4);
        assert!(matches!(diagnostics[0].error, Error::Requirement(_)));
    }

    #[test]
    fn test_continuation_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "requirements.txt",
            "scikit-learn >= \\\n0.20.0\nnumpy\n",
        );
        let manifest = Manifest::read(&path).unwrap();
        let entries: Vec<_> = manifest.requirements().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].requirement.name, "scikit-learn");
        assert_eq!(entries[0].origin.line, 1);
        assert_eq!(entries[1].origin.line, 3);
    }

    #[test]
    fn test_inline_comment_needs_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "requirements.txt",
            "cvxopt>=1.2.5 # for preimage\npkg @ https://example.com/p.whl#sha=abc\n",
        );
        let manifest = Manifest::read(&path).unwrap();
        let entries: Vec<_> = manifest.requirements().collect();
        assert!(entries[0].requirement.specifiers().is_some());
        // The fragment is glued to the URL, so it is not a comment.
        assert!(entries[1]
            .requirement
            .url()
            .unwrap()
            .as_str()
            .contains("#sha=abc"));
    }

    #[test]
    fn test_environment_variable_interpolation() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("PYREQ_TEST_MIN_NUMPY", "1.16.2");
        let path = write(
            dir.path(),
            "requirements.txt",
            "numpy>=${PYREQ_TEST_MIN_NUMPY}\npkg>=${PYREQ_TEST_UNSET_1234}\n",
        );
        let diagnostics = Manifest::check(&path);
        // The set variable expands into a valid line, the unset one is
        // left as written and fails to parse.
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].origin.line, 2);
    }

    #[test]
    fn test_option_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "requirements.txt",
            "--index-url https://pypi.example.com/simple\n--no-index\n-f=./wheels\n--pre\nnumpy\n",
        );
        let manifest = Manifest::read(&path).unwrap();
        let options: Vec<_> = manifest
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Option(opt) => Some(opt),
                _ => None,
            })
            .collect();
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].kind, OptionKind::IndexUrl);
        assert_eq!(
            options[0].value.as_deref(),
            Some("https://pypi.example.com/simple")
        );
        assert_eq!(options[1].kind, OptionKind::NoIndex);
        assert_eq!(options[2].kind, OptionKind::FindLinks);
        assert_eq!(options[2].value.as_deref(), Some("./wheels"));
        assert_eq!(options[3].kind, OptionKind::Pre);
    }

    #[test]
    fn test_option_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "requirements.txt",
            "--frobnicate\n--index-url\n--no-index yes\n--hash=sha256:abcd\n",
        );
        let diagnostics = Manifest::check(&path);
        assert_eq!(diagnostics.len(), 4);
        assert!(matches!(diagnostics[0].error, Error::UnknownOption(_)));
        assert!(matches!(diagnostics[1].error, Error::MissingOptionValue(_)));
        assert!(matches!(diagnostics[2].error, Error::UnexpectedOptionValue(_)));
        assert!(matches!(diagnostics[3].error, Error::HashWithoutRequirement));
    }

    #[test]
    fn test_editable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "requirements.txt",
            "-e ./src/gklearn\n--editable git+https://example.com/repo.git#egg=pkg\n",
        );
        let manifest = Manifest::read(&path).unwrap();
        let targets: Vec<_> = manifest
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Editable { target, .. } => Some(target.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            targets,
            vec!["./src/gklearn", "git+https://example.com/repo.git#egg=pkg"]
        );
    }

    #[test]
    fn test_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "requirements.txt",
            "numpy==1.16.2 --hash=sha256:00ff --hash=sha384:abcd\nscipy==1.1.0 --hash=sha256:xyz\n",
        );
        let diagnostics = Manifest::check(&path);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0].error, Error::InvalidHash(_)));

        let path = write(
            dir.path(),
            "good.txt",
            "numpy==1.16.2 --hash=sha256:00ff --hash=sha384:abcd\n",
        );
        let manifest = Manifest::read(&path).unwrap();
        let entry = manifest.requirements().next().unwrap();
        assert_eq!(
            entry.hashes,
            vec![
                ("sha256".to_string(), "00ff".to_string()),
                ("sha384".to_string(), "abcd".to_string())
            ]
        );
    }

    #[test]
    fn test_includes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base.txt", "numpy>=1.16.2\n");
        write(dir.path(), "constraints.txt", "scipy==1.1.0\n");
        let path = write(
            dir.path(),
            "requirements.txt",
            "-r base.txt\n-c constraints.txt\nnetworkx>=2.2\n",
        );
        let manifest = Manifest::read(&path).unwrap();

        let names: Vec<_> = manifest
            .requirements()
            .map(|req| req.requirement.name.as_str())
            .collect();
        assert_eq!(names, vec!["numpy", "networkx"]);
        let constraints: Vec<_> = manifest
            .constraints()
            .map(|req| req.requirement.name.as_str())
            .collect();
        assert_eq!(constraints, vec!["scipy"]);

        // Included entries carry the included file's origin.
        let numpy = manifest.requirements().next().unwrap();
        assert!(numpy.origin.file.ends_with("base.txt"));
    }

    #[test]
    fn test_include_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "-r b.txt\n");
        write(dir.path(), "b.txt", "-r a.txt\n");
        let diagnostics = Manifest::check(dir.path().join("a.txt"));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0].error, Error::IncludeCycle(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let diagnostics = Manifest::check(dir.path().join("nope.txt"));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0].error, Error::Io(..)));

        write(dir.path(), "a.txt", "-r nope.txt\n");
        let diagnostics = Manifest::check(dir.path().join("a.txt"));
        assert_eq!(diagnostics.len(), 1);
        // The diagnostic points at the include line.
        assert_eq!(diagnostics[0].origin.line, 1);
        assert!(diagnostics[0].origin.file.ends_with("a.txt"));
    }

    #[test]
    fn test_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base.txt", "numpy>=1.16.2\n");
        let path = write(
            dir.path(),
            "requirements.txt",
            "-r base.txt\n--no-index\nscikit-learn >= 0.20.0   # trailing comment\ncvxpy; python_version >= \"3.6\"\n",
        );
        let manifest = Manifest::read(&path).unwrap();
        assert_eq!(
            manifest.to_text(),
            "-r base.txt\n--no-index\nscikit-learn>=0.20.0\ncvxpy; python_version >= \"3.6\"\n"
        );
    }

    #[test]
    fn test_empty_and_comment_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "requirements.txt", "# nothing\n\n   \n");
        let manifest = Manifest::read(&path).unwrap();
        assert!(manifest.entries().is_empty());
        assert!(Manifest::check(&path).is_empty());
    }
}

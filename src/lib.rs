//! Parsing, validation and evaluation of Python dependency manifests.
//!
//! A manifest lists one dependency specifier per line (`numpy>=1.16.2`,
//! `cvxpy; python_version >= "3.6"`), mixed with comments, blank lines,
//! include directives and installer options. This crate parses single
//! specifiers ([`Requirement`]), whole files ([`Manifest`]), checks that
//! every non-comment, non-blank line is well formed, and serializes
//! manifests back out.
//!
//! # Example
//!
//! ```
//! use pyreq::Requirement;
//!
//! let req: Requirement = "scikit-learn>=0.20.0".parse().unwrap();
//! assert_eq!(req.normalized_name(), "scikit-learn");
//! ```

pub mod names;
pub mod reqfile;
pub mod requirement;

pub use names::{normalize_name, valid_name};
pub use reqfile::{Diagnostic, Entry, Manifest, OptionEntry, OptionKind, Origin, ReqEntry};
pub use requirement::{Requirement, VersionOrUrl};

pub use pyreq_markers::{Marker, MarkerEnvironment};
pub use pyreq_version::{Specifier, SpecifierSet, Version};

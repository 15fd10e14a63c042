//! Command line front-end: validate and inspect dependency manifests.

use clap::{Parser, Subcommand};
use pyreq::{Manifest, MarkerEnvironment, Origin};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "pyreq",
    version,
    about = "Validate and inspect Python dependency manifests"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that every line of each manifest parses
    Check {
        /// Manifest files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Also flag duplicate project names
        #[arg(long)]
        strict: bool,
    },
    /// Print the requirements of a manifest, includes resolved
    List {
        file: PathBuf,
        /// Environment description (YAML); markers are evaluated against
        /// it and inactive lines are dropped
        #[arg(long)]
        env: Option<PathBuf>,
        /// Extra to enable when evaluating markers (repeatable)
        #[arg(long = "extra")]
        extras: Vec<String>,
        /// Emit a JSON array instead of specifier lines
        #[arg(long)]
        json: bool,
    },
    /// Print a template environment file, or validate a given one
    Env {
        /// Environment description to validate and echo back
        file: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ListedRequirement {
    name: String,
    extras: Vec<String>,
    specifiers: Option<String>,
    url: Option<String>,
    marker: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Check { files, strict } => cmd_check(&files, strict),
        Command::List {
            file,
            env,
            extras,
            json,
        } => cmd_list(&file, env.as_deref(), &extras, json),
        Command::Env { file } => cmd_env(file.as_deref()),
    }
}

fn cmd_check(files: &[PathBuf], strict: bool) -> ExitCode {
    let mut failed = false;
    for file in files {
        let diagnostics = Manifest::check(file);
        for diagnostic in &diagnostics {
            eprintln!("{}", diagnostic);
        }
        let mut problems = diagnostics.len();
        if strict && diagnostics.is_empty() {
            problems += report_duplicates(file);
        }
        if problems == 0 {
            println!("{}: ok", file.display());
        } else {
            println!("{}: {} problem(s)", file.display(), problems);
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn report_duplicates(file: &Path) -> usize {
    let manifest = match Manifest::read(file) {
        Ok(manifest) => manifest,
        // check already passed, so this is unreachable in practice
        Err(_) => return 0,
    };
    let mut seen: HashMap<String, Origin> = HashMap::new();
    let mut duplicates = 0;
    for entry in manifest.requirements() {
        let name = entry.requirement.normalized_name();
        match seen.get(&name) {
            Some(first) => {
                eprintln!(
                    "{}: duplicate of {} (first seen at {})",
                    entry.origin, name, first
                );
                duplicates += 1;
            }
            None => {
                seen.insert(name, entry.origin.clone());
            }
        }
    }
    duplicates
}

fn cmd_list(file: &Path, env: Option<&Path>, extras: &[String], json: bool) -> ExitCode {
    let manifest = match Manifest::read(file) {
        Ok(manifest) => manifest,
        Err(diagnostic) => {
            eprintln!("{}", diagnostic);
            return ExitCode::FAILURE;
        }
    };
    let environment = match env {
        Some(path) => match load_environment(path) {
            Ok(environment) => Some(environment),
            Err(message) => {
                eprintln!("{}", message);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let extras: Vec<&str> = extras.iter().map(String::as_str).collect();
    let selected: Vec<_> = manifest
        .requirements()
        .filter(|entry| match &environment {
            Some(environment) => entry.requirement.evaluate(environment, &extras),
            None => true,
        })
        .collect();

    if json {
        let listed: Vec<ListedRequirement> = selected
            .iter()
            .map(|entry| {
                let requirement = &entry.requirement;
                ListedRequirement {
                    name: requirement.name.clone(),
                    extras: requirement.extras.clone(),
                    specifiers: requirement
                        .specifiers()
                        .filter(|specs| !specs.is_empty())
                        .map(|specs| specs.to_string()),
                    url: requirement.url().map(|url| url.to_string()),
                    marker: requirement.marker.as_ref().map(|marker| marker.to_string()),
                }
            })
            .collect();
        match serde_json::to_string_pretty(&listed) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("cannot serialize listing: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for entry in &selected {
            println!("{}", entry.requirement);
        }
    }
    ExitCode::SUCCESS
}

fn load_environment(path: &Path) -> Result<MarkerEnvironment, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_yaml::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn cmd_env(file: Option<&Path>) -> ExitCode {
    let environment = match file {
        Some(path) => match load_environment(path) {
            Ok(environment) => environment,
            Err(message) => {
                eprintln!("{}", message);
                return ExitCode::FAILURE;
            }
        },
        None => template_environment(),
    };
    match serde_yaml::to_string(&environment) {
        Ok(out) => {
            print!("{}", out);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("cannot serialize environment: {}", e);
            ExitCode::FAILURE
        }
    }
}

// A filled-in starting point; every value is meant to be edited to match
// the interpreter the manifest is resolved for.
fn template_environment() -> MarkerEnvironment {
    MarkerEnvironment {
        os_name: "posix".to_string(),
        sys_platform: "linux".to_string(),
        platform_machine: "x86_64".to_string(),
        platform_python_implementation: "CPython".to_string(),
        platform_release: "".to_string(),
        platform_system: "Linux".to_string(),
        platform_version: "".to_string(),
        python_version: "3.10".to_string(),
        python_full_version: "3.10.0".to_string(),
        implementation_name: "cpython".to_string(),
        implementation_version: "3.10.0".to_string(),
    }
}

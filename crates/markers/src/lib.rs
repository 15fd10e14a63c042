//! Environment marker expressions.
//!
//! The boolean language that restricts a dependency line to some
//! environments (`python_version >= "3.6" and sys_platform != "win32"`).
//! Markers are parsed into an expression tree and evaluated against a
//! [`MarkerEnvironment`]; comparisons on interpreter-version variables use
//! version ordering, everything else compares as strings.

use log::debug;
use pyreq_version::{Specifier, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug)]
pub enum Error {
    Empty,
    UnknownVariable(String),
    UnterminatedString(String),
    UnexpectedToken(String, &'static str),
    UnexpectedEnd(&'static str),
    TrailingInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Empty => write!(f, "empty marker expression"),
            Error::UnknownVariable(name) => write!(f, "unknown marker variable {:?}", name),
            Error::UnterminatedString(rest) => write!(f, "unterminated string at {:?}", rest),
            Error::UnexpectedToken(found, expected) => {
                write!(f, "expected {}, found {:?}", expected, found)
            }
            Error::UnexpectedEnd(expected) => {
                write!(f, "marker expression ends where {} was expected", expected)
            }
            Error::TrailingInput(rest) => {
                write!(f, "trailing input after marker expression: {:?}", rest)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<K> = std::result::Result<K, Error>;

/// The variables a marker may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerVariable {
    OsName,
    SysPlatform,
    PlatformMachine,
    PlatformPythonImplementation,
    PlatformRelease,
    PlatformSystem,
    PlatformVersion,
    PythonVersion,
    PythonFullVersion,
    ImplementationName,
    ImplementationVersion,
    Extra,
}

impl MarkerVariable {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerVariable::OsName => "os_name",
            MarkerVariable::SysPlatform => "sys_platform",
            MarkerVariable::PlatformMachine => "platform_machine",
            MarkerVariable::PlatformPythonImplementation => "platform_python_implementation",
            MarkerVariable::PlatformRelease => "platform_release",
            MarkerVariable::PlatformSystem => "platform_system",
            MarkerVariable::PlatformVersion => "platform_version",
            MarkerVariable::PythonVersion => "python_version",
            MarkerVariable::PythonFullVersion => "python_full_version",
            MarkerVariable::ImplementationName => "implementation_name",
            MarkerVariable::ImplementationVersion => "implementation_version",
            MarkerVariable::Extra => "extra",
        }
    }

    fn from_name(name: &str) -> Option<MarkerVariable> {
        let var = match name {
            "os_name" => MarkerVariable::OsName,
            "sys_platform" => MarkerVariable::SysPlatform,
            "platform_machine" => MarkerVariable::PlatformMachine,
            "platform_python_implementation" => MarkerVariable::PlatformPythonImplementation,
            "platform_release" => MarkerVariable::PlatformRelease,
            "platform_system" => MarkerVariable::PlatformSystem,
            "platform_version" => MarkerVariable::PlatformVersion,
            "python_version" => MarkerVariable::PythonVersion,
            "python_full_version" => MarkerVariable::PythonFullVersion,
            "implementation_name" => MarkerVariable::ImplementationName,
            "implementation_version" => MarkerVariable::ImplementationVersion,
            "extra" => MarkerVariable::Extra,
            // Dotted spellings from the older metadata format.
            "os.name" => MarkerVariable::OsName,
            "sys.platform" => MarkerVariable::SysPlatform,
            "platform.machine" => MarkerVariable::PlatformMachine,
            "platform.version" => MarkerVariable::PlatformVersion,
            "platform.python_implementation" | "python_implementation" => {
                MarkerVariable::PlatformPythonImplementation
            }
            _ => return None,
        };
        if name.contains('.') {
            debug!("accepting deprecated marker variable spelling {:?}", name);
        }
        Some(var)
    }

    /// Comparisons on these use version ordering when both operands parse.
    pub fn is_version(&self) -> bool {
        matches!(
            self,
            MarkerVariable::PythonVersion
                | MarkerVariable::PythonFullVersion
                | MarkerVariable::ImplementationVersion
        )
    }
}

impl fmt::Display for MarkerVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerOp {
    Compatible,
    Equal,
    NotEqual,
    LessEq,
    GreaterEq,
    Less,
    Greater,
    ArbitraryEqual,
    In,
    NotIn,
}

impl MarkerOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerOp::Compatible => "~=",
            MarkerOp::Equal => "==",
            MarkerOp::NotEqual => "!=",
            MarkerOp::LessEq => "<=",
            MarkerOp::GreaterEq => ">=",
            MarkerOp::Less => "<",
            MarkerOp::Greater => ">",
            MarkerOp::ArbitraryEqual => "===",
            MarkerOp::In => "in",
            MarkerOp::NotIn => "not in",
        }
    }
}

impl fmt::Display for MarkerOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One side of a comparison: a variable or a quoted literal.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerValue {
    Variable(MarkerVariable),
    Literal(String),
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MarkerValue::Variable(var) => write!(f, "{}", var),
            MarkerValue::Literal(lit) => write!(f, "\"{}\"", lit),
        }
    }
}

/// A parsed marker expression. `or` binds loosest, then `and`.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Or(Vec<Marker>),
    And(Vec<Marker>),
    Comparison {
        lhs: MarkerValue,
        op: MarkerOp,
        rhs: MarkerValue,
    },
}

/// The environment a marker is evaluated against.
///
/// There is no way to observe a Python interpreter from here, so no field
/// has an implicit host value; construct one, or deserialize it from a
/// configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerEnvironment {
    pub os_name: String,
    pub sys_platform: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub python_version: String,
    pub python_full_version: String,
    pub implementation_name: String,
    pub implementation_version: String,
}

impl MarkerEnvironment {
    pub fn get(&self, var: MarkerVariable) -> &str {
        match var {
            MarkerVariable::OsName => &self.os_name,
            MarkerVariable::SysPlatform => &self.sys_platform,
            MarkerVariable::PlatformMachine => &self.platform_machine,
            MarkerVariable::PlatformPythonImplementation => {
                &self.platform_python_implementation
            }
            MarkerVariable::PlatformRelease => &self.platform_release,
            MarkerVariable::PlatformSystem => &self.platform_system,
            MarkerVariable::PlatformVersion => &self.platform_version,
            MarkerVariable::PythonVersion => &self.python_version,
            MarkerVariable::PythonFullVersion => &self.python_full_version,
            MarkerVariable::ImplementationName => &self.implementation_name,
            MarkerVariable::ImplementationVersion => &self.implementation_version,
            // `extra` is supplied at evaluation time, not by the environment.
            MarkerVariable::Extra => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Op(MarkerOp),
    Str(String),
    Ident(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Op(op) => op.as_str().to_string(),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Ident(name) => name.clone(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(Error::UnterminatedString(
                        chars[i..].iter().collect::<String>(),
                    ));
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '<' | '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(if c == '<' {
                        MarkerOp::LessEq
                    } else {
                        MarkerOp::GreaterEq
                    }));
                    i += 2;
                } else {
                    tokens.push(Token::Op(if c == '<' {
                        MarkerOp::Less
                    } else {
                        MarkerOp::Greater
                    }));
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err(Error::UnexpectedToken("=".to_string(), "an operator"));
                }
                if chars.get(i + 2) == Some(&'=') {
                    tokens.push(Token::Op(MarkerOp::ArbitraryEqual));
                    i += 3;
                } else {
                    tokens.push(Token::Op(MarkerOp::Equal));
                    i += 2;
                }
            }
            '!' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err(Error::UnexpectedToken("!".to_string(), "an operator"));
                }
                tokens.push(Token::Op(MarkerOp::NotEqual));
                i += 2;
            }
            '~' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err(Error::UnexpectedToken("~".to_string(), "an operator"));
                }
                tokens.push(Token::Op(MarkerOp::Compatible));
                i += 2;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => {
                return Err(Error::UnexpectedToken(c.to_string(), "a marker token"));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == word)
    }

    fn parse_or(&mut self) -> Result<Marker> {
        let mut items = vec![self.parse_and()?];
        while self.at_keyword("or") {
            self.advance();
            items.push(self.parse_and()?);
        }
        if items.len() == 1 {
            Ok(items.pop().unwrap())
        } else {
            Ok(Marker::Or(items))
        }
    }

    fn parse_and(&mut self) -> Result<Marker> {
        let mut items = vec![self.parse_expr()?];
        while self.at_keyword("and") {
            self.advance();
            items.push(self.parse_expr()?);
        }
        if items.len() == 1 {
            Ok(items.pop().unwrap())
        } else {
            Ok(Marker::And(items))
        }
    }

    fn parse_expr(&mut self) -> Result<Marker> {
        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let inner = self.parse_or()?;
            match self.advance() {
                Some(Token::RParen) => Ok(inner),
                Some(token) => Err(Error::UnexpectedToken(token.describe(), ")")),
                None => Err(Error::UnexpectedEnd(")")),
            }
        } else {
            let lhs = self.parse_value()?;
            let op = self.parse_op()?;
            let rhs = self.parse_value()?;
            Ok(Marker::Comparison { lhs, op, rhs })
        }
    }

    fn parse_value(&mut self) -> Result<MarkerValue> {
        match self.advance() {
            Some(Token::Str(lit)) => Ok(MarkerValue::Literal(lit)),
            Some(Token::Ident(name)) => match MarkerVariable::from_name(&name) {
                Some(var) => Ok(MarkerValue::Variable(var)),
                None if matches!(name.as_str(), "and" | "or" | "in" | "not") => {
                    Err(Error::UnexpectedToken(name, "a variable or a string"))
                }
                None => Err(Error::UnknownVariable(name)),
            },
            Some(token) => Err(Error::UnexpectedToken(
                token.describe(),
                "a variable or a string",
            )),
            None => Err(Error::UnexpectedEnd("a variable or a string")),
        }
    }

    fn parse_op(&mut self) -> Result<MarkerOp> {
        match self.advance() {
            Some(Token::Op(op)) => Ok(op),
            Some(Token::Ident(name)) if name == "in" => Ok(MarkerOp::In),
            Some(Token::Ident(name)) if name == "not" => match self.advance() {
                Some(Token::Ident(next)) if next == "in" => Ok(MarkerOp::NotIn),
                Some(token) => Err(Error::UnexpectedToken(token.describe(), "in")),
                None => Err(Error::UnexpectedEnd("in")),
            },
            Some(token) => Err(Error::UnexpectedToken(token.describe(), "an operator")),
            None => Err(Error::UnexpectedEnd("an operator")),
        }
    }
}

impl FromStr for Marker {
    type Err = Error;

    fn from_str(s: &str) -> Result<Marker> {
        let tokens = tokenize(s)?;
        if tokens.is_empty() {
            return Err(Error::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let marker = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            let rest: Vec<String> = parser.tokens[parser.pos..]
                .iter()
                .map(|t| t.describe())
                .collect();
            return Err(Error::TrailingInput(rest.join(" ")));
        }
        Ok(marker)
    }
}

impl Marker {
    /// Evaluate against `env`. `extras` are the extras requested for the
    /// requirement this marker hangs off; a marker never fails to
    /// evaluate, incomparable operands just come out `false`.
    pub fn evaluate(&self, env: &MarkerEnvironment, extras: &[&str]) -> bool {
        match self {
            Marker::Or(children) => children.iter().any(|c| c.evaluate(env, extras)),
            Marker::And(children) => children.iter().all(|c| c.evaluate(env, extras)),
            Marker::Comparison { lhs, op, rhs } => eval_comparison(lhs, *op, rhs, env, extras),
        }
    }
}

fn eval_comparison(
    lhs: &MarkerValue,
    op: MarkerOp,
    rhs: &MarkerValue,
    env: &MarkerEnvironment,
    extras: &[&str],
) -> bool {
    // `extra` clauses check membership in the requested extras.
    let extra_side = match (lhs, rhs) {
        (MarkerValue::Variable(MarkerVariable::Extra), other)
        | (other, MarkerValue::Variable(MarkerVariable::Extra)) => Some(other),
        _ => None,
    };
    if let Some(other) = extra_side {
        let wanted = match other {
            MarkerValue::Literal(lit) => normalize_extra(lit),
            MarkerValue::Variable(var) => normalize_extra(env.get(*var)),
        };
        let hit = extras.iter().any(|e| normalize_extra(e) == wanted);
        return match op {
            MarkerOp::Equal => hit,
            MarkerOp::NotEqual => !hit,
            _ => {
                debug!("unsupported operator {} on extra", op);
                false
            }
        };
    }

    let lhs_value = resolve(lhs, env);
    let rhs_value = resolve(rhs, env);

    match op {
        MarkerOp::In => rhs_value.contains(&lhs_value),
        MarkerOp::NotIn => !rhs_value.contains(&lhs_value),
        _ => {
            // Version comparison when both sides cooperate, string
            // comparison otherwise.
            if let Ok(spec) = Specifier::from_str(&format!("{}{}", op.as_str(), rhs_value)) {
                if let Ok(version) = Version::from_str(&lhs_value) {
                    return spec.matches(&version);
                }
            }
            match op {
                MarkerOp::Equal => lhs_value == rhs_value,
                MarkerOp::NotEqual => lhs_value != rhs_value,
                MarkerOp::Less => lhs_value < rhs_value,
                MarkerOp::LessEq => lhs_value <= rhs_value,
                MarkerOp::Greater => lhs_value > rhs_value,
                MarkerOp::GreaterEq => lhs_value >= rhs_value,
                MarkerOp::ArbitraryEqual => lhs_value == rhs_value,
                MarkerOp::Compatible => {
                    debug!("~= on non-version operands ({:?}, {:?})", lhs_value, rhs_value);
                    false
                }
                MarkerOp::In | MarkerOp::NotIn => unreachable!(),
            }
        }
    }
}

fn resolve(value: &MarkerValue, env: &MarkerEnvironment) -> String {
    match value {
        MarkerValue::Variable(var) => env.get(*var).to_string(),
        MarkerValue::Literal(lit) => lit.clone(),
    }
}

// Extra names compare like normalized project names.
fn normalize_extra(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for c in s.trim().chars() {
        if c == '-' || c == '_' || c == '.' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('-');
        }
        pending_sep = false;
        out.extend(c.to_lowercase());
    }
    out
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Marker::Comparison { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Marker::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    // An or-group inside an and-chain keeps its parens.
                    if matches!(child, Marker::Or(_)) {
                        write!(f, "({})", child)?;
                    } else {
                        write!(f, "{}", child)?;
                    }
                }
                Ok(())
            }
            Marker::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests;

//! Dependency constraint grammar.
//!
//! ```text
//! dependency     := name ( relation ( "," relation )* )?
//! relation       := operator number-literal
//! operator       := "==" | "=" | ">=" | "<=" | ">" | "<"
//! name           := letter ( letter | digit )*
//! number-literal := digit+ ( "." digit+ )*
//! ```
//!
//! Whitespace is insignificant; `#` and `//` start a comment that runs to the
//! end of the line.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Comparison operator of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `=` or `==`
    Eq,
    /// `>=`
    Ge,
    /// `>`
    Gt,
}

impl Operator {
    /// Canonical spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ge => ">=",
            Self::Gt => ">",
        }
    }

    /// Debian spelling (`<<`, `<=`, `=`, `>=`, `>>`).
    pub fn deb_str(self) -> &'static str {
        match self {
            Self::Lt => "<<",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Gt => ">>",
        }
    }

    /// RPM `RPMSENSE_*` comparison bits.
    pub fn rpm_flags(self) -> i32 {
        const LESS: i32 = 1 << 1;
        const GREATER: i32 = 1 << 2;
        const EQUAL: i32 = 1 << 3;
        match self {
            Self::Lt => LESS,
            Self::Le => LESS | EQUAL,
            Self::Eq => EQUAL,
            Self::Ge => GREATER | EQUAL,
            Self::Gt => GREATER,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            "=" | "==" => Ok(Self::Eq),
            ">=" => Ok(Self::Ge),
            ">" => Ok(Self::Gt),
            _ => Err(format!("Unknown operator: {s}")),
        }
    }
}

/// A single `operator version` constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DepRelation {
    /// Comparison operator.
    pub operator: Operator,
    /// Dotted numeric version.
    pub version: String,
}

/// A named dependency with zero or more version constraints.
///
/// An empty `relations` list means any version satisfies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Package name.
    pub name: String,
    /// Constraints, in declaration order.
    pub relations: Vec<DepRelation>,
}

impl Dependency {
    /// Dependency on exactly `version`.
    pub fn exact(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: vec![DepRelation {
                operator: Operator::Eq,
                version: version.into(),
            }],
        }
    }

    /// Render for a Debian `Depends:` field.
    ///
    /// Each relation becomes its own clause: `name (>= 1.10), name (<< 2)`.
    pub fn render_deb(&self) -> String {
        if self.relations.is_empty() {
            return self.name.clone();
        }
        self.relations
            .iter()
            .map(|r| format!("{} ({} {})", self.name, r.operator.deb_str(), r.version))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, rel) in self.relations.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}{}", rel.operator, rel.version)?;
        }
        Ok(())
    }
}

impl FromStr for Dependency {
    type Err = DependencyFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dependency(s)?.ok_or_else(|| DependencyFormatError {
            text: s.to_string(),
            position: 1,
            reason: "empty dependency".to_string(),
        })
    }
}

/// A line that does not match the dependency grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid dependency {text:?} at position {position}: {reason}")]
pub struct DependencyFormatError {
    /// The offending line, as given.
    pub text: String,
    /// 1-based character position where parsing stopped.
    pub position: usize,
    /// What the parser expected.
    pub reason: String,
}

struct Scanner<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> DependencyFormatError {
        DependencyFormatError {
            text: self.text.to_string(),
            position: self.pos + 1,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    /// Skip whitespace and comments. Returns the next significant char.
    fn skip_trivia(&mut self) -> Option<char> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('#') => self.pos = self.chars.len(),
                Some('/') if self.peek_at(1) == Some('/') => self.pos = self.chars.len(),
                other => return other,
            }
        }
    }

    fn name(&mut self) -> Result<String, DependencyFormatError> {
        match self.skip_trivia() {
            Some(c) if c.is_ascii_alphabetic() => {}
            Some(c) => return Err(self.error(format!("expected package name, found {c:?}"))),
            None => return Err(self.error("expected package name")),
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn operator(&mut self) -> Result<Operator, DependencyFormatError> {
        let first = self
            .skip_trivia()
            .ok_or_else(|| self.error("expected operator"))?;
        let second = self.peek_at(1);
        let (op, width) = match (first, second) {
            ('=', Some('=')) => (Operator::Eq, 2),
            ('=', _) => (Operator::Eq, 1),
            ('>', Some('=')) => (Operator::Ge, 2),
            ('>', _) => (Operator::Gt, 1),
            ('<', Some('=')) => (Operator::Le, 2),
            ('<', _) => (Operator::Lt, 1),
            (c, _) => return Err(self.error(format!("expected operator, found {c:?}"))),
        };
        self.pos += width;
        Ok(op)
    }

    fn version(&mut self) -> Result<String, DependencyFormatError> {
        let start = match self.skip_trivia() {
            Some(c) if c.is_ascii_digit() => self.pos,
            Some(c) => return Err(self.error(format!("expected version number, found {c:?}"))),
            None => return Err(self.error("expected version number")),
        };
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}

/// Parse one line.
///
/// Returns `Ok(None)` for blank lines and comment-only lines.
///
/// # Errors
///
/// Returns [`DependencyFormatError`] if the line does not match the grammar.
/// No partial dependency is ever returned.
pub fn parse_dependency(line: &str) -> Result<Option<Dependency>, DependencyFormatError> {
    let mut scanner = Scanner::new(line);
    if scanner.skip_trivia().is_none() {
        return Ok(None);
    }

    let name = scanner.name()?;
    let mut relations = Vec::new();

    if scanner.skip_trivia().is_some() {
        loop {
            let operator = scanner.operator()?;
            let version = scanner.version()?;
            relations.push(DepRelation { operator, version });

            match scanner.skip_trivia() {
                None => break,
                Some(',') => scanner.pos += 1,
                Some(c) => return Err(scanner.error(format!("expected ',' or end, found {c:?}"))),
            }
        }
    }

    Ok(Some(Dependency { name, relations }))
}

/// Parse many lines, skipping blanks and comments.
///
/// # Errors
///
/// Fails on the first malformed line.
pub fn parse_dependencies<I, S>(lines: I) -> Result<Vec<Dependency>, DependencyFormatError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut deps = Vec::new();
    for line in lines {
        if let Some(dep) = parse_dependency(line.as_ref())? {
            deps.push(dep);
        }
    }
    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Dependency {
        parse_dependency(s).unwrap().unwrap()
    }

    #[test]
    fn parses_single_relations() {
        for (input, op) in [
            ("tarantool<=1.10", Operator::Le),
            ("tarantool==1.10", Operator::Eq),
            ("tarantool>=1.10", Operator::Ge),
        ] {
            let dep = parse(input);
            assert_eq!(dep.name, "tarantool");
            assert_eq!(dep.relations.len(), 1);
            assert_eq!(dep.relations[0].operator, op);
            assert_eq!(dep.relations[0].version, "1.10");
        }
    }

    #[test]
    fn non_numeric_version_fails() {
        let err = parse_dependency("tt=master").unwrap_err();
        assert_eq!(err.text, "tt=master");
        assert_eq!(err.position, 4);
    }

    #[test]
    fn name_only() {
        let dep = parse("  unzip  ");
        assert_eq!(dep.name, "unzip");
        assert!(dep.relations.is_empty());
    }

    #[test]
    fn relation_list_with_whitespace_and_comment() {
        let dep = parse("tarantool >= 1.10.2 , < 3 # runtime");
        assert_eq!(
            dep.relations,
            vec![
                DepRelation {
                    operator: Operator::Ge,
                    version: "1.10.2".into()
                },
                DepRelation {
                    operator: Operator::Lt,
                    version: "3".into()
                },
            ]
        );
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let deps = parse_dependencies([
            "",
            "// comment",
            "   # also a comment",
            "luarocks=3.9",
            "cmake>3 // trailing",
        ])
        .unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "luarocks");
        assert_eq!(deps[0].relations[0].operator, Operator::Eq);
        assert_eq!(deps[1].to_string(), "cmake>3");
    }

    #[test]
    fn malformed_lines_fail() {
        for bad in [
            "1tarantool",
            "tarantool >=",
            "tarantool 1.10",
            "tarantool >= 1.10,",
            "tarantool >= 1.10 2.0",
            "tarantool >= 1.10a",
            "tarantool => 1",
            "tarantool >= .1",
            "tarantool-ee>=1.10",
            "my_app",
            "tarantool-",
        ] {
            assert!(parse_dependency(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn first_error_stops_the_batch() {
        let err = parse_dependencies(["ok>=1", "bad=x", "never>=2"]).unwrap_err();
        assert_eq!(err.text, "bad=x");
    }

    #[test]
    fn render_round_trips() {
        for input in ["a<1", "b<=1.2", "c==1.2.3", "d>=2", "e>10.0", "f>=1,<2"] {
            let dep = parse(input);
            let again = parse(&dep.to_string());
            assert_eq!(dep, again);
        }
        // `=` normalizes to `==`
        assert_eq!(parse("g=1").to_string(), "g==1");
    }

    #[test]
    fn deb_rendering() {
        assert_eq!(
            parse("tarantool>1.10,<2").render_deb(),
            "tarantool (>> 1.10), tarantool (<< 2)"
        );
        assert_eq!(parse("tarantool==2.11").render_deb(), "tarantool (= 2.11)");
        assert_eq!(parse("unzip").render_deb(), "unzip");
    }

    #[test]
    fn rpm_flags() {
        assert_eq!(Operator::Lt.rpm_flags(), 2);
        assert_eq!(Operator::Le.rpm_flags(), 10);
        assert_eq!(Operator::Eq.rpm_flags(), 8);
        assert_eq!(Operator::Ge.rpm_flags(), 12);
        assert_eq!(Operator::Gt.rpm_flags(), 4);
    }
}

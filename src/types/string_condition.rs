use std::fmt;
use std::io;
use std::sync::Arc;

use regex::Regex;

use super::error::BuildError;

/// String operations usable in leaf conditions.
///
/// Every operation evaluates to `false` when the extracted value is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    /// Value is present and non-empty.
    Exists,
    /// Exact equality with the parameter.
    Equals,
    /// Case-insensitive equality with the parameter.
    EqualsIgnoreCase,
    /// Value starts with the parameter.
    StartsWith,
    /// Value ends with the parameter.
    EndsWith,
    /// Value contains the parameter as a substring.
    Contains,
    /// Value matches the parameter as an ant-style path pattern
    /// (`*` within a segment, `**` across segments, `?` one character).
    Match,
    /// Value matches the parameter as a full-string regular expression.
    Regexp,
}

impl StringOp {
    fn display_name(self) -> &'static str {
        match self {
            StringOp::Exists => "exists",
            StringOp::Equals => "eq",
            StringOp::EqualsIgnoreCase => "eqic",
            StringOp::StartsWith => "starts",
            StringOp::EndsWith => "ends",
            StringOp::Contains => "contains",
            StringOp::Match => "match",
            StringOp::Regexp => "regexp",
        }
    }
}

impl fmt::Display for StringOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

pub(crate) type Extractor<T> = Arc<dyn Fn(&T) -> io::Result<Option<String>> + Send + Sync>;

/// A leaf condition testing a string extracted from the subject.
///
/// The extractor may fail (body reads are I/O); failure degrades to the
/// error's display string, which is then tested like any other value, so
/// evaluation itself never fails. Pattern operations compile their matcher
/// once, at construction.
pub struct StringCondition<T> {
    name: String,
    op: StringOp,
    param: Option<String>,
    pattern: Option<Regex>,
    extract: Extractor<T>,
}

impl<T> StringCondition<T> {
    /// Create a leaf condition.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingParam`] if the operation needs a
    /// parameter and none is given, or [`BuildError::InvalidPattern`] if a
    /// `Match`/`Regexp` parameter does not compile.
    pub fn new(
        name: impl Into<String>,
        op: StringOp,
        param: Option<&str>,
        extract: impl Fn(&T) -> io::Result<Option<String>> + Send + Sync + 'static,
    ) -> Result<Self, BuildError> {
        Self::from_extractor(name, op, param, Arc::new(extract))
    }

    pub(crate) fn from_extractor(
        name: impl Into<String>,
        op: StringOp,
        param: Option<&str>,
        extract: Extractor<T>,
    ) -> Result<Self, BuildError> {
        if param.is_none() && op != StringOp::Exists {
            return Err(BuildError::MissingParam { op });
        }
        let pattern = match (op, param) {
            (StringOp::Match, Some(p)) => Some(compile_path_pattern(p)?),
            (StringOp::Regexp, Some(p)) => Some(compile_regexp(p)?),
            _ => None,
        };
        Ok(Self {
            name: name.into(),
            op,
            param: param.map(str::to_owned),
            pattern,
            extract,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn op(&self) -> StringOp {
        self.op
    }

    #[must_use]
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    pub(crate) fn check(&self, subject: &T) -> bool {
        let value = match (self.extract)(subject) {
            Ok(value) => value,
            Err(e) => Some(e.to_string()),
        };
        self.check_value(value.as_deref())
    }

    fn check_value(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self.op {
            StringOp::Exists => !value.is_empty(),
            StringOp::Equals => self.param.as_deref().is_some_and(|p| value == p),
            StringOp::EqualsIgnoreCase => self
                .param
                .as_deref()
                .is_some_and(|p| value.to_lowercase() == p.to_lowercase()),
            StringOp::StartsWith => self.param.as_deref().is_some_and(|p| value.starts_with(p)),
            StringOp::EndsWith => self.param.as_deref().is_some_and(|p| value.ends_with(p)),
            StringOp::Contains => self.param.as_deref().is_some_and(|p| value.contains(p)),
            StringOp::Match | StringOp::Regexp => {
                self.pattern.as_ref().is_some_and(|re| re.is_match(value))
            }
        }
    }
}

impl<T> Clone for StringCondition<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            op: self.op,
            param: self.param.clone(),
            pattern: self.pattern.clone(),
            extract: Arc::clone(&self.extract),
        }
    }
}

impl<T> fmt::Display for StringCondition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}({})",
            self.name,
            self.op,
            self.param.as_deref().unwrap_or("")
        )
    }
}

impl<T> fmt::Debug for StringCondition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringCondition({self})")
    }
}

fn compile_regexp(param: &str) -> Result<Regex, BuildError> {
    // Anchored so the whole value must match, not just a substring.
    Regex::new(&format!("^(?:{param})$")).map_err(|source| BuildError::InvalidPattern {
        pattern: param.to_owned(),
        source,
    })
}

fn compile_path_pattern(param: &str) -> Result<Regex, BuildError> {
    let mut translated = String::with_capacity(param.len() + 8);
    translated.push('^');
    let mut chars = param.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    translated.push_str(".*");
                } else {
                    translated.push_str("[^/]*");
                }
            }
            '?' => translated.push_str("[^/]"),
            c => translated.push_str(&regex::escape(&c.to_string())),
        }
    }
    translated.push('$');
    Regex::new(&translated).map_err(|source| BuildError::InvalidPattern {
        pattern: param.to_owned(),
        source,
    })
}

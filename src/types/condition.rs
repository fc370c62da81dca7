use std::fmt;
use std::io;
use std::ops::Not;
use std::sync::Arc;

use super::error::BuildError;
use super::string_condition::{StringCondition, StringOp};

/// A named, side-effect-free boolean predicate over the subject.
///
/// The escape hatch for tests that the string operations cannot express;
/// created via [`Condition::test()`].
pub struct Predicate<T> {
    name: String,
    test: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Predicate<T> {
    pub(crate) fn new(
        name: impl Into<String>,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn check(&self, subject: &T) -> bool {
        (self.test)(subject)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( {} )", self.name)
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.name)
    }
}

/// A boolean condition tree over subjects of type `T`.
///
/// Composite variants own their children exclusively; the tree is immutable
/// once constructed and safe to share across threads. `And`/`Or` evaluate
/// left child first and short-circuit.
pub enum Condition<T> {
    /// A fixed boolean, ignoring the subject.
    Const(bool),
    /// An arbitrary named predicate.
    Test(Predicate<T>),
    /// A string extraction tested by a [`StringOp`].
    Leaf(StringCondition<T>),
    Not(Box<Condition<T>>),
    And(Box<Condition<T>>, Box<Condition<T>>),
    Or(Box<Condition<T>>, Box<Condition<T>>),
}

impl<T> Condition<T> {
    /// A condition that always evaluates to `value`.
    #[must_use]
    pub fn always(value: bool) -> Self {
        Condition::Const(value)
    }

    /// Wrap a plain predicate function as a condition.
    #[must_use]
    pub fn test(
        name: impl Into<String>,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Condition::Test(Predicate::new(name, test))
    }

    /// Build a string-operation leaf from an extractor.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for a missing parameter or an invalid
    /// `Match`/`Regexp` pattern.
    pub fn string(
        name: impl Into<String>,
        op: StringOp,
        param: Option<&str>,
        extract: impl Fn(&T) -> io::Result<Option<String>> + Send + Sync + 'static,
    ) -> Result<Self, BuildError> {
        StringCondition::new(name, op, param, extract).map(Condition::Leaf)
    }

    /// Evaluate this condition against a subject. Never fails: extraction
    /// errors degrade inside the leaf (see [`StringCondition`]).
    #[must_use]
    pub fn check(&self, subject: &T) -> bool {
        crate::evaluate::check(self, subject)
    }

    #[must_use]
    pub fn and(self, other: Condition<T>) -> Condition<T> {
        Condition::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Condition<T>) -> Condition<T> {
        Condition::Or(Box::new(self), Box::new(other))
    }
}

impl<T> Not for Condition<T> {
    type Output = Condition<T>;

    fn not(self) -> Condition<T> {
        Condition::Not(Box::new(self))
    }
}

impl<T> Clone for Condition<T> {
    fn clone(&self) -> Self {
        match self {
            Condition::Const(v) => Condition::Const(*v),
            Condition::Test(p) => Condition::Test(p.clone()),
            Condition::Leaf(s) => Condition::Leaf(s.clone()),
            Condition::Not(inner) => Condition::Not(inner.clone()),
            Condition::And(a, b) => Condition::And(a.clone(), b.clone()),
            Condition::Or(a, b) => Condition::Or(a.clone(), b.clone()),
        }
    }
}

impl<T> fmt::Display for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Const(v) => write!(f, "{v}"),
            Condition::Test(p) => write!(f, "{p}"),
            Condition::Leaf(s) => write!(f, "{s}"),
            Condition::Not(inner) => write!(f, "( NOT {inner} )"),
            Condition::And(a, b) => write!(f, "( {a} AND {b} )"),
            Condition::Or(a, b) => write!(f, "( {a} OR {b} )"),
        }
    }
}

impl<T> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Condition({self})")
    }
}

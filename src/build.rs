use std::fmt;

use crate::types::{BuildError, Condition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Group,
    Not,
    And,
    Or,
}

/// One level of nesting in a partially built expression: the frame's kind
/// plus at most one pending condition waiting to be combined.
struct Frame<T> {
    kind: FrameKind,
    slot: Option<Condition<T>>,
}

impl<T> Frame<T> {
    fn new(kind: FrameKind) -> Self {
        Self { kind, slot: None }
    }
}

/// Infix builder for [`Condition`] trees.
///
/// Calls arrive in the order the expression reads: leaves via [`add()`],
/// operators via [`not()`]/[`and()`]/[`or()`], explicit grouping via
/// [`open_group()`]/[`close_group()`]. A usage error (operator without a
/// left operand, doubled leaf, unmatched group) makes the builder inert;
/// the error, carrying the infix trace accumulated so far, is returned by
/// [`build()`].
///
/// [`add()`]: ConditionBuilder::add
/// [`not()`]: ConditionBuilder::not
/// [`and()`]: ConditionBuilder::and
/// [`or()`]: ConditionBuilder::or
/// [`open_group()`]: ConditionBuilder::open_group
/// [`close_group()`]: ConditionBuilder::close_group
/// [`build()`]: ConditionBuilder::build
///
/// # Example
///
/// ```
/// use mimicry::{Condition, ConditionBuilder};
///
/// let condition = ConditionBuilder::new()
///     .add(Condition::test("short", |s: &String| s.len() < 10))
///     .or()
///     .add(Condition::test("greeting", |s: &String| s.starts_with("hello")))
///     .build()
///     .unwrap();
/// assert!(condition.check(&"hi".to_owned()));
/// ```
pub struct ConditionBuilder<T> {
    stack: Vec<Frame<T>>,
    trace: String,
    error: Option<BuildError>,
}

impl<T> ConditionBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![Frame::new(FrameKind::Group)],
            trace: String::new(),
            error: None,
        }
    }

    /// The infix trace of everything applied so far, for diagnostics.
    #[must_use]
    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// Append a leaf (or any prebuilt condition) as the next operand.
    #[must_use]
    pub fn add(mut self, condition: Condition<T>) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.trace.push(' ');
        self.trace.push_str(&condition.to_string());
        if self.top().slot.is_some() {
            self.fail(BuildError::OccupiedSlot {
                trace: self.trace.clone(),
            });
            return self;
        }
        self.top().slot = Some(condition);
        self.reduce(false);
        self
    }

    /// Negate the operand that follows.
    #[must_use]
    pub fn not(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.trace.push_str(" not");
        if self.top().slot.is_some() {
            self.fail(BuildError::OccupiedSlot {
                trace: self.trace.clone(),
            });
            return self;
        }
        self.stack.push(Frame::new(FrameKind::Not));
        self
    }

    /// Conjunction with the operand that follows. Needs a pending left
    /// operand.
    #[must_use]
    pub fn and(self) -> Self {
        self.binary(FrameKind::And, " and")
    }

    /// Disjunction with the operand that follows. Needs a pending left
    /// operand.
    #[must_use]
    pub fn or(self) -> Self {
        self.binary(FrameKind::Or, " or")
    }

    /// Open an explicit group. Grouping bounds operator scope until the
    /// matching [`close_group()`](ConditionBuilder::close_group).
    #[must_use]
    pub fn open_group(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.trace.push_str(" (");
        self.stack.push(Frame::new(FrameKind::Group));
        self
    }

    /// Close the innermost explicit group.
    #[must_use]
    pub fn close_group(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.trace.push_str(" )");
        if self.top().kind != FrameKind::Group || self.stack.len() == 1 {
            self.fail(BuildError::UnmatchedGroup {
                trace: self.trace.clone(),
            });
            return self;
        }
        if self.top().slot.is_none() {
            self.fail(BuildError::Incomplete {
                trace: self.trace.clone(),
            });
            return self;
        }
        self.reduce(true);
        self
    }

    /// Finalize the expression.
    ///
    /// Exactly one frame holding exactly one condition must remain; the
    /// result is then rebalanced so chained runs of the same binary
    /// operator associate left-deep, giving deterministic left-to-right
    /// leaf evaluation order regardless of how grouping was expressed.
    ///
    /// # Errors
    ///
    /// Returns the first recorded usage error, or
    /// [`BuildError::Incomplete`] for an open group, a dangling operator,
    /// or an empty expression.
    pub fn build(mut self) -> Result<Condition<T>, BuildError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if self.stack.len() != 1 {
            return Err(BuildError::Incomplete { trace: self.trace });
        }
        match self.stack.pop().and_then(|frame| frame.slot) {
            Some(condition) => Ok(rebalance(condition)),
            None => Err(BuildError::Incomplete { trace: self.trace }),
        }
    }

    pub(crate) fn fail(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn binary(mut self, kind: FrameKind, token: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.trace.push_str(token);
        if self.top().slot.is_none() {
            self.fail(BuildError::MissingOperand {
                trace: self.trace.clone(),
            });
            return self;
        }
        self.stack.push(Frame::new(kind));
        self
    }

    fn top(&mut self) -> &mut Frame<T> {
        // The root frame is never popped outside build(), so the stack is
        // never empty here.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Collapse completed frames bottom-up. A populated Not/And/Or frame
    /// combines into the frame below it; a Group frame collapses only when
    /// its closure was explicit (`force`), so an open group keeps bounding
    /// operator scope.
    fn reduce(&mut self, force: bool) {
        let mut force = force;
        loop {
            if self.stack.len() == 1 {
                return;
            }
            if self
                .stack
                .last()
                .is_none_or(|frame| frame.slot.is_none())
            {
                return;
            }
            let Some(mut top) = self.stack.pop() else {
                return;
            };
            let Some(condition) = top.slot.take() else {
                return;
            };
            match top.kind {
                FrameKind::Not => {
                    self.top().slot = Some(Condition::Not(Box::new(condition)));
                }
                FrameKind::And | FrameKind::Or => {
                    let Some(left) = self.top().slot.take() else {
                        self.fail(BuildError::MissingOperand {
                            trace: self.trace.clone(),
                        });
                        return;
                    };
                    self.top().slot = Some(match top.kind {
                        FrameKind::And => left.and(condition),
                        _ => left.or(condition),
                    });
                }
                FrameKind::Group => {
                    if !force {
                        // Not closed yet: put it back and stop collapsing.
                        top.slot = Some(condition);
                        self.stack.push(top);
                        return;
                    }
                    if self.top().slot.is_some() {
                        self.fail(BuildError::OccupiedSlot {
                            trace: self.trace.clone(),
                        });
                        return;
                    }
                    self.top().slot = Some(condition);
                }
            }
            force = false;
        }
    }
}

impl<T> Default for ConditionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ConditionBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConditionBuilder {{ depth: {}, trace: \"{}\" }}",
            self.stack.len(),
            self.trace
        )
    }
}

/// Rewrite chained runs of the same binary operator into left-deep form:
/// `a op (b op c)` becomes `(a op b) op c`, recursively. Leaf order is
/// preserved, so the left-to-right evaluation order callers wrote is what
/// short-circuit evaluation walks.
pub(crate) fn rebalance<T>(condition: Condition<T>) -> Condition<T> {
    match condition {
        Condition::Not(inner) => Condition::Not(Box::new(rebalance(*inner))),
        Condition::And(left, right) => match *right {
            Condition::And(mid, rightmost) => {
                rebalance(Condition::And(Box::new(Condition::And(left, mid)), rightmost))
            }
            right => Condition::And(Box::new(rebalance(*left)), Box::new(rebalance(right))),
        },
        Condition::Or(left, right) => match *right {
            Condition::Or(mid, rightmost) => {
                rebalance(Condition::Or(Box::new(Condition::Or(left, mid)), rightmost))
            }
            right => Condition::Or(Box::new(rebalance(*left)), Box::new(rebalance(right))),
        },
        other => other,
    }
}

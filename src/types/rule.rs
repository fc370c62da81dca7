use std::fmt;

use super::action::Action;
use super::condition::Condition;

/// One dispatch case: a condition paired with the action that answers
/// requests the condition selects. Immutable once built; identified only
/// by its position in the owning [`Dispatcher`](super::Dispatcher).
pub struct Rule<T, S> {
    condition: Condition<T>,
    action: Box<dyn Action<T, S>>,
}

impl<T, S> Rule<T, S> {
    pub(crate) fn new(condition: Condition<T>, action: Box<dyn Action<T, S>>) -> Self {
        Self { condition, action }
    }

    #[must_use]
    pub fn condition(&self) -> &Condition<T> {
        &self.condition
    }

    pub(crate) fn action(&self) -> &dyn Action<T, S> {
        self.action.as_ref()
    }
}

impl<T, S> fmt::Display for Rule<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "when {} do {}", self.condition, self.action.describe())
    }
}

impl<T, S> fmt::Debug for Rule<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({self})")
    }
}

use tracing::{debug, trace};

use crate::types::{ActionError, Condition, Rule};

/// Recursive evaluation over the condition variant set. `And`/`Or` evaluate
/// the left child first and short-circuit; `Not` always evaluates its child.
pub(crate) fn check<T>(condition: &Condition<T>, subject: &T) -> bool {
    match condition {
        Condition::Const(value) => *value,
        Condition::Test(predicate) => predicate.check(subject),
        Condition::Leaf(leaf) => leaf.check(subject),
        Condition::Not(inner) => !check(inner, subject),
        Condition::And(a, b) => check(a, subject) && check(b, subject),
        Condition::Or(a, b) => check(a, subject) || check(b, subject),
    }
}

/// First-match-wins walk over the ordered rule list.
///
/// The first rule whose condition holds gets to respond; if its action
/// reports `Ok(true)` dispatch stops there. `Ok(false)` means the action
/// declined and later rules are still tried. An action error aborts the
/// whole dispatch.
pub(crate) fn dispatch<T, S>(
    rules: &[Rule<T, S>],
    subject: &T,
    sink: &mut S,
) -> Result<bool, ActionError> {
    for (index, rule) in rules.iter().enumerate() {
        if !check(rule.condition(), subject) {
            trace!(case = index, "condition did not match");
            continue;
        }
        debug!(case = index, "condition matched");
        if rule.action().respond(subject, sink)? {
            return Ok(true);
        }
        debug!(case = index, "action declined, trying later cases");
    }
    Ok(false)
}

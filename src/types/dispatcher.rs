use std::fmt;
use std::fmt::Write as _;

use tracing::info;

use super::action::Action;
use super::condition::Condition;
use super::error::{ActionError, BuildError};
use super::request::{RequestConditionBuilder, RequestView, ResponseSink};
use super::rule::Rule;

/// Builder for a [`Dispatcher`].
///
/// Cases are defined via closures and assembled into an immutable,
/// thread-safe dispatch structure. Case order is match order.
///
/// # Example
///
/// ```
/// use mimicry::{CapturedResponse, DispatcherBuilder, Responder, SimpleRequest};
///
/// let dispatcher = DispatcherBuilder::<SimpleRequest, CapturedResponse>::new()
///     .case(|c| {
///         c.when(|w| w.method().equals("GET").and().path().starts_with("/health"))
///             .respond(Responder::builder().status(200).text("ok").build())
///     })
///     .build()
///     .unwrap();
///
/// let mut sink = CapturedResponse::new();
/// let handled = dispatcher
///     .dispatch(&SimpleRequest::new("GET", "/health"), &mut sink)
///     .unwrap();
/// assert!(handled);
/// assert_eq!(sink.body_text(), "ok");
/// ```
pub struct DispatcherBuilder<T, S> {
    cases: Vec<CaseBuilder<T, S>>,
}

/// Intermediate builder passed to the case definition closure. A case needs
/// both a condition (`when`/`when_condition`) and an action (`respond`).
pub struct CaseBuilder<T, S> {
    condition: Option<RequestConditionBuilder<T>>,
    action: Option<Box<dyn Action<T, S>>>,
}

impl<T, S> DispatcherBuilder<T, S> {
    #[must_use]
    pub fn new() -> Self {
        Self { cases: Vec::new() }
    }

    /// Define the next case. The closure receives a [`CaseBuilder`] and
    /// must set a condition and an action on it.
    #[must_use]
    pub fn case(mut self, f: impl FnOnce(CaseBuilder<T, S>) -> CaseBuilder<T, S>) -> Self {
        let case = f(CaseBuilder {
            condition: None,
            action: None,
        });
        self.cases.push(case);
        self
    }

    /// Assemble the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if any case lacks a condition or an action,
    /// or if any condition expression is malformed.
    pub fn build(self) -> Result<Dispatcher<T, S>, BuildError> {
        let mut rules = Vec::with_capacity(self.cases.len());
        for (index, case) in self.cases.into_iter().enumerate() {
            let condition = case
                .condition
                .ok_or(BuildError::MissingCondition { index })?
                .build()?;
            let action = case.action.ok_or(BuildError::MissingAction { index })?;
            rules.push(Rule::new(condition, action));
        }
        info!(cases = rules.len(), "dispatcher configured");
        Ok(Dispatcher { rules })
    }
}

impl<T, S> Default for DispatcherBuilder<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> CaseBuilder<T, S> {
    /// Define the condition with the fluent request DSL.
    #[must_use]
    pub fn when(
        mut self,
        f: impl FnOnce(RequestConditionBuilder<T>) -> RequestConditionBuilder<T>,
    ) -> Self {
        self.condition = Some(f(RequestConditionBuilder::new()));
        self
    }

    /// Define the condition from a prebuilt [`Condition`].
    #[must_use]
    pub fn when_condition(mut self, condition: Condition<T>) -> Self {
        self.condition = Some(RequestConditionBuilder::new().cond(condition));
        self
    }

    /// Define the action invoked when the condition selects a request.
    #[must_use]
    pub fn respond(mut self, action: impl Action<T, S> + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }
}

/// An ordered list of dispatch cases, evaluated first-match-wins.
///
/// Built once at configuration time and immutable afterwards: safe to share
/// behind an `Arc` across request-handling threads with no locking.
pub struct Dispatcher<T, S> {
    rules: Vec<Rule<T, S>>,
}

impl<T, S> Dispatcher<T, S> {
    /// Evaluate cases in order against `subject`; the first whose condition
    /// holds and whose action reports handled wins.
    ///
    /// Returns `Ok(false)` if no case handled the request; the caller
    /// applies its own not-found behavior (or use
    /// [`handle()`](Dispatcher::handle)).
    ///
    /// # Errors
    ///
    /// An action failure aborts the dispatch and propagates.
    pub fn dispatch(&self, subject: &T, sink: &mut S) -> Result<bool, ActionError> {
        crate::evaluate::dispatch(&self.rules, subject, sink)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule<T, S>] {
        &self.rules
    }

    /// Human-readable rendering of the configured cases, intended for
    /// startup-time logging.
    #[must_use]
    pub fn configuration_info(&self) -> String {
        let mut out = String::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let _ = writeln!(out, "---- case {index} ----");
            let _ = writeln!(out, "  when: {}", rule.condition());
            let _ = writeln!(out, "  do: {}", rule.action().describe());
        }
        out
    }
}

impl<T: RequestView, S: ResponseSink> Dispatcher<T, S> {
    /// Dispatch, and write a plain 404 response if no case handled the
    /// request.
    ///
    /// # Errors
    ///
    /// An action failure, or an I/O failure writing the fallback body.
    pub fn handle(&self, subject: &T, sink: &mut S) -> Result<bool, ActionError> {
        if self.dispatch(subject, sink)? {
            return Ok(true);
        }
        let path = subject.path().unwrap_or_default();
        let body = format!("unknown mock request. path: {path}");
        sink.set_content_length(body.len() as u64);
        sink.set_status(404);
        sink.write_body(body.as_bytes())?;
        Ok(false)
    }
}

impl<T, S> fmt::Display for Dispatcher<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.configuration_info())
    }
}

impl<T, S> fmt::Debug for Dispatcher<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dispatcher({} cases)", self.rules.len())
    }
}

mod action;
mod condition;
mod dispatcher;
mod error;
mod request;
mod rule;
mod string_condition;

pub use action::{Action, Content, FnAction, Responder, ResponderBuilder, action_fn};
pub use condition::{Condition, Predicate};
pub use dispatcher::{CaseBuilder, Dispatcher, DispatcherBuilder};
pub use error::{ActionError, BuildError};
pub use request::{
    CapturedResponse, RequestConditionBuilder, RequestView, ResponseSink, SimpleRequest,
    StringConditionBuilder,
};
pub use rule::Rule;
pub use string_condition::{StringCondition, StringOp};

mod build;
mod evaluate;
mod types;

pub use build::ConditionBuilder;
pub use types::{
    Action, ActionError, BuildError, CapturedResponse, CaseBuilder, Condition, Content,
    Dispatcher, DispatcherBuilder, FnAction, Predicate, RequestConditionBuilder, RequestView,
    Responder, ResponderBuilder, ResponseSink, Rule, SimpleRequest, StringCondition,
    StringConditionBuilder, StringOp, action_fn,
};

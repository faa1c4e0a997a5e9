//! Event definitions and the machinery that evaluates and fires them.

pub mod actions;
pub mod condition;
pub mod event;
pub mod registry;
pub mod scheduler;

pub use actions::{ActionDispatcher, EventAction, Notifier, SmsTarget};
pub use condition::{Condition, ConditionEvaluator, Evaluation, Operator};
pub use event::{Event, EventDefinition, EventId, EventStatus, ItemKind};
pub use registry::{EventCounter, EventRegistry};
pub use scheduler::{
    ActionFailurePolicy, PollingScheduler, SchedulerConfig, SchedulerHandle, TickReport,
};

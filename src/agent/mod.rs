pub mod context;
pub mod progress;
pub mod runtime;
pub mod scheduler;

pub use context::ContextPolicy;
pub use progress::{no_progress, ProgressEvent, ProgressFn, ProgressStep};
pub use runtime::{AgentRuntime, CommandOutcome};
pub use scheduler::{AgentScheduler, ChatOptions, ChatOutcome, ConnectionStatus, SkillCall};

//! Progress reporting for a running `chat` call.

use std::fmt;

/// Phase of the tool-calling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStep {
    Thinking { iteration: u32, max: u32 },
    CallingApi,
    ExecutingSkill { name: String, index: usize, total: usize },
    Done,
}

impl fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thinking { iteration, max } => {
                write!(f, "Thinking... (iteration {iteration}/{max})")
            }
            Self::CallingApi => f.write_str("Calling AI API..."),
            Self::ExecutingSkill { name, index, total } => {
                write!(f, "Executing: {name} ({index}/{total})")
            }
            Self::Done => f.write_str("Done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub step: ProgressStep,
    /// 0 to 100.
    pub percent: f32,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>3.0}%] {}", self.percent, self.step)
    }
}

/// Callback invoked at each phase transition.
pub type ProgressFn<'a> = &'a (dyn Fn(ProgressEvent) + Send + Sync);

/// Ignores every event.
pub fn no_progress(_: ProgressEvent) {}

/// Share of the budget consumed after `completed` rounds plus the
/// fraction `partial` of the current one, clamped to 0..=100.
pub(crate) fn percent(completed: u32, partial: f32, max: u32) -> f32 {
    let max = max.max(1) as f32;
    ((completed as f32 + partial) / max * 100.0).clamp(0.0, 100.0)
}

//! Per-run session state.

use serde::Serialize;

use crate::llm::ToolCall;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The model ended a turn without requesting tools.
    Completed,
    /// The step cap was hit first; output is whatever was streamed.
    StepCapReached,
}

/// A tool call issued during the session.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    /// Step (1-based) in which the model requested the call
    pub step: usize,
    pub call_id: String,
    pub name: String,
    /// Raw JSON arguments from the model
    pub arguments: String,
    pub succeeded: bool,
    /// Result sent back to the model, truncated
    pub output: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl ToolInvocation {
    pub fn new(step: usize, call: &ToolCall, succeeded: bool, output: &str) -> Self {
        Self {
            step,
            call_id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
            succeeded,
            output: truncate_for_log(output, 1000),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Transient state for one orchestration run.
///
/// The step counter only moves forward and never passes `max_steps`.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    steps: usize,
    max_steps: usize,
    text: String,
    invocations: Vec<ToolInvocation>,
}

impl Session {
    pub fn new(max_steps: usize) -> Self {
        Self {
            steps: 0,
            max_steps,
            text: String::new(),
            invocations: Vec::new(),
        }
    }

    /// Claim the next step, or `None` once the cap is reached.
    pub fn begin_step(&mut self) -> Option<usize> {
        if self.is_exhausted() {
            return None;
        }
        self.steps += 1;
        Some(self.steps)
    }

    pub fn is_exhausted(&self) -> bool {
        self.steps >= self.max_steps
    }

    pub fn push_text(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    pub fn record(&mut self, invocation: ToolInvocation) {
        self.invocations.push(invocation);
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// All text streamed so far, across steps.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn invocations(&self) -> &[ToolInvocation] {
        &self.invocations
    }
}

/// Result of a finished session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub session: Session,
}

/// Truncate a string for logging purposes.
pub(crate) fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_stop_at_cap() {
        let mut session = Session::new(2);
        assert_eq!(session.begin_step(), Some(1));
        assert_eq!(session.begin_step(), Some(2));
        assert_eq!(session.begin_step(), None);
        assert_eq!(session.steps(), 2);
        assert!(session.is_exhausted());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("ééé", 3), "é... [truncated]");
    }

    #[test]
    fn invocation_copies_call_details() {
        let call = ToolCall::new("call_1", "generate_commit_message", "{}");
        let inv = ToolInvocation::new(3, &call, false, "Error: boom");
        assert_eq!(inv.step, 3);
        assert_eq!(inv.name, "generate_commit_message");
        assert!(!inv.succeeded);
        assert_eq!(inv.output, "Error: boom");
    }
}

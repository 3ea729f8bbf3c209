//! Agent module - the review orchestrator.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build context with system prompt and the review instruction
//! 2. Stream a model turn with the available tools, echoing text as it arrives
//! 3. If the model requests tool calls, execute them in order and feed results back
//! 4. Repeat until the model answers without tools or the step cap is reached

mod agent_loop;
mod prompt;
mod session;

pub use agent_loop::{Agent, AgentError};
pub use prompt::build_system_prompt;
pub use session::{Session, SessionOutcome, SessionReport, ToolInvocation};

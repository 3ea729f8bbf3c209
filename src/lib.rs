//! # Review Agent
//!
//! A command-line agent that reviews uncommitted git changes with an LLM.
//!
//! This library provides:
//! - A bounded, streaming tool loop driven by the model
//! - Tools to collect per-file diffs, synthesize a commit message, and write
//!   the review to a Markdown file
//! - An OpenAI-compatible streaming client (OpenRouter by default)
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Send the instruction with the system prompt and tool schemas
//! 2. Stream the model's text to the caller while collecting tool calls
//! 3. Validate and execute each tool call, feed results back to the model
//! 4. Stop when the model answers without tools or `max_steps` is reached
//!
//! ## Example
//!
//! ```rust,ignore
//! use review_agent::{agent::Agent, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(config);
//! let report = agent.run(&mut tokio::io::stdout()).await?;
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod git;
pub mod llm;
pub mod tools;

pub use config::Config;

//! Agent module - the research agent control loop.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Load the thread and append the user's message
//! 2. Call the model with the system prompt, history and available tools
//! 3. If the model requests tool calls, execute them and feed the results back
//! 4. Repeat until the model produces a final answer or max iterations is reached

mod agent_loop;
mod prompt;

#[cfg(test)]
pub(crate) mod test_utils;

pub use agent_loop::{
    Agent, AgentError, AgentTurnResult, LOOP_LIMIT_REPLY, MODEL_UNAVAILABLE_REPLY,
};
pub use prompt::build_system_prompt;

//! Tool-calling agent that manages a Transmission torrent client through an
//! OpenAI-compatible chat-completions endpoint.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod skills;
pub mod transmission;

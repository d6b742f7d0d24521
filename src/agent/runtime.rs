//! Terminal conversation loop.
//!
//! Lines starting with `/` are handled locally; everything else becomes one
//! `AgentScheduler::chat` turn over the running transcript.

use std::time::Instant;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::llm::Message;

use super::progress::ProgressEvent;
use super::scheduler::{AgentScheduler, ChatOptions, SkillCall};

/// Result of a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Reply(String),
    Quit,
}

/// Interactive terminal conversation on top of an [`AgentScheduler`].
///
/// Reads user lines from stdin, keeps the transcript across turns
/// (system prompt first), and prints answers to stdout. Progress and
/// tool activity go to stderr.
pub struct AgentRuntime {
    scheduler: AgentScheduler,
    config: AgentConfig,
    transcript: Vec<Message>,
    start_time: Instant,
}

impl AgentRuntime {
    pub fn new(scheduler: AgentScheduler, config: AgentConfig) -> Self {
        let transcript = vec![Message::system(config.system_prompt.clone())];
        Self {
            scheduler,
            config,
            transcript,
            start_time: Instant::now(),
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Main loop. Returns on `/quit`, end of input, or Ctrl-C at the prompt.
    pub async fn run(&mut self) -> Result<()> {
        info!("Agent runtime started, type /help for commands");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, exiting");
                    return Ok(());
                }
            };
            let Some(line) = line else {
                info!("End of input, exiting");
                return Ok(());
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            // Slash commands are intercepted before the LLM
            if line.starts_with('/') {
                match self.handle_command(line).await {
                    CommandOutcome::Reply(text) => println!("{text}"),
                    CommandOutcome::Quit => return Ok(()),
                }
                continue;
            }

            // Ctrl-C during a chat cancels it; the loop keeps running
            let cancel = CancellationToken::new();
            let response = {
                let chat = self.handle_message(line, cancel.clone());
                tokio::pin!(chat);
                tokio::select! {
                    response = &mut chat => response,
                    _ = tokio::signal::ctrl_c() => {
                        warn!("Interrupted, cancelling the current request");
                        cancel.cancel();
                        chat.await
                    }
                }
            };

            match response {
                Ok(text) => println!("\n{text}\n"),
                Err(e) => {
                    error!("Error processing message: {e}");
                    println!("Sorry, an error occurred: {e}");
                }
            }
        }
    }

    // ── Slash commands ────────────────────────────────────

    /// Handles a slash command. These never reach the LLM.
    pub async fn handle_command(&mut self, body: &str) -> CommandOutcome {
        let command = body
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();

        info!("Slash command: {command}");

        let reply = match command.as_str() {
            "/quit" | "/exit" => return CommandOutcome::Quit,
            "/new" | "/reset" => self.cmd_reset(),
            "/models" => self.cmd_models().await,
            "/ping" => self.cmd_ping().await,
            "/skills" => self.cmd_skills(),
            "/help" => self.cmd_help(),
            _ => format!("Unknown command: {command}\nType /help for available commands."),
        };
        CommandOutcome::Reply(reply)
    }

    /// /reset: Drop the conversation, keep the system prompt
    fn cmd_reset(&mut self) -> String {
        self.transcript.truncate(0);
        self.transcript
            .push(Message::system(self.config.system_prompt.clone()));
        "Conversation reset.".to_string()
    }

    /// /models: List models offered by the AI endpoint
    async fn cmd_models(&self) -> String {
        let models = self.scheduler.get_models().await;
        if models.is_empty() {
            return "No models available (check the AI endpoint).".to_string();
        }
        let mut out = format!("{} model(s):", models.len());
        for model in models {
            if model.name == model.id {
                out.push_str(&format!("\n  {}", model.id));
            } else {
                out.push_str(&format!("\n  {} ({})", model.id, model.name));
            }
        }
        out
    }

    /// /ping: Check the AI endpoint
    async fn cmd_ping(&self) -> String {
        let status = self.scheduler.test_connection().await;
        let uptime = self.start_time.elapsed().as_secs();
        if status.success {
            format!("pong (AI endpoint reachable, up {uptime}s)")
        } else {
            format!(
                "AI endpoint unreachable: {}",
                status.error.unwrap_or(status.message)
            )
        }
    }

    /// /skills: List the tools offered to the model
    fn cmd_skills(&self) -> String {
        let skills = self.scheduler.skills();
        let mut out = format!("{} skill(s):", skills.len());
        for skill in skills {
            out.push_str(&format!("\n  {}: {}", skill.name(), skill.description()));
        }
        out
    }

    fn cmd_help(&self) -> String {
        "\
Commands:\n\
  /reset   Start a new conversation\n\
  /models  List models available on the AI endpoint\n\
  /ping    Check the AI endpoint\n\
  /skills  List the tools the assistant can use\n\
  /quit    Exit\n\
  /help    This message\n\
Press Ctrl-C to cancel a running request."
            .to_string()
    }

    // ── LLM message handling ─────────────────────────────

    /// Runs one chat turn. The transcript only grows when the turn succeeds.
    pub async fn handle_message(
        &mut self,
        body: &str,
        cancel: CancellationToken,
    ) -> Result<String, AgentError> {
        let user = Message::user(body);
        let mut messages = self.transcript.clone();
        messages.push(user.clone());

        let options = ChatOptions {
            max_iterations: self.config.max_iterations,
            cancel,
            deadline: self.config.chat_timeout(),
        };

        match self.scheduler.chat(messages, options, &print_progress).await {
            Ok(outcome) => {
                report_skill_calls(&outcome.skill_calls);
                info!(
                    "Response: {} chars after {} iteration(s)",
                    outcome.content.len(),
                    outcome.iterations
                );
                self.transcript.push(user);
                self.transcript
                    .push(Message::assistant(outcome.content.clone()));
                Ok(outcome.content)
            }
            Err(e) => {
                report_skill_calls(e.skill_calls());
                Err(e)
            }
        }
    }
}

fn print_progress(event: ProgressEvent) {
    eprintln!("  {event}");
}

fn report_skill_calls(calls: &[SkillCall]) {
    for call in calls {
        match &call.error {
            None => eprintln!("  ✓ {}", call.skill_name),
            Some(e) => eprintln!("  ✗ {}: {e}", call.skill_name),
        }
    }
}

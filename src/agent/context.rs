//! Transcript trimming by message count.
//!
//! A cheap stand-in for token counting: past `max_messages`, every system
//! message is kept and only the `keep_recent` latest others survive. Tool
//! results whose requesting assistant message fell outside the window are
//! dropped too, since chat APIs reject a `tool` message without it.

use std::collections::HashSet;

use crate::llm::{Message, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextPolicy {
    pub max_messages: usize,
    pub keep_recent: usize,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            max_messages: 20,
            keep_recent: 10,
        }
    }
}

impl ContextPolicy {
    /// Returns `messages` unchanged when within bounds, otherwise the system
    /// messages followed by the most recent non-system ones, each partition
    /// in its original order. The result never holds more than
    /// `system + keep_recent` messages and never an orphaned tool result.
    pub fn trim(&self, messages: Vec<Message>) -> Vec<Message> {
        if messages.len() <= self.max_messages {
            return messages;
        }

        let (system, rest): (Vec<Message>, Vec<Message>) =
            messages.into_iter().partition(Message::is_system);

        let skip = rest.len().saturating_sub(self.keep_recent);
        let recent: Vec<Message> = rest.into_iter().skip(skip).collect();

        let mut trimmed = system;
        trimmed.extend(drop_orphaned_results(recent));
        trimmed
    }
}

/// Removes tool results not preceded by an assistant message that requested
/// their `tool_call_id`.
fn drop_orphaned_results(messages: Vec<Message>) -> Vec<Message> {
    let mut requested: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(messages.len());

    for message in messages {
        if message.role == Role::Tool {
            let paired = message
                .tool_call_id
                .as_ref()
                .is_some_and(|id| requested.contains(id));
            if !paired {
                continue;
            }
        }
        if let Some(calls) = &message.tool_calls {
            requested.extend(calls.iter().map(|c| c.id.clone()));
        }
        kept.push(message);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FunctionCall, ToolCall};

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "get_stats".to_string(),
                arguments: "{}".to_string(),
            },
        }
    }

    /// One tool round: assistant requesting `a`/`b`, then both results.
    fn round(n: usize) -> Vec<Message> {
        let (a, b) = (format!("a{n}"), format!("b{n}"));
        vec![
            Message::assistant_tool_calls("", vec![call(&a), call(&b)]),
            Message::tool_result(a, "{}"),
            Message::tool_result(b, "{}"),
        ]
    }

    fn assert_no_orphans(messages: &[Message]) {
        let mut requested = HashSet::new();
        for m in messages {
            if let Some(calls) = &m.tool_calls {
                requested.extend(calls.iter().map(|c| c.id.clone()));
            }
            if m.role == Role::Tool {
                let id = m.tool_call_id.clone().unwrap_or_default();
                assert!(requested.contains(&id), "orphaned tool result {id}");
            }
        }
    }

    fn transcript(system: usize, others: usize) -> Vec<Message> {
        let mut messages: Vec<Message> = (0..system)
            .map(|i| Message::system(format!("sys {i}")))
            .collect();
        messages.extend((0..others).map(|i| {
            if i % 2 == 0 {
                Message::user(format!("msg {i}"))
            } else {
                Message::assistant(format!("msg {i}"))
            }
        }));
        messages
    }

    #[test]
    fn test_within_bound_unchanged() {
        let policy = ContextPolicy::default();
        for len in [0, 1, 10, 20] {
            let messages = transcript(1, len.max(1) - 1);
            assert_eq!(policy.trim(messages.clone()), messages);
        }
    }

    #[test]
    fn test_over_bound_keeps_system_and_recent() {
        let policy = ContextPolicy::default();
        let trimmed = policy.trim(transcript(2, 25));

        assert_eq!(trimmed.len(), 2 + 10);
        assert!(trimmed[..2].iter().all(|m| m.role == Role::System));
        assert_eq!(trimmed[0].content, "sys 0");
        assert_eq!(trimmed[1].content, "sys 1");
        assert_eq!(trimmed[2].content, "msg 15");
        assert_eq!(trimmed[11].content, "msg 24");
    }

    #[test]
    fn test_interleaved_system_messages_move_first() {
        let policy = ContextPolicy {
            max_messages: 4,
            keep_recent: 2,
        };
        let messages = vec![
            Message::user("a"),
            Message::system("s1"),
            Message::user("b"),
            Message::system("s2"),
            Message::user("c"),
        ];
        let trimmed = policy.trim(messages);
        let contents: Vec<&str> = trimmed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["s1", "s2", "b", "c"]);
    }

    #[test]
    fn test_size_formula() {
        let policy = ContextPolicy::default();
        for (k, n) in [(0, 21), (3, 18), (5, 30), (21, 0), (15, 8)] {
            let trimmed = policy.trim(transcript(k, n));
            if k + n <= 20 {
                assert_eq!(trimmed.len(), k + n);
            } else {
                assert_eq!(trimmed.len(), k + n.min(10), "k={k} n={n}");
            }
        }
    }

    #[test]
    fn test_cut_inside_tool_round_drops_orphaned_results() {
        let policy = ContextPolicy::default();
        let mut messages = vec![Message::system("sys")];
        messages.extend((0..10).map(|i| Message::user(format!("u{i}"))));
        for n in 0..4 {
            messages.extend(round(n));
        }
        // 1 + 10 + 12 = 23: the last 10 start at result b0 of round 0
        let trimmed = policy.trim(messages);

        assert_no_orphans(&trimmed);
        assert!(trimmed.len() <= 1 + 10);
        assert_eq!(trimmed.len(), 1 + 9);
        assert_eq!(trimmed[1].tool_calls.as_ref().unwrap()[0].id, "a1");
    }

    #[test]
    fn test_complete_rounds_survive() {
        let policy = ContextPolicy {
            max_messages: 5,
            keep_recent: 6,
        };
        let mut messages = vec![Message::system("sys"), Message::user("hi")];
        messages.extend(round(0));
        messages.extend(round(1));
        let trimmed = policy.trim(messages);

        assert_eq!(trimmed.len(), 1 + 6);
        assert_no_orphans(&trimmed);
        assert_eq!(trimmed[6].tool_call_id.as_deref(), Some("b1"));
    }

    #[test]
    fn test_result_without_id_dropped() {
        let policy = ContextPolicy {
            max_messages: 1,
            keep_recent: 5,
        };
        let mut unpaired = Message::tool_result("x", "{}");
        unpaired.tool_call_id = None;
        let trimmed = policy.trim(vec![Message::user("q"), unpaired]);
        assert_eq!(trimmed, vec![Message::user("q")]);
    }
}

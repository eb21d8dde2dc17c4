//! Line-based console transport for running the bot without a chat client.
//!
//! Stdin lines arrive as individual messages of the [`CONSOLE_CONVERSATION`]
//! conversation; replies are printed to stdout. Add `"console"` to the
//! listen list (or set it as `cmd`) to talk to the bot from the terminal.

use std::io::BufRead;
use std::thread;

use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

use super::{ChatTransport, IncomingMessage, MessageBatch, MessageKind};
use crate::error::Result;

/// Conversation id every console line is attributed to.
pub const CONSOLE_CONVERSATION: &str = "console";

pub struct ConsoleTransport {
    lines: mpsc::UnboundedReceiver<String>,
}

impl ConsoleTransport {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        // Blocking stdin reader; the channel closes when stdin does.
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines: rx }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn register_listener(&mut self, conversation: &str) -> Result<()> {
        debug!("Console transport hears everything; listener for {conversation} is implicit");
        Ok(())
    }

    async fn poll_messages(&mut self) -> Result<MessageBatch> {
        let mut messages = Vec::new();
        while let Ok(line) = self.lines.try_recv() {
            let text = line.trim().to_string();
            if text.is_empty() {
                continue;
            }
            messages.push(IncomingMessage {
                kind: MessageKind::Individual,
                sender: CONSOLE_CONVERSATION.to_string(),
                text,
            });
        }

        if messages.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![(CONSOLE_CONVERSATION.to_string(), messages)])
    }

    async fn send(
        &mut self,
        _conversation: &str,
        text: &str,
        mention: Option<&str>,
    ) -> Result<()> {
        match mention {
            Some(member) => println!("@{member} {text}"),
            None => println!("{text}"),
        }
        Ok(())
    }
}

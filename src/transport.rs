//! Messaging-transport seam and inbound message types.

pub mod console;

use async_trait::async_trait;

use crate::error::Result;

/// Kind of an inbound chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A regular message written by another account.
    Individual,
    /// A system notice (joins, recalls, timestamps).
    System,
    /// A message sent from the bot's own account.
    Own,
}

/// A single inbound chat message.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub kind: MessageKind,
    pub sender: String,
    pub text: String,
}

/// Pending messages of one fetch: one entry per conversation, in the
/// transport's fetch order, chronological within a conversation.
pub type MessageBatch = Vec<(String, Vec<IncomingMessage>)>;

/// Seam over the desktop messaging client.
#[async_trait]
pub trait ChatTransport: Send {
    /// Register a conversation as monitored. Registration is additive and
    /// idempotent from the bot's point of view.
    async fn register_listener(&mut self, conversation: &str) -> Result<()>;

    /// Fetch all newly arrived messages across monitored conversations.
    async fn poll_messages(&mut self) -> Result<MessageBatch>;

    /// Send `text` into `conversation`, optionally mentioning a member.
    async fn send(&mut self, conversation: &str, text: &str, mention: Option<&str>)
    -> Result<()>;
}

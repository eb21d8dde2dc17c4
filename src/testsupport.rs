//! Test doubles shared by the routing, command, and bot tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::bot::{Bot, SessionFactory};
use crate::completion::Completion;
use crate::config::{Configuration, Session, Store};
use crate::error::{BotError, Result};
use crate::transport::{ChatTransport, IncomingMessage, MessageBatch, MessageKind};

/// Prompts and model ids handed to the completion double.
pub type CompletionCalls = Arc<Mutex<Vec<(String, String)>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub conversation: String,
    pub text: String,
    pub mention: Option<String>,
}

/// Transport double recording registrations and outgoing messages.
#[derive(Default)]
pub struct MockTransport {
    pub registered: Vec<String>,
    pub sent: Vec<SentMessage>,
    pub batches: VecDeque<MessageBatch>,
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn register_listener(&mut self, conversation: &str) -> Result<()> {
        self.registered.push(conversation.to_string());
        Ok(())
    }

    async fn poll_messages(&mut self) -> Result<MessageBatch> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }

    async fn send(
        &mut self,
        conversation: &str,
        text: &str,
        mention: Option<&str>,
    ) -> Result<()> {
        self.sent.push(SentMessage {
            conversation: conversation.to_string(),
            text: text.to_string(),
            mention: mention.map(str::to_string),
        });
        Ok(())
    }
}

/// Completion double recording every call; fails when `fail` is set.
pub struct RecordingCompletion {
    pub calls: CompletionCalls,
    pub fail: bool,
}

#[async_trait]
impl Completion for RecordingCompletion {
    async fn generate(&self, prompt: &str, model: &str, _streaming: bool) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.to_string()));
        if self.fail {
            return Err(BotError::CompletionResponse("scripted failure".to_string()));
        }
        Ok(format!("echo: {prompt}"))
    }
}

pub fn individual(sender: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        kind: MessageKind::Individual,
        sender: sender.to_string(),
        text: text.to_string(),
    }
}

pub fn sample_config() -> Configuration {
    Configuration {
        listen_list: vec!["alice".to_string()],
        group: "g1".to_string(),
        group_switch: true,
        api_key: "test-key".to_string(),
        base_url: "http://localhost:8080/v1".to_string(),
        at_me: "@bot".to_string(),
        cmd: "admin".to_string(),
        model1: "model-one".to_string(),
        model2: "model-two".to_string(),
        bot_name: "testbot".to_string(),
    }
}

/// Bot over a seeded temp-file store, a [`MockTransport`], and a recording
/// completion double. Returns the call log alongside the bot.
pub fn test_bot(config: Configuration, fail: bool) -> (Bot<MockTransport>, CompletionCalls) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::new(dir.path().join("config.json"));
    // Keep the backing file alive for the whole test.
    std::mem::forget(dir);
    store.save(&config).expect("seed store");

    let calls: CompletionCalls = Arc::new(Mutex::new(Vec::new()));
    let handle = Arc::clone(&calls);
    let factory: SessionFactory = Box::new(move |config: &Configuration| Session {
        active_model: config.model1.clone(),
        completion: Box::new(RecordingCompletion {
            calls: Arc::clone(&handle),
            fail,
        }),
    });

    let bot = Bot::with_session_factory(store, config, MockTransport::default(), factory);
    (bot, calls)
}

//! Bot state, configuration mutations, and the polling loop.

use std::time::Duration;

use log::{error, info, warn};

use crate::config::{Configuration, Session, Store};
use crate::error::Result;
use crate::router;
use crate::transport::{ChatTransport, MessageBatch};

/// Delay between polling iterations.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Builds a fresh [`Session`] from the current configuration. Runs on every
/// refresh, so the active model is always reset to `model1`.
pub type SessionFactory = Box<dyn Fn(&Configuration) -> Session + Send + Sync>;

/// The assistant bridge: configuration, runtime session, and the transport
/// it listens and replies through.
pub struct Bot<T: ChatTransport> {
    pub(crate) store: Store,
    pub(crate) config: Configuration,
    pub(crate) session: Session,
    pub(crate) transport: T,
    session_factory: SessionFactory,
}

impl<T: ChatTransport> Bot<T> {
    /// Create a bot over an already-loaded configuration.
    pub fn new(store: Store, config: Configuration, transport: T) -> Self {
        Self::with_session_factory(store, config, transport, Box::new(Session::from_config))
    }

    /// Create a bot with a custom session factory.
    pub fn with_session_factory(
        store: Store,
        config: Configuration,
        transport: T,
        session_factory: SessionFactory,
    ) -> Self {
        let session = session_factory(&config);
        Self {
            store,
            config,
            session,
            transport,
            session_factory,
        }
    }

    /// Reload the configuration from the store and rebuild the session.
    ///
    /// Rebuilding resets the active model to `model1` and re-binds the
    /// completion client to the stored credentials. An unreadable store
    /// parks the bot (see [`Store::load_or_wait`]).
    pub(crate) async fn refresh(&mut self) {
        self.config = self.store.load_or_wait().await;
        self.session = (self.session_factory)(&self.config);
        info!("Configuration refreshed");
    }

    /// Persist the current configuration, then refresh from the store.
    ///
    /// A failed write keeps the in-memory change and skips the reload; the
    /// store becomes consistent again on the next successful save.
    async fn persist(&mut self) {
        match self.store.save(&self.config) {
            Ok(()) => self.refresh().await,
            Err(e) => warn!("Configuration not persisted: {e}"),
        }
    }

    /// Append `name` to the listen list. A name already on the list is a
    /// no-op without a store write.
    pub(crate) async fn add_user(&mut self, name: &str) {
        if self.config.listen_list.iter().any(|c| c == name) {
            info!("{name} is already on the listen list");
            return;
        }
        self.config.listen_list.push(name.to_string());
        self.persist().await;
        info!("Listen list after adding {name}: {:?}", self.config.listen_list);
    }

    /// Remove `name` from the listen list. An absent name is a no-op
    /// without a store write.
    pub(crate) async fn remove_user(&mut self, name: &str) {
        let before = self.config.listen_list.len();
        self.config.listen_list.retain(|c| c != name);
        if self.config.listen_list.len() == before {
            info!("{name} is not on the listen list");
            return;
        }
        self.persist().await;
        info!("Listen list after removing {name}: {:?}", self.config.listen_list);
    }

    /// Replace the monitored group. Only one group is monitored at a time.
    pub(crate) async fn set_group(&mut self, id: &str) {
        self.config.group = id.to_string();
        self.persist().await;
        info!("Monitored group changed to {}", self.config.group);
    }

    pub(crate) async fn set_group_switch(&mut self, enabled: bool) {
        self.config.group_switch = enabled;
        self.persist().await;
        info!("Group switch set to {enabled}");
    }

    /// Re-register every monitored conversation with the transport.
    ///
    /// Registration is additive: stale registrations are left in place and
    /// their messages are dropped by the monitored check instead.
    pub(crate) async fn refresh_listeners(&mut self) -> Result<()> {
        for conversation in &self.config.listen_list {
            self.transport.register_listener(conversation).await?;
        }
        if self.config.group_switch && !self.config.group.is_empty() {
            self.transport.register_listener(&self.config.group).await?;
            info!("Group listener registered for {}", self.config.group);
        }
        info!("Listeners refreshed");
        Ok(())
    }

    /// Generate a streaming reply with the active model, substituting the
    /// user-facing failure text when the completion call errors out.
    pub(crate) async fn generate_reply(&self, prompt: &str) -> String {
        match self
            .session
            .completion
            .generate(prompt, &self.session.active_model, true)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!("Completion call failed: {e}");
                e.user_message()
            }
        }
    }

    pub(crate) async fn send(
        &mut self,
        conversation: &str,
        text: &str,
        mention: Option<&str>,
    ) -> Result<()> {
        self.transport.send(conversation, text, mention).await
    }

    /// Route every message of one fetch, isolating per-message failures so
    /// the remaining messages of the same fetch are still processed.
    pub(crate) async fn process_batch(&mut self, batch: MessageBatch) {
        for (conversation, messages) in batch {
            for message in messages {
                if let Err(e) = router::route_message(self, &conversation, &message).await {
                    error!("Error while processing a message from {conversation}: {e}");
                }
            }
        }
    }

    /// Poll the transport and route every pending message, forever.
    ///
    /// No message is allowed to take the process down: poll and routing
    /// failures are logged and the loop continues after its fixed delay.
    pub async fn run(&mut self) -> Result<()> {
        self.refresh_listeners().await?;

        loop {
            match self.transport.poll_messages().await {
                Ok(batch) => self.process_batch(batch).await,
                Err(e) => error!("Error while fetching pending messages: {e}"),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

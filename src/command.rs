//! Administrator command grammar and dispatch.

use log::info;

use crate::bot::Bot;
use crate::error::Result;
use crate::router::ACK_NOTICE;
use crate::transport::ChatTransport;

/// One administrative operation, parsed from admin-channel text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddUser(String),
    RemoveUser(String),
    SetGroup(String),
    EnableGroup,
    DisableGroup,
    CurrentModel,
    SwitchModel1,
    SwitchModel2,
    ReloadConfig,
    Help,
}

impl Command {
    /// Match `text` against the fixed grammar. First match wins; anything
    /// unmatched falls through to the ordinary chat path.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(name) = text.strip_prefix("add user") {
            return Some(Self::AddUser(name.trim().to_string()));
        }
        if let Some(name) = text.strip_prefix("remove user") {
            return Some(Self::RemoveUser(name.trim().to_string()));
        }
        if let Some(id) = text.strip_prefix("change group to") {
            return Some(Self::SetGroup(id.trim().to_string()));
        }

        match text {
            "enable group bot" => Some(Self::EnableGroup),
            "disable group bot" => Some(Self::DisableGroup),
            "current model" => Some(Self::CurrentModel),
            "switch model 1" => Some(Self::SwitchModel1),
            "switch model 2" => Some(Self::SwitchModel2),
            "reload config" => Some(Self::ReloadConfig),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

const HELP_TEXT: &str = "\
Commands (send the quoted text):
\"add user NAME\" (add NAME to the listen list)
\"remove user NAME\"
\"change group to GROUP\" (change the monitored group; only one group at a time)
\"enable group bot\"
\"disable group bot\"
\"current model\" (show the model currently in use)
\"switch model 1\" (reply with the configured model1)
\"switch model 2\" (reply with the configured model2)
\"reload config\" (re-read the configuration after editing it by hand)
\"help\"";

/// Execute one admin-channel message and reply into the same channel.
///
/// Every mutation completes (or fails) before the confirmation reply goes
/// out, and every reply echoes the triggering command text.
pub async fn handle_admin<T: ChatTransport>(
    bot: &mut Bot<T>,
    conversation: &str,
    text: &str,
) -> Result<()> {
    let Some(command) = Command::parse(text) else {
        // Unmatched admin text is ordinary chat.
        bot.send(conversation, ACK_NOTICE, None).await?;
        let reply = bot.generate_reply(text).await;
        return bot.send(conversation, &reply, None).await;
    };

    info!("Admin command: {command:?}");
    let reply = match command {
        Command::AddUser(name) => {
            bot.add_user(&name).await;
            bot.refresh_listeners().await?;
            format!("{text} done\n{}", bot.config.listen_list.join("  "))
        }
        Command::RemoveUser(name) => {
            bot.remove_user(&name).await;
            bot.refresh_listeners().await?;
            format!("{text} done\n{}", bot.config.listen_list.join("  "))
        }
        Command::SetGroup(id) => {
            bot.set_group(&id).await;
            bot.refresh_listeners().await?;
            format!("{text} done")
        }
        Command::EnableGroup => {
            bot.set_group_switch(true).await;
            bot.refresh_listeners().await?;
            format!("{text} done")
        }
        Command::DisableGroup => {
            bot.set_group_switch(false).await;
            bot.refresh_listeners().await?;
            format!("{text} done")
        }
        Command::CurrentModel => format!("{text} {}", bot.session.active_model),
        Command::SwitchModel1 => {
            // In-memory switch only; not persisted.
            bot.session.active_model = bot.config.model1.clone();
            format!("{text} done")
        }
        Command::SwitchModel2 => {
            bot.session.active_model = bot.config.model2.clone();
            format!("{text} done")
        }
        Command::ReloadConfig => {
            bot.refresh().await;
            bot.refresh_listeners().await?;
            format!("{text} done")
        }
        Command::Help => HELP_TEXT.to_string(),
    };

    bot.send(conversation, &reply, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::route_message;
    use crate::testsupport::{individual, sample_config, test_bot};

    #[test]
    fn parses_prefix_commands_and_trims_arguments() {
        assert_eq!(
            Command::parse("add user  dave "),
            Some(Command::AddUser("dave".to_string()))
        );
        assert_eq!(
            Command::parse("remove user dave"),
            Some(Command::RemoveUser("dave".to_string()))
        );
        assert_eq!(
            Command::parse("change group to team chat"),
            Some(Command::SetGroup("team chat".to_string()))
        );
    }

    #[test]
    fn parses_exact_commands() {
        assert_eq!(Command::parse("enable group bot"), Some(Command::EnableGroup));
        assert_eq!(Command::parse("disable group bot"), Some(Command::DisableGroup));
        assert_eq!(Command::parse("current model"), Some(Command::CurrentModel));
        assert_eq!(Command::parse("switch model 1"), Some(Command::SwitchModel1));
        assert_eq!(Command::parse("switch model 2"), Some(Command::SwitchModel2));
        assert_eq!(Command::parse("reload config"), Some(Command::ReloadConfig));
        assert_eq!(Command::parse("help"), Some(Command::Help));
    }

    #[test]
    fn exact_commands_do_not_match_loosely() {
        assert_eq!(Command::parse("Help"), None);
        assert_eq!(Command::parse("current model please"), None);
        assert_eq!(Command::parse("tell me a story"), None);
    }

    #[test]
    fn prefix_match_wins_over_exact_words_later_in_the_text() {
        assert_eq!(
            Command::parse("add user help"),
            Some(Command::AddUser("help".to_string()))
        );
    }

    #[test]
    fn help_text_lists_every_command() {
        for needle in [
            "add user",
            "remove user",
            "change group to",
            "enable group bot",
            "disable group bot",
            "current model",
            "switch model 1",
            "switch model 2",
            "reload config",
        ] {
            assert!(HELP_TEXT.contains(needle), "help misses {needle}");
        }
    }

    fn admin_config() -> crate::config::Configuration {
        let mut config = sample_config();
        config.listen_list.push("admin".to_string());
        config
    }

    #[tokio::test]
    async fn add_user_via_admin_channel_updates_list_and_echoes() {
        let (mut bot, _calls) = test_bot(admin_config(), false);

        route_message(&mut bot, "admin", &individual("admin", "add user dave"))
            .await
            .expect("routed");

        assert!(bot.config.listen_list.contains(&"dave".to_string()));
        let reply = bot.transport.sent.last().expect("reply sent");
        assert_eq!(reply.conversation, "admin");
        assert!(reply.text.starts_with("add user dave done"));
        assert!(reply.text.contains("dave"));
        assert!(bot.transport.registered.contains(&"dave".to_string()));
    }

    #[tokio::test]
    async fn remove_user_reply_lists_remaining_users() {
        let (mut bot, _calls) = test_bot(admin_config(), false);

        handle_admin(&mut bot, "admin", "remove user alice")
            .await
            .expect("handled");

        assert!(!bot.config.listen_list.contains(&"alice".to_string()));
        let reply = bot.transport.sent.last().expect("reply sent");
        assert!(reply.text.starts_with("remove user alice done"));
        assert!(!reply.text.contains("alice"));
    }

    #[tokio::test]
    async fn switch_model_is_in_memory_only() {
        let (mut bot, _calls) = test_bot(admin_config(), false);

        handle_admin(&mut bot, "admin", "switch model 2")
            .await
            .expect("handled");

        assert_eq!(bot.session.active_model, "model-two");
        // The store still knows nothing about the switch.
        let stored = bot.store.load().expect("reload");
        assert_eq!(stored.model1, "model-one");
        assert_eq!(
            bot.transport.sent.last().expect("reply sent").text,
            "switch model 2 done"
        );
    }

    #[tokio::test]
    async fn model_switch_is_undone_by_any_mutating_command() {
        let (mut bot, _calls) = test_bot(admin_config(), false);

        handle_admin(&mut bot, "admin", "switch model 2")
            .await
            .expect("handled");
        handle_admin(&mut bot, "admin", "change group to g9")
            .await
            .expect("handled");

        assert_eq!(bot.session.active_model, "model-one");
        assert_eq!(bot.config.group, "g9");
    }

    #[tokio::test]
    async fn current_model_echoes_the_active_model() {
        let (mut bot, _calls) = test_bot(admin_config(), false);

        handle_admin(&mut bot, "admin", "current model")
            .await
            .expect("handled");

        assert_eq!(
            bot.transport.sent.last().expect("reply sent").text,
            "current model model-one"
        );
    }

    #[tokio::test]
    async fn enable_and_disable_toggle_the_persisted_switch() {
        let mut config = admin_config();
        config.group_switch = false;
        let (mut bot, _calls) = test_bot(config, false);

        handle_admin(&mut bot, "admin", "enable group bot")
            .await
            .expect("handled");
        assert!(bot.config.group_switch);
        assert!(bot.store.load().expect("reload").group_switch);

        handle_admin(&mut bot, "admin", "disable group bot")
            .await
            .expect("handled");
        assert!(!bot.config.group_switch);
        assert!(!bot.store.load().expect("reload").group_switch);
    }

    #[tokio::test]
    async fn reload_config_picks_up_external_edits() {
        let (mut bot, _calls) = test_bot(admin_config(), false);
        let mut edited = bot.config.clone();
        edited.bot_name = "renamed".to_string();
        bot.store.save(&edited).expect("external edit");

        handle_admin(&mut bot, "admin", "reload config")
            .await
            .expect("handled");

        assert_eq!(bot.config.bot_name, "renamed");
        assert_eq!(
            bot.transport.sent.last().expect("reply sent").text,
            "reload config done"
        );
    }

    #[tokio::test]
    async fn unmatched_admin_text_goes_to_the_chat_path() {
        let (mut bot, calls) = test_bot(admin_config(), false);

        handle_admin(&mut bot, "admin", "write me a haiku")
            .await
            .expect("handled");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "write me a haiku");
        assert_eq!(bot.transport.sent[0].text, ACK_NOTICE);
        assert_eq!(bot.transport.sent[1].text, "echo: write me a haiku");
    }

    #[tokio::test]
    async fn help_reply_is_the_static_listing() {
        let (mut bot, calls) = test_bot(admin_config(), false);

        handle_admin(&mut bot, "admin", "help").await.expect("handled");

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(bot.transport.sent.last().expect("reply sent").text, HELP_TEXT);
    }
}

//! Inbound message classification and dispatch.

use log::{debug, info};

use crate::bot::Bot;
use crate::command;
use crate::error::Result;
use crate::transport::{ChatTransport, IncomingMessage, MessageKind};

/// Identity query answered without a completion call.
const IDENTITY_QUERY: &str = "who are you";

/// Fixed acknowledgement sent before a completion call on the direct path.
pub(crate) const ACK_NOTICE: &str = "Received, please wait for the answer";

/// Remove every occurrence of the mention token and trim the remainder.
fn strip_mention(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.trim().to_string();
    }
    text.replace(token, "").trim().to_string()
}

/// Classify one inbound message and dispatch it.
///
/// Order matters: identity shortcut first, then the group path (which never
/// falls through), then the administrator channel, then plain direct
/// messages.
pub async fn route_message<T: ChatTransport>(
    bot: &mut Bot<T>,
    conversation: &str,
    message: &IncomingMessage,
) -> Result<()> {
    if message.kind != MessageKind::Individual {
        return Ok(());
    }

    let monitored = bot.config.listen_list.iter().any(|c| c == conversation)
        || (conversation == bot.config.group && bot.config.group_switch);
    if !monitored {
        debug!("Dropping message from unmonitored conversation {conversation}");
        return Ok(());
    }

    info!("{} asks: {}", message.sender, message.text);

    if message.text == IDENTITY_QUERY
        || strip_mention(&message.text, &bot.config.at_me) == IDENTITY_QUERY
    {
        let reply = format!("I am {}", bot.config.display_name());
        return bot.send(conversation, &reply, None).await;
    }

    if conversation == bot.config.group {
        if !bot.config.at_me.is_empty() && message.text.contains(&bot.config.at_me) {
            let prompt = strip_mention(&message.text, &bot.config.at_me);
            let reply = bot.generate_reply(&prompt).await;
            bot.send(conversation, &reply, Some(&message.sender)).await?;
        }
        return Ok(());
    }

    if conversation == bot.config.cmd {
        return command::handle_admin(bot, conversation, &message.text).await;
    }

    bot.send(conversation, ACK_NOTICE, None).await?;
    let reply = bot.generate_reply(&message.text).await;
    bot.send(conversation, &reply, None).await
}

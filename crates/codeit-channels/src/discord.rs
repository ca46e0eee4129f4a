use std::sync::Arc;

use codeit_core::{parse_command, CommandDispatcher};
use codeit_schema::{GuildId, InboundMessage};
use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::async_trait;
use serenity::Client;

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

pub struct DiscordAdapter;

impl DiscordAdapter {
    /// Guild channels share one session per guild; DMs get one per channel.
    pub fn guild_key(guild_id: Option<u64>, channel_id: u64) -> GuildId {
        match guild_id {
            Some(gid) => GuildId::guild(gid),
            None => GuildId::direct(channel_id),
        }
    }

    pub fn to_inbound(guild_id: Option<u64>, channel_id: u64, text: &str) -> InboundMessage {
        InboundMessage::new("discord", Self::guild_key(guild_id, channel_id), text)
    }
}

/// Splits a reply into chunks of at most `limit` characters, breaking on line
/// boundaries where possible. Whitespace-only chunks are dropped.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    fn flush(chunks: &mut Vec<String>, current: &mut String) {
        let chunk = std::mem::take(current);
        let chunk = chunk.trim_end_matches('\n');
        if !chunk.trim().is_empty() {
            chunks.push(chunk.to_string());
        }
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && current_len > 0 {
            flush(&mut chunks, &mut current);
            current_len = 0;
        }
        if line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        // A single line longer than the limit is cut at character boundaries.
        for ch in line.chars() {
            if current_len == limit {
                flush(&mut chunks, &mut current);
                current_len = 0;
            }
            current.push(ch);
            current_len += 1;
        }
    }
    flush(&mut chunks, &mut current);
    chunks
}

pub struct DiscordBot {
    token: String,
    dispatcher: Arc<CommandDispatcher>,
}

impl DiscordBot {
    pub fn new(token: String, dispatcher: Arc<CommandDispatcher>) -> Self {
        Self { token, dispatcher }
    }

    pub async fn run_impl(self) -> anyhow::Result<()> {
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let handler = DiscordHandler {
            dispatcher: self.dispatcher,
        };

        let mut client = Client::builder(self.token, intents)
            .event_handler(handler)
            .await?;
        client.start().await?;
        Ok(())
    }
}

#[async_trait]
impl crate::ChannelBot for DiscordBot {
    fn channel_type(&self) -> &str {
        "discord"
    }

    async fn run(self: Box<Self>) -> anyhow::Result<()> {
        (*self).run_impl().await
    }
}

struct DiscordHandler {
    dispatcher: Arc<CommandDispatcher>,
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(
            "discord bot connected: {} ({} guilds)",
            ready.user.name,
            ready.guilds.len()
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.id == ctx.cache.current_user().id {
            return;
        }

        let text = msg.content.trim();
        if parse_command(text, self.dispatcher.prefix()).is_none() {
            return;
        }

        let inbound =
            DiscordAdapter::to_inbound(msg.guild_id.map(|id| id.get()), msg.channel_id.get(), text);
        let channel_id = msg.channel_id;
        let _ = channel_id.broadcast_typing(&ctx.http).await;

        let dispatcher = self.dispatcher.clone();
        let http = ctx.http.clone();
        tokio::spawn(async move {
            let Some(outbound) = dispatcher.handle(&inbound).await else {
                return;
            };
            for chunk in split_message(&outbound.text, DISCORD_MESSAGE_LIMIT) {
                if let Err(err) = channel_id.say(&http, chunk).await {
                    tracing::error!(guild = %outbound.guild, "failed to send discord reply: {err}");
                    break;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_messages_share_guild_key() {
        let a = DiscordAdapter::to_inbound(Some(999), 1, "!ci help");
        let b = DiscordAdapter::to_inbound(Some(999), 2, "!ci help");
        assert_eq!(a.guild, GuildId::guild(999));
        assert_eq!(a.guild, b.guild);
        assert_eq!(a.channel_type, "discord");
        assert_eq!(a.text, "!ci help");
    }

    #[test]
    fn direct_messages_key_by_channel() {
        let msg = DiscordAdapter::to_inbound(None, 123, "!ci repeat");
        assert_eq!(msg.guild.as_str(), "dm:123");
        assert_ne!(msg.guild, GuildId::guild(123));
    }

    #[test]
    fn trace_ids_are_unique() {
        let a = DiscordAdapter::to_inbound(None, 1, "x");
        let b = DiscordAdapter::to_inbound(None, 1, "x");
        assert_ne!(a.trace_id, b.trace_id);
    }

    #[test]
    fn short_reply_is_one_chunk() {
        assert_eq!(split_message("hello\nworld", 2000), vec!["hello\nworld"]);
        assert!(split_message("", 2000).is_empty());
        assert!(split_message("\n\n", 2000).is_empty());
    }

    #[test]
    fn long_reply_breaks_on_lines() {
        let line = "x".repeat(30);
        let text = vec![line.as_str(); 10].join("\n");
        let chunks = split_message(&text, 100);

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
            assert!(chunk.split('\n').all(|l| l == line));
        }
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn oversized_line_is_cut_by_characters() {
        let text = "é".repeat(250);
        let chunks = split_message(&text, 100);
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![100, 100, 50]);
    }
}

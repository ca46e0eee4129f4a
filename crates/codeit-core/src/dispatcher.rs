use std::sync::Arc;

use codeit_provider::{LlmMessage, LlmProvider, LlmRequest};
use codeit_schema::{ChallengeField, ChallengeRequest, GuildId, InboundMessage, OutboundMessage};
use tracing::Instrument;

use crate::command::{parse_command, Command};
use crate::error::CommandError;
use crate::parser::{parse_response, ParseOutcome};
use crate::prompt;
use crate::registry::SessionRegistry;

/// Turns inbound command text into reply text, reading and mutating guild
/// state through the [`SessionRegistry`].
pub struct CommandDispatcher {
    registry: Arc<SessionRegistry>,
    provider: Arc<dyn LlmProvider>,
    model: String,
    prefix: String,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            provider,
            model: model.into(),
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub async fn handle(&self, inbound: &InboundMessage) -> Option<OutboundMessage> {
        let span = tracing::debug_span!(
            "command",
            trace_id = %inbound.trace_id,
            channel = %inbound.channel_type,
            guild = %inbound.guild
        );
        let reply = self
            .handle_text(&inbound.guild, &inbound.text)
            .instrument(span)
            .await?;
        Some(OutboundMessage::reply_to(inbound, reply))
    }

    /// `None` when the text is not a command for this bot.
    pub async fn handle_text(&self, guild: &GuildId, text: &str) -> Option<String> {
        let parsed = parse_command(text, &self.prefix)?;
        let result = match parsed {
            Ok(command) => self.execute(guild, command).await,
            Err(err) => Err(err.into()),
        };

        Some(match result {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    CommandError::BackendUnavailable(_)
                    | CommandError::MalformedResponse(_)
                    | CommandError::Ledger(_) => {
                        tracing::warn!(guild = %guild, "command failed: {err}");
                    }
                    _ => tracing::debug!(guild = %guild, "command rejected: {err}"),
                }
                err.user_message(&self.prefix)
            }
        })
    }

    pub async fn execute(&self, guild: &GuildId, command: Command) -> Result<String, CommandError> {
        match command {
            Command::Usage => Ok(prompt::use_help(&self.prefix)),
            Command::Help => Ok(prompt::help_text(&self.prefix)),
            Command::Languages => Ok(prompt::languages_list()),
            Command::Next(request) => self.next_challenge(guild, request).await,
            Command::Show(field) => self.show(guild, field).await,
        }
    }

    async fn show(&self, guild: &GuildId, field: ChallengeField) -> Result<String, CommandError> {
        let record = self
            .registry
            .loaded_record(guild)
            .await
            .ok_or(CommandError::NoSession(field))?;
        Ok(record.field(field).to_string())
    }

    async fn next_challenge(
        &self,
        guild: &GuildId,
        request: ChallengeRequest,
    ) -> Result<String, CommandError> {
        // Held until the record is installed; the evictor skips locked guilds.
        let _guard = self.registry.lock(guild).await;
        let ledger = self.registry.ledger();

        let session = self.registry.open_session(guild).await;
        let user_turn = request.to_json();
        let mut messages: Vec<LlmMessage> = session
            .history
            .iter()
            .map(|entry| LlmMessage::new(entry.role.as_str(), entry.content.clone()))
            .collect();
        messages.push(LlmMessage::user(user_turn.clone()));

        tracing::debug!(
            guild = %guild,
            language = %request.language,
            difficulty = request.difficulty.as_str(),
            history = messages.len(),
            "requesting challenge"
        );

        let response = self
            .provider
            .chat(LlmRequest::new(self.model.clone(), messages))
            .await
            .map_err(|e| CommandError::BackendUnavailable(e.to_string()))?;

        ledger
            .append_exchange(guild, &user_turn, &response.text)
            .await?;

        match parse_response(&response.text, &request)? {
            ParseOutcome::NoChallenge => Err(CommandError::SentinelNoChallenge),
            ParseOutcome::Challenge(record) => {
                let reply = record.challenge.clone();
                self.registry.store().install(guild, record).await;
                tracing::info!(
                    guild = %guild,
                    language = %request.language,
                    difficulty = request.difficulty.as_str(),
                    "challenge installed"
                );
                Ok(reply)
            }
        }
    }
}

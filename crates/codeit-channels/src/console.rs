use std::sync::Arc;

use codeit_core::CommandDispatcher;
use codeit_schema::{GuildId, InboundMessage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Line-oriented local transport: every input line is one chat message from
/// a fixed guild.
pub struct ConsoleBot<R, W> {
    reader: R,
    writer: W,
    guild: GuildId,
    dispatcher: Arc<CommandDispatcher>,
}

impl<R, W> ConsoleBot<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, guild: GuildId, dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            reader,
            writer,
            guild,
            dispatcher,
        }
    }

    /// Runs until EOF or `quit`/`exit`, then hands the writer back.
    pub async fn serve(mut self) -> anyhow::Result<W> {
        let prefix = self.dispatcher.prefix().to_string();
        self.writer
            .write_all(
                format!(
                    "codeit console for {}. Try '{prefix} help', 'quit' to exit.\n",
                    self.guild
                )
                .as_bytes(),
            )
            .await?;

        let mut line = String::new();
        loop {
            self.writer.write_all(b"> ").await?;
            self.writer.flush().await?;

            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                break;
            }
            let input = line.trim();
            if input == "quit" || input == "exit" {
                break;
            }
            if input.is_empty() {
                continue;
            }

            let inbound = InboundMessage::new("console", self.guild.clone(), input);
            let reply = match self.dispatcher.handle(&inbound).await {
                Some(outbound) => outbound.text,
                None => format!("(not a command, messages start with '{prefix}')"),
            };
            self.writer.write_all(reply.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
        }

        self.writer.flush().await?;
        Ok(self.writer)
    }
}

#[async_trait::async_trait]
impl<R, W> crate::ChannelBot for ConsoleBot<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn channel_type(&self) -> &str {
        "console"
    }

    async fn run(self: Box<Self>) -> anyhow::Result<()> {
        (*self).serve().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeit_core::{prompt, ChallengeStore, ConversationLedger, SessionRegistry};
    use codeit_provider::StubProvider;

    fn dispatcher() -> Arc<CommandDispatcher> {
        let registry = Arc::new(SessionRegistry::new(
            ConversationLedger::new(prompt::SYSTEM_PROMPT),
            ChallengeStore::new(),
        ));
        Arc::new(CommandDispatcher::new(
            registry,
            Arc::new(StubProvider),
            "stub-model",
            "!ci",
        ))
    }

    async fn run_script(script: &str) -> String {
        let bot = ConsoleBot::new(
            script.as_bytes(),
            Vec::new(),
            GuildId::from("local"),
            dispatcher(),
        );
        let output = bot.serve().await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn next_then_repeat_through_console() {
        let output = run_script("!ci next ruby 1\n!ci repeat\nquit\n!ci help\n").await;

        let challenges: Vec<&str> = output
            .lines()
            .filter(|l| l.contains("## RUBY CHALLENGE"))
            .collect();
        assert_eq!(challenges.len(), 2);
        assert!(output.contains("stub:stub-model"));
        assert!(!output.contains("CODEIT COMMANDS"));
    }

    #[tokio::test]
    async fn non_commands_get_a_hint_and_blank_lines_are_skipped() {
        let output = run_script("hello\n\n").await;
        assert!(output.contains("(not a command, messages start with '!ci')"));
        assert_eq!(output.matches("> ").count(), 3);
    }

    #[tokio::test]
    async fn errors_are_replies_not_failures() {
        let output = run_script("!ci clue\n!ci next cobol 1\n").await;
        assert!(output.contains("There is no loaded clue."));
        assert!(output.contains("unsupported language: cobol"));
    }
}

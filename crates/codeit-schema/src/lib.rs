use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Isolation key for all per-guild state.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GuildId(pub String);

impl GuildId {
    pub fn guild(id: u64) -> Self {
        Self(format!("guild:{id}"))
    }

    /// Direct messages have no guild; the channel is the isolation unit.
    pub fn direct(channel_id: u64) -> Self {
        Self(format!("dm:{channel_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GuildId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub trace_id: Uuid,
    pub channel_type: String,
    pub guild: GuildId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(channel_type: impl Into<String>, guild: GuildId, text: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            channel_type: channel_type.into(),
            guild,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub trace_id: Uuid,
    pub channel_type: String,
    pub guild: GuildId,
    pub text: String,
}

impl OutboundMessage {
    pub fn reply_to(inbound: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            trace_id: inbound.trace_id,
            channel_type: inbound.channel_type.clone(),
            guild: inbound.guild.clone(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry of a guild's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "python")]
    Python,
    #[serde(rename = "c#")]
    CSharp,
    #[serde(rename = "c++")]
    Cpp,
    #[serde(rename = "javascript")]
    JavaScript,
    #[serde(rename = "php")]
    Php,
    #[serde(rename = "swift")]
    Swift,
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "go")]
    Go,
    #[serde(rename = "sql")]
    Sql,
    #[serde(rename = "ruby")]
    Ruby,
    #[serde(rename = "c")]
    C,
}

impl Language {
    /// Supported languages in their advertised order.
    pub const ALL: [Language; 11] = [
        Language::Python,
        Language::CSharp,
        Language::Cpp,
        Language::JavaScript,
        Language::Php,
        Language::Swift,
        Language::Java,
        Language::Go,
        Language::Sql,
        Language::Ruby,
        Language::C,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::CSharp => "c#",
            Self::Cpp => "c++",
            Self::JavaScript => "javascript",
            Self::Php => "php",
            Self::Swift => "swift",
            Self::Java => "java",
            Self::Go => "go",
            Self::Sql => "sql",
            Self::Ruby => "ruby",
            Self::C => "c",
        }
    }

    /// Match a lower-cased command token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.as_str() == token)
    }

    /// Uppercased name used in section banners, e.g. `C++`.
    pub fn banner_name(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "1")]
    Easy,
    #[serde(rename = "2")]
    Medium,
    #[serde(rename = "3")]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "1",
            Self::Medium => "2",
            Self::Hard => "3",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == token)
    }
}

/// The payload sent to the backend as the user turn of a `next` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub language: Language,
    pub difficulty: Difficulty,
}

impl ChallengeRequest {
    pub fn new(language: Language, difficulty: Difficulty) -> Self {
        Self {
            language,
            difficulty,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({
            "language": self.language.as_str(),
            "difficulty": self.difficulty.as_str(),
        })
        .to_string()
    }
}

/// A validated, banner-decorated challenge cached for one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub language: Language,
    pub challenge: String,
    pub clue: String,
    pub solution: String,
}

/// Which part of a [`ChallengeRecord`] a lookup command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeField {
    Challenge,
    Clue,
    Solution,
}

impl ChallengeField {
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::Clue => "clue",
            Self::Solution => "solution",
        }
    }
}

impl ChallengeRecord {
    pub fn field(&self, field: ChallengeField) -> &str {
        match field {
            ChallengeField::Challenge => &self.challenge,
            ChallengeField::Clue => &self.clue,
            ChallengeField::Solution => &self.solution,
        }
    }
}

use codeit_schema::{ChallengeField, GuildId};
use thiserror::Error;

use crate::prompt;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no conversation session for {0}")]
    SessionNotFound(GuildId),
}

/// Why a `next` command could not be parsed into a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing language or difficulty")]
    MissingArguments,
    #[error("unsupported language: {0}")]
    UnknownLanguage(String),
    #[error("unsupported difficulty: {0}")]
    UnknownDifficulty(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("response is not a challenge object: {0}")]
    Decode(String),
    #[error("response field `{0}` is empty")]
    EmptyField(&'static str),
}

/// Every way a command can fail. None of these stop the dispatcher.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no loaded {}", .0.noun())]
    NoSession(ChallengeField),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("malformed backend response: {0}")]
    MalformedResponse(#[from] ParseError),
    #[error("backend declined to produce a challenge")]
    SentinelNoChallenge,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl CommandError {
    /// Text shown to the chat user for this failure.
    pub fn user_message(&self, prefix: &str) -> String {
        match self {
            Self::Validation(err) => format!("{} ({err})", prompt::invalid_next_args(prefix)),
            Self::NoSession(field) => prompt::nothing_loaded(prefix, *field),
            Self::BackendUnavailable(_) | Self::MalformedResponse(_) | Self::Ledger(_) => {
                prompt::CHALLENGE_FAILED.to_string()
            }
            Self::SentinelNoChallenge => prompt::NO_CHALLENGE_AVAILABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_split_sentinel_from_malformed() {
        let malformed = CommandError::MalformedResponse(ParseError::EmptyField("clue"));
        let sentinel = CommandError::SentinelNoChallenge;
        assert_eq!(malformed.user_message("!ci"), prompt::CHALLENGE_FAILED);
        assert_ne!(sentinel.user_message("!ci"), malformed.user_message("!ci"));
    }

    #[test]
    fn no_session_names_the_field() {
        let err = CommandError::NoSession(ChallengeField::Solution);
        assert_eq!(err.to_string(), "no loaded solution");
        assert!(err.user_message("!ci").contains("no loaded solution"));
    }

    #[test]
    fn validation_errors_convert() {
        let err: CommandError = ValidationError::UnknownDifficulty("5".into()).into();
        assert_eq!(err.to_string(), "unsupported difficulty: 5");
        assert!(err.user_message("!ci").starts_with(&prompt::invalid_next_args("!ci")));
        assert!(err.user_message("!ci").ends_with("(unsupported difficulty: 5)"));
    }
}

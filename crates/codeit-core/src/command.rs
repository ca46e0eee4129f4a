//! Command grammar: `<prefix> <verb> [args...]`, case-insensitive.
//!
//! Parsing yields a typed [`Command`] before anything touches guild state.

use codeit_schema::{ChallengeField, ChallengeRequest, Difficulty, Language};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bare prefix or an unknown verb.
    Usage,
    Help,
    Languages,
    Next(ChallengeRequest),
    /// `repeat`, `clue`, or `solution`.
    Show(ChallengeField),
}

/// Returns `None` when the text is not addressed to the bot.
pub fn parse_command(text: &str, prefix: &str) -> Option<Result<Command, ValidationError>> {
    let lowered = text.to_lowercase();
    let mut tokens = lowered.split_whitespace();
    if tokens.next()? != prefix.to_lowercase() {
        return None;
    }

    let Some(verb) = tokens.next() else {
        return Some(Ok(Command::Usage));
    };

    let command = match verb {
        "help" => Command::Help,
        "languages" => Command::Languages,
        "repeat" => Command::Show(ChallengeField::Challenge),
        "clue" => Command::Show(ChallengeField::Clue),
        "solution" => Command::Show(ChallengeField::Solution),
        "next" => {
            let args: Vec<&str> = tokens.collect();
            return Some(parse_next(&args).map(Command::Next));
        }
        _ => Command::Usage,
    };
    Some(Ok(command))
}

fn parse_next(args: &[&str]) -> Result<ChallengeRequest, ValidationError> {
    let [language, difficulty, ..] = args else {
        return Err(ValidationError::MissingArguments);
    };
    let language = Language::from_token(language)
        .ok_or_else(|| ValidationError::UnknownLanguage(language.to_string()))?;
    let difficulty = Difficulty::from_token(difficulty)
        .ok_or_else(|| ValidationError::UnknownDifficulty(difficulty.to_string()))?;
    Ok(ChallengeRequest::new(language, difficulty))
}

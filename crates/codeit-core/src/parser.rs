//! Decodes raw backend replies into banner-decorated challenge records.

use codeit_schema::{ChallengeRecord, ChallengeRequest, Language};
use serde::Deserialize;

use crate::error::ParseError;
use crate::prompt::NO_CHALLENGE_SENTINEL;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Challenge(ChallengeRecord),
    /// The backend answered with the sentinel instead of a challenge.
    NoChallenge,
}

#[derive(Debug, Deserialize)]
struct RawChallenge {
    challenge: String,
    clue: String,
    solution: String,
}

pub fn challenge_banner(language: Language) -> String {
    format!("## {} CHALLENGE\n\n", language.banner_name())
}

pub fn clue_banner(language: Language) -> String {
    format!("## {} CHALLENGE CLUE\n\n", language.banner_name())
}

pub fn solution_banner(language: Language) -> String {
    format!("## {} CHALLENGE SOLUTION\n\n", language.banner_name())
}

/// Strips one surrounding markdown code fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Either every field is decoded and decorated, or nothing is produced.
pub fn parse_response(raw: &str, request: &ChallengeRequest) -> Result<ParseOutcome, ParseError> {
    let body = strip_code_fence(raw);
    if body == NO_CHALLENGE_SENTINEL {
        return Ok(ParseOutcome::NoChallenge);
    }

    let decoded: RawChallenge =
        serde_json::from_str(body).map_err(|e| ParseError::Decode(e.to_string()))?;

    for (name, value) in [
        ("challenge", &decoded.challenge),
        ("clue", &decoded.clue),
        ("solution", &decoded.solution),
    ] {
        if value.trim().is_empty() {
            return Err(ParseError::EmptyField(name));
        }
    }

    let language = request.language;
    Ok(ParseOutcome::Challenge(ChallengeRecord {
        language,
        challenge: challenge_banner(language) + &decoded.challenge,
        clue: clue_banner(language) + &decoded.clue,
        solution: solution_banner(language) + &decoded.solution,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeit_schema::Difficulty;

    fn request(language: Language) -> ChallengeRequest {
        ChallengeRequest::new(language, Difficulty::Medium)
    }

    fn expect_record(outcome: ParseOutcome) -> ChallengeRecord {
        match outcome {
            ParseOutcome::Challenge(record) => record,
            ParseOutcome::NoChallenge => panic!("expected a challenge"),
        }
    }

    #[test]
    fn decorates_every_field_with_language_banner() {
        let raw = r#"{"challenge":"Write a function...","clue":"Use recursion","solution":"def f(): ..."}"#;
        let record = expect_record(parse_response(raw, &request(Language::Python)).unwrap());
        assert_eq!(record.language, Language::Python);
        assert_eq!(record.challenge, "## PYTHON CHALLENGE\n\nWrite a function...");
        assert_eq!(record.clue, "## PYTHON CHALLENGE CLUE\n\nUse recursion");
        assert_eq!(record.solution, "## PYTHON CHALLENGE SOLUTION\n\ndef f(): ...");
    }

    #[test]
    fn banner_uses_symbolic_language_names() {
        let raw = r#"{"challenge":"a","clue":"b","solution":"c"}"#;
        let record = expect_record(parse_response(raw, &request(Language::CSharp)).unwrap());
        assert!(record.challenge.starts_with("## C# CHALLENGE\n\n"));
    }

    #[test]
    fn sentinel_is_not_an_error() {
        assert_eq!(
            parse_response("NULL", &request(Language::Go)).unwrap(),
            ParseOutcome::NoChallenge
        );
        assert_eq!(
            parse_response("  NULL\n", &request(Language::Go)).unwrap(),
            ParseOutcome::NoChallenge
        );
    }

    #[test]
    fn code_fenced_json_is_accepted() {
        let raw = "```json\n{\"challenge\":\"a\",\"clue\":\"b\",\"solution\":\"c\"}\n```";
        let record = expect_record(parse_response(raw, &request(Language::Sql)).unwrap());
        assert_eq!(record.solution, "## SQL CHALLENGE SOLUTION\n\nc");
    }

    #[test]
    fn non_json_is_decode_error() {
        let err = parse_response("Sure! Here is a challenge:", &request(Language::Go)).unwrap_err();
        assert!(matches!(err, ParseError::Decode(_)));
    }

    #[test]
    fn missing_field_is_decode_error() {
        let raw = r#"{"challenge":"a","clue":"b"}"#;
        let err = parse_response(raw, &request(Language::Go)).unwrap_err();
        assert!(matches!(err, ParseError::Decode(msg) if msg.contains("solution")));
    }

    #[test]
    fn non_string_field_is_decode_error() {
        let raw = r#"{"challenge":"a","clue":["b"],"solution":"c"}"#;
        assert!(matches!(
            parse_response(raw, &request(Language::Go)),
            Err(ParseError::Decode(_))
        ));
    }

    #[test]
    fn blank_field_is_rejected() {
        let raw = r#"{"challenge":"a","clue":"   ","solution":"c"}"#;
        assert_eq!(
            parse_response(raw, &request(Language::Go)).unwrap_err(),
            ParseError::EmptyField("clue")
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let raw = r#"{"challenge":"a","clue":"b","solution":"c","difficulty":"2"}"#;
        assert!(parse_response(raw, &request(Language::Go)).is_ok());
    }
}

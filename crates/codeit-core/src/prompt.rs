//! Fixed texts: the backend instruction prompt and user-facing replies.

use codeit_schema::{ChallengeField, Language};

/// First entry of every guild's history. Describes the two reply shapes the
/// response parser accepts.
pub const SYSTEM_PROMPT: &str = r#"You are a chat bot that hands out small programming challenges. Each challenge asks the user to write a program.

Every request is a JSON string of the form {"language": "LANGUAGE_VALUE", "difficulty": "DIFFICULTY_VALUE"}.
LANGUAGE_VALUE is the programming language the challenge targets (for example 'python', 'java', 'c', 'c++').
DIFFICULTY_VALUE is a number from 1 to 3, where 1 is the easiest and 3 the hardest.

Reply with a JSON string of the form {"challenge": "CHALLENGE_VALUE", "clue": "CLUE_VALUE", "solution": "SOLUTION_VALUE"}.
CHALLENGE_VALUE describes the program to build and is shown to users.
CLUE_VALUE is a hint that helps users build the program.
SOLUTION_VALUE is a model solution showing what a good answer looks like.
The reply MUST be exactly that JSON object and nothing else, so that a strict JSON parser can decode it.

Keep challenges small; never ask for programs with thousands of lines.
Keep challenges relevant to the common uses of the chosen language.
Do not repeat a challenge you already gave.

If you cannot provide a challenge, reply with exactly: NULL"#;

/// Literal reply meaning the backend declined to produce a challenge.
pub const NO_CHALLENGE_SENTINEL: &str = "NULL";

pub fn invalid_next_args(prefix: &str) -> String {
    format!(
        "Please insert a valid language or difficulty. Find the supported languages using **{prefix} languages**. Difficulties range from 1 to 3."
    )
}

pub const CHALLENGE_FAILED: &str =
    "A challenge failed to load. Please repeat the command or change the parameters.";

pub const NO_CHALLENGE_AVAILABLE: &str =
    "No challenge is available for that language and difficulty right now. Try another combination.";

pub fn use_help(prefix: &str) -> String {
    format!("Please use **{prefix} help** to see the list of available commands.")
}

pub fn next_usage(prefix: &str) -> String {
    format!("**{prefix} next *language[supported language]* *difficulty[no. between 1-3]***")
}

pub fn help_text(prefix: &str) -> String {
    format!(
        "## CODEIT COMMANDS\n\
         **{prefix} languages**: get a list of supported languages.\n\
         {}: request a new challenge.\n\
         **{prefix} repeat**: display the last challenge.\n\
         **{prefix} clue**: display the clue.\n\
         **{prefix} solution**: display the example solution.\n\
         **{prefix} help**: display the list of available commands.",
        next_usage(prefix)
    )
}

pub fn languages_list() -> String {
    let names: Vec<&str> = Language::ALL.iter().map(|l| l.as_str()).collect();
    format!("## Supported Languages\n{}", names.join(", "))
}

pub fn nothing_loaded(prefix: &str, field: ChallengeField) -> String {
    format!(
        "There is no loaded {}. Please use {} to load a new question.",
        field.noun(),
        next_usage(prefix)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_describes_both_reply_shapes() {
        assert!(SYSTEM_PROMPT.contains(r#"{"challenge": "CHALLENGE_VALUE""#));
        assert!(SYSTEM_PROMPT.trim_end().ends_with(NO_CHALLENGE_SENTINEL));
    }

    #[test]
    fn languages_list_in_advertised_order() {
        assert_eq!(
            languages_list(),
            "## Supported Languages\npython, c#, c++, javascript, php, swift, java, go, sql, ruby, c"
        );
    }

    #[test]
    fn texts_use_configured_prefix() {
        assert!(use_help("!ci").contains("**!ci help**"));
        assert!(invalid_next_args("?cx").contains("using **?cx languages**."));
        assert!(help_text("?cx").contains("**?cx repeat**"));
        let msg = nothing_loaded("!ci", ChallengeField::Clue);
        assert!(msg.starts_with("There is no loaded clue."));
        assert!(msg.contains("!ci next"));
    }
}

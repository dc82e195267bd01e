//! Prompt construction for the session bridge
//!
//! The system instruction is fixed for every turn: it sets the assistant
//! persona and the rule that requests for live, recent or latest
//! information must go through the search tool. The per-turn input is a
//! plain-text concatenation of the user message and profile fields; the
//! model consumes natural language context, not a typed payload.

use crate::backend::Profile;
use crate::tools::search::SEARCH_TOOL_NAME;

/// Build the fixed system instruction
pub fn system_prompt() -> String {
    format!(
        "You are SportMate, a helpful sport assistant.\n\
         Whenever the user asks for live, recent or latest scores or news, \
         call the `{}` tool with one argument: `query`.\n\
         When the tool result returns, summarise it in a sentence.\n\
         For all other questions, answer normally and remember the user's preferences.",
        SEARCH_TOOL_NAME
    )
}

/// Compose the per-turn input from the user message and profile fields
pub fn compose_input(message: &str, profile: &Profile) -> String {
    format!(
        "{}\nFavorite Sport: {}\nDetails: {}",
        message, profile.favorite_sport, profile.details
    )
}

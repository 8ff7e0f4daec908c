use crate::chat::events::ReplyTrigger;

pub const VOICE_REPLY: &str = "I received your voice message, here is my reply~";

/// Canned assistant answer for one trigger.
pub fn simulated_reply(trigger: &ReplyTrigger) -> String {
    match trigger {
        ReplyTrigger::Voice => VOICE_REPLY.to_string(),
        ReplyTrigger::Text(input) => format!("You said: \"{input}\", here is my reply"),
    }
}

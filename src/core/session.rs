use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::constants::{DEFAULT_SESSION_TITLE, EMPTY_PREVIEW, PREVIEW_MAX_CHARS};
use crate::core::message::Message;

/// One independent conversation thread. Identity is the `id`; the title is
/// cosmetic and currently always [`DEFAULT_SESSION_TITLE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub history: Vec<Message>,
}

impl Session {
    /// A fresh session, seeded with the welcome message so the history is
    /// never empty.
    pub fn new() -> Self {
        Self {
            id: generate_id(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            history: vec![Message::welcome()],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Sidebar preview: the start of the first user turn (the second history
    /// entry), or a fixed placeholder while only the greeting exists.
    pub fn preview(&self) -> String {
        match self.history.get(1) {
            Some(msg) => msg.content.chars().take(PREVIEW_MAX_CHARS).collect(),
            None => EMPTY_PREVIEW.to_string(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Millisecond timestamp plus a random hex suffix. Unique with high
/// probability; there is no collision detection.
fn generate_id() -> String {
    let mut suffix = [0u8; 4];
    let _ = getrandom::fill(&mut suffix);
    format!(
        "{}-{:02x}{:02x}{:02x}{:02x}",
        Utc::now().timestamp_millis(),
        suffix[0],
        suffix[1],
        suffix[2],
        suffix[3]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::WELCOME_MESSAGE;

    #[test]
    fn new_session_has_exactly_the_welcome_message() {
        let session = Session::new();
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].content, WELCOME_MESSAGE);
        assert!(session.history[0].role.is_assistant());
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);
    }

    #[test]
    fn ids_carry_a_suffix_after_the_timestamp() {
        let session = Session::new();
        let (stamp, suffix) = session.id.split_once('-').expect("id has two parts");
        assert!(stamp.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn preview_placeholder_until_first_user_turn() {
        let mut session = Session::new();
        assert_eq!(session.preview(), EMPTY_PREVIEW);
        session.push(Message::user("What is the airspeed of an unladen swallow?"));
        assert_eq!(
            session.preview(),
            "What is the airspeed of an unladen swallow?"
        );
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let mut session = Session::new();
        session.push(Message::user("é".repeat(80)));
        assert_eq!(session.preview().chars().count(), PREVIEW_MAX_CHARS);
    }
}

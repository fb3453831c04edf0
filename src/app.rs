use chrono::{DateTime, Local};
use tokio::task::JoinHandle;

use crate::auth::Identity;
use crate::gateway::QueryResult;

/// Assistant greeting seeded into every new transcript.
pub const GREETING: &str = "Hello! Type a Pokémon's name and I'll tell you about it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

/// One transcript entry. Entries are append-only: never mutated, removed,
/// or reordered once pushed.
#[derive(Debug, Clone)]
pub struct Message {
    // Not rendered, but keeps entries individually addressable
    #[allow(dead_code)]
    pub id: String,
    pub text: String,
    pub origin: Origin,
    pub created_at: DateTime<Local>,
}

/// A staged exchange: everything the gateway call needs for one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub seq: u64,
    pub query: String,
    pub conversation_id: Option<String>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub sign_out: bool,
    pub input_mode: InputMode,

    // Input line state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Conversation state
    pub transcript: Vec<Message>,
    pub conversation_id: Option<String>,
    pub pending: bool,

    // Exchange bookkeeping
    next_message_id: u64,
    next_exchange_seq: u64,
    last_applied_seq: u64,

    // In-flight gateway call, polled by the main loop
    pub exchange_task: Option<(u64, JoinHandle<QueryResult>)>,

    // Transcript viewport
    pub scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Signed-in user, shown in the header
    pub user: Identity,
}

impl App {
    pub fn new(user: Identity) -> Self {
        let mut app = Self {
            should_quit: false,
            sign_out: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            cursor: 0,

            transcript: Vec::new(),
            conversation_id: None,
            pending: false,

            next_message_id: 1,
            next_exchange_seq: 0,
            last_applied_seq: 0,

            exchange_task: None,

            scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            user,
        };

        app.push_message(Origin::Assistant, GREETING.to_string());
        app
    }

    fn push_message(&mut self, origin: Origin, text: String) {
        let id = self.next_message_id.to_string();
        self.next_message_id += 1;
        self.transcript.push(Message {
            id,
            text,
            origin,
            created_at: Local::now(),
        });
    }

    /// Stage one exchange: record the user's message verbatim and mark the
    /// conversation pending. Returns what the gateway call needs, or `None`
    /// for blank input, which changes nothing.
    pub fn begin_exchange(&mut self, text: &str) -> Option<Exchange> {
        if text.trim().is_empty() {
            return None;
        }

        self.push_message(Origin::User, text.to_string());
        self.pending = true;
        self.next_exchange_seq += 1;

        Some(Exchange {
            seq: self.next_exchange_seq,
            query: text.to_string(),
            conversation_id: self.conversation_id.clone(),
        })
    }

    /// Fold a finished exchange back into the conversation.
    ///
    /// The assistant entry is always appended (the gateway already turned
    /// failures into a printable answer). The conversation id only moves
    /// forward: completions older than the last applied one, and empty ids,
    /// leave it alone.
    pub fn complete_exchange(&mut self, seq: u64, result: QueryResult) {
        self.push_message(Origin::Assistant, result.answer);

        if seq > self.last_applied_seq {
            self.last_applied_seq = seq;
            if !result.conversation_id.is_empty() {
                self.conversation_id = Some(result.conversation_id);
            }
        }

        self.pending = false;
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.pending {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Transcript height in rendered lines at the current wrap width.
    fn transcript_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.transcript {
            total_lines += 1; // Label line ("You:" or "PokeChat:")
            for line in msg.text.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.pending {
            total_lines += 2; // Label + "Thinking..." indicator
        }

        total_lines
    }

    /// Scroll so the newest entry (or the thinking indicator) is visible.
    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.transcript_line_count();
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let max_scroll = self
            .transcript_line_count()
            .saturating_sub(self.chat_height.max(1));
        if self.scroll < max_scroll {
            self.scroll += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::FAILURE_MESSAGE;

    fn test_app() -> App {
        App::new(Identity {
            email: "ash@example.com".to_string(),
        })
    }

    fn answer(text: &str, conversation_id: &str) -> QueryResult {
        QueryResult {
            answer: text.to_string(),
            conversation_id: conversation_id.to_string(),
        }
    }

    #[test]
    fn transcript_starts_with_greeting() {
        let app = test_app();
        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript[0].origin, Origin::Assistant);
        assert_eq!(app.transcript[0].text, GREETING);
        assert!(app.conversation_id.is_none());
        assert!(!app.pending);
    }

    #[test]
    fn blank_input_changes_nothing() {
        let mut app = test_app();

        assert!(app.begin_exchange("").is_none());
        assert!(app.begin_exchange("   ").is_none());
        assert!(app.begin_exchange("\t\n").is_none());

        assert_eq!(app.transcript.len(), 1);
        assert!(app.conversation_id.is_none());
        assert!(!app.pending);
    }

    #[test]
    fn exchange_appends_user_then_assistant() {
        let mut app = test_app();

        let exchange = app.begin_exchange("Pikachu").unwrap();
        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript[1].origin, Origin::User);
        assert_eq!(app.transcript[1].text, "Pikachu");
        assert!(app.pending);
        assert_eq!(exchange.query, "Pikachu");
        assert!(exchange.conversation_id.is_none());

        app.complete_exchange(exchange.seq, answer("An Electric-type.", "conv-1"));
        assert_eq!(app.transcript.len(), 3);
        assert_eq!(app.transcript[2].origin, Origin::Assistant);
        assert_eq!(app.transcript[2].text, "An Electric-type.");
        assert!(!app.pending);
    }

    #[test]
    fn user_text_is_stored_verbatim() {
        let mut app = test_app();
        app.begin_exchange("  Mr. Mime  ").unwrap();
        assert_eq!(app.transcript[1].text, "  Mr. Mime  ");
    }

    #[test]
    fn message_ids_increase_in_creation_order() {
        let mut app = test_app();
        let exchange = app.begin_exchange("Pikachu").unwrap();
        app.complete_exchange(exchange.seq, answer("ok", "conv-1"));

        let ids: Vec<u64> = app
            .transcript
            .iter()
            .map(|m| m.id.parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids not increasing: {ids:?}");
    }

    #[test]
    fn conversation_id_threads_into_the_next_exchange() {
        let mut app = test_app();

        let first = app.begin_exchange("Pikachu").unwrap();
        app.complete_exchange(
            first.seq,
            answer("Pikachu is an Electric-type Pokémon.", "conv-1"),
        );
        assert_eq!(app.transcript.len(), 3);
        assert_eq!(app.conversation_id.as_deref(), Some("conv-1"));

        let second = app.begin_exchange("Raichu").unwrap();
        assert_eq!(second.conversation_id.as_deref(), Some("conv-1"));
    }

    #[test]
    fn absorbed_failure_still_answers_and_keeps_the_id() {
        let mut app = test_app();

        let first = app.begin_exchange("Pikachu").unwrap();
        app.complete_exchange(first.seq, answer("ok", "abc"));

        // Gateway fallback echoes the id it was given
        let second = app.begin_exchange("Raichu").unwrap();
        app.complete_exchange(second.seq, answer(FAILURE_MESSAGE, "abc"));

        assert_eq!(app.transcript.last().unwrap().text, FAILURE_MESSAGE);
        assert_eq!(app.transcript.last().unwrap().origin, Origin::Assistant);
        assert_eq!(app.conversation_id.as_deref(), Some("abc"));
        assert!(!app.pending);
    }

    #[test]
    fn fallback_with_empty_id_leaves_conversation_unset() {
        let mut app = test_app();

        let exchange = app.begin_exchange("Pikachu").unwrap();
        app.complete_exchange(exchange.seq, answer(FAILURE_MESSAGE, ""));

        assert!(app.conversation_id.is_none());
        assert_eq!(app.transcript.len(), 3);
    }

    #[test]
    fn stale_completion_cannot_overwrite_a_newer_id() {
        let mut app = test_app();

        let older = app.begin_exchange("Pikachu").unwrap();
        let newer = app.begin_exchange("Raichu").unwrap();

        app.complete_exchange(newer.seq, answer("second", "conv-2"));
        app.complete_exchange(older.seq, answer("first", "conv-1"));

        assert_eq!(app.conversation_id.as_deref(), Some("conv-2"));
        // Both exchanges still produced their assistant entries
        assert_eq!(app.transcript.len(), 5);
    }
}

use crate::action::Action;
use crate::error::ClientResult;
use crate::render::sanitize;
use uuid::Uuid;

pub const GREETING: &str = "Hello! I'm your CLI-TOP chatbot with full access to your VTOP data. Ask me anything about your academics!";
pub const THINKING: &str = "Thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Normal,
    Loading,
    Error,
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub id: Uuid,
    pub speaker: Speaker,
    pub text: String,
    pub status: TurnStatus,
}

impl Turn {
    fn new(speaker: Speaker, text: impl Into<String>, status: TurnStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            text: sanitize(&text.into()),
            status,
        }
    }
}

/// In-memory chat transcript for the lifetime of one chat panel.
///
/// Turns are only ever appended. The one exception is a send's own
/// "thinking" placeholder, which is removed when that send resolves and the
/// reply appended at the end, so replies land in resolution order.
#[derive(Debug, Clone)]
pub struct ChatTranscript {
    turns: Vec<Turn>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self {
            turns: vec![Turn::new(Speaker::Bot, GREETING, TurnStatus::Normal)],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_waiting(&self) -> bool {
        self.turns.iter().any(|turn| turn.status == TurnStatus::Loading)
    }

    fn push(&mut self, turn: Turn) -> Uuid {
        let id = turn.id;
        self.turns.push(turn);
        id
    }

    fn remove(&mut self, id: Uuid) -> bool {
        let before = self.turns.len();
        self.turns.retain(|turn| turn.id != id);
        self.turns.len() != before
    }
}

impl Default for ChatTranscript {
    fn default() -> Self {
        Self::new()
    }
}

/// A send that has been recorded in the transcript and is waiting for its
/// reply.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub placeholder: Uuid,
    pub action: Action,
}

/// Chat panel state: the transcript plus the send protocol around it.
#[derive(Debug, Default)]
pub struct ChatSession {
    transcript: ChatTranscript,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            transcript: ChatTranscript::new(),
        }
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    /// Drops the transcript back to the greeting, as closing and reopening
    /// the panel does. Replies still in flight no longer find their
    /// placeholder and are discarded.
    pub fn reset(&mut self) {
        self.transcript = ChatTranscript::new();
    }

    /// Appends the user turn and a thinking placeholder. Blank input is
    /// ignored.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }

        self.transcript
            .push(Turn::new(Speaker::User, message, TurnStatus::Normal));
        let placeholder = self
            .transcript
            .push(Turn::new(Speaker::Bot, THINKING, TurnStatus::Loading));

        Some(PendingSend {
            placeholder,
            action: Action::chat(message),
        })
    }

    /// Replaces `placeholder` with the reply or an error turn. Returns
    /// `false` when the placeholder is gone (the panel was reset).
    pub fn finish_send(&mut self, placeholder: Uuid, result: ClientResult<String>) -> bool {
        if !self.transcript.remove(placeholder) {
            return false;
        }

        let turn = match result {
            Ok(reply) => Turn::new(Speaker::Bot, reply, TurnStatus::Normal),
            Err(err) => Turn::new(Speaker::Bot, err.to_string(), TurnStatus::Error),
        };
        self.transcript.push(turn);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClient;
    use crate::dispatch::Dispatcher;
    use crate::error::ClientError;
    use crate::session::SessionContext;
    use crate::test_support::FakeBackend;
    use serde_json::json;

    #[test]
    fn new_transcript_holds_only_greeting() {
        let transcript = ChatTranscript::new();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].speaker, Speaker::Bot);
        assert_eq!(transcript.turns()[0].text, GREETING);
    }

    #[test]
    fn begin_send_appends_user_turn_and_placeholder() {
        let mut chat = ChatSession::new();
        let pending = chat.begin_send("  hello  ").unwrap();

        let turns = chat.transcript().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].speaker, Speaker::User);
        assert_eq!(turns[1].text, "hello");
        assert_eq!(turns[2].status, TurnStatus::Loading);
        assert_eq!(turns[2].id, pending.placeholder);
        assert_eq!(pending.action, Action::chat("hello"));
        assert!(chat.transcript().is_waiting());
    }

    #[test]
    fn blank_message_is_ignored() {
        let mut chat = ChatSession::new();
        assert!(chat.begin_send("   ").is_none());
        assert_eq!(chat.transcript().len(), 1);
    }

    #[test]
    fn replies_land_in_resolution_order() {
        let mut chat = ChatSession::new();
        let first = chat.begin_send("first").unwrap();
        let second = chat.begin_send("second").unwrap();

        assert!(chat.finish_send(second.placeholder, Ok("reply two".to_string())));
        assert!(chat.finish_send(first.placeholder, Ok("reply one".to_string())));

        let texts: Vec<&str> = chat
            .transcript()
            .turns()
            .iter()
            .map(|turn| turn.text.as_str())
            .collect();
        assert_eq!(texts, vec![GREETING, "first", "second", "reply two", "reply one"]);
        assert!(!chat.transcript().is_waiting());
    }

    #[test]
    fn failure_becomes_error_turn() {
        let mut chat = ChatSession::new();
        let pending = chat.begin_send("hello").unwrap();
        chat.finish_send(
            pending.placeholder,
            Err(ClientError::Export("quota exceeded".to_string())),
        );

        let last = chat.transcript().turns().last().unwrap();
        assert_eq!(last.status, TurnStatus::Error);
        assert_eq!(last.text, "quota exceeded");
    }

    #[test]
    fn reset_discards_transcript_and_late_replies() {
        let mut chat = ChatSession::new();
        let pending = chat.begin_send("hello").unwrap();
        chat.reset();

        assert!(!chat.finish_send(pending.placeholder, Ok("late".to_string())));
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript().turns()[0].text, GREETING);
    }

    #[tokio::test]
    async fn send_round_trips_through_backend() {
        let backend = FakeBackend::start()
            .respond("/ai-export", json!({"success": true, "data": {"cgpa": 8.5}}))
            .respond("/chat", json!({"success": true, "response": "Your CGPA is 8.5"}))
            .await;
        let dispatcher = Dispatcher::new(
            ApiClient::new(&backend.base_url()),
            SessionContext::new(None),
        );
        let mut chat = ChatSession::new();

        let pending = chat.begin_send("cgpa?").unwrap();
        let result = dispatcher.dispatch(&pending.action).await;
        assert!(chat.finish_send(pending.placeholder, result));

        let last = chat.transcript().turns().last().unwrap();
        assert_eq!(last.speaker, Speaker::Bot);
        assert_eq!(last.text, "Your CGPA is 8.5");
        assert_eq!(
            backend.bodies("/chat").await,
            vec![json!({"ai_data": {"cgpa": 8.5}, "message": "cgpa?"})]
        );
    }
}

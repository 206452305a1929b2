//! Chat session controller
//!
//! One [`ChatSession`] per conversation view. It owns the transcript, the
//! pending input buffer and the in-flight flag, and it enforces that at most
//! one request to the assistant is outstanding.
//!
//! Sending is split in two so the UI thread never waits on the network:
//! [`ChatSession::submit`] records the user turn and hands back a
//! [`PendingSend`]; whoever performs the request reports back through
//! [`ChatSession::complete`]. [`ChatSession::send`] does both in one await.

use crate::api::ApiClient;
use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{debug, warn};

pub const GREETING: &str = "Hello! I'm CuraCore. How can I help you today?";

/// Shown in place of a reply when the assistant could not be reached
pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble connecting to my brain. Is the backend running?";

/// Who said a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Assistant,
}

/// A chat message in the triage conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Something that can answer a triage message
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(&self, message: &str) -> Result<String, ApiError>;
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn send_message(&self, message: &str) -> Result<String, ApiError> {
        self.send_chat(message).await
    }
}

/// Identifies the conversation a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTicket {
    epoch: u64,
}

/// A request the caller must now perform and report via [`ChatSession::complete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub ticket: ChatTicket,
    pub message: String,
}

#[derive(Debug)]
pub struct ChatSession {
    transcript: Vec<Message>,
    input: String,
    in_flight: bool,
    epoch: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            transcript: vec![Message::assistant(GREETING)],
            input: String::new(),
            in_flight: false,
            epoch: 0,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Ticket of the current conversation, for work that must not outlive it
    pub fn current_ticket(&self) -> ChatTicket {
        ChatTicket { epoch: self.epoch }
    }

    pub fn is_current(&self, ticket: ChatTicket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Start a fresh conversation, e.g. when the chat view is entered again.
    ///
    /// A request still outstanding from the old conversation is orphaned:
    /// its completion no longer matches and is dropped.
    pub fn reset(&mut self) {
        self.transcript = vec![Message::assistant(GREETING)];
        self.input.clear();
        self.in_flight = false;
        self.epoch += 1;
    }

    /// Record a user turn and claim the in-flight slot.
    ///
    /// Returns `None` without touching any state when `text` is blank or a
    /// request is already outstanding.
    pub fn submit(&mut self, text: &str) -> Option<PendingSend> {
        if text.trim().is_empty() || self.in_flight {
            return None;
        }

        self.transcript.push(Message::user(text));
        self.input.clear();
        self.in_flight = true;
        debug!(epoch = self.epoch, "Chat message submitted");

        Some(PendingSend {
            ticket: ChatTicket { epoch: self.epoch },
            message: text.to_string(),
        })
    }

    /// Submit whatever is in the input buffer
    pub fn submit_input(&mut self) -> Option<PendingSend> {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// Apply the outcome of a request started by [`submit`](Self::submit).
    ///
    /// Failures become the fixed fallback reply. Returns `false` if the
    /// ticket belongs to a conversation that has since been reset.
    pub fn complete<E: Display>(&mut self, ticket: ChatTicket, result: Result<String, E>) -> bool {
        if ticket.epoch != self.epoch || !self.in_flight {
            debug!(
                ticket = ticket.epoch,
                current = self.epoch,
                "Discarding reply for a stale conversation"
            );
            return false;
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                FALLBACK_REPLY.to_string()
            }
        };

        self.transcript.push(Message::assistant(reply));
        self.in_flight = false;
        true
    }

    /// Submit `text` and wait for the reply in one step
    pub async fn send<B: ChatBackend + ?Sized>(&mut self, backend: &B, text: &str) -> bool {
        let Some(pending) = self.submit(text) else {
            return false;
        };
        let result = backend.send_message(&pending.message).await;
        self.complete(pending.ticket, result)
    }

    /// Add transcribed speech to the input buffer without sending it
    pub fn append_transcription(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.input.is_empty() {
            self.input.push_str(text);
        } else {
            self.input.push(' ');
            self.input.push_str(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for Canned {
        async fn send_message(&self, _message: &str) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    struct Down;

    #[async_trait]
    impl ChatBackend for Down {
        async fn send_message(&self, _message: &str) -> Result<String, ApiError> {
            Err(ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, ""))
        }
    }

    #[test]
    fn test_new_session_starts_with_greeting() {
        let chat = ChatSession::new();
        assert_eq!(chat.transcript(), &[Message::assistant(GREETING)]);
        assert!(!chat.is_in_flight());
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut chat = ChatSession::new();
        chat.set_input("   ");
        assert!(chat.submit_input().is_none());
        assert!(chat.submit("").is_none());
        assert!(chat.submit("\n\t").is_none());
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.input(), "   ");
        assert!(!chat.is_in_flight());
    }

    #[test]
    fn test_submit_while_in_flight_is_noop() {
        let mut chat = ChatSession::new();
        let first = chat.submit("first").unwrap();
        let len = chat.transcript().len();

        chat.set_input("second");
        assert!(chat.submit_input().is_none());
        assert_eq!(chat.transcript().len(), len);
        assert_eq!(chat.input(), "second");

        assert!(chat.complete::<ApiError>(first.ticket, Ok("ok".to_string())));
        assert!(chat.submit_input().is_some());
    }

    #[test]
    fn test_submit_clears_input_and_sets_flag() {
        let mut chat = ChatSession::new();
        chat.set_input("my knee hurts");
        let pending = chat.submit_input().unwrap();
        assert_eq!(pending.message, "my knee hurts");
        assert_eq!(chat.input(), "");
        assert!(chat.is_in_flight());
        assert_eq!(chat.transcript().last(), Some(&Message::user("my knee hurts")));
    }

    #[tokio::test]
    async fn test_headache_scenario() {
        let backend = Canned::new("Try hydration.");
        let mut chat = ChatSession::new();
        let before = chat.transcript().len();

        assert!(chat.send(&backend, "I have a headache").await);

        let transcript = chat.transcript();
        assert_eq!(transcript.len(), before + 2);
        assert_eq!(transcript[before], Message::user("I have a headache"));
        assert_eq!(transcript[before + 1], Message::assistant("Try hydration."));
        assert!(!chat.is_in_flight());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_appends_single_fallback() {
        let mut chat = ChatSession::new();
        let before = chat.transcript().len();

        assert!(chat.send(&Down, "dizzy").await);

        let transcript = chat.transcript();
        assert_eq!(transcript.len(), before + 2);
        assert_eq!(transcript[before], Message::user("dizzy"));
        assert_eq!(transcript[before + 1], Message::assistant(FALLBACK_REPLY));
        assert!(!chat.is_in_flight());
    }

    #[tokio::test]
    async fn test_blank_send_never_calls_backend() {
        let backend = Canned::new("unused");
        let mut chat = ChatSession::new();
        assert!(!chat.send(&backend, "  ").await);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_transcript_alternates_per_accepted_submission() {
        let mut chat = ChatSession::new();
        for turn in ["a", "b", "c"] {
            let pending = chat.submit(turn).unwrap();
            assert!(chat.submit("ignored").is_none());
            chat.complete::<ApiError>(pending.ticket, Ok(format!("re: {}", turn)));
        }
        let speakers: Vec<Speaker> = chat.transcript()[1..].iter().map(|m| m.speaker).collect();
        assert_eq!(
            speakers,
            vec![
                Speaker::User,
                Speaker::Assistant,
                Speaker::User,
                Speaker::Assistant,
                Speaker::User,
                Speaker::Assistant
            ]
        );
    }

    #[test]
    fn test_reply_after_reset_is_discarded() {
        let mut chat = ChatSession::new();
        let stale = chat.submit("before leaving").unwrap();

        chat.reset();
        assert!(!chat.is_in_flight());

        assert!(!chat.complete::<ApiError>(stale.ticket, Ok("late".to_string())));
        assert_eq!(chat.transcript(), &[Message::assistant(GREETING)]);

        assert!(!chat.is_current(stale.ticket));
        assert!(chat.is_current(chat.current_ticket()));

        // The new conversation is not blocked by the orphaned request
        let fresh = chat.submit("hello again").unwrap();
        assert!(chat.complete::<ApiError>(fresh.ticket, Ok("hi".to_string())));
        assert_eq!(chat.transcript().len(), 3);
    }

    #[test]
    fn test_duplicate_completion_is_ignored() {
        let mut chat = ChatSession::new();
        let pending = chat.submit("once").unwrap();
        assert!(chat.complete::<ApiError>(pending.ticket, Ok("one".to_string())));
        assert!(!chat.complete::<ApiError>(pending.ticket, Ok("two".to_string())));
        assert_eq!(chat.transcript().len(), 3);
    }

    #[test]
    fn test_transcription_appends_with_space() {
        let mut chat = ChatSession::new();
        chat.set_input("I have");
        chat.append_transcription("fever");
        assert_eq!(chat.input(), "I have fever");
        assert_eq!(chat.transcript().len(), 1);
        assert!(!chat.is_in_flight());
    }

    #[test]
    fn test_transcription_into_empty_buffer() {
        let mut chat = ChatSession::new();
        chat.append_transcription("sore throat");
        assert_eq!(chat.input(), "sore throat");

        chat.append_transcription("   ");
        assert_eq!(chat.input(), "sore throat");
    }
}

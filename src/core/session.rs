//! Conversation state for one chat widget.
//!
//! A session starts with the assistant greeting. Each accepted visitor message flips the session
//! into the composing state and schedules exactly one assistant reply; further submissions are
//! rejected until that reply lands. Closing, resetting or dropping the session invalidates a
//! reply that has not been delivered yet.

use crate::core::knowledge::KnowledgeBase;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const GREETING: &str = "Hi! I'm here to answer questions about Abdullah Rana's education and skills. What would you like to know?";

/// Pre-written visitor messages offered as shortcut buttons.
pub const QUICK_QUESTIONS: [&str; 4] = [
    "What's Abdullah's education?",
    "What are his technical skills?",
    "Tell me about his projects",
    "How can I contact him?",
];

pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1000);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Visitor,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time copy of what the chat surface renders.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub composing: bool,
    pub draft: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The visitor message was appended and a reply is on its way.
    Accepted(Message),
    /// Blank input, nothing happened.
    Empty,
    /// A reply is still pending, nothing happened.
    Busy,
    /// The session was torn down, nothing happened.
    Closed,
}

/// What subscribers of a session observe.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Appended(Message),
    /// The log was replaced by a fresh greeting.
    Reset,
    Closed,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

struct Inner {
    state: ConversationState,
    next_id: u64,
    // Bumped whenever a scheduled reply must no longer land.
    generation: u64,
    closed: bool,
    pending: Option<JoinHandle<()>>,
}

impl Inner {
    fn push(&mut self, sender: Sender, text: String) -> Message {
        let message = Message {
            id: self.next_id,
            text,
            sender,
            timestamp: Utc::now(),
        };
        self.next_id += 1;
        self.state.messages.push(message.clone());
        message
    }

    fn cancel_pending(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
            debug!("cancelled pending assistant reply");
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    knowledge: Arc<KnowledgeBase>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every transition leaves the state consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends the assistant reply for `visitor_text` and leaves the composing state.
    fn deliver(&self, inner: &mut Inner, visitor_text: &str) {
        let topic = self
            .knowledge
            .match_topic(visitor_text)
            .map(|entry| entry.name().to_owned());
        debug!("replying with topic {}", topic.as_deref().unwrap_or("<fallback>"));

        let answer = self.knowledge.classify(visitor_text).to_owned();
        let message = inner.push(Sender::Assistant, answer);
        inner.state.composing = false;
        inner.pending = None;

        // No subscribers is fine.
        let _ = self.events.send(SessionEvent::Appended(message));
    }
}

pub struct ConversationSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    reply_delay: Duration,
    shared: Arc<Shared>,
}

impl ConversationSession {
    /// Creates a session holding only the greeting. A zero `reply_delay` delivers replies
    /// synchronously inside [`ConversationSession::submit`].
    pub fn new(knowledge: Arc<KnowledgeBase>, reply_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let session = ConversationSession {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            reply_delay,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: ConversationState::default(),
                    next_id: 1,
                    generation: 0,
                    closed: false,
                    pending: None,
                }),
                knowledge,
                events,
            }),
        };
        session.reset();
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn reply_delay(&self) -> Duration {
        self.reply_delay
    }

    /// Back to a single greeting with no draft. A reply still pending is discarded.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        if inner.closed {
            warn!("reset of closed session {} ignored", self.id);
            return;
        }

        inner.cancel_pending();
        inner.state.messages.clear();
        inner.state.composing = false;
        inner.state.draft.clear();
        inner.push(Sender::Assistant, GREETING.to_owned());
        let _ = self.shared.events.send(SessionEvent::Reset);
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.shared.lock().state.draft = text.into();
    }

    pub fn submit(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Empty;
        }

        let mut inner = self.shared.lock();
        if inner.closed {
            return SubmitOutcome::Closed;
        }
        if inner.state.composing {
            debug!("session {} is composing, submit rejected", self.id);
            return SubmitOutcome::Busy;
        }

        let message = inner.push(Sender::Visitor, text.to_owned());
        inner.state.draft.clear();
        inner.state.composing = true;
        let _ = self
            .shared
            .events
            .send(SessionEvent::Appended(message.clone()));

        if self.reply_delay.is_zero() {
            self.shared.deliver(&mut inner, text);
            return SubmitOutcome::Accepted(message);
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let generation = inner.generation;
                let shared = Arc::downgrade(&self.shared);
                let delay = self.reply_delay;
                let text = text.to_owned();

                inner.pending = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    deliver_scheduled(shared, generation, &text);
                }));
            }
            Err(_) => {
                warn!("no tokio runtime to schedule the reply on, delivering immediately");
                self.shared.deliver(&mut inner, text);
            }
        }

        SubmitOutcome::Accepted(message)
    }

    /// Tears the session down. A pending reply is cancelled and every later submit is refused.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.cancel_pending();
        inner.state.composing = false;
        let _ = self.shared.events.send(SessionEvent::Closed);
        info!("closed session {}", self.id);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn is_composing(&self) -> bool {
        self.shared.lock().state.composing
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().state.messages.clone()
    }

    pub fn draft(&self) -> String {
        self.shared.lock().state.draft.clone()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.shared.lock().state.clone()
    }

    /// Events raised after this call, in the order they happened.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }
}

impl fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("reply_delay", &self.reply_delay)
            .finish_non_exhaustive()
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.shared.lock().cancel_pending();
    }
}

fn deliver_scheduled(shared: Weak<Shared>, generation: u64, visitor_text: &str) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let mut inner = shared.lock();
    if inner.closed || inner.generation != generation {
        debug!("dropping stale assistant reply");
        return;
    }
    shared.deliver(&mut inner, visitor_text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;
    use tokio::time::sleep;

    fn session(delay: Duration) -> ConversationSession {
        ConversationSession::new(Arc::new(KnowledgeBase::portfolio()), delay)
    }

    fn past_delay() -> Duration {
        DEFAULT_REPLY_DELAY + Duration::from_millis(1)
    }

    fn answer_of(topic: &str) -> String {
        KnowledgeBase::portfolio()
            .entries()
            .iter()
            .find(|e| e.name() == topic)
            .map(|e| e.answer().to_owned())
            .unwrap()
    }

    #[test]
    fn test_new_session_has_greeting() {
        let session = session(Duration::ZERO);
        let messages = session.messages();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Assistant);
        assert_eq!(messages[0].text, GREETING);
        assert!(!session.is_composing());
        assert_eq!(session.draft(), "");
    }

    #[test]
    fn test_zero_delay_replies_synchronously() {
        let session = session(Duration::ZERO);

        assert!(session.submit("hello").is_accepted());

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].sender, Sender::Visitor);
        assert_eq!(messages[1].text, "hello");
        assert_eq!(messages[2].sender, Sender::Assistant);
        assert_eq!(messages[2].text, answer_of("general"));
        assert!(!session.is_composing());
    }

    #[test]
    fn test_blank_submit_is_ignored() {
        let session = session(Duration::ZERO);

        assert_eq!(session.submit(""), SubmitOutcome::Empty);
        assert_eq!(session.submit(" \t\n"), SubmitOutcome::Empty);
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_composing());
    }

    #[test]
    fn test_submit_clears_draft() {
        let session = session(Duration::ZERO);

        session.set_draft(QUICK_QUESTIONS[3]);
        assert_eq!(session.draft(), "How can I contact him?");

        session.submit(&session.draft());
        assert_eq!(session.draft(), "");
        assert_eq!(session.messages()[1].text, QUICK_QUESTIONS[3]);
    }

    #[test]
    fn test_message_ids_increase() {
        let session = session(Duration::ZERO);
        session.submit("skills");
        session.submit("projects");

        let ids: Vec<u64> = session.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_closed_session_refuses_submit() {
        let session = session(Duration::ZERO);
        session.close();

        assert_eq!(session.submit("hello"), SubmitOutcome::Closed);
        assert_eq!(session.messages().len(), 1);
        assert!(session.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_arrives_after_delay() {
        let session = session(DEFAULT_REPLY_DELAY);

        let outcome = session.submit("What's Abdullah's education?");
        assert!(outcome.is_accepted());
        assert!(session.is_composing());
        assert_eq!(session.messages().len(), 2);

        sleep(Duration::from_millis(999)).await;
        assert!(session.is_composing());
        assert_eq!(session.messages().len(), 2);

        sleep(Duration::from_millis(2)).await;
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].text, "What's Abdullah's education?");
        assert_eq!(messages[2].sender, Sender::Assistant);
        assert_eq!(messages[2].text, answer_of("education"));
        assert!(!session.is_composing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_while_composing_is_rejected() {
        let session = session(DEFAULT_REPLY_DELAY);

        assert!(session.submit("hello").is_accepted());
        assert_eq!(session.submit("skills"), SubmitOutcome::Busy);
        assert_eq!(session.submit("projects"), SubmitOutcome::Busy);
        assert_eq!(session.messages().len(), 2);

        sleep(past_delay()).await;
        // Exactly one reply, for the accepted message only.
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].text, answer_of("general"));

        sleep(past_delay()).await;
        assert_eq!(session.messages().len(), 3);

        assert!(session.submit("skills").is_accepted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_reply() {
        let session = session(DEFAULT_REPLY_DELAY);

        session.submit("hello");
        session.close();
        sleep(past_delay() * 2).await;

        assert_eq!(session.messages().len(), 2);
        assert!(!session.is_composing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_pending_reply() {
        let session = session(DEFAULT_REPLY_DELAY);

        session.submit("hello");
        session.set_draft("half typed");
        session.reset();
        sleep(past_delay() * 2).await;

        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, GREETING);
        assert!(!session.is_composing());
        assert_eq!(session.draft(), "");
        assert!(session.submit("hello").is_accepted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_visitor_message_then_reply() {
        let session = session(DEFAULT_REPLY_DELAY);
        let mut events = session.subscribe();

        session.submit("hello");

        let Ok(SessionEvent::Appended(visitor)) = events.recv().await else {
            panic!("expected the visitor message");
        };
        assert_eq!(visitor.sender, Sender::Visitor);
        let Ok(SessionEvent::Appended(reply)) = events.recv().await else {
            panic!("expected the assistant reply");
        };
        assert_eq!(reply.sender, Sender::Assistant);
        assert!(reply.id > visitor.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_close_instead_of_reply() {
        let session = session(DEFAULT_REPLY_DELAY);
        session.submit("hello");
        let mut events = session.subscribe();

        session.close();
        sleep(past_delay()).await;

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Closed);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_session_closes_events() {
        let session = session(DEFAULT_REPLY_DELAY);
        session.submit("hello");
        let mut events = session.subscribe();

        drop(session);
        sleep(past_delay()).await;

        assert!(matches!(events.recv().await, Err(RecvError::Closed)));
    }
}

//! Chat view state shared by UI front-ends.
//!
//! `ChatState` owns every decision about the active session: which history
//! fetch may start, whether an arriving result still applies, and what happens
//! when a send or delete completes. Front-ends keep only the transport
//! (threads, channels, widgets), so all of these rules are testable directly.

use crate::api::{ApiMessage, ChatReply, Session, Source};
use crate::session::SessionIdStore;
use crate::timeline::{ReconcileMode, Timeline, TimelineMessage};

/// Inline assistant message shown when a send fails.
pub const SEND_FAILURE_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// The one history fetch allowed in flight, identified by session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub session_id: String,
    pub mode: ReconcileMode,
}

/// Active session, its timeline, the sessions list, and the single-slot
/// history load. The session id store is constructed once at the application
/// root and handed in here.
#[derive(Debug)]
pub struct ChatState {
    store: SessionIdStore,
    current_session: Option<String>,
    timeline: Timeline,
    sessions: Vec<Session>,
    pending_load: Option<PendingLoad>,
}

impl ChatState {
    pub fn new(store: SessionIdStore) -> Self {
        Self {
            store,
            current_session: None,
            timeline: Timeline::new(),
            sessions: Vec::new(),
            pending_load: None,
        }
    }

    pub fn current_session(&self) -> Option<&str> {
        self.current_session.as_deref()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn pending_load(&self) -> Option<&PendingLoad> {
        self.pending_load.as_ref()
    }

    pub fn store(&self) -> &SessionIdStore {
        &self.store
    }

    fn persist(&self, id: Option<&str>) {
        if let Err(e) = self.store.set_current(id) {
            log::warn!("could not persist session id: {}", e);
        }
    }

    /// Restore the persisted session at startup. Returns the session whose
    /// history should be fetched (installed in Replace mode: nothing can be
    /// pending before the first send).
    pub fn restore(&mut self) -> Option<String> {
        let id = self.store.current()?;
        self.current_session = Some(id.clone());
        self.begin_load(id.clone(), ReconcileMode::Replace);
        Some(id)
    }

    /// Claim the history-load slot for `session_id`. A load already in flight
    /// for the same session keeps the slot (no new fetch); one for a different
    /// session is superseded. Returns whether the caller should start a fetch.
    pub fn begin_load(&mut self, session_id: String, mode: ReconcileMode) -> bool {
        if let Some(load) = &self.pending_load {
            if load.session_id == session_id {
                return false;
            }
        }
        self.pending_load = Some(PendingLoad { session_id, mode });
        true
    }

    /// Apply the result of a history fetch. A result whose session does not
    /// own the slot, or is no longer current, is dropped; a failed fetch never
    /// clears already-displayed messages.
    pub fn finish_load(&mut self, session_id: &str, result: Result<Vec<ApiMessage>, String>) {
        let Some(load) = self.pending_load.take() else {
            return;
        };
        if load.session_id != session_id {
            // The slot belongs to a newer fetch for another session.
            self.pending_load = Some(load);
            return;
        }
        if self.current_session.as_deref() != Some(session_id) {
            log::debug!("dropping history for superseded session {}", session_id);
            return;
        }
        match result {
            Ok(messages) => self.timeline.apply_server(&messages, load.mode),
            Err(e) => log::warn!("history load for {} failed: {}", session_id, e),
        }
    }

    /// Switch the active session (None = new conversation). The timeline is
    /// cleared immediately; the returned id, if any, needs its history
    /// fetched (installed in Replace mode).
    pub fn select_session(&mut self, id: Option<String>) -> Option<String> {
        self.timeline.clear();
        self.current_session = id.clone();
        self.persist(id.as_deref());
        let id = id?;
        if self.begin_load(id.clone(), ReconcileMode::Replace) {
            Some(id)
        } else {
            None
        }
    }

    /// Append the user's message as pending before the send goes out.
    pub fn push_user_message(&mut self, content: impl Into<String>) {
        self.timeline.push_local(TimelineMessage::user(content));
    }

    /// Apply a successful chat turn: show the reply, adopt and persist the
    /// session id the backend used (it differs on the first send), and claim
    /// the slot for a Merge reconcile. Returns the session whose history
    /// should be fetched, if a fetch is not already in flight for it.
    pub fn complete_send(&mut self, reply: ChatReply) -> Option<String> {
        self.timeline
            .push_local(TimelineMessage::assistant(reply.reply.clone(), Some(reply.source)));
        if self.current_session.as_deref() != Some(reply.session_id.as_str()) {
            self.current_session = Some(reply.session_id.clone());
            self.persist(Some(&reply.session_id));
        }
        if self.begin_load(reply.session_id.clone(), ReconcileMode::Merge) {
            Some(reply.session_id)
        } else {
            None
        }
    }

    /// Show the inline error reply for a failed send. The user's pending
    /// message stays in the timeline.
    pub fn record_send_failure(&mut self) {
        self.timeline
            .push_local(TimelineMessage::assistant(SEND_FAILURE_TEXT, Some(Source::Error)));
    }

    /// Install a refreshed sessions list; a failed refresh keeps the previous
    /// list (stale-but-present beats empty).
    pub fn apply_sessions(&mut self, result: Result<Vec<Session>, String>) {
        match result {
            Ok(sessions) => self.sessions = sessions,
            Err(e) => log::warn!("sessions refresh failed: {}", e),
        }
    }

    /// Apply a confirmed delete: drop the session from the list, and if it
    /// was current, leave no current session and an empty timeline.
    pub fn complete_delete(&mut self, id: &str) {
        self.sessions.retain(|s| s.id != id);
        if self.current_session.as_deref() == Some(id) {
            self.select_session(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Role;
    use chrono::{TimeZone, Utc};

    fn temp_state() -> ChatState {
        let dir =
            std::env::temp_dir().join(format!("kgchat-chat-test-{}", uuid::Uuid::new_v4()));
        ChatState::new(SessionIdStore::new(dir.join("session_id")))
    }

    fn server_msg(id: &str, session_id: &str, content: &str) -> ApiMessage {
        ApiMessage {
            id: id.to_string(),
            session_id: session_id.to_string(),
            role: "assistant".to_string(),
            content: content.to_string(),
            source: Some(Source::Kb),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn listed_session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            user_id: None,
            created_at: Utc::now(),
            last_active: Utc::now(),
            messages: vec![],
        }
    }

    fn reply(session_id: &str) -> ChatReply {
        ChatReply {
            reply: "hello there".to_string(),
            source: Source::Kb,
            session_id: session_id.to_string(),
        }
    }

    #[test]
    fn selecting_b_while_a_loads_shows_only_b() {
        let mut state = temp_state();
        assert_eq!(state.select_session(Some("A".to_string())), Some("A".to_string()));
        // B is clicked before A's history arrives; A's fetch is superseded.
        assert_eq!(state.select_session(Some("B".to_string())), Some("B".to_string()));

        state.finish_load("A", Ok(vec![server_msg("a1", "A", "from A")]));
        assert!(state.timeline().is_empty());

        state.finish_load("B", Ok(vec![server_msg("b1", "B", "from B")]));
        assert_eq!(state.timeline().len(), 1);
        assert_eq!(state.timeline().messages()[0].content, "from B");
        assert_eq!(state.current_session(), Some("B"));
    }

    #[test]
    fn load_for_current_session_is_not_restarted() {
        let mut state = temp_state();
        assert_eq!(state.select_session(Some("A".to_string())), Some("A".to_string()));
        // Re-selecting the same session must not spawn a second fetch.
        assert_eq!(state.select_session(Some("A".to_string())), None);
        assert_eq!(state.pending_load().map(|l| l.session_id.as_str()), Some("A"));
    }

    #[test]
    fn deleting_current_session_clears_selection_and_timeline() {
        let mut state = temp_state();
        state.apply_sessions(Ok(vec![listed_session("X"), listed_session("Y")]));
        state.select_session(Some("X".to_string()));
        state.finish_load("X", Ok(vec![server_msg("m1", "X", "hello")]));
        assert_eq!(state.timeline().len(), 1);

        state.complete_delete("X");
        assert!(state.sessions().iter().all(|s| s.id != "X"));
        assert_eq!(state.current_session(), None);
        assert!(state.timeline().is_empty());
        assert_eq!(state.store().current(), None);
    }

    #[test]
    fn deleting_other_session_keeps_current_view() {
        let mut state = temp_state();
        state.apply_sessions(Ok(vec![listed_session("X"), listed_session("Y")]));
        state.select_session(Some("X".to_string()));
        state.finish_load("X", Ok(vec![server_msg("m1", "X", "hello")]));

        state.complete_delete("Y");
        assert_eq!(state.current_session(), Some("X"));
        assert_eq!(state.timeline().len(), 1);
        assert_eq!(state.sessions().len(), 1);
    }

    #[test]
    fn failed_sessions_refresh_keeps_list() {
        let mut state = temp_state();
        state.apply_sessions(Ok(vec![listed_session("X")]));
        state.apply_sessions(Err("connection refused".to_string()));
        assert_eq!(state.sessions().len(), 1);
        assert_eq!(state.sessions()[0].id, "X");
    }

    #[test]
    fn first_send_persists_returned_session_id() {
        let mut state = temp_state();
        assert_eq!(state.current_session(), None);
        state.push_user_message("What is X?");

        let fetch = state.complete_send(reply("sess-9"));
        assert_eq!(fetch, Some("sess-9".to_string()));
        assert_eq!(state.current_session(), Some("sess-9"));
        assert_eq!(state.store().current(), Some("sess-9".to_string()));
        assert_eq!(state.timeline().len(), 2);
    }

    #[test]
    fn send_to_same_session_does_not_repersist() {
        let mut state = temp_state();
        state.complete_send(reply("sess-9"));
        state.finish_load("sess-9", Ok(vec![]));
        state.push_user_message("again");
        state.complete_send(reply("sess-9"));
        assert_eq!(state.store().current(), Some("sess-9".to_string()));
        assert_eq!(state.current_session(), Some("sess-9"));
    }

    #[test]
    fn send_failure_adds_inline_error_and_keeps_pending() {
        let mut state = temp_state();
        state.push_user_message("hello?");
        state.record_send_failure();

        let messages = state.timeline().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].is_pending());
        assert_eq!(messages[1].content, SEND_FAILURE_TEXT);
        assert_eq!(messages[1].source, Some(Source::Error));
    }

    #[test]
    fn failed_history_load_keeps_displayed_messages() {
        let mut state = temp_state();
        state.select_session(Some("A".to_string()));
        state.finish_load("A", Ok(vec![server_msg("m1", "A", "hello")]));

        state.begin_load("A".to_string(), ReconcileMode::Merge);
        state.finish_load("A", Err("timeout".to_string()));
        assert_eq!(state.timeline().len(), 1);
    }

    #[test]
    fn restore_reads_persisted_session() {
        let state = temp_state();
        state.store().set_current(Some("sess-7")).unwrap();
        let mut state = state;
        assert_eq!(state.restore(), Some("sess-7".to_string()));
        assert_eq!(state.current_session(), Some("sess-7"));
        assert_eq!(
            state.pending_load(),
            Some(&PendingLoad {
                session_id: "sess-7".to_string(),
                mode: ReconcileMode::Replace
            })
        );
    }
}

//! Message timeline: pending vs confirmed messages and server reconciliation.
//!
//! Messages start as `Pending` (client-assigned placeholder id) and become
//! `Confirmed` only through a successful reconciliation fetch. The merge with
//! server history is a pure function so ordering and dedupe rules can be
//! tested without any UI or network.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::api::{ApiMessage, Source};

/// Message author. The backend only ever produces these two roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn parse(s: &str) -> Role {
        if s == "user" {
            Role::User
        } else {
            Role::Assistant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Whether a message is backed by a server id yet. One-way: a pending message
/// is only ever superseded by a confirmed one, never the reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Confirmed { id: String },
}

/// One entry in the rendered conversation.
#[derive(Debug, Clone)]
pub struct TimelineMessage {
    /// Client-side identity, stable across reconciliations (placeholder until confirmed).
    pub local_id: String,
    pub role: Role,
    pub content: String,
    pub source: Option<Source>,
    pub created_at: DateTime<Utc>,
    pub delivery: Delivery,
}

impl TimelineMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            source: None,
            created_at: Utc::now(),
            delivery: Delivery::Pending,
        }
    }

    pub fn assistant(content: impl Into<String>, source: Option<Source>) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            source,
            created_at: Utc::now(),
            delivery: Delivery::Pending,
        }
    }

    pub fn from_server(m: &ApiMessage) -> Self {
        Self {
            local_id: m.id.clone(),
            role: Role::parse(&m.role),
            content: m.content.clone(),
            source: m.source,
            created_at: m.created_at,
            delivery: Delivery::Confirmed { id: m.id.clone() },
        }
    }

    pub fn is_pending(&self) -> bool {
        self.delivery == Delivery::Pending
    }

    pub fn confirmed_id(&self) -> Option<&str> {
        match &self.delivery {
            Delivery::Confirmed { id } => Some(id),
            Delivery::Pending => None,
        }
    }
}

/// How server history is installed into the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Discard everything, install the server list verbatim (session switch).
    Replace,
    /// Install the server list, then re-append pending messages it has not
    /// confirmed yet (send may still be outstanding).
    Merge,
}

/// Merge the current timeline with server-confirmed history.
///
/// Server messages come first in server order, deduped by server id. A
/// pending message whose role and content appear in the server list is
/// considered confirmed and dropped; the rest survive at the end.
pub fn merge(existing: &[TimelineMessage], server: &[ApiMessage]) -> Vec<TimelineMessage> {
    let mut out: Vec<TimelineMessage> = Vec::with_capacity(server.len());
    let mut seen: HashSet<&str> = HashSet::new();
    for m in server {
        if seen.insert(m.id.as_str()) {
            out.push(TimelineMessage::from_server(m));
        }
    }
    for p in existing.iter().filter(|m| m.is_pending()) {
        let confirmed = server
            .iter()
            .any(|s| Role::parse(&s.role) == p.role && s.content == p.content);
        if !confirmed {
            out.push(p.clone());
        }
    }
    out
}

/// Ordered message list for the active session. The timeline is the sole
/// owner of this list; callers mutate it only through these operations.
#[derive(Debug, Default)]
pub struct Timeline {
    messages: Vec<TimelineMessage>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[TimelineMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a pending message at the end. Always succeeds.
    pub fn push_local(&mut self, message: TimelineMessage) {
        self.messages.push(message);
    }

    /// Install server history per the given mode.
    pub fn apply_server(&mut self, server: &[ApiMessage], mode: ReconcileMode) {
        self.messages = match mode {
            ReconcileMode::Replace => merge(&[], server),
            ReconcileMode::Merge => merge(&self.messages, server),
        };
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

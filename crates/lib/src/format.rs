//! Presentation helpers for the sessions list and source badges.

use chrono::{DateTime, Utc};

use crate::api::{Session, Source};

/// Maximum preview length in characters before truncation.
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Preview for a session: the first user message truncated to 50 characters
/// (with ellipsis), or "New conversation" when there is none.
pub fn session_preview(session: &Session) -> String {
    session
        .messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| preview_text(&m.content))
        .unwrap_or_else(|| "New conversation".to_string())
}

/// Truncate content for a preview line. Character-based so multibyte input
/// never splits mid-codepoint.
pub fn preview_text(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
    if content.chars().count() > PREVIEW_MAX_CHARS {
        preview.push_str("...");
    }
    preview
}

/// Relative recency label: "Just now" under a minute, then minutes, hours,
/// days, and a calendar date from one week on.
pub fn recency_label(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(t);
    let mins = diff.num_minutes();
    if mins < 1 {
        return "Just now".to_string();
    }
    if mins < 60 {
        return format!("{}m ago", mins);
    }
    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }
    t.format("%Y-%m-%d").to_string()
}

/// Badge text for an assistant message's source. Error renders as inline
/// error styling, not a badge.
pub fn source_badge(source: Source) -> Option<&'static str> {
    match source {
        Source::Kb => Some("Source: Internal Docs"),
        Source::KbLlm => Some("KB + LLM"),
        Source::Llm => Some("General LLM Response"),
        Source::Error => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiMessage;
    use chrono::{Duration, TimeZone};

    fn session_with(messages: Vec<ApiMessage>) -> Session {
        Session {
            id: "s1".to_string(),
            user_id: None,
            created_at: Utc::now(),
            last_active: Utc::now(),
            messages,
        }
    }

    fn msg(role: &str, content: &str) -> ApiMessage {
        ApiMessage {
            id: "m1".to_string(),
            session_id: "s1".to_string(),
            role: role.to_string(),
            content: content.to_string(),
            source: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn preview_short_content_untouched() {
        assert_eq!(preview_text("hello"), "hello");
    }

    #[test]
    fn preview_truncates_at_50_chars_with_ellipsis() {
        let long = "a".repeat(60);
        let p = preview_text(&long);
        assert_eq!(p.chars().count(), 53);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn preview_exactly_50_chars_no_ellipsis() {
        let exact = "b".repeat(50);
        assert_eq!(preview_text(&exact), exact);
    }

    #[test]
    fn session_preview_uses_first_user_message() {
        let s = session_with(vec![msg("assistant", "welcome"), msg("user", "What is X?")]);
        assert_eq!(session_preview(&s), "What is X?");
    }

    #[test]
    fn session_preview_empty_session() {
        assert_eq!(session_preview(&session_with(vec![])), "New conversation");
        let only_assistant = session_with(vec![msg("assistant", "hi")]);
        assert_eq!(session_preview(&only_assistant), "New conversation");
    }

    #[test]
    fn recency_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap();
        assert_eq!(recency_label(now - Duration::seconds(30), now), "Just now");
        assert_eq!(recency_label(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(recency_label(now - Duration::minutes(59), now), "59m ago");
        assert_eq!(recency_label(now - Duration::hours(3), now), "3h ago");
        assert_eq!(recency_label(now - Duration::days(2), now), "2d ago");
        assert_eq!(recency_label(now - Duration::days(7), now), "2024-05-01");
    }

    #[test]
    fn recency_future_timestamp_is_just_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap();
        assert_eq!(recency_label(now + Duration::minutes(2), now), "Just now");
    }

    #[test]
    fn badges_cover_all_sources() {
        assert_eq!(source_badge(Source::Kb), Some("Source: Internal Docs"));
        assert_eq!(source_badge(Source::KbLlm), Some("KB + LLM"));
        assert_eq!(source_badge(Source::Llm), Some("General LLM Response"));
        assert_eq!(source_badge(Source::Error), None);
    }
}

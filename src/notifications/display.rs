use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::payload::{NotificationPayload, TargetKind};

/// Number of display messages retained by a client.
pub const MAX_DISPLAY_MESSAGES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Connected,
    Closed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum MessageKind {
    Lifecycle(LifecycleEvent),
    Notification,
    /// Frame that did not decode to a notification object.
    Raw,
}

/// User-facing strings. The default is the Polish catalogue the platform ships with.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub someone: String,
    pub generic_action: String,
    pub connected: String,
    pub closed: String,
    pub error: String,
    pub raw_prefix: String,
    pub status_disconnected: String,
    pub status_connecting: String,
    pub status_connected: String,
    pub status_error: String,
    pub view_animal: String,
    pub view_post: String,
    pub view_article: String,
    pub view_organization: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            someone: "Ktoś".into(),
            generic_action: "wykonał(a) akcję".into(),
            connected: "✅ Połączono z WebSocket.".into(),
            closed: "⚠️ Połączenie zamknięte.".into(),
            error: "❌ Wystąpił błąd WebSocket.".into(),
            raw_prefix: "📩 ".into(),
            status_disconnected: "rozłączony".into(),
            status_connecting: "łączenie...".into(),
            status_connected: "połączony".into(),
            status_error: "błąd".into(),
            view_animal: "Zobacz zwierzę".into(),
            view_post: "Zobacz wpis".into(),
            view_article: "Zobacz artykuł".into(),
            view_organization: "Zobacz organizację".into(),
        }
    }
}

impl Catalog {
    pub fn lifecycle_text(&self, event: LifecycleEvent) -> &str {
        match event {
            LifecycleEvent::Connected => &self.connected,
            LifecycleEvent::Closed => &self.closed,
            LifecycleEvent::Error => &self.error,
        }
    }

    pub fn view_label(&self, kind: TargetKind) -> &str {
        match kind {
            TargetKind::Animal => &self.view_animal,
            TargetKind::Post => &self.view_post,
            TargetKind::Article => &self.view_article,
            TargetKind::Organization => &self.view_organization,
        }
    }
}

/// Display content before the log assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub link_url: Option<String>,
    /// Empty when there is no link.
    pub link_label: String,
    pub kind: MessageKind,
}

pub fn render_lifecycle(event: LifecycleEvent, catalog: &Catalog) -> Rendered {
    Rendered {
        text: catalog.lifecycle_text(event).to_string(),
        link_url: None,
        link_label: String::new(),
        kind: MessageKind::Lifecycle(event),
    }
}

pub fn render_payload(payload: &NotificationPayload, catalog: &Catalog) -> Rendered {
    let actor = payload.actor_name().unwrap_or_else(|| catalog.someone.clone());
    let verb = payload.verb().unwrap_or(&catalog.generic_action);
    let mut text = format!("{actor} {verb}");
    if let Some(target) = payload.target_text() {
        text.push_str(": ");
        text.push_str(target);
    }
    let (link_url, link_label) = match payload.target() {
        Some((kind, id)) => {
            let label = payload
                .target_label
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(catalog.view_label(kind));
            (Some(kind.link_for(id)), label.to_string())
        }
        None => (None, String::new()),
    };
    Rendered { text, link_url, link_label, kind: MessageKind::Notification }
}

/// Turn one inbound frame into display content; undecodable frames are wrapped verbatim.
pub fn render_frame(frame: &str, catalog: &Catalog) -> Rendered {
    match NotificationPayload::decode(frame) {
        Some(payload) => render_payload(&payload, catalog),
        None => Rendered {
            text: format!("{}{}", catalog.raw_prefix, frame),
            link_url: None,
            link_label: String::new(),
            kind: MessageKind::Raw,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayMessage {
    pub id: u64,
    pub text: String,
    pub link_url: Option<String>,
    pub link_label: String,
    pub kind: MessageKind,
    pub received_at: DateTime<Utc>,
}

/// Most-recent-first list bounded to [`MAX_DISPLAY_MESSAGES`].
#[derive(Debug, Clone)]
pub struct DisplayLog {
    entries: VecDeque<DisplayMessage>,
    capacity: usize,
    next_id: u64,
}

impl Default for DisplayLog {
    fn default() -> Self { Self::with_capacity(MAX_DISPLAY_MESSAGES) }
}

impl DisplayLog {
    /// Always keeps at least the message just pushed.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity + 1), capacity, next_id: 1 }
    }

    pub fn push(&mut self, rendered: Rendered) -> &DisplayMessage {
        let msg = DisplayMessage {
            id: self.next_id,
            text: rendered.text,
            link_url: rendered.link_url,
            link_label: rendered.link_label,
            kind: rendered.kind,
            received_at: Utc::now(),
        };
        self.next_id += 1;
        self.entries.push_front(msg);
        self.entries.truncate(self.capacity);
        &self.entries[0]
    }

    pub fn latest(&self) -> Option<&DisplayMessage> { self.entries.front() }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayMessage> { self.entries.iter() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn clear(&mut self) { self.entries.clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animal_like_renders_link_and_text() {
        let c = Catalog::default();
        let r = render_frame(
            r#"{"target_type":"animal","target_id":42,"actor":{"first_name":"Ola"},"verb":"polubił(a)"}"#,
            &c,
        );
        assert_eq!(r.link_url.as_deref(), Some("/animals/42"));
        assert!(r.text.contains("Ola"));
        assert!(r.text.contains("polubił(a)"));
        assert_eq!(r.text, "Ola polubił(a): animal");
        assert_eq!(r.link_label, "Zobacz zwierzę");
        assert_eq!(r.kind, MessageKind::Notification);
    }

    #[test]
    fn target_label_is_preferred_for_text_and_link_label() {
        let r = render_frame(
            r#"{"target_type":"animal","target_id":"42","target_label":"Burek","actor":{"first_name":"Ola","last_name":"Nowak"},"verb":"polubił(a)"}"#,
            &Catalog::default(),
        );
        assert_eq!(r.text, "Ola Nowak polubił(a): Burek");
        assert_eq!(r.link_label, "Burek");
    }

    #[test]
    fn unknown_target_has_no_link() {
        let r = render_frame(r#"{"target_type":"unknown","target_id":1,"verb":"x"}"#, &Catalog::default());
        assert_eq!(r.link_url, None);
        assert_eq!(r.link_label, "");
    }

    #[test]
    fn missing_actor_and_verb_use_placeholders() {
        let r = render_frame("{}", &Catalog::default());
        assert_eq!(r.text, "Ktoś wykonał(a) akcję");
        assert_eq!(r.link_url, None);
    }

    #[test]
    fn object_with_odd_field_types_still_renders_structured() {
        let r = render_frame(
            r#"{"actor":{"first_name":"Ola"},"verb":"polubił(a)","target_type":"animal","target_id":42,"is_read":0}"#,
            &Catalog::default(),
        );
        assert_eq!(r.kind, MessageKind::Notification);
        assert_eq!(r.link_url.as_deref(), Some("/animals/42"));
        assert_eq!(r.text, "Ola polubił(a): animal");
    }

    #[test]
    fn non_json_frame_is_wrapped_raw() {
        let r = render_frame("ping", &Catalog::default());
        assert_eq!(r.kind, MessageKind::Raw);
        assert_eq!(r.text, "📩 ping");
        assert!(r.text.contains("ping"));
        assert_eq!(r.link_url, None);
    }

    #[test]
    fn log_keeps_twenty_most_recent_first() {
        let mut log = DisplayLog::default();
        for i in 0..21 {
            log.push(render_frame(&format!("m{i}"), &Catalog::default()));
        }
        assert_eq!(log.len(), MAX_DISPLAY_MESSAGES);
        assert_eq!(log.latest().unwrap().text, "📩 m20");
        assert_eq!(log.iter().last().unwrap().text, "📩 m1");
        let ids: Vec<u64> = log.iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn zero_capacity_log_still_holds_the_latest() {
        let mut log = DisplayLog::with_capacity(0);
        assert_eq!(log.push(render_frame("a", &Catalog::default())).text, "📩 a");
        log.push(render_frame("b", &Catalog::default()));
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().text, "📩 b");
    }
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::routes;

/// Object ids arrive as numbers from the API but as strings from some emitters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    Number(i64),
    Text(String),
}

impl ObjectId {
    fn is_blank(&self) -> bool { matches!(self, ObjectId::Text(s) if s.trim().is_empty()) }

    /// Integers, integral floats and strings. Anything else is not an id.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ObjectId::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(ObjectId::Number).or_else(|| {
                let f = n.as_f64()?;
                (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(ObjectId::Number(f as i64))
            }),
            _ => None,
        }
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectId::Number(n) => write!(f, "{n}"),
            ObjectId::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

/// Notification targets that have a detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Animal,
    Post,
    Article,
    Organization,
}

impl TargetKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "animal" => Some(TargetKind::Animal),
            "post" => Some(TargetKind::Post),
            "article" => Some(TargetKind::Article),
            "organization" => Some(TargetKind::Organization),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Animal => "animal",
            TargetKind::Post => "post",
            TargetKind::Article => "article",
            TargetKind::Organization => "organization",
        }
    }

    pub fn path_prefix(&self) -> &'static str {
        match self {
            TargetKind::Animal => routes::ANIMAL_DETAIL_PREFIX,
            TargetKind::Post => routes::POST_DETAIL_PREFIX,
            TargetKind::Article => routes::ARTICLE_DETAIL_PREFIX,
            TargetKind::Organization => routes::ORGANIZATION_DETAIL_PREFIX,
        }
    }

    pub fn link_for(&self, id: &ObjectId) -> String {
        format!("{}{}", self.path_prefix(), id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn id(obj: &Map<String, Value>, key: &str) -> Option<ObjectId> {
    obj.get(key).and_then(ObjectId::from_json)
}

impl Actor {
    fn from_json(obj: &Map<String, Value>) -> Self {
        Self {
            id: id(obj, "id"),
            first_name: text(obj, "first_name"),
            last_name: text(obj, "last_name"),
            email: text(obj, "email"),
        }
    }

    /// Non-empty first/last name joined by a space.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() { None } else { Some(parts.join(" ")) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Origin {
    fn from_json(obj: &Map<String, Value>) -> Self {
        Self { kind: text(obj, "type"), id: id(obj, "id"), label: text(obj, "label") }
    }
}

/// Server-pushed notification as sent by the platform backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub actor: Option<Actor>,
    #[serde(default)]
    pub verb: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub target_id: Option<ObjectId>,
    #[serde(default)]
    pub target_label: Option<String>,
    #[serde(default)]
    pub created_object_id: Option<ObjectId>,
    #[serde(default)]
    pub origin: Option<Origin>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl NotificationPayload {
    /// Decode a socket frame. Only non-JSON and non-object frames yield `None`;
    /// a field of an unexpected type is read as absent.
    pub fn decode(frame: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(frame).ok()?;
        Some(Self::from_object(value.as_object()?))
    }

    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: id(obj, "id"),
            actor: obj.get("actor").and_then(Value::as_object).map(Actor::from_json),
            verb: text(obj, "verb"),
            target_type: text(obj, "target_type"),
            target_id: id(obj, "target_id"),
            target_label: text(obj, "target_label"),
            created_object_id: id(obj, "created_object_id"),
            origin: obj.get("origin").and_then(Value::as_object).map(Origin::from_json),
            kind: text(obj, "type"),
            is_read: obj.get("is_read").and_then(Value::as_bool),
            created_at: text(obj, "created_at"),
        }
    }

    pub fn actor_name(&self) -> Option<String> {
        self.actor.as_ref().and_then(Actor::display_name)
    }

    pub fn verb(&self) -> Option<&str> { non_empty(self.verb.as_deref()) }

    /// Target label, else the raw target type.
    pub fn target_text(&self) -> Option<&str> {
        non_empty(self.target_label.as_deref()).or_else(|| non_empty(self.target_type.as_deref()))
    }

    /// Known target kind and id, only when both are present.
    pub fn target(&self) -> Option<(TargetKind, &ObjectId)> {
        let kind = TargetKind::parse(non_empty(self.target_type.as_deref())?)?;
        let id = self.target_id.as_ref().filter(|id| !id.is_blank())?;
        Some((kind, id))
    }

    pub fn link(&self) -> Option<String> {
        self.target().map(|(kind, id)| kind.link_for(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_shape() {
        let frame = r#"{"id":7,"actor":{"id":3,"first_name":"Ola","last_name":"Nowak","email":"o@x.pl"},
            "verb":"polubił(a)","target_type":"animal","target_id":42,"target_label":"Burek",
            "created_object_id":null,"origin":{"type":"animal","id":42,"label":"Burek"},
            "type":"unknown","is_read":false,"created_at":"2024-05-01T10:00:00+00:00"}"#;
        let p = NotificationPayload::decode(frame).unwrap();
        assert_eq!(p.actor_name().as_deref(), Some("Ola Nowak"));
        assert_eq!(p.link().as_deref(), Some("/animals/42"));
        assert_eq!(p.origin.unwrap().label.as_deref(), Some("Burek"));
    }

    #[test]
    fn non_objects_and_garbage_do_not_decode() {
        assert!(NotificationPayload::decode("ping").is_none());
        assert!(NotificationPayload::decode("[1,2]").is_none());
        assert!(NotificationPayload::decode("\"text\"").is_none());
        assert!(NotificationPayload::decode("{\"verb\": ").is_none());
    }

    #[test]
    fn stray_field_types_do_not_cost_the_link() {
        let frame = r#"{"actor":{"first_name":"Ola"},"verb":"polubił(a)","target_type":"animal","target_id":42,"is_read":0}"#;
        let p = NotificationPayload::decode(frame).unwrap();
        assert_eq!(p.link().as_deref(), Some("/animals/42"));
        assert_eq!(p.actor_name().as_deref(), Some("Ola"));
        assert_eq!(p.is_read, None);

        let p = NotificationPayload::decode(
            r#"{"actor":"Ola","verb":5,"target_type":"animal","target_id":42.0,"origin":[],"created_at":1}"#,
        )
        .unwrap();
        assert_eq!(p.link().as_deref(), Some("/animals/42"));
        assert_eq!(p.actor, None);
        assert_eq!(p.verb(), None);
        assert_eq!(p.origin, None);

        let fractional = NotificationPayload::decode(r#"{"target_type":"post","target_id":4.5}"#).unwrap();
        assert!(fractional.link().is_none());
    }

    #[test]
    fn every_known_kind_maps_to_its_prefix() {
        let id = ObjectId::Number(5);
        assert_eq!(TargetKind::Animal.link_for(&id), "/animals/5");
        assert_eq!(TargetKind::Post.link_for(&id), "/posts/5");
        assert_eq!(TargetKind::Article.link_for(&id), "/knowledge/5");
        assert_eq!(TargetKind::Organization.link_for(&id), "/organizations/5");
        for k in [TargetKind::Animal, TargetKind::Post, TargetKind::Article, TargetKind::Organization] {
            assert_eq!(TargetKind::parse(k.as_str()), Some(k));
        }
        assert_eq!(TargetKind::parse("unknown"), None);
    }

    #[test]
    fn link_needs_both_type_and_id() {
        let only_type = NotificationPayload { target_type: Some("post".into()), ..Default::default() };
        assert!(only_type.link().is_none());
        let only_id = NotificationPayload { target_id: Some(ObjectId::Number(1)), ..Default::default() };
        assert!(only_id.link().is_none());
        let blank_id = NotificationPayload {
            target_type: Some("post".into()),
            target_id: Some(ObjectId::Text("  ".into())),
            ..Default::default()
        };
        assert!(blank_id.link().is_none());
        let text_id = NotificationPayload {
            target_type: Some("organization".into()),
            target_id: Some(ObjectId::Text("12".into())),
            ..Default::default()
        };
        assert_eq!(text_id.link().as_deref(), Some("/organizations/12"));
    }

    #[test]
    fn actor_name_skips_blank_parts() {
        let a = Actor { first_name: Some(" ".into()), last_name: Some("Kowalska".into()), ..Default::default() };
        assert_eq!(a.display_name().as_deref(), Some("Kowalska"));
        assert_eq!(Actor::default().display_name(), None);
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BlogStatus, Comment, Notification, UnknownVariant};

/// A realtime subscription key, `blog:<id>` or `event:<id>` on the wire.
/// Clients only receive topic-scoped events for topics they subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topic {
    Blog(Uuid),
    Event(Uuid),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Blog(id) => write!(f, "blog:{}", id),
            Topic::Event(id) => write!(f, "event:{}", id),
        }
    }
}

impl FromStr for Topic {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownVariant {
            kind: "topic",
            value: s.to_string(),
        };
        let (kind, id) = s.split_once(':').ok_or_else(unknown)?;
        let id: Uuid = id.parse().map_err(|_| unknown())?;
        match kind {
            "blog" => Ok(Topic::Blog(id)),
            "event" => Ok(Topic::Event(id)),
            _ => Err(unknown()),
        }
    }
}

impl TryFrom<String> for Topic {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid },

    /// A notification was created for the receiving user
    NotificationCreate { notification: Notification },

    CommentCreate { blog_id: Uuid, comment: Comment },

    CommentUpdate { blog_id: Uuid, comment: Comment },

    CommentDelete { blog_id: Uuid, comment_id: Uuid },

    CommentLikes { blog_id: Uuid, comment_id: Uuid, likes: i64 },

    BlogLikes { blog_id: Uuid, likes: i64 },

    /// Moderation changed a blog's status
    BlogStatusChange { blog_id: Uuid, status: BlogStatus },

    /// Registration or cancellation moved the participant counter
    EventParticipants {
        event_id: Uuid,
        current_participants: i64,
        max_participants: Option<i64>,
    },
}

impl GatewayEvent {
    /// Returns the topic if this event is scoped to one.
    /// Events that return `None` are delivered to every connection.
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Self::CommentCreate { blog_id, .. }
            | Self::CommentUpdate { blog_id, .. }
            | Self::CommentDelete { blog_id, .. }
            | Self::CommentLikes { blog_id, .. }
            | Self::BlogLikes { blog_id, .. }
            | Self::BlogStatusChange { blog_id, .. } => Some(Topic::Blog(*blog_id)),
            Self::EventParticipants { event_id, .. } => Some(Topic::Event(*event_id)),
            Self::Ready { .. } | Self::NotificationCreate { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Add topics to this connection's subscriptions
    Subscribe { topics: Vec<Topic> },

    Unsubscribe { topics: Vec<Topic> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_events_are_scoped_to_their_blog() {
        let blog_id = Uuid::new_v4();
        let event = GatewayEvent::CommentDelete {
            blog_id,
            comment_id: Uuid::new_v4(),
        };
        assert_eq!(event.topic(), Some(Topic::Blog(blog_id)));

        let ready = GatewayEvent::Ready {
            user_id: Uuid::new_v4(),
        };
        assert_eq!(ready.topic(), None);
    }

    #[test]
    fn subscribe_command_wire_format() {
        let id = Uuid::nil();
        let raw = format!(
            r#"{{"type":"Subscribe","data":{{"topics":["event:{}"]}}}}"#,
            id
        );
        match serde_json::from_str::<GatewayCommand>(&raw).unwrap() {
            GatewayCommand::Subscribe { topics } => assert_eq!(topics, vec![Topic::Event(id)]),
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(
            serde_json::to_string(&Topic::Blog(id)).unwrap(),
            format!("\"blog:{}\"", id)
        );
    }

    #[test]
    fn malformed_topics_are_rejected() {
        assert!("blog".parse::<Topic>().is_err());
        assert!("chat:00000000-0000-0000-0000-000000000000".parse::<Topic>().is_err());
        assert!("event:not-a-uuid".parse::<Topic>().is_err());
        assert!(serde_json::from_str::<Topic>(r#"{"kind":"blog","id":"x"}"#).is_err());
    }
}

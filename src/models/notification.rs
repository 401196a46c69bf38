use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    JobAssigned,
    JobCompleted,
    Review,
    Message,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Document>,
    pub created_at: DateTime,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct NotificationResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: ChronoDateTime<Utc>,
}

impl From<&Notification> for NotificationResponse {
    fn from(notification: &Notification) -> Self {
        NotificationResponse {
            id: notification.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: notification.user_id.to_hex(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            kind: notification.kind,
            read: notification.read,
            created_at: notification.created_at.to_chrono(),
        }
    }
}

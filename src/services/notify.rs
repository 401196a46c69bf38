use mongodb::bson::{doc, oid::ObjectId, DateTime};

use crate::db::DbConn;
use crate::models::{Notification, NotificationKind};

/// Persists notification documents for job lifecycle events. Dispatch is
/// best-effort: a failed insert is logged and never fails the request
/// that triggered it.
pub struct Notifier;

impl Notifier {
    pub async fn dispatch(
        db: &DbConn,
        kind: NotificationKind,
        job_id: &ObjectId,
        affected_users: &[ObjectId],
    ) {
        let (title, message) = match kind {
            NotificationKind::JobAssigned => ("Job assigned", "A worker has been assigned to the job."),
            NotificationKind::JobCompleted => ("Job completed", "The job has been marked as completed."),
            NotificationKind::Review => ("New review", "A review has been left for a completed job."),
            NotificationKind::Message => ("New message", "You have a new message."),
        };

        for user_id in affected_users {
            let notification = Notification {
                id: None,
                user_id: *user_id,
                title: title.to_string(),
                message: message.to_string(),
                kind,
                read: false,
                metadata: Some(doc! { "job_id": job_id }),
                created_at: DateTime::now(),
            };

            if let Err(e) = db
                .collection::<Notification>("notifications")
                .insert_one(&notification, None)
                .await
            {
                warn!(
                    "failed to dispatch {:?} notification for job {} to user {}: {}",
                    kind,
                    job_id.to_hex(),
                    user_id.to_hex(),
                    e
                );
            }
        }
    }
}

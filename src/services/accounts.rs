use mongodb::bson::{doc, oid::ObjectId, DateTime};

use crate::db::DbConn;
use crate::models::{User, WorkerProfile};
use crate::services::rating::RatingAggregate;
use crate::utils::ApiError;

/// Narrow interface over the user/worker identity collections. Job and
/// review logic only ever touches accounts through these lookups plus
/// the one derived-field write-back.
pub struct AccountDirectory;

impl AccountDirectory {
    pub async fn find_user_by_id(db: &DbConn, id: &ObjectId) -> Result<Option<User>, ApiError> {
        db.collection::<User>("users")
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))
    }

    /// Resolves the worker profile behind a user identity, if the
    /// identity has one.
    pub async fn find_worker_by_identity(
        db: &DbConn,
        user_id: &ObjectId,
    ) -> Result<Option<WorkerProfile>, ApiError> {
        db.collection::<WorkerProfile>("workers")
            .find_one(doc! { "user_id": user_id }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))
    }

    pub async fn find_worker_by_id(
        db: &DbConn,
        worker_id: &ObjectId,
    ) -> Result<Option<WorkerProfile>, ApiError> {
        db.collection::<WorkerProfile>("workers")
            .find_one(doc! { "_id": worker_id }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))
    }

    /// Writes the recomputed rating/total_jobs pair onto the worker.
    /// A vanished worker is logged and tolerated; a store failure is not.
    pub async fn update_worker_aggregate(
        db: &DbConn,
        worker_id: &ObjectId,
        aggregate: &RatingAggregate,
    ) -> Result<(), ApiError> {
        let result = db
            .collection::<WorkerProfile>("workers")
            .update_one(
                doc! { "_id": worker_id },
                doc! {
                    "$set": {
                        "rating": aggregate.rating,
                        "total_jobs": aggregate.total_jobs,
                        "updated_at": DateTime::now(),
                    }
                },
                None,
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to update worker rating: {}", e)))?;

        if result.matched_count == 0 {
            warn!("rating recompute targeted missing worker {}", worker_id.to_hex());
        }

        Ok(())
    }
}

use std::collections::HashMap;

use mongodb::bson::{doc, oid::ObjectId, DateTime};
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use rocket::futures::TryStreamExt;

use crate::db::DbConn;
use crate::models::{
    CreateReviewDto, NotificationKind, PublicProfile, Review, ReviewResponse, User,
};
use crate::routes::job::find_job;
use crate::services::rating;
use crate::services::{AccountDirectory, Notifier};
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Review")]
#[post("/jobs/<id>/reviews", data = "<dto>")]
pub async fn create_review(
    db: &State<DbConn>,
    id: String,
    dto: Json<CreateReviewDto>,
) -> Result<Created<Json<ApiResponse<serde_json::Value>>>, ApiError> {
    let job_id = ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;
    let job = find_job(db, &job_id).await?;

    let reviewer = dto
        .reviewer_id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("reviewer_id is required"))?;
    let reviewer =
        ObjectId::parse_str(reviewer).map_err(|_| ApiError::bad_request("Invalid reviewer ID"))?;

    let to_worker = rating::review_gate(&job, &reviewer)?;

    let existing = db
        .collection::<Review>("reviews")
        .find_one(doc! { "job_id": job_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("This job has already been reviewed."));
    }

    let rating_value = dto
        .rating
        .ok_or_else(|| ApiError::bad_request("rating is required"))?;

    let review = Review {
        id: None,
        job_id,
        from_user: reviewer,
        to_worker,
        rating: rating_value,
        comment: dto.comment.clone(),
        created_at: DateTime::now(),
    };

    let result = db
        .collection::<Review>("reviews")
        .insert_one(&review, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create review: {}", e)))?;

    // Full recompute over every review on record for this worker. The
    // insert above and the write-back below are separate document
    // operations; a failure here surfaces as 500 with the review already
    // persisted.
    let all_reviews: Vec<Review> = db
        .collection::<Review>("reviews")
        .find(doc! { "to_worker": to_worker }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?;
    let ratings: Vec<f64> = all_reviews.iter().map(|r| r.rating).collect();
    AccountDirectory::update_worker_aggregate(db, &to_worker, &rating::aggregate(&ratings)).await?;

    if let Some(worker) = AccountDirectory::find_worker_by_id(db, &to_worker).await? {
        Notifier::dispatch(db, NotificationKind::Review, &job_id, &[worker.user_id]).await;
    }

    let review_id = result
        .inserted_id
        .as_object_id()
        .map(|id| id.to_hex())
        .unwrap_or_default();
    let uri = format!("/api/workers/{}/reviews", to_worker.to_hex());
    Ok(Created::new(uri).body(Json(ApiResponse::success_with_message(
        "Review added successfully".to_string(),
        serde_json::json!({ "review_id": review_id }),
    ))))
}

#[openapi(tag = "Review")]
#[get("/workers/<id>/reviews")]
pub async fn get_worker_reviews(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, ApiError> {
    let worker_id =
        ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid worker ID"))?;

    let reviews: Vec<Review> = db
        .collection::<Review>("reviews")
        .find(doc! { "to_worker": worker_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?;

    let reviewer_ids: Vec<ObjectId> = reviews.iter().map(|r| r.from_user).collect();
    let reviewers = if reviewer_ids.is_empty() {
        HashMap::new()
    } else {
        let users: Vec<User> = db
            .collection::<User>("users")
            .find(doc! { "_id": { "$in": reviewer_ids } }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?;
        users
            .iter()
            .filter_map(|user| user.id.map(|id| (id, PublicProfile::from(user))))
            .collect::<HashMap<ObjectId, PublicProfile>>()
    };

    let response: Vec<ReviewResponse> = reviews
        .iter()
        .map(|review| ReviewResponse::new(review, reviewers.get(&review.from_user).cloned()))
        .collect();

    Ok(Json(ApiResponse::success(response)))
}

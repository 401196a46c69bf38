use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use super::user::PublicProfile;

/// One-time rating left by a job's creator once the job is completed.
/// Immutable after creation; at most one review exists per job.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub job_id: ObjectId,
    pub from_user: ObjectId,
    pub to_worker: ObjectId,
    pub rating: f64,
    pub comment: Option<String>,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateReviewDto {
    pub reviewer_id: Option<String>,
    pub rating: Option<f64>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReviewResponse {
    pub id: String,
    pub job_id: String,
    pub to_worker: String,
    pub rating: f64,
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<PublicProfile>,
    pub created_at: ChronoDateTime<Utc>,
}

impl ReviewResponse {
    pub fn new(review: &Review, reviewer: Option<PublicProfile>) -> Self {
        ReviewResponse {
            id: review.id.map(|id| id.to_hex()).unwrap_or_default(),
            job_id: review.job_id.to_hex(),
            to_worker: review.to_worker.to_hex(),
            rating: review.rating,
            comment: review.comment.clone(),
            reviewer,
            created_at: review.created_at.to_chrono(),
        }
    }
}

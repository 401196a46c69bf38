use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkerProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub trade: String,
    pub education: Option<String>,
    pub about: Option<String>,
    pub experience: Option<String>,
    pub skills: Vec<String>,
    pub hourly_rate: Option<f64>,
    pub availability: bool,
    /// Mean of all review ratings for this worker, recomputed on every
    /// new review.
    pub rating: f64,
    /// Count of reviews received. One review per job keeps this equal to
    /// the number of reviewed jobs, not jobs worked.
    pub total_jobs: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegisterWorkerDto {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub trade: Option<String>,
    pub education: Option<String>,
    pub about: Option<String>,
    pub experience: Option<String>,
    pub skills: Option<Vec<String>>,
    pub hourly_rate: Option<f64>,
}

/// Projection attached to a job's proposals.
#[derive(Debug, Serialize, Clone, JsonSchema)]
pub struct WorkerSummary {
    pub id: String,
    pub user_id: String,
    pub trade: String,
}

impl From<&WorkerProfile> for WorkerSummary {
    fn from(worker: &WorkerProfile) -> Self {
        WorkerSummary {
            id: worker.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: worker.user_id.to_hex(),
            trade: worker.trade.clone(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct WorkerResponse {
    pub id: String,
    pub user_id: String,
    pub trade: String,
    pub education: Option<String>,
    pub about: Option<String>,
    pub experience: Option<String>,
    pub skills: Vec<String>,
    pub hourly_rate: Option<f64>,
    pub availability: bool,
    pub rating: f64,
    pub total_jobs: i32,
}

impl From<&WorkerProfile> for WorkerResponse {
    fn from(worker: &WorkerProfile) -> Self {
        WorkerResponse {
            id: worker.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: worker.user_id.to_hex(),
            trade: worker.trade.clone(),
            education: worker.education.clone(),
            about: worker.about.clone(),
            experience: worker.experience.clone(),
            skills: worker.skills.clone(),
            hourly_rate: worker.hourly_rate,
            availability: worker.availability,
            rating: worker.rating,
            total_jobs: worker.total_jobs,
        }
    }
}

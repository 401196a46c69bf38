use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use super::user::PublicProfile;
use super::worker::WorkerSummary;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Assigned => "assigned",
            JobStatus::InProgress => "in-progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

/// GeoJSON Point, [longitude, latitude]
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub geo_type: String, // "Point"
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        GeoPoint {
            geo_type: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }
}

/// A worker's bid, embedded in the job document.
///
/// Acceptance is recorded on the parent job (`assigned_to` + `status`);
/// the embedded `status` field stays `pending` and a proposal counts as
/// accepted only when its `worker_id` matches `job.assigned_to`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Proposal {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub worker_id: ObjectId,
    pub bid_amount: f64,
    pub message: Option<String>,
    pub status: ProposalStatus,
    pub created_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Job {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub address: Option<String>,
    pub budget: f64,
    pub duration: Option<String>,
    pub status: JobStatus,
    pub created_by: ObjectId,
    pub assigned_to: Option<ObjectId>,
    pub proposals: Vec<Proposal>,
    pub images: Vec<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateJobDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub budget: Option<f64>,
    pub duration: Option<String>,
    pub images: Option<Vec<String>>,
    // Either field names the creator; created_by wins when both are sent.
    pub created_by: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateJobDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub budget: Option<f64>,
    pub duration: Option<String>,
    pub status: Option<JobStatus>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubmitProposalDto {
    pub user_id: Option<String>,
    pub bid_amount: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AssignJobDto {
    pub worker_id: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProposalResponse {
    pub id: String,
    pub worker_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerSummary>,
    pub bid_amount: f64,
    pub message: Option<String>,
    pub status: ProposalStatus,
    pub created_at: ChronoDateTime<Utc>,
}

impl ProposalResponse {
    pub fn new(proposal: &Proposal, worker: Option<WorkerSummary>) -> Self {
        ProposalResponse {
            id: proposal.id.to_hex(),
            worker_id: proposal.worker_id.to_hex(),
            worker,
            bid_amount: proposal.bid_amount,
            message: proposal.message.clone(),
            status: proposal.status,
            created_at: proposal.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct JobResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub address: Option<String>,
    pub budget: f64,
    pub duration: Option<String>,
    pub status: JobStatus,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<PublicProfile>,
    pub assigned_to: Option<String>,
    pub proposals: Vec<ProposalResponse>,
    pub images: Vec<String>,
    pub created_at: ChronoDateTime<Utc>,
    pub updated_at: ChronoDateTime<Utc>,
}

impl JobResponse {
    pub fn new(job: &Job, creator: Option<PublicProfile>) -> Self {
        JobResponse {
            id: job.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: job.title.clone(),
            description: job.description.clone(),
            category: job.category.clone(),
            location: job.location.clone(),
            address: job.address.clone(),
            budget: job.budget,
            duration: job.duration.clone(),
            status: job.status,
            created_by: job.created_by.to_hex(),
            creator,
            assigned_to: job.assigned_to.map(|id| id.to_hex()),
            proposals: job
                .proposals
                .iter()
                .map(|p| ProposalResponse::new(p, None))
                .collect(),
            images: job.images.clone(),
            created_at: job.created_at.to_chrono(),
            updated_at: job.updated_at.to_chrono(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        for (status, wire) in [
            (JobStatus::Pending, "\"pending\""),
            (JobStatus::Assigned, "\"assigned\""),
            (JobStatus::InProgress, "\"in-progress\""),
            (JobStatus::Completed, "\"completed\""),
            (JobStatus::Cancelled, "\"cancelled\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), wire);
            assert_eq!(serde_json::from_str::<JobStatus>(wire).unwrap(), status);
            assert_eq!(format!("\"{}\"", status.as_str()), wire);
        }
    }
}

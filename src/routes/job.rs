use std::collections::HashMap;

use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime};
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use rocket::futures::TryStreamExt;

use crate::db::DbConn;
use crate::models::{
    AssignJobDto, CreateJobDto, GeoPoint, Job, JobResponse, JobStatus, NotificationKind,
    Proposal, ProposalStatus, PublicProfile, SubmitProposalDto, UpdateJobDto, User,
    WorkerProfile, WorkerSummary,
};
use crate::services::matching::{
    assignment_update, find_proposal, has_proposal_from, require_worker, AssignmentReason,
};
use crate::services::{AccountDirectory, Notifier};
use crate::utils::{ApiError, ApiResponse};

pub(crate) async fn find_job(db: &DbConn, job_id: &ObjectId) -> Result<Job, ApiError> {
    db.collection::<Job>("jobs")
        .find_one(doc! { "_id": job_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

fn validate_create(dto: &CreateJobDto) -> Result<(ObjectId, f64), ApiError> {
    let creator = dto
        .created_by
        .as_deref()
        .or(dto.user_id.as_deref())
        .ok_or_else(|| ApiError::bad_request("created_by (or user_id) is required"))?;
    let creator = ObjectId::parse_str(creator)
        .map_err(|_| ApiError::bad_request("Invalid creator ID"))?;

    for (field, value) in [
        ("title", &dto.title),
        ("description", &dto.description),
        ("category", &dto.category),
    ] {
        if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(ApiError::bad_request(format!("{} is required", field)));
        }
    }

    let budget = dto
        .budget
        .ok_or_else(|| ApiError::bad_request("budget is required"))?;
    if budget <= 0.0 {
        return Err(ApiError::bad_request("budget must be a positive number"));
    }

    Ok((creator, budget))
}

#[openapi(tag = "Job")]
#[post("/jobs", data = "<dto>")]
pub async fn create_job(
    db: &State<DbConn>,
    dto: Json<CreateJobDto>,
) -> Result<Created<Json<ApiResponse<JobResponse>>>, ApiError> {
    let (creator, budget) = validate_create(&dto)?;

    let location = match (dto.longitude, dto.latitude) {
        (Some(longitude), Some(latitude)) => Some(GeoPoint::new(longitude, latitude)),
        _ => None,
    };

    let now = DateTime::now();
    let mut job = Job {
        id: None,
        title: dto.title.as_deref().unwrap_or_default().trim().to_string(),
        description: dto.description.as_deref().unwrap_or_default().trim().to_string(),
        category: dto.category.as_deref().unwrap_or_default().trim().to_string(),
        location,
        address: dto.address.clone(),
        budget,
        duration: dto.duration.clone(),
        status: JobStatus::Pending,
        created_by: creator,
        assigned_to: None,
        proposals: vec![],
        images: dto.images.clone().unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Job>("jobs")
        .insert_one(&job, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create job: {}", e)))?;
    job.id = result.inserted_id.as_object_id();

    let uri = format!("/api/jobs/{}", job.id.map(|id| id.to_hex()).unwrap_or_default());
    Ok(Created::new(uri).body(Json(ApiResponse::success(JobResponse::new(&job, None)))))
}

#[openapi(tag = "Job")]
#[get("/jobs")]
pub async fn list_jobs(db: &State<DbConn>) -> Result<Json<ApiResponse<Vec<JobResponse>>>, ApiError> {
    let jobs: Vec<Job> = db
        .collection::<Job>("jobs")
        .find(None, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?;

    let creator_ids: Vec<ObjectId> = jobs.iter().map(|job| job.created_by).collect();
    let creators = if creator_ids.is_empty() {
        HashMap::new()
    } else {
        let users: Vec<User> = db
            .collection::<User>("users")
            .find(doc! { "_id": { "$in": creator_ids } }, None)
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

    let response: Vec<JobResponse> = jobs
        .iter()
        .map(|job| JobResponse::new(job, creators.get(&job.created_by).cloned()))
        .collect();

    Ok(Json(ApiResponse::success(response)))
}

#[openapi(tag = "Job")]
#[get("/jobs/<id>")]
pub async fn get_job(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<JobResponse>>, ApiError> {
    let job_id = ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;
    let job = find_job(db, &job_id).await?;

    let creator = AccountDirectory::find_user_by_id(db, &job.created_by).await?;
    let mut response = JobResponse::new(&job, creator.as_ref().map(PublicProfile::from));

    // Resolve each proposal's worker to a summary, one batched lookup.
    let worker_ids: Vec<ObjectId> = job.proposals.iter().map(|p| p.worker_id).collect();
    if !worker_ids.is_empty() {
        let workers: Vec<WorkerProfile> = db
            .collection::<WorkerProfile>("workers")
            .find(doc! { "_id": { "$in": worker_ids } }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?;
        let index: HashMap<String, WorkerSummary> = workers
            .iter()
            .filter_map(|w| w.id.map(|id| (id.to_hex(), WorkerSummary::from(w))))
            .collect();
        for proposal in response.proposals.iter_mut() {
            proposal.worker = index.get(&proposal.worker_id).cloned();
        }
    }

    Ok(Json(ApiResponse::success(response)))
}

#[openapi(tag = "Job")]
#[put("/jobs/<id>", data = "<dto>")]
pub async fn update_job(
    db: &State<DbConn>,
    id: String,
    dto: Json<UpdateJobDto>,
) -> Result<Json<ApiResponse<JobResponse>>, ApiError> {
    let job_id = ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;
    let job = find_job(db, &job_id).await?;

    // Merge patch: only fields present in the body are written.
    let mut set = doc! { "updated_at": DateTime::now() };
    if let Some(title) = &dto.title {
        set.insert("title", title.as_str());
    }
    if let Some(description) = &dto.description {
        set.insert("description", description.as_str());
    }
    if let Some(category) = &dto.category {
        set.insert("category", category.as_str());
    }
    if let Some(address) = &dto.address {
        set.insert("address", address.as_str());
    }
    if let Some(budget) = dto.budget {
        set.insert("budget", budget);
    }
    if let Some(duration) = &dto.duration {
        set.insert("duration", duration.as_str());
    }
    if let Some(status) = dto.status {
        set.insert("status", status.as_str());
    }
    if let Some(images) = &dto.images {
        set.insert("images", images.clone());
    }
    if let (Some(longitude), Some(latitude)) = (dto.longitude, dto.latitude) {
        let point = to_bson(&GeoPoint::new(longitude, latitude))
            .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
        set.insert("location", point);
    }

    db.collection::<Job>("jobs")
        .update_one(doc! { "_id": job_id }, doc! { "$set": set }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update job: {}", e)))?;

    // Completion is an external trigger arriving through this patch.
    if dto.status == Some(JobStatus::Completed) && job.status != JobStatus::Completed {
        let mut affected = vec![job.created_by];
        if let Some(worker_id) = job.assigned_to {
            if let Some(worker) = AccountDirectory::find_worker_by_id(db, &worker_id).await? {
                affected.push(worker.user_id);
            }
        }
        Notifier::dispatch(db, NotificationKind::JobCompleted, &job_id, &affected).await;
    }

    let updated = find_job(db, &job_id).await?;
    Ok(Json(ApiResponse::success(JobResponse::new(&updated, None))))
}

#[openapi(tag = "Job")]
#[delete("/jobs/<id>")]
pub async fn delete_job(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let job_id = ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;
    find_job(db, &job_id).await?;

    // Reviews referencing the job are left in place; they carry their
    // own copy of the reviewed worker and still count toward the rating.
    db.collection::<Job>("jobs")
        .delete_one(doc! { "_id": job_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete job: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Job removed"
    }))))
}

#[openapi(tag = "Proposal")]
#[post("/jobs/<id>/proposals", data = "<dto>")]
pub async fn submit_proposal(
    db: &State<DbConn>,
    id: String,
    dto: Json<SubmitProposalDto>,
) -> Result<Created<Json<ApiResponse<serde_json::Value>>>, ApiError> {
    let job_id = ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;
    let job = find_job(db, &job_id).await?;

    let user_id = dto
        .user_id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("user_id is required to submit a proposal"))?;
    let user_id =
        ObjectId::parse_str(user_id).map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let worker = require_worker(AccountDirectory::find_worker_by_identity(db, &user_id).await?)?;
    let worker_id = worker
        .id
        .ok_or_else(|| ApiError::internal_error("Worker profile is missing an id"))?;

    if has_proposal_from(&job.proposals, &worker_id) {
        return Err(ApiError::bad_request(
            "You have already submitted a proposal for this job",
        ));
    }

    let bid_amount = dto
        .bid_amount
        .ok_or_else(|| ApiError::bad_request("bid_amount is required"))?;

    let proposal = Proposal {
        id: ObjectId::new(),
        worker_id,
        bid_amount,
        message: dto.message.clone(),
        status: ProposalStatus::Pending,
        created_at: DateTime::now(),
    };
    let proposal_bson = to_bson(&proposal)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;

    // Duplicate check and append in one conditional update, so two
    // overlapping submissions from the same worker cannot both land.
    let result = db
        .collection::<Job>("jobs")
        .update_one(
            doc! { "_id": job_id, "proposals.worker_id": { "$ne": worker_id } },
            doc! {
                "$push": { "proposals": proposal_bson },
                "$set": { "updated_at": DateTime::now() },
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to add proposal: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::bad_request(
            "You have already submitted a proposal for this job",
        ));
    }

    let uri = format!("/api/jobs/{}", id);
    Ok(Created::new(uri).body(Json(ApiResponse::success_with_message(
        "Proposal added".to_string(),
        serde_json::json!({ "proposal_id": proposal.id.to_hex() }),
    ))))
}

#[openapi(tag = "Proposal")]
#[put("/jobs/<id>/proposals/<proposal_id>/accept")]
pub async fn accept_proposal(
    db: &State<DbConn>,
    id: String,
    proposal_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let job_id = ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;
    let proposal_id = ObjectId::parse_str(&proposal_id)
        .map_err(|_| ApiError::bad_request("Invalid proposal ID"))?;

    let job = find_job(db, &job_id).await?;
    let proposal =
        find_proposal(&job, &proposal_id).ok_or_else(|| ApiError::not_found("Proposal not found"))?;
    let worker_id = proposal.worker_id;

    db.collection::<Job>("jobs")
        .update_one(
            doc! { "_id": job_id },
            assignment_update(worker_id, AssignmentReason::ProposalAccepted),
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to assign job: {}", e)))?;

    let mut affected = vec![job.created_by];
    if let Some(worker) = AccountDirectory::find_worker_by_id(db, &worker_id).await? {
        affected.push(worker.user_id);
    }
    Notifier::dispatch(db, NotificationKind::JobAssigned, &job_id, &affected).await;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Proposal accepted and job assigned"
    }))))
}

#[openapi(tag = "Proposal")]
#[put("/jobs/<id>/assign", data = "<dto>")]
pub async fn assign_job(
    db: &State<DbConn>,
    id: String,
    dto: Json<AssignJobDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let job_id = ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;
    let job = find_job(db, &job_id).await?;

    let worker_id = ObjectId::parse_str(&dto.worker_id)
        .map_err(|_| ApiError::bad_request("Invalid worker ID"))?;
    let worker = AccountDirectory::find_worker_by_id(db, &worker_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Worker not found"))?;

    db.collection::<Job>("jobs")
        .update_one(
            doc! { "_id": job_id },
            assignment_update(worker_id, AssignmentReason::DirectAssign),
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to assign job: {}", e)))?;

    Notifier::dispatch(
        db,
        NotificationKind::JobAssigned,
        &job_id,
        &[job.created_by, worker.user_id],
    )
    .await;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Job assigned successfully"
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(
        title: Option<&str>,
        budget: Option<f64>,
        created_by: Option<String>,
        user_id: Option<String>,
    ) -> CreateJobDto {
        CreateJobDto {
            title: title.map(str::to_string),
            description: Some("Mount a 55in TV on drywall".to_string()),
            category: Some("handyman".to_string()),
            latitude: None,
            longitude: None,
            address: None,
            budget,
            duration: None,
            images: None,
            created_by,
            user_id,
        }
    }

    #[test]
    fn missing_budget_is_rejected() {
        let creator = ObjectId::new().to_hex();
        let err = validate_create(&dto(Some("Mount TV"), None, Some(creator), None)).unwrap_err();
        assert_eq!(err.status, rocket::http::Status::BadRequest);
        assert!(err.message.contains("budget"));
    }

    #[test]
    fn non_positive_budget_is_rejected() {
        let creator = ObjectId::new().to_hex();
        for bad in [0.0, -25.0] {
            let err =
                validate_create(&dto(Some("Mount TV"), Some(bad), Some(creator.clone()), None))
                    .unwrap_err();
            assert!(err.message.contains("positive"));
        }
    }

    #[test]
    fn missing_creator_is_rejected() {
        let err = validate_create(&dto(Some("Mount TV"), Some(100.0), None, None)).unwrap_err();
        assert!(err.message.contains("created_by"));
    }

    #[test]
    fn user_id_is_accepted_as_creator_alias() {
        let user = ObjectId::new();
        let (creator, budget) =
            validate_create(&dto(Some("Mount TV"), Some(100.0), None, Some(user.to_hex())))
                .unwrap();
        assert_eq!(creator, user);
        assert_eq!(budget, 100.0);
    }

    #[test]
    fn blank_required_text_is_rejected() {
        let creator = ObjectId::new().to_hex();
        for bad in [None, Some(""), Some("   ")] {
            let err =
                validate_create(&dto(bad, Some(100.0), Some(creator.clone()), None)).unwrap_err();
            assert!(err.message.contains("title"));
        }
    }
}

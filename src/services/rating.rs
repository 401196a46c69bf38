use mongodb::bson::oid::ObjectId;

use crate::models::{Job, JobStatus};
use crate::utils::ApiError;

/// Derived fields written back onto the worker after each review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingAggregate {
    pub rating: f64,
    /// Review count. See `WorkerProfile::total_jobs`.
    pub total_jobs: i32,
}

/// Full recompute over every rating the worker has received. The caller
/// fetches ratings after inserting the new review, so the slice is never
/// empty on that path.
pub fn aggregate(ratings: &[f64]) -> RatingAggregate {
    if ratings.is_empty() {
        return RatingAggregate { rating: 0.0, total_jobs: 0 };
    }
    RatingAggregate {
        rating: ratings.iter().sum::<f64>() / ratings.len() as f64,
        total_jobs: ratings.len() as i32,
    }
}

/// Preconditions for reviewing a job, checked in order: only the job's
/// creator may review, the job must have an assignee, and it must be
/// completed. Returns the worker the review targets.
pub fn review_gate(job: &Job, reviewer: &ObjectId) -> Result<ObjectId, ApiError> {
    if job.created_by != *reviewer {
        return Err(ApiError::unauthorized("You are not authorized to review this job."));
    }

    let assigned_to = job
        .assigned_to
        .ok_or_else(|| ApiError::bad_request("This job has not been assigned to a worker yet."))?;

    if job.status != JobStatus::Completed {
        return Err(ApiError::bad_request("You can only review completed jobs."));
    }

    Ok(assigned_to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Proposal, Review};
    use crate::services::matching::{apply_assignment, has_proposal_from, AssignmentReason};
    use mongodb::bson::DateTime;
    use rocket::http::Status;

    fn completed_job(creator: ObjectId, worker: Option<ObjectId>) -> Job {
        Job {
            id: Some(ObjectId::new()),
            title: "Repaint fence".to_string(),
            description: "Two coats, weatherproof".to_string(),
            category: "painting".to_string(),
            location: None,
            address: None,
            budget: 250.0,
            duration: None,
            status: JobStatus::Completed,
            created_by: creator,
            assigned_to: worker,
            proposals: vec![],
            images: vec![],
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    #[test]
    fn mean_and_count_over_all_ratings() {
        let agg = aggregate(&[4.0]);
        assert_eq!(agg.rating, 4.0);
        assert_eq!(agg.total_jobs, 1);

        let agg = aggregate(&[5.0, 3.0, 4.0]);
        assert_eq!(agg.rating, 4.0);
        assert_eq!(agg.total_jobs, 3);

        let agg = aggregate(&[4.0, 5.0]);
        assert_eq!(agg.rating, 4.5);
        assert_eq!(agg.total_jobs, 2);
    }

    #[test]
    fn empty_rating_list_aggregates_to_zero() {
        let agg = aggregate(&[]);
        assert_eq!(agg.rating, 0.0);
        assert_eq!(agg.total_jobs, 0);
    }

    #[test]
    fn non_creator_is_rejected_before_anything_else() {
        let creator = ObjectId::new();
        let job = completed_job(creator, None);
        let err = review_gate(&job, &ObjectId::new()).unwrap_err();
        assert_eq!(err.status, Status::Unauthorized);
    }

    #[test]
    fn unassigned_job_cannot_be_reviewed() {
        let creator = ObjectId::new();
        let job = completed_job(creator, None);
        let err = review_gate(&job, &creator).unwrap_err();
        assert_eq!(err.status, Status::BadRequest);
        assert!(err.message.contains("not been assigned"));
    }

    #[test]
    fn incomplete_job_cannot_be_reviewed() {
        let creator = ObjectId::new();
        let worker = ObjectId::new();
        for status in [JobStatus::Pending, JobStatus::Assigned, JobStatus::InProgress, JobStatus::Cancelled] {
            let mut job = completed_job(creator, Some(worker));
            job.status = status;
            let err = review_gate(&job, &creator).unwrap_err();
            assert_eq!(err.status, Status::BadRequest);
            assert!(err.message.contains("completed"));
        }
    }

    #[test]
    fn gate_passes_for_creator_on_completed_assigned_job() {
        let creator = ObjectId::new();
        let worker = ObjectId::new();
        let job = completed_job(creator, Some(worker));
        assert_eq!(review_gate(&job, &creator).unwrap(), worker);
    }

    // Reviews carry their own copy of the reviewed worker, so deleting
    // the job they reference leaves them counting toward the aggregate.
    #[test]
    fn orphaned_reviews_still_count_toward_aggregate() {
        let creator = ObjectId::new();
        let worker = ObjectId::new();
        let job = completed_job(creator, Some(worker));
        let job_id = job.id.unwrap();

        let reviews = vec![Review {
            id: Some(ObjectId::new()),
            job_id,
            from_user: creator,
            to_worker: worker,
            rating: 4.0,
            comment: None,
            created_at: DateTime::now(),
        }];
        drop(job);

        let ratings: Vec<f64> = reviews
            .iter()
            .filter(|r| r.to_worker == worker)
            .map(|r| r.rating)
            .collect();
        let agg = aggregate(&ratings);
        assert_eq!(agg.rating, 4.0);
        assert_eq!(agg.total_jobs, 1);
    }

    // Logic-level walk through the whole lifecycle: post, bid, accept,
    // complete, review, aggregate.
    #[test]
    fn lifecycle_ends_with_worker_rated_from_single_review() {
        let creator = ObjectId::new();
        let worker = ObjectId::new();
        let mut job = completed_job(creator, None);
        job.status = JobStatus::Pending;

        assert!(!has_proposal_from(&job.proposals, &worker));
        job.proposals.push(Proposal {
            id: ObjectId::new(),
            worker_id: worker,
            bid_amount: 90.0,
            message: Some("Can start tomorrow".to_string()),
            status: crate::models::ProposalStatus::Pending,
            created_at: DateTime::now(),
        });
        assert!(has_proposal_from(&job.proposals, &worker));

        apply_assignment(&mut job, worker, AssignmentReason::ProposalAccepted);
        assert_eq!(review_gate(&job, &creator).unwrap_err().status, Status::BadRequest);

        job.status = JobStatus::Completed;
        let reviewed = review_gate(&job, &creator).unwrap();
        assert_eq!(reviewed, worker);

        let agg = aggregate(&[4.0]);
        assert_eq!(agg.rating, 4.0);
        assert_eq!(agg.total_jobs, 1);
    }
}

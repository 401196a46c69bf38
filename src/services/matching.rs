use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};

use crate::models::{Job, JobStatus, Proposal, WorkerProfile};
use crate::utils::ApiError;

/// How a worker ended up bound to a job. Both REST paths funnel through
/// the same transition so any future guard (e.g. rejecting re-assignment)
/// lands in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentReason {
    ProposalAccepted,
    DirectAssign,
}

/// The single `$set` that binds a worker to a job. Unconditional:
/// assignment overwrites any prior assignee, last write wins, and the
/// current status is not checked.
pub fn assignment_update(worker_id: ObjectId, reason: AssignmentReason) -> Document {
    debug!("assigning worker {} ({:?})", worker_id.to_hex(), reason);
    doc! {
        "$set": {
            "assigned_to": worker_id,
            "status": JobStatus::Assigned.as_str(),
            "updated_at": DateTime::now(),
        }
    }
}

/// In-memory counterpart of [`assignment_update`].
pub fn apply_assignment(job: &mut Job, worker_id: ObjectId, _reason: AssignmentReason) {
    job.assigned_to = Some(worker_id);
    job.status = JobStatus::Assigned;
    job.updated_at = DateTime::now();
}

/// Worker-identity gate for proposal submission: only identities backed
/// by a worker profile may bid.
pub fn require_worker(profile: Option<WorkerProfile>) -> Result<WorkerProfile, ApiError> {
    profile.ok_or_else(|| ApiError::bad_request("Only workers can submit proposals."))
}

/// Duplicate-submission guard: a worker holds at most one proposal per
/// job. The route checks this against the fetched job, then the
/// conditional `$push` re-applies the same predicate in the store so two
/// overlapping submissions cannot both land.
pub fn has_proposal_from(proposals: &[Proposal], worker_id: &ObjectId) -> bool {
    proposals.iter().any(|p| p.worker_id == *worker_id)
}

pub fn find_proposal<'a>(job: &'a Job, proposal_id: &ObjectId) -> Option<&'a Proposal> {
    job.proposals.iter().find(|p| p.id == *proposal_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProposalStatus;

    fn job_with(status: JobStatus, proposals: Vec<Proposal>) -> Job {
        Job {
            id: Some(ObjectId::new()),
            title: "Fix kitchen sink".to_string(),
            description: "Leaking trap under the sink".to_string(),
            category: "plumbing".to_string(),
            location: None,
            address: None,
            budget: 100.0,
            duration: None,
            status,
            created_by: ObjectId::new(),
            assigned_to: None,
            proposals,
            images: vec![],
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    fn proposal_from(worker_id: ObjectId) -> Proposal {
        Proposal {
            id: ObjectId::new(),
            worker_id,
            bid_amount: 90.0,
            message: None,
            status: ProposalStatus::Pending,
            created_at: DateTime::now(),
        }
    }

    #[test]
    fn assignment_binds_worker_regardless_of_prior_state() {
        let worker = ObjectId::new();
        for status in [
            JobStatus::Pending,
            JobStatus::Assigned,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            let mut job = job_with(status, vec![]);
            apply_assignment(&mut job, worker, AssignmentReason::ProposalAccepted);
            assert_eq!(job.status, JobStatus::Assigned);
            assert_eq!(job.assigned_to, Some(worker));
        }
    }

    #[test]
    fn reassignment_overwrites_prior_assignee() {
        let mut job = job_with(JobStatus::Pending, vec![]);
        let first = ObjectId::new();
        let second = ObjectId::new();
        apply_assignment(&mut job, first, AssignmentReason::ProposalAccepted);
        apply_assignment(&mut job, second, AssignmentReason::DirectAssign);
        assert_eq!(job.assigned_to, Some(second));
        assert_eq!(job.status, JobStatus::Assigned);
    }

    #[test]
    fn acceptance_leaves_embedded_proposal_status_pending() {
        let worker = ObjectId::new();
        let mut job = job_with(JobStatus::Pending, vec![proposal_from(worker)]);
        apply_assignment(&mut job, worker, AssignmentReason::ProposalAccepted);
        assert_eq!(job.proposals[0].status, ProposalStatus::Pending);
        assert_eq!(job.assigned_to, Some(job.proposals[0].worker_id));
    }

    #[test]
    fn identity_without_worker_profile_cannot_bid() {
        let err = require_worker(None).unwrap_err();
        assert_eq!(err.status, rocket::http::Status::BadRequest);
        assert_eq!(err.message, "Only workers can submit proposals.");
    }

    #[test]
    fn worker_identity_passes_the_gate() {
        let profile = WorkerProfile {
            id: Some(ObjectId::new()),
            user_id: ObjectId::new(),
            trade: "electrician".to_string(),
            education: None,
            about: None,
            experience: None,
            skills: vec![],
            hourly_rate: None,
            availability: true,
            rating: 0.0,
            total_jobs: 0,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };
        let id = profile.id;
        assert_eq!(require_worker(Some(profile)).unwrap().id, id);
    }

    #[test]
    fn duplicate_guard_matches_on_worker_id() {
        let worker = ObjectId::new();
        let other = ObjectId::new();
        let job = job_with(JobStatus::Pending, vec![proposal_from(worker)]);
        assert!(has_proposal_from(&job.proposals, &worker));
        assert!(!has_proposal_from(&job.proposals, &other));
    }

    #[test]
    fn find_proposal_resolves_by_embedded_id() {
        let worker = ObjectId::new();
        let proposal = proposal_from(worker);
        let wanted = proposal.id;
        let job = job_with(JobStatus::Pending, vec![proposal_from(ObjectId::new()), proposal]);
        assert_eq!(find_proposal(&job, &wanted).map(|p| p.worker_id), Some(worker));
        assert!(find_proposal(&job, &ObjectId::new()).is_none());
    }

    #[test]
    fn assignment_update_sets_exactly_the_transition_fields() {
        let worker = ObjectId::new();
        let update = assignment_update(worker, AssignmentReason::DirectAssign);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_object_id("assigned_to").unwrap(), worker);
        assert_eq!(set.get_str("status").unwrap(), "assigned");
        assert!(set.contains_key("updated_at"));
        assert_eq!(set.len(), 3);
    }
}

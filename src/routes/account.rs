use mongodb::bson::{doc, oid::ObjectId, DateTime};
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::models::{
    GeoPoint, RegisterUserDto, RegisterWorkerDto, User, UserResponse, UserRole, WorkerProfile,
    WorkerResponse,
};
use crate::utils::{ApiError, ApiResponse};

fn required(field: &str, value: &Option<String>) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::bad_request(format!("{} is required", field))),
    }
}

async fn ensure_unique(db: &DbConn, email: &str, username: &str) -> Result<(), ApiError> {
    let existing = db
        .collection::<User>("users")
        .find_one(
            doc! { "$or": [ { "email": email }, { "username": username } ] },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if existing.is_some() {
        return Err(ApiError::bad_request(
            "User already exists with that email or username",
        ));
    }
    Ok(())
}

#[openapi(tag = "Account")]
#[post("/users", data = "<dto>")]
pub async fn register_user(
    db: &State<DbConn>,
    dto: Json<RegisterUserDto>,
) -> Result<Created<Json<ApiResponse<UserResponse>>>, ApiError> {
    let name = required("name", &dto.name)?;
    let username = required("username", &dto.username)?;
    let email = required("email", &dto.email)?;
    let phone = required("phone", &dto.phone)?;

    ensure_unique(db, &email, &username).await?;

    let location = match (dto.longitude, dto.latitude) {
        (Some(longitude), Some(latitude)) => Some(GeoPoint::new(longitude, latitude)),
        _ => None,
    };

    let now = DateTime::now();
    let mut user = User {
        id: None,
        name,
        username,
        email,
        phone,
        address: dto.address.clone(),
        avatar: dto.avatar.clone(),
        location,
        role: UserRole::User,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<User>("users")
        .insert_one(&user, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create user: {}", e)))?;
    user.id = result.inserted_id.as_object_id();

    let uri = format!("/api/users/{}", user.id.map(|id| id.to_hex()).unwrap_or_default());
    Ok(Created::new(uri).body(Json(ApiResponse::success(UserResponse::from(&user)))))
}

#[openapi(tag = "Account")]
#[post("/workers", data = "<dto>")]
pub async fn register_worker(
    db: &State<DbConn>,
    dto: Json<RegisterWorkerDto>,
) -> Result<Created<Json<ApiResponse<serde_json::Value>>>, ApiError> {
    let name = required("name", &dto.name)?;
    let username = required("username", &dto.username)?;
    let email = required("email", &dto.email)?;
    let phone = required("phone", &dto.phone)?;
    let trade = required("trade", &dto.trade)?;

    ensure_unique(db, &email, &username).await?;

    let location = match (dto.longitude, dto.latitude) {
        (Some(longitude), Some(latitude)) => Some(GeoPoint::new(longitude, latitude)),
        _ => None,
    };

    let now = DateTime::now();
    let mut user = User {
        id: None,
        name,
        username,
        email,
        phone,
        address: dto.address.clone(),
        avatar: dto.avatar.clone(),
        location,
        role: UserRole::Worker,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<User>("users")
        .insert_one(&user, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create user: {}", e)))?;
    user.id = result.inserted_id.as_object_id();
    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("Invalid user ID"))?;

    let mut worker = WorkerProfile {
        id: None,
        user_id,
        trade,
        education: dto.education.clone(),
        about: dto.about.clone(),
        experience: dto.experience.clone(),
        skills: dto.skills.clone().unwrap_or_default(),
        hourly_rate: dto.hourly_rate,
        availability: true,
        rating: 0.0,
        total_jobs: 0,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<WorkerProfile>("workers")
        .insert_one(&worker, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create worker profile: {}", e)))?;
    worker.id = result.inserted_id.as_object_id();

    let uri = format!(
        "/api/workers/{}",
        worker.id.map(|id| id.to_hex()).unwrap_or_default()
    );
    Ok(Created::new(uri).body(Json(ApiResponse::success(serde_json::json!({
        "user": UserResponse::from(&user),
        "worker": WorkerResponse::from(&worker),
    })))))
}

#[openapi(tag = "Account")]
#[get("/workers/<id>")]
pub async fn get_worker(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<WorkerResponse>>, ApiError> {
    let worker_id =
        ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid worker ID"))?;

    let worker = db
        .collection::<WorkerProfile>("workers")
        .find_one(doc! { "_id": worker_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Worker not found"))?;

    Ok(Json(ApiResponse::success(WorkerResponse::from(&worker))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank_values() {
        assert!(required("name", &None).is_err());
        assert!(required("name", &Some(String::new())).is_err());
        assert!(required("name", &Some("  ".to_string())).is_err());
    }

    #[test]
    fn required_trims_surrounding_whitespace() {
        assert_eq!(required("name", &Some(" Priya ".to_string())).unwrap(), "Priya");
    }
}

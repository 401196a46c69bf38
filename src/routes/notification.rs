use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use rocket::futures::TryStreamExt;

use crate::db::DbConn;
use crate::models::{Notification, NotificationResponse};
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Notification")]
#[get("/notifications?<user_id>")]
pub async fn list_notifications(
    db: &State<DbConn>,
    user_id: String,
) -> Result<Json<ApiResponse<Vec<NotificationResponse>>>, ApiError> {
    let user_id =
        ObjectId::parse_str(&user_id).map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();

    let notifications: Vec<Notification> = db
        .collection::<Notification>("notifications")
        .find(doc! { "user_id": user_id }, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .try_collect()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?;

    let response: Vec<NotificationResponse> =
        notifications.iter().map(NotificationResponse::from).collect();

    Ok(Json(ApiResponse::success(response)))
}

#[openapi(tag = "Notification")]
#[put("/notifications/<id>/read")]
pub async fn mark_notification_read(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<NotificationResponse>>, ApiError> {
    let notification_id =
        ObjectId::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid notification ID"))?;

    let result = db
        .collection::<Notification>("notifications")
        .update_one(
            doc! { "_id": notification_id },
            doc! { "$set": { "read": true } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update notification: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Notification not found"));
    }

    let notification = db
        .collection::<Notification>("notifications")
        .find_one(doc! { "_id": notification_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    Ok(Json(ApiResponse::success(NotificationResponse::from(&notification))))
}

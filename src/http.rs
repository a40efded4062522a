use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::dispatcher::{DispatchError, Dispatcher};
use crate::message::{DeliveryReceipt, MemberRecord, MemberUpsert, SendMessage};

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            DispatchError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            DispatchError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DispatchError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            DispatchError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream"),
            DispatchError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            error!("{kind}: {self}");
        }
        let body = Json(json!({ "error": kind, "message": self.to_string() }));
        (status, body).into_response()
    }
}

/// A body that failed to parse is the caller's mistake, not ours.
fn bad_body(rejection: JsonRejection) -> DispatchError {
    DispatchError::BadRequest(rejection.body_text())
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/api/messages", post(send_message))
        .route("/api/members", post(add_member))
        .route("/api/groups/{group}/members", get(list_members))
        .route("/api/groups/{group}/members/{user}", delete(remove_member))
        .route("/api/users/online", get(online_users))
        .route("/api/users/{user}", delete(delete_user))
        .route("/api/users/{user}/online", get(is_online))
        .route("/api/users/{user}/available", get(username_available))
        .route("/api/profiles", post(create_profile))
        .route("/api/languages", get(languages))
        .route("/healthz", get(health))
        .layer(Extension(dispatcher))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn send_message(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    payload: Result<Json<SendMessage>, JsonRejection>,
) -> Result<Json<DeliveryReceipt>, DispatchError> {
    let Json(msg) = payload.map_err(bad_body)?;
    Ok(Json(dispatcher.send_message(msg).await?))
}

async fn add_member(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    payload: Result<Json<MemberUpsert>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), DispatchError> {
    let Json(member) = payload.map_err(bad_body)?;
    dispatcher.add_member(member).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "member added" })),
    ))
}

async fn remove_member(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Path((group, user)): Path<(String, String)>,
) -> Result<Json<Value>, DispatchError> {
    dispatcher.remove_member(&group, &user).await?;
    Ok(Json(json!({ "message": "member removed" })))
}

async fn list_members(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Path(group): Path<String>,
) -> Result<Json<HashMap<String, MemberRecord>>, DispatchError> {
    Ok(Json(dispatcher.list_members(&group).await?))
}

async fn is_online(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Path(user): Path<String>,
) -> Result<Json<Value>, DispatchError> {
    let online = dispatcher.is_online(&user).await?;
    Ok(Json(json!({ "userId": user, "online": online })))
}

async fn username_available(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Path(user): Path<String>,
) -> Result<Json<Value>, DispatchError> {
    let available = dispatcher.username_available(&user).await?;
    Ok(Json(json!({ "isAvailable": available })))
}

async fn delete_user(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Path(user): Path<String>,
) -> Result<Json<Value>, DispatchError> {
    dispatcher.delete_user(&user).await?;
    Ok(Json(json!({ "message": "user deleted" })))
}

async fn create_profile(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    payload: Result<Json<MemberUpsert>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), DispatchError> {
    let Json(profile) = payload.map_err(bad_body)?;
    dispatcher.create_profile(profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "profile created" })),
    ))
}

async fn online_users(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
) -> Result<Json<Vec<MemberRecord>>, DispatchError> {
    Ok(Json(dispatcher.online_users().await?))
}

/// The catalog is returned verbatim; it is already JSON.
async fn languages(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
) -> Result<Response, DispatchError> {
    let catalog = dispatcher.supported_languages().await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], catalog).into_response())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

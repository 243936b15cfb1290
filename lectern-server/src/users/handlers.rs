//! Account management endpoints.
//!
//! Thin wrappers over [`lectern_core::UserService`]; every authorization and
//! update rule lives there.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use lectern_core::{CreateUserCommand, UserUpdate};
use lectern_model::{
    ApiResponse, BrowserUser, OnlineUsersResponse, User, UserId,
    UserListResponse,
};

use crate::infra::app_state::AppState;
use crate::infra::errors::AppResult;

const LATEST_SESSION: &str = "latestSession";

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Comma-separated expansions, e.g. `latestSession`
    pub include: Option<String>,
}

impl ListUsersQuery {
    fn includes(&self, expansion: &str) -> bool {
        self.include.as_deref().is_some_and(|raw| {
            raw.split(',').any(|part| part.trim() == expansion)
        })
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Json<ApiResponse<UserListResponse>>> {
    let listing = state
        .users
        .list_users(&actor, query.includes(LATEST_SESSION))
        .await?;
    Ok(Json(ApiResponse::success(listing)))
}

pub async fn online_users(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
) -> AppResult<Json<ApiResponse<OnlineUsersResponse>>> {
    let online = state.users.online_users(&actor).await?;
    Ok(Json(ApiResponse::success(online)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<UserId>,
) -> AppResult<Json<ApiResponse<BrowserUser>>> {
    let user = state.users.get_user(&actor, id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(command): Json<CreateUserCommand>,
) -> AppResult<Json<ApiResponse<BrowserUser>>> {
    let user = state.users.create_user(&actor, command).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<UserId>,
    Json(update): Json<UserUpdate>,
) -> AppResult<Json<ApiResponse<BrowserUser>>> {
    let user = state.users.update_user(&actor, id, update).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<UserId>,
) -> AppResult<Json<ApiResponse<Value>>> {
    state.users.delete_user(&actor, id).await?;
    Ok(Json(
        ApiResponse::success(json!({ "id": id }))
            .with_message("User deleted".to_string()),
    ))
}

pub async fn unlink_external_identity(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<UserId>,
) -> AppResult<Json<ApiResponse<BrowserUser>>> {
    let user = state.users.unlink_external_identity(&actor, id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_parsing_tolerates_lists() {
        let query = |raw: Option<&str>| ListUsersQuery {
            include: raw.map(str::to_string),
        };
        assert!(query(Some("latestSession")).includes(LATEST_SESSION));
        let listed = query(Some("progress, latestSession"));
        assert!(listed.includes(LATEST_SESSION));
        assert!(!query(Some("latest")).includes(LATEST_SESSION));
        assert!(!query(None).includes(LATEST_SESSION));
    }
}

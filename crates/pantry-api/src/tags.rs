use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value;

use pantry_types::api::TagResponse;

use crate::error::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::serializers::{self, WriteMode};
use crate::state::{AppState, with_db};

/// GET /tags — ordered by name, descending.
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<TagResponse>>> {
    let tags = with_db(&state, "list tags", move |db| db.tags(principal.id).list()).await?;
    Ok(Json(tags.iter().map(serializers::tag_view).collect()))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<TagResponse>> {
    let tag = with_db(&state, "get tag", move |db| db.tags(principal.id).get(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(serializers::tag_view(&tag)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<TagResponse>> {
    apply_update(state, principal, id, payload, WriteMode::Full).await
}

pub async fn partial_update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<TagResponse>> {
    apply_update(state, principal, id, payload, WriteMode::Partial).await
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<StatusCode> {
    let deleted = with_db(&state, "delete tag", move |db| db.tags(principal.id).delete(id)).await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn apply_update(
    state: AppState,
    principal: Principal,
    id: i64,
    payload: Result<Json<Value>, JsonRejection>,
    mode: WriteMode,
) -> ApiResult<Json<TagResponse>> {
    let owner = principal.id;
    if !with_db(&state, "find tag", move |db| db.tags(owner).exists(id)).await? {
        return Err(ApiError::NotFound);
    }

    let Json(body) = payload?;
    let changes = serializers::tag_changes(body, mode)?;

    let tag = with_db(&state, "update tag", move |db| db.tags(owner).update(id, &changes))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(serializers::tag_view(&tag)))
}

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::debug;

use pantry_types::api::{RecipeDetail, RecipeSummary};

use crate::error::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::serializers::{self, WriteMode};
use crate::state::{AppState, with_db};

/// GET /recipes — the caller's recipes, newest first, in summary form.
pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<RecipeSummary>>> {
    let recipes = with_db(&state, "list recipes", move |db| db.recipes(principal.id).list()).await?;
    Ok(Json(recipes.iter().map(serializers::recipe_summary).collect()))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = payload?;
    let changes = serializers::recipe_changes(body, WriteMode::Create)?;

    let recipe = with_db(&state, "create recipe", move |db| {
        db.recipes(principal.id).create(&changes)
    })
    .await?;

    debug!("Recipe {} created", recipe.id);
    Ok((StatusCode::CREATED, Json(serializers::recipe_detail(&recipe))))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<RecipeDetail>> {
    let recipe = with_db(&state, "get recipe", move |db| db.recipes(principal.id).get(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(serializers::recipe_detail(&recipe)))
}

/// PUT /recipes/{id}
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<RecipeDetail>> {
    apply_update(state, principal, id, payload, WriteMode::Full).await
}

/// PATCH /recipes/{id}
pub async fn partial_update_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<RecipeDetail>> {
    apply_update(state, principal, id, payload, WriteMode::Partial).await
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<StatusCode> {
    let deleted = with_db(&state, "delete recipe", move |db| db.recipes(principal.id).delete(id)).await?;

    if deleted {
        debug!("Recipe {} deleted", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// A recipe outside the caller's scope is reported as not found before the
/// payload is looked at. The payload is fully validated before anything is
/// written.
async fn apply_update(
    state: AppState,
    principal: Principal,
    id: i64,
    payload: Result<Json<Value>, JsonRejection>,
    mode: WriteMode,
) -> ApiResult<Json<RecipeDetail>> {
    let owner = principal.id;
    if !with_db(&state, "find recipe", move |db| db.recipes(owner).exists(id)).await? {
        return Err(ApiError::NotFound);
    }

    let Json(body) = payload?;
    let changes = serializers::recipe_changes(body, mode)?;

    let recipe = with_db(&state, "update recipe", move |db| db.recipes(owner).update(id, &changes))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(serializers::recipe_detail(&recipe)))
}

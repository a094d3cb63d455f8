use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, recipes, tags};

/// Build the full router. Transport layers (CORS, tracing) are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/users", post(auth::register))
        .route("/users/token", post(auth::login));

    let protected_routes = Router::new()
        .route("/recipes", get(recipes::list_recipes).post(recipes::create_recipe))
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .patch(recipes::partial_update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/tags", get(tags::list_tags))
        .route(
            "/tags/{id}",
            get(tags::get_tag)
                .put(tags::update_tag)
                .patch(tags::partial_update_tag)
                .delete(tags::delete_tag),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

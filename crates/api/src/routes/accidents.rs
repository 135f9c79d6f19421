//! Route definitions for the `/api/accidents` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::accidents;
use crate::state::AppState;

/// Routes mounted at `/api/accidents`.
///
/// ```text
/// GET    /         -> list
/// GET    /{id}     -> get_by_id
/// DELETE /{id}     -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(accidents::list))
        .route("/{id}", get(accidents::get_by_id).delete(accidents::delete))
}

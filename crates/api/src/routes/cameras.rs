//! Route definitions for the `/api/cameras` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::cameras;
use crate::state::AppState;

/// Routes mounted at `/api/cameras`.
///
/// ```text
/// GET    /         -> list
/// POST   /         -> create
/// GET    /{id}     -> get_by_id
/// PUT    /{id}     -> update
/// DELETE /{id}     -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cameras::list).post(cameras::create))
        .route(
            "/{id}",
            get(cameras::get_by_id)
                .put(cameras::update)
                .delete(cameras::delete),
        )
}

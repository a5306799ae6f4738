use super::{controllers, middleware, models};
use axum::{
    middleware::from_fn,
    routing::{get, post, Router},
};
use tower_http::trace::TraceLayer;

#[rustfmt::skip]
pub fn get_routes() -> Router<models::AppState> {
    Router::new()
        .route("/", get(controllers::root))
        .route("/health", get(controllers::health))
        .route("/properties", get(controllers::list_properties))
        .route("/property/:id", get(controllers::get_property).post(controllers::save_property))
        .route("/scrape", post(controllers::scrape))
        .fallback(controllers::not_found)
}

pub fn build_app(state: models::AppState) -> Router {
    get_routes()
        .layer(from_fn(middleware::html_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

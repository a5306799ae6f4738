use super::{
    components::{
        Component, ErrorPage, Message, Page, PropertyForm, PropertyList,
    },
    errors::ServerError,
    form,
    models::{self, AppState},
    scrape::DEFAULT_BOROUGH,
};
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

pub async fn root() -> impl IntoResponse {
    Redirect::to("/properties")
}

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy", "app": "Property Info Sheets"}))
}

pub async fn list_properties(
    State(AppState { store, .. }): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
    let ids = store.list_properties().await?;
    let html = Page {
        title: "Property Info Sheets".to_string(),
        children: Box::new(PropertyList { ids: &ids }),
    }
    .render();
    Ok(html)
}

pub async fn get_property(
    State(AppState { store, .. }): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let record = store.load_property(&id).await?;
    let html = Page {
        title: format!("{} - Property Info", models::display_name(&id)),
        children: Box::new(PropertyForm {
            record: &record,
            message: None,
        }),
    }
    .render();
    Ok(html)
}

pub async fn save_property(
    State(AppState { store, .. }): State<AppState>,
    Path(id): Path<String>,
    Form(submitted): Form<HashMap<String, String>>,
) -> Result<impl IntoResponse, ServerError> {
    let edits = form::parse_submission(&submitted);
    let receipt = store.save_property(&id, &edits).await?;
    let record = store.load_property(&id).await?;
    let html = Page {
        title: format!("{} - Property Info", models::display_name(&id)),
        children: Box::new(PropertyForm {
            record: &record,
            message: Some(Message {
                text: format!(
                    "Changes saved. Backup created: {}",
                    receipt.backup
                ),
            }),
        }),
    }
    .render();
    Ok(html)
}

pub async fn not_found() -> impl IntoResponse {
    let page = Page {
        title: "Not Found".to_string(),
        children: Box::new(ErrorPage {
            status: StatusCode::NOT_FOUND,
            message: "There is nothing here.".to_string(),
        }),
    };
    (StatusCode::NOT_FOUND, page.render())
}

#[derive(Deserialize)]
pub struct ScrapeRequest {
    lot_number: Option<String>,
    borough: Option<String>,
}

fn scrape_error(status: StatusCode, error: impl ToString) -> Response {
    let body = json!({"success": false, "error": error.to_string()});
    (status, Json(body)).into_response()
}

pub async fn scrape(
    State(AppState { scraper, .. }): State<AppState>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(e) => return scrape_error(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let lot_number = request.lot_number.unwrap_or_default();
    let lot_number = lot_number.trim();
    if lot_number.is_empty() {
        return scrape_error(StatusCode::BAD_REQUEST, "Lot number is required");
    }
    let borough = request
        .borough
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| DEFAULT_BOROUGH.to_string());

    match scraper.scrape_property(lot_number, &borough).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => scrape_error(StatusCode::BAD_GATEWAY, e),
    }
}

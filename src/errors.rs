use super::{
    components::{Component, ErrorPage, Page},
    store::StoreError,
};
use anyhow::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug)]
pub struct ServerError(Error);

impl ServerError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<StoreError>() {
            Some(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::NOT_FOUND {
            tracing::info!("{:#}", self.0);
            self.0.to_string()
        } else {
            tracing::error!("{:?}", self.0);
            "Something went wrong".to_string()
        };
        let page = Page {
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            children: Box::new(ErrorPage { status, message }),
        };
        (status, page.render()).into_response()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>`
// to turn them into `Result<_, AppError>`. That way you don't need to do that
// manually.
impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

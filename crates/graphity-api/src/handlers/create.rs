use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Response;
use graphity_core::AppError;

use crate::responder::HttpResponder;
use crate::state::AppState;
use crate::utils::multipart::extract_form_items;

/// `POST /create`: decode the multipart form, run the create pipeline and
/// answer once the responder has been completed.
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let (responder, pending) = HttpResponder::new();

    let form = match multipart {
        Ok(multipart) => {
            extract_form_items(
                multipart,
                &state.upload.temp_dir,
                state.upload.max_size_bytes,
            )
            .await
        }
        Err(rejection) => {
            tracing::debug!(rejection = %rejection, "Create request is not multipart");
            Err(AppError::MalformedUpload(
                "create requests need to use multipart forms!".to_string(),
            ))
        }
    };

    state.pipeline.handle(form, Box::new(responder)).await;

    pending.wait(state.upload.response_timeout).await
}

//! Response emission.
//!
//! The pipeline has already chosen status, content type and body; this only
//! writes them out through axum.

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::pipeline::PipelineResponse;

impl IntoResponse for PipelineResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

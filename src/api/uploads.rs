//! Multipart image uploads shared by the banner, section image and logo endpoints.

use axum::extract::Multipart;
use serde::Serialize;
use tracing::warn;

use super::error::ApiError;

/// Name of the form field carrying the file
pub const FILE_FIELD: &str = "file";

/// A file read from a multipart form
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Public path the file is served from
    pub path: String,
}

/// Read the first `file` field of a multipart form
pub async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedFile, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read multipart form");
                return Err(ApiError::bad_request("Malformed multipart form"));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::validation_field(FILE_FIELD, "File name is missing"))?;

        let data = field.bytes().await.map_err(|e| {
            warn!(error = %e, "Failed to read upload data");
            ApiError::bad_request("Failed to read file data")
        })?;

        return Ok(UploadedFile {
            filename,
            data: data.to_vec(),
        });
    }

    Err(ApiError::validation_field(FILE_FIELD, "No file provided"))
}

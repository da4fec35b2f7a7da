use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    routing::post,
};
use tokio::task::spawn_blocking;

use crate::{
    config::Config,
    error::UploadError,
    state::{AppState, DbPool},
    store::SqliteStore,
    tournaments::rounds::import::upload::{
        UploadOutcome, UploadRequest, upload_round,
    },
    util_resp::{FailureResponse, StandardResponse, bad_request},
};

pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/api/rounds/upload", post(upload_round_handler))
}

/// Accepts a multipart form with a `file` field holding the spreadsheet and
/// an optional `round` field overriding the round number.
#[tracing::instrument(skip_all)]
pub async fn upload_round_handler(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> StandardResponse<UploadOutcome> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut round_override = None;

    while let Some(field) =
        multipart.next_field().await.map_err(multipart_failure)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_failure)?;
                file = Some((filename, bytes.to_vec()));
            }
            "round" => {
                let text = field.text().await.map_err(multipart_failure)?;
                let text = text.trim();
                if !text.is_empty() {
                    match text.parse::<u32>() {
                        Ok(n) if n > 0 => round_override = Some(n),
                        _ => {
                            return bad_request(format!(
                                "invalid round number: {text}"
                            ));
                        }
                    }
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unexpected form field");
            }
        }
    }

    let Some((filename, bytes)) = file.filter(|(_, bytes)| !bytes.is_empty())
    else {
        return Err(UploadError::MissingFile.into());
    };

    if bytes.len() > config.max_upload_bytes {
        return Err(UploadError::FileTooLarge {
            size: bytes.len(),
            limit: config.max_upload_bytes,
        }
        .into());
    }

    let request = UploadRequest {
        filename,
        bytes,
        round_override,
    };

    let outcome = spawn_blocking(move || {
        let mut store = SqliteStore::new(pool.get()?);
        upload_round(&mut store, &request)
    })
    .await
    .map_err(|e| FailureResponse::ServerError(e.to_string()))??;

    Ok(Json(outcome))
}

fn multipart_failure(e: MultipartError) -> FailureResponse {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FailureResponse::PayloadTooLarge(e.body_text())
    } else {
        FailureResponse::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use serde_json::Value;

    use crate::config::{Config, create_app};
    use crate::state::test_pool;
    use crate::tournaments::rounds::import::upload::UploadOutcome;
    use crate::tournaments::rounds::import::upload::tests::round_csv;

    fn server(config: Config) -> TestServer {
        TestServer::new(create_app(test_pool(), config)).unwrap()
    }

    fn csv_part(filename: &str, csv: String) -> Part {
        Part::bytes(csv.into_bytes())
            .file_name(filename)
            .mime_type("text/csv")
    }

    #[tokio::test]
    async fn test_upload_then_duplicate() {
        let server = server(Config::default());
        let csv = round_csv(3, &[("Knights", "Rooks", "4 - 4")]);

        let response = server
            .post("/api/rounds/upload")
            .multipart(
                MultipartForm::new().add_part("file", csv_part("league.csv", csv.clone())),
            )
            .await;
        response.assert_status_ok();
        let outcome = response.json::<UploadOutcome>();
        assert_eq!(outcome.round_number, 3);
        assert_eq!(outcome.boards_inserted, 8);

        let response = server
            .post("/api/rounds/upload")
            .multipart(
                MultipartForm::new().add_part("file", csv_part("league.csv", csv)),
            )
            .expect_failure()
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body = response.json::<Value>();
        assert_eq!(
            body["error"],
            "round 3 has already been uploaded for this tournament"
        );
    }

    #[tokio::test]
    async fn test_round_field_overrides_sheet() {
        let server = server(Config::default());
        let csv = round_csv(3, &[("Knights", "Rooks", "4 - 4")]);

        let response = server
            .post("/api/rounds/upload")
            .multipart(
                MultipartForm::new()
                    .add_part("file", csv_part("league.csv", csv))
                    .add_text("round", "7"),
            )
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<UploadOutcome>().round_number, 7);
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let server = server(Config::default());

        let response = server
            .post("/api/rounds/upload")
            .multipart(MultipartForm::new().add_text("round", "2"))
            .expect_failure()
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "no file was uploaded");

        let response = server
            .post("/api/rounds/upload")
            .multipart(
                MultipartForm::new()
                    .add_part("file", csv_part("league.csv", "x".to_string()))
                    .add_text("round", "two"),
            )
            .expect_failure()
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/rounds/upload")
            .multipart(MultipartForm::new().add_part(
                "file",
                csv_part("league.csv", "Spring League\n".to_string()),
            ))
            .expect_failure()
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "could not determine round number"
        );
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected() {
        let server = server(Config {
            max_upload_bytes: 16,
            ..Config::default()
        });
        let csv = round_csv(1, &[("Knights", "Rooks", "4 - 4")]);

        let response = server
            .post("/api/rounds/upload")
            .multipart(
                MultipartForm::new().add_part("file", csv_part("league.csv", csv)),
            )
            .expect_failure()
            .await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}

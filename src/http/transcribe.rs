// src/http/transcribe.rs
//! `POST /transcribe`: multipart audio forwarded to a speech-to-text API

use std::io::Write;
use std::time::Duration;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use super::AppState;
use crate::config::ServerConfig;

/// One uploaded audio file
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("transcription API key is not configured")]
    MissingApiKey,

    #[error("transcription service answered {status}")]
    Downstream {
        status: u16,
        content_type: String,
        body: String,
    },

    #[error("transcription request failed: {0}")]
    Transport(String),

    #[error("unexpected transcription response: {0}")]
    Decode(String),
}

/// Turns audio into text; blocking, called off the async runtime
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, upload: AudioUpload) -> Result<String, TranscribeError>;
}

/// OpenAI-compatible `audio/transcriptions` client
pub struct WhisperTranscriber {
    agent: ureq::Agent,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionReply {
    text: String,
}

impl WhisperTranscriber {
    pub fn from_config(config: &ServerConfig) -> Self {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            agent,
            url: config.transcription_url.clone(),
            model: config.transcription_model.clone(),
            api_key: config.transcription_api_key.clone(),
        }
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, upload: AudioUpload) -> Result<String, TranscribeError> {
        let api_key = self.api_key.as_deref().ok_or(TranscribeError::MissingApiKey)?;
        let boundary = multipart_boundary();
        let body = encode_multipart(&boundary, &[("model", self.model.as_str())], &upload);

        let response = self
            .agent
            .post(&self.url)
            .set("authorization", &format!("Bearer {api_key}"))
            .set(
                "content-type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body);

        match response {
            Ok(resp) => {
                let text = resp
                    .into_string()
                    .map_err(|e| TranscribeError::Decode(e.to_string()))?;
                let reply: TranscriptionReply = serde_json::from_str(&text)
                    .map_err(|e| TranscribeError::Decode(e.to_string()))?;
                Ok(reply.text)
            }
            Err(ureq::Error::Status(status, resp)) => {
                let content_type = resp.content_type().to_string();
                let body = resp.into_string().unwrap_or_default();
                Err(TranscribeError::Downstream {
                    status,
                    content_type,
                    body,
                })
            }
            Err(ureq::Error::Transport(err)) => Err(TranscribeError::Transport(err.to_string())),
        }
    }
}

fn multipart_boundary() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("----journal-vault-{suffix}")
}

/// Build a `multipart/form-data` body: text fields first, then the file
pub fn encode_multipart(boundary: &str, fields: &[(&str, &str)], upload: &AudioUpload) -> Vec<u8> {
    let mut body = Vec::with_capacity(upload.bytes.len() + 512);
    // writes into a Vec cannot fail
    for (name, value) in fields {
        let _ = write!(
            body,
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        );
    }
    let _ = write!(
        body,
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        upload.file_name.replace('"', "'"),
        upload.content_type
    );
    body.extend_from_slice(&upload.bytes);
    let _ = write!(body, "\r\n--{boundary}--\r\n");
    body
}

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, content-type"),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

/// First `file` field of the form, if any
///
/// A body that breaks off or runs past the upload limit is an error, not a
/// missing file.
async fn read_upload(mut multipart: Multipart) -> Result<Option<AudioUpload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("audio").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;
        return Ok(Some(AudioUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

fn upload_error_response(err: MultipartError) -> Response {
    let status = match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(error = %err, %status, "could not read upload");
    error_response(status, err.body_text())
}

pub async fn transcribe(
    State(state): State<AppState>,
    method: Method,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    if method == Method::OPTIONS {
        return with_cors(StatusCode::NO_CONTENT.into_response());
    }
    if method != Method::POST {
        return with_cors(error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed",
        ));
    }

    let upload = match multipart {
        Ok(multipart) => match read_upload(multipart).await {
            Ok(upload) => upload,
            Err(err) => return with_cors(upload_error_response(err)),
        },
        Err(rejection) => {
            warn!(error = %rejection, "transcription request is not multipart");
            None
        }
    };
    let Some(upload) = upload else {
        return with_cors(error_response(StatusCode::BAD_REQUEST, "no file uploaded"));
    };

    let size = upload.bytes.len();
    let transcriber = state.transcriber.clone();
    let outcome = tokio::task::spawn_blocking(move || transcriber.transcribe(upload)).await;

    let response = match outcome {
        Ok(Ok(text)) => {
            info!(bytes = size, chars = text.chars().count(), "transcribed upload");
            (StatusCode::OK, Json(json!({ "text": text }))).into_response()
        }
        Ok(Err(TranscribeError::Downstream {
            status,
            content_type,
            body,
        })) => {
            warn!(status, "transcription service rejected upload");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = HeaderValue::from_str(&content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("text/plain"));
            (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Ok(Err(err)) => {
            warn!(error = %err, "transcription failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err),
    };
    with_cors(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_carries_fields_and_file() {
        let upload = AudioUpload {
            file_name: "note.m4a".into(),
            content_type: "audio/mp4".into(),
            bytes: b"RIFF".to_vec(),
        };
        let body = encode_multipart("XYZ", &[("model", "whisper-1")], &upload);
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("name=\"model\"\r\n\r\nwhisper-1\r\n"));
        assert!(text.contains("filename=\"note.m4a\"\r\nContent-Type: audio/mp4\r\n\r\nRIFF\r\n"));
        assert!(text.ends_with("--XYZ--\r\n"));
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let transcriber = WhisperTranscriber::from_config(&ServerConfig {
            transcription_url: "http://127.0.0.1:9/never".into(),
            transcription_api_key: None,
            ..ServerConfig::default()
        });
        let upload = AudioUpload {
            file_name: "a.wav".into(),
            content_type: "audio/wav".into(),
            bytes: vec![0; 4],
        };
        assert!(matches!(
            transcriber.transcribe(upload),
            Err(TranscribeError::MissingApiKey)
        ));
    }
}

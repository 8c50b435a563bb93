//! Remote inspection API client.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::models::{Document, InspectionId, InspectionStatus};
use crate::util::{error_snippet, http_base_url, non_empty};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Calls the sync engine makes against the remote authority.
#[allow(async_fn_in_trait)]
pub trait RemoteClient {
    /// Replace the remote report payload of an inspection.
    async fn update_inspection_report_data(
        &self,
        inspection_id: InspectionId,
        report_data: &Document,
    ) -> RemoteResult<()>;

    /// Create a recording on the remote from inline audio content.
    async fn upload_recording(
        &self,
        inspection_id: InspectionId,
        upload: &RecordingUpload,
    ) -> RemoteResult<()>;

    async fn get_inspection(&self, inspection_id: InspectionId) -> RemoteResult<RemoteInspection>;

    async fn update_inspection_status(
        &self,
        inspection_id: InspectionId,
        status: InspectionStatus,
    ) -> RemoteResult<()>;
}

/// Body of a recording upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingUpload {
    pub item_key: String,
    pub label: String,
    pub duration: i64,
    /// Base64-encoded audio bytes
    #[serde(rename = "audio_data")]
    pub audio_base64: String,
    pub mime_type: String,
}

/// Inspection record as returned by the remote.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteInspection {
    #[serde(default)]
    pub typist_id: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl RemoteInspection {
    /// Whether a typist has been assigned to write up the report.
    ///
    /// Ids of `0`, `""` and `false` count as unassigned.
    pub fn typist_assigned(&self) -> bool {
        match &self.typist_id {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(assigned)) => *assigned,
            Some(serde_json::Value::Number(id)) => id.as_i64() != Some(0),
            Some(serde_json::Value::String(id)) => !id.is_empty(),
            Some(_) => true,
        }
    }
}

/// `RemoteClient` over the inspection REST API.
#[derive(Clone)]
pub struct HttpRemoteClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpRemoteClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            token: non_empty(token),
            client,
        })
    }

    /// Build a client from environment-derived settings.
    pub fn from_config(config: &ClientConfig) -> RemoteResult<Self> {
        let base_url = config.api_url.clone().ok_or_else(|| {
            RemoteError::InvalidConfiguration(
                "FIELDSYNC_API_URL is required to reach the remote".to_string(),
            )
        })?;
        Self::new(base_url, config.api_token.clone(), config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn inspection_url(&self, inspection_id: InspectionId) -> String {
        format!("{}/api/inspections/{inspection_id}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.header("Accept", "application/json").send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api(parse_api_error(status, &body)));
        }
        Ok(response)
    }
}

impl RemoteClient for HttpRemoteClient {
    async fn update_inspection_report_data(
        &self,
        inspection_id: InspectionId,
        report_data: &Document,
    ) -> RemoteResult<()> {
        // The API stores report data as JSON text
        let encoded = serde_json::to_string(report_data)
            .map_err(|error| RemoteError::InvalidPayload(error.to_string()))?;
        self.send(
            self.client
                .put(self.inspection_url(inspection_id))
                .json(&serde_json::json!({ "report_data": encoded })),
        )
        .await?;
        Ok(())
    }

    async fn upload_recording(
        &self,
        inspection_id: InspectionId,
        upload: &RecordingUpload,
    ) -> RemoteResult<()> {
        self.send(
            self.client
                .post(format!("{}/recordings", self.inspection_url(inspection_id)))
                .json(upload),
        )
        .await?;
        Ok(())
    }

    async fn get_inspection(&self, inspection_id: InspectionId) -> RemoteResult<RemoteInspection> {
        let response = self
            .send(self.client.get(self.inspection_url(inspection_id)))
            .await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| {
            RemoteError::InvalidPayload(format!("inspection {inspection_id}: {error}"))
        })
    }

    async fn update_inspection_status(
        &self,
        inspection_id: InspectionId,
        status: InspectionStatus,
    ) -> RemoteResult<()> {
        self.send(
            self.client
                .put(self.inspection_url(inspection_id))
                .json(&serde_json::json!({ "status": status })),
        )
        .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = error_snippet(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    if raw.trim().is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "API base URL must not be empty".to_string(),
        ));
    }
    http_base_url(&raw).ok_or_else(|| {
        RemoteError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("inspections.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/ ".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn parse_api_error_prefers_structured_message() {
        assert_eq!(
            parse_api_error(StatusCode::NOT_FOUND, r#"{"error": "Inspection not found"}"#),
            "Inspection not found (404)"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "  upstream down  "),
            "upstream down (502)"
        );
        assert_eq!(
            parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "HTTP 500"
        );
    }

    #[test]
    fn typist_assignment_follows_id_truthiness() {
        let parse = |value: serde_json::Value| -> RemoteInspection {
            serde_json::from_value(value).unwrap()
        };

        assert!(parse(json!({ "id": 1, "typist_id": 14 })).typist_assigned());
        assert!(parse(json!({ "typist_id": "t-9" })).typist_assigned());
        assert!(!parse(json!({ "id": 1 })).typist_assigned());
        assert!(!parse(json!({ "typist_id": null })).typist_assigned());
        assert!(!parse(json!({ "typist_id": 0 })).typist_assigned());
        assert!(!parse(json!({ "typist_id": "" })).typist_assigned());
    }

    #[test]
    fn remote_inspection_keeps_unknown_fields() {
        let inspection: RemoteInspection = serde_json::from_value(json!({
            "id": 3,
            "status": "active",
            "address": "1 High St"
        }))
        .unwrap();

        assert_eq!(inspection.status.as_deref(), Some("active"));
        assert_eq!(inspection.fields.get("address"), Some(&json!("1 High St")));
    }

    #[test]
    fn recording_upload_uses_api_field_names() {
        let upload = RecordingUpload {
            item_key: "hall.floor".to_string(),
            label: "Floor".to_string(),
            duration: 7,
            audio_base64: "AAEC".to_string(),
            mime_type: "audio/webm".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&upload).unwrap(),
            json!({
                "item_key": "hall.floor",
                "label": "Floor",
                "duration": 7,
                "audio_data": "AAEC",
                "mime_type": "audio/webm"
            })
        );
    }

    #[test]
    fn debug_redacts_token() {
        let client = HttpRemoteClient::new(
            "https://api.example.com",
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn from_config_requires_api_url() {
        let error = HttpRemoteClient::from_config(&ClientConfig::default()).unwrap_err();
        assert!(matches!(error, RemoteError::InvalidConfiguration(_)));
    }
}

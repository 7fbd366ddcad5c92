use crate::domain::model::OutputBuffer;
use crate::domain::ports::Uploader;
use crate::utils::error::{ConvertError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

pub const IMPORTS_PATH: &str = "/api/imports";

/// Sends canonical CSV output to the product import endpoint as a multipart
/// upload, which starts an import job on the server.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), IMPORTS_PATH)
    }
}

impl Uploader for HttpUploader {
    /// Returns the import job id when the server reports one, otherwise the
    /// raw response body.
    async fn upload(&self, filename: &str, output: &OutputBuffer) -> Result<String> {
        let url = self.url();
        tracing::debug!("Uploading {} ({} bytes) to {}", filename, output.byte_len(), url);

        let part = Part::bytes(output.to_bytes())
            .file_name(filename.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("Upload response status: {}", status);

        if !status.is_success() {
            return Err(ConvertError::UploadRejected {
                status: status.as_u16(),
                body,
            });
        }

        let job_id = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| {
                json.pointer("/data/id")
                    .or_else(|| json.get("id"))
                    .map(|id| match id {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
            });

        Ok(job_id.unwrap_or(body))
    }
}

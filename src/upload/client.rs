use crate::error::SummarizeError;
use crate::upload::types::{FileSource, SelectedFile, SubmitResponse, TaskStatusResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

const SUMMARIZE_PATH: &str = "api/v1/summarize";
const TASK_STATUS_PATH: &str = "api/v1/task-status/";

/// HTTP client for the summarization API.
#[derive(Clone)]
pub struct SummarizerClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SummarizerClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, SummarizeError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a server-supplied URL, which may be relative to the API host.
    pub fn resolve(&self, raw: &str) -> Result<Url, SummarizeError> {
        Ok(self.base_url.join(raw)?)
    }

    /// Uploads the video and returns the task id assigned by the server.
    pub async fn submit(
        &self,
        file: &SelectedFile,
        target_duration_secs: u32,
    ) -> Result<String, SummarizeError> {
        let part = file_part(file).await?;
        let form = Form::new()
            .part("file", part)
            .text("target_duration", target_duration_secs.to_string());

        let url = self.base_url.join(SUMMARIZE_PATH)?;
        tracing::info!(file = %file.name, target_duration_secs, %url, "submitting video");

        let response = self.http.post(url).multipart(form).send().await?;
        let body: SubmitResponse = decode_json(check_status(response)?).await?;

        body.task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(SummarizeError::missing_task_id)
    }

    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, SummarizeError> {
        let mut url = self.base_url.join(TASK_STATUS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| SummarizeError::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .push(task_id);

        let response = self.http.get(url).send().await?;
        let status: TaskStatusResponse = decode_json(check_status(response)?).await?;
        tracing::debug!(task_id, status = ?status.status, step = ?status.current_step, "task status");
        Ok(status)
    }

    /// Streams the result video into `dest`, returning the number of bytes written.
    /// A download that fails partway leaves nothing behind at `dest`.
    pub async fn download(&self, result_url: &str, dest: &Path) -> Result<u64, SummarizeError> {
        let url = self.resolve(result_url)?;
        tracing::info!(%url, dest = %dest.display(), "downloading summary");

        let response = check_status(self.http.get(url).send().await?)?;
        let file = tokio::fs::File::create(dest).await?;
        match write_body(response, file).await {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(dest).await {
                    tracing::warn!(dest = %dest.display(), "could not remove partial download: {cleanup}");
                }
                Err(e)
            }
        }
    }
}

async fn write_body(mut response: Response, mut file: tokio::fs::File) -> Result<u64, SummarizeError> {
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Files on disk are streamed into the form rather than read up front.
async fn file_part(file: &SelectedFile) -> Result<Part, SummarizeError> {
    let part = match &file.source {
        FileSource::Path(path) => {
            let handle = tokio::fs::File::open(path).await?;
            let len = handle.metadata().await?.len();
            Part::stream_with_length(Body::from(handle), len)
        }
        FileSource::Bytes(bytes) => Part::bytes(bytes.to_vec()),
    };
    Ok(part.file_name(file.name.clone()).mime_str(&file.mime_type)?)
}

/// Undecodable 2xx bodies surface as `Protocol` errors.
async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, SummarizeError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SummarizeError::Protocol(format!("Malformed response from server: {e}")))
}

fn check_status(response: Response) -> Result<Response, SummarizeError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::warn!(status = status.as_u16(), url = %response.url(), "request failed");
        Err(SummarizeError::Server {
            status: status.as_u16(),
        })
    }
}

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Where the bytes of a selected video live.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub size: Option<u64>,
    pub source: FileSource,
}

impl SelectedFile {
    /// Builds a candidate from a path on disk. The MIME type is guessed from
    /// the extension, the same way a browser labels a dropped file.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let size = std::fs::metadata(path).ok().map(|m| m.len());

        Self {
            mime_type: guess_mime(&name),
            name,
            size,
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    pub fn from_bytes(name: &str, bytes: Arc<[u8]>) -> Self {
        Self {
            name: name.to_string(),
            mime_type: guess_mime(name),
            size: Some(bytes.len() as u64),
            source: FileSource::Bytes(bytes),
        }
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[default]
    Unknown,
}

impl ProcessingStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "PENDING" => ProcessingStatus::Pending,
            "PROCESSING" => ProcessingStatus::Processing,
            "COMPLETED" => ProcessingStatus::Completed,
            "FAILED" => ProcessingStatus::Failed,
            _ => ProcessingStatus::Unknown,
        }
    }
}

/// Anything other than one of the four status strings, including a missing
/// or `null` field, reads as `Unknown` so polling carries on.
fn status_or_unknown<'de, D>(deserializer: D) -> Result<ProcessingStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map(ProcessingStatus::from_wire)
        .unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: ProcessingStatus,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result_url: Option<String>,
}

/// Server-side phases reported while a task is `PROCESSING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStep {
    ExtractingAudio,
    Transcribing,
    Segmenting,
    Scoring,
    GeneratingSummary,
}

impl ProcessingStep {
    /// Progress shown for a step nobody told us about.
    pub const UNKNOWN_PROGRESS: u8 = 30;

    pub fn progress(self) -> u8 {
        match self {
            ProcessingStep::ExtractingAudio => 20,
            ProcessingStep::Transcribing => 40,
            ProcessingStep::Segmenting => 60,
            ProcessingStep::Scoring => 80,
            ProcessingStep::GeneratingSummary => 90,
        }
    }

    pub fn progress_for(step: &str) -> u8 {
        step.parse::<ProcessingStep>()
            .map(ProcessingStep::progress)
            .unwrap_or(Self::UNKNOWN_PROGRESS)
    }
}

impl FromStr for ProcessingStep {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extracting_audio" => Ok(ProcessingStep::ExtractingAudio),
            "transcribing" => Ok(ProcessingStep::Transcribing),
            "segmenting" => Ok(ProcessingStep::Segmenting),
            "scoring" => Ok(ProcessingStep::Scoring),
            "generating_summary" => Ok(ProcessingStep::GeneratingSummary),
            _ => Err(()),
        }
    }
}

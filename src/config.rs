use crate::error::SummarizeError;
use clap::Parser;
use derivative::Derivative;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "summarizer.toml";

/// Largest slider bound whose value in seconds still fits the upload field.
pub const MAX_DURATION_MINUTES: u32 = u32::MAX / 60;

#[derive(Debug, Parser)]
#[command(name = "video_summarizer", about = "Desktop client for the video summarization API")]
pub struct Args {
    /// Base URL of the summarization API
    #[arg(long)]
    pub api_url: Option<String>,

    /// Path to a TOML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Bounds of the summary length slider, in minutes.
#[derive(Debug, Clone, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct DurationSettings {
    #[derivative(Default(value = "1"))]
    pub min_minutes: u32,
    #[derivative(Default(value = "30"))]
    pub max_minutes: u32,
    #[derivative(Default(value = "5"))]
    pub default_minutes: u32,
}

#[derive(Debug, Clone, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Settings {
    #[derivative(Default(value = "\"http://127.0.0.1:8000\".to_string()"))]
    pub api_base_url: String,
    #[derivative(Default(value = "2000"))]
    pub poll_interval_ms: u64,
    #[derivative(Default(value = "1000"))]
    pub result_delay_ms: u64,
    #[derivative(Default(value = "1000"))]
    pub error_delay_ms: u64,
    pub request_timeout_secs: Option<u64>,
    pub duration: DurationSettings,
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn result_delay(&self) -> Duration {
        Duration::from_millis(self.result_delay_ms)
    }

    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), SummarizeError> {
        url::Url::parse(&self.api_base_url)?;

        if self.poll_interval_ms == 0 {
            return Err(SummarizeError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        let d = &self.duration;
        if d.min_minutes == 0 || d.min_minutes > d.max_minutes {
            return Err(SummarizeError::Config(format!(
                "duration range {}..={} is empty",
                d.min_minutes, d.max_minutes
            )));
        }
        if d.max_minutes > MAX_DURATION_MINUTES {
            return Err(SummarizeError::Config(format!(
                "max_minutes {} exceeds {MAX_DURATION_MINUTES}",
                d.max_minutes
            )));
        }
        if !(d.min_minutes..=d.max_minutes).contains(&d.default_minutes) {
            return Err(SummarizeError::Config(format!(
                "default duration {} is outside {}..={}",
                d.default_minutes, d.min_minutes, d.max_minutes
            )));
        }

        Ok(())
    }
}

/// Defaults, then the TOML file, then environment, then command line flags.
pub fn load_settings(args: &Args) -> Result<Settings, SummarizeError> {
    let (path, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let mut settings = read_file(&path, required)?.unwrap_or_default();
    apply_env(&mut settings, |key| std::env::var(key).ok())?;

    if let Some(api_url) = &args.api_url {
        settings.api_base_url = api_url.clone();
    }

    settings.validate()?;
    Ok(settings)
}

fn read_file(path: &Path, required: bool) -> Result<Option<Settings>, SummarizeError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SummarizeError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            )))
        }
    };

    tracing::info!(path = %path.display(), "loading settings file");
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| SummarizeError::Config(format!("{}: {e}", path.display())))
}

fn apply_env(
    settings: &mut Settings,
    var: impl Fn(&str) -> Option<String>,
) -> Result<(), SummarizeError> {
    if let Some(v) = var("SUMMARIZER_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("SUMMARIZER_POLL_INTERVAL_MS") {
        settings.poll_interval_ms = v.parse().map_err(|_| {
            SummarizeError::Config(format!("SUMMARIZER_POLL_INTERVAL_MS is not a number: {v}"))
        })?;
    }
    Ok(())
}

use super::state::{Phase, Progress};
use crate::config::Settings;
use crate::error::SummarizeError;
use crate::upload::{ProcessingStatus, ProcessingStep, SelectedFile, TaskStatusResponse};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// Work the controller asks the worker to carry out.
#[derive(Debug)]
pub enum Command {
    Submit {
        generation: u64,
        file: SelectedFile,
        target_duration_secs: u32,
    },
    StartPolling {
        generation: u64,
        task_id: String,
    },
    StopPolling,
    CancelSubmit,
    /// Feed `event` back to the controller once `after` has elapsed.
    Schedule {
        after: Duration,
        event: Event,
    },
    Download {
        generation: u64,
        result_url: String,
        dest: PathBuf,
    },
}

/// Results coming back from the worker. `generation` ties each one to the
/// submit it belongs to.
#[derive(Debug)]
pub enum Event {
    Submitted {
        generation: u64,
        result: Result<String, SummarizeError>,
    },
    StatusChecked {
        generation: u64,
        result: Result<TaskStatusResponse, SummarizeError>,
    },
    RevealResult {
        generation: u64,
    },
    ShowError {
        generation: u64,
    },
    Downloaded {
        generation: u64,
        dest: PathBuf,
        result: Result<u64, SummarizeError>,
    },
}

impl Event {
    fn generation(&self) -> u64 {
        match self {
            Event::Submitted { generation, .. }
            | Event::StatusChecked { generation, .. }
            | Event::RevealResult { generation }
            | Event::ShowError { generation }
            | Event::Downloaded { generation, .. } => *generation,
        }
    }
}

/// A message the user has to acknowledge before going on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    InvalidFile,
    Error(String),
}

impl Prompt {
    pub fn text(&self) -> String {
        match self {
            Prompt::InvalidFile => SummarizeError::Validation.to_string(),
            Prompt::Error(error) => format!("An error occurred: {error}"),
        }
    }
}

pub struct UploadController {
    phase: Phase,
    progress: Progress,
    duration_minutes: u32,
    duration_range: RangeInclusive<u32>,
    generation: u64,
    prompt: Option<Prompt>,
    download_note: Option<String>,
    result_delay: Duration,
    error_delay: Duration,
}

impl UploadController {
    pub fn new(settings: &Settings) -> Self {
        let d = &settings.duration;
        Self {
            phase: Phase::Idle,
            progress: Progress::default(),
            duration_minutes: d.default_minutes,
            duration_range: d.min_minutes..=d.max_minutes,
            generation: 0,
            prompt: None,
            download_note: None,
            result_delay: settings.result_delay(),
            error_delay: settings.error_delay(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.phase.file()
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.phase, Phase::FileSelected { .. })
    }

    pub fn accepts_files(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::FileSelected { .. })
    }

    pub fn shows_processing(&self) -> bool {
        match self.phase {
            Phase::Submitting { .. } | Phase::Polling { .. } | Phase::Failed { .. } => true,
            Phase::Completed { revealed, .. } => !revealed,
            Phase::Idle | Phase::FileSelected { .. } => false,
        }
    }

    /// The summary video, once it is ready to be shown.
    pub fn result_url(&self) -> Option<&str> {
        match &self.phase {
            Phase::Completed {
                result_url,
                revealed: true,
            } => Some(result_url),
            _ => None,
        }
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn download_note(&self) -> Option<&str> {
        self.download_note.as_deref()
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn duration_range(&self) -> RangeInclusive<u32> {
        self.duration_range.clone()
    }

    pub fn set_duration_minutes(&mut self, minutes: u32) {
        self.duration_minutes =
            minutes.clamp(*self.duration_range.start(), *self.duration_range.end());
    }

    pub fn target_duration_secs(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }

    /// Takes the first of the offered files if it is a video.
    pub fn select_files(&mut self, files: Vec<SelectedFile>) -> Result<(), SummarizeError> {
        if !self.accepts_files() {
            tracing::debug!(phase = self.phase.name(), "ignoring file selection");
            return Ok(());
        }
        let Some(file) = files.into_iter().next() else {
            return Ok(());
        };

        if !file.is_video() {
            tracing::warn!(file = %file.name, mime = %file.mime_type, "rejected non-video file");
            self.phase = Phase::Idle;
            self.prompt = Some(Prompt::InvalidFile);
            return Err(SummarizeError::Validation);
        }

        tracing::info!(file = %file.name, mime = %file.mime_type, size = ?file.size, "file selected");
        self.phase = Phase::FileSelected { file };
        Ok(())
    }

    pub fn remove_file(&mut self) {
        if let Phase::FileSelected { file } = &self.phase {
            tracing::info!(file = %file.name, "file removed");
            self.phase = Phase::Idle;
        }
    }

    pub fn submit(&mut self) -> Vec<Command> {
        let file = match std::mem::take(&mut self.phase) {
            Phase::FileSelected { file } => file,
            other => {
                self.phase = other;
                return Vec::new();
            }
        };

        self.generation += 1;
        self.progress = Progress::new(5, "Initializing...");
        self.phase = Phase::Submitting { file: file.clone() };
        tracing::info!(generation = self.generation, file = %file.name, "submitting");

        vec![Command::Submit {
            generation: self.generation,
            file,
            target_duration_secs: self.target_duration_secs(),
        }]
    }

    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        if event.generation() != self.generation {
            tracing::debug!(
                stale = event.generation(),
                current = self.generation,
                "dropping stale event"
            );
            return Vec::new();
        }

        match event {
            Event::Submitted { result, .. } => self.on_submitted(result),
            Event::StatusChecked { result, .. } => self.on_status(result),
            Event::RevealResult { .. } => {
                if let Phase::Completed { revealed, .. } = &mut self.phase {
                    *revealed = true;
                }
                Vec::new()
            }
            Event::ShowError { .. } => {
                if let Phase::Failed { error } = &self.phase {
                    self.prompt = Some(Prompt::Error(error.clone()));
                }
                Vec::new()
            }
            Event::Downloaded { dest, result, .. } => {
                self.download_note = Some(match result {
                    Ok(bytes) => format!(
                        "Saved {} to {}",
                        crate::utils::size::human_size(bytes),
                        dest.display()
                    ),
                    Err(e) => format!("Download failed: {e}"),
                });
                Vec::new()
            }
        }
    }

    pub fn request_download(&mut self, dest: PathBuf) -> Vec<Command> {
        let Some(result_url) = self.result_url().map(str::to_owned) else {
            return Vec::new();
        };
        self.download_note = Some("Downloading...".to_string());
        vec![Command::Download {
            generation: self.generation,
            result_url,
            dest,
        }]
    }

    /// Dismisses the pending prompt. An error prompt resets the controller.
    pub fn acknowledge_prompt(&mut self) -> Vec<Command> {
        match self.prompt.take() {
            Some(Prompt::Error(_)) => self.reset(),
            Some(Prompt::InvalidFile) | None => Vec::new(),
        }
    }

    pub fn reset(&mut self) -> Vec<Command> {
        tracing::info!(phase = self.phase.name(), "resetting");
        self.generation += 1;
        self.phase = Phase::Idle;
        self.progress = Progress::default();
        self.prompt = None;
        self.download_note = None;
        vec![Command::StopPolling, Command::CancelSubmit]
    }

    fn on_submitted(&mut self, result: Result<String, SummarizeError>) -> Vec<Command> {
        match (std::mem::take(&mut self.phase), result) {
            (Phase::Submitting { file }, Ok(task_id)) => {
                tracing::info!(%task_id, "task accepted");
                self.progress = Progress::new(10, "Processing started. Extracting audio...");
                self.phase = Phase::Polling {
                    file,
                    task_id: task_id.clone(),
                };
                vec![Command::StartPolling {
                    generation: self.generation,
                    task_id,
                }]
            }
            (Phase::Submitting { .. }, Err(e)) => self.fail(e),
            (other, _) => {
                self.phase = other;
                Vec::new()
            }
        }
    }

    fn on_status(&mut self, result: Result<TaskStatusResponse, SummarizeError>) -> Vec<Command> {
        if self.phase.task_id().is_none() {
            return Vec::new();
        }
        let status = match result {
            Ok(status) => status,
            Err(e) => return self.fail(e),
        };

        match status.status {
            ProcessingStatus::Pending => {
                self.progress = Progress::new(10, "Task pending in queue...");
                Vec::new()
            }
            ProcessingStatus::Processing => {
                let step = non_empty(status.current_step).unwrap_or_else(|| "processing".into());
                // Only the first underscore is replaced.
                let message = non_empty(status.message)
                    .unwrap_or_else(|| format!("Processing: {}...", step.replacen('_', " ", 1)));
                self.progress = Progress::new(ProcessingStep::progress_for(&step), message);
                Vec::new()
            }
            ProcessingStatus::Completed => match non_empty(status.result_url) {
                Some(result_url) => {
                    tracing::info!(%result_url, "task completed");
                    self.progress = Progress::new(100, "Processing complete!");
                    self.phase = Phase::Completed {
                        result_url,
                        revealed: false,
                    };
                    vec![
                        Command::StopPolling,
                        Command::Schedule {
                            after: self.result_delay,
                            event: Event::RevealResult {
                                generation: self.generation,
                            },
                        },
                    ]
                }
                None => self.fail(SummarizeError::missing_result_url()),
            },
            ProcessingStatus::Failed => {
                self.fail(SummarizeError::task_failed(non_empty(status.message)))
            }
            ProcessingStatus::Unknown => {
                self.progress = Progress::new(0, "Unknown status");
                Vec::new()
            }
        }
    }

    fn fail(&mut self, err: SummarizeError) -> Vec<Command> {
        let error = err.to_string();
        tracing::error!(generation = self.generation, phase = self.phase.name(), %error, "summarization failed");
        self.progress = Progress::new(0, format!("Error: {error}"));
        self.phase = Phase::Failed { error };
        vec![
            Command::StopPolling,
            Command::Schedule {
                after: self.error_delay,
                event: Event::ShowError {
                    generation: self.generation,
                },
            },
        ]
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn controller() -> UploadController {
        UploadController::new(&Settings::default())
    }

    fn video(name: &str) -> SelectedFile {
        SelectedFile::from_bytes(name, Arc::from(vec![1u8, 2, 3]))
    }

    fn status(json: &str) -> Event {
        status_for(1, json)
    }

    fn status_for(generation: u64, json: &str) -> Event {
        Event::StatusChecked {
            generation,
            result: Ok(serde_json::from_str(json).expect("status json")),
        }
    }

    /// Drives a fresh controller to `Polling` with task `t-1`.
    fn polling() -> UploadController {
        let mut c = controller();
        c.select_files(vec![video("standup.mp4")]).expect("select");
        c.submit();
        let cmds = c.handle(Event::Submitted {
            generation: 1,
            result: Ok("t-1".to_string()),
        });
        assert!(matches!(
            cmds.as_slice(),
            [Command::StartPolling { task_id, generation: 1 }] if task_id == "t-1"
        ));
        c
    }

    #[test]
    fn starts_idle_with_initial_progress() {
        let c = controller();
        assert!(matches!(c.phase(), Phase::Idle));
        assert_eq!(c.progress(), &Progress::new(0, "Initializing..."));
        assert!(!c.can_submit());
        assert!(!c.shows_processing());
        assert!(c.result_url().is_none());
    }

    #[test]
    fn non_video_files_are_rejected() {
        let mut c = controller();
        for name in ["slides.pdf", "notes.txt", "cover.png", "podcast.mp3", "Makefile"] {
            let err = c.select_files(vec![video(name)]).unwrap_err();
            assert!(matches!(err, SummarizeError::Validation));
            assert!(c.selected_file().is_none(), "{name} should not be selected");
            assert!(!c.can_submit());
            assert_eq!(c.prompt(), Some(&Prompt::InvalidFile));
            c.acknowledge_prompt();
        }
    }

    #[test]
    fn invalid_drop_clears_previous_selection() {
        let mut c = controller();
        c.select_files(vec![video("a.mp4")]).expect("select");
        assert!(c.select_files(vec![video("b.txt")]).is_err());
        assert!(c.selected_file().is_none());
        assert!(!c.can_submit());
    }

    #[test]
    fn only_the_first_file_is_taken() {
        let mut c = controller();
        c.select_files(vec![video("first.mov"), video("second.mp4")])
            .expect("select");
        assert_eq!(c.selected_file().map(|f| f.name.as_str()), Some("first.mov"));

        let mut c = controller();
        assert!(c.select_files(vec![video("doc.txt"), video("ok.mp4")]).is_err());
        assert!(c.selected_file().is_none());
    }

    #[test]
    fn submit_enabled_tracks_selection() {
        let mut c = controller();
        c.select_files(vec![video("clip.webm")]).expect("select");
        assert!(c.can_submit());
        assert!(c.selected_file().is_some());

        c.remove_file();
        assert!(!c.can_submit());
        assert!(c.selected_file().is_none());
    }

    #[test]
    fn submit_without_file_is_a_no_op() {
        let mut c = controller();
        assert!(c.submit().is_empty());
        assert!(matches!(c.phase(), Phase::Idle));
        assert_eq!(c.generation(), 0);
    }

    #[test]
    fn duration_is_sent_in_seconds() {
        for minutes in 1..=30 {
            let mut c = controller();
            c.set_duration_minutes(minutes);
            c.select_files(vec![video("talk.mp4")]).expect("select");
            let cmds = c.submit();
            match cmds.as_slice() {
                [Command::Submit {
                    target_duration_secs,
                    ..
                }] => assert_eq!(*target_duration_secs, minutes * 60),
                other => panic!("unexpected commands: {other:?}"),
            }
        }
    }

    #[test]
    fn duration_is_clamped_to_slider_range() {
        let mut c = controller();
        c.set_duration_minutes(0);
        assert_eq!(c.duration_minutes(), 1);
        c.set_duration_minutes(500);
        assert_eq!(c.duration_minutes(), 30);
    }

    #[test]
    fn submit_shows_initializing_and_disables_button() {
        let mut c = controller();
        c.select_files(vec![video("talk.mp4")]).expect("select");
        c.submit();
        assert_eq!(c.progress(), &Progress::new(5, "Initializing..."));
        assert!(!c.can_submit());
        assert!(c.shows_processing());
        assert!(!c.accepts_files());
    }

    #[test]
    fn accepted_task_starts_polling() {
        let c = polling();
        assert_eq!(c.phase().task_id(), Some("t-1"));
        assert_eq!(
            c.progress(),
            &Progress::new(10, "Processing started. Extracting audio...")
        );
    }

    #[test]
    fn scripted_poll_sequence_reaches_result() {
        let mut c = polling();
        let mut seen = Vec::new();

        for json in [
            r#"{"status":"PENDING"}"#,
            r#"{"status":"PROCESSING","current_step":"extracting_audio"}"#,
            r#"{"status":"PROCESSING","current_step":"transcribing"}"#,
        ] {
            assert!(c.handle(status(json)).is_empty());
            seen.push(c.progress().percent);
        }

        let cmds = c.handle(status(
            r#"{"status":"COMPLETED","result_url":"/static/summaries/t-1.mp4"}"#,
        ));
        seen.push(c.progress().percent);
        assert_eq!(seen, vec![10, 20, 40, 100]);
        assert_eq!(c.progress().message, "Processing complete!");

        assert!(matches!(cmds[0], Command::StopPolling));
        let reveal = match cmds.into_iter().nth(1) {
            Some(Command::Schedule { after, event }) => {
                assert_eq!(after, Duration::from_secs(1));
                event
            }
            other => panic!("expected scheduled reveal, got {other:?}"),
        };

        assert!(c.shows_processing());
        assert!(c.result_url().is_none());

        c.handle(reveal);
        assert!(!c.shows_processing());
        assert_eq!(c.result_url(), Some("/static/summaries/t-1.mp4"));
    }

    #[test]
    fn derived_step_message_replaces_first_underscore_only() {
        let mut c = polling();
        c.handle(status(
            r#"{"status":"PROCESSING","current_step":"generating_summary"}"#,
        ));
        assert_eq!(c.progress().message, "Processing: generating summary...");
        assert_eq!(c.progress().percent, 90);

        c.handle(status(
            r#"{"status":"PROCESSING","current_step":"fine_tuning_cuts"}"#,
        ));
        assert_eq!(c.progress().message, "Processing: fine tuning_cuts...");
        assert_eq!(c.progress().percent, 30);
    }

    #[test]
    fn server_message_wins_over_derived_one() {
        let mut c = polling();
        c.handle(status(
            r#"{"status":"PROCESSING","current_step":"scoring","message":"Scoring 12 segments"}"#,
        ));
        assert_eq!(c.progress(), &Progress::new(80, "Scoring 12 segments"));
    }

    #[test]
    fn processing_without_step_uses_default() {
        let mut c = polling();
        c.handle(status(r#"{"status":"PROCESSING"}"#));
        assert_eq!(c.progress(), &Progress::new(30, "Processing: processing..."));
    }

    #[test]
    fn unknown_status_keeps_polling() {
        let mut c = polling();
        let cmds = c.handle(status(r#"{"status":"PAUSED"}"#));
        assert!(cmds.is_empty());
        assert_eq!(c.progress(), &Progress::new(0, "Unknown status"));
        assert_eq!(c.phase().task_id(), Some("t-1"));
    }

    #[test]
    fn missing_or_null_status_keeps_polling() {
        for body in [r#"{"message":"x"}"#, r#"{"status":null}"#, r#"{"status":3}"#] {
            let mut c = polling();
            let cmds = c.handle(status(body));
            assert!(cmds.is_empty(), "{body}");
            assert_eq!(c.progress(), &Progress::new(0, "Unknown status"), "{body}");
            assert!(matches!(c.phase(), Phase::Polling { .. }), "{body}");
            assert!(c.prompt().is_none());
        }
    }

    #[test]
    fn failed_task_prompts_and_resets() {
        let mut c = polling();
        let cmds = c.handle(status(r#"{"status":"FAILED","message":"bad input"}"#));
        assert_eq!(c.progress().message, "Error: bad input");
        assert_eq!(c.progress().percent, 0);
        assert!(c.prompt().is_none());

        let show = match cmds.into_iter().find_map(|cmd| match cmd {
            Command::Schedule { event, .. } => Some(event),
            _ => None,
        }) {
            Some(event) => event,
            None => panic!("expected a scheduled error prompt"),
        };
        c.handle(show);

        let prompt = c.prompt().cloned().expect("prompt");
        assert!(prompt.text().contains("bad input"));

        let cmds = c.acknowledge_prompt();
        assert!(cmds.iter().any(|cmd| matches!(cmd, Command::StopPolling)));
        assert!(matches!(c.phase(), Phase::Idle));
        assert_eq!(c.progress(), &Progress::default());
        assert!(c.prompt().is_none());
        assert!(!c.shows_processing());
    }

    #[test]
    fn failed_without_message_uses_default_text() {
        let mut c = polling();
        c.handle(status(r#"{"status":"FAILED"}"#));
        assert_eq!(c.progress().message, "Error: Task failed");
    }

    #[test]
    fn http_errors_carry_status_code() {
        let mut c = controller();
        c.select_files(vec![video("talk.mp4")]).expect("select");
        c.submit();
        c.handle(Event::Submitted {
            generation: 1,
            result: Err(SummarizeError::Server { status: 502 }),
        });
        assert!(c.progress().message.contains("502"));

        let mut c = polling();
        c.handle(Event::StatusChecked {
            generation: 1,
            result: Err(SummarizeError::Server { status: 404 }),
        });
        assert!(c.progress().message.contains("404"));
        c.handle(Event::ShowError { generation: 1 });
        assert!(c.prompt().expect("prompt").text().contains("404"));
        c.acknowledge_prompt();
        assert!(matches!(c.phase(), Phase::Idle));
    }

    #[test]
    fn missing_task_id_is_a_protocol_error() {
        let mut c = controller();
        c.select_files(vec![video("talk.mp4")]).expect("select");
        c.submit();
        c.handle(Event::Submitted {
            generation: 1,
            result: Err(SummarizeError::missing_task_id()),
        });
        assert_eq!(
            c.progress().message,
            "Error: No task ID received from server"
        );
    }

    #[test]
    fn completed_without_result_url_fails() {
        let mut c = polling();
        c.handle(status(r#"{"status":"COMPLETED"}"#));
        assert!(matches!(c.phase(), Phase::Failed { .. }));
    }

    #[test]
    fn stale_events_are_ignored_after_reset() {
        let mut c = polling();
        c.reset();
        let cmds = c.handle(status_for(
            1,
            r#"{"status":"COMPLETED","result_url":"/late.mp4"}"#,
        ));
        assert!(cmds.is_empty());
        assert!(matches!(c.phase(), Phase::Idle));
        assert_eq!(c.progress(), &Progress::default());
    }

    #[test]
    fn late_submit_response_after_reset_is_dropped() {
        let mut c = controller();
        c.select_files(vec![video("talk.mp4")]).expect("select");
        c.submit();
        let cmds = c.reset();
        assert!(cmds.iter().any(|cmd| matches!(cmd, Command::CancelSubmit)));

        c.handle(Event::Submitted {
            generation: 1,
            result: Ok("t-9".to_string()),
        });
        assert!(c.phase().task_id().is_none());
    }

    #[test]
    fn status_outside_polling_is_a_no_op() {
        let mut c = controller();
        c.select_files(vec![video("talk.mp4")]).expect("select");
        let cmds = c.handle(status_for(0, r#"{"status":"FAILED"}"#));
        assert!(cmds.is_empty());
        assert!(c.can_submit());
    }

    #[test]
    fn new_summary_after_result_returns_to_idle() {
        let mut c = polling();
        c.handle(status(r#"{"status":"COMPLETED","result_url":"/r.mp4"}"#));
        c.handle(Event::RevealResult { generation: 1 });
        assert!(c.result_url().is_some());

        let cmds = c.request_download(PathBuf::from("/tmp/r.mp4"));
        assert!(matches!(
            cmds.as_slice(),
            [Command::Download { result_url, .. }] if result_url == "/r.mp4"
        ));

        c.reset();
        assert!(c.result_url().is_none());
        assert!(c.download_note().is_none());
        assert!(c.accepts_files());
    }

    #[test]
    fn selection_is_ignored_while_processing() {
        let mut c = polling();
        c.select_files(vec![video("other.mp4")]).expect("ignored");
        assert_eq!(
            c.selected_file().map(|f| f.name.as_str()),
            Some("standup.mp4")
        );
        assert_eq!(c.phase().task_id(), Some("t-1"));
    }
}

use crate::upload::SelectedFile;

/// Where the controller is in the select → submit → poll → result cycle.
#[derive(Debug, Clone, Default)]
pub enum Phase {
    #[default]
    Idle,
    FileSelected {
        file: SelectedFile,
    },
    Submitting {
        file: SelectedFile,
    },
    Polling {
        file: SelectedFile,
        task_id: String,
    },
    /// `revealed` flips once the completion delay has elapsed.
    Completed {
        result_url: String,
        revealed: bool,
    },
    /// Error text stays in the progress area until the prompt is shown.
    Failed {
        error: String,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::FileSelected { .. } => "file_selected",
            Phase::Submitting { .. } => "submitting",
            Phase::Polling { .. } => "polling",
            Phase::Completed { .. } => "completed",
            Phase::Failed { .. } => "failed",
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        match self {
            Phase::FileSelected { file }
            | Phase::Submitting { file }
            | Phase::Polling { file, .. } => Some(file),
            Phase::Idle | Phase::Completed { .. } | Phase::Failed { .. } => None,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Phase::Polling { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

/// Percentage and message shown in the processing area. Always set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub message: String,
}

impl Progress {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
        }
    }

    pub fn fraction(&self) -> f32 {
        f32::from(self.percent) / 100.0
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(0, "Initializing...")
    }
}

mod controller;
mod state;
mod ui;

use crate::config::Settings;
use crate::error::SummarizeError;
use crate::upload::{SelectedFile, SummarizerClient, Worker};
pub use controller::{Command, Event, Prompt, UploadController};
use eframe::{egui, App};
use rfd::{MessageButtons, MessageDialog, MessageLevel};
pub use state::{Phase, Progress};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub struct SummarizerApp {
    controller: UploadController,
    worker: Worker,
    events: UnboundedReceiver<Event>,
    drop_hover: bool,
}

impl SummarizerApp {
    pub fn new(settings: &Settings, runtime: Handle) -> Result<Self, SummarizeError> {
        tracing::info!(api = %settings.api_base_url, "initializing video summarizer");
        let client = SummarizerClient::new(&settings.api_base_url, settings.request_timeout())?;
        let (sender, events) = mpsc::unbounded_channel();

        Ok(Self {
            controller: UploadController::new(settings),
            worker: Worker::new(runtime, client, sender, settings.poll_interval()),
            events,
            drop_hover: false,
        })
    }

    fn run(&mut self, commands: Vec<Command>) {
        self.worker.execute_all(commands);
    }

    pub fn select(&mut self, files: Vec<SelectedFile>) {
        if let Err(e) = self.controller.select_files(files) {
            tracing::debug!("selection rejected: {e}");
        }
    }

    pub fn submit(&mut self) {
        let commands = self.controller.submit();
        self.run(commands);
    }

    pub fn reset(&mut self) {
        let commands = self.controller.reset();
        self.run(commands);
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        // Results arrive from the runtime without any input event, so keep ticking.
        ctx.request_repaint_after(Duration::from_millis(100));

        while let Ok(event) = self.events.try_recv() {
            let commands = self.controller.handle(event);
            self.run(commands);
        }

        let (hovering, dropped) = ctx.input(|i| {
            (
                !i.raw.hovered_files.is_empty(),
                i.raw.dropped_files.clone(),
            )
        });
        self.drop_hover = hovering && self.controller.accepts_files();

        if !dropped.is_empty() {
            let files = dropped
                .iter()
                .filter_map(|f| match (&f.path, &f.bytes) {
                    (Some(path), _) => Some(SelectedFile::from_path(path)),
                    (None, Some(bytes)) => Some(SelectedFile::from_bytes(&f.name, bytes.clone())),
                    (None, None) => None,
                })
                .collect();
            self.select(files);
        }
    }

    /// Shows the pending prompt as a native dialog. Blocks until dismissed.
    fn show_prompt(&mut self) {
        let Some(prompt) = self.controller.prompt().cloned() else {
            return;
        };
        let level = match prompt {
            Prompt::InvalidFile => MessageLevel::Warning,
            Prompt::Error(_) => MessageLevel::Error,
        };
        let text = prompt.text();

        let _ = MessageDialog::new()
            .set_level(level)
            .set_title("Video Summarizer")
            .set_description(&text)
            .set_buttons(MessageButtons::Ok)
            .show();

        let commands = self.controller.acknowledge_prompt();
        self.run(commands);
    }
}

impl App for SummarizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
        self.show_prompt();
    }
}

mod client;
mod types;
mod worker;

pub use client::SummarizerClient;
pub use types::{ProcessingStatus, ProcessingStep, SelectedFile, TaskStatusResponse};
pub use worker::Worker;

use crate::app::{Command, Event};
use crate::upload::SummarizerClient;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Holds at most one running task. Starting a new one aborts the previous.
#[derive(Default)]
pub struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub fn start<F>(&mut self, runtime: &Handle, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        self.handle = Some(runtime.spawn(task));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs controller commands on the tokio runtime and reports back over `events`.
pub struct Worker {
    runtime: Handle,
    client: SummarizerClient,
    events: UnboundedSender<Event>,
    poll_interval: Duration,
    poll_timer: TaskSlot,
    submit_task: TaskSlot,
}

impl Worker {
    pub fn new(
        runtime: Handle,
        client: SummarizerClient,
        events: UnboundedSender<Event>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            runtime,
            client,
            events,
            poll_interval,
            poll_timer: TaskSlot::default(),
            submit_task: TaskSlot::default(),
        }
    }

    pub fn client(&self) -> &SummarizerClient {
        &self.client
    }

    pub fn is_polling(&self) -> bool {
        self.poll_timer.is_active()
    }

    pub fn execute_all(&mut self, commands: Vec<Command>) {
        for command in commands {
            self.execute(command);
        }
    }

    pub fn execute(&mut self, command: Command) {
        match command {
            Command::Submit {
                generation,
                file,
                target_duration_secs,
            } => {
                let client = self.client.clone();
                let events = self.events.clone();
                self.submit_task.start(&self.runtime, async move {
                    let result = client.submit(&file, target_duration_secs).await;
                    let _ = events.send(Event::Submitted { generation, result });
                });
            }
            Command::StartPolling {
                generation,
                task_id,
            } => {
                tracing::debug!(%task_id, generation, "starting poll timer");
                let client = self.client.clone();
                let events = self.events.clone();
                let period = self.poll_interval;
                self.poll_timer.start(&self.runtime, async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    // The first tick completes immediately; the first check waits one period.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        let result = client.task_status(&task_id).await;
                        if events
                            .send(Event::StatusChecked { generation, result })
                            .is_err()
                        {
                            break;
                        }
                    }
                });
            }
            Command::StopPolling => {
                if self.poll_timer.is_active() {
                    tracing::debug!("stopping poll timer");
                }
                self.poll_timer.stop();
            }
            Command::CancelSubmit => self.submit_task.stop(),
            Command::Schedule { after, event } => {
                let events = self.events.clone();
                self.runtime.spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = events.send(event);
                });
            }
            Command::Download {
                generation,
                result_url,
                dest,
            } => {
                let client = self.client.clone();
                let events = self.events.clone();
                self.runtime.spawn(async move {
                    let result = client.download(&result_url, &dest).await;
                    let _ = events.send(Event::Downloaded {
                        generation,
                        dest,
                        result,
                    });
                });
            }
        }
    }
}

//! Fixed-interval background polls.
//!
//! Each [`PollSchedule`] gets its own task that submits a suppressed poll,
//! waits for it to finish whatever the outcome, sleeps for its period and
//! goes again. All loops share one stop signal.

use crate::error::RconError;
use crate::queue::CommandQueue;
use log::{debug, info};
use shared::ConsoleCommand;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub const LIST_PLAYERS_PERIOD: Duration = Duration::from_millis(5000);
pub const GET_CHAT_PERIOD: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    pub command: String,
    pub period: Duration,
}

impl PollSchedule {
    pub fn new(command: impl Into<String>, period: Duration) -> Self {
        Self {
            command: command.into(),
            period,
        }
    }

    pub fn list_players(period: Duration) -> Self {
        Self::new("listplayers", period)
    }

    pub fn get_chat(period: Duration) -> Self {
        Self::new("getchat", period)
    }
}

pub struct PeriodicScheduler {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PeriodicScheduler {
    pub fn start(queue: &CommandQueue, schedules: Vec<PollSchedule>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);

        let tasks = schedules
            .into_iter()
            .map(|schedule| {
                info!(
                    "Polling '{}' every {:?}",
                    schedule.command, schedule.period
                );
                tokio::spawn(poll_loop(schedule, queue.clone(), stop_rx.clone()))
            })
            .collect();

        Self { stop_tx, tasks }
    }

    pub fn is_running(&self) -> bool {
        !*self.stop_tx.borrow() && self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Signals every loop to stop and waits for them to exit. A poll that is
    /// already in flight is allowed to finish.
    pub async fn stop(mut self) {
        self.stop_tx.send_replace(true);
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

async fn poll_loop(schedule: PollSchedule, queue: CommandQueue, mut stop_rx: watch::Receiver<bool>) {
    while !*stop_rx.borrow() {
        match queue
            .submit(ConsoleCommand::auto_poll(schedule.command.as_str()))
            .await
        {
            Ok(_) => {}
            Err(RconError::Closed) => break,
            Err(e) => debug!("Poll '{}' failed: {}", schedule.command, e),
        }

        tokio::select! {
            _ = sleep(schedule.period) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Stopped polling '{}'", schedule.command);
}

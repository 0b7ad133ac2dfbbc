//! Serialized command execution.
//!
//! A single worker task owns the transport and executes queued commands one
//! at a time, in submission order. Each finished command is posted to the
//! output dispatcher before the submitter is answered, so observers see
//! results in the same order they were submitted.

use crate::dispatcher::DispatcherHandle;
use crate::error::RconError;
use crate::logging::{EventLog, LogStream};
use crate::retry::ReconnectingTransport;
use log::debug;
use shared::{split_response, ConnectionState, ConsoleCommand};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Reply = oneshot::Sender<Result<ConsoleCommand, RconError>>;

struct Job {
    command: ConsoleCommand,
    reply: Reply,
}

/// Submission side of the queue. Cheap to clone; all clones feed the same
/// worker.
#[derive(Clone)]
pub struct CommandQueue {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Job>>>>,
}

impl CommandQueue {
    /// Starts the worker. Its join handle yields the transport back once the
    /// queue has been closed and drained, so the caller decides when to
    /// release it.
    pub(crate) fn spawn(
        transport: ReconnectingTransport,
        dispatcher: DispatcherHandle,
        event_log: Arc<dyn EventLog>,
    ) -> (Self, JoinHandle<ReconnectingTransport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = CommandWorker {
            transport,
            dispatcher,
            event_log,
        };

        let task = tokio::spawn(worker.run(rx));
        let queue = Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        };
        (queue, task)
    }

    /// Enqueues `command` immediately and returns a future for its outcome.
    ///
    /// The future fails with [`RconError::Closed`] when the queue no longer
    /// accepts work, and with the transport error once retries are exhausted.
    pub fn submit(
        &self,
        command: ConsoleCommand,
    ) -> impl Future<Output = Result<ConsoleCommand, RconError>> + Send + 'static {
        let queued = self.enqueue(command);
        async move {
            let reply = queued?;
            reply.await.map_err(|_| RconError::Closed)?
        }
    }

    fn enqueue(
        &self,
        command: ConsoleCommand,
    ) -> Result<oneshot::Receiver<Result<ConsoleCommand, RconError>>, RconError> {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        let tx = guard.as_ref().ok_or(RconError::Closed)?;

        let (reply, rx) = oneshot::channel();
        tx.send(Job { command, reply })
            .map_err(|_| RconError::Closed)?;
        Ok(rx)
    }

    /// Stops accepting new commands; already queued ones still run.
    pub fn close(&self) {
        let mut guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }

    pub fn is_closed(&self) -> bool {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

struct CommandWorker {
    transport: ReconnectingTransport,
    dispatcher: DispatcherHandle,
    event_log: Arc<dyn EventLog>,
}

impl CommandWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Job>) -> ReconnectingTransport {
        while let Some(job) = rx.recv().await {
            let result = self.execute(job.command).await;
            // The submitter may have stopped waiting.
            let _ = job.reply.send(result);
        }

        debug!("Command queue drained");
        self.transport
    }

    async fn execute(&mut self, mut command: ConsoleCommand) -> Result<ConsoleCommand, RconError> {
        if !command.suppress_input {
            self.event_log.log(LogStream::All, &command.raw_text);
        }

        match self.transport.send(&command.raw_text).await {
            Ok(response) => {
                let lines = split_response(&response);
                if !command.suppress_output {
                    for line in &lines {
                        self.event_log.log(LogStream::All, line);
                    }
                }

                command.lines = lines;
                command.status = ConnectionState::Connected;
                self.dispatcher.post(command.clone());
                Ok(command)
            }
            Err(e) => {
                debug!("Failed to send command '{}': {}", command.raw_text, e);
                command.status = ConnectionState::Disconnected;
                self.dispatcher.post(command);
                Err(e)
            }
        }
    }
}

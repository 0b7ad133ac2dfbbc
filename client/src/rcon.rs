//! The RCON client: wiring, public surface and orderly shutdown.

use crate::dispatcher::OutputDispatcher;
use crate::enrichment::PlayerDetailsSource;
use crate::error::RconError;
use crate::listeners::{ListenerHandle, ListenerRegistry, ListenerResult};
use crate::logging::{EventLog, LogEventLog};
use crate::queue::CommandQueue;
use crate::retry::{ReconnectingTransport, RetryPolicy};
use crate::roster::RosterView;
use crate::scheduler::{PeriodicScheduler, PollSchedule, GET_CHAT_PERIOD, LIST_PLAYERS_PERIOD};
use crate::transport::Connector;
use log::{error, info};
use shared::{ConnectionState, ConsoleCommand, RconParameters};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub retry: RetryPolicy,
    pub list_players_period: Duration,
    pub get_chat_period: Duration,
    /// Start the background `listplayers`/`getchat` polls.
    pub auto_poll: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            list_players_period: LIST_PLAYERS_PERIOD,
            get_chat_period: GET_CHAT_PERIOD,
            auto_poll: true,
        }
    }
}

impl ClientOptions {
    fn schedules(&self) -> Vec<PollSchedule> {
        vec![
            PollSchedule::list_players(self.list_players_period),
            PollSchedule::get_chat(self.get_chat_period),
        ]
    }
}

pub struct RconClientBuilder {
    params: RconParameters,
    connector: Arc<dyn Connector>,
    options: ClientOptions,
    event_log: Option<Arc<dyn EventLog>>,
    details_source: Option<Arc<dyn PlayerDetailsSource>>,
}

impl RconClientBuilder {
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn player_details(mut self, source: Arc<dyn PlayerDetailsSource>) -> Self {
        self.details_source = Some(source);
        self
    }

    /// Starts the client with its output dispatcher running on the tokio
    /// runtime. Must be called from within a runtime.
    pub fn start(self) -> RconClient {
        let (client, dispatcher) = self.start_detached();
        tokio::spawn(dispatcher.run());
        client
    }

    /// Starts the client but hands the output dispatcher to the caller, who
    /// must drive it (`run`, `process_next` or `try_process_pending`) on the
    /// thread that should observe roster and listener updates. Must be called
    /// from within a runtime; the dispatcher itself may then be driven from
    /// any thread.
    pub fn start_detached(self) -> (RconClient, OutputDispatcher) {
        let params = Arc::new(self.params);
        let event_log = self
            .event_log
            .unwrap_or_else(|| Arc::new(LogEventLog::new(params.profile_name.clone())));
        let listeners = ListenerRegistry::new();

        let (mut dispatcher, dispatcher_handle) = OutputDispatcher::new(
            Arc::clone(&params),
            listeners.clone(),
            Arc::clone(&event_log),
            self.details_source,
        );
        let status_rx = dispatcher.subscribe_status();
        let roster_rx = dispatcher.subscribe_roster();
        let drained_rx = dispatcher.drained_signal();

        let transport =
            ReconnectingTransport::new(self.connector, Arc::clone(&params), self.options.retry);
        let (queue, queue_task) = CommandQueue::spawn(transport, dispatcher_handle, event_log);

        let scheduler = self
            .options
            .auto_poll
            .then(|| PeriodicScheduler::start(&queue, self.options.schedules()));

        info!(
            "RCON client for '{}' started against {}",
            params.profile_name,
            params.endpoint()
        );

        let client = RconClient {
            params,
            queue,
            listeners,
            status_rx,
            roster_rx,
            scheduler,
            queue_task: Some(queue_task),
            drained_rx: Some(drained_rx),
        };

        (client, dispatcher)
    }
}

pub struct RconClient {
    params: Arc<RconParameters>,
    queue: CommandQueue,
    listeners: ListenerRegistry,
    status_rx: watch::Receiver<ConnectionState>,
    roster_rx: watch::Receiver<RosterView>,
    scheduler: Option<PeriodicScheduler>,
    queue_task: Option<JoinHandle<ReconnectingTransport>>,
    drained_rx: Option<oneshot::Receiver<()>>,
}

impl RconClient {
    pub fn builder(params: RconParameters, connector: Arc<dyn Connector>) -> RconClientBuilder {
        RconClientBuilder {
            params,
            connector,
            options: ClientOptions::default(),
            event_log: None,
            details_source: None,
        }
    }

    pub fn parameters(&self) -> &RconParameters {
        &self.params
    }

    /// Queues a console command typed by a user.
    pub fn issue_command(
        &self,
        text: impl Into<String>,
    ) -> impl Future<Output = Result<ConsoleCommand, RconError>> + Send + 'static {
        self.queue.submit(ConsoleCommand::new(text))
    }

    pub fn submit(
        &self,
        command: ConsoleCommand,
    ) -> impl Future<Output = Result<ConsoleCommand, RconError>> + Send + 'static {
        self.queue.submit(command)
    }

    pub fn register_listener<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&ConsoleCommand) -> ListenerResult + Send + Sync + 'static,
    {
        self.listeners.register(callback)
    }

    pub fn status(&self) -> ConnectionState {
        *self.status_rx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status_rx.clone()
    }

    pub fn players(&self) -> RosterView {
        self.roster_rx.borrow().clone()
    }

    pub fn subscribe_players(&self) -> watch::Receiver<RosterView> {
        self.roster_rx.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler
            .as_ref()
            .map_or(false, PeriodicScheduler::is_running)
    }

    /// Stops the polls, drains the command queue, drains the output
    /// dispatcher and finally closes the transport.
    pub async fn shutdown(mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop().await;
        }

        self.queue.close();
        let transport = match self.queue_task.take() {
            Some(task) => match task.await {
                Ok(transport) => Some(transport),
                Err(e) => {
                    error!("Command queue task failed: {}", e);
                    None
                }
            },
            None => None,
        };

        if let Some(drained) = self.drained_rx.take() {
            // An error only means the dispatcher was dropped undriven.
            let _ = drained.await;
        }

        if let Some(mut transport) = transport {
            transport.close().await;
        }

        info!("RCON client for '{}' shut down", self.params.profile_name);
    }
}

impl Drop for RconClient {
    fn drop(&mut self) {
        // Without an explicit shutdown the workers wind down on their own.
        self.queue.close();
    }
}

//! Output dispatcher: applies the effects of completed commands.
//!
//! Completed commands arrive from the command queue over a channel and are
//! handled strictly one at a time. This is the only place the roster and the
//! connection state are written. Hosts either let the client spawn the
//! dispatcher on the runtime or drive it themselves (`run`,
//! `process_next`, `try_process_pending`) from whatever thread should observe
//! the updates.

use crate::enrichment::PlayerDetailsSource;
use crate::error::EnrichmentError;
use crate::listeners::ListenerRegistry;
use crate::logging::{EventLog, LogStream};
use crate::roster::{collect_candidates, Roster, RosterView};
use log::{debug, info, warn};
use shared::{
    CommandVerb, ConnectionState, ConsoleCommand, EnrichedPlayer, RconParameters,
    NO_RESPONSE_OUTPUT,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

const DETAILS_UPDATED: &str = "Player and tribe information updated.";
const DETAILS_FAILED: &str =
    "Player and tribe information update failed. Only basic player information will be shown.";

pub(crate) enum Delivery {
    Completed(ConsoleCommand),
    Details(Result<Vec<EnrichedPlayer>, EnrichmentError>),
}

/// Sending side used by the command queue worker.
#[derive(Clone)]
pub(crate) struct DispatcherHandle {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl DispatcherHandle {
    pub(crate) fn post(&self, command: ConsoleCommand) {
        if self.tx.send(Delivery::Completed(command)).is_err() {
            warn!("Output dispatcher is gone; dropping command output");
        }
    }
}

pub struct OutputDispatcher {
    rx: mpsc::UnboundedReceiver<Delivery>,
    details_tx: mpsc::WeakUnboundedSender<Delivery>,
    params: Arc<RconParameters>,
    roster: Roster,
    listeners: ListenerRegistry,
    event_log: Arc<dyn EventLog>,
    details_source: Option<Arc<dyn PlayerDetailsSource>>,
    /// Runtime that enrichment loads run on, whichever thread drives us.
    runtime: Option<Handle>,
    updating_details: bool,
    status_tx: watch::Sender<ConnectionState>,
    roster_tx: watch::Sender<RosterView>,
    drained_tx: Option<oneshot::Sender<()>>,
}

impl OutputDispatcher {
    pub(crate) fn new(
        params: Arc<RconParameters>,
        listeners: ListenerRegistry,
        event_log: Arc<dyn EventLog>,
        details_source: Option<Arc<dyn PlayerDetailsSource>>,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (roster_tx, _) = watch::channel(RosterView::default());

        let dispatcher = Self {
            rx,
            details_tx: tx.downgrade(),
            params,
            roster: Roster::new(),
            listeners,
            event_log,
            details_source,
            runtime: Handle::try_current().ok(),
            updating_details: false,
            status_tx,
            roster_tx,
            drained_tx: None,
        };

        (dispatcher, DispatcherHandle { tx })
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_roster(&self) -> watch::Receiver<RosterView> {
        self.roster_tx.subscribe()
    }

    /// Resolves once the dispatcher has drained and stopped, or was dropped.
    pub(crate) fn drained_signal(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.drained_tx = Some(tx);
        rx
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn status(&self) -> ConnectionState {
        *self.status_tx.borrow()
    }

    /// Processes deliveries until the command queue has shut down.
    pub async fn run(mut self) {
        while self.process_next().await {}
        debug!("Output dispatcher drained");
        if let Some(drained) = self.drained_tx.take() {
            let _ = drained.send(());
        }
    }

    /// Waits for and handles one delivery. Returns `false` once the queue is
    /// closed and everything has been handled.
    pub async fn process_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(delivery) => {
                self.handle(delivery);
                true
            }
            None => false,
        }
    }

    /// Handles whatever is already waiting without blocking.
    pub fn try_process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(delivery) = self.rx.try_recv() {
            self.handle(delivery);
            handled += 1;
        }
        handled
    }

    fn handle(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Completed(command) => self.handle_command(command),
            Delivery::Details(result) => self.handle_details(result),
        }
    }

    fn handle_command(&mut self, mut command: ConsoleCommand) {
        let verb = command.verb.clone();
        match verb {
            CommandVerb::ListPlayers => self.handle_list_players(&mut command),
            CommandVerb::GetChat => self.handle_get_chat(&mut command),
            CommandVerb::Broadcast | CommandVerb::ServerChat => {
                self.event_log.log(LogStream::Chat, &command.raw_text);
                command.suppress_output = true;
            }
            CommandVerb::Other(_) => {}
        }

        self.status_tx.send_if_modified(|status| {
            let changed = *status != command.status;
            *status = command.status;
            changed
        });

        if !command.suppress_output {
            self.listeners.notify(&command);
        }
    }

    fn handle_list_players(&mut self, command: &mut ConsoleCommand) {
        // Observers still see the failed poll; the roster waits for a real one.
        if command.status == ConnectionState::Disconnected {
            command.lines.clear();
            command.suppress_output = false;
            return;
        }

        let candidates = collect_candidates(&command.lines);
        let reconciliation = self.roster.reconcile(&candidates);

        for message in &reconciliation.messages {
            self.event_log.log(LogStream::Event, message);
            self.event_log.log(LogStream::All, message);
        }

        if reconciliation.refresh_details {
            self.refresh_details();
        }

        command.lines = reconciliation.messages;
        command.suppress_output = false;
        self.publish_roster();
    }

    fn handle_get_chat(&mut self, command: &mut ConsoleCommand) {
        let lines: Vec<String> = command
            .lines
            .iter()
            .filter(|line| !line.is_empty() && line.as_str() != NO_RESPONSE_OUTPUT)
            .cloned()
            .collect();

        if lines.is_empty() && command.is_auto_poll() {
            command.suppress_output = true;
            return;
        }

        for line in &lines {
            self.event_log.log(LogStream::Chat, line);
            self.event_log.log(LogStream::All, line);
        }
        command.suppress_output = false;
        command.lines = lines;
    }

    fn refresh_details(&mut self) {
        if self.updating_details {
            debug!("Player details refresh already running; skipping");
            return;
        }

        let Some(source) = self.details_source.clone() else {
            return;
        };
        let Some(save_path) = self.params.save_path() else {
            return;
        };
        let Some(runtime) = self.runtime.as_ref() else {
            warn!("No tokio runtime available; player details will not be loaded");
            return;
        };

        self.updating_details = true;
        let details_tx = self.details_tx.clone();

        let load = runtime.spawn(async move { source.load_players(&save_path).await });
        runtime.spawn(async move {
            // The flag is cleared by whatever arrives here, even a panicked load.
            let result = match load.await {
                Ok(result) => result,
                Err(e) => Err(EnrichmentError::Source(format!("details task failed: {}", e))),
            };
            if let Some(tx) = details_tx.upgrade() {
                let _ = tx.send(Delivery::Details(result));
            }
        });
    }

    fn handle_details(&mut self, result: Result<Vec<EnrichedPlayer>, EnrichmentError>) {
        self.updating_details = false;

        match result {
            Ok(records) => {
                let merged = self.roster.merge_details(records);
                info!("Merged details for {} players", merged);
                self.event_log.log(LogStream::Event, DETAILS_UPDATED);
                self.publish_roster();
            }
            Err(e) => {
                warn!("Player details refresh failed: {}", e);
                self.event_log.log(LogStream::Event, DETAILS_FAILED);
            }
        }
    }

    fn publish_roster(&self) {
        self.roster_tx
            .send_replace(self.roster.view(self.params.max_players));
    }
}

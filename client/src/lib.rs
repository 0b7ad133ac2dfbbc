//! # RCON Client Library
//!
//! This library provides the client side of a game server's remote console
//! (RCON). It keeps a live view of which players are on the server, relays
//! in-game chat and lets operators issue console commands, all over a single
//! console connection that may drop at any time.
//!
//! ## Architecture Overview
//!
//! Work flows through two pipelines that never run a step concurrently with
//! themselves:
//!
//! ### Command Queue
//! Every command, whether typed by an operator or issued by a background
//! poll, is executed by one worker in submission order. The worker owns the
//! connection, retries failed sends with reconnection in between, and splits
//! each raw response into trimmed lines.
//!
//! ### Output Dispatcher
//! Completed commands are handed to the dispatcher in the same order they
//! finished. The dispatcher interprets them by verb: `listplayers` output is
//! reconciled into the roster, `getchat` output is relayed to the chat log,
//! broadcasts are logged. It then publishes the connection state and roster
//! and notifies registered listeners.
//!
//! ### Background Polls
//! While the client runs, `listplayers` and `getchat` are polled on fixed
//! periods. Polls are suppressed from the console logs unless they produce
//! something worth seeing (joins, leaves or chat).
//!
//! ## Module Organization
//!
//! ### Transport (`transport`, `retry`)
//! - `Transport` / `Connector`: the seam to a real console connection
//! - `ReconnectingTransport`: bounded retry with reconnection
//!
//! ### Pipelines (`queue`, `dispatcher`, `scheduler`)
//! - `CommandQueue`: serialized, ordered execution
//! - `OutputDispatcher`: verb semantics and state publication
//! - `PeriodicScheduler`: fixed-interval polls
//!
//! ### State (`roster`, `listeners`, `enrichment`, `logging`)
//! - `Roster`: known players and join/leave reconciliation
//! - `ListenerRegistry`: isolated fan-out to observers
//! - `PlayerDetailsSource`: optional save-file enrichment
//! - `EventLog`: the all-events, chat and game-events streams
//!
//! ### Testing (`sim`)
//! - `SimulatedServer`: an in-memory console with optional churn and faults
//!
//! ## Usage Example
//!
//! ```no_run
//! use rcon_client::sim::SimulatedServer;
//! use rcon_client::RconClient;
//! use shared::RconParameters;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), rcon_client::RconError> {
//! let params = RconParameters::new("127.0.0.1", 32330, "secret").with_profile_name("Island");
//! let server = SimulatedServer::new("secret");
//! let client = RconClient::builder(params, Arc::new(server)).start();
//!
//! let _listener = client.register_listener(|command| {
//!     for line in &command.lines {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! });
//!
//! let saved = client.issue_command("saveworld").await?;
//! println!("{:?}", saved.lines);
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Philosophy
//!
//! ### Never Lose Order
//! Observers see results in exactly the order commands were submitted, no
//! matter how many retries a command needed.
//!
//! ### Fail Loudly, Keep Going
//! A command that exhausts its retries fails only that command. A listener
//! that errors or panics is logged and skipped. The polls keep running
//! through outages and pick the server back up when it returns.

pub mod dispatcher;
pub mod enrichment;
pub mod error;
pub mod listeners;
pub mod logging;
pub mod queue;
pub mod rcon;
pub mod retry;
pub mod roster;
pub mod scheduler;
pub mod sim;
pub mod transport;

pub use dispatcher::OutputDispatcher;
pub use enrichment::PlayerDetailsSource;
pub use error::{EnrichmentError, ListenerError, RconError, TransportError};
pub use listeners::{ListenerHandle, ListenerRegistry, ListenerResult};
pub use logging::{EventLog, LogEventLog, LogStream, MemoryEventLog};
pub use queue::CommandQueue;
pub use rcon::{ClientOptions, RconClient, RconClientBuilder};
pub use retry::{ReconnectingTransport, RetryPolicy};
pub use roster::{Roster, RosterSummary, RosterView};
pub use scheduler::{PeriodicScheduler, PollSchedule};
pub use transport::{Connector, Transport};

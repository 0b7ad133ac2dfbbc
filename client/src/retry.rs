//! Bounded retry with automatic reconnection around a [`Transport`].
//!
//! Every attempt first makes sure a session exists, opening a new one through
//! the [`Connector`] if the previous one was dropped, and then sends. A failed
//! send closes the session and waits a fixed delay, so the next attempt always
//! starts on a fresh connection. Connect failures count against the same
//! budget as send failures.

use crate::error::{RconError, TransportError};
use crate::transport::{Connector, Transport};
use log::{debug, warn};
use shared::RconParameters;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

pub const MAX_COMMAND_RETRIES: u32 = 10;
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_COMMAND_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }
}

pub struct ReconnectingTransport {
    connector: Arc<dyn Connector>,
    params: Arc<RconParameters>,
    policy: RetryPolicy,
    connection: Option<Box<dyn Transport>>,
}

impl ReconnectingTransport {
    pub fn new(
        connector: Arc<dyn Connector>,
        params: Arc<RconParameters>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            connector,
            params,
            policy,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Sends `command`, reconnecting between attempts, and gives up with the
    /// last recorded error once the retry budget is spent.
    pub async fn send(&mut self, command: &str) -> Result<String, RconError> {
        let mut attempts = 0;
        let mut last_error = TransportError::NotConnected;

        while attempts < self.policy.max_retries {
            attempts += 1;

            if self.connection.is_none() {
                if let Err(e) = self.reconnect().await {
                    debug!("Reconnect attempt {} failed: {}", attempts, e);
                    last_error = e;
                    sleep(self.policy.retry_delay).await;
                    continue;
                }
            }

            if let Some(connection) = self.connection.as_mut() {
                match connection.send(command).await {
                    Ok(response) => return Ok(response),
                    Err(e) => {
                        debug!("Send attempt {} of '{}' failed: {}", attempts, command, e);
                        last_error = e;
                    }
                }
            }

            self.close().await;
            sleep(self.policy.retry_delay).await;
        }

        debug!("{}: {}", self.failure_context(), last_error);
        warn!(
            "Command '{}' failed after {} attempts to {}",
            command,
            attempts,
            self.params.endpoint()
        );

        Err(RconError::RetriesExhausted {
            attempts,
            host: self.params.host.clone(),
            port: self.params.port,
            source: last_error,
        })
    }

    /// Describes the target of a failed command. Credentials stay out.
    fn failure_context(&self) -> String {
        let password = if self.params.admin_password.is_empty() {
            "no password"
        } else {
            "password <redacted>"
        };
        format!(
            "Failed to connect to RCON at {} with {}",
            self.params.endpoint(),
            password
        )
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        self.close().await;
        let connection = self.connector.connect(&self.params).await?;
        debug!("Connected to RCON at {}", self.params.endpoint());
        self.connection = Some(connection);
        Ok(())
    }

    pub async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
    }
}

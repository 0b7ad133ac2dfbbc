//! Seam between the client and the remote-console wire protocol.
//!
//! The client never speaks the protocol itself. A [`Connector`] opens
//! authenticated sessions and each [`Transport`] carries plain command text
//! in and response text out.

use crate::error::TransportError;
use async_trait::async_trait;
use shared::RconParameters;

/// One live, authenticated console session.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, command: &str) -> Result<String, TransportError>;

    async fn close(&mut self);
}

/// Opens new console sessions; called again after every failed send.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, params: &RconParameters)
        -> Result<Box<dyn Transport>, TransportError>;
}

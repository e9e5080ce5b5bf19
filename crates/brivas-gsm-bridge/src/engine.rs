//! Messages exchanged with the call-routing engine
//!
//! Upward traffic leaves the bridge as [`EngineMessage`]s on an unbounded
//! channel. Downward traffic arrives as [`EngineCommand`]s.

use crate::types::{CallId, Cause, EndpointId, PartyInfo, SetupInfo};
use tokio::sync::mpsc;

/// Event reported to an engine endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Setup(SetupInfo),
    Proceeding,
    Alerting,
    Connect(PartyInfo),
    Release(Cause),
    Notify(u8),
    Dtmf(char),
}

/// Upward message, addressed to one endpoint of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineMessage {
    pub call: CallId,
    pub endpoint: EndpointId,
    pub event: EngineEvent,
}

pub type EngineSender = mpsc::UnboundedSender<EngineMessage>;
pub type EngineReceiver = mpsc::UnboundedReceiver<EngineMessage>;

/// Request an endpoint makes of its call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointRequest {
    Setup(SetupInfo),
    Alerting,
    Connect(PartyInfo),
    Disconnect(Cause),
    Release(Cause),
    Notify(u8),
}

impl EndpointRequest {
    pub fn name(&self) -> &'static str {
        match self {
            EndpointRequest::Setup(_) => "setup",
            EndpointRequest::Alerting => "alerting",
            EndpointRequest::Connect(_) => "connect",
            EndpointRequest::Disconnect(_) => "disconnect",
            EndpointRequest::Release(_) => "release",
            EndpointRequest::Notify(_) => "notify",
        }
    }
}

/// Downward command from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Place a new call towards the GSM side
    Dial {
        endpoint: EndpointId,
        setup: SetupInfo,
    },
    /// Drive an existing call
    Message {
        call: CallId,
        endpoint: EndpointId,
        request: EndpointRequest,
    },
}

pub type CommandSender = mpsc::UnboundedSender<EngineCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<EngineCommand>;

//! Call objects and their state machine
//!
//! A [`Call`] is driven from two sides: network indications arriving over
//! MNCC ([`network`]) and requests from engine endpoints ([`endpoint`]).
//! Both sides run against a [`CallContext`] that owns everything a handler
//! may touch besides the call itself.

mod context;
pub mod endpoint;
mod identity;
pub mod network;
mod registry;
pub mod state;

pub use context::{CallContext, DeferredWork};
pub use registry::CallRegistry;
pub use state::CallState;

use crate::types::{CallId, CallRef, CapabilityInfo, EndpointId, PartyInfo, UserUser};
use crate::voice::VoiceChannel;
use tracing::{debug, warn};

/// One call between the GSM stack and the engine
#[derive(Debug)]
pub struct Call {
    id: CallId,
    /// 0 until a reference is assigned
    callref: CallRef,
    port: u32,
    state: CallState,
    history: Vec<CallState>,
    pub caller: PartyInfo,
    pub dialing: PartyInfo,
    pub redirect: PartyInfo,
    pub connect: PartyInfo,
    pub capability: CapabilityInfo,
    pub useruser: UserUser,
    pending_notify: Option<u8>,
    voice: Option<VoiceChannel>,
    tch_bridged: bool,
    endpoints: Vec<EndpointId>,
}

impl Call {
    pub(crate) fn new(id: CallId, callref: CallRef, port: u32, state: CallState) -> Self {
        Self {
            id,
            callref,
            port,
            state,
            history: vec![state],
            caller: PartyInfo::default(),
            dialing: PartyInfo::default(),
            redirect: PartyInfo::default(),
            connect: PartyInfo::default(),
            capability: CapabilityInfo::default(),
            useruser: UserUser::default(),
            pending_notify: None,
            voice: None,
            tch_bridged: false,
            endpoints: Vec::new(),
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn callref(&self) -> CallRef {
        self.callref
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Every state the call has been in, oldest first
    pub fn history(&self) -> &[CallState] {
        &self.history
    }

    pub fn pending_notify(&self) -> Option<u8> {
        self.pending_notify
    }

    pub fn endpoints(&self) -> &[EndpointId] {
        &self.endpoints
    }

    pub fn voice(&self) -> Option<&VoiceChannel> {
        self.voice.as_ref()
    }

    pub fn voice_mut(&mut self) -> Option<&mut VoiceChannel> {
        self.voice.as_mut()
    }

    pub fn is_tch_bridged(&self) -> bool {
        self.tch_bridged
    }

    /// Move along the transition graph. Refused edges leave the state as is.
    pub(crate) fn enter(&mut self, next: CallState) -> bool {
        if !self.state.can_enter(next) {
            warn!(call = %self.id, callref = self.callref, "Refusing transition {} -> {}", self.state, next);
            return false;
        }
        if next != self.state {
            debug!(call = %self.id, callref = self.callref, "State {} -> {}", self.state, next);
            self.history.push(next);
            self.state = next;
        }
        true
    }

    pub(crate) fn set_callref(&mut self, callref: CallRef) {
        self.callref = callref;
    }

    pub(crate) fn attach(&mut self, endpoint: EndpointId) {
        if !self.endpoints.contains(&endpoint) {
            self.endpoints.push(endpoint);
        }
    }

    pub(crate) fn detach(&mut self, endpoint: EndpointId) {
        self.endpoints.retain(|ep| *ep != endpoint);
    }

    pub(crate) fn take_endpoints(&mut self) -> Vec<EndpointId> {
        std::mem::take(&mut self.endpoints)
    }

    pub(crate) fn set_pending_notify(&mut self, code: u8) {
        self.pending_notify = Some(code);
    }

    pub(crate) fn take_pending_notify(&mut self) -> Option<u8> {
        self.pending_notify.take()
    }

    pub(crate) fn install_voice(&mut self, voice: VoiceChannel) {
        self.voice = Some(voice);
    }

    pub(crate) fn take_voice(&mut self) -> Option<VoiceChannel> {
        self.tch_bridged = false;
        self.voice.take()
    }

    /// Mark the traffic channel bridged; false if it already was
    pub(crate) fn mark_tch_bridged(&mut self) -> bool {
        if self.tch_bridged {
            return false;
        }
        self.tch_bridged = true;
        if let Some(voice) = self.voice.as_mut() {
            voice.set_tch_connected(true);
        }
        true
    }
}

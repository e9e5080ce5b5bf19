//! Side effects available to call handlers

use super::Call;
use crate::audio::FRAME_LEN;
use crate::config::PortSettings;
use crate::engine::{EngineEvent, EngineMessage, EngineSender};
use crate::mncc::messages::{CallControl, DataFrame, MessageType, MnccMessage};
use crate::mncc::{trace_message, Direction, MnccQueue};
use crate::types::{cause, location, CallId, CallRef, Cause, EndpointId};
use crate::voice::{ChannelPool, VoiceChannel, VoiceTransportFactory};
use metrics::counter;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Calls waiting to be reaped once the current handler has returned
#[derive(Debug, Default)]
pub struct DeferredWork {
    pending: VecDeque<CallId>,
}

impl DeferredWork {
    pub fn push(&mut self, call: CallId) {
        if !self.pending.contains(&call) {
            self.pending.push_back(call);
        }
    }

    pub fn pop(&mut self) -> Option<CallId> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Everything a handler may touch besides the call itself
pub struct CallContext {
    label: &'static str,
    port: PortSettings,
    queue: MnccQueue,
    engine: EngineSender,
    deferred: DeferredWork,
    pool: ChannelPool,
    factory: Box<dyn VoiceTransportFactory>,
    next_endpoint: u64,
}

impl CallContext {
    pub fn new(
        label: &'static str,
        port: PortSettings,
        voice_channels: usize,
        factory: Box<dyn VoiceTransportFactory>,
        engine: EngineSender,
    ) -> Self {
        Self {
            label,
            port,
            queue: MnccQueue::new(),
            engine,
            deferred: DeferredWork::default(),
            pool: ChannelPool::new(voice_channels),
            factory,
            next_endpoint: 1,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn port(&self) -> &PortSettings {
        &self.port
    }

    pub fn queue(&self) -> &MnccQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut MnccQueue {
        &mut self.queue
    }

    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }

    pub(crate) fn deferred_mut(&mut self) -> &mut DeferredWork {
        &mut self.deferred
    }

    /// Queue a message for the GSM stack. A failed enqueue is logged and
    /// the message lost; the call itself carries on.
    pub fn send(&mut self, msg: impl Into<MnccMessage>) {
        let msg = msg.into();
        trace_message(self.label, Direction::ToStack, &msg);
        if let Err(e) = self.queue.enqueue(&msg) {
            warn!(callref = msg.callref(), "{} not queued: {}", msg.msg_type(), e);
        }
    }

    /// Send a voice frame for `call`
    pub fn send_frame(&mut self, callref: CallRef, data: [u8; FRAME_LEN]) {
        self.send(DataFrame {
            msg_type: MessageType::TchfFrame,
            callref,
            data,
        });
    }

    /// Reject a call reference back to the GSM stack
    pub fn reject(&mut self, callref: CallRef, value: u8) {
        counter!("gsm_calls_rejected_total", "cause" => value.to_string()).increment(1);
        self.send(CallControl::new(MessageType::RejReq, callref).with_cause(location::PRIVATE_LOCAL, value));
    }

    pub fn new_endpoint(&mut self) -> EndpointId {
        let id = EndpointId(self.next_endpoint);
        self.next_endpoint += 1;
        id
    }

    /// Report an event to the call's first endpoint
    pub fn emit(&self, call: &Call, event: EngineEvent) {
        let Some(&endpoint) = call.endpoints().first() else {
            debug!(call = %call.id(), "No endpoint for {:?}", event);
            return;
        };
        self.emit_to(call.id(), endpoint, event);
    }

    pub fn emit_to(&self, call: CallId, endpoint: EndpointId, event: EngineEvent) {
        if self.engine.send(EngineMessage { call, endpoint, event }).is_err() {
            warn!(%call, %endpoint, "Engine channel closed");
        }
    }

    /// Broadcast a release to every endpoint, detaching each
    pub fn release_endpoints(&self, call: &mut Call, cause: Cause) {
        for endpoint in call.take_endpoints() {
            self.emit_to(call.id(), endpoint, EngineEvent::Release(cause));
        }
    }

    /// Enter RELEASE and schedule the call for reaping
    pub fn finish(&mut self, call: &mut Call) {
        call.enter(super::CallState::Release);
        self.deferred.push(call.id());
    }

    /// Hunt a channel and open its voice relay. Returns the cause to clear
    /// with on failure.
    pub fn attach_voice(&mut self, call: &mut Call) -> Result<(), u8> {
        let Some(index) = self.pool.hunt() else {
            warn!(call = %call.id(), "No free voice channel");
            return Err(cause::NO_CIRCUIT_AVAILABLE);
        };
        let mut voice = match VoiceChannel::new(self.port.law) {
            Ok(voice) => voice,
            Err(e) => {
                warn!(call = %call.id(), "Voice channel {} unusable: {}", index, e);
                self.pool.release(index);
                return Err(cause::NO_CIRCUIT_AVAILABLE);
            }
        };
        if let Err(e) = voice.open(&mut *self.factory, index, call.id()) {
            warn!(call = %call.id(), "Voice channel {} failed: {}", index, e);
            self.pool.release(index);
            return Err(cause::NO_CIRCUIT_AVAILABLE);
        }
        call.install_voice(voice);
        Ok(())
    }

    /// Close the call's voice relay and return its channel to the pool
    pub fn detach_voice(&mut self, call: &mut Call) {
        if let Some(mut voice) = call.take_voice() {
            if let Some(index) = voice.index() {
                self.pool.release(index);
            }
            voice.close();
        }
    }

    /// Start frame relay on the traffic channel, once per call
    pub fn bridge_voice(&mut self, call: &mut Call) {
        if call.mark_tch_bridged() {
            self.send(CallControl::new(MessageType::FrameRecv, call.callref()));
        }
    }

    /// Deliver a buffered notification
    pub fn flush_notify(&mut self, call: &mut Call) {
        if let Some(code) = call.take_pending_notify() {
            self.send_notify(call, code);
        }
    }

    pub fn send_notify(&mut self, call: &Call, code: u8) {
        let mut msg = CallControl::new(MessageType::NotifyReq, call.callref());
        msg.notify = code;
        self.send(msg);
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("label", &self.label)
            .field("queued", &self.queue.len())
            .field("free_channels", &self.pool.available())
            .finish()
    }
}

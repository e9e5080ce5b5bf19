//! Per-link dispatcher
//!
//! A [`Bridge`] owns every call of one MNCC link. It routes decoded MNCC
//! messages, engine commands and voice events to the right call and reaps
//! released calls once the handler that released them has returned.
//! It does no I/O on the control socket itself; see [`crate::mncc::MnccLink`].

use crate::call::network::{self, NetworkEvent};
use crate::call::{endpoint, Call, CallContext, CallRegistry, CallState};
use crate::config::LinkConfig;
use crate::engine::{EndpointRequest, EngineCommand, EngineSender};
use crate::mncc::{trace_message, Direction, MessageType, MnccMessage, MnccQueue};
use crate::types::{CallId, LinkRole};
use crate::voice::{VoiceEvent, VoiceTransportFactory};
use metrics::counter;
use tracing::{debug, info, trace, warn};

pub struct Bridge {
    name: String,
    role: LinkRole,
    calls: CallRegistry,
    ctx: CallContext,
}

impl Bridge {
    pub fn new(
        link: &LinkConfig,
        factory: Box<dyn VoiceTransportFactory>,
        engine: EngineSender,
    ) -> Self {
        Self {
            name: link.name.clone(),
            role: link.role,
            calls: CallRegistry::new(),
            ctx: CallContext::new(
                link.role.trace_label(),
                link.port.clone(),
                link.voice_channels,
                factory,
                engine,
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn calls(&self) -> &CallRegistry {
        &self.calls
    }

    pub fn call(&self, id: CallId) -> Option<&Call> {
        self.calls.get(id)
    }

    pub fn queue(&self) -> &MnccQueue {
        self.ctx.queue()
    }

    pub fn queue_mut(&mut self) -> &mut MnccQueue {
        self.ctx.queue_mut()
    }

    pub fn free_channels(&self) -> usize {
        self.ctx.pool().available()
    }

    /// Route one message received from the GSM stack
    pub fn handle_mncc(&mut self, msg: MnccMessage) {
        counter!("mncc_messages_received_total", "type" => msg.msg_type().name()).increment(1);
        trace_message(self.ctx.label(), Direction::FromStack, &msg);

        let m = match msg {
            MnccMessage::Frame(frame) => {
                let voice = self
                    .calls
                    .find(frame.callref)
                    .and_then(|id| self.calls.get_mut(id))
                    .and_then(Call::voice_mut);
                match voice {
                    Some(voice) => voice.receive_frame(&frame.data),
                    None => trace!(callref = frame.callref, "Frame without voice channel"),
                }
                return;
            }
            MnccMessage::Control(m) => m,
        };

        if m.msg_type == MessageType::SetupInd {
            network::setup_ind(&mut self.calls, &mut self.ctx, &m);
            return;
        }
        let Some(event) = NetworkEvent::from_type(m.msg_type) else {
            debug!(callref = m.callref, "Ignoring {}", m.msg_type);
            return;
        };
        let Some(call) = self
            .calls
            .find(m.callref)
            .and_then(|id| self.calls.get_mut(id))
        else {
            debug!(callref = m.callref, "{} for unknown call", m.msg_type);
            return;
        };
        network::dispatch(call, &mut self.ctx, event, &m);
    }

    /// Apply a command from the engine. Returns the call it concerned.
    pub fn handle_engine(&mut self, command: EngineCommand) -> Option<CallId> {
        let (id, endpoint, request) = match command {
            EngineCommand::Dial { endpoint, setup } => {
                let port = self.ctx.port().port_number;
                let id = self.calls.create(0, port, CallState::OutPrepare);
                if let Some(call) = self.calls.get_mut(id) {
                    call.attach(endpoint);
                }
                (id, endpoint, EndpointRequest::Setup(setup))
            }
            EngineCommand::Message {
                call,
                endpoint,
                request,
            } => (call, endpoint, request),
        };

        let callref = match request {
            EndpointRequest::Setup(_) => self.calls.new_callref(),
            _ => 0,
        };
        let Some(call) = self.calls.get_mut(id) else {
            warn!(call = %id, "{} for unknown call", request.name());
            return None;
        };
        endpoint::handle(call, &mut self.ctx, endpoint, request, callref);
        Some(id)
    }

    /// Feed a voice socket event to its call, relaying completed frames
    pub fn handle_voice(&mut self, event: VoiceEvent) {
        let Some(call) = self.calls.get_mut(event.call) else {
            trace!(call = %event.call, "Voice event for reaped call");
            return;
        };
        let callref = call.callref();
        let Some(voice) = call.voice_mut().filter(|v| v.index() == Some(event.index)) else {
            return;
        };
        for frame in voice.handle_event(event.kind) {
            self.ctx.send_frame(callref, frame);
        }
    }

    /// Release every call after the control connection dropped and discard
    /// whatever was still queued for it
    pub fn connection_lost(&mut self) -> usize {
        let cleared = network::connection_lost(&mut self.calls, &mut self.ctx);
        let dropped = self.ctx.queue_mut().clear();
        info!(
            link = %self.name,
            cleared, dropped, "Released calls after MNCC connection loss"
        );
        cleared
    }

    /// Reap calls scheduled for deletion. Returns how many were removed.
    pub fn run_deferred(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(id) = self.ctx.deferred_mut().pop() {
            let Some(call) = self.calls.get_mut(id) else {
                continue;
            };
            if !call.state().is_terminal() {
                continue;
            }
            self.ctx.detach_voice(call);
            if self.calls.remove(id).is_some() {
                debug!(call = %id, "Call removed");
                reaped += 1;
            }
        }
        reaped
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("calls", &self.calls.len())
            .field("ctx", &self.ctx)
            .finish()
    }
}

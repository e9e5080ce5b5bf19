//! Requests from engine endpoints

use super::identity::{called_number, encode_capability, encode_party};
use super::{Call, CallContext, CallState};
use crate::engine::{EndpointRequest, EngineEvent};
use crate::mncc::messages::{CallControl, MessageType};
use crate::screen::screen_outgoing;
use crate::types::{cause, Cause, CallRef, EndpointId, PartyInfo, Presentation, SetupInfo};
use tracing::{debug, info};

/// States in which each request is handled
pub fn accepts(state: CallState, request: &EndpointRequest) -> bool {
    use CallState::*;

    match request {
        EndpointRequest::Setup(_) => state == OutPrepare,
        EndpointRequest::Alerting => state == InProceeding,
        EndpointRequest::Connect(_) => matches!(state, InProceeding | InAlerting),
        EndpointRequest::Disconnect(_) => matches!(
            state,
            InProceeding
                | InAlerting
                | OutSetup
                | OutDialing
                | OutProceeding
                | OutAlerting
                | Connect
        ),
        EndpointRequest::Release(_) | EndpointRequest::Notify(_) => state != Release,
    }
}

/// Apply a request from `endpoint`. `callref` is the reference an
/// outgoing setup will use.
pub fn handle(
    call: &mut Call,
    ctx: &mut CallContext,
    endpoint: EndpointId,
    request: EndpointRequest,
    callref: CallRef,
) {
    if !accepts(call.state(), &request) {
        debug!(call = %call.id(), "Ignoring {} from {} in state {}", request.name(), endpoint, call.state());
        return;
    }
    match request {
        EndpointRequest::Setup(setup) => message_setup(call, ctx, setup, callref),
        EndpointRequest::Alerting => message_alerting(call, ctx),
        EndpointRequest::Connect(info) => message_connect(call, ctx, info),
        EndpointRequest::Disconnect(cause) => message_disconnect(call, ctx, cause),
        EndpointRequest::Release(cause) => message_release(call, ctx, endpoint, cause),
        EndpointRequest::Notify(code) => message_notify(call, ctx, code),
    }
}

/// Release a call that never reached the GSM stack
fn refuse(call: &mut Call, ctx: &mut CallContext, value: u8) {
    ctx.release_endpoints(call, Cause::local(value));
    ctx.finish(call);
}

fn message_setup(call: &mut Call, ctx: &mut CallContext, setup: SetupInfo, callref: CallRef) {
    call.caller = setup.caller;
    call.dialing = setup.dialing;
    call.redirect = setup.redirect;
    call.capability = setup.capability;
    call.useruser = setup.useruser;

    if call.dialing.id.is_empty() {
        info!(call = %call.id(), "No number dialed");
        refuse(call, ctx, cause::INVALID_NUMBER_FORMAT);
        return;
    }
    if ctx.port().blocked {
        info!(call = %call.id(), "Port blocked");
        refuse(call, ctx, cause::DESTINATION_OUT_OF_ORDER);
        return;
    }

    call.set_callref(callref);
    if let Err(value) = ctx.attach_voice(call) {
        refuse(call, ctx, value);
        return;
    }

    let mut msg = CallControl::new(MessageType::SetupReq, callref);
    let prefix = &ctx.port().emergency_prefix;
    let emergency = !prefix.is_empty()
        && call
            .dialing
            .id
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
    if emergency {
        info!(call = %call.id(), "Emergency call");
        msg.emergency = true;
    } else {
        if call.caller.present == Presentation::Allowed {
            msg.clir.inv = 1;
        } else {
            msg.clir.sup = 1;
        }
        msg.called = Some(called_number(&call.dialing.id));
        msg.bearer_cap = Some(encode_capability(&call.capability));
    }
    info!(call = %call.id(), callref, dialing = %call.dialing.id, "Outgoing call");
    ctx.send(msg);

    call.enter(CallState::OutSetup);
    ctx.emit(call, EngineEvent::Proceeding);
    call.enter(CallState::OutProceeding);
}

fn message_alerting(call: &mut Call, ctx: &mut CallContext) {
    let mut msg = CallControl::new(MessageType::AlertReq, call.callref());
    if ctx.port().tones {
        msg = msg.with_inband_progress();
    }
    ctx.send(msg);
    call.enter(CallState::InAlerting);
    ctx.flush_notify(call);
}

fn message_connect(call: &mut Call, ctx: &mut CallContext, mut info: PartyInfo) {
    screen_outgoing(&ctx.port().screen_out, &mut info);
    let mut msg = CallControl::new(MessageType::SetupRsp, call.callref());
    msg.connected = encode_party(&info);
    call.connect = info;
    ctx.send(msg);
    call.enter(CallState::Connect);
    ctx.flush_notify(call);
}

fn message_disconnect(call: &mut Call, ctx: &mut CallContext, cause: Cause) {
    let mut msg = CallControl::new(MessageType::DiscReq, call.callref())
        .with_cause(cause.location, cause.value);
    let tones = ctx.port().tones;
    if tones {
        msg = msg.with_inband_progress();
    }
    ctx.send(msg);
    call.enter(CallState::OutDisconnect);
    if tones {
        ctx.bridge_voice(call);
    }
}

fn message_release(call: &mut Call, ctx: &mut CallContext, endpoint: EndpointId, cause: Cause) {
    call.detach(endpoint);
    if call.callref() != 0 {
        ctx.send(
            CallControl::new(MessageType::RelReq, call.callref())
                .with_cause(cause.location, cause.value),
        );
    }
    ctx.release_endpoints(call, cause);
    ctx.finish(call);
}

fn message_notify(call: &mut Call, ctx: &mut CallContext, code: u8) {
    if code == 0 {
        return;
    }
    let code = code & 0x7f;
    if matches!(call.state(), CallState::Connect | CallState::InAlerting) {
        ctx.send_notify(call, code);
    } else {
        debug!(call = %call.id(), "Buffering notify 0x{:02x} in state {}", code, call.state());
        call.set_pending_notify(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::network::{dispatch, NetworkEvent};
    use crate::config::PortSettings;
    use crate::engine::EngineMessage;
    use crate::errors::TransportError;
    use crate::mncc::{decode_framed, MnccMessage, PacketSink};
    use crate::types::CallId;
    use crate::voice::{VoiceTransport, VoiceTransportFactory};
    use bytes::BytesMut;
    use std::io;
    use tokio::sync::mpsc;

    struct NoVoice;

    impl VoiceTransportFactory for NoVoice {
        fn open(
            &mut self,
            index: usize,
            _call: CallId,
        ) -> Result<Box<dyn VoiceTransport>, TransportError> {
            Err(TransportError::AlreadyOpen(index))
        }
    }

    struct Wire(Vec<u8>);

    impl PacketSink for Wire {
        fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    fn context() -> (CallContext, mpsc::UnboundedReceiver<EngineMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = CallContext::new("test", PortSettings::default(), 1, Box::new(NoVoice), tx);
        (ctx, rx)
    }

    fn drain(ctx: &mut CallContext) -> Vec<MnccMessage> {
        let mut wire = Wire(Vec::new());
        ctx.queue_mut().flush(&mut wire).unwrap();
        let mut buf = BytesMut::from(&wire.0[..]);
        let mut out = Vec::new();
        while let Some(msg) = decode_framed(&mut buf).unwrap() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_notify_held_during_out_setup() {
        let (mut ctx, _engine) = context();
        let endpoint = EndpointId(5);
        let mut call = Call::new(CallId(1), 11, 0, CallState::OutSetup);
        call.attach(endpoint);

        handle(&mut call, &mut ctx, endpoint, EndpointRequest::Notify(0x81), 0);
        handle(&mut call, &mut ctx, endpoint, EndpointRequest::Notify(0x84), 0);
        assert!(ctx.queue().is_empty());
        assert_eq!(call.pending_notify(), Some(0x04));

        let confirm = CallControl::new(MessageType::SetupCnf, 11);
        dispatch(&mut call, &mut ctx, NetworkEvent::SetupConfirm, &confirm);
        let notifies: Vec<_> = drain(&mut ctx)
            .into_iter()
            .filter_map(|m| match m {
                MnccMessage::Control(c) if c.msg_type == MessageType::NotifyReq => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(notifies.len(), 1);
        assert_eq!(notifies[0].notify, 0x04);
        assert_eq!(call.pending_notify(), None);

        // connected now, so the next one goes straight out
        handle(&mut call, &mut ctx, endpoint, EndpointRequest::Notify(0x82), 0);
        let sent = drain(&mut ctx);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), MessageType::NotifyReq);
    }

    #[test]
    fn test_allow_lists() {
        use CallState::*;
        let setup = EndpointRequest::Setup(SetupInfo::default());
        assert!(accepts(OutPrepare, &setup));
        assert!(!accepts(OutSetup, &setup));
        assert!(accepts(InAlerting, &EndpointRequest::Connect(PartyInfo::default())));
        assert!(!accepts(OutAlerting, &EndpointRequest::Connect(PartyInfo::default())));
        assert!(!accepts(OutPrepare, &EndpointRequest::Disconnect(Cause::default())));
        assert!(!accepts(Release, &EndpointRequest::Release(Cause::default())));
        assert!(accepts(OutPrepare, &EndpointRequest::Notify(3)));
    }
}

//! Indications from the GSM stack
//!
//! Every message type a call reacts to maps to a [`NetworkEvent`]. Whether
//! the event is handled depends only on the call state, see [`accepts`].
//! Events outside their states are logged and dropped.

use super::identity::{decode_capability, decode_party};
use super::{Call, CallContext, CallRegistry, CallState};
use crate::engine::EngineEvent;
use crate::mncc::messages::{CallControl, MessageType};
use crate::types::{cause, location, notify, Cause, SetupInfo, UserUser};
use tracing::{debug, info, warn};

/// Codec mode requested for the traffic channel (full-rate speech V1)
pub const LCHAN_MODE_FR: u8 = 0x01;

/// Network indications a call reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    CallConfirmed,
    Proceeding,
    Alerting,
    SetupConfirm,
    SetupComplete,
    Disconnect,
    Release,
    ReleaseConfirm,
    Reject,
    Notify,
    Hold,
    Retrieve,
    StartDtmf,
    StopDtmf,
}

impl NetworkEvent {
    pub fn from_type(msg_type: MessageType) -> Option<Self> {
        let event = match msg_type {
            MessageType::CallConfInd => NetworkEvent::CallConfirmed,
            MessageType::CallProcInd => NetworkEvent::Proceeding,
            MessageType::AlertInd => NetworkEvent::Alerting,
            MessageType::SetupCnf => NetworkEvent::SetupConfirm,
            MessageType::SetupComplInd => NetworkEvent::SetupComplete,
            MessageType::DiscInd => NetworkEvent::Disconnect,
            MessageType::RelInd => NetworkEvent::Release,
            MessageType::RelCnf => NetworkEvent::ReleaseConfirm,
            MessageType::RejInd => NetworkEvent::Reject,
            MessageType::NotifyInd => NetworkEvent::Notify,
            MessageType::HoldInd => NetworkEvent::Hold,
            MessageType::RetrieveInd => NetworkEvent::Retrieve,
            MessageType::StartDtmfInd => NetworkEvent::StartDtmf,
            MessageType::StopDtmfInd => NetworkEvent::StopDtmf,
            _ => return None,
        };
        Some(event)
    }
}

/// Dispatch table: states in which each event is handled
pub fn accepts(state: CallState, event: NetworkEvent) -> bool {
    use CallState::*;

    match event {
        NetworkEvent::CallConfirmed | NetworkEvent::Proceeding => {
            matches!(state, OutSetup | OutDialing | OutProceeding)
        }
        NetworkEvent::Alerting | NetworkEvent::SetupConfirm => {
            matches!(state, OutSetup | OutDialing | OutProceeding | OutAlerting)
        }
        NetworkEvent::SetupComplete => matches!(state, InProceeding | InAlerting | Connect),
        NetworkEvent::Disconnect
        | NetworkEvent::Release
        | NetworkEvent::ReleaseConfirm
        | NetworkEvent::Reject
        | NetworkEvent::Notify => state != Release,
        NetworkEvent::Hold
        | NetworkEvent::Retrieve
        | NetworkEvent::StartDtmf
        | NetworkEvent::StopDtmf => state == Connect,
    }
}

/// Run the handler for `event`, if the call's state accepts it
pub fn dispatch(call: &mut Call, ctx: &mut CallContext, event: NetworkEvent, msg: &CallControl) {
    if !accepts(call.state(), event) {
        debug!(call = %call.id(), "Ignoring {} in state {}", msg.msg_type, call.state());
        return;
    }
    match event {
        NetworkEvent::CallConfirmed => call_conf_ind(call, ctx),
        NetworkEvent::Proceeding => call_proc_ind(call, ctx),
        NetworkEvent::Alerting => alert_ind(call, ctx),
        NetworkEvent::SetupConfirm => setup_cnf(call, ctx, msg),
        NetworkEvent::SetupComplete => setup_compl_ind(call, ctx),
        NetworkEvent::Disconnect => disc_ind(call, ctx, msg),
        NetworkEvent::Release | NetworkEvent::ReleaseConfirm | NetworkEvent::Reject => {
            rel_ind(call, ctx, msg)
        }
        NetworkEvent::Notify => ctx.emit(call, EngineEvent::Notify(msg.notify)),
        NetworkEvent::Hold => {
            ctx.emit(call, EngineEvent::Notify(notify::REMOTE_HOLD));
            ctx.send(CallControl::new(MessageType::HoldCnf, call.callref()));
        }
        NetworkEvent::Retrieve => {
            ctx.emit(call, EngineEvent::Notify(notify::REMOTE_RETRIEVAL));
            ctx.send(CallControl::new(MessageType::RetrieveCnf, call.callref()));
        }
        NetworkEvent::StartDtmf => start_dtmf_ind(call, ctx, msg),
        NetworkEvent::StopDtmf => {
            ctx.send(CallControl::new(MessageType::StopDtmfRsp, call.callref()));
        }
    }
}

/// Cause carried by a clearing message, normal clearing when absent
fn clearing_cause(msg: &CallControl) -> Cause {
    msg.cause
        .map(|c| Cause::new(c.value, c.location))
        .unwrap_or_default()
}

fn lchan_modify(callref: u32) -> CallControl {
    let mut msg = CallControl::new(MessageType::LchanModify, callref);
    msg.lchan_mode = LCHAN_MODE_FR;
    msg
}

/// New call from the GSM side
pub fn setup_ind(registry: &mut CallRegistry, ctx: &mut CallContext, msg: &CallControl) {
    let callref = msg.callref;
    if registry.find(callref).is_some() {
        warn!(callref, "Setup for a call reference already in use");
        ctx.reject(callref, cause::RESOURCE_UNAVAILABLE);
        return;
    }
    if ctx.port().blocked {
        info!(callref, "Port blocked, rejecting setup");
        ctx.reject(callref, cause::DESTINATION_OUT_OF_ORDER);
        return;
    }

    let port = ctx.port().port_number;
    let id = registry.create(callref, port, CallState::InPrepare);
    let Some(call) = registry.get_mut(id) else {
        return;
    };

    call.caller = decode_party(msg.calling.as_ref(), &msg.imsi, ctx.port());
    call.dialing = decode_party(msg.called.as_ref(), "", ctx.port());
    call.redirect = decode_party(msg.redirecting.as_ref(), "", ctx.port());
    call.capability = decode_capability(msg.bearer_cap.as_ref(), ctx.port().law);
    if let Some(uu) = &msg.useruser {
        call.useruser = UserUser {
            protocol: uu.proto,
            data: uu.info.clone(),
        };
    }
    info!(
        call = %id,
        callref,
        caller = %call.caller.id,
        dialing = %call.dialing.id,
        "Incoming call"
    );

    if let Err(value) = ctx.attach_voice(call) {
        ctx.reject(callref, value);
        ctx.finish(call);
        return;
    }

    ctx.send(lchan_modify(callref));
    let mut proceeding = CallControl::new(MessageType::CallProcReq, callref);
    if ctx.port().tones {
        proceeding = proceeding.with_inband_progress();
    }
    ctx.send(proceeding);
    call.enter(CallState::InProceeding);
    if ctx.port().tones {
        ctx.bridge_voice(call);
    }

    let endpoint = ctx.new_endpoint();
    call.attach(endpoint);
    let setup = SetupInfo {
        caller: call.caller.clone(),
        dialing: call.dialing.clone(),
        redirect: call.redirect.clone(),
        capability: call.capability,
        useruser: call.useruser.clone(),
        port,
    };
    ctx.emit(call, EngineEvent::Setup(setup));
}

fn call_conf_ind(call: &mut Call, ctx: &mut CallContext) {
    ctx.send(lchan_modify(call.callref()));
}

fn call_proc_ind(call: &mut Call, ctx: &mut CallContext) {
    ctx.emit(call, EngineEvent::Proceeding);
    call.enter(CallState::OutProceeding);
    if ctx.port().early_b {
        ctx.bridge_voice(call);
    }
}

fn alert_ind(call: &mut Call, ctx: &mut CallContext) {
    ctx.emit(call, EngineEvent::Alerting);
    call.enter(CallState::OutAlerting);
    if ctx.port().early_b {
        ctx.bridge_voice(call);
    }
}

fn setup_cnf(call: &mut Call, ctx: &mut CallContext, msg: &CallControl) {
    call.connect = decode_party(msg.connected.as_ref(), &msg.imsi, ctx.port());
    ctx.send(CallControl::new(MessageType::SetupComplReq, call.callref()));
    ctx.emit(call, EngineEvent::Connect(call.connect.clone()));
    call.enter(CallState::Connect);
    ctx.bridge_voice(call);
    ctx.flush_notify(call);
}

fn setup_compl_ind(call: &mut Call, ctx: &mut CallContext) {
    call.enter(CallState::Connect);
    ctx.bridge_voice(call);
    ctx.flush_notify(call);
}

fn disc_ind(call: &mut Call, ctx: &mut CallContext, msg: &CallControl) {
    let cause = clearing_cause(msg);
    ctx.send(CallControl::new(MessageType::RelReq, call.callref()));
    ctx.release_endpoints(call, cause);
    ctx.finish(call);
}

fn rel_ind(call: &mut Call, ctx: &mut CallContext, msg: &CallControl) {
    let cause = clearing_cause(msg);
    ctx.release_endpoints(call, cause);
    ctx.finish(call);
}

fn start_dtmf_ind(call: &mut Call, ctx: &mut CallContext, msg: &CallControl) {
    let mut rsp = CallControl::new(MessageType::StartDtmfRsp, call.callref());
    if let Some(key) = msg.keypad {
        ctx.emit(call, EngineEvent::Dtmf(key as char));
        rsp.keypad = Some(key);
    }
    ctx.send(rsp);
}

/// Clear every call after the control connection was lost
pub fn connection_lost(registry: &mut CallRegistry, ctx: &mut CallContext) -> usize {
    let cause = Cause::new(cause::DESTINATION_OUT_OF_ORDER, location::PRIVATE_LOCAL);
    let mut cleared = 0;
    for id in registry.ids_on_port(ctx.port().port_number) {
        let Some(call) = registry.get_mut(id) else {
            continue;
        };
        if call.state().is_terminal() {
            continue;
        }
        ctx.release_endpoints(call, cause);
        ctx.finish(call);
        cleared += 1;
    }
    cleared
}

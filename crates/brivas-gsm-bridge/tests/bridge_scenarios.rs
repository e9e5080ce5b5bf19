//! Call scenarios driven through the public bridge API

use brivas_gsm_bridge::audio::{FrameCodec, SAMPLES_PER_FRAME};
use brivas_gsm_bridge::errors::TransportError;
use brivas_gsm_bridge::mncc::messages::{CallControl, DataFrame, MessageType, MnccMessage, Number};
use brivas_gsm_bridge::mncc::{decode_framed, PacketSink};
use brivas_gsm_bridge::voice::transport::PH_DATA_REQ;
use brivas_gsm_bridge::voice::{VoiceEvent, VoiceEventKind, VoiceTransport, VoiceTransportFactory};
use brivas_gsm_bridge::{
    Bridge, CallId, CallState, Cause, EndpointId, EndpointRequest, EngineCommand, EngineEvent,
    EngineMessage, LinkConfig, PartyInfo, SetupInfo,
};
use bytes::{Bytes, BytesMut};
use std::io;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default, Clone)]
struct Recorder {
    sent: Arc<Mutex<Vec<(usize, u32, Vec<u8>)>>>,
    refuse: bool,
}

struct RecordingTransport {
    index: usize,
    recorder: Recorder,
}

impl VoiceTransport for RecordingTransport {
    fn send(&mut self, prim: u32, payload: &[u8]) -> io::Result<()> {
        self.recorder
            .sent
            .lock()
            .unwrap()
            .push((self.index, prim, payload.to_vec()));
        Ok(())
    }
}

impl VoiceTransportFactory for Recorder {
    fn open(
        &mut self,
        index: usize,
        _call: CallId,
    ) -> Result<Box<dyn VoiceTransport>, TransportError> {
        if self.refuse {
            return Err(TransportError::Activate {
                index,
                source: io::ErrorKind::ConnectionRefused.into(),
            });
        }
        Ok(Box::new(RecordingTransport {
            index,
            recorder: self.clone(),
        }))
    }
}

#[derive(Default)]
struct Wire(BytesMut);

impl PacketSink for Wire {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }
}

struct Harness {
    bridge: Bridge,
    engine: mpsc::UnboundedReceiver<EngineMessage>,
    voice: Recorder,
}

impl Harness {
    fn new() -> Self {
        Self::with_link(LinkConfig::default())
    }

    fn with_link(link: LinkConfig) -> Self {
        Self::with_voice(link, Recorder::default())
    }

    fn with_voice(link: LinkConfig, voice: Recorder) -> Self {
        let (tx, engine) = mpsc::unbounded_channel();
        let bridge = Bridge::new(&link, Box::new(voice.clone()), tx);
        Self {
            bridge,
            engine,
            voice,
        }
    }

    fn played(&self) -> Vec<(usize, u32, Vec<u8>)> {
        self.voice.sent.lock().unwrap().clone()
    }

    /// Flush the queue and decode what went out
    fn sent(&mut self) -> Vec<MnccMessage> {
        let mut wire = Wire::default();
        tokio_test::assert_ok!(self.bridge.queue_mut().flush(&mut wire));
        let mut out = Vec::new();
        while let Some(msg) = decode_framed(&mut wire.0).unwrap() {
            out.push(msg);
        }
        out
    }

    fn engine_events(&mut self) -> Vec<EngineMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.engine.try_recv() {
            out.push(msg);
        }
        out
    }

    fn setup_ind(&mut self, callref: u32, calling: &str) {
        let mut msg = CallControl::new(MessageType::SetupInd, callref);
        msg.calling = Some(Number {
            ntype: 2,
            plan: 1,
            number: calling.to_string(),
            ..Default::default()
        });
        msg.called = Some(Number {
            number: "100".to_string(),
            ..Default::default()
        });
        self.bridge.handle_mncc(msg.into());
    }

    fn dial(&mut self, number: &str) -> CallId {
        let setup = SetupInfo {
            caller: PartyInfo::number("555"),
            dialing: PartyInfo::number(number),
            ..Default::default()
        };
        self.bridge
            .handle_engine(EngineCommand::Dial {
                endpoint: EndpointId(100),
                setup,
            })
            .unwrap()
    }

    fn request(&mut self, call: CallId, request: EndpointRequest) {
        self.bridge.handle_engine(EngineCommand::Message {
            call,
            endpoint: EndpointId(100),
            request,
        });
    }

    fn network(&mut self, msg_type: MessageType, callref: u32) {
        self.bridge
            .handle_mncc(CallControl::new(msg_type, callref).into());
    }
}

fn control(msg: &MnccMessage) -> &CallControl {
    match msg {
        MnccMessage::Control(m) => m,
        MnccMessage::Frame(f) => panic!("unexpected frame for {}", f.callref),
    }
}

fn types(msgs: &[MnccMessage]) -> Vec<MessageType> {
    msgs.iter().map(MnccMessage::msg_type).collect()
}

#[test]
fn inbound_setup_is_acknowledged_and_reported() {
    let mut h = Harness::new();
    h.setup_ind(7, "0301234");

    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::LchanModify, MessageType::CallProcReq]);
    assert_eq!(control(&sent[0]).lchan_mode, 0x01);
    assert!(control(&sent[1]).progress.is_none());

    let events = h.engine_events();
    assert_eq!(events.len(), 1);
    let EngineEvent::Setup(setup) = &events[0].event else {
        panic!("expected setup, got {:?}", events[0].event);
    };
    assert_eq!(setup.caller.id, "0301234");
    assert_eq!(setup.dialing.id, "100");

    let call = h.bridge.call(events[0].call).unwrap();
    assert_eq!(call.state(), CallState::InProceeding);
    assert_eq!(call.history(), &[CallState::InPrepare, CallState::InProceeding]);
    assert_eq!(h.bridge.free_channels(), 29);
}

#[test]
fn duplicate_callref_is_rejected_without_touching_existing_call() {
    let mut h = Harness::new();
    h.setup_ind(7, "0301234");
    h.sent();
    let first = h.engine_events()[0].call;

    h.setup_ind(7, "0309999");
    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::RejReq]);
    assert_eq!(control(&sent[0]).cause.unwrap().value, 47);

    assert!(h.engine_events().is_empty());
    assert_eq!(h.bridge.calls().len(), 1);
    assert_eq!(h.bridge.call(first).unwrap().state(), CallState::InProceeding);
}

#[test]
fn blocked_port_rejects_setup() {
    let mut link = LinkConfig::default();
    link.port.blocked = true;
    let mut h = Harness::with_link(link);
    h.setup_ind(3, "1");
    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::RejReq]);
    assert_eq!(control(&sent[0]).cause.unwrap().value, 27);
    assert!(h.bridge.calls().is_empty());
}

#[test]
fn exhausted_channel_pool_rejects_with_no_circuit() {
    let mut link = LinkConfig::default();
    link.voice_channels = 1;
    let mut h = Harness::with_link(link);
    h.setup_ind(1, "1");
    h.setup_ind(2, "2");

    let sent = h.sent();
    let reject = sent
        .iter()
        .map(control)
        .find(|m| m.msg_type == MessageType::RejReq)
        .unwrap();
    assert_eq!(reject.callref, 2);
    assert_eq!(reject.cause.unwrap().value, 34);

    assert_eq!(h.bridge.run_deferred(), 1);
    assert_eq!(h.bridge.calls().len(), 1);
}

#[test]
fn outbound_call_sends_setup_with_dialed_number() {
    let mut h = Harness::new();
    let id = h.dial("12345");

    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::SetupReq]);
    let setup = control(&sent[0]);
    assert_eq!(setup.called.as_ref().unwrap().number, "12345");
    assert_eq!(setup.clir.inv, 1);
    assert_eq!(setup.clir.sup, 0);
    assert!(!setup.emergency);
    assert_eq!(setup.bearer_cap.as_ref().unwrap().speech_ver, vec![0, -1]);

    let call = h.bridge.call(id).unwrap();
    assert_eq!(setup.callref, call.callref());
    assert_eq!(
        call.history(),
        &[CallState::OutPrepare, CallState::OutSetup, CallState::OutProceeding]
    );

    let events = h.engine_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, EngineEvent::Proceeding);
    assert_eq!(events[0].endpoint, EndpointId(100));
}

#[test]
fn emergency_prefix_marks_setup() {
    let mut h = Harness::new();
    h.dial("EMERG112");
    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::SetupReq]);
    let setup = control(&sent[0]);
    assert!(setup.emergency);
    assert!(setup.called.is_none());
    assert!(setup.bearer_cap.is_none());
    assert_eq!((setup.clir.sup, setup.clir.inv), (0, 0));
}

#[test]
fn empty_number_releases_without_network_message() {
    let mut h = Harness::new();
    let id = h.dial("");

    assert!(h.sent().is_empty());
    assert_eq!(h.bridge.call(id).unwrap().state(), CallState::Release);

    let events = h.engine_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, EngineEvent::Release(Cause::new(28, 1)));

    assert_eq!(h.bridge.run_deferred(), 1);
    assert!(h.bridge.call(id).is_none());
    assert_eq!(h.bridge.free_channels(), 30);
}

#[test]
fn connection_loss_releases_every_call() {
    let mut h = Harness::new();
    for callref in 1..=3 {
        h.setup_ind(callref, "0301234");
    }
    let outbound = h.dial("777");
    h.engine_events();
    assert!(!h.bridge.queue().is_empty());

    assert_eq!(h.bridge.connection_lost(), 4);
    assert_eq!(h.bridge.queue().len(), 0);

    for call in h.bridge.calls().iter() {
        assert_eq!(call.state(), CallState::Release);
    }
    let events = h.engine_events();
    assert_eq!(events.len(), 4);
    for msg in &events {
        assert_eq!(msg.event, EngineEvent::Release(Cause::new(27, 1)));
    }
    assert!(events.iter().any(|m| m.call == outbound));

    assert_eq!(h.bridge.run_deferred(), 4);
    assert!(h.bridge.calls().is_empty());
    assert_eq!(h.bridge.free_channels(), 30);
}

#[test]
fn pending_notify_is_flushed_once_on_connect() {
    let mut h = Harness::new();
    let id = h.dial("200");
    let callref = h.bridge.call(id).unwrap().callref();
    h.sent();

    h.request(id, EndpointRequest::Notify(0x81));
    h.request(id, EndpointRequest::Notify(0x83));
    assert!(h.sent().is_empty());
    assert_eq!(h.bridge.call(id).unwrap().pending_notify(), Some(0x03));

    h.network(MessageType::SetupCnf, callref);
    let sent = h.sent();
    assert_eq!(
        types(&sent),
        vec![
            MessageType::SetupComplReq,
            MessageType::FrameRecv,
            MessageType::NotifyReq
        ]
    );
    assert_eq!(control(&sent[2]).notify, 0x03);

    let call = h.bridge.call(id).unwrap();
    assert_eq!(call.state(), CallState::Connect);
    assert_eq!(call.pending_notify(), None);

    h.network(MessageType::SetupComplInd, callref);
    assert!(h.sent().is_empty());
}

#[test]
fn inbound_call_answers_and_clears() {
    let mut h = Harness::new();
    h.setup_ind(9, "0301234");
    h.sent();
    let id = h.engine_events()[0].call;
    let endpoint = h.bridge.call(id).unwrap().endpoints()[0];

    h.bridge.handle_engine(EngineCommand::Message {
        call: id,
        endpoint,
        request: EndpointRequest::Alerting,
    });
    h.bridge.handle_engine(EngineCommand::Message {
        call: id,
        endpoint,
        request: EndpointRequest::Connect(PartyInfo::number("100")),
    });
    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::AlertReq, MessageType::SetupRsp]);
    let connected = control(&sent[1]).connected.as_ref().unwrap();
    assert_eq!((connected.number.as_str(), connected.plan), ("100", 1));

    h.network(MessageType::SetupComplInd, 9);
    assert_eq!(types(&h.sent()), vec![MessageType::FrameRecv]);

    h.bridge
        .handle_mncc(CallControl::new(MessageType::DiscInd, 9).with_cause(0, 17).into());
    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::RelReq]);
    assert!(control(&sent[0]).cause.is_none());

    let events = h.engine_events();
    assert_eq!(events.last().unwrap().event, EngineEvent::Release(Cause::new(17, 0)));
    assert_eq!(
        h.bridge.call(id).unwrap().history(),
        &[
            CallState::InPrepare,
            CallState::InProceeding,
            CallState::InAlerting,
            CallState::Connect,
            CallState::Release
        ]
    );
    assert_eq!(h.bridge.run_deferred(), 1);
}

#[test]
fn endpoint_disconnect_outside_allow_list_is_ignored() {
    let mut h = Harness::new();
    let id = h.dial("");
    h.request(id, EndpointRequest::Disconnect(Cause::default()));
    assert!(h.sent().is_empty());
    assert_eq!(h.bridge.call(id).unwrap().state(), CallState::Release);
}

#[test]
fn hold_and_dtmf_only_in_connect() {
    let mut h = Harness::new();
    let id = h.dial("300");
    let callref = h.bridge.call(id).unwrap().callref();
    h.network(MessageType::HoldInd, callref);
    assert!(h.sent().iter().all(|m| m.msg_type() != MessageType::HoldCnf));

    h.network(MessageType::SetupCnf, callref);
    h.sent();
    h.engine_events();

    h.network(MessageType::HoldInd, callref);
    let mut dtmf = CallControl::new(MessageType::StartDtmfInd, callref);
    dtmf.keypad = Some(b'5');
    h.bridge.handle_mncc(dtmf.into());

    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::HoldCnf, MessageType::StartDtmfRsp]);
    assert_eq!(control(&sent[1]).keypad, Some(b'5'));

    let events: Vec<_> = h.engine_events().into_iter().map(|m| m.event).collect();
    assert_eq!(events, vec![EngineEvent::Notify(0xf9), EngineEvent::Dtmf('5')]);
}

#[test]
fn voice_samples_become_traffic_frames_once_bridged() {
    let mut h = Harness::new();
    let id = h.dial("400");
    let callref = h.bridge.call(id).unwrap().callref();
    let index = h.bridge.call(id).unwrap().voice().unwrap().index().unwrap();
    h.sent();

    let samples = VoiceEvent {
        call: id,
        index,
        kind: VoiceEventKind::Data(Bytes::from(vec![0xd5; 160])),
    };
    h.bridge.handle_voice(samples.clone());
    assert!(h.sent().is_empty());

    h.network(MessageType::SetupCnf, callref);
    h.sent();
    h.bridge.handle_voice(samples);
    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::TchfFrame]);
    assert_eq!(sent[0].callref(), callref);
}

#[test]
fn tones_bridge_voice_before_connect() {
    let mut link = LinkConfig::default();
    link.port.tones = true;
    let mut h = Harness::with_link(link);
    h.setup_ind(5, "0301234");

    let sent = h.sent();
    assert_eq!(
        types(&sent),
        vec![
            MessageType::LchanModify,
            MessageType::CallProcReq,
            MessageType::FrameRecv
        ]
    );
    assert_eq!(control(&sent[1]).progress.unwrap().descr, 8);
    let id = h.engine_events()[0].call;
    let call = h.bridge.call(id).unwrap();
    assert_eq!(call.state(), CallState::InProceeding);
    assert!(call.is_tch_bridged());

    // already bridged, the disconnect only carries the tones indicator
    h.request(id, EndpointRequest::Disconnect(Cause::new(16, 0)));
    let sent = h.sent();
    assert_eq!(types(&sent), vec![MessageType::DiscReq]);
    assert!(control(&sent[0]).progress.is_some());
}

#[test]
fn early_b_bridges_on_remote_proceeding() {
    let mut link = LinkConfig::default();
    link.port.early_b = true;
    let mut h = Harness::with_link(link);
    let id = h.dial("600");
    let callref = h.bridge.call(id).unwrap().callref();
    h.sent();
    h.engine_events();

    h.network(MessageType::CallProcInd, callref);
    assert_eq!(types(&h.sent()), vec![MessageType::FrameRecv]);
    assert!(h.bridge.call(id).unwrap().is_tch_bridged());
    assert_eq!(h.engine_events()[0].event, EngineEvent::Proceeding);

    h.network(MessageType::AlertInd, callref);
    assert!(h.sent().is_empty());
    assert_eq!(h.bridge.call(id).unwrap().state(), CallState::OutAlerting);
}

#[test]
fn remote_proceeding_without_early_b_keeps_voice_idle() {
    let mut h = Harness::new();
    let id = h.dial("601");
    let callref = h.bridge.call(id).unwrap().callref();
    h.sent();

    h.network(MessageType::CallProcInd, callref);
    h.network(MessageType::AlertInd, callref);
    assert!(h.sent().is_empty());
    assert!(!h.bridge.call(id).unwrap().is_tch_bridged());
}

#[test]
fn voice_failure_on_dial_releases_without_setup() {
    let voice = Recorder {
        refuse: true,
        ..Default::default()
    };
    let mut h = Harness::with_voice(LinkConfig::default(), voice);
    let id = h.dial("700");

    assert!(h.sent().is_empty());
    let events = h.engine_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, EngineEvent::Release(Cause::new(34, 1)));
    assert_eq!(h.bridge.call(id).unwrap().state(), CallState::Release);

    assert_eq!(h.bridge.run_deferred(), 1);
    assert_eq!(h.bridge.free_channels(), 30);
}

#[test]
fn traffic_frames_play_out_after_activation() {
    let mut h = Harness::new();
    let id = h.dial("800");
    let callref = h.bridge.call(id).unwrap().callref();
    let index = h.bridge.call(id).unwrap().voice().unwrap().index().unwrap();
    h.network(MessageType::SetupCnf, callref);
    h.sent();

    let mut codec = FrameCodec::new().unwrap();
    let frame = DataFrame {
        msg_type: MessageType::TchfFrame,
        callref,
        data: codec.encode(&[0; SAMPLES_PER_FRAME]),
    };
    h.bridge.handle_mncc(frame.clone().into());
    assert!(h.played().is_empty());

    h.bridge.handle_voice(VoiceEvent {
        call: id,
        index,
        kind: VoiceEventKind::Activated,
    });
    h.bridge.handle_mncc(frame.into());
    let played = h.played();
    assert_eq!(played.len(), 1);
    assert_eq!((played[0].0, played[0].1), (index, PH_DATA_REQ));
    assert_eq!(played[0].2.len(), SAMPLES_PER_FRAME);
}

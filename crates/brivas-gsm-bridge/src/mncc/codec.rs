//! MNCC record encoding/decoding
//!
//! Records are fixed layout, big-endian. On the stream socket every record
//! is preceded by a 4-byte length so one read yields whole messages.

use super::messages::*;
use crate::errors::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Bytes of the NUL-padded number field
const NUMBER_FIELD_LEN: usize = MAX_NUMBER_LEN + 1;
/// Speech version slots in the bearer capability
const SPEECH_VER_SLOTS: usize = 8;
/// Bytes of the NUL-padded IMSI field
const IMSI_FIELD_LEN: usize = MAX_IMSI_LEN + 1;

const HEADER_LEN: usize = 12;
const NUMBER_GROUP_LEN: usize = 4 + NUMBER_FIELD_LEN;
const BEARER_GROUP_LEN: usize = 5 + SPEECH_VER_SLOTS;
const USERUSER_GROUP_LEN: usize = 2 + MAX_USERUSER_LEN;

/// Length of an encoded call-control record
pub const CONTROL_RECORD_LEN: usize = HEADER_LEN
    + 4 * NUMBER_GROUP_LEN
    + BEARER_GROUP_LEN
    + 3 // cause
    + 3 // progress
    + USERUSER_GROUP_LEN
    + 6 // keypad, emergency, clir sup/inv, notify, lchan mode
    + IMSI_FIELD_LEN;

/// Length of an encoded voice frame record
pub const FRAME_RECORD_LEN: usize = 8 + TCHF_FRAME_LEN;

/// Upper bound accepted for a framed record
pub const MAX_FRAME_LEN: usize = 4096;

/// Encode a message into its record form
pub fn encode_message(msg: &MnccMessage) -> BytesMut {
    match msg {
        MnccMessage::Control(m) => encode_control(m),
        MnccMessage::Frame(f) => encode_data_frame(f),
    }
}

/// Encode a message with its length prefix
pub fn encode_framed(msg: &MnccMessage) -> BytesMut {
    let record = encode_message(msg);
    let mut buf = BytesMut::with_capacity(4 + record.len());
    buf.put_u32(record.len() as u32);
    buf.put_slice(&record);
    buf
}

/// Split one length-prefixed record off the front of `buf`.
///
/// Returns `Ok(None)` until a complete record is buffered. An oversized
/// length means the stream lost its framing and cannot be resynchronised.
pub fn split_record(buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
    if buf.len() < 4 {
        return Ok(None);
    }
    let len = (&buf[..4]).get_u32() as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    if buf.len() < 4 + len {
        return Ok(None);
    }
    buf.advance(4);
    Ok(Some(buf.split_to(len).freeze()))
}

/// Split and decode one length-prefixed record
pub fn decode_framed(buf: &mut BytesMut) -> Result<Option<MnccMessage>, ProtocolError> {
    match split_record(buf)? {
        Some(record) => decode_message(&record).map(Some),
        None => Ok(None),
    }
}

/// Decode a record
pub fn decode_message(mut data: &[u8]) -> Result<MnccMessage, ProtocolError> {
    ensure(data, 8)?;
    let msg_type = MessageType::from_u32((&data[..4]).get_u32());
    if msg_type == MessageType::TchfFrame {
        ensure(data, FRAME_RECORD_LEN)?;
        data.advance(4);
        let callref = data.get_u32();
        let mut frame = [0u8; TCHF_FRAME_LEN];
        data.copy_to_slice(&mut frame);
        return Ok(MnccMessage::Frame(DataFrame {
            msg_type,
            callref,
            data: frame,
        }));
    }

    ensure(data, CONTROL_RECORD_LEN)?;
    data.advance(4);
    let callref = data.get_u32();
    let flags = data.get_u32();
    let present = |flag: u32| flags & flag != 0;

    let mut msg = CallControl::new(msg_type, callref);
    let calling = get_number(&mut data);
    let called = get_number(&mut data);
    let connected = get_number(&mut data);
    let redirecting = get_number(&mut data);
    msg.calling = present(fields::CALLING).then_some(calling);
    msg.called = present(fields::CALLED).then_some(called);
    msg.connected = present(fields::CONNECTED).then_some(connected);
    msg.redirecting = present(fields::REDIRECTING).then_some(redirecting);

    let bearer_cap = get_bearer_cap(&mut data);
    msg.bearer_cap = present(fields::BEARER_CAP).then_some(bearer_cap);

    let cause = CauseIe {
        location: data.get_u8(),
        coding: data.get_u8(),
        value: data.get_u8(),
    };
    msg.cause = present(fields::CAUSE).then_some(cause);

    let progress = Progress {
        coding: data.get_u8(),
        location: data.get_u8(),
        descr: data.get_u8(),
    };
    msg.progress = present(fields::PROGRESS).then_some(progress);

    let proto = data.get_u8();
    let len = (data.get_u8() as usize).min(MAX_USERUSER_LEN);
    let info = data[..len].to_vec();
    data.advance(MAX_USERUSER_LEN);
    msg.useruser = present(fields::USERUSER).then_some(UserUserIe { proto, info });

    let keypad = data.get_u8();
    msg.keypad = present(fields::KEYPAD).then_some(keypad);
    let emergency = data.get_u8();
    msg.emergency = present(fields::EMERGENCY) || emergency != 0;
    msg.clir = Clir {
        sup: data.get_u8(),
        inv: data.get_u8(),
    };
    msg.notify = data.get_u8();
    msg.lchan_mode = data.get_u8();
    msg.imsi = get_string(&mut data, IMSI_FIELD_LEN);

    Ok(MnccMessage::Control(msg))
}

fn encode_control(m: &CallControl) -> BytesMut {
    let mut buf = BytesMut::with_capacity(CONTROL_RECORD_LEN);
    buf.put_u32(m.msg_type.to_u32());
    buf.put_u32(m.callref);
    buf.put_u32(m.fields());

    for number in [&m.calling, &m.called, &m.connected, &m.redirecting] {
        put_number(&mut buf, number.as_ref());
    }
    put_bearer_cap(&mut buf, m.bearer_cap.as_ref());

    let cause = m.cause.unwrap_or_default();
    buf.put_u8(cause.location);
    buf.put_u8(cause.coding);
    buf.put_u8(cause.value);

    let progress = m.progress.unwrap_or_default();
    buf.put_u8(progress.coding);
    buf.put_u8(progress.location);
    buf.put_u8(progress.descr);

    match &m.useruser {
        Some(uu) => {
            let len = uu.info.len().min(MAX_USERUSER_LEN);
            buf.put_u8(uu.proto);
            buf.put_u8(len as u8);
            buf.put_slice(&uu.info[..len]);
            buf.put_bytes(0, MAX_USERUSER_LEN - len);
        }
        None => buf.put_bytes(0, USERUSER_GROUP_LEN),
    }

    buf.put_u8(m.keypad.unwrap_or(0));
    buf.put_u8(m.emergency as u8);
    buf.put_u8(m.clir.sup);
    buf.put_u8(m.clir.inv);
    buf.put_u8(m.notify);
    buf.put_u8(m.lchan_mode);
    put_string(&mut buf, &m.imsi, IMSI_FIELD_LEN);

    debug_assert_eq!(buf.len(), CONTROL_RECORD_LEN);
    buf
}

fn encode_data_frame(f: &DataFrame) -> BytesMut {
    let mut buf = BytesMut::with_capacity(FRAME_RECORD_LEN);
    buf.put_u32(f.msg_type.to_u32());
    buf.put_u32(f.callref);
    buf.put_slice(&f.data);
    buf
}

fn ensure(data: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if data.len() < needed {
        return Err(ProtocolError::Truncated {
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

fn put_number(buf: &mut BytesMut, number: Option<&Number>) {
    match number {
        Some(n) => {
            buf.put_u8(n.ntype);
            buf.put_u8(n.plan);
            buf.put_u8(n.present);
            buf.put_u8(n.screen);
            put_string(buf, &n.number, NUMBER_FIELD_LEN);
        }
        None => buf.put_bytes(0, NUMBER_GROUP_LEN),
    }
}

fn get_number(data: &mut &[u8]) -> Number {
    Number {
        ntype: data.get_u8(),
        plan: data.get_u8(),
        present: data.get_u8(),
        screen: data.get_u8(),
        number: get_string(data, NUMBER_FIELD_LEN),
    }
}

fn put_bearer_cap(buf: &mut BytesMut, cap: Option<&BearerCap>) {
    let Some(cap) = cap else {
        buf.put_bytes(0, BEARER_GROUP_LEN);
        return;
    };
    buf.put_u8(cap.transfer);
    buf.put_u8(cap.mode);
    buf.put_u8(cap.coding);
    buf.put_u8(cap.radio);
    buf.put_u8(cap.speech_ctm);
    let versions = cap.speech_ver.iter().take_while(|v| **v >= 0);
    let mut written = 0;
    for ver in versions.take(SPEECH_VER_SLOTS - 1) {
        buf.put_i8(*ver);
        written += 1;
    }
    // end of list
    for _ in written..SPEECH_VER_SLOTS {
        buf.put_i8(-1);
    }
}

fn get_bearer_cap(data: &mut &[u8]) -> BearerCap {
    let mut cap = BearerCap {
        transfer: data.get_u8(),
        mode: data.get_u8(),
        coding: data.get_u8(),
        radio: data.get_u8(),
        speech_ctm: data.get_u8(),
        speech_ver: Vec::new(),
    };
    let mut terminated = false;
    for _ in 0..SPEECH_VER_SLOTS {
        let ver = data.get_i8();
        if ver < 0 {
            terminated = true;
        }
        if !terminated {
            cap.speech_ver.push(ver);
        }
    }
    cap.speech_ver.push(-1);
    cap
}

/// Write `s` NUL-padded into `width` bytes, truncating to leave the terminator
fn put_string(buf: &mut BytesMut, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(width - 1);
    buf.put_slice(&bytes[..len]);
    buf.put_bytes(0, width - len);
}

fn get_string(data: &mut &[u8], width: usize) -> String {
    let field = &data[..width];
    let end = field.iter().position(|b| *b == 0).unwrap_or(width);
    let s = String::from_utf8_lossy(&field[..end]).into_owned();
    data.advance(width);
    s
}

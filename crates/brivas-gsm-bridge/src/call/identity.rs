//! Conversion between MNCC field groups and engine identity records

use crate::config::PortSettings;
use crate::mncc::messages::{BearerCap, Number};
use crate::types::{
    BearerCapability, BearerMode, CapabilityInfo, Law, NumberType, PartyInfo, Presentation,
    Screening,
};

/// Build a party identity from an optional number group, falling back to
/// the subscriber IMSI when no number is given
pub(super) fn decode_party(number: Option<&Number>, imsi: &str, port: &PortSettings) -> PartyInfo {
    let mut party = PartyInfo {
        imsi: imsi.to_string(),
        interface: port.interface.clone(),
        port: port.port_number,
        ..Default::default()
    };
    match number {
        Some(n) if !n.number.is_empty() => {
            party.id = n.number.clone();
            party.ntype = match n.ntype {
                1 => NumberType::International,
                2 => NumberType::National,
                4 => NumberType::Subscriber,
                _ => NumberType::Unknown,
            };
            party.present = match n.present {
                1 => Presentation::Restricted,
                2 => Presentation::NotAvailable,
                _ => Presentation::Allowed,
            };
            party.screen = match n.screen {
                0 => Screening::User,
                1 => Screening::UserVerifiedPassed,
                2 => Screening::UserVerifiedFailed,
                _ => Screening::Network,
            };
        }
        _ if !imsi.is_empty() => {
            party.id = format!("imsi-{imsi}");
            party.ntype = NumberType::Unknown;
        }
        _ => {}
    }
    party
}

/// Encode a party identity as a number group; `None` when not present
pub(super) fn encode_party(party: &PartyInfo) -> Option<Number> {
    let ntype = match party.ntype {
        NumberType::NotPresent => return None,
        NumberType::Unknown => 0,
        NumberType::International => 1,
        NumberType::National => 2,
        NumberType::Subscriber => 4,
    };
    let present = match party.present {
        Presentation::Allowed => 0,
        Presentation::Restricted => 1,
        Presentation::NotAvailable => 2,
    };
    let screen = match party.screen {
        Screening::User => 0,
        _ => 3,
    };
    Some(Number {
        ntype,
        plan: 1,
        present,
        screen,
        number: party.id.clone(),
    })
}

/// Called-party number group of an outgoing setup
pub(super) fn called_number(dialing: &str) -> Number {
    Number {
        ntype: 0,
        plan: 1,
        number: dialing.to_string(),
        ..Default::default()
    }
}

/// Media description from a bearer capability group; speech when absent
pub(super) fn decode_capability(cap: Option<&BearerCap>, law: Law) -> CapabilityInfo {
    let (capability, mode) = match cap {
        Some(cap) => (
            match cap.transfer {
                1 => BearerCapability::DataUnrestricted,
                2 | 3 => BearerCapability::Audio,
                _ => BearerCapability::Speech,
            },
            match cap.mode {
                1 => BearerMode::Packet,
                _ => BearerMode::Circuit,
            },
        ),
        None => (BearerCapability::Speech, BearerMode::Circuit),
    };
    CapabilityInfo {
        capability,
        mode,
        info1: law.bearer_info1(),
    }
}

/// Bearer capability group of an outgoing setup
pub(super) fn encode_capability(info: &CapabilityInfo) -> BearerCap {
    let transfer = match info.capability {
        BearerCapability::DataUnrestricted | BearerCapability::DataRestricted => 1,
        BearerCapability::Speech => 0,
        BearerCapability::Audio => 2,
    };
    BearerCap {
        transfer,
        mode: u8::from(info.mode == BearerMode::Packet),
        coding: 0,
        radio: 1,
        speech_ctm: 0,
        speech_ver: vec![0, -1],
    }
}

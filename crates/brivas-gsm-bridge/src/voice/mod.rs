//! Voice relay between the GSM traffic channel and the voice transport
//!
//! A [`VoiceChannel`] accumulates line-encoded samples from its transport
//! into 160-sample blocks, encodes each full block into a traffic frame for
//! the GSM stack, and plays frames coming from the stack back out.

pub mod transport;

pub use transport::{
    UnixVoiceFactory, VoiceEvent, VoiceEventKind, VoiceTransport, VoiceTransportFactory,
};

use crate::audio::{FrameCodec, LawTables, FRAME_LEN, SAMPLES_PER_FRAME};
use crate::errors::{CodecError, TransportError};
use crate::types::{CallId, Law};
use metrics::counter;
use tracing::{debug, warn};
use transport::PH_DATA_REQ;

/// Fixed set of voice channel indices owned by a link
#[derive(Debug, Clone)]
pub struct ChannelPool {
    in_use: Vec<bool>,
}

impl ChannelPool {
    pub fn new(size: usize) -> Self {
        Self {
            in_use: vec![false; size],
        }
    }

    /// Claim the lowest free index
    pub fn hunt(&mut self) -> Option<usize> {
        let index = self.in_use.iter().position(|used| !used)?;
        self.in_use[index] = true;
        Some(index)
    }

    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.in_use.get_mut(index) {
            *slot = false;
        }
    }

    pub fn available(&self) -> usize {
        self.in_use.iter().filter(|used| !**used).count()
    }
}

/// Per-call voice relay
pub struct VoiceChannel {
    index: Option<usize>,
    transport: Option<Box<dyn VoiceTransport>>,
    active: bool,
    tch_connected: bool,
    rx_buf: [i16; SAMPLES_PER_FRAME],
    rx_pos: usize,
    codec: FrameCodec,
    law: LawTables,
}

impl VoiceChannel {
    /// Allocate the codec state for a new channel
    pub fn new(law: Law) -> Result<Self, CodecError> {
        Ok(Self {
            index: None,
            transport: None,
            active: false,
            tch_connected: false,
            rx_buf: [0; SAMPLES_PER_FRAME],
            rx_pos: 0,
            codec: FrameCodec::new()?,
            law: LawTables::new(law),
        })
    }

    /// Bind and activate the transport for `index`
    pub fn open(
        &mut self,
        factory: &mut dyn VoiceTransportFactory,
        index: usize,
        call: CallId,
    ) -> Result<(), TransportError> {
        if self.transport.is_some() {
            return Err(TransportError::AlreadyOpen(index));
        }
        match factory.open(index, call) {
            Ok(transport) => {
                // active once the lower layer confirms with PH_ACTIVATE_IND
                self.transport = Some(transport);
                self.index = Some(index);
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    /// Release the transport; safe to call repeatedly
    pub fn close(&mut self) {
        if let Some(index) = self.index.take() {
            debug!(index, "Voice channel closed");
        }
        self.transport = None;
        self.active = false;
        self.tch_connected = false;
        self.rx_pos = 0;
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_tch_connected(&self) -> bool {
        self.tch_connected
    }

    /// Gate the uplink path on the traffic channel being bridged
    pub fn set_tch_connected(&mut self, connected: bool) {
        self.tch_connected = connected;
        if !connected {
            self.rx_pos = 0;
        }
    }

    /// Apply a transport event, returning any frames completed by it
    pub fn handle_event(&mut self, kind: VoiceEventKind) -> Vec<[u8; FRAME_LEN]> {
        match kind {
            VoiceEventKind::Activated => {
                self.active = true;
                Vec::new()
            }
            VoiceEventKind::Deactivated => {
                self.active = false;
                Vec::new()
            }
            VoiceEventKind::Data(data) => self.receive_bytes(&data),
        }
    }

    /// Accumulate line-encoded samples and encode every completed block
    pub fn receive_bytes(&mut self, data: &[u8]) -> Vec<[u8; FRAME_LEN]> {
        let mut frames = Vec::new();
        if !self.tch_connected {
            return frames;
        }
        for &octet in data {
            self.rx_buf[self.rx_pos] = self.law.to_linear(octet);
            self.rx_pos += 1;
            if self.rx_pos == SAMPLES_PER_FRAME {
                frames.push(self.codec.encode(&self.rx_buf));
                self.rx_pos = 0;
            }
        }
        counter!("gsm_voice_frames_total", "direction" => "to_gsm").increment(frames.len() as u64);
        frames
    }

    /// Decode a frame from the GSM stack and play it out
    pub fn receive_frame(&mut self, frame: &[u8]) {
        if !self.active {
            return;
        }
        let samples = match self.codec.decode(frame) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(index = ?self.index, "Dropping traffic frame: {}", e);
                return;
            }
        };
        let mut out = [0u8; SAMPLES_PER_FRAME];
        for (octet, &sample) in out.iter_mut().zip(&samples) {
            *octet = self.law.to_law(sample);
        }
        if let Some(transport) = self.transport.as_mut() {
            if let Err(e) = transport.send(PH_DATA_REQ, &out) {
                warn!(index = ?self.index, "Voice send failed: {}", e);
                return;
            }
            counter!("gsm_voice_frames_total", "direction" => "from_gsm").increment(1);
        }
    }
}

impl std::fmt::Debug for VoiceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceChannel")
            .field("index", &self.index)
            .field("active", &self.active)
            .field("tch_connected", &self.tch_connected)
            .field("rx_pos", &self.rx_pos)
            .finish()
    }
}

impl Drop for VoiceChannel {
    fn drop(&mut self) {
        self.close();
    }
}

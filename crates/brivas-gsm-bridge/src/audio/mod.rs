//! Voice codecs between the GSM traffic channel and the voice transport

pub mod gsm610;
pub mod law;

pub use gsm610::{FRAME_LEN, SAMPLES_PER_FRAME};
pub use law::LawTables;

use crate::errors::CodecError;

/// Encoder/decoder pair for one voice channel
#[derive(Debug, Clone)]
pub struct FrameCodec {
    encoder: gsm610::Encoder,
    decoder: gsm610::Decoder,
}

impl FrameCodec {
    /// Allocate fresh codec state; fails when memory is exhausted
    pub fn new() -> Result<Self, CodecError> {
        Ok(Self {
            encoder: gsm610::Encoder::new()?,
            decoder: gsm610::Decoder::new()?,
        })
    }

    /// Compress one block of samples heading towards the GSM stack
    pub fn encode(&mut self, samples: &[i16; SAMPLES_PER_FRAME]) -> [u8; FRAME_LEN] {
        self.encoder.encode(samples)
    }

    /// Expand one traffic frame coming from the GSM stack
    pub fn decode(&mut self, frame: &[u8]) -> Result<[i16; SAMPLES_PER_FRAME], CodecError> {
        self.decoder.decode(frame)
    }
}

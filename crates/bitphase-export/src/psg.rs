//! PSG register-dump encoder.
//!
//! Layout: `PSG\x1A` followed by 12 reserved zero bytes, then one `0xFF`
//! marker per frame with `(register, value)` pairs for the registers that
//! changed since the previous frame, and a closing `0xFD`.

use bitphase_ay::RegisterFrame;

/// File signature.
pub const PSG_MAGIC: [u8; 4] = *b"PSG\x1A";
/// Header length including the signature.
pub const PSG_HEADER_LEN: usize = 16;
/// Frame marker.
pub const FRAME_MARKER: u8 = 0xFF;
/// End-of-stream marker.
pub const END_MARKER: u8 = 0xFD;

const ENVELOPE_SHAPE: usize = 13;

/// Incremental PSG writer.
#[derive(Debug, Clone)]
pub struct PsgEncoder {
    out: Vec<u8>,
    previous: Option<[u8; 14]>,
    frames: usize,
}

impl Default for PsgEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PsgEncoder {
    /// Starts a stream with the header written.
    pub fn new() -> Self {
        let mut out = Vec::with_capacity(4096);
        out.extend_from_slice(&PSG_MAGIC);
        out.resize(PSG_HEADER_LEN, 0);
        Self {
            out,
            previous: None,
            frames: 0,
        }
    }

    /// Appends one frame.
    ///
    /// The first frame writes every register below R13; afterwards only
    /// changed registers are written. R13 is written when the envelope is
    /// retriggered, since writing it restarts the envelope.
    pub fn push_frame(&mut self, frame: &RegisterFrame) {
        self.out.push(FRAME_MARKER);
        for (register, &value) in frame.registers.iter().enumerate().take(ENVELOPE_SHAPE) {
            let changed = self.previous.is_none_or(|previous| previous[register] != value);
            if changed {
                self.out.extend_from_slice(&[register as u8, value]);
            }
        }
        if frame.envelope_retrigger {
            self.out
                .extend_from_slice(&[ENVELOPE_SHAPE as u8, frame.registers[ENVELOPE_SHAPE]]);
        }
        self.previous = Some(frame.registers);
        self.frames += 1;
    }

    /// Frames written so far.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Closes the stream and returns its bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.out.push(END_MARKER);
        self.out
    }
}

/// Encodes a complete frame sequence.
pub fn encode_psg(frames: &[RegisterFrame]) -> Vec<u8> {
    let mut encoder = PsgEncoder::new();
    for frame in frames {
        encoder.push_frame(frame);
    }
    encoder.finish()
}

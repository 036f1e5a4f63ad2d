//! RIFF/WAVE encoder.
//!
//! Output is the canonical 44-byte header, the sample data and an optional
//! trailing `LIST/INFO` chunk carrying title, artist, album, year and comment.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

/// Sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// 16-bit signed PCM.
    #[default]
    Pcm16,
    /// 24-bit signed PCM.
    Pcm24,
    /// 32-bit IEEE float.
    Float32,
}

impl BitDepth {
    /// Encoding for a bit count (16, 24 or 32).
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            16 => Some(Self::Pcm16),
            24 => Some(Self::Pcm24),
            32 => Some(Self::Float32),
            _ => None,
        }
    }

    /// Bits per sample.
    pub fn bits(self) -> u16 {
        match self {
            Self::Pcm16 => 16,
            Self::Pcm24 => 24,
            Self::Float32 => 32,
        }
    }

    fn bytes(self) -> u16 {
        self.bits() / 8
    }

    /// `fmt ` chunk format tag: 1 = PCM, 3 = IEEE float.
    pub fn audio_format(self) -> u16 {
        match self {
            Self::Float32 => 3,
            Self::Pcm16 | Self::Pcm24 => 1,
        }
    }
}

/// Stream layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Sample encoding.
    pub bit_depth: BitDepth,
}

/// `LIST/INFO` fields; empty fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WavMetadata {
    /// `INAM`
    pub title: String,
    /// `IART`
    pub artist: String,
    /// `IPRD`
    pub album: String,
    /// `ICRD`
    pub year: String,
    /// `ICMT`
    pub comment: String,
}

impl WavMetadata {
    /// Returns `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self.fields().all(|(_, value)| value.is_empty())
    }

    fn fields(&self) -> impl Iterator<Item = (&'static [u8; 4], &str)> {
        [
            (b"INAM", self.title.as_str()),
            (b"IART", self.artist.as_str()),
            (b"IPRD", self.album.as_str()),
            (b"ICRD", self.year.as_str()),
            (b"ICMT", self.comment.as_str()),
        ]
        .into_iter()
    }

    /// Encoded `LIST` chunk, `None` when there is nothing to write.
    fn list_chunk(&self) -> Option<Vec<u8>> {
        if self.is_empty() {
            return None;
        }
        let mut body = b"INFO".to_vec();
        for (id, value) in self.fields().filter(|(_, v)| !v.is_empty()) {
            let mut text: Vec<u8> = value
                .chars()
                .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
                .collect();
            text.push(0);
            body.extend_from_slice(id);
            body.extend_from_slice(&(text.len() as u32).to_le_bytes());
            let odd = text.len() % 2 == 1;
            body.extend(text);
            if odd {
                body.push(0);
            }
        }
        let mut chunk = b"LIST".to_vec();
        chunk.extend_from_slice(&(body.len() as u32).to_le_bytes());
        chunk.extend(body);
        Some(chunk)
    }
}

/// Encodes interleaved samples (-1.0..=1.0) into a complete WAV file.
pub fn encode_wav(samples: &[f32], spec: &WavSpec, metadata: &WavMetadata) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(44 + samples.len() * usize::from(spec.bit_depth.bytes()));
    write_wav(&mut out, samples, spec, metadata)?;
    Ok(out)
}

/// Writes interleaved samples as a WAV stream.
pub fn write_wav<W: Write>(
    out: &mut W,
    samples: &[f32],
    spec: &WavSpec,
    metadata: &WavMetadata,
) -> io::Result<()> {
    let bytes_per_sample = u32::from(spec.bit_depth.bytes());
    let data_len = samples.len() as u32 * bytes_per_sample;
    let pad = data_len % 2;
    let list = metadata.list_chunk();
    let list_len = list.as_ref().map_or(0, |chunk| chunk.len() as u32);
    let block_align = spec.channels * spec.bit_depth.bytes();

    out.write_all(b"RIFF")?;
    out.write_u32::<LittleEndian>(36 + data_len + pad + list_len)?;
    out.write_all(b"WAVE")?;

    out.write_all(b"fmt ")?;
    out.write_u32::<LittleEndian>(16)?;
    out.write_u16::<LittleEndian>(spec.bit_depth.audio_format())?;
    out.write_u16::<LittleEndian>(spec.channels)?;
    out.write_u32::<LittleEndian>(spec.sample_rate)?;
    out.write_u32::<LittleEndian>(spec.sample_rate * u32::from(block_align))?;
    out.write_u16::<LittleEndian>(block_align)?;
    out.write_u16::<LittleEndian>(spec.bit_depth.bits())?;

    out.write_all(b"data")?;
    out.write_u32::<LittleEndian>(data_len)?;
    for &sample in samples {
        let sample = sample.clamp(-1.0, 1.0);
        match spec.bit_depth {
            BitDepth::Pcm16 => out.write_i16::<LittleEndian>((sample * i16::MAX as f32) as i16)?,
            BitDepth::Pcm24 => out.write_i24::<LittleEndian>((sample * 8_388_607.0) as i32)?,
            BitDepth::Float32 => out.write_f32::<LittleEndian>(sample)?,
        }
    }
    if pad == 1 {
        out.write_u8(0)?;
    }
    if let Some(list) = list {
        out.write_all(&list)?;
    }
    Ok(())
}

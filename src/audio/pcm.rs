//! Linear PCM encoding
//!
//! Pure conversion from float samples to 16-bit signed PCM and a
//! deterministic in-memory WAVE container builder. No I/O, no state.

/// Bytes in a canonical RIFF/WAVE header (mono 16-bit PCM, no extra chunks).
pub const WAV_HEADER_LEN: usize = 44;

/// Convert float samples in [-1.0, 1.0] to signed 16-bit PCM.
///
/// Each sample is clamped, then scaled by 32768 when negative and 32767
/// otherwise, truncating toward zero. The asymmetric scaling is the standard
/// signed-PCM convention: -1.0 maps to -32768 and 1.0 to 32767.
///
/// Non-finite inputs are clamped like any out-of-range value.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let s = sample.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

/// Encode float samples as a complete mono 16-bit WAVE file in memory.
///
/// Produces the fixed 44-byte RIFF/WAVE/fmt/data header followed by the
/// little-endian PCM payload from [`float_to_pcm16`]. Deterministic: the
/// same input always yields byte-identical output. Output length is always
/// `44 + 2 * samples.len()`.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    encode_wav_pcm16(&float_to_pcm16(samples), sample_rate)
}

/// Encode already-converted 16-bit PCM samples as a mono WAVE file in
/// memory. Same container contract as [`encode_wav`].
pub fn encode_wav_pcm16(pcm: &[i16], sample_rate: u32) -> Vec<u8> {
    const CHANNELS: u16 = 1;
    const BITS_PER_SAMPLE: u16 = 16;

    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_len = (pcm.len() * 2) as u32;

    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);

    // RIFF chunk descriptor
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt sub-chunk (16 bytes, format tag 1 = PCM)
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&CHANNELS.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for sample in pcm {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    debug_assert_eq!(buf.len(), WAV_HEADER_LEN + pcm.len() * 2);

    buf
}

/// Serialize PCM samples as little-endian bytes for binary transmission.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

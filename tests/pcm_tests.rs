// Unit tests for the PCM encoder
//
// These verify the float -> i16 scaling convention and the WAVE container
// byte layout the remote recognizer depends on.

use lingo_voice::audio::{encode_wav, encode_wav_pcm16, float_to_pcm16, WAV_HEADER_LEN};

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
}

#[test]
fn test_pcm16_known_values() {
    // Asymmetric scaling: negative * 32768, non-negative * 32767,
    // truncated toward zero.
    let samples = [0.0f32, 0.5, -0.5, 1.0, -1.0];
    let pcm = float_to_pcm16(&samples);
    assert_eq!(pcm, vec![0, 16383, -16384, 32767, -32768]);
}

#[test]
fn test_pcm16_length_preserved() {
    let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0) - 0.5).collect();
    assert_eq!(float_to_pcm16(&samples).len(), samples.len());
}

#[test]
fn test_pcm16_clamps_out_of_range() {
    let pcm = float_to_pcm16(&[2.0, -3.0, 1.0001, -1.0001]);
    assert_eq!(pcm, vec![32767, -32768, 32767, -32768]);
}

#[test]
fn test_empty_wav_is_header_only() {
    let wav = encode_wav(&[], 16000);
    assert_eq!(wav.len(), WAV_HEADER_LEN);
    // RIFF size field == 36, data size field == 0
    assert_eq!(u32_at(&wav, 4), 36);
    assert_eq!(u32_at(&wav, 40), 0);
}

#[test]
fn test_wav_length_law() {
    for n in [1usize, 5, 100, 4096] {
        let samples = vec![0.25f32; n];
        let wav = encode_wav(&samples, 16000);
        assert_eq!(wav.len(), 44 + 2 * n);
        assert_eq!(u32_at(&wav, 4), 36 + 2 * n as u32);
        assert_eq!(u32_at(&wav, 40), 2 * n as u32);
    }
}

#[test]
fn test_wav_header_fields() {
    let wav = encode_wav(&[0.0, 0.5, -0.5], 16000);

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(&wav[12..16], b"fmt ");
    assert_eq!(&wav[36..40], b"data");

    assert_eq!(u32_at(&wav, 16), 16, "fmt chunk size");
    assert_eq!(u16_at(&wav, 20), 1, "format tag = PCM");
    assert_eq!(u16_at(&wav, 22), 1, "mono");
    assert_eq!(u32_at(&wav, 24), 16000, "sample rate");
    assert_eq!(u32_at(&wav, 28), 32000, "byte rate = rate * block align");
    assert_eq!(u16_at(&wav, 32), 2, "block align");
    assert_eq!(u16_at(&wav, 34), 16, "bits per sample");
}

#[test]
fn test_wav_payload_is_le_pcm() {
    let wav = encode_wav(&[0.5, -1.0], 16000);
    let first = i16::from_le_bytes(wav[44..46].try_into().unwrap());
    let second = i16::from_le_bytes(wav[46..48].try_into().unwrap());
    assert_eq!(first, 16383);
    assert_eq!(second, -32768);
}

#[test]
fn test_wav_deterministic() {
    let samples: Vec<f32> = (0..512).map(|i| ((i % 7) as f32 - 3.0) / 4.0).collect();
    assert_eq!(encode_wav(&samples, 16000), encode_wav(&samples, 16000));
}

#[test]
fn test_wav_readable_by_hound() {
    // Cross-check the hand-built header against a real WAV reader.
    let samples = [0.0f32, 0.5, -0.5, 1.0, -1.0];
    let wav = encode_wav(&samples, 16000);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.wav");
    std::fs::write(&path, &wav).unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded, vec![0, 16383, -16384, 32767, -32768]);
}

#[test]
fn test_wav_from_pcm16_matches_float_path() {
    let samples = [0.1f32, -0.2, 0.3];
    let via_float = encode_wav(&samples, 16000);
    let via_pcm = encode_wav_pcm16(&float_to_pcm16(&samples), 16000);
    assert_eq!(via_float, via_pcm);
}

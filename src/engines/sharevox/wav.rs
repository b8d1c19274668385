//! Waveform assembly and RIFF/WAVE serialization.
//!
//! The decoder produces mono samples at [`DEFAULT_SAMPLING_RATE`]. Output
//! rate and channel count are reached by writing each quantized sample
//! `(output_rate / DEFAULT_SAMPLING_RATE) * channels` times in a row; rates
//! that are not whole multiples are truncated to the lower multiple.

use std::io::Cursor;

use super::model::{CoreError, DEFAULT_SAMPLING_RATE};

/// Size of the canonical PCM header written before the samples.
pub const WAV_HEADER_LEN: usize = 44;

/// Longest leading or trailing silence accepted from a query, in seconds.
pub const MAX_SILENCE_SECS: f32 = 60.0;

pub fn channel_count(stereo: bool) -> u16 {
    if stereo {
        2
    } else {
        1
    }
}

/// How many times each decoder sample is written to the payload.
pub fn repeat_count(output_sampling_rate: u32, stereo: bool) -> usize {
    let ratio = (output_sampling_rate / DEFAULT_SAMPLING_RATE) as usize;
    if ratio == 0 {
        log::warn!(
            "Output sampling rate {output_sampling_rate} is below {DEFAULT_SAMPLING_RATE}; \
             payload will be empty"
        );
    }
    ratio * channel_count(stereo) as usize
}

/// Scale, clip to `[-1, 1]` and quantize one sample to 16-bit PCM.
pub fn quantize(sample: f32, volume_scale: f32) -> i16 {
    let v = (sample * volume_scale).clamp(-1.0, 1.0);
    (v * i16::MAX as f32).round() as i16
}

/// Surround `wave` with `pre` and `post` seconds of silence.
///
/// Negative lengths add nothing. Lengths above [`MAX_SILENCE_SECS`] are
/// rejected.
pub fn pad_silence(wave: &[f32], pre: f32, post: f32) -> Result<Vec<f32>, CoreError> {
    let samples = |what: &'static str, seconds: f32| {
        if seconds > MAX_SILENCE_SECS {
            return Err(CoreError::OutOfRange {
                what,
                value: seconds,
            });
        }
        Ok((seconds.max(0.0) * DEFAULT_SAMPLING_RATE as f32).round() as usize)
    };
    let pre = samples("prePhonemeLength", pre)?;
    let post = samples("postPhonemeLength", post)?;

    let mut padded = Vec::with_capacity(pre + wave.len() + post);
    padded.resize(pre, 0.0);
    padded.extend_from_slice(wave);
    padded.resize(pre + wave.len() + post, 0.0);
    Ok(padded)
}

/// Serialize decoder samples as a 16-bit PCM RIFF/WAVE buffer.
pub fn encode_wav(
    wave: &[f32],
    volume_scale: f32,
    output_sampling_rate: u32,
    output_stereo: bool,
) -> Result<Vec<u8>, CoreError> {
    let spec = hound::WavSpec {
        channels: channel_count(output_stereo),
        sample_rate: output_sampling_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let repeat = repeat_count(output_sampling_rate, output_stereo);

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec)?;
        for &sample in wave {
            let pcm = quantize(sample, volume_scale);
            for _ in 0..repeat {
                writer.write_sample(pcm)?;
            }
        }
        writer.finalize()?;
    }
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(bytes: &[u8]) -> (hound::WavSpec, Vec<i16>) {
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        (reader.spec(), samples)
    }

    #[test]
    fn mono_header_at_default_rate() {
        let bytes = encode_wav(&[0.0, 0.5, -0.5], 1.0, DEFAULT_SAMPLING_RATE, false).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(bytes[22], 1);
        assert_eq!(bytes[34], 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(bytes.len(), WAV_HEADER_LEN + 3 * 2);

        let (spec, samples) = read(&bytes);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples, vec![0, 16384, -16384]);
    }

    #[test]
    fn loud_samples_clip_before_quantizing() {
        assert_eq!(quantize(0.9, 2.0), 32767);
        assert_eq!(quantize(-0.9, 2.0), -32767);
        assert_eq!(quantize(0.25, 0.0), 0);

        let (_, samples) = read(&encode_wav(&[0.9], 2.0, DEFAULT_SAMPLING_RATE, false).unwrap());
        assert_eq!(samples, vec![32767]);
    }

    #[test]
    fn stereo_and_double_rate_repeat_samples() {
        let wave = [0.1, -0.2];
        let bytes = encode_wav(&wave, 1.0, 96000, true).unwrap();
        let data_len = u32::from_le_bytes(bytes[40..44].try_into().unwrap()) as usize;
        assert_eq!(repeat_count(96000, true), 4);
        assert_eq!(data_len, wave.len() * 2 * 4);

        let riff_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        assert_eq!(riff_len, 36 + data_len);

        let (spec, samples) = read(&bytes);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 96000);
        assert_eq!(samples.len(), 8);
        assert!(samples[..4].iter().all(|&s| s == quantize(0.1, 1.0)));
        assert!(samples[4..].iter().all(|&s| s == quantize(-0.2, 1.0)));
    }

    #[test]
    fn block_align_and_byte_rate_follow_channels() {
        let bytes = encode_wav(&[], 1.0, DEFAULT_SAMPLING_RATE, true).unwrap();
        let byte_rate = u32::from_le_bytes(bytes[28..32].try_into().unwrap());
        let block_align = u16::from_le_bytes(bytes[32..34].try_into().unwrap());
        assert_eq!(block_align, 4);
        assert_eq!(byte_rate, 48000 * 4);
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
    }

    #[test]
    fn rate_below_internal_rate_has_empty_payload() {
        assert_eq!(repeat_count(24000, false), 0);
        let bytes = encode_wav(&[0.3, 0.3], 1.0, 24000, false).unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 24000);
    }

    #[test]
    fn silence_padding_uses_internal_rate() {
        let padded = pad_silence(&[0.5, 0.5], 0.001, 0.0005).unwrap();
        assert_eq!(padded.len(), 48 + 2 + 24);
        assert_eq!(padded[47], 0.0);
        assert_eq!(padded[48], 0.5);
        assert_eq!(padded[50], 0.0);
        assert_eq!(pad_silence(&[0.5], -1.0, 0.0).unwrap(), vec![0.5]);
    }

    #[test]
    fn oversized_silence_is_an_error() {
        for (pre, post) in [(1e30, 0.0), (0.0, f32::INFINITY), (MAX_SILENCE_SECS + 1.0, 0.0)] {
            assert!(matches!(
                pad_silence(&[0.0], pre, post),
                Err(CoreError::OutOfRange { .. })
            ));
        }
        assert_eq!(pad_silence(&[], MAX_SILENCE_SECS, 0.0).unwrap().len(), 60 * 48000);
    }

    #[test]
    fn payload_matches_direct_hound_writer() {
        let wave = [0.1, -0.7, 0.9, 0.0];
        for (rate, stereo) in [(48000, false), (48000, true), (96000, true), (24000, false)] {
            let bytes = encode_wav(&wave, 2.0, rate, stereo).unwrap();
            let (spec, samples) = read(&bytes);
            assert_eq!(spec.channels, channel_count(stereo));
            assert_eq!(spec.sample_rate, rate);
            assert_eq!(samples.len(), wave.len() * repeat_count(rate, stereo));
            assert_eq!(bytes.len(), WAV_HEADER_LEN + samples.len() * 2);
        }
    }
}

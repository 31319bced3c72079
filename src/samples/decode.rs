// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Decoding of in-memory sample payloads.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use crate::audio::AudioBuffer;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized audio format: {0}")]
    Format(#[source] SymphoniaError),

    #[error("no audio track found")]
    NoTrack,

    #[error("sample rate not specified")]
    NoSampleRate,

    #[error("unsupported codec: {0}")]
    Codec(#[source] SymphoniaError),

    #[error("error while decoding: {0}")]
    Decode(#[source] SymphoniaError),

    #[error("no audio in payload")]
    Empty,
}

/// Decodes a complete audio file held in memory into interleaved f32 samples.
/// The extension, if known, helps pick the container format.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(DecodeError::Format)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::NoSampleRate)?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(DecodeError::Codec)?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(DecodeError::Decode(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A corrupt frame is skipped, the rest of the file is still usable.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(DecodeError::Decode(e)),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count();
        if sample_buffer
            .as_ref()
            .map_or(true, |buffer| buffer.capacity() < decoded.capacity() * channels)
        {
            sample_buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buffer) = sample_buffer.as_mut() {
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err(DecodeError::Empty);
    }

    Ok(AudioBuffer::new(samples, channels as u16, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::wav_bytes;

    #[test]
    fn test_decode_wav() {
        let bytes = wav_bytes(&[0.5, -0.5, 0.25, -0.25], 2, 22050);
        let buffer = decode(bytes, Some("wav")).unwrap();

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 22050);
        assert_eq!(buffer.frames(), 2);
        assert!((buffer.sample(0, 0) - 0.5).abs() < 1e-3);
        assert!((buffer.sample(0, 1) + 0.5).abs() < 1e-3);
        assert!((buffer.sample(1, 0) - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_decode_without_hint() {
        let bytes = wav_bytes(&[0.1; 100], 1, 44100);
        let buffer = decode(bytes, None).unwrap();
        assert_eq!(buffer.frames(), 100);
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode(b"definitely not audio".to_vec(), Some("mp3"));
        assert!(result.is_err());
    }
}

//! Audio output
//!
//! Provides:
//! - WAV file saving (16-bit PCM or 32-bit float)
//! - Streaming playback through the default device (`playback` feature)

use std::path::Path;

use crate::core::error::{AudioOperation, EngineError, Result};

/// Sample encoding for saved files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavFormat {
    #[default]
    Pcm16,
    Float32,
}

/// Incremental mono WAV writer
pub struct WavSink {
    writer: hound::WavWriter<std::io::BufWriter<std::fs::File>>,
    format: WavFormat,
    written: u64,
}

impl WavSink {
    /// Create `path` for mono audio at `sample_rate`
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32, format: WavFormat) -> Result<Self> {
        let spec = match format {
            WavFormat::Pcm16 => hound::WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            WavFormat::Float32 => hound::WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
        };

        let writer = hound::WavWriter::create(path.as_ref(), spec).map_err(|e| {
            EngineError::audio(
                AudioOperation::Saving,
                format!("Failed to create WAV file {:?}: {}", path.as_ref(), e),
            )
        })?;

        Ok(Self {
            writer,
            format,
            written: 0,
        })
    }

    /// Append samples in [-1, 1]
    pub fn write(&mut self, samples: &[f32]) -> Result<()> {
        for &sample in samples {
            match self.format {
                WavFormat::Pcm16 => {
                    let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    self.writer.write_sample(scaled)?;
                }
                WavFormat::Float32 => self.writer.write_sample(sample)?,
            }
        }
        self.written += samples.len() as u64;
        Ok(())
    }

    /// Samples written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush the header and close the file
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use live::StreamingPlayer;

#[cfg(feature = "playback")]
mod live {
    use std::sync::{Arc, Mutex};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use tracing::warn;

    use crate::core::error::{AudioOperation, EngineError, Result};

    fn playback_error(message: impl Into<String>) -> EngineError {
        EngineError::audio(AudioOperation::Playback, message)
    }

    #[derive(Debug)]
    struct Ring {
        buffer: Vec<f32>,
        read: usize,
        write: usize,
    }

    impl Ring {
        fn pop(&mut self) -> f32 {
            if self.read == self.write {
                return 0.0;
            }
            let s = self.buffer[self.read];
            self.read = (self.read + 1) % self.buffer.len();
            s
        }

        fn push(&mut self, sample: f32) -> bool {
            let next = (self.write + 1) % self.buffer.len();
            if next == self.read {
                return false;
            }
            self.buffer[self.write] = sample;
            self.write = next;
            true
        }

        fn queued(&self) -> usize {
            (self.write + self.buffer.len() - self.read) % self.buffer.len()
        }
    }

    /// Ring-buffered mono output on the default device
    pub struct StreamingPlayer {
        sample_rate: u32,
        ring: Arc<Mutex<Ring>>,
        stream: cpal::Stream,
    }

    impl StreamingPlayer {
        /// Open the default device with a two-second buffer
        pub fn new(sample_rate: u32) -> Result<Self> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| playback_error("No audio output device available"))?;

            let supported = device
                .default_output_config()
                .map_err(|e| playback_error(format!("Failed to get default output config: {}", e)))?;
            let channels = supported.channels() as usize;
            let mut config: cpal::StreamConfig = supported.into();
            config.sample_rate = cpal::SampleRate(sample_rate);

            let ring = Arc::new(Mutex::new(Ring {
                buffer: vec![0.0; sample_rate as usize * 2],
                read: 0,
                write: 0,
            }));
            let ring_cb = Arc::clone(&ring);

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let Ok(mut ring) = ring_cb.lock() else {
                            data.iter_mut().for_each(|s| *s = 0.0);
                            return;
                        };
                        for frame in data.chunks_mut(channels) {
                            let sample = ring.pop();
                            frame.iter_mut().for_each(|s| *s = sample);
                        }
                    },
                    move |err| warn!(error = %err, "audio stream error"),
                    None,
                )
                .map_err(|e| playback_error(format!("Failed to build output stream: {}", e)))?;

            Ok(Self {
                sample_rate,
                ring,
                stream,
            })
        }

        pub fn play(&self) -> Result<()> {
            self.stream
                .play()
                .map_err(|e| playback_error(format!("Failed to start playback: {}", e)))
        }

        pub fn pause(&self) -> Result<()> {
            self.stream
                .pause()
                .map_err(|e| playback_error(format!("Failed to pause playback: {}", e)))
        }

        /// Queue samples; returns how many fit
        pub fn push(&self, samples: &[f32]) -> usize {
            let Ok(mut ring) = self.ring.lock() else {
                return 0;
            };
            samples.iter().take_while(|&&s| ring.push(s)).count()
        }

        /// Samples waiting to be played
        pub fn queued(&self) -> usize {
            self.ring.lock().map(|r| r.queued()).unwrap_or(0)
        }

        pub fn sample_rate(&self) -> u32 {
            self.sample_rate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_read_back() {
        let path = std::env::temp_dir().join("emoscape_output_test.wav");
        let samples: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin() * 0.5)
            .collect();

        let mut sink = WavSink::create(&path, 8000, WavFormat::Pcm16).unwrap();
        sink.write(&samples).unwrap();
        sink.finalize().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 8000);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_sink_counts_and_clamps() {
        let path = std::env::temp_dir().join("emoscape_sink_test.wav");
        let mut sink = WavSink::create(&path, 8000, WavFormat::Pcm16).unwrap();
        sink.write(&[2.0, -2.0, 0.0]).unwrap();
        sink.write(&[0.25]).unwrap();
        assert_eq!(sink.written(), 4);
        sink.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read[0], 32767);
        assert_eq!(read[1], -32768);
        assert_eq!(read[2], 0);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_float_sink() {
        let path = std::env::temp_dir().join("emoscape_float_test.wav");
        let mut sink = WavSink::create(&path, 22050, WavFormat::Float32).unwrap();
        sink.write(&[0.5, -0.5]).unwrap();
        sink.finalize().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 32);
        std::fs::remove_file(&path).ok();
    }
}

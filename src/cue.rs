//! Audible countdown cue played before recording starts.

use crate::Result;

/// Signals one countdown tick to the person being recorded
pub trait CountdownCue: Send {
    /// Called once per countdown second with the seconds left before that tick
    fn tick(&mut self, remaining: u32) -> Result<()>;
}

/// Cue that makes no sound
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl CountdownCue for SilentCue {
    fn tick(&mut self, _remaining: u32) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "audio")]
pub use tone::ToneCue;

/// Default cue for the build: a tone when audio is compiled in, silence otherwise
pub fn default_cue(sound: Option<&std::path::Path>) -> Box<dyn CountdownCue> {
    #[cfg(feature = "audio")]
    {
        match ToneCue::new(sound) {
            Ok(cue) => return Box::new(cue),
            Err(e) => log::warn!("Countdown cue unavailable, continuing silently: {e}"),
        }
    }
    #[cfg(not(feature = "audio"))]
    let _ = sound;

    Box::new(SilentCue)
}

#[cfg(feature = "audio")]
mod tone {
    use super::CountdownCue;
    use crate::constants::{CUE_TONE_HZ, CUE_TONE_MS};
    use crate::{Error, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, Sample, SampleFormat, SizedSample};
    use log::{debug, warn};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Mono samples at a given rate
    #[derive(Debug, Clone)]
    struct Clip {
        samples: Arc<Vec<f32>>,
        sample_rate: u32,
    }

    impl Clip {
        fn beep(sample_rate: u32) -> Self {
            #[allow(clippy::cast_possible_truncation)]
            let count = (u64::from(sample_rate) * CUE_TONE_MS / 1000) as usize;
            #[allow(clippy::cast_precision_loss)]
            let samples = (0..count)
                .map(|i| {
                    let t = i as f32 / sample_rate as f32;
                    // Short linear fade out avoids a click at the end
                    let envelope = 1.0 - i as f32 / count as f32;
                    0.4 * envelope * (2.0 * std::f32::consts::PI * CUE_TONE_HZ * t).sin()
                })
                .collect();
            Self {
                samples: Arc::new(samples),
                sample_rate,
            }
        }

        fn from_wav(path: &Path) -> Result<Self> {
            let mut reader = hound::WavReader::open(path).map_err(|e| Error::Audio(e.to_string()))?;
            let spec = reader.spec();
            let channels = usize::from(spec.channels.max(1));

            let interleaved: Vec<f32> = match spec.sample_format {
                hound::SampleFormat::Float => reader
                    .samples::<f32>()
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::Audio(e.to_string()))?,
                hound::SampleFormat::Int => {
                    #[allow(clippy::cast_precision_loss)]
                    let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                    reader
                        .samples::<i32>()
                        .map(|s| s.map(|v| v as f32 / scale))
                        .collect::<std::result::Result<_, _>>()
                        .map_err(|e| Error::Audio(e.to_string()))?
                }
            };

            #[allow(clippy::cast_precision_loss)]
            let samples = interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect();

            Ok(Self {
                samples: Arc::new(samples),
                sample_rate: spec.sample_rate,
            })
        }

        fn duration(&self) -> Duration {
            #[allow(clippy::cast_precision_loss)]
            Duration::from_secs_f32(self.samples.len() as f32 / self.sample_rate.max(1) as f32)
        }
    }

    /// Write `samples` into interleaved output frames starting at `cursor`
    ///
    /// Each source sample is repeated on every channel and `step` source
    /// samples are consumed per output frame.
    fn fill_frames<T>(data: &mut [T], channels: usize, samples: &[f32], cursor: &AtomicUsize, step: f32)
    where
        T: Sample + FromSample<f32>,
    {
        for frame in data.chunks_mut(channels.max(1)) {
            let n = cursor.fetch_add(1, Ordering::Relaxed);
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let source_index = (n as f32 * step) as usize;
            let value = samples.get(source_index).copied().unwrap_or(0.0);
            frame.fill(T::from_sample(value));
        }
    }

    /// Plays a short clip through the default output device on every tick
    pub struct ToneCue {
        device: cpal::Device,
        config: cpal::StreamConfig,
        sample_format: SampleFormat,
        clip: Clip,
    }

    impl ToneCue {
        /// Open the default output device and load `sound`, falling back to a beep
        ///
        /// # Errors
        ///
        /// Returns an error if no output device is available
        pub fn new(sound: Option<&Path>) -> Result<Self> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| Error::Audio("No default output device".to_string()))?;
            let supported = device
                .default_output_config()
                .map_err(|e| Error::Audio(format!("Failed to get output config: {e}")))?;
            let sample_format = supported.sample_format();
            let config: cpal::StreamConfig = supported.into();

            let clip = match sound.filter(|p| p.exists()) {
                Some(path) => match Clip::from_wav(path) {
                    Ok(clip) => clip,
                    Err(e) => {
                        warn!("Could not load {}: {e}; using a beep", path.display());
                        Clip::beep(config.sample_rate.0)
                    }
                },
                None => Clip::beep(config.sample_rate.0),
            };

            debug!("Cue output: {} Hz, {sample_format:?}", config.sample_rate.0);
            Ok(Self {
                device,
                config,
                sample_format,
                clip,
            })
        }

        fn play(&self) -> Result<()> {
            match self.sample_format {
                SampleFormat::F32 => self.play_as::<f32>(),
                SampleFormat::F64 => self.play_as::<f64>(),
                SampleFormat::I16 => self.play_as::<i16>(),
                SampleFormat::I32 => self.play_as::<i32>(),
                SampleFormat::U16 => self.play_as::<u16>(),
                SampleFormat::U8 => self.play_as::<u8>(),
                other => Err(Error::Audio(format!("Unsupported output sample format {other:?}"))),
            }
        }

        fn play_as<T>(&self) -> Result<()>
        where
            T: SizedSample + FromSample<f32>,
        {
            let channels = usize::from(self.config.channels.max(1));
            let samples = Arc::clone(&self.clip.samples);
            let position = Arc::new(AtomicUsize::new(0));
            // Naive nearest-sample resampling is fine for a beep
            #[allow(clippy::cast_precision_loss)]
            let step = self.clip.sample_rate as f32 / self.config.sample_rate.0.max(1) as f32;

            let cursor = Arc::clone(&position);
            let stream = self
                .device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                        fill_frames(data, channels, &samples, &cursor, step);
                    },
                    |err| warn!("Cue playback error: {err}"),
                    None,
                )
                .map_err(|e| Error::Audio(format!("Failed to build output stream: {e}")))?;

            stream
                .play()
                .map_err(|e| Error::Audio(format!("Failed to start playback: {e}")))?;
            std::thread::sleep(self.clip.duration());
            drop(stream);

            debug!("Cue played {} frames", position.load(Ordering::Relaxed));
            Ok(())
        }
    }

    impl CountdownCue for ToneCue {
        fn tick(&mut self, remaining: u32) -> Result<()> {
            debug!("Countdown tick {remaining}");
            self.play()
        }
    }

}

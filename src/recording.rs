use crate::constants::TARGET_SAMPLE_RATE;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

pub const WAV_MIME: &str = "audio/wav";

/// Mono capture buffer. Incoming audio arrives at whatever rate the device
/// runs at and is linearly resampled to the 16 kHz the analysis service
/// expects.
#[derive(Default)]
pub struct CaptureBuffer {
    samples: Vec<i16>,
    resample_pos: f64,
}

impl CaptureBuffer {
    pub fn reset(&mut self) {
        self.samples.clear();
        self.resample_pos = 0.0;
    }

    pub fn drain(&mut self) -> Vec<i16> {
        let mut out = Vec::new();
        std::mem::swap(&mut out, &mut self.samples);
        self.resample_pos = 0.0;
        out
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push_samples(&mut self, input: &[f32], in_rate: u32) {
        if input.is_empty() {
            return;
        }

        if in_rate == TARGET_SAMPLE_RATE {
            for &sample in input {
                self.samples.push(float_to_i16(sample));
            }
            return;
        }

        let ratio = in_rate as f64 / TARGET_SAMPLE_RATE as f64;
        let mut pos = self.resample_pos;

        while pos + 1.0 < input.len() as f64 {
            let idx = pos.floor() as usize;
            let frac = pos - idx as f64;
            let a = input[idx] as f64;
            let b = input[idx + 1] as f64;
            let sample = (a * (1.0 - frac) + b * frac) as f32;
            self.samples.push(float_to_i16(sample));
            pos += ratio;
        }

        self.resample_pos = pos - input.len() as f64;
    }
}

fn float_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

/// WAV container around raw mono i16 samples, built in memory so the clip
/// can be embedded into the journal document straight away.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, String> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| format!("Cannot start WAV clip: {}", e))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| format!("WAV write error: {}", e))?;
        }
        writer
            .finalize()
            .map_err(|e| format!("WAV finalize error: {}", e))?;
    }
    Ok(cursor.into_inner())
}

#[cfg(feature = "desktop")]
pub use capture::{list_audio_devices, AudioDevice, Recorder};

#[cfg(feature = "desktop")]
mod capture {
    use super::CaptureBuffer;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleFormat, StreamConfig};
    use serde::Serialize;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use tracing::{error, info};

    #[derive(Debug, Clone, Serialize)]
    pub struct AudioDevice {
        pub id: String,
        pub label: String,
    }

    pub fn list_audio_devices() -> Vec<AudioDevice> {
        let mut devices = vec![AudioDevice {
            id: "default".to_string(),
            label: "Default (System)".to_string(),
        }];

        let host = cpal::default_host();
        if let Ok(inputs) = host.input_devices() {
            for (index, device) in inputs.enumerate() {
                let name = device
                    .name()
                    .unwrap_or_else(|_| format!("Input {}", index + 1));
                let id = format!("input-{}-{}", index, name);
                devices.push(AudioDevice { id, label: name });
            }
        }

        devices
    }

    fn resolve_input_device(device_id: &str) -> Option<cpal::Device> {
        let host = cpal::default_host();
        if device_id == "default" {
            return host.default_input_device();
        }

        if let Ok(inputs) = host.input_devices() {
            for (index, device) in inputs.enumerate() {
                let name = device
                    .name()
                    .unwrap_or_else(|_| format!("Input {}", index + 1));
                let id = format!("input-{}-{}", index, name);
                if id == device_id {
                    return Some(device);
                }
            }
        }

        host.default_input_device()
    }

    fn push_mono(buffer: &Arc<Mutex<CaptureBuffer>>, mono: &[f32], sample_rate: u32) {
        if let Ok(mut guard) = buffer.lock() {
            guard.push_samples(mono, sample_rate);
        }
    }

    fn build_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        format: SampleFormat,
        buffer: Arc<Mutex<CaptureBuffer>>,
    ) -> Result<cpal::Stream, String> {
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0;
        let err_fn = |err| eprintln!("audio stream error: {}", err);

        let mixdown = move |frame: &[f32]| -> f32 {
            let sum: f32 = frame.iter().sum();
            (sum / frame.len().max(1) as f32).clamp(-1.0, 1.0)
        };

        match format {
            SampleFormat::F32 => device
                .build_input_stream(
                    config,
                    move |data: &[f32], _| {
                        let mono: Vec<f32> = data
                            .chunks(channels.max(1))
                            .map(|frame| mixdown(frame))
                            .collect();
                        push_mono(&buffer, &mono, sample_rate);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| e.to_string()),
            SampleFormat::I16 => device
                .build_input_stream(
                    config,
                    move |data: &[i16], _| {
                        let mono: Vec<f32> = data
                            .chunks(channels.max(1))
                            .map(|frame| {
                                let as_f32: Vec<f32> = frame
                                    .iter()
                                    .map(|&s| s as f32 / i16::MAX as f32)
                                    .collect();
                                mixdown(&as_f32)
                            })
                            .collect();
                        push_mono(&buffer, &mono, sample_rate);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| e.to_string()),
            SampleFormat::U16 => device
                .build_input_stream(
                    config,
                    move |data: &[u16], _| {
                        let mono: Vec<f32> = data
                            .chunks(channels.max(1))
                            .map(|frame| {
                                let as_f32: Vec<f32> = frame
                                    .iter()
                                    .map(|&s| (s as f32 - 32768.0) / 32768.0)
                                    .collect();
                                mixdown(&as_f32)
                            })
                            .collect();
                        push_mono(&buffer, &mono, sample_rate);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| e.to_string()),
            _ => Err("Unsupported sample format".to_string()),
        }
    }

    /// One microphone session at a time. The cpal stream lives on its own
    /// thread (streams are not Send); the recorder owns a stop channel and
    /// the shared capture buffer.
    pub struct Recorder {
        buffer: Arc<Mutex<CaptureBuffer>>,
        pub active: bool,
        stop_tx: Option<mpsc::Sender<()>>,
        join_handle: Option<thread::JoinHandle<()>>,
    }

    impl Recorder {
        pub fn new() -> Self {
            Self {
                buffer: Arc::new(Mutex::new(CaptureBuffer::default())),
                active: false,
                stop_tx: None,
                join_handle: None,
            }
        }

        /// Starts capturing. A missing device or a stream failure surfaces
        /// here, before anything is recorded, so the caller can block the
        /// whole recording flow with a notice.
        pub fn start(&mut self, device_id: &str) -> Result<(), String> {
            if self.active {
                info!("Recording already active, skipping start");
                return Ok(());
            }

            if let Ok(mut buf) = self.buffer.lock() {
                buf.reset();
            }

            let buffer = self.buffer.clone();
            let device_id = device_id.to_string();
            let (stop_tx, stop_rx) = mpsc::channel::<()>();
            let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

            let join_handle = thread::spawn(move || {
                let result = (|| -> Result<(), String> {
                    let device = resolve_input_device(&device_id)
                        .ok_or_else(|| "No input device available".to_string())?;
                    let config = device.default_input_config().map_err(|e| e.to_string())?;
                    let stream_config: StreamConfig = config.clone().into();
                    let stream =
                        build_stream(&device, &stream_config, config.sample_format(), buffer)?;

                    stream.play().map_err(|e| e.to_string())?;
                    let _ = ready_tx.send(Ok(()));

                    let _ = stop_rx.recv();
                    drop(stream);
                    Ok(())
                })();

                if let Err(err) = result {
                    let _ = ready_tx.send(Err(err));
                }
            });

            match ready_rx.recv_timeout(Duration::from_secs(3)) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!("Failed to start recording: {}", err);
                    let _ = stop_tx.send(());
                    let _ = join_handle.join();
                    return Err(err);
                }
                Err(_) => {
                    let _ = stop_tx.send(());
                    let _ = join_handle.join();
                    return Err("Failed to start audio stream".to_string());
                }
            }

            self.stop_tx = Some(stop_tx);
            self.join_handle = Some(join_handle);
            self.active = true;
            info!("Recording started on device '{}'", device_id);
            Ok(())
        }

        /// Stops the stream and hands back everything captured since start.
        pub fn stop(&mut self) -> Result<Vec<i16>, String> {
            if !self.active {
                return Err("No recording in progress".to_string());
            }

            if let Some(stop_tx) = self.stop_tx.take() {
                let _ = stop_tx.send(());
            }
            if let Some(handle) = self.join_handle.take() {
                let _ = handle.join();
            }
            self.active = false;

            let samples = self
                .buffer
                .lock()
                .map_err(|_| "Capture buffer poisoned".to_string())?
                .drain();
            info!("Recording stopped, {} samples captured", samples.len());
            Ok(samples)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_passes_through_at_target_rate() {
        let mut buf = CaptureBuffer::default();
        buf.push_samples(&[0.0, 0.5, -0.5, 1.0], TARGET_SAMPLE_RATE);
        assert_eq!(buf.len(), 4);
        let samples = buf.drain();
        assert_eq!(samples[3], i16::MAX);
        assert!(buf.is_empty());
    }

    #[test]
    fn buffer_downsamples_double_rate_to_roughly_half() {
        let mut buf = CaptureBuffer::default();
        let input: Vec<f32> = (0..3200).map(|i| (i % 100) as f32 / 100.0).collect();
        buf.push_samples(&input, TARGET_SAMPLE_RATE * 2);
        let len = buf.len();
        assert!(
            (1550..=1650).contains(&len),
            "expected about 1600 samples, got {}",
            len
        );
    }

    #[test]
    fn buffer_keeps_resample_phase_across_pushes() {
        let mut continuous = CaptureBuffer::default();
        let input: Vec<f32> = vec![0.1; 4800];
        continuous.push_samples(&input, 48_000);

        let mut chunked = CaptureBuffer::default();
        for chunk in input.chunks(480) {
            chunked.push_samples(chunk, 48_000);
        }

        let a = continuous.len() as i64;
        let b = chunked.len() as i64;
        assert!((a - b).abs() <= 2, "continuous {} vs chunked {}", a, b);
    }

    #[test]
    fn clipping_input_is_clamped() {
        let mut buf = CaptureBuffer::default();
        buf.push_samples(&[4.0, -4.0], TARGET_SAMPLE_RATE);
        let samples = buf.drain();
        assert_eq!(samples[0], i16::MAX);
        assert_eq!(samples[1], -i16::MAX);
    }

    #[test]
    fn encode_wav_produces_a_riff_container() {
        let samples: Vec<i16> = vec![0, 100, -100, 32000];
        let bytes = encode_wav(&samples, TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 44-byte canonical header + 2 bytes per sample.
        assert_eq!(bytes.len(), 44 + samples.len() * 2);
    }

    #[test]
    fn encode_wav_of_silence_is_valid_and_small() {
        let bytes = encode_wav(&[], TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(bytes.len(), 44);
    }
}

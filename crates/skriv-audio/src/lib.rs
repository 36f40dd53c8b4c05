//! Microphone capture for skriv. There can only be one active recording at
//! a time; when it ends the accumulated audio comes back as a single WAV
//! byte buffer. Storage and the stop decision are owned by the caller.

use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Host, Sample};
use hound::WavWriter;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CaptureError {
    /// generic anyhow error
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    /// No recording device available
    #[error("no input device available")]
    NoInputDevice,
    /// Sample format not supported
    #[error("sample format not supported: {0}")]
    SampleFormatNotSupported(String),
    /// Build stream error
    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),
}

type Result<T> = std::result::Result<T, CaptureError>;
type WavWriterHandle = Arc<Mutex<Option<WavWriter<MemoryWriter>>>>;

/// A cheaply cloneable handle to the buffer being recorded into. The wav
/// writer's finalize method does not hand back its inner writer, so the
/// bytes live behind an Arc for later extraction.
#[derive(Clone)]
struct MemoryWriter {
    inner: Arc<Mutex<Cursor<Vec<u8>>>>,
}

impl MemoryWriter {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Cursor::new(Vec::with_capacity(8 * 1024)))),
        }
    }

    fn try_into_inner(self) -> Result<Vec<u8>> {
        let owned = Arc::try_unwrap(self.inner)
            .map_err(|_| CaptureError::Anyhow(anyhow!("recording buffer still shared")))?;
        Ok(owned.into_inner().into_inner())
    }
}

impl Seek for MemoryWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.lock().seek(pos)
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// A finished recording: WAV bytes plus enough stream metadata to reason
/// about its length.
pub struct Recording {
    data: Vec<u8>,
    sample_rate: u32,
    channels: u16,
    samples: u64,
}

impl Recording {
    /// True when not a single sample reached the buffer.
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        // The counter is per sample across all channels.
        let per_channel = self.samples / u64::from(self.channels.max(1));
        Duration::from_secs_f64(per_channel as f64 / f64::from(self.sample_rate))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

pub struct Recorder {
    host: Host,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Opens the default input device and starts streaming into an
    /// in-memory WAV buffer. The returned handle keeps the stream alive.
    pub fn start(&self) -> Result<RecordingHandle> {
        let device = self
            .host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;
        let config = device
            .default_input_config()
            .map_err(|_| CaptureError::NoInputDevice)?;

        info!(
            device = %device.name().unwrap_or_else(|_| "<unnamed>".into()),
            rate = config.sample_rate().0,
            channels = config.channels(),
            "recording from device"
        );

        let spec = wav_spec_from_config(&config);
        let buffer = MemoryWriter::new();
        let writer =
            WavWriter::new(buffer.clone(), spec).map_err(|e| CaptureError::Anyhow(e.into()))?;
        let writer = Arc::new(Mutex::new(Some(writer)));
        let samples = Arc::new(AtomicU64::new(0));

        let writer_2 = writer.clone();
        let samples_2 = samples.clone();
        let err_fn = move |err| {
            error!("an error occurred on stream: {}", err);
        };

        let stream = match config.sample_format() {
            cpal::SampleFormat::I8 => device.build_input_stream(
                &config.into(),
                move |data, _: &_| write_input_data::<i8, i8>(data, &writer_2, &samples_2),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data, _: &_| write_input_data::<i16, i16>(data, &writer_2, &samples_2),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I32 => device.build_input_stream(
                &config.into(),
                move |data, _: &_| write_input_data::<i32, i32>(data, &writer_2, &samples_2),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data, _: &_| write_input_data::<f32, f32>(data, &writer_2, &samples_2),
                err_fn,
                None,
            )?,
            sample_format => {
                return Err(CaptureError::SampleFormatNotSupported(format!(
                    "{sample_format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|_| anyhow!("failed to play stream"))?;

        Ok(RecordingHandle {
            stream,
            writer,
            buffer: Some(buffer),
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }
}

/// Handle to the active recording. You must call `finish` to receive the
/// data; dropping the handle discards it after stopping the stream.
pub struct RecordingHandle {
    stream: cpal::Stream,
    writer: WavWriterHandle,
    // Presence of the buffer indicates the recording has not been
    // finalized yet.
    buffer: Option<MemoryWriter>,
    samples: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
}

impl RecordingHandle {
    pub fn finish(&mut self) -> Result<Option<Recording>> {
        let Some(buffer) = self.buffer.take() else {
            return Ok(None);
        };
        // Pause instead of drop; the stream field cannot move out of
        // &mut self. Errors on pause are not actionable here.
        self.stream.pause().ok();
        let writer = self
            .writer
            .lock()
            .take()
            .ok_or_else(|| anyhow!("recording writer already taken"))?;
        writer
            .finalize()
            .map_err(|e| CaptureError::Anyhow(anyhow!("failed to finalize writer: {e}")))?;
        let data = buffer.try_into_inner()?;
        Ok(Some(Recording {
            data,
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: self.samples.load(Ordering::Relaxed),
        }))
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        if self.buffer.is_some() {
            if let Err(e) = self.finish() {
                error!("failed to finalize recording: {}", e);
            }
        }
    }
}

fn wav_spec_from_config(config: &cpal::SupportedStreamConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels(),
        sample_rate: config.sample_rate().0,
        bits_per_sample: (config.sample_format().sample_size() * 8) as _,
        sample_format: sample_format(config.sample_format()),
    }
}

fn sample_format(format: cpal::SampleFormat) -> hound::SampleFormat {
    if format.is_float() {
        hound::SampleFormat::Float
    } else {
        hound::SampleFormat::Int
    }
}

fn write_input_data<T, U>(input: &[T], writer: &WavWriterHandle, samples: &Arc<AtomicU64>)
where
    T: Sample,
    U: Sample + hound::Sample + FromSample<T>,
{
    if let Some(mut guard) = writer.try_lock() {
        if let Some(writer) = guard.as_mut() {
            for &sample in input.iter() {
                let sample: U = U::from_sample(sample);
                writer.write_sample(sample).ok();
            }
            samples.fetch_add(input.len() as u64, Ordering::Relaxed);
        }
    }
}

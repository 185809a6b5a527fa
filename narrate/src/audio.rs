//! WAV input/output and segment concatenation.

use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

/// Pause inserted between segments of the complete audio file, in seconds
pub const DEFAULT_PAUSE_DURATION: f32 = 0.5;

/// Mono waveform as produced by a TTS backend.
///
/// Samples are 32-bit floats in the range \[-1.0, 1.0\].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// `seconds` of silence at the given rate
    pub fn silence(seconds: f32, sample_rate: u32) -> Self {
        Self::new(vec![0.0; silence_samples(seconds, sample_rate)], sample_rate)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_wav(path, &self.samples, self.sample_rate)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_wav(path)
    }
}

fn silence_samples(seconds: f32, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f32) as usize
}

/// Load a WAV file, downmixing to mono
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read samples: {}", path.display()))?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to read samples: {}", path.display()))?
        }
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok(AudioBuffer::new(mono, spec.sample_rate))
}

/// Write mono 16-bit PCM
pub fn save_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(scaled)?;
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {}", path.display()))?;
    Ok(())
}

/// Join WAV files in order with `pause_seconds` of silence between them.
///
/// All inputs must share one sample rate; the output uses it too.
pub fn concatenate_files(files: &[PathBuf], output: &Path, pause_seconds: f32) -> Result<AudioBuffer> {
    let Some((first, rest)) = files.split_first() else {
        bail!("No audio files to concatenate");
    };

    log::info!("Concatenating {} segments...", files.len());

    let mut combined = load_wav(first)?;
    let gap = silence_samples(pause_seconds, combined.sample_rate);

    for file in rest {
        let clip = load_wav(file)?;
        if clip.sample_rate != combined.sample_rate {
            bail!(
                "Sample rate mismatch: {} is {} Hz, expected {} Hz",
                file.display(),
                clip.sample_rate,
                combined.sample_rate
            );
        }
        combined.samples.extend(std::iter::repeat_n(0.0, gap));
        combined.samples.extend(clip.samples);
    }

    combined.save(output)?;
    log::info!("Complete audio saved: {}", output.display());
    Ok(combined)
}

//! Anymorph - Encode anything as anything
//!
//! A CLI for the multi-modal encoding engine. Turns text into emoji,
//! QR code images, steganographic images, or audio chirps, and decodes
//! each representation back to text.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing_subscriber::EnvFilter;

use anymorph::{
    Artifact, Coordinator, EncodeJob, EncodeResult, EncodingOptions, Mode, ResourcePool,
    StegoCodec,
};

/// Anymorph - Encode anything as anything
///
/// Multi-modal encoding engine: emoji substitution, QR barcodes,
/// steganographic images, and frequency-shift-keyed audio.
#[derive(Parser)]
#[command(name = "anymorph")]
#[command(version)]
#[command(about = "Turn text into emoji, QR codes, stego images, or audio chirps - and back")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a message into the chosen representation
    Encode {
        /// Encoding mode: emoji, qr, stego, or chirp
        #[arg(short, long)]
        mode: String,

        /// Text message to encode (reads stdin when omitted)
        #[arg(short = 'M', long, conflicts_with = "file")]
        message: Option<String>,

        /// Read the message from a text file instead
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output path (PNG for qr/stego, WAV for chirp, text otherwise).
        /// Defaults to a mode-appropriate name in the working directory.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Cover image for stego mode (a cover is generated when omitted)
        #[arg(long)]
        cover: Option<PathBuf>,

        /// Quality target, 0.0-1.0
        #[arg(long, default_value_t = 0.8)]
        quality: f64,

        /// Speed target, 0.0-1.0
        #[arg(long, default_value_t = 0.5)]
        speed: f64,

        /// Per-operation timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Disable parallel pixel/symbol kernels
        #[arg(long)]
        sequential: bool,

        /// Print the result summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode an artifact back to text
    Decode {
        /// Mode the artifact was encoded under: emoji, qr, stego, or chirp
        #[arg(short, long)]
        mode: String,

        /// Artifact path (text file, PNG image, or WAV audio)
        #[arg(short, long)]
        input: PathBuf,

        /// Print the result summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available modes and their processing-time estimates
    Modes,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Encode {
            mode,
            message,
            file,
            out,
            cover,
            quality,
            speed,
            timeout_secs,
            sequential,
            json,
        } => {
            let mode: Mode = mode.parse()?;
            let text = read_message(message, file)?;
            let options = EncodingOptions {
                use_parallel: !sequential,
                quality_target: quality.clamp(0.0, 1.0),
                speed_target: speed.clamp(0.0, 1.0),
                timeout: Duration::from_secs(timeout_secs),
                ..Default::default()
            };
            encode_command(mode, &text, options, out, cover, json).await
        }
        Commands::Decode { mode, input, json } => {
            let mode: Mode = mode.parse()?;
            decode_command(mode, &input, json).await
        }
        Commands::Modes => {
            modes_command();
            Ok(())
        }
    }
}

fn read_message(message: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(message) = message {
        return Ok(message);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read message file: {}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read message from stdin")?;
    Ok(buffer.trim_end_matches('\n').to_string())
}

async fn encode_command(
    mode: Mode,
    text: &str,
    options: EncodingOptions,
    out: Option<PathBuf>,
    cover: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let pool = ResourcePool::new();
    let _monitor = pool.spawn_monitor(Duration::from_secs(1));

    let result = if let (Mode::ImageStego, Some(cover_path)) = (mode, cover) {
        // A caller-supplied cover bypasses the coordinator's default
        // stego codec, which generates its own.
        let cover_image = image::open(&cover_path)
            .with_context(|| format!("Failed to load cover image: {}", cover_path.display()))?;
        StegoCodec::with_cover(pool.clone(), cover_image).encode(text, &options)?
    } else {
        let coordinator = Coordinator::new(pool.clone());
        coordinator
            .encode(EncodeJob::new(mode, text), options)
            .await?
    };

    let out_path = write_artifact(&result.artifact, mode, out)?;
    report_encode(&result, out_path.as_deref(), json)?;
    Ok(())
}

async fn decode_command(mode: Mode, input: &Path, json: bool) -> Result<()> {
    let artifact = load_artifact(mode, input)?;
    let coordinator = Coordinator::new(ResourcePool::new());
    let result = coordinator
        .decode(artifact, mode, EncodingOptions::default())
        .await?;

    if json {
        let summary = serde_json::json!({
            "text": result.text,
            "confidence": result.confidence,
            "duration_ms": result.duration.as_millis() as u64,
            "metadata": result.metadata,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", result.text);
        eprintln!(
            "Decoded with confidence {:.2} in {:?}",
            result.confidence, result.duration
        );
    }
    Ok(())
}

fn modes_command() {
    let coordinator = Coordinator::new(ResourcePool::new());
    println!("Available modes (estimate for a 100-byte message):");
    for mode in coordinator.capabilities() {
        let estimate = coordinator.estimate_processing_time(mode, 100);
        println!("  {mode:<8} ~{estimate:?}");
    }
}

/// Writes the artifact to disk and returns the path, or None when the
/// text went to stdout.
fn write_artifact(
    artifact: &Artifact,
    mode: Mode,
    out: Option<PathBuf>,
) -> Result<Option<PathBuf>> {
    match artifact {
        Artifact::Text(text) => {
            if let Some(path) = out {
                std::fs::write(&path, text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                Ok(Some(path))
            } else {
                println!("{text}");
                Ok(None)
            }
        }
        Artifact::Image(image) => {
            let path = out.unwrap_or_else(|| PathBuf::from(format!("anymorph-{mode}.png")));
            image
                .save(&path)
                .with_context(|| format!("Failed to write image {}", path.display()))?;
            Ok(Some(path))
        }
        Artifact::Bytes(bytes) => {
            let path = out.unwrap_or_else(|| PathBuf::from(format!("anymorph-{mode}.bin")));
            std::fs::write(&path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(Some(path))
        }
        Artifact::Audio {
            samples,
            sample_rate,
        } => {
            let path = out.unwrap_or_else(|| PathBuf::from(format!("anymorph-{mode}.wav")));
            write_wav(&path, samples, *sample_rate)?;
            Ok(Some(path))
        }
    }
}

fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV {}", path.display()))?;
    for sample in samples {
        writer.write_sample(*sample).context("WAV write failed")?;
    }
    writer.finalize().context("WAV finalize failed")?;
    Ok(())
}

fn load_artifact(mode: Mode, input: &Path) -> Result<Artifact> {
    match mode {
        Mode::Emoji => {
            let text = std::fs::read_to_string(input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            Ok(Artifact::Text(text.trim_end_matches('\n').to_string()))
        }
        Mode::Qr | Mode::ImageStego => {
            let image = image::open(input)
                .with_context(|| format!("Failed to load image {}", input.display()))?;
            Ok(Artifact::Image(image))
        }
        Mode::AudioChirp => {
            let reader = WavReader::open(input)
                .with_context(|| format!("Failed to open WAV {}", input.display()))?;
            let spec = reader.spec();
            if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
                bail!(
                    "Only 16-bit PCM WAV is supported, got {} bits {:?}",
                    spec.bits_per_sample,
                    spec.sample_format
                );
            }
            let samples: Vec<i16> = reader
                .into_samples::<i16>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to read WAV samples")?;
            Ok(Artifact::Audio {
                samples,
                sample_rate: spec.sample_rate,
            })
        }
    }
}

fn report_encode(result: &EncodeResult, out_path: Option<&Path>, json: bool) -> Result<()> {
    if json {
        let summary = serde_json::json!({
            "description": result.description,
            "duration_ms": result.duration.as_millis() as u64,
            "artifact_bytes": result.artifact.byte_size(),
            "output": out_path.map(|p| p.display().to_string()),
            "quality": result.quality,
            "metadata": result.metadata,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    eprintln!("{}", result.description);
    if let Some(path) = out_path {
        eprintln!("Wrote {} ({} bytes)", path.display(), result.artifact.byte_size());
    }
    if let Some(quality) = &result.quality {
        eprintln!(
            "Quality: fidelity {:.1}, capacity {} bytes, robustness {:.2}",
            quality.expected_fidelity, quality.capacity_bytes, quality.robustness
        );
    }
    eprintln!("Took {:?}", result.duration);
    Ok(())
}

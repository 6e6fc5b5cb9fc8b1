//! Emoscape CLI - host loop for the emotion-driven audiovisual engine
//!
//! - `play`: real-time playback, optionally through the audio device
//! - `render`: offline rendering to WAV plus per-frame JSON lines
//! - `inspect`: speech collection summary and timeline preview
//! - `styles`: timbre preset tables

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use emoscape::audio::{emotion_note, escalation_level, sentiment_chord, WavFormat, WavSink};
use emoscape::field::intensity_for_run;
use emoscape::{EmotionLabel, Engine, EngineConfig, Speech, Synthesizer, ToneStyle, VERSION};

/// Emoscape - emotion-driven particle field and soundscape
#[derive(Parser, Debug)]
#[command(name = "emoscape")]
#[command(author, version, about)]
#[command(long_about = "
Emoscape plays speeches annotated with per-line emotion scores as a
procedural soundscape and a distorting 3-D particle field.

Examples:
  # Play the first speech in real time
  emoscape play --speeches demos/speeches.json

  # Render 60 seconds of the second speech to WAV, with frame dumps
  emoscape render --speeches demos/speeches.json --speech 1 --seconds 60 \\
      --output out.wav --frames frames.jsonl

  # Show the timeline a speech would produce
  emoscape inspect --speeches demos/speeches.json --speech 0
")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a speech in real time
    Play {
        /// Speech collection JSON
        #[arg(short, long)]
        speeches: PathBuf,

        /// Index of the speech to play
        #[arg(long, default_value = "0")]
        speech: usize,

        /// Timbre style (ambient, synthwave, lofi)
        #[arg(long)]
        style: Option<ToneStyle>,

        /// Master volume (0.0 - 1.0)
        #[arg(long)]
        volume: Option<f32>,

        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<f32>,

        /// Host frame rate
        #[arg(long, default_value = "60")]
        fps: u32,
    },

    /// Render a speech offline to WAV
    Render {
        /// Speech collection JSON
        #[arg(short, long)]
        speeches: PathBuf,

        /// Index of the speech to render
        #[arg(long, default_value = "0")]
        speech: usize,

        /// Timbre style (ambient, synthwave, lofi)
        #[arg(long)]
        style: Option<ToneStyle>,

        /// Seconds to render
        #[arg(long, default_value = "30")]
        seconds: f32,

        /// Output audio file path
        #[arg(short, long, default_value = "output.wav")]
        output: PathBuf,

        /// Write 32-bit float samples instead of 16-bit PCM
        #[arg(long)]
        float: bool,

        /// Dump one JSON line per frame to this file
        #[arg(long)]
        frames: Option<PathBuf>,

        /// Frame rate of the offline host loop
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Seed for the fear jitter
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarize a speech collection
    Inspect {
        /// Speech collection JSON
        #[arg(short, long)]
        speeches: PathBuf,

        /// Show the per-segment timeline of one speech
        #[arg(long)]
        speech: Option<usize>,
    },

    /// List timbre styles and their tables
    Styles,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    info!("Emoscape v{}", VERSION);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            speeches,
            speech,
            style,
            volume,
            seconds,
            fps,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build runtime")?;
            runtime.block_on(run_play(config, &speeches, speech, style, volume, seconds, fps))
        }
        Commands::Render {
            speeches,
            speech,
            style,
            seconds,
            output,
            float,
            frames,
            fps,
            seed,
        } => run_render(config, &speeches, speech, style, seconds, &output, float, frames.as_deref(), fps, seed),
        Commands::Inspect { speeches, speech } => run_inspect(&speeches, speech),
        Commands::Styles => {
            print_styles();
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn create_progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} frames {msg}")
            .context("Invalid progress template")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let config = EngineConfig::load(path).with_context(|| format!("Failed to load config {:?}", path))?;
            info!("Loaded config from {:?}", path);
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_speech(path: &Path, index: usize) -> Result<Arc<Speech>> {
    let speeches = load_speeches(path)?;
    let count = speeches.len();
    let speech = speeches
        .into_iter()
        .nth(index)
        .with_context(|| format!("Speech index {} out of range ({} speeches)", index, count))?;
    Ok(Arc::new(speech))
}

fn load_speeches(path: &Path) -> Result<Vec<Speech>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read speeches {:?}", path))?;
    let speeches = Speech::collection_from_json(&json).context("Failed to parse speeches")?;
    info!("Loaded {} speeches from {:?}", speeches.len(), path);
    Ok(speeches)
}

fn frame_period(fps: u32) -> Result<Duration> {
    if fps == 0 {
        anyhow::bail!("Frame rate must be positive");
    }
    Ok(Duration::from_secs_f64(1.0 / fps as f64))
}

async fn run_play(
    mut config: EngineConfig,
    speeches: &Path,
    index: usize,
    style: Option<ToneStyle>,
    volume: Option<f32>,
    seconds: Option<f32>,
    fps: u32,
) -> Result<()> {
    let speech = load_speech(speeches, index)?;
    if let Some(style) = style {
        config.audio.style = style;
    }
    if let Some(volume) = volume {
        config.audio.volume = volume;
    }
    let period = frame_period(fps)?;

    let sample_rate = config.audio.sample_rate;
    let mut engine = Engine::new(config, Synthesizer::new(sample_rate))?;
    let player = open_player(sample_rate);

    let epoch = Instant::now();
    let report = engine.start(Arc::clone(&speech), index, Duration::ZERO)?;
    if let Some(e) = &report.audio_error {
        warn!("Audio disabled: {}", e);
    }
    info!("Playing {} ({} segments), Ctrl-C to stop", speech.title(), speech.len());

    let limit = seconds.map(|s| Duration::from_secs_f32(s.max(0.0)));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = interval.tick() => {
                let now = epoch.elapsed();
                let (update, samples) = engine.render_frame(now);
                player.push(&samples);
                if update.ticks > 0 {
                    if let (Some(state), Some(segment)) = (update.state, engine.current_segment()) {
                        info!(
                            "[{}] {:<8} run {:>2}  {}",
                            state.segment_index,
                            state.dominant.name(),
                            state.run_length,
                            segment.text
                        );
                    }
                }

                if limit.map_or(false, |limit| now >= limit) {
                    break;
                }
            }
        }
    }

    engine.stop();
    info!("Stopped after {:.1}s", epoch.elapsed().as_secs_f32());
    Ok(())
}

/// Where rendered samples go during real-time play
enum Player {
    #[cfg(feature = "playback")]
    Device(emoscape::audio::StreamingPlayer),
    Discard,
}

impl Player {
    fn push(&self, samples: &[f32]) {
        match self {
            #[cfg(feature = "playback")]
            Player::Device(player) => {
                player.push(samples);
            }
            Player::Discard => {
                let _ = samples;
            }
        }
    }
}

#[cfg(feature = "playback")]
fn open_player(sample_rate: u32) -> Player {
    match emoscape::audio::StreamingPlayer::new(sample_rate).and_then(|p| p.play().map(|_| p)) {
        Ok(player) => Player::Device(player),
        Err(e) => {
            warn!("No audio device: {}", e);
            Player::Discard
        }
    }
}

#[cfg(not(feature = "playback"))]
fn open_player(_sample_rate: u32) -> Player {
    warn!("Built without the `playback` feature; audio is rendered but not played");
    Player::Discard
}

#[allow(clippy::too_many_arguments)]
fn run_render(
    mut config: EngineConfig,
    speeches: &Path,
    index: usize,
    style: Option<ToneStyle>,
    seconds: f32,
    output: &Path,
    float: bool,
    frames: Option<&Path>,
    fps: u32,
    seed: Option<u64>,
) -> Result<()> {
    let speech = load_speech(speeches, index)?;
    if let Some(style) = style {
        config.audio.style = style;
    }
    let period = frame_period(fps)?;
    let sample_rate = config.audio.sample_rate;

    let synth = Synthesizer::new(sample_rate);
    let mut engine = match seed {
        Some(seed) => Engine::with_seed(config, synth, seed)?,
        None => Engine::new(config, synth)?,
    };

    let format = if float { WavFormat::Float32 } else { WavFormat::Pcm16 };
    let mut sink = WavSink::create(output, sample_rate, format)?;
    let mut frame_out = match frames {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => None,
    };

    let start = Instant::now();
    let report = engine.start(Arc::clone(&speech), index, Duration::ZERO)?;
    if let Some(e) = report.audio_error {
        anyhow::bail!("Synthesizer failed to start: {}", e);
    }

    let total = (seconds.max(0.0) as f64 / period.as_secs_f64()).ceil() as u64;
    let pb = create_progress_bar(total)?;
    pb.set_message(speech.title());

    for frame in 0..=total {
        let now = period * frame as u32;
        let (update, samples) = engine.render_frame(now);
        sink.write(&samples)?;
        if let Some(out) = frame_out.as_mut() {
            serde_json::to_writer(&mut *out, &engine.frame()).context("Failed to write frame")?;
            out.write_all(b"\n").context("Failed to write frame")?;
        }

        if let Some(state) = update.state.filter(|_| update.ticks > 0) {
            pb.set_message(format!("{} x{}", state.dominant, state.run_length));
        }
        pb.inc(1);
    }

    engine.stop();
    // let release tails ring out
    let tail = engine.graph().elapsed() + 2.0;
    let samples = engine.graph_mut().render_until(tail);
    sink.write(&samples)?;

    let written = sink.written();
    sink.finalize()?;
    if let Some(mut out) = frame_out {
        out.flush().context("Failed to flush frames")?;
    }

    pb.finish_with_message(format!("Rendered in {:.1}s", start.elapsed().as_secs_f32()));
    info!("Saved {} samples ({:.1}s) to {:?}", written, written as f64 / sample_rate as f64, output);
    Ok(())
}

fn run_inspect(path: &Path, index: Option<usize>) -> Result<()> {
    let speeches = load_speeches(path)?;

    match index {
        None => {
            println!("{:>3}  {:<48} {:>5}  {:<13} {:<8}", "#", "speech", "lines", "sentiment", "top");
            for (i, speech) in speeches.iter().enumerate() {
                let mut counts = [0usize; emoscape::emotion::EMOTION_COUNT];
                for segment in &speech.segments {
                    counts[segment.dominant().index()] += 1;
                }
                let top = EmotionLabel::all()
                    .iter()
                    .filter(|label| counts[label.index()] > 0)
                    .max_by_key(|label| counts[label.index()])
                    .map(|label| label.name())
                    .unwrap_or("-");
                println!(
                    "{:>3}  {:<48} {:>5}  {:<13} {:<8}",
                    i,
                    truncate(&speech.title(), 48),
                    speech.len(),
                    speech.sentiment_or_neutral().name(),
                    top
                );
            }
        }
        Some(index) => {
            let speech = speeches
                .get(index)
                .with_context(|| format!("Speech index {} out of range ({} speeches)", index, speeches.len()))?;
            speech.validate()?;

            let chord: Vec<_> = sentiment_chord(speech.sentiment_or_neutral())
                .iter()
                .map(|n| n.name)
                .collect();
            println!("{}", speech.title());
            println!("sentiment {} chord {}", speech.sentiment_or_neutral().name(), chord.join(" "));
            println!();
            println!("{:>4}  {:<8} {:>3} {:>5} {:>3} {:<4}  text", "seg", "dominant", "run", "k", "lvl", "note");

            let mut run = 0u32;
            let mut last = None;
            for (i, segment) in speech.segments.iter().enumerate() {
                let dominant = segment.dominant();
                run = if last == Some(dominant) { run + 1 } else { 1 };
                last = Some(dominant);
                println!(
                    "{:>4}  {:<8} {:>3} {:>5.2} {:>3} {:<4}  {}",
                    i,
                    dominant.name(),
                    run,
                    intensity_for_run(run),
                    escalation_level(run),
                    emotion_note(dominant).name,
                    truncate(&segment.text, 60)
                );
            }
        }
    }
    Ok(())
}

fn print_styles() {
    for &style in ToneStyle::all() {
        let config = style.config();
        println!("┌─────────────────────────────────────────────────────────────┐");
        println!("│ {:^59} │", style.name());
        println!("├─────────────────────────────────────────────────────────────┤");
        println!(
            "│ Envelope: {:49} │",
            format!(
                "A {:.2} D {:.2} S {:.2} R {:.2}",
                config.envelope.attack, config.envelope.decay, config.envelope.sustain, config.envelope.release
            )
        );
        println!("│ Voicing: {:50} │", format!("{:?}", config.voicing));
        println!("│ Portamento: {:47} │", format!("{:.2}s", config.portamento));
        println!("│ Note: {:53} │", format!("{:?}", config.duration));
        for &label in EmotionLabel::all() {
            println!(
                "│   {:<9} {:<10} {:>6.0} Hz {:34} │",
                label.name(),
                format!("{:?}", config.waveform(label)),
                config.cutoff(label),
                ""
            );
        }
        println!("└─────────────────────────────────────────────────────────────┘");
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

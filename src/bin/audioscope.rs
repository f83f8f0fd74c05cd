use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "audioscope", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample one feature frame at a playback time.
    Frame(FrameArgs),
    /// Dump every feature frame inside a timeline tick window.
    Range(RangeArgs),
    /// Sample the most recent frames before a playback time.
    History(HistoryArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Input timeline snapshot JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline track id.
    #[arg(long)]
    track: String,

    /// Feature key (e.g. `waveform`, `rms`).
    #[arg(long)]
    feature: String,

    /// Restrict lookup to one calculator.
    #[arg(long)]
    calculator: Option<String>,

    /// Channel: index, alias or semantic token.
    #[arg(long)]
    channel: Option<String>,

    /// Band index for multi-band features.
    #[arg(long)]
    band: Option<usize>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Playback time in seconds.
    #[arg(long)]
    time: f64,

    /// Interpolation between frames.
    #[arg(long, value_enum, default_value_t = InterpChoice::Linear)]
    interp: InterpChoice,

    /// Box smoothing radius in frames.
    #[arg(long, default_value_t = 0)]
    smoothing: u32,
}

#[derive(Args, Debug)]
struct RangeArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Window start tick (inclusive).
    #[arg(long)]
    start_tick: f64,

    /// Window end tick (exclusive).
    #[arg(long)]
    end_tick: f64,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Playback time in seconds; frames strictly before it are returned.
    #[arg(long)]
    time: f64,

    /// Maximum number of frames.
    #[arg(long, default_value_t = 16)]
    frames: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InterpChoice {
    Nearest,
    Linear,
    Cubic,
}

impl From<InterpChoice> for audioscope::SampleInterpolation {
    fn from(value: InterpChoice) -> Self {
        match value {
            InterpChoice::Nearest => Self::Nearest,
            InterpChoice::Linear => Self::Linear,
            InterpChoice::Cubic => Self::Cubic,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Range(args) => cmd_range(args),
        Command::History(args) => cmd_history(args),
    }
}

fn read_store(path: &Path) -> anyhow::Result<audioscope::TimelineStore> {
    let f = File::open(path).with_context(|| format!("open timeline '{}'", path.display()))?;
    let r = BufReader::new(f);
    let def: audioscope::TimelineSnapshotDef =
        serde_json::from_reader(r).with_context(|| "parse timeline JSON")?;
    audioscope::TimelineStore::from_snapshot(def)
        .with_context(|| format!("load timeline '{}'", path.display()))
}

fn channel_selector(raw: &str) -> audioscope::ChannelSelector {
    match raw.trim().parse::<f64>() {
        Ok(i) => audioscope::ChannelSelector::Index(i),
        Err(_) => audioscope::ChannelSelector::alias(raw),
    }
}

fn descriptor(source: &SourceArgs) -> audioscope::AudioFeatureDescriptor {
    audioscope::AudioFeatureDescriptor {
        feature_key: source.feature.clone(),
        calculator_id: source.calculator.clone(),
        band: source.band,
        channel: source.channel.as_deref().map(channel_selector),
        smoothing: None,
        interpolation: None,
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).with_context(|| "write JSON")?;
    writeln!(out)?;
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let store = read_store(&args.source.in_path)?;
    let state = store.snapshot();
    let descriptor = descriptor(&args.source);
    let options = audioscope::SamplingOptions {
        interpolation: Some(args.interp.into()),
        smoothing: Some(args.smoothing),
    };

    let mut sampler = audioscope::FeatureSampler::default();
    let sample = sampler.sample_feature_frame(
        &state,
        &args.source.track,
        &descriptor,
        args.time,
        Some(&options),
    );
    let diagnostics = state
        .track(&args.source.track)
        .and_then(|t| sampler.diagnostics().latest(t.source_id()));

    print_json(&serde_json::json!({
        "sample": sample,
        "diagnostics": diagnostics,
        "fallbacks": sampler.diagnostics().fallbacks().collect::<Vec<_>>(),
    }))
}

fn cmd_range(args: RangeArgs) -> anyhow::Result<()> {
    let store = read_store(&args.source.in_path)?;
    let state = store.snapshot();
    let window = audioscope::TickRange::new(args.start_tick, args.end_tick)
        .with_context(|| "invalid tick window")?;
    let options = audioscope::RangeOptions {
        channel: args.source.channel.as_deref().map(channel_selector),
        band: args.source.band,
        calculator_id: args.source.calculator.clone(),
    };

    let range = audioscope::sample_audio_feature_range(
        &state,
        &args.source.track,
        &args.source.feature,
        window.start,
        window.end,
        &options,
    );
    print_json(&range)
}

fn cmd_history(args: HistoryArgs) -> anyhow::Result<()> {
    let store = read_store(&args.source.in_path)?;
    let state = store.snapshot();
    let descriptor = descriptor(&args.source);

    let mut sampler = audioscope::FeatureSampler::default();
    let history = sampler.sample_feature_history(
        &state,
        &args.source.track,
        &descriptor,
        args.time,
        args.frames,
    );
    print_json(&history)
}

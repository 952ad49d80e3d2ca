//! `voiceclone` command-line front end.
//!
//! Usage:
//!   voiceclone list  --sound-dir Sound
//!   voiceclone speak --config voiceclone.json --text "Hello there." --out out.wav
//!   voiceclone speak --text-file story.txt --language vi --out story.wav
//!
//! Set `RUST_LOG=voiceclone=debug` for per-chunk progress.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voiceclone::{select_best, ClonerConfig, CommandBackend, VoiceCloner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Voice-cloning text-to-speech")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Common {
    /// JSON config file (all sections optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of reference recordings (overrides the config)
    #[arg(short, long)]
    sound_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the reference catalog and the voice samples that would be used
    List {
        #[command(flatten)]
        common: Common,
    },

    /// Synthesize text with the cloned voice
    Speak {
        #[command(flatten)]
        common: Common,

        /// Text to synthesize
        #[arg(short, long, conflicts_with = "text_file")]
        text: Option<String>,

        /// Read the text from a UTF-8 file
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// Language code (defaults to the config's default_language)
        #[arg(short, long)]
        language: Option<String>,

        /// Output WAV file
        #[arg(short, long, default_value = "output.wav")]
        out: PathBuf,
    },
}

fn load_config(common: &Common) -> Result<ClonerConfig> {
    let mut config = match &common.config {
        Some(path) => ClonerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClonerConfig::default(),
    };
    if let Some(dir) = &common.sound_dir {
        config.catalog.sound_dir = dir.clone();
    }
    Ok(config)
}

fn list(common: &Common) -> Result<()> {
    let config = load_config(common)?;
    let mut catalog = config.build_catalog();
    catalog.discover().context("scanning sound directory")?;

    println!("Sound dir : {}", catalog.root().display());
    println!("Files     : {}", catalog.len());
    for info in catalog.inspect_all() {
        println!(
            "  {:<40} {:>7.2} s  {:>6} Hz  {} ch  {}-bit",
            info.path.display(),
            info.duration_seconds,
            info.sample_rate,
            info.channels,
            info.bits_per_sample
        );
    }
    if catalog.is_empty() {
        return Ok(());
    }

    let selected = select_best(&catalog, &config.selection)?;
    println!();
    println!("Voice samples ({}):", selected.len());
    for (i, sample) in selected.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        println!("{marker} {} ({:.2} s)", sample.path.display(), sample.duration_seconds);
    }
    Ok(())
}

fn read_text(text: Option<String>, text_file: Option<&Path>) -> Result<String> {
    match (text, text_file) {
        (Some(t), _) => Ok(t),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading text file {}", path.display())),
        (None, None) => bail!("either --text or --text-file is required"),
    }
}

fn speak(
    common: &Common,
    text: Option<String>,
    text_file: Option<&Path>,
    language: Option<String>,
    out: &Path,
) -> Result<()> {
    let config = load_config(common)?;
    let text = read_text(text, text_file)?;
    let language = language.unwrap_or_else(|| config.synthesis.default_language.clone());

    let backend = CommandBackend::new(config.backend.clone());
    let mut cloner = VoiceCloner::new(config, backend).context("building voice cloner")?;
    cloner.initialize().context("initializing voice cloner")?;

    let audio = cloner
        .synthesize(&text, &language, Some(out))
        .context("synthesis failed")?;

    info!(path = %out.display(), seconds = audio.duration(), "done");
    println!("Wrote {} ({:.2} s)", out.display(), audio.duration());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::List { common } => list(&common),
        Command::Speak { common, text, text_file, language, out } => {
            speak(&common, text, text_file.as_deref(), language, &out)
        }
    }
}

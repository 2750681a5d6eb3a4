use std::path::PathBuf;

use clap::Parser;
use eqplayer_lib::{RunOptions, run};

/// Play a mono track with a live 4-band equalizer, controlled from stdin
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Audio file to play (WAV, FLAC, MP3, AAC)
    track: PathBuf,

    /// JSON engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Play on the simulated output instead of the sound card
    #[arg(long)]
    headless: bool,

    /// Initial volume, 0-100
    #[arg(short, long)]
    volume: Option<f32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(RunOptions {
        track: cli.track,
        config: cli.config,
        headless: cli.headless,
        volume: cli.volume,
    }) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

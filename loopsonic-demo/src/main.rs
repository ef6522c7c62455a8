mod cli;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Play an audio file with a repeating loop region", long_about = None)]
pub struct Arguments {
    /// Audio file to play (wav, flac, ogg or mp3).
    file: PathBuf,

    /// First frame of the track.
    #[arg(long)]
    track_start: Option<u64>,

    /// First frame of the loop region.
    #[arg(long)]
    loop_start: Option<u64>,

    /// Frame right after the loop region.
    #[arg(long)]
    loop_end: Option<u64>,

    /// Frame right after the track.
    #[arg(long)]
    track_end: Option<u64>,

    /// Number of repeats; -1 loops forever.
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    loops: i64,

    /// Output volume between 0.0 and 1.0.
    #[arg(short, long, default_value_t = 1.0)]
    volume: f32,

    /// Stop after this many seconds even if the track is still looping.
    #[arg(long)]
    max_seconds: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let arguments = Arguments::parse();
    cli::run(arguments)
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use songmaker::audio::output::list_devices;
use songmaker::audio::{CpalCueSink, CueSink, NullCueSink, SampleBank};
use songmaker::config::PlayerConfig;
use songmaker::playback::{play_and_run, PlaybackSession, RunOutcome, SessionOptions};
use songmaker::song::watcher::validate_song;
use songmaker::song::{RandomSongGenerator, Song, SongEvent, SongWatcher};
use songmaker::timing::{FrameTicker, TimingPlan};
use songmaker::ui::{self, Player, StopKeys};

const DEFAULT_LOG_FILTER: &str = "songmaker=info";

/// Let the final click ring out before the terminal is restored
const TAIL: Duration = Duration::from_millis(500);

fn print_usage() {
    println!("Songmaker - Song Structure Player");
    println!();
    println!("Usage: songmaker [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --info <SONG>                       Print the song's timing plan");
    println!("  --validate <SONG>                   Check a song file and report the first problem");
    println!("  --play <SONG> [--config <FILE>] [--mute]");
    println!("                                      Play a song with a metronome");
    println!("  --random [SEED]                     Print a random song as JSON");
    println!("  --watch <SONG>                      Print the timing plan whenever the file changes");
    println!("  --help                              Show this help message");
    println!();
    println!("Set RUST_LOG to change log output (default {}).", DEFAULT_LOG_FILTER);
}

fn setup_logging() {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::builder().parse_lossy(directives))
        .with_writer(std::io::stderr)
        .init();
}

fn print_plan(song: &Song) {
    let plan = song.timing_plan();

    println!("{}", song.name());
    println!(
        "{} blocks | {} measures | {} beats | {}",
        plan.len(),
        plan.total_measures(),
        plan.total_beats(),
        ui::format_duration(plan.total_seconds())
    );
    println!();
    println!(
        "{:>3}  {:<12} {:<6} {:>5} {:>5} {:>7} {:>7}  {}",
        "#", "Part", "Meter", "Bars", "BPM", "Beat", "Start", "Key"
    );

    for (index, (block, record)) in song.blocks().iter().zip(plan.records()).enumerate() {
        println!(
            "{:>3}  {:<12} {:<6} {:>5} {:>5} {:>7} {:>7}  {}",
            index + 1,
            ui::format_part(block.kind()),
            block.time_signature().to_string(),
            record.measures,
            record.tempo,
            record.start_beat_offset,
            ui::format_duration(record.start_time_offset),
            ui::abbreviate_key(block.root_note(), block.mode())
        );
    }
}

fn show_info(path: &str) -> Result<()> {
    let song = Song::load(path).with_context(|| format!("Failed to load song {}", path))?;
    print_plan(&song);
    Ok(())
}

fn validate(path: &str) -> Result<()> {
    let song = validate_song(path)?;
    let plan = song.timing_plan();
    println!(
        "OK: {} ({} blocks, {})",
        song.name(),
        song.len(),
        ui::format_duration(plan.total_seconds())
    );
    Ok(())
}

fn print_random(seed: Option<u64>) -> Result<()> {
    let mut generator = match seed {
        Some(seed) => RandomSongGenerator::with_seed(seed),
        None => RandomSongGenerator::new(),
    };
    let song = generator.generate().context("Failed to generate song")?;
    println!("{}", song.to_json()?);
    Ok(())
}

fn watch(path: &str) -> Result<()> {
    let song = Song::load(path).with_context(|| format!("Failed to load song {}", path))?;
    print_plan(&song);

    let watcher = SongWatcher::new(path, None)?;
    println!();
    println!("Watching {} (press Ctrl+C to stop)...", watcher.watched_path().display());

    while let Some(event) = watcher.recv() {
        match event {
            SongEvent::Reloaded(song) => {
                println!();
                print_plan(&song);
            }
            SongEvent::Error(message) => eprintln!("Error: {}", message),
            SongEvent::FileCreated(path) => info!(path = ?path, "song file created"),
            SongEvent::FileDeleted(path) => warn!(path = ?path, "song file deleted"),
        }
    }

    Ok(())
}

fn play(path: &str, config_path: Option<&str>, mute: bool) -> Result<()> {
    let song = Song::load(path).with_context(|| format!("Failed to load song {}", path))?;
    let config = match config_path {
        Some(config_path) => PlayerConfig::load(config_path)
            .with_context(|| format!("Failed to load config {}", config_path))?,
        None => PlayerConfig::default(),
    };

    let plan = song.timing_plan();
    if plan.is_empty() {
        println!("{} has no blocks to play", song.name());
        return Ok(());
    }

    let max_tempo = config.max_safe_tempo();
    if let Some(block) = song.blocks().iter().find(|b| b.tempo() > max_tempo) {
        warn!(
            tempo = block.tempo(),
            max_tempo, "tempo is faster than the frame rate; beats will be caught up in batches"
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    let outcome = if config.sound_enabled && !mute {
        let samples = SampleBank::load(Path::new(&config.samples_dir), config.sample_rate);
        match CpalCueSink::new(config.audio_config()) {
            Ok(sink) => run_player(&runtime, sink, samples, song, plan, &config)?,
            Err(e) => {
                warn!(error = %e, devices = ?list_devices(), "audio unavailable, playing silently");
                run_player(&runtime, NullCueSink::new(), samples, song, plan, &config)?
            }
        }
    } else {
        run_player(&runtime, NullCueSink::new(), SampleBank::empty(), song, plan, &config)?
    };

    info!(?outcome, "playback ended");
    Ok(())
}

fn run_player<S: CueSink>(
    runtime: &tokio::runtime::Runtime,
    sink: S,
    samples: SampleBank,
    song: Song,
    plan: TimingPlan,
    config: &PlayerConfig,
) -> Result<RunOutcome> {
    let player = Player::new(song, plan.clone()).context("Failed to open terminal")?;
    let mut session = PlaybackSession::new(sink, samples, player)
        .with_options(SessionOptions::from(config));
    session.observer_mut().draw()?;

    let outcome = runtime.block_on(async {
        let mut ticks = FrameTicker::with_frame_rate(config.effective_frame_rate());
        let mut keys = StopKeys::spawn(config.frame_interval());
        let cancel = async {
            keys.pressed().await;
        };

        let outcome = play_and_run(&mut session, plan, &mut ticks, cancel).await;
        if outcome == RunOutcome::Finished {
            tokio::time::sleep(TAIL).await;
        }
        outcome
    });

    Ok(outcome)
}

fn require_arg<'a>(args: &'a [String], option: &str) -> &'a str {
    match args.get(2) {
        Some(arg) => arg,
        None => {
            eprintln!("Error: {} requires a song file", option);
            std::process::exit(1);
        }
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Songmaker - Song Structure Player");
        println!("Run with --help for usage information");
        return Ok(());
    }

    setup_logging();

    match args[1].as_str() {
        "--info" => {
            show_info(require_arg(&args, "--info"))?;
        }
        "--validate" => {
            let path = require_arg(&args, "--validate");
            if let Err(e) = validate(path) {
                eprintln!("Invalid: {:#}", e);
                std::process::exit(1);
            }
        }
        "--play" => {
            let path = require_arg(&args, "--play");
            let mut config_path = None;
            let mut mute = false;
            let mut rest = args[3..].iter();
            while let Some(arg) = rest.next() {
                match arg.as_str() {
                    "--config" => match rest.next() {
                        Some(file) => config_path = Some(file.as_str()),
                        None => {
                            eprintln!("Error: --config requires a file");
                            std::process::exit(1);
                        }
                    },
                    "--mute" => mute = true,
                    other => {
                        eprintln!("Unknown option: {}", other);
                        print_usage();
                        std::process::exit(1);
                    }
                }
            }
            play(path, config_path, mute)?;
        }
        "--random" => {
            let seed = match args.get(2) {
                Some(seed) => Some(
                    seed.parse::<u64>()
                        .map_err(|_| anyhow::anyhow!("Invalid seed: {}", seed))?,
                ),
                None => None,
            };
            print_random(seed)?;
        }
        "--watch" => {
            watch(require_arg(&args, "--watch"))?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

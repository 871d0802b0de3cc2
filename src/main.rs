mod app;
mod ui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use stemoxide::audio::AudioEngine;
use stemoxide::config::{default_config_path, PlayerConfig};
use stemoxide::jobs::JobStatus;
use stemoxide::library::StemPaths;
use stemoxide::StemPlayer;

use app::App;
use ui::Theme;

/// Stemoxide - synchronized four-stem player
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,

    /// Theme to use for the interface (overrides the config file)
    #[arg(long)]
    theme: Option<String>,

    /// List available themes and exit
    #[arg(long)]
    list_themes: bool,

    /// Config file (default ~/.stemoxide/config.json)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Play four stem files
    Play {
        vocals: PathBuf,
        other: PathBuf,
        drums: PathBuf,
        bass: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Manage saved songs
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
    /// Inspect and edit the stem-separation job queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Print the effective configuration
    Config {
        /// Write it back to the config file, filling in missing fields
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    /// List saved songs, newest first
    List,
    /// Save the stems found in a song folder
    Add {
        #[arg(long)]
        title: String,
        folder: PathBuf,
    },
    /// Remove a saved song by title
    Remove { title: String },
    /// Play a saved song by title
    Play { title: String },
}

#[derive(Subcommand, Debug)]
enum QueueAction {
    /// List jobs, newest first
    List,
    /// Track a separation session
    Add { session_id: String, url: String },
    /// Mark a session finished
    Ready {
        session_id: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Mark a session failed
    Fail { session_id: String },
    /// Stop tracking a session
    Remove { session_id: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_themes {
        println!("Available themes:");
        for theme in Theme::available_themes() {
            println!("  {}", theme);
        }
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = PlayerConfig::load(&config_path)?;
    init_logging(&config.log_path)?;

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let theme_name = args.theme.as_deref().unwrap_or(&config.theme);
    let theme = Theme::from_name(theme_name).unwrap_or_else(|| {
        eprintln!(
            "Warning: Unknown theme '{}', using default. Use --list-themes to see available themes.",
            theme_name
        );
        Theme::default()
    });

    match command {
        CliCommand::Play {
            vocals,
            other,
            drums,
            bass,
            title,
        } => {
            let stems = StemPaths {
                vocals,
                other,
                drums,
                bass,
            };
            play(&config, theme, &stems, title)
        }
        CliCommand::Library { action } => {
            let mut library = config.open_library()?;
            match action {
                LibraryAction::List => {
                    if library.is_empty() {
                        println!("Library is empty");
                    }
                    for song in library.songs() {
                        println!("{:>4}  {}  ({})", song.id, song.title, song.folder.display());
                    }
                    Ok(())
                }
                LibraryAction::Add { title, folder } => {
                    let id = library.add_folder(&title, &folder)?;
                    println!("Added '{}' (id {})", title, id);
                    Ok(())
                }
                LibraryAction::Remove { title } => {
                    let Some(id) = library.find_by_title(&title).map(|s| s.id) else {
                        bail!("No saved song titled '{}'", title);
                    };
                    library.remove(id)?;
                    println!("Removed '{}'", title);
                    Ok(())
                }
                LibraryAction::Play { title } => {
                    let Some(song) = library.find_by_title(&title).cloned() else {
                        bail!("No saved song titled '{}'", title);
                    };
                    play(&config, theme, &song.stems, Some(song.title))
                }
            }
        }
        CliCommand::Queue { action } => queue(&config, action),
        CliCommand::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if write {
                config.save(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
            Ok(())
        }
    }
}

fn queue(config: &PlayerConfig, action: QueueAction) -> Result<()> {
    let mut queue = config.open_queue()?;
    match action {
        QueueAction::List => {
            if queue.items().is_empty() {
                println!("Queue is empty");
            }
            for item in queue.items() {
                println!(
                    "{:<10} {}  {}  {}",
                    format!("{:?}", item.status),
                    item.session_id,
                    item.title.as_deref().unwrap_or("-"),
                    item.source_url
                );
            }
        }
        QueueAction::Add { session_id, url } => {
            queue.enqueue(&session_id, &url)?;
            println!("Queued {}", session_id);
        }
        QueueAction::Ready { session_id, title } => {
            if !queue.update_status(&session_id, JobStatus::Ready, title)? {
                bail!("No queued session '{}'", session_id);
            }
            println!("{} is ready", session_id);
        }
        QueueAction::Fail { session_id } => {
            if !queue.update_status(&session_id, JobStatus::Failed, None)? {
                bail!("No queued session '{}'", session_id);
            }
            println!("{} marked failed", session_id);
        }
        QueueAction::Remove { session_id } => {
            if queue.remove(&session_id)?.is_none() {
                bail!("No queued session '{}'", session_id);
            }
            println!("Removed {}", session_id);
        }
    }
    Ok(())
}

fn play(
    config: &PlayerConfig,
    theme: Theme,
    stems: &StemPaths,
    title: Option<String>,
) -> Result<()> {
    let engine = AudioEngine::new()?;
    let player = StemPlayer::new(engine.bus(), config.player_options())
        .context("Failed to start control lane")?;
    player.load_with_title(&stems.as_array(), None, title)?;

    let mut app = App::new(player, engine, theme);
    app.run()
}

/// Log to a file so the TUI owns the terminal
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

//! `songsort`: ordena la biblioteca local en playlists, canción a canción.

mod app;
mod commands;
mod sort;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use songsort_core::{DateRangeMode, SelectionMode, SelectionSet, library::PlaylistId};
use tracing_subscriber::EnvFilter;

use crate::app::App;

#[derive(Debug, Parser)]
#[command(name = "songsort", version, about = "Sort your music library into playlists, one song at a time")]
struct Cli {
    /// Base directory for configuration, data and cache
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show or change the library access consent
    Access {
        #[arg(long, conflicts_with = "revoke")]
        grant: bool,
        #[arg(long)]
        revoke: bool,
    },
    /// Import audio files, optionally adding new folders first
    Scan { folders: Vec<PathBuf> },
    /// List playlists or create one
    Playlists {
        #[command(subcommand)]
        action: Option<PlaylistAction>,
    },
    /// Show or set how candidate songs are chosen
    Mode { mode: Option<SelectionMode> },
    /// Edit one of the playlist sets (exclude, include, destination)
    Select {
        set: SelectionSet,
        #[arg(long, conflicts_with_all = ["none", "ids"])]
        all: bool,
        #[arg(long, conflicts_with = "ids")]
        none: bool,
        ids: Vec<PlaylistId>,
    },
    /// Configure the added-date filter
    Dates {
        mode: DateRangeMode,
        #[arg(long, value_parser = parse_date)]
        start: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_date)]
        end: Option<DateTime<Utc>>,
        /// Move the start date forward after each sorted song
        #[arg(long, conflicts_with = "no_auto_advance")]
        auto_advance: bool,
        /// Keep the start date fixed
        #[arg(long)]
        no_auto_advance: bool,
    },
    /// Play each song automatically when it comes up for review
    Autoplay { state: Switch },
    /// Show the current preferences and library summary
    Status,
    /// List the genre categories
    Genres,
    /// Start an interactive sorting session
    Sort,
}

#[derive(Debug, Subcommand)]
enum PlaylistAction {
    Create { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

/// Fechas en formato `AAAA-MM-DD`, interpretadas como medianoche UTC.
fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    let date: NaiveDate = value
        .parse()
        .map_err(|e| format!("invalid date {value:?}: {e}"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Command::Genres = cli.command {
        commands::genres();
        return Ok(());
    }

    let mut app = App::open(cli.base_dir).await?;

    match cli.command {
        Command::Access { grant, revoke } => commands::access(&mut app, grant, revoke).await?,
        Command::Scan { folders } => commands::scan(&mut app, folders).await?,
        Command::Playlists { action: None } => commands::list_playlists(&app),
        Command::Playlists {
            action: Some(PlaylistAction::Create { name }),
        } => commands::create_playlist(&mut app, &name).await?,
        Command::Mode { mode } => commands::mode(&mut app, mode)?,
        Command::Select { set, all, none, ids } => commands::select(&mut app, set, all, none, &ids)?,
        Command::Dates {
            mode,
            start,
            end,
            auto_advance,
            no_auto_advance,
        } => {
            let auto_advance = match (auto_advance, no_auto_advance) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::dates(&mut app, mode, start, end, auto_advance)?
        }
        Command::Autoplay { state } => commands::autoplay(&mut app, state == Switch::On)?,
        Command::Status => commands::status(&app)?,
        Command::Genres => {}
        Command::Sort => sort::run(&mut app).await?,
    }

    app.organizer.flush_writes().await;
    Ok(())
}

use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use songsort_core::{
    AuthorizationStatus, DateRange, DateRangeMode, SelectionMode, SelectionSet,
    library::{Genre, PlaylistId},
};
use tracing::warn;

use crate::app::App;

const GRANT_HINT: &str = "run `songsort access --grant` first";

pub async fn access(app: &mut App, grant: bool, revoke: bool) -> Result<()> {
    if grant {
        let status = app.organizer.request_access().await?;
        if status.is_authorized() {
            app.organizer.load_playlists().await?;
        }
    } else if revoke {
        app.manager.library().revoke_authorization()?;
    }

    let status = app.organizer.authorization();
    println!("Library access: {}", describe_access(status));
    if status == AuthorizationStatus::Denied {
        for folder in &app.manager.config().include_paths {
            println!("  {}", folder.display());
        }
    }
    Ok(())
}

fn describe_access(status: AuthorizationStatus) -> &'static str {
    match status {
        AuthorizationStatus::NotDetermined => "not requested",
        AuthorizationStatus::Denied => "denied (some music folders are not readable)",
        AuthorizationStatus::Authorized => "granted",
    }
}

pub async fn scan(app: &mut App, folders: Vec<PathBuf>) -> Result<()> {
    for folder in folders {
        if app.manager.add_include(&folder)? {
            println!("Added folder {}", folder.display());
        }
    }

    if !app.organizer.authorization().is_authorized() {
        bail!("library access is not granted, {GRANT_HINT}");
    }

    let report = app.manager.scan().await?;
    println!(
        "Found {} files: {} new, {} updated, {} removed, {} too short, {} unreadable",
        report.found, report.imported, report.updated, report.removed, report.skipped, report.failed
    );

    app.organizer.load_playlists().await?;
    Ok(())
}

pub fn list_playlists(app: &App) {
    let playlists = app.organizer.playlists();
    if playlists.is_empty() {
        println!("No playlists. Create one with `songsort playlists create <name>`.");
        return;
    }

    let selections = app.organizer.selections();
    for playlist in playlists {
        let marks: String = [
            (SelectionSet::Destination, 'D'),
            (SelectionSet::Included, 'I'),
            (SelectionSet::Excluded, 'X'),
        ]
        .iter()
        .map(|&(set, mark)| if selections.contains(set, playlist.id) { mark } else { '.' })
        .collect();
        println!("{:>6}  [{}]  {}", playlist.id, marks, playlist.name);
    }
}

pub async fn create_playlist(app: &mut App, name: &str) -> Result<()> {
    let playlist = app.organizer.create_destination_playlist(name).await?;
    println!("Created playlist {} ({}) and added it to the destinations", playlist.name, playlist.id);
    Ok(())
}

pub fn mode(app: &mut App, mode: Option<SelectionMode>) -> Result<()> {
    match mode {
        Some(mode) => {
            app.organizer.set_selection_mode(mode)?;
            println!("Selection mode: {} ({})", mode, mode.description());
        }
        None => {
            let current = app.organizer.selection_mode();
            for mode in SelectionMode::ALL {
                let marker = if *mode == current { '*' } else { ' ' };
                println!("{marker} {:<20} {}", mode.name(), mode.description());
            }
        }
    }
    Ok(())
}

pub fn select(app: &mut App, set: SelectionSet, all: bool, none: bool, ids: &[PlaylistId]) -> Result<()> {
    if !app.organizer.authorization().is_authorized() {
        bail!("playlists are not available, {GRANT_HINT}");
    }

    if all {
        app.organizer.select_all(set)?;
    } else if none {
        app.organizer.clear_selection(set)?;
    } else if !ids.is_empty() {
        let unknown: Vec<_> = ids
            .iter()
            .filter(|id| !app.organizer.playlists().iter().any(|p| p.id == **id))
            .collect();
        if !unknown.is_empty() {
            warn!("Se ignoran playlists desconocidas: {:?}", unknown);
        }
        app.organizer.replace_selection(set, ids)?;
    }

    let names: Vec<&str> = app
        .organizer
        .selections()
        .get(set)
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    if names.is_empty() {
        println!("{set}: (none)");
    } else {
        println!("{set}: {}", names.join(", "));
    }
    Ok(())
}

pub fn dates(
    app: &mut App,
    mode: DateRangeMode,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    auto_advance: Option<bool>,
) -> Result<()> {
    let range = merge_range(&app.organizer.date_range(), mode, start, end, auto_advance);

    if let (Some(start), Some(end)) = range.bounds() {
        if start >= end {
            bail!("the start date must be before the end date");
        }
    }

    app.organizer.set_date_range(&range)?;
    println!("Added date: {}", describe_range(&range));
    Ok(())
}

/// Lo que no se indica conserva el valor guardado.
fn merge_range(
    current: &DateRange,
    mode: DateRangeMode,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    auto_advance: Option<bool>,
) -> DateRange {
    DateRange {
        mode,
        start: start.or(current.start),
        end: end.or(current.end),
        auto_advance: auto_advance.unwrap_or(current.auto_advance),
    }
}

pub fn describe_range(range: &DateRange) -> String {
    let fmt = |date: Option<DateTime<Utc>>| {
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "(any)".to_string())
    };
    let (start, end) = range.bounds();
    let text = match range.mode {
        DateRangeMode::Before => format!("before {}", fmt(end)),
        DateRangeMode::After => format!("after {}", fmt(start)),
        DateRangeMode::Between => format!("between {} and {}", fmt(start), fmt(end)),
    };
    if range.auto_advance {
        format!("{text}, advancing after each song")
    } else {
        text
    }
}

pub fn autoplay(app: &mut App, enabled: bool) -> Result<()> {
    app.organizer.set_autoplay(enabled)?;
    println!("Autoplay {}", if enabled { "on" } else { "off" });
    Ok(())
}

pub fn status(app: &App) -> Result<()> {
    let organizer = &app.organizer;
    let mode = organizer.selection_mode();

    println!("Library access:  {}", describe_access(organizer.authorization()));
    println!("Preferences:     {}", app.paths.preferences_file.display());
    println!("Music folders:");
    for folder in &app.manager.config().include_paths {
        println!("  {}", folder.display());
    }
    if organizer.authorization().is_authorized() {
        let songs = app.manager.library().storage().song_count()?;
        println!("Songs:           {}", songs);
        println!("Playlists:       {}", organizer.playlists().len());
    }

    println!("Selection mode:  {} ({})", mode, mode.description());
    if let Some(set) = mode.backing_set() {
        println!("  {} playlists selected", organizer.selections().get(set).len());
    }
    if mode == SelectionMode::AddedDate {
        println!("  {}", describe_range(&organizer.date_range()));
    }
    println!("Destinations:    {}", organizer.selections().get(SelectionSet::Destination).len());
    println!("Autoplay:        {}", if organizer.autoplay() { "on" } else { "off" });
    println!("Sessions sorted: {}", organizer.sessions_count());
    Ok(())
}

pub fn genres() {
    for genre in Genre::catalog() {
        println!("{} {}", genre.emoji(), genre);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap())
    }

    #[test]
    fn unspecified_date_options_keep_their_stored_values() {
        let stored = DateRange {
            mode: DateRangeMode::After,
            start: day(1),
            end: day(9),
            auto_advance: true,
        };

        let range = merge_range(&stored, DateRangeMode::After, day(3), None, None);
        assert_eq!(range.start, day(3));
        assert_eq!(range.end, day(9));
        assert!(range.auto_advance);

        let range = merge_range(&stored, DateRangeMode::Between, None, None, Some(false));
        assert_eq!(range.mode, DateRangeMode::Between);
        assert_eq!(range.start, day(1));
        assert!(!range.auto_advance);
    }

    #[test]
    fn date_ranges_are_described_by_their_effective_bounds() {
        let range = DateRange {
            mode: DateRangeMode::After,
            start: day(1),
            end: day(9),
            auto_advance: true,
        };
        assert_eq!(describe_range(&range), "after 2024-05-01, advancing after each song");

        let range = DateRange {
            mode: DateRangeMode::Before,
            start: None,
            end: None,
            auto_advance: false,
        };
        assert_eq!(describe_range(&range), "before (any)");

        let range = DateRange {
            mode: DateRangeMode::Between,
            start: day(1),
            end: day(9),
            auto_advance: false,
        };
        assert_eq!(describe_range(&range), "between 2024-05-01 and 2024-05-09");
    }
}

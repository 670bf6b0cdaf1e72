use anyhow::{Result, bail};
use songsort_core::{SessionState, SortEvent, library::Song};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::App;

const HELP: &str = "\
  <n>        toggle destination playlist n
  n          add to the marked playlists and go to the next song
  p          play / pause
  b, f       jump 30 s backward / forward
  l          show the queue
  c <name>   create a destination playlist
  q          stop sorting
  ?          this help";

/// Una línea de la consola interactiva.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Toggle(usize),
    Next,
    PlayPause,
    Backward,
    Forward,
    Queue,
    Create(String),
    Quit,
    Help,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>() {
        return Input::Toggle(n);
    }
    if let Some(name) = line.strip_prefix("c ") {
        return Input::Create(name.trim().to_string());
    }
    match line {
        "" => Input::Empty,
        "n" => Input::Next,
        "p" => Input::PlayPause,
        "b" => Input::Backward,
        "f" => Input::Forward,
        "l" => Input::Queue,
        "q" => Input::Quit,
        "?" | "h" => Input::Help,
        other => Input::Unknown(other.to_string()),
    }
}

enum Step {
    Line(Option<String>),
    Event(SortEvent),
}

pub async fn run(app: &mut App) -> Result<()> {
    if !app.organizer.authorization().is_authorized() {
        bail!("library access is not granted, run `songsort access --grant` first");
    }

    let state = app.organizer.begin_sorting().await?;
    if state == SessionState::NoSongsFound {
        println!("No songs match the current selection mode ({}).", app.organizer.selection_mode());
        return Ok(());
    }

    println!("{HELP}\n");
    show_current(app);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Line(line?),
            Some(event) = app.events.recv() => Step::Event(event),
        };

        let line = match step {
            Step::Event(event) => {
                print_event(app, &event);
                continue;
            }
            Step::Line(None) => {
                app.organizer.cancel()?;
                break;
            }
            Step::Line(Some(line)) => line,
        };

        match parse_input(&line) {
            Input::Toggle(n) => {
                let playlist = n
                    .checked_sub(1)
                    .and_then(|i| app.organizer.session().destination().get(i))
                    .map(|p| p.id);
                match playlist {
                    Some(id) => {
                        app.organizer.toggle(id)?;
                        show_destinations(app);
                    }
                    None => println!("No destination playlist {n}"),
                }
            }
            Input::Next => match app.organizer.commit_and_advance()? {
                SessionState::Reviewing { .. } => show_current(app),
                SessionState::Finished { count } => {
                    println!("All done, {count} songs sorted.");
                    break;
                }
                _ => break,
            },
            Input::PlayPause => {
                app.organizer.play_pause();
                println!("Playback: {:?}", app.organizer.playback_state());
            }
            Input::Backward => app.organizer.jump_backward(),
            Input::Forward => app.organizer.jump_forward(),
            Input::Queue => show_queue(app),
            Input::Create(name) => match app.organizer.create_destination_playlist(&name).await {
                Ok(playlist) => {
                    println!("Created {}", playlist.name);
                    show_destinations(app);
                }
                Err(e) => println!("Could not create the playlist: {e}"),
            },
            Input::Quit => {
                let count = app.organizer.cancel()?;
                println!("Stopped after {count} songs.");
                break;
            }
            Input::Help => println!("{HELP}"),
            Input::Empty => {}
            Input::Unknown(other) => println!("Unknown command {other:?}, type ? for help"),
        }
    }

    app.organizer.flush_writes().await;
    while let Ok(event) = app.events.try_recv() {
        print_event(app, &event);
    }
    app.organizer.finish()?;
    Ok(())
}

fn describe_song(song: &Song) -> String {
    let mut text = format!("{} by {}", song.title, song.artist);
    if let Some(album) = &song.album {
        text.push_str(&format!(" ({album})"));
    }
    if let Some(genre) = song.genre.category {
        text.push_str(&format!(" {} {}", genre.emoji(), genre));
    }
    text
}

fn show_current(app: &App) {
    let session = app.organizer.session();
    if let (Some(song), Some((position, total))) = (session.current(), session.progress()) {
        println!("[{position}/{total}] {}", describe_song(song));
        show_destinations(app);
    }
}

fn show_destinations(app: &App) {
    let session = app.organizer.session();
    let Some(review) = session.review() else {
        return;
    };
    for (i, playlist) in session.destination().iter().enumerate() {
        let mark = if review.is_locked(playlist.id) {
            '='
        } else if review.is_selected(playlist.id) {
            'x'
        } else {
            ' '
        };
        println!("  {:>2} [{mark}] {}", i + 1, playlist.name);
    }
}

fn show_queue(app: &App) {
    let queue = app.organizer.session().queue();
    println!("{} sorted, {} remaining", queue.sorted.len(), queue.remaining.len());
    for song in queue.remaining.iter().take(10) {
        println!("  {}", describe_song(song));
    }
    if queue.remaining.len() > 10 {
        println!("  ...");
    }
}

fn print_event(app: &App, event: &SortEvent) {
    match event {
        SortEvent::SongAdded { playlist, .. } => {
            if let Some(p) = app.organizer.playlists().iter().find(|p| p.id == *playlist) {
                println!("  added to {}", p.name);
            }
        }
        SortEvent::WriteFailed { .. } => {
            if let Some(error) = event.as_error() {
                println!("  {error}");
            }
        }
        SortEvent::SessionEnded { count, cancelled } => {
            let verb = if *cancelled { "stopped" } else { "finished" };
            println!("Session {verb}: {count} songs, {} sessions so far", app.organizer.sessions_count());
        }
        SortEvent::PlaybackChanged(state) => println!("  playback {state:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_console_commands() {
        assert_eq!(parse_input(" 3 "), Input::Toggle(3));
        assert_eq!(parse_input("n"), Input::Next);
        assert_eq!(parse_input("c  Summer mix "), Input::Create("Summer mix".to_string()));
        assert_eq!(parse_input(""), Input::Empty);
        assert_eq!(parse_input("?"), Input::Help);
        assert_eq!(parse_input("zz"), Input::Unknown("zz".to_string()));
    }
}

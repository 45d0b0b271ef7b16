//! Line commands driving a `Player`. Queue and list positions are 1-based.

use crate::error::Error;
use crate::model::{QueueEntry, RepeatMode, StreamQuality, format_duration};
use crate::mode::QueueMode;
use crate::player::Player;
use crate::repository::PlaylistRepository;
use crate::server_store::ServerPlaylistStore;
use std::io::Write;

pub const HELP: &str = "\
Commands:
  search <query>           search the backend
  add <id> [title]         queue a video (add #<n> queues search result n)
  next | prev | play <n>   move through the queue
  rm <n> | mv <from> <to>  edit the queue
  queue | clear            show or empty the queue
  repeat [off|one|all]     set or cycle repeat
  shuffle                  shuffle upcoming entries
  radio <on|off|seed <n>>  related-video autoplay
  quality <best|audio|N>   stream quality
  stream                   fetch the current stream URL again
  pl list | pl new <name> | pl save <name> | pl load <pl> | pl del <pl>
  pl add <pl> [n] | pl rename <pl> <name> | pl sync
  temp                     back to the temporary queue
  srv list | srv push <name> | srv pull <id> | srv del <id>
  quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn set_status<R: PlaylistRepository>(player: &mut Player<R>, message: impl Into<String>) {
    player.status = message.into();
    player.dirty = true;
}

fn report<R: PlaylistRepository>(player: &mut Player<R>, err: &Error) {
    set_status(player, format!("Error: {err}"));
}

/// Parses a 1-based position into an index.
fn position(raw: &str) -> Option<usize> {
    raw.trim()
        .trim_start_matches('#')
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
}

/// Finds a playlist by list number, id or name.
fn resolve_playlist<R: PlaylistRepository>(player: &Player<R>, reference: &str) -> Option<String> {
    let store = player.playlists();
    if let Some(index) = position(reference)
        && let Some(playlist) = store.list().get(index)
    {
        return Some(playlist.id.clone());
    }
    if store.contains(reference) {
        return Some(reference.to_string());
    }
    store.find_by_name(reference).map(|p| p.id.clone())
}

pub fn run_command<R: PlaylistRepository>(
    player: &mut Player<R>,
    raw: &str,
    out: &mut dyn Write,
) -> anyhow::Result<Flow> {
    let input = raw.trim();
    if input.is_empty() {
        return Ok(Flow::Continue);
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" | "?" => writeln!(out, "{HELP}")?,
        "quit" | "exit" | "q" => return Ok(Flow::Quit),
        "search" => {
            if let Err(err) = player.search(rest) {
                report(player, &err);
            }
        }
        "add" => {
            if rest.is_empty() {
                set_status(player, "Usage: add <id> [title]");
            } else if let Some(number) = rest.strip_prefix('#') {
                match position(number) {
                    Some(index) => {
                        if let Err(err) = player.add_search_result(index) {
                            report(player, &err);
                        }
                    }
                    None => set_status(player, "Usage: add #<n>"),
                }
            } else {
                let mut add_split = rest.splitn(2, char::is_whitespace);
                let id = add_split.next().unwrap_or_default();
                let title = add_split.next().unwrap_or("").trim();
                player.add(QueueEntry::new(id, title, 0));
            }
        }
        "next" | "n" => {
            player.next();
        }
        "prev" | "p" => {
            player.previous();
        }
        "play" => match position(rest) {
            Some(index) => {
                player.select(index);
            }
            None if rest.is_empty() && player.queue().current().is_none() => {
                player.next();
            }
            None => set_status(player, "Usage: play <n>"),
        },
        "rm" => match position(rest) {
            Some(index) => {
                if player.remove(index).is_none() {
                    set_status(player, format!("No entry {rest}"));
                }
            }
            None => set_status(player, "Usage: rm <n>"),
        },
        "mv" => {
            let mut parts = rest.split_whitespace();
            match (parts.next().and_then(position), parts.next().and_then(position)) {
                (Some(from), Some(to)) => {
                    player.move_entry(from, to);
                }
                _ => set_status(player, "Usage: mv <from> <to>"),
            }
        }
        "queue" | "ls" => print_queue(player, out)?,
        "clear" => player.clear_queue(),
        "repeat" => {
            if rest.is_empty() {
                player.cycle_repeat();
            } else {
                match RepeatMode::parse(rest) {
                    Some(mode) => player.set_repeat(mode),
                    None => set_status(player, "Usage: repeat <off|one|all>"),
                }
            }
        }
        "shuffle" => player.shuffle(),
        "radio" => run_radio(player, rest),
        "quality" => match StreamQuality::parse(rest) {
            Some(quality) => player.set_stream_quality(quality),
            None => set_status(player, "Usage: quality <best|audio|height>"),
        },
        "stream" => {
            if player.refresh_stream()
                && let Some(playing) = player.now_playing()
            {
                writeln!(out, "{}", playing.stream_url)?;
            }
        }
        "pl" | "playlist" => run_playlist(player, rest, out)?,
        "temp" => {
            player.switch_to_temporary();
        }
        _ => set_status(player, format!("Unknown command: {command} (try help)")),
    }

    Ok(Flow::Continue)
}

fn run_radio<R: PlaylistRepository>(player: &mut Player<R>, rest: &str) {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("on"), None) => player.radio_on(),
        (Some("off"), None) => player.radio_off(),
        (Some("seed"), Some(n)) => match position(n) {
            Some(index) => {
                if let Err(err) = player.radio_seed(index) {
                    report(player, &err);
                }
            }
            None => set_status(player, "Usage: radio seed <n>"),
        },
        _ => set_status(player, "Usage: radio <on|off|seed <n>>"),
    }
}

fn run_playlist<R: PlaylistRepository>(
    player: &mut Player<R>,
    rest: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut playlist_split = rest.splitn(2, char::is_whitespace);
    let action = playlist_split.next().unwrap_or_default();
    let arg = playlist_split.next().unwrap_or("").trim();

    let outcome = match action {
        "list" | "" => return print_playlists(player, out),
        "new" => player.create_playlist(arg, "").map(|_| ()),
        "save" => player.save_queue_as_playlist(arg, "").map(|_| ()),
        "sync" => player.save_queue_to_bound_playlist().map(|_| ()),
        "load" | "del" | "add" | "rename" => {
            // names may contain spaces unless more arguments follow
            let (reference, extra) = match action {
                "load" | "del" => (arg, ""),
                _ => {
                    let mut arg_split = arg.splitn(2, char::is_whitespace);
                    let reference = arg_split.next().unwrap_or_default();
                    (reference, arg_split.next().unwrap_or("").trim())
                }
            };
            let Some(id) = resolve_playlist(player, reference) else {
                set_status(player, format!("No playlist {reference:?}"));
                return Ok(());
            };
            match action {
                "load" => player.load_playlist(&id).map(|_| ()),
                "del" => player.delete_playlist(&id).map(|_| ()),
                "rename" => player.rename_playlist(&id, extra).map(|_| ()),
                _ if extra.is_empty() => player.add_current_to_playlist(&id).map(|_| ()),
                _ => match position(extra) {
                    Some(index) => player.add_queue_entry_to_playlist(&id, index).map(|_| ()),
                    None => {
                        set_status(player, "Usage: pl add <pl> [n]");
                        return Ok(());
                    }
                },
            }
        }
        _ => {
            set_status(player, "Usage: pl <list|new|save|load|del|add|rename|sync>");
            return Ok(());
        }
    };

    if let Err(err) = outcome {
        report(player, &err);
    }
    Ok(())
}

/// `srv` commands against the server-side playlist tier.
pub fn run_server_command<R: PlaylistRepository>(
    player: &mut Player<R>,
    server: &ServerPlaylistStore,
    rest: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut split = rest.splitn(2, char::is_whitespace);
    let action = split.next().unwrap_or_default();
    let arg = split.next().unwrap_or("").trim();

    match action {
        "list" | "" => match server.list() {
            Ok(playlists) if playlists.is_empty() => writeln!(out, "No shared playlists")?,
            Ok(playlists) => {
                for playlist in playlists {
                    writeln!(
                        out,
                        "{} {} ({} videos)",
                        playlist.id, playlist.name, playlist.video_count
                    )?;
                }
            }
            Err(err) => report(player, &err),
        },
        "push" => {
            if player.queue().is_empty() {
                set_status(player, "Nothing to share, the queue is empty");
                return Ok(());
            }
            let entries = player.queue().entries().to_vec();
            match server.create(arg, "", entries) {
                Ok(playlist) => set_status(player, format!("Shared as {}", playlist.id)),
                Err(err) => report(player, &err),
            }
        }
        "pull" => match server.get(arg) {
            Ok(playlist) => {
                let count = playlist.entries.len();
                for entry in playlist.entries {
                    player.add(entry);
                }
                set_status(player, format!("Queued {count} videos from {}", playlist.name));
            }
            Err(err) => report(player, &err),
        },
        "del" => match server.delete(arg) {
            Ok(()) => set_status(player, format!("Deleted shared playlist {arg}")),
            Err(err) => report(player, &err),
        },
        _ => set_status(player, "Usage: srv <list|push <name>|pull <id>|del <id>>"),
    }
    Ok(())
}

pub fn print_queue<R: PlaylistRepository>(player: &Player<R>, out: &mut dyn Write) -> anyhow::Result<()> {
    let queue = player.queue();
    let mode = match player.mode() {
        QueueMode::Temporary => String::from("temporary"),
        QueueMode::Bound(id) => match player.playlists().get(id) {
            Some(playlist) => format!("playlist {}", playlist.name),
            None => format!("playlist {id}"),
        },
    };
    writeln!(
        out,
        "{} entries, {mode}, repeat {}{}",
        queue.len(),
        queue.repeat().label(),
        if player.autoplay().is_enabled() { ", radio on" } else { "" }
    )?;

    let current = queue.current_index();
    for (index, entry) in queue.entries().iter().enumerate() {
        let marker = if Some(index) == current { '>' } else { ' ' };
        writeln!(
            out,
            "{marker}{:>3}. {} [{}]",
            index + 1,
            entry.display_title(),
            entry.display_duration()
        )?;
    }
    Ok(())
}

pub fn print_playlists<R: PlaylistRepository>(
    player: &Player<R>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let playlists = player.playlists().list();
    if playlists.is_empty() {
        writeln!(out, "No playlists")?;
        return Ok(());
    }
    for (index, playlist) in playlists.iter().enumerate() {
        writeln!(
            out,
            "{:>3}. {} ({} videos, {}, played {}x)",
            index + 1,
            playlist.name,
            playlist.entries.len(),
            format_duration(u32::try_from(playlist.total_duration_seconds()).unwrap_or(u32::MAX)),
            playlist.play_count
        )?;
    }
    Ok(())
}

pub fn print_search_results<R: PlaylistRepository>(
    player: &Player<R>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let Some(results) = player.search_results() else {
        return Ok(());
    };
    for (index, item) in results.items.iter().enumerate() {
        match &item.channel_title {
            Some(channel) => writeln!(out, "#{:<3} {} - {channel}", index + 1, item.title)?,
            None => writeln!(out, "#{:<3} {}", index + 1, item.title)?,
        }
    }
    Ok(())
}

use crate::cache::CachedBackend;
use crate::config::{self, Paths};
use crate::dispatch::{Dispatcher, ProviderEvent};
use crate::http_backend::HttpBackend;
use crate::player::Player;
use crate::playlists::LocalPlaylistStore;
use crate::providers::StaticCatalog;
use crate::repository::{JsonFileRepository, PlaylistRepository};
use crate::server_store::ServerPlaylistStore;
use crate::shell::{self, Flow};
use anyhow::Context;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const INPUT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub backend_url: Option<String>,
    pub config_dir: Option<PathBuf>,
    pub offline: bool,
}

pub fn run(options: AppOptions) -> anyhow::Result<()> {
    let paths = Paths::resolve(options.config_dir.as_deref())?;
    paths.ensure()?;
    let mut settings = config::load_settings(&paths)?;
    if let Some(url) = options.backend_url {
        settings.backend_url = url;
    }

    let repository = JsonFileRepository::open(paths.playlists())
        .with_context(|| format!("failed to open {}", paths.playlists().display()))?;
    let store = LocalPlaylistStore::open(repository).context("failed to load playlists")?;
    let server = ServerPlaylistStore::new(paths.server_playlists());
    let mut player = Player::new(store, &settings);

    let mut dispatcher = if options.offline {
        info!("offline mode, using the built-in catalog");
        Dispatcher::start(StaticCatalog::demo())
    } else {
        let backend = HttpBackend::new(
            &settings.backend_url,
            Duration::from_secs(settings.http_timeout_seconds),
        );
        match backend.health() {
            Ok(health) if health.is_ok() => info!(
                url = backend.base_url(),
                version = health.version.as_deref().unwrap_or("?"),
                "backend is up"
            ),
            Ok(health) => warn!(url = backend.base_url(), status = %health.status, "backend reports trouble"),
            Err(err) => warn!(url = backend.base_url(), "backend health check failed: {err}"),
        }
        Dispatcher::start(CachedBackend::new(backend))
    };

    let input = spawn_stdin_reader();
    let stdout = io::stdout();
    println!("Streamly. Type help for commands.");
    let result = event_loop(&mut player, &dispatcher, &server, &input, &mut stdout.lock());
    dispatcher.shutdown();

    settings.repeat_mode = player.queue().repeat();
    settings.stream_quality = player.stream_quality();
    config::save_settings(&paths, &settings)?;
    result
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn event_loop<R: PlaylistRepository>(
    player: &mut Player<R>,
    dispatcher: &Dispatcher,
    server: &ServerPlaylistStore,
    input: &Receiver<String>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut last_status = String::new();
    loop {
        forward_requests(player, dispatcher);
        while let Some(event) = dispatcher.try_recv_event() {
            let searched = matches!(event, ProviderEvent::SearchDone { .. });
            player.handle_event(event);
            if searched {
                shell::print_search_results(player, out)?;
            }
        }
        forward_requests(player, dispatcher);

        if player.dirty {
            player.dirty = false;
            if player.status != last_status {
                writeln!(out, "{}", player.status)?;
                last_status = player.status.clone();
            }
            out.flush()?;
        }

        let line = match input.recv_timeout(INPUT_POLL) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };
        let flow = match line.trim().strip_prefix("srv") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                shell::run_server_command(player, server, rest.trim(), out)?;
                Flow::Continue
            }
            _ => shell::run_command(player, &line, out)?,
        };
        if flow == Flow::Quit {
            return Ok(());
        }
        // repeat the status even when unchanged so every command gets feedback
        last_status.clear();
    }
}

fn forward_requests<R: PlaylistRepository>(player: &mut Player<R>, dispatcher: &Dispatcher) {
    for request in player.take_requests() {
        if !dispatcher.submit(request) {
            warn!("dispatcher stopped, dropping request");
        }
    }
}

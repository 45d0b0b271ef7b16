//! Runs collaborator calls on worker threads and posts tagged results back
//! to the event loop. Streams, searches and metadata lookups each get their
//! own lane, so a slow search never holds up the next track's stream URL.
//! Requests within one lane complete in submission order.

use crate::autoplay::ExtensionRequest;
use crate::error::Error;
use crate::mode::SessionToken;
use crate::model::StreamQuality;
use crate::providers::{Backend, SearchResults, StreamInfo, VideoInfo};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderRequest {
    Search {
        token: SessionToken,
        query: String,
        max_results: u8,
    },
    VideoInfo {
        token: SessionToken,
        external_id: String,
    },
    Stream {
        token: SessionToken,
        external_id: String,
        quality: StreamQuality,
    },
    Related(ExtensionRequest),
}

#[derive(Debug)]
pub enum ProviderEvent {
    SearchDone {
        token: SessionToken,
        query: String,
        results: SearchResults,
    },
    SearchFailed {
        token: SessionToken,
        query: String,
        error: Error,
    },
    VideoInfoReady {
        token: SessionToken,
        external_id: String,
        info: VideoInfo,
    },
    VideoInfoFailed {
        token: SessionToken,
        external_id: String,
        error: Error,
    },
    StreamReady {
        token: SessionToken,
        external_id: String,
        stream: StreamInfo,
    },
    StreamFailed {
        token: SessionToken,
        external_id: String,
        error: Error,
    },
    RelatedDone {
        request: ExtensionRequest,
        result: Result<Vec<String>, Error>,
    },
}

impl ProviderRequest {
    fn lane(&self) -> Lane {
        match self {
            ProviderRequest::Stream { .. } => Lane::Stream,
            ProviderRequest::Search { .. } => Lane::Search,
            ProviderRequest::VideoInfo { .. } | ProviderRequest::Related(_) => Lane::Lookup,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Stream,
    Search,
    Lookup,
}

const LANES: [Lane; 3] = [Lane::Stream, Lane::Search, Lane::Lookup];

#[derive(Debug)]
enum DispatchCommand {
    Run(ProviderRequest),
    Shutdown,
}

pub struct Dispatcher {
    lanes: Vec<(Lane, Sender<DispatchCommand>)>,
    event_rx: Receiver<ProviderEvent>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn start<B: Backend>(backend: B) -> Self {
        let backend = Arc::new(backend);
        let (event_tx, event_rx) = mpsc::channel();
        let mut lanes = Vec::with_capacity(LANES.len());
        let mut workers = Vec::with_capacity(LANES.len());
        for lane in LANES {
            let (cmd_tx, cmd_rx) = mpsc::channel();
            let backend = Arc::clone(&backend);
            let event_tx = event_tx.clone();
            workers.push(thread::spawn(move || {
                worker_loop(lane, backend.as_ref(), cmd_rx, event_tx)
            }));
            lanes.push((lane, cmd_tx));
        }
        Self {
            lanes,
            event_rx,
            workers,
        }
    }

    /// Queues a request on its lane. Returns `false` once that lane's worker
    /// has stopped.
    pub fn submit(&self, request: ProviderRequest) -> bool {
        let lane = request.lane();
        let Some((_, cmd_tx)) = self.lanes.iter().find(|(l, _)| *l == lane) else {
            return false;
        };
        cmd_tx.send(DispatchCommand::Run(request)).is_ok()
    }

    pub fn try_recv_event(&self) -> Option<ProviderEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ProviderEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn shutdown(&mut self) {
        for (_, cmd_tx) in &self.lanes {
            let _ = cmd_tx.send(DispatchCommand::Shutdown);
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("dispatch worker panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<B: Backend>(
    lane: Lane,
    backend: &B,
    cmd_rx: Receiver<DispatchCommand>,
    event_tx: Sender<ProviderEvent>,
) {
    while let Ok(command) = cmd_rx.recv() {
        let request = match command {
            DispatchCommand::Run(request) => request,
            DispatchCommand::Shutdown => break,
        };
        let event = run_request(backend, request);
        if event_tx.send(event).is_err() {
            break;
        }
    }
    debug!(?lane, "dispatch worker stopped");
}

/// Performs one request synchronously against `backend`.
pub fn run_request<B: Backend + ?Sized>(backend: &B, request: ProviderRequest) -> ProviderEvent {
    match request {
        ProviderRequest::Search {
            token,
            query,
            max_results,
        } => match backend.search(&query, max_results) {
            Ok(results) => ProviderEvent::SearchDone {
                token,
                query,
                results,
            },
            Err(error) => ProviderEvent::SearchFailed {
                token,
                query,
                error,
            },
        },
        ProviderRequest::VideoInfo { token, external_id } => {
            match backend.video_info(&external_id) {
                Ok(info) => ProviderEvent::VideoInfoReady {
                    token,
                    external_id,
                    info,
                },
                Err(error) => ProviderEvent::VideoInfoFailed {
                    token,
                    external_id,
                    error,
                },
            }
        }
        ProviderRequest::Stream {
            token,
            external_id,
            quality,
        } => match backend.stream_url(&external_id, quality) {
            Ok(stream) => ProviderEvent::StreamReady {
                token,
                external_id,
                stream,
            },
            Err(error) => ProviderEvent::StreamFailed {
                token,
                external_id,
                error,
            },
        },
        ProviderRequest::Related(request) => {
            let result = backend.related(&request.fetch_from);
            ProviderEvent::RelatedDone { request, result }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        RelatedProvider, SearchProvider, StaticCatalog, StreamProvider, VideoInfoProvider,
    };

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_video("a", "Alpha", 100)
            .with_related("a", &["b", "c"])
    }

    #[test]
    fn results_come_back_tagged() {
        let dispatcher = Dispatcher::start(catalog());
        let token = SessionToken::default();
        assert!(dispatcher.submit(ProviderRequest::VideoInfo {
            token,
            external_id: String::from("a"),
        }));

        match dispatcher.recv_event_timeout(Duration::from_secs(3)) {
            Some(ProviderEvent::VideoInfoReady {
                token: got,
                external_id,
                info,
            }) => {
                assert_eq!(got, token);
                assert_eq!(external_id, "a");
                assert_eq!(info.duration_seconds, 100);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn failures_are_events_not_panics() {
        let dispatcher = Dispatcher::start(catalog().failing());
        dispatcher.submit(ProviderRequest::Search {
            token: SessionToken::default(),
            query: String::from("alpha"),
            max_results: 5,
        });

        let event = dispatcher.recv_event_timeout(Duration::from_secs(3));
        assert!(matches!(
            event,
            Some(ProviderEvent::SearchFailed { ref error, .. }) if error.is_upstream()
        ));
    }

    #[test]
    fn related_uses_fetch_target() {
        let request = ExtensionRequest {
            seed: String::from("x"),
            fetch_from: String::from("a"),
            generation: 3,
            token: SessionToken::default(),
        };
        match run_request(&catalog(), ProviderRequest::Related(request.clone())) {
            ProviderEvent::RelatedDone {
                request: got,
                result,
            } => {
                assert_eq!(got, request);
                assert_eq!(result.expect("related"), vec!["b", "c"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    struct SlowSearch(StaticCatalog);

    impl SearchProvider for SlowSearch {
        fn search(&self, query: &str, max_results: u8) -> crate::error::Result<SearchResults> {
            thread::sleep(Duration::from_millis(1500));
            self.0.search(query, max_results)
        }
    }

    impl VideoInfoProvider for SlowSearch {
        fn video_info(&self, external_id: &str) -> crate::error::Result<VideoInfo> {
            self.0.video_info(external_id)
        }
    }

    impl StreamProvider for SlowSearch {
        fn stream_url(
            &self,
            external_id: &str,
            quality: StreamQuality,
        ) -> crate::error::Result<StreamInfo> {
            self.0.stream_url(external_id, quality)
        }
    }

    impl RelatedProvider for SlowSearch {
        fn related(&self, seed: &str) -> crate::error::Result<Vec<String>> {
            self.0.related(seed)
        }
    }

    #[test]
    fn slow_search_does_not_hold_up_streams() {
        let dispatcher = Dispatcher::start(SlowSearch(catalog()));
        let token = SessionToken::default();
        dispatcher.submit(ProviderRequest::Search {
            token,
            query: String::from("alpha"),
            max_results: 5,
        });
        dispatcher.submit(ProviderRequest::Stream {
            token,
            external_id: String::from("a"),
            quality: StreamQuality::Best,
        });

        let first = dispatcher.recv_event_timeout(Duration::from_millis(1000));
        assert!(
            matches!(first, Some(ProviderEvent::StreamReady { ref external_id, .. }) if external_id == "a"),
            "{first:?}"
        );
        let second = dispatcher.recv_event_timeout(Duration::from_secs(3));
        assert!(matches!(second, Some(ProviderEvent::SearchDone { .. })), "{second:?}");
    }

    #[test]
    fn shutdown_stops_accepting_work() {
        let mut dispatcher = Dispatcher::start(catalog());
        dispatcher.shutdown();
        assert!(!dispatcher.submit(ProviderRequest::VideoInfo {
            token: SessionToken::default(),
            external_id: String::from("a"),
        }));
    }
}

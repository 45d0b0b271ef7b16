use crate::error::Error;
use crate::mode::SessionToken;
use crate::model::QueueEntry;
use crate::queue::QueueStore;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DEFAULT_LOW_WATER_MARK: usize = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoplayState {
    pub enabled: bool,
    pub seed_external_id: Option<String>,
    /// Entries the radio appended for the current seed, oldest first.
    pub extension_queue: Vec<QueueEntry>,
    pub loading_in_flight: bool,
}

/// A related-videos lookup the extender wants performed. Hand the outcome
/// back through `AutoplayExtender::complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRequest {
    pub seed: String,
    pub fetch_from: String,
    pub generation: u64,
    pub token: SessionToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionOutcome {
    Appended(usize),
    Failed,
    Stale,
}

#[derive(Debug)]
pub struct AutoplayExtender {
    state: AutoplayState,
    exhausted: bool,
    generation: u64,
    low_water_mark: usize,
}

impl Default for AutoplayExtender {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_WATER_MARK)
    }
}

impl AutoplayExtender {
    pub fn new(low_water_mark: usize) -> Self {
        Self {
            state: AutoplayState::default(),
            exhausted: false,
            generation: 0,
            low_water_mark,
        }
    }

    pub fn state(&self) -> &AutoplayState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn low_water_mark(&self) -> usize {
        self.low_water_mark
    }

    pub fn is_radio_entry(&self, external_id: &str) -> bool {
        self.state.seed_external_id.as_deref() == Some(external_id)
            || self
                .state
                .extension_queue
                .iter()
                .any(|entry| entry.external_id == external_id)
    }

    pub fn enable(&mut self) {
        self.state.enabled = true;
    }

    /// Turns the radio off and forgets everything about the seed.
    pub fn disable(&mut self) {
        self.state = AutoplayState::default();
        self.exhausted = false;
        self.generation += 1;
    }

    /// Forgets the seed and its radio entries but stays enabled; the next
    /// evaluation seeds from whatever is current then.
    pub fn restart(&mut self) {
        let enabled = self.state.enabled;
        self.disable();
        self.state.enabled = enabled;
    }

    /// Starts a radio from `external_id`. Any in-flight lookup for the
    /// previous seed becomes stale.
    pub fn set_seed(&mut self, external_id: &str) {
        self.state.enabled = true;
        self.state.seed_external_id = Some(external_id.to_string());
        self.state.extension_queue.clear();
        self.state.loading_in_flight = false;
        self.exhausted = false;
        self.generation += 1;
        debug!(seed = external_id, "radio seed set");
    }

    /// Decides whether the queue needs topping up. Returns a request at most
    /// once until it is completed; triggers in between are dropped.
    pub fn evaluate(&mut self, queue: &QueueStore, token: SessionToken) -> Option<ExtensionRequest> {
        if !self.state.enabled || self.state.loading_in_flight || self.exhausted {
            return None;
        }
        if queue.remaining() > self.low_water_mark {
            return None;
        }

        if self.state.seed_external_id.is_none() {
            let current = queue.current()?;
            self.state.seed_external_id = Some(current.external_id.clone());
        }
        let seed = self.state.seed_external_id.clone()?;
        let fetch_from = self
            .state
            .extension_queue
            .last()
            .map(|entry| entry.external_id.clone())
            .unwrap_or_else(|| seed.clone());

        self.state.loading_in_flight = true;
        debug!(seed = %seed, fetch_from = %fetch_from, "requesting related videos");
        Some(ExtensionRequest {
            seed,
            fetch_from,
            generation: self.generation,
            token,
        })
    }

    /// Applies a related-videos result. Candidates already queued are
    /// skipped; failures are logged and exhaust the seed.
    pub fn complete(
        &mut self,
        request: &ExtensionRequest,
        result: Result<Vec<String>, Error>,
        queue: &mut QueueStore,
        token: SessionToken,
    ) -> ExtensionOutcome {
        if request.generation != self.generation || !self.state.enabled {
            debug!(seed = %request.seed, "dropping related videos for an old seed");
            return ExtensionOutcome::Stale;
        }
        self.state.loading_in_flight = false;
        if request.token != token {
            debug!(seed = %request.seed, "dropping related videos for an old session");
            return ExtensionOutcome::Stale;
        }

        let candidates = match result {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(seed = %request.seed, "radio lookup failed, seed exhausted: {err}");
                self.exhausted = true;
                return ExtensionOutcome::Failed;
            }
        };

        let mut seen = HashSet::new();
        let mut appended = 0;
        for id in candidates {
            let id = id.trim().to_string();
            if id.is_empty() || queue.contains(&id) || !seen.insert(id.clone()) {
                continue;
            }
            let entry = QueueEntry::new(id, "", 0);
            if queue.append(entry.clone()) {
                self.state.extension_queue.push(entry);
                appended += 1;
            }
        }

        if appended == 0 {
            debug!(seed = %request.seed, "no new related videos, seed exhausted");
            self.exhausted = true;
        }
        ExtensionOutcome::Appended(appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(ids: &[&str]) -> QueueStore {
        let mut queue = QueueStore::default();
        for id in ids {
            queue.append(QueueEntry::new(*id, *id, 30));
        }
        queue
    }

    fn ids(queue: &QueueStore) -> Vec<&str> {
        queue
            .entries()
            .iter()
            .map(|e| e.external_id.as_str())
            .collect()
    }

    #[test]
    fn appends_only_candidates_not_already_queued() {
        let token = SessionToken::default();
        let mut queue = queue_of(&["x"]);
        queue.select(0);
        let mut radio = AutoplayExtender::default();
        radio.enable();
        let request = radio.evaluate(&queue, token).expect("low water reached");
        assert_eq!(request.seed, "x");

        queue.append(QueueEntry::new("y", "Y", 30));
        let outcome = radio.complete(
            &request,
            Ok(vec![String::from("y"), String::from("z")]),
            &mut queue,
            token,
        );

        assert_eq!(outcome, ExtensionOutcome::Appended(1));
        assert_eq!(ids(&queue), vec!["x", "y", "z"]);
        assert_eq!(radio.state().extension_queue.len(), 1);
    }

    #[test]
    fn only_one_request_in_flight() {
        let mut queue = queue_of(&["x"]);
        queue.select(0);
        let mut radio = AutoplayExtender::default();
        radio.enable();

        assert!(radio.evaluate(&queue, SessionToken::default()).is_some());
        assert!(radio.evaluate(&queue, SessionToken::default()).is_none());
        assert!(radio.state().loading_in_flight);
    }

    #[test]
    fn no_request_above_low_water_mark() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.select(0);
        let mut radio = AutoplayExtender::default();
        radio.enable();
        assert!(radio.evaluate(&queue, SessionToken::default()).is_none());

        queue.select(1);
        assert!(radio.evaluate(&queue, SessionToken::default()).is_some());
    }

    #[test]
    fn failure_exhausts_seed_until_new_seed() {
        let mut queue = queue_of(&["x"]);
        queue.select(0);
        let token = SessionToken::default();
        let mut radio = AutoplayExtender::default();
        radio.enable();

        let request = radio.evaluate(&queue, token).expect("request");
        let outcome = radio.complete(&request, Err(Error::upstream("quota")), &mut queue, token);

        assert_eq!(outcome, ExtensionOutcome::Failed);
        assert!(radio.is_exhausted());
        assert!(radio.evaluate(&queue, token).is_none());

        radio.set_seed("x");
        assert!(!radio.is_exhausted());
        assert!(radio.evaluate(&queue, token).is_some());
    }

    #[test]
    fn switching_seed_discards_in_flight_response() {
        let mut queue = queue_of(&["x", "w"]);
        queue.select(0);
        queue.select(1);
        let token = SessionToken::default();
        let mut radio = AutoplayExtender::default();
        radio.set_seed("x");

        let old = radio.evaluate(&queue, token).expect("request");
        radio.set_seed("w");
        assert!(!radio.state().loading_in_flight);

        let outcome = radio.complete(&old, Ok(vec![String::from("z")]), &mut queue, token);
        assert_eq!(outcome, ExtensionOutcome::Stale);
        assert_eq!(queue.len(), 2);

        let fresh = radio.evaluate(&queue, token).expect("new request");
        assert_eq!(fresh.seed, "w");
    }

    #[test]
    fn response_for_old_session_is_dropped_and_unblocks() {
        let mut queue = queue_of(&["x"]);
        queue.select(0);
        let mut radio = AutoplayExtender::default();
        radio.enable();

        let old_token = SessionToken::default();
        let request = radio.evaluate(&queue, old_token).expect("request");
        let mut later = crate::mode::ModeController::new();
        later.note_queue_replaced();

        let outcome = radio.complete(&request, Ok(vec![String::from("z")]), &mut queue, later.token());
        assert_eq!(outcome, ExtensionOutcome::Stale);
        assert!(!radio.state().loading_in_flight);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn follow_up_requests_chain_from_last_radio_entry() {
        let mut queue = queue_of(&["x"]);
        queue.select(0);
        let token = SessionToken::default();
        let mut radio = AutoplayExtender::default();
        radio.enable();

        let first = radio.evaluate(&queue, token).expect("first");
        radio.complete(&first, Ok(vec![String::from("y")]), &mut queue, token);
        queue.advance();

        let second = radio.evaluate(&queue, token).expect("second");
        assert_eq!(second.seed, "x");
        assert_eq!(second.fetch_from, "y");
    }

    #[test]
    fn empty_result_exhausts_seed() {
        let mut queue = queue_of(&["x"]);
        queue.select(0);
        let token = SessionToken::default();
        let mut radio = AutoplayExtender::default();
        radio.enable();

        let request = radio.evaluate(&queue, token).expect("request");
        let outcome = radio.complete(&request, Ok(vec![String::from("x")]), &mut queue, token);
        assert_eq!(outcome, ExtensionOutcome::Appended(0));
        assert!(radio.is_exhausted());
    }

    #[test]
    fn restart_keeps_radio_on_with_a_fresh_seed() {
        let mut radio = AutoplayExtender::default();
        radio.set_seed("x");
        radio.restart();
        assert!(radio.is_enabled());
        assert_eq!(radio.state().seed_external_id, None);
    }

    #[test]
    fn disable_resets_state() {
        let mut radio = AutoplayExtender::default();
        radio.set_seed("x");
        radio.disable();
        assert_eq!(radio.state(), &AutoplayState::default());
        assert!(!radio.is_radio_entry("x"));
    }
}

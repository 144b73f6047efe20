//! Adapter sessions.
//!
//! An [`AdapterSession`] follows one browsing context. It picks the site
//! adapter for the current page, remembers which turns it has already
//! submitted, and turns raw [`Observation`]s into [`TrackTokensPayload`]s.
//!
//! The synchronous `process_*` methods do the per-observation work. [`run`]
//! drives them from a stream, holding each element back for the adapter's
//! settle timeout so a reply is read once it has finished rendering, and
//! pushes the resulting payloads into a bounded queue.
//!
//! [`run`]: AdapterSession::run

use footprint_core::{
    EstimationMode, ProviderKind, Role, TrackTokensPayload, UNKNOWN_PROVIDER,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::adapters::{MIN_TURN_CHARS, SiteAdapter, collapse_whitespace, key_fragment};
use crate::element::RenderedElement;
use crate::error::IngestError;
use crate::registry::AdapterRegistry;
use crate::request::observe_request;

// ============================================================================
// Observations
// ============================================================================

/// Something seen in a browsing context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Observation {
    /// The context moved to a new page or conversation.
    Navigate {
        /// Full page URL.
        url: String,
    },
    /// A turn element was added or changed.
    Element {
        /// Position of the turn among turns of the same role on the page.
        index: usize,
        /// Current rendering of the element.
        element: RenderedElement,
    },
    /// A full page snapshot; every turn in it is considered.
    Page {
        /// Page root.
        root: RenderedElement,
    },
    /// The user submitted a message from the input box.
    Draft {
        /// Submitted text.
        text: String,
        /// Submission ordinal, when the producer tracks one.
        #[serde(default)]
        index: Option<usize>,
    },
    /// An outgoing HTTP request.
    Request {
        /// Request URL.
        url: String,
        /// Parsed JSON body, if any.
        #[serde(default)]
        body: Option<Value>,
    },
}

// ============================================================================
// Options
// ============================================================================

/// Per-session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Adapters allowed to activate.
    pub enabled: BTreeSet<ProviderKind>,
    /// Settle timeouts that replace the adapter's own.
    pub settle_overrides: HashMap<ProviderKind, Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            enabled: ProviderKind::all().iter().copied().collect(),
            settle_overrides: HashMap::new(),
        }
    }
}

impl SessionOptions {
    /// Uses the same settle timeout for every adapter.
    #[must_use]
    pub fn with_uniform_settle(mut self, timeout: Duration) -> Self {
        self.settle_overrides = ProviderKind::all().iter().map(|k| (*k, timeout)).collect();
        self
    }
}

/// Counters reported when a session's stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Payloads pushed into the queue.
    pub emitted: usize,
    /// Feed entries skipped as invalid.
    pub invalid: usize,
}

// ============================================================================
// Session
// ============================================================================

/// Turn extraction state for one browsing context.
pub struct AdapterSession {
    options: SessionOptions,
    adapter: Option<&'static dyn SiteAdapter>,
    path: String,
    processed: HashSet<String>,
    drafts: usize,
}

impl AdapterSession {
    /// Creates a session with no page loaded.
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            adapter: None,
            path: String::new(),
            processed: HashSet::new(),
            drafts: 0,
        }
    }

    /// Returns the active adapter, if the current page has one.
    pub fn adapter(&self) -> Option<&'static dyn SiteAdapter> {
        self.adapter
    }

    /// Provider label for display; `"Unknown"` when no adapter is active.
    pub fn provider_label(&self) -> &'static str {
        self.adapter
            .map_or(UNKNOWN_PROVIDER, |a| a.kind().display_name())
    }

    /// Settle timeout of the active adapter, after overrides.
    pub fn settle_timeout(&self) -> Duration {
        self.adapter.map_or(Duration::ZERO, |a| {
            self.options
                .settle_overrides
                .get(&a.kind())
                .copied()
                .unwrap_or_else(|| a.settle_timeout())
        })
    }

    /// Number of turns submitted since the last navigation.
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Switches to a new page, forgetting turns seen on the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or has no host. The
    /// session is left with no active adapter in that case.
    pub fn navigate(&mut self, url: &str) -> Result<(), IngestError> {
        self.adapter = None;
        self.path.clear();
        self.processed.clear();
        self.drafts = 0;

        let parsed = Url::parse(url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| IngestError::MissingHost(url.to_string()))?;

        self.path = parsed.path().to_string();
        self.adapter = AdapterRegistry::for_host(host)
            .filter(|a| self.options.enabled.contains(&a.kind()));

        match self.adapter {
            Some(adapter) => info!(provider = %adapter.kind(), path = %self.path, "adapter active"),
            None => debug!(host, "no adapter for host"),
        }
        Ok(())
    }

    /// Extracts a finished turn from an element.
    ///
    /// Returns `None` when there is no active adapter, the element is not a
    /// turn or is still streaming, its text is too short, or the turn was
    /// already submitted in this session.
    pub fn process_element(
        &mut self,
        index: usize,
        element: &RenderedElement,
    ) -> Option<TrackTokensPayload> {
        let adapter = self.adapter?;
        let role = adapter.classify(element)?;
        if !adapter.is_settled(element) {
            trace!(index, "turn still streaming");
            return None;
        }

        let text = collapse_whitespace(&adapter.extract_text(element));
        if text.chars().count() < MIN_TURN_CHARS {
            return None;
        }

        let key = adapter.dedupe_key(element, role, index);
        self.submit(adapter, role, &key, &text, EstimationMode::Precise)
    }

    /// Extracts every finished turn from a page snapshot.
    pub fn process_page(&mut self, root: &RenderedElement) -> Vec<TrackTokensPayload> {
        turns_in_page(self.adapter, root)
            .into_iter()
            .filter_map(|(_, index, element)| self.process_element(index, element))
            .collect()
    }

    /// Counts a submitted draft as a user turn, for adapters that track drafts.
    pub fn process_draft(&mut self, text: &str, index: Option<usize>) -> Option<TrackTokensPayload> {
        let adapter = self.adapter.filter(|a| a.tracks_drafts())?;
        let text = collapse_whitespace(text);
        if text.chars().count() < MIN_TURN_CHARS {
            return None;
        }

        let ordinal = index.unwrap_or(self.drafts);
        self.drafts = self.drafts.max(ordinal + 1);
        let key = format!("draft-{ordinal}-{}", key_fragment(&text));
        self.submit(adapter, Role::User, &key, &text, EstimationMode::Quick)
    }

    /// Counts an outgoing request to a tracked model API.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or has no host.
    pub fn process_request(
        &self,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Option<TrackTokensPayload>, IngestError> {
        Ok(observe_request(url, body)?.map(|p| p.with_timestamp(now_millis())))
    }

    fn submit(
        &mut self,
        adapter: &dyn SiteAdapter,
        role: Role,
        key: &str,
        text: &str,
        mode: EstimationMode,
    ) -> Option<TrackTokensPayload> {
        let turn_key = format!("{}:{}:{key}", adapter.kind().cli_name(), self.path);
        if !self.processed.insert(turn_key.clone()) {
            trace!(turn_key, "turn already submitted");
            return None;
        }

        let tokens = mode.estimate(text);
        debug!(provider = %adapter.kind(), %role, tokens = tokens.get(), "turn extracted");
        Some(
            TrackTokensPayload::new(tokens, adapter.kind().display_name(), role)
                .with_preview(text)
                .with_turn_key(turn_key)
                .with_timestamp(now_millis()),
        )
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    /// Drives the session from an observation stream until it ends.
    ///
    /// Elements are held for the settle timeout; a newer rendering of the
    /// same turn replaces the held one and restarts its timer. Held turns are
    /// read immediately on navigation and at end of stream. Invalid feed
    /// entries are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::QueueClosed`] if the receiver goes away, or the
    /// first unrecoverable stream error.
    pub async fn run<S>(
        mut self,
        observations: S,
        queue: mpsc::Sender<TrackTokensPayload>,
    ) -> Result<SessionStats, IngestError>
    where
        S: Stream<Item = Result<Observation, IngestError>>,
    {
        let observations = observations.fuse();
        tokio::pin!(observations);
        let mut held: HashMap<(Role, usize), Held> = HashMap::new();
        let mut stats = SessionStats::default();

        loop {
            let next_deadline = held.values().map(|h| h.deadline).min();

            tokio::select! {
                item = observations.next() => {
                    let Some(item) = item else { break };
                    let observation = match item {
                        Ok(observation) => observation,
                        Err(e) if e.is_recoverable() => {
                            warn!(error = %e, "skipping invalid observation");
                            stats.invalid += 1;
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    self.observe(observation, &mut held, &queue, &mut stats).await?;
                }
                () = sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                    let now = Instant::now();
                    let due: Vec<_> = held
                        .iter()
                        .filter(|(_, h)| h.deadline <= now)
                        .map(|(k, _)| *k)
                        .collect();
                    let mut ready: Vec<_> = due.into_iter().filter_map(|k| held.remove(&k)).collect();
                    ready.sort_by_key(|h| h.seq);
                    for h in ready {
                        let payload = self.process_element(h.index, &h.element);
                        emit(payload, &queue, &mut stats).await?;
                    }
                }
            }
        }

        self.flush_held(&mut held, &queue, &mut stats).await?;
        debug!(emitted = stats.emitted, invalid = stats.invalid, "observation stream ended");
        Ok(stats)
    }

    async fn observe(
        &mut self,
        observation: Observation,
        held: &mut HashMap<(Role, usize), Held>,
        queue: &mpsc::Sender<TrackTokensPayload>,
        stats: &mut SessionStats,
    ) -> Result<(), IngestError> {
        match observation {
            Observation::Navigate { url } => {
                self.flush_held(held, queue, stats).await?;
                if let Err(e) = self.navigate(&url) {
                    warn!(error = %e, url, "navigation to unusable URL");
                    stats.invalid += 1;
                }
            }
            Observation::Element { index, element } => {
                self.hold(held, index, element);
            }
            Observation::Page { root } => {
                let turns: Vec<_> = turns_in_page(self.adapter, &root)
                    .into_iter()
                    .map(|(_, index, element)| (index, element.clone()))
                    .collect();
                for (index, element) in turns {
                    self.hold(held, index, element);
                }
            }
            Observation::Draft { text, index } => {
                let payload = self.process_draft(&text, index);
                emit(payload, queue, stats).await?;
            }
            Observation::Request { url, body } => match self.process_request(&url, body.as_ref()) {
                Ok(payload) => emit(payload, queue, stats).await?,
                Err(e) => {
                    warn!(error = %e, url, "unusable request URL");
                    stats.invalid += 1;
                }
            },
        }
        Ok(())
    }

    fn hold(&self, held: &mut HashMap<(Role, usize), Held>, index: usize, element: RenderedElement) {
        let Some(role) = self.adapter.and_then(|a| a.classify(&element)) else {
            return;
        };
        let seq = held
            .get(&(role, index))
            .map_or_else(|| held.values().map(|h| h.seq + 1).max().unwrap_or(0), |h| h.seq);
        held.insert(
            (role, index),
            Held {
                index,
                element,
                deadline: Instant::now() + self.settle_timeout(),
                seq,
            },
        );
    }

    async fn flush_held(
        &mut self,
        held: &mut HashMap<(Role, usize), Held>,
        queue: &mpsc::Sender<TrackTokensPayload>,
        stats: &mut SessionStats,
    ) -> Result<(), IngestError> {
        let mut pending: Vec<_> = held.drain().map(|(_, h)| h).collect();
        pending.sort_by_key(|h| h.seq);
        for h in pending {
            let payload = self.process_element(h.index, &h.element);
            emit(payload, queue, stats).await?;
        }
        Ok(())
    }
}

/// An element waiting out its settle timeout.
struct Held {
    index: usize,
    element: RenderedElement,
    deadline: Instant,
    seq: u64,
}

async fn emit(
    payload: Option<TrackTokensPayload>,
    queue: &mpsc::Sender<TrackTokensPayload>,
    stats: &mut SessionStats,
) -> Result<(), IngestError> {
    if let Some(payload) = payload {
        queue.send(payload).await.map_err(|_| IngestError::QueueClosed)?;
        stats.emitted += 1;
    }
    Ok(())
}

/// Turns in a page in document order, with their per-role ordinal.
fn turns_in_page<'a>(
    adapter: Option<&dyn SiteAdapter>,
    root: &'a RenderedElement,
) -> Vec<(Role, usize, &'a RenderedElement)> {
    let Some(adapter) = adapter else {
        return Vec::new();
    };

    let mut counts: HashMap<Role, usize> = HashMap::new();
    root.descendants()
        .into_iter()
        .filter_map(|el| {
            let role = adapter.classify(el)?;
            let slot = counts.entry(role).or_default();
            let index = *slot;
            *slot += 1;
            Some((role, index, el))
        })
        .collect()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

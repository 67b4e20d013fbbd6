//! Reconciliation Policy
//!
//! Each open reading view folds the immediate fetch, polling and push signals
//! into one observable [`ViewState`]. Whatever arrives last replaces the state
//! whole; a view never shows a partially merged result.
//!
//! Not-found is terminal: the reading is dropped from the saved list and a
//! single [`ViewEvent::Removed`] is broadcast for that id, however many times
//! its view is run again.

use crate::fetcher::{require_found, InterpretationSource};
use crate::notifier::PushNotifier;
use crate::poller::{poll_interpretation, PollOptions};
use crate::{ClientError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use webtarot_common::config::{ClientConfig, Strategy};
use webtarot_common::store::SavedReadings;
use webtarot_common::InterpretationResult;

const EVENT_CAPACITY: usize = 16;

/// What a reading view currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Nothing fetched yet
    Loading,
    /// Generation still running; any text is a placeholder
    Pending(InterpretationResult),
    /// Final result, successful or failed generation
    Ready(InterpretationResult),
    /// Fetch failed or polling timed out
    Failed(String),
    /// The backend does not know this reading
    Removed,
}

impl ViewState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ViewState::Ready(_) | ViewState::Failed(_) | ViewState::Removed)
    }
}

/// Cross-view notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// `id` was not found and left the saved list; `next` took its place
    Removed { id: String, next: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub strategy: Strategy,
    pub poll: PollOptions,
    /// Safety-net poll interval used next to push in hybrid mode
    pub hybrid_interval: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        ReconcileOptions::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ReconcileOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            strategy: config.strategy,
            poll: PollOptions::from(&config.polling),
            hybrid_interval: config.polling.hybrid_interval(),
        }
    }
}

/// Handle on one open reading
///
/// Dropping the view does not stop a running policy; call [`ReadingView::close`].
pub struct ReadingView {
    id: String,
    state: watch::Sender<ViewState>,
    cancel: CancellationToken,
}

impl ReadingView {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Stop any polling or push connection for this view
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn publish(&self, state: ViewState) {
        self.state.send_replace(state);
    }
}

/// Per-client policy shared by all reading views
pub struct Reconciler {
    source: Arc<dyn InterpretationSource>,
    notifier: Option<PushNotifier>,
    saved: SavedReadings,
    options: ReconcileOptions,
    removed: Mutex<HashSet<String>>,
    events: broadcast::Sender<ViewEvent>,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn InterpretationSource>,
        saved: SavedReadings,
        options: ReconcileOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            notifier: None,
            saved,
            options,
            removed: Mutex::new(HashSet::new()),
            events,
        }
    }

    /// Enable push; without a notifier `push` and `hybrid` fall back to polling
    pub fn with_notifier(mut self, notifier: PushNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// New view for `id`, in `Loading` until run
    pub fn open(&self, id: impl Into<String>) -> ReadingView {
        let (state, _) = watch::channel(ViewState::Loading);
        ReadingView {
            id: id.into(),
            state,
            cancel: CancellationToken::new(),
        }
    }

    /// Open a view for `id`, run it to completion and return the final result
    pub async fn watch(&self, id: &str) -> Result<InterpretationResult> {
        let view = self.open(id);
        self.run(&view).await
    }

    /// Activate a view
    ///
    /// Saves the id, publishes the current state from one immediate fetch, and
    /// if that is not final yet waits by the configured strategy. Returns the
    /// final result, or the last pending one when push failed and only a manual
    /// [`refresh`](Self::refresh) can make progress.
    #[instrument(skip(self, view), fields(id = %view.id, strategy = %self.options.strategy))]
    pub async fn run(&self, view: &ReadingView) -> Result<InterpretationResult> {
        let id = view.id.as_str();
        if id.is_empty() {
            return Err(ClientError::InvalidInput("reading id must not be empty".to_string()));
        }
        if self.was_removed(id) {
            view.publish(ViewState::Removed);
            return Err(ClientError::NotFound(id.to_string()));
        }

        match self.saved.add(id) {
            Ok(true) => debug!("Saved reading"),
            Ok(false) => {}
            Err(e) => warn!("Failed to save reading {}: {}", id, e),
        }

        view.publish(ViewState::Loading);
        let first = self.fetch_once(view).await?;
        if first.done {
            return Ok(first);
        }

        let outcome = match self.options.strategy {
            Strategy::Poll => self.poll(id, &self.options.poll, &view.cancel).await,
            Strategy::Push => match &self.notifier {
                Some(notifier) => match notifier.watch(id, &view.cancel).await {
                    Err(e) if e.is_push_failure() => {
                        warn!("Push failed, waiting for manual refresh: {}", e);
                        return Ok(first);
                    }
                    outcome => outcome,
                },
                None => {
                    warn!("No push notifier configured, polling instead");
                    self.poll(id, &self.options.poll, &view.cancel).await
                }
            },
            Strategy::Hybrid => self.race(id, &view.cancel).await,
        };

        self.absorb(view, outcome)
    }

    /// Manual refresh: one fetch, published like any other
    #[instrument(skip(self, view), fields(id = %view.id))]
    pub async fn refresh(&self, view: &ReadingView) -> Result<InterpretationResult> {
        if self.was_removed(&view.id) {
            view.publish(ViewState::Removed);
            return Err(ClientError::NotFound(view.id.clone()));
        }
        self.fetch_once(view).await
    }

    async fn fetch_once(&self, view: &ReadingView) -> Result<InterpretationResult> {
        let outcome = tokio::select! {
            biased;
            _ = view.cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.source.fetch(&view.id) => result.and_then(|r| require_found(&view.id, r)),
        };
        self.absorb(view, outcome)
    }

    async fn poll(
        &self,
        id: &str,
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<InterpretationResult> {
        poll_interpretation(self.source.as_ref(), id, options, cancel).await
    }

    /// Push and a slow poll side by side; the first final result wins
    ///
    /// A push failure or a transport failure of the poll leaves the other side
    /// running. Not-found, timeout and cancellation end the race.
    async fn race(&self, id: &str, cancel: &CancellationToken) -> Result<InterpretationResult> {
        let Some(notifier) = &self.notifier else {
            warn!("No push notifier configured, polling instead");
            return self.poll(id, &self.options.poll, cancel).await;
        };

        let race = cancel.child_token();
        let safety_net = PollOptions {
            interval: self.options.hybrid_interval,
            timeout: self.options.poll.timeout,
        };

        let push = notifier.watch(id, &race);
        let poll = self.poll(id, &safety_net, &race);
        tokio::pin!(push, poll);

        let mut push_ended = false;
        let mut poll_ended = false;
        let mut last_error = None;
        let outcome = loop {
            tokio::select! {
                result = &mut push, if !push_ended => {
                    push_ended = true;
                    match result {
                        Ok(result) if result.done => {
                            debug!("Push settled the race");
                            break Ok(result);
                        }
                        Ok(_) => debug!("Push refetch not final yet, polling continues"),
                        Err(e) if e.is_push_failure() => {
                            warn!("Push failed, continuing with polling: {}", e);
                            last_error = Some(e);
                        }
                        Err(e) => break Err(e),
                    }
                }
                result = &mut poll, if !poll_ended => {
                    poll_ended = true;
                    match result {
                        Err(e @ ClientError::Transport(_)) | Err(e @ ClientError::Http { .. }) => {
                            warn!("Safety-net poll failed, waiting for push: {}", e);
                            last_error = Some(e);
                        }
                        outcome => {
                            debug!("Poll settled the race");
                            break outcome;
                        }
                    }
                }
            }
            if push_ended && poll_ended {
                break Err(last_error.unwrap_or_else(|| {
                    ClientError::PushDisconnected("no final result from push or polling".to_string())
                }));
            }
        };

        // Let the losing side observe cancellation so the push connection closes cleanly
        race.cancel();
        if !push_ended {
            let _ = push.await;
        }
        if !poll_ended {
            let _ = poll.await;
        }
        outcome
    }

    /// Publish an outcome on the view and hand it back
    fn absorb(
        &self,
        view: &ReadingView,
        outcome: Result<InterpretationResult>,
    ) -> Result<InterpretationResult> {
        match outcome {
            Ok(result) if result.is_not_found() => {
                self.mark_removed(view);
                Err(ClientError::NotFound(view.id.clone()))
            }
            Ok(result) => {
                if result.done {
                    view.publish(ViewState::Ready(result.clone()));
                } else {
                    view.publish(ViewState::Pending(result.clone()));
                }
                Ok(result)
            }
            Err(ClientError::NotFound(id)) => {
                self.mark_removed(view);
                Err(ClientError::NotFound(id))
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                view.publish(ViewState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn was_removed(&self, id: &str) -> bool {
        match self.removed.lock() {
            Ok(removed) => removed.contains(id),
            Err(poisoned) => poisoned.into_inner().contains(id),
        }
    }

    fn mark_removed(&self, view: &ReadingView) {
        view.publish(ViewState::Removed);

        let first_time = match self.removed.lock() {
            Ok(mut removed) => removed.insert(view.id.clone()),
            Err(poisoned) => poisoned.into_inner().insert(view.id.clone()),
        };
        if !first_time {
            return;
        }

        let next = match self.saved.remove(&view.id) {
            Ok(next) => next,
            Err(e) => {
                warn!("Failed to drop reading {} from saved list: {}", view.id, e);
                None
            }
        };
        info!(id = %view.id, next = ?next, "Reading not found, removed");
        // No subscribers is fine
        let _ = self.events.send(ViewEvent::Removed {
            id: view.id.clone(),
            next,
        });
    }
}

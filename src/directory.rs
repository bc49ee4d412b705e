//! The user directory: one owned state container shared by every consumer.
//!
//! A load runs in two short critical sections around the network call. The
//! first decides whether the load may start and stamps it with the cache
//! generation and cursor; the second applies the batch only if the stamp
//! still matches. A refresh bumps the generation, so a page requested before
//! it is dropped when it finally arrives. Deletes remove by key from whatever
//! the cache holds at the moment they resolve, so they never overwrite a
//! page appended in the meantime.

use std::num::NonZeroU32;
use std::sync::Arc;

use log::*;
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::cache::PageCache;
use crate::config::DirectoryConfig;
use crate::exhaustion::{PageExhaustion, ShortBatch};
use crate::gateway::{FetchGateway, NetworkError, PageRequest};
use crate::model::user::UserRecord;
use crate::model::view::DirectoryView;
use crate::search::SearchMemo;
use crate::sentinel::Sentinel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "kebab-case")]
pub enum FetchState {
    Idle,
    LoadingInitial,
    LoadingMore,
    Error(String),
}

impl FetchState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FetchState::LoadingInitial | FetchState::LoadingMore)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch is already running.
    InFlight,
    /// The first page has already been requested.
    AlreadyStarted,
    /// Nothing has been loaded yet, so there is no "more".
    NotStarted,
    /// The last page looked like the end of the source.
    Exhausted,
    /// The sentinel report was not a hidden-to-visible transition.
    NoIntent,
    /// The directory is in the error state; use retry.
    Errored,
    /// Retry was asked for without a failed fetch.
    NothingToRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied {
        cursor: NonZeroU32,
        received: usize,
        accepted: usize,
    },
    Skipped(SkipReason),
    /// The answer belonged to an older generation and was thrown away.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed(UserRecord),
    /// The key was not (or no longer) cached.
    Missing,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Mount,
    More,
    Sentinel(bool),
    Retry,
    Refresh,
}

struct Ticket {
    generation: u64,
    request: PageRequest,
}

struct State {
    cache: PageCache,
    fetch: FetchState,
    has_next_page: bool,
    query: String,
    sentinel: Sentinel,
    memo: SearchMemo,
}

struct Shared<G> {
    gateway: G,
    config: DirectoryConfig,
    exhaustion: Box<dyn PageExhaustion>,
    state: Mutex<State>,
}

/// Marks the fetch of one ticket as running. If the load future is dropped
/// before the answer arrives, the fetch state would otherwise claim a request
/// that no longer exists; dropping the armed guard turns it into an error the
/// caller can retry. A ticket from an older generation leaves state alone.
struct InFlight<'a> {
    state: &'a Mutex<State>,
    generation: u64,
    cursor: NonZeroU32,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if state.cache.generation() == self.generation && state.fetch.is_in_flight() {
            warn!("Fetch of page {} abandoned before it answered", self.cursor);
            state.fetch = FetchState::Error(format!("fetch of page {} was cancelled", self.cursor));
        }
    }
}

/// Handle to the directory. Clones share the same state.
pub struct Directory<G> {
    shared: Arc<Shared<G>>,
}

impl<G> Clone for Directory<G> {
    fn clone(&self) -> Self {
        Directory {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G: FetchGateway> Directory<G> {
    pub fn new(gateway: G, config: DirectoryConfig) -> Self {
        Self::with_exhaustion(gateway, config, ShortBatch)
    }

    pub fn with_exhaustion<E>(gateway: G, config: DirectoryConfig, exhaustion: E) -> Self
    where
        E: PageExhaustion + 'static,
    {
        let state = State {
            cache: PageCache::new(config.duplicates),
            fetch: FetchState::Idle,
            has_next_page: true,
            query: String::new(),
            sentinel: Sentinel::new(),
            memo: SearchMemo::default(),
        };
        Directory {
            shared: Arc::new(Shared {
                gateway,
                config,
                exhaustion: Box::new(exhaustion),
                state: Mutex::new(state),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock()
    }

    /// First page on mount. A no-op once anything has been requested.
    pub async fn load_initial(&self) -> Result<LoadOutcome, NetworkError> {
        self.run(Trigger::Mount).await
    }

    /// Next page, unless one is in flight or the source looks exhausted.
    pub async fn load_more(&self) -> Result<LoadOutcome, NetworkError> {
        self.run(Trigger::More).await
    }

    /// Feed a visibility report from the trailing marker. Loads the next page
    /// only on a hidden-to-visible transition while idle.
    ///
    /// A report that is refused (in flight, exhausted, not started) still
    /// uses up the transition. Once a page is applied or the directory is
    /// refreshed the marker counts as hidden again, so a caller whose marker
    /// is still in view must report `true` again to keep paging.
    pub async fn sentinel_visibility(&self, visible: bool) -> Result<LoadOutcome, NetworkError> {
        self.run(Trigger::Sentinel(visible)).await
    }

    /// Re-issue the fetch that failed, from the same cursor.
    pub async fn retry(&self) -> Result<LoadOutcome, NetworkError> {
        self.run(Trigger::Retry).await
    }

    /// Discard everything and start again from page 1.
    pub async fn refresh(&self) -> Result<LoadOutcome, NetworkError> {
        self.run(Trigger::Refresh).await
    }

    async fn run(&self, trigger: Trigger) -> Result<LoadOutcome, NetworkError> {
        let ticket = match self.begin(trigger) {
            Ok(ticket) => ticket,
            Err(reason) => {
                debug!("Load {:?} skipped: {:?}", trigger, reason);
                return Ok(LoadOutcome::Skipped(reason));
            }
        };
        let guard = InFlight {
            state: &self.shared.state,
            generation: ticket.generation,
            cursor: ticket.request.cursor,
            armed: true,
        };
        let result = self.shared.gateway.fetch_page(&ticket.request).await;
        guard.disarm();
        self.complete(ticket, result)
    }

    fn begin(&self, trigger: Trigger) -> Result<Ticket, SkipReason> {
        let mut state = self.lock();
        let state = &mut *state;
        let size = self.shared.config.batch_size.get();

        let loaded = state.cache.last_cursor().is_some();
        let next = match trigger {
            Trigger::Refresh => {
                let generation = state.cache.reset();
                info!("Refreshing directory, generation {}", generation);
                state.has_next_page = true;
                state.sentinel.rearm();
                state.memo.clear();
                FetchState::LoadingInitial
            }
            Trigger::Mount => {
                if state.fetch.is_in_flight() {
                    return Err(SkipReason::InFlight);
                }
                if loaded || state.fetch != FetchState::Idle {
                    return Err(SkipReason::AlreadyStarted);
                }
                FetchState::LoadingInitial
            }
            Trigger::Retry => match state.fetch {
                FetchState::Error(_) if loaded => FetchState::LoadingMore,
                FetchState::Error(_) => FetchState::LoadingInitial,
                _ => return Err(SkipReason::NothingToRetry),
            },
            Trigger::More | Trigger::Sentinel(_) => {
                if let Trigger::Sentinel(visible) = trigger {
                    if !state.sentinel.observe(visible) {
                        return Err(SkipReason::NoIntent);
                    }
                    if let FetchState::Error(_) = state.fetch {
                        return Err(SkipReason::Errored);
                    }
                }
                if state.fetch.is_in_flight() {
                    return Err(SkipReason::InFlight);
                }
                if !loaded {
                    return Err(SkipReason::NotStarted);
                }
                if !state.has_next_page {
                    return Err(SkipReason::Exhausted);
                }
                FetchState::LoadingMore
            }
        };

        state.fetch = next;
        Ok(Ticket {
            generation: state.cache.generation(),
            request: PageRequest {
                cursor: state.cache.next_cursor(),
                size,
            },
        })
    }

    fn complete(
        &self,
        ticket: Ticket,
        result: Result<Vec<UserRecord>, NetworkError>,
    ) -> Result<LoadOutcome, NetworkError> {
        let mut state = self.lock();
        let cursor = ticket.request.cursor;
        if ticket.generation != state.cache.generation() {
            debug!(
                "Dropping page {} from generation {}, now at {}",
                cursor,
                ticket.generation,
                state.cache.generation()
            );
            return Ok(LoadOutcome::Stale);
        }

        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Fetching page {} failed: {}", cursor, e);
                state.fetch = FetchState::Error(e.to_string());
                return Err(e);
            }
        };

        let received = batch.len();
        let exhausted = self.shared.exhaustion.is_exhausted(&batch, ticket.request.size);
        let appended = match state.cache.append(cursor, batch) {
            Ok(appended) => appended,
            Err(e) => {
                debug!("Dropping page: {}", e);
                state.fetch = FetchState::Idle;
                return Ok(LoadOutcome::Stale);
            }
        };
        state.has_next_page = !exhausted;
        state.fetch = FetchState::Idle;
        state.sentinel.rearm();
        debug!(
            "Applied page {}: {} received, {} new, {} skipped, {} overwritten{}",
            cursor,
            received,
            appended.accepted,
            appended.skipped,
            appended.overwritten,
            if exhausted { ", source exhausted" } else { "" }
        );
        Ok(LoadOutcome::Applied {
            cursor,
            received,
            accepted: appended.accepted,
        })
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.lock().query = query.into();
    }

    pub fn query(&self) -> String {
        self.lock().query.clone()
    }

    /// Every cached record, unfiltered.
    pub fn users(&self) -> Vec<UserRecord> {
        self.lock().cache.users().cloned().collect()
    }

    /// Cached records matching the current query.
    pub fn visible_users(&self) -> Vec<UserRecord> {
        let mut state = self.lock();
        let state = &mut *state;
        state
            .memo
            .filter(state.cache.revision(), state.cache.users(), &state.query)
            .to_vec()
    }

    /// Full record for the detail view.
    pub fn find(&self, key: &str) -> Option<UserRecord> {
        self.lock().cache.find(key).cloned()
    }

    pub fn fetch_state(&self) -> FetchState {
        self.lock().fetch.clone()
    }

    pub fn has_next_page(&self) -> bool {
        self.lock().has_next_page
    }

    pub fn is_fetching_next_page(&self) -> bool {
        self.lock().fetch == FetchState::LoadingMore
    }

    pub fn generation(&self) -> u64 {
        self.lock().cache.generation()
    }

    pub fn snapshot(&self) -> DirectoryView {
        let mut state = self.lock();
        let state = &mut *state;
        let users = state
            .memo
            .filter(state.cache.revision(), state.cache.users(), &state.query)
            .to_vec();
        let error = match &state.fetch {
            FetchState::Error(reason) => Some(reason.clone()),
            _ => None,
        };
        DirectoryView {
            users,
            total: state.cache.len(),
            query: state.query.clone(),
            is_loading: state.fetch == FetchState::LoadingInitial,
            is_fetching_next_page: state.fetch == FetchState::LoadingMore,
            has_next_page: state.has_next_page,
            fetch: state.fetch.clone(),
            error,
        }
    }

    fn remove(&self, key: &str) -> DeleteOutcome {
        match self.lock().cache.remove(key) {
            Some(user) => {
                info!("Deleted {} ({})", user.display_name(), key);
                DeleteOutcome::Removed(user)
            }
            None => {
                debug!("Delete of {} found nothing to remove", key);
                DeleteOutcome::Missing
            }
        }
    }
}

impl<G: FetchGateway + 'static> Directory<G> {
    /// Removes `key` once the simulated confirmation delay has passed. Runs as
    /// its own task, so loads and searches carry on meanwhile. Confirming with
    /// the user is the caller's job and must happen before this is called.
    pub fn delete(&self, key: impl Into<String>) -> PendingDelete {
        let key = key.into();
        let delay = self.shared.config.delete_delay;
        let directory = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            directory.remove(&task_key)
        });
        PendingDelete { key, handle }
    }
}

/// A delete waiting out its confirmation delay.
pub struct PendingDelete {
    key: String,
    handle: JoinHandle<DeleteOutcome>,
}

impl PendingDelete {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Abandon the delete. Has no effect once it has resolved.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub async fn wait(self) -> DeleteOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => {
                debug!("Delete of {} cancelled", self.key);
                DeleteOutcome::Cancelled
            }
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

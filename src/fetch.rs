//! Requesting further batches: the CONTINUE round trip, folding replies
//! into the cursor, and the background prefetch.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::cursor::Shared;
use crate::debug::debug_log;
use crate::error::{CursorError, Result};
use crate::proto::{Query, Response};

impl Shared {
    /// Send one CONTINUE and fold the reply in with [`Shared::extend`].
    ///
    /// Returns `Ok(false)` without touching the connection when another fetch
    /// is already in flight or the stream can't be continued.
    pub(crate) fn fetch_more(self: &Arc<Self>) -> Result<bool> {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }

        let conn = {
            let state = self.lock();
            match &state.conn {
                Some(conn) if !state.closed && !state.finished && state.last_err.is_none() => {
                    Arc::clone(conn)
                }
                _ => {
                    self.fetching.store(false, Ordering::Release);
                    drop(state);
                    self.ready.notify_all();
                    return Ok(false);
                }
            }
        };

        debug_log!("Cursor {}: requesting next batch", self.token);
        match conn.query(&Query::continue_stream(self.token)) {
            Ok(response) => {
                self.extend(response);
                Ok(true)
            }
            Err(err) => {
                debug_log!("Cursor {}: continue failed: {}", self.token, err);
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    /// Record a failed fetch and wake anyone waiting on it.
    pub(crate) fn fail(&self, err: CursorError) {
        let mut state = self.lock();
        state.record(err);
        self.fetching.store(false, Ordering::Release);
        drop(state);
        self.ready.notify_all();
    }

    /// Add the batches of one reply to the cursor.
    pub(crate) fn extend(self: &Arc<Self>, response: Response) {
        let mut state = self.lock();

        if !state.closed {
            if let Some(err) = response.error() {
                state.record(err);
                state.finished = true;
            } else {
                for raw in response.results {
                    state.responses.push(raw);
                }
                state.finished = !response.kind.has_more();
                if response.profile.is_some() {
                    state.profile = response.profile;
                }
            }
        }

        self.fetching.store(false, Ordering::Release);
        let prefetch = !state.closed && !state.finished && state.responses.len() == 1;
        drop(state);
        self.ready.notify_all();

        if prefetch {
            self.spawn_prefetch();
        }
    }

    /// Fetch the next batch on the worker pool. The outcome lands in the
    /// cursor through `extend` or `fail`; a panicking connection is turned
    /// into a cursor error.
    pub(crate) fn spawn_prefetch(self: &Arc<Self>) {
        if !self.opts.prefetch || self.fetching.load(Ordering::Acquire) {
            return;
        }

        let shared = Arc::clone(self);
        let task = crate::rt().spawn_blocking(move || shared.fetch_more());
        let shared = Arc::clone(self);
        crate::rt().spawn(async move {
            match task.await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    debug_log!("Cursor {}: background fetch failed: {}", shared.token, err);
                }
                Err(join_err) => {
                    shared.fail(CursorError::Connection(format!(
                        "background fetch aborted: {join_err}"
                    )));
                }
            }
        });
    }
}

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use serde_json::value::RawValue;

use crate::config::QueryOpts;
use crate::conn::{Connection, ReleaseFn};
use crate::datum::Datum;
use crate::debug::debug_log;
use crate::decode::Decodable;
use crate::error::{CursorError, Result};
use crate::proto::{Query, Response};
use crate::pseudotype::{Normalizer, Pseudotypes};
use crate::queue::Queue;

/// State shared between the caller's cursor handle and background fetches.
pub(crate) struct Shared {
    pub(crate) token: i64,
    pub(crate) term: Option<serde_json::Value>,
    pub(crate) opts: QueryOpts,
    pub(crate) normalizer: Box<dyn Normalizer>,
    /// Set while a CONTINUE is in flight. Acquired by compare-and-swap,
    /// always released with `state` held so waiters on `ready` see it.
    pub(crate) fetching: AtomicBool,
    pub(crate) state: Mutex<State>,
    pub(crate) ready: Condvar,
}

pub(crate) struct State {
    pub(crate) conn: Option<Arc<dyn Connection>>,
    pub(crate) release: Option<ReleaseFn>,
    pub(crate) last_err: Option<CursorError>,
    pub(crate) closed: bool,
    pub(crate) finished: bool,
    /// Decoded rows ready to hand out.
    pub(crate) buffer: Queue<Datum>,
    /// Undecoded row batches in arrival order.
    pub(crate) responses: Queue<Box<RawValue>>,
    pub(crate) profile: Option<serde_json::Value>,
}

impl State {
    /// Keep the first error; later ones are dropped.
    pub(crate) fn record(&mut self, err: CursorError) {
        if self.last_err.is_none() {
            self.last_err = Some(err);
        }
    }
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the fetch currently in flight completes, the cursor
    /// fails, or it is closed.
    fn wait_for_fetch<'a>(&self, state: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.ready
            .wait_while(state, |s| {
                self.fetching.load(std::sync::atomic::Ordering::Acquire)
                    && s.last_err.is_none()
                    && !s.closed
            })
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record_error(&self, err: CursorError) {
        self.lock().record(err);
    }

    /// Parse one raw batch and split it into rows.
    fn decode_batch(&self, raw: &RawValue) -> Result<Vec<Datum>> {
        let value: serde_json::Value = serde_json::from_str(raw.get())?;
        match self.normalizer.normalize(value, &self.opts)? {
            Datum::Array(rows) => Ok(rows),
            other => Ok(vec![other]),
        }
    }

    pub(crate) fn close(&self) -> Result<()> {
        let (conn, release, finished) = {
            let mut state = self.lock();
            if state.closed {
                return Ok(());
            }
            let Some(conn) = state.conn.take() else {
                return Ok(());
            };
            state.closed = true;
            (conn, state.release.take(), state.finished)
        };
        self.ready.notify_all();

        // Stop any unfinished query
        let err = if finished {
            None
        } else {
            conn.query(&Query::stop(self.token)).err()
        };
        match &err {
            Some(e) => debug_log!("Cursor {} closed, stop failed: {}", self.token, e),
            None => debug_log!("Cursor {} closed", self.token),
        }

        if let Some(release) = release {
            release(err.clone());
        }
        err.map_or(Ok(()), Err)
    }
}

/// Configures and opens a [`Cursor`].
pub struct CursorBuilder {
    conn: Arc<dyn Connection>,
    token: i64,
    term: Option<serde_json::Value>,
    opts: QueryOpts,
    normalizer: Box<dyn Normalizer>,
    release: Option<ReleaseFn>,
}

impl CursorBuilder {
    /// The term the query was started with.
    pub fn term(mut self, term: serde_json::Value) -> Self {
        self.term = Some(term);
        self
    }

    pub fn opts(mut self, opts: QueryOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Replace the default pseudotype conversion.
    pub fn normalizer(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    /// Called once when the cursor closes.
    pub fn on_release(mut self, release: impl FnOnce(Option<CursorError>) + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// Open a cursor with nothing buffered; the first `next` fetches.
    pub fn build(self) -> Cursor {
        debug_log!("Cursor {} opened", self.token);
        Cursor {
            shared: Arc::new(Shared {
                token: self.token,
                term: self.term,
                opts: self.opts,
                normalizer: self.normalizer,
                fetching: AtomicBool::new(false),
                state: Mutex::new(State {
                    conn: Some(self.conn),
                    release: self.release,
                    last_err: None,
                    closed: false,
                    finished: false,
                    buffer: Queue::new(),
                    responses: Queue::new(),
                    profile: None,
                }),
                ready: Condvar::new(),
            }),
        }
    }

    /// Open a cursor seeded with the first reply of its query.
    pub fn start(self, first: Response) -> Cursor {
        let cursor = self.build();
        cursor.extend(first);
        cursor
    }
}

/// The result of a query. Starts before the first row; use [`Cursor::next`]
/// to advance through the rows:
///
/// ```ignore
/// let mut row = Datum::Null;
/// while cursor.next(&mut row) {
///     // ...
/// }
/// let err = cursor.err(); // any error encountered during iteration
/// ```
///
/// Dropping the cursor closes it.
pub struct Cursor {
    pub(crate) shared: Arc<Shared>,
}

impl Cursor {
    pub fn builder(conn: Arc<dyn Connection>, token: i64) -> CursorBuilder {
        CursorBuilder {
            conn,
            token,
            term: None,
            opts: QueryOpts::default(),
            normalizer: Box::new(Pseudotypes),
            release: None,
        }
    }

    pub fn token(&self) -> i64 {
        self.shared.token
    }

    pub fn term(&self) -> Option<&serde_json::Value> {
        self.shared.term.as_ref()
    }

    pub fn opts(&self) -> &QueryOpts {
        &self.shared.opts
    }

    /// Profiler output sent with the query's replies, if requested.
    pub fn profile(&self) -> Option<serde_json::Value> {
        self.shared.lock().profile.clone()
    }

    /// The first error encountered during iteration, if any.
    pub fn err(&self) -> Option<CursorError> {
        self.shared.lock().last_err.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Close the cursor, preventing further enumeration. An unfinished
    /// stream is stopped on the server. Idempotent.
    pub fn close(&self) -> Result<()> {
        self.shared.close()
    }

    /// Append a reply for this cursor's token.
    pub fn extend(&self, response: Response) {
        self.shared.extend(response);
    }

    /// Decode the next row into `dest`, blocking if a batch has to be
    /// fetched first. The following batch is requested in the background
    /// once only one undecoded batch is left.
    ///
    /// Returns false at the end of the result set or on error; check
    /// [`Cursor::err`] to tell them apart. Either way the cursor is closed.
    #[allow(clippy::should_implement_trait)]
    pub fn next<T: Decodable>(&self, dest: &mut T) -> bool {
        if self.is_closed() {
            return false;
        }

        match self.load_next(dest) {
            Ok(true) => true,
            Ok(false) => {
                let _ = self.close();
                false
            }
            Err(err) => {
                debug_log!("Cursor {} failed: {}", self.shared.token, err);
                self.shared.record_error(err);
                let _ = self.close();
                false
            }
        }
    }

    fn load_next<T: Decodable>(&self, dest: &mut T) -> Result<bool> {
        let shared = &self.shared;
        let mut state = shared.lock();

        loop {
            // Load more data if needed
            while state.last_err.is_none()
                && state.buffer.is_empty()
                && state.responses.is_empty()
                && !state.finished
            {
                if state.closed {
                    return Err(CursorError::Closed);
                }
                drop(state);
                let issued = shared.fetch_more()?;
                state = shared.lock();
                if !issued {
                    state = shared.wait_for_fetch(state);
                }
            }

            if state.buffer.is_empty() && state.responses.is_empty() {
                return match state.last_err.clone() {
                    Some(err) => Err(err),
                    None => Ok(false),
                };
            }
            if !state.buffer.is_empty() {
                break;
            }

            // An empty batch decodes to no rows, so go round again.
            let Some(raw) = state.responses.pop() else {
                continue;
            };
            drop(state);
            let rows = shared.decode_batch(&raw)?;
            state = shared.lock();
            for row in rows {
                state.buffer.push(row);
            }
        }

        if state.responses.len() == 1 && !state.finished && !state.closed {
            shared.spawn_prefetch();
        }

        let Some(row) = state.buffer.pop() else {
            return Ok(false);
        };
        drop(state);

        dest.decode_from(row)?;
        Ok(true)
    }

    /// Whether the current row is null. An empty cursor counts as null.
    pub fn is_nil(&self) -> bool {
        let state = self.shared.lock();
        if let Some(row) = state.buffer.peek() {
            return row.is_null();
        }
        match state.responses.peek() {
            Some(raw) => raw.get().trim() == "null",
            None => true,
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        let _ = self.shared.close();
    }
}

use crate::error::{CursorError, Result};
use crate::proto::{Query, Response};

/// The wire connection a cursor talks through.
///
/// `query` is a blocking request/response call. The cursor only ever sends
/// CONTINUE and STOP for its own token, never while holding its own lock, and
/// never more than one CONTINUE at a time.
pub trait Connection: Send + Sync {
    fn query(&self, query: &Query) -> Result<Response>;
}

/// Called exactly once when the cursor closes, with the error from the STOP
/// request if there was one. Used to hand the connection back to its pool.
pub type ReleaseFn = Box<dyn FnOnce(Option<CursorError>) + Send>;

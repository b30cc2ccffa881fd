//! Streaming result cursor for a ReQL-style query/response protocol.
//!
//! A [`Cursor`] turns the replies the server sends for one query token into a
//! pull-based iterator. Rows are decoded lazily, one raw batch at a time, and
//! the next batch is requested in the background while the caller is still
//! consuming the current one.
//!
//! ```ignore
//! let cursor = Cursor::builder(conn, token).opts(opts).start(first_reply);
//! let mut row = Datum::Null;
//! while cursor.next(&mut row) {
//!     // ...
//! }
//! if let Some(err) = cursor.err() {
//!     // iteration failed
//! }
//! ```

mod config;
mod conn;
mod cursor;
mod datum;
mod debug;
mod decode;
mod error;
mod extract;
mod fetch;
mod proto;
mod pseudotype;
mod queue;

#[cfg(test)]
mod testing;

use std::sync::OnceLock;

use tokio::runtime::Runtime;

pub use config::{Format, QueryOpts};
pub use conn::{Connection, ReleaseFn};
pub use cursor::{Cursor, CursorBuilder};
pub use datum::Datum;
pub use debug::set_debug;
pub use decode::{Decodable, Json};
pub use error::{CursorError, Result, ServerErrorKind};
pub use extract::Rows;
pub use proto::{Query, QueryType, Response, ResponseType};
pub use pseudotype::{Normalizer, Pseudotypes};
pub use queue::Queue;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Worker runtime that background fetches are scheduled on.
pub(crate) fn rt() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        debug::init();
        debug::debug_log!("Tokio runtime initialized");
        Runtime::new().expect("Failed to create tokio runtime")
    })
}

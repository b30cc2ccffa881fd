//! In-memory connection that replays scripted replies, for cursor tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::conn::Connection;
use crate::error::{CursorError, Result};
use crate::proto::{Query, QueryType, Response};

#[derive(Default)]
pub struct ScriptedConnection {
    replies: Mutex<VecDeque<Result<Response>>>,
    delay: Duration,
    stop_error: Option<CursorError>,
    pub continues: AtomicUsize,
    pub stops: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedConnection {
    pub fn new(replies: Vec<Result<Response>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    /// Every CONTINUE sleeps for `delay` before answering.
    pub fn slow(replies: Vec<Result<Response>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            delay,
            ..Self::default()
        })
    }

    pub fn failing_stop(err: CursorError) -> Arc<Self> {
        Arc::new(Self {
            stop_error: Some(err),
            ..Self::default()
        })
    }

    pub fn continues(&self) -> usize {
        self.continues.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Connection for ScriptedConnection {
    fn query(&self, query: &Query) -> Result<Response> {
        match query.kind {
            QueryType::Stop => {
                self.stops.fetch_add(1, Ordering::SeqCst);
                match &self.stop_error {
                    Some(err) => Err(err.clone()),
                    None => Ok(reply(2, "[]")),
                }
            }
            QueryType::Continue => {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                self.continues.fetch_add(1, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    std::thread::sleep(self.delay);
                }
                let next = self.replies.lock().unwrap().pop_front();
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                next.unwrap_or_else(|| Err(CursorError::Query("no scripted reply left".into())))
            }
            other => Err(CursorError::Query(format!("unexpected query {other:?}"))),
        }
    }
}

/// Build a reply of type `t` with the JSON array `rows` as its results.
pub fn reply(t: i64, rows: &str) -> Response {
    Response::from_json(&format!(r#"{{"t":{t},"r":{rows}}}"#)).unwrap()
}

pub const ATOM: i64 = 1;
pub const SEQUENCE: i64 = 2;
pub const PARTIAL: i64 = 3;

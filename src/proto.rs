use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{CursorError, Result, ServerErrorKind};

// ── Queries sent to the server ────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Start = 1,
    Continue = 2,
    Stop = 3,
    NoreplyWait = 4,
}

/// One request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: QueryType,
    pub token: i64,
    pub term: Option<serde_json::Value>,
    pub opts: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Query {
    /// Ask the server for the next batch of the stream `token`.
    pub fn continue_stream(token: i64) -> Self {
        Self {
            kind: QueryType::Continue,
            token,
            term: None,
            opts: None,
        }
    }

    /// Tell the server to drop the stream `token`.
    pub fn stop(token: i64) -> Self {
        Self {
            kind: QueryType::Stop,
            token,
            term: None,
            opts: None,
        }
    }

    /// Wire body: `[type]` for CONTINUE/STOP, `[type, term, opts]` otherwise.
    pub fn to_wire(&self) -> serde_json::Value {
        let mut body = vec![serde_json::json!(self.kind as i32)];
        if let Some(ref term) = self.term {
            body.push(term.clone());
            body.push(serde_json::Value::Object(
                self.opts.clone().unwrap_or_default(),
            ));
        }
        serde_json::Value::Array(body)
    }
}

// ── Replies from the server ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "i64")]
pub enum ResponseType {
    SuccessAtom,
    SuccessSequence,
    SuccessPartial,
    WaitComplete,
    SuccessFeed,
    ClientError,
    CompileError,
    RuntimeError,
}

impl TryFrom<i64> for ResponseType {
    type Error = String;

    fn try_from(n: i64) -> std::result::Result<Self, Self::Error> {
        match n {
            1 => Ok(ResponseType::SuccessAtom),
            2 => Ok(ResponseType::SuccessSequence),
            3 => Ok(ResponseType::SuccessPartial),
            4 => Ok(ResponseType::WaitComplete),
            5 => Ok(ResponseType::SuccessFeed),
            16 => Ok(ResponseType::ClientError),
            17 => Ok(ResponseType::CompileError),
            18 => Ok(ResponseType::RuntimeError),
            other => Err(format!("Unknown response type: {other}")),
        }
    }
}

impl ResponseType {
    /// Whether the server will send more data for this token.
    pub fn has_more(self) -> bool {
        matches!(self, ResponseType::SuccessPartial | ResponseType::SuccessFeed)
    }

    pub fn error_kind(self) -> Option<ServerErrorKind> {
        match self {
            ResponseType::ClientError => Some(ServerErrorKind::Client),
            ResponseType::CompileError => Some(ServerErrorKind::Compile),
            ResponseType::RuntimeError => Some(ServerErrorKind::Runtime),
            _ => None,
        }
    }
}

/// One reply envelope. Row batches are kept as raw JSON until the cursor
/// decodes them.
#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(rename = "t")]
    pub kind: ResponseType,
    #[serde(rename = "r", default)]
    pub results: Vec<Box<RawValue>>,
    #[serde(rename = "p", default)]
    pub profile: Option<serde_json::Value>,
}

impl Response {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CursorError::Query(format!("Invalid reply: {e}")))
    }

    /// The server error carried by an error reply, if this is one.
    pub fn error(&self) -> Option<CursorError> {
        let kind = self.kind.error_kind()?;
        let message = self
            .results
            .first()
            .and_then(|raw| serde_json::from_str::<String>(raw.get()).ok())
            .unwrap_or_else(|| "unknown error".to_string());
        Some(CursorError::Server { kind, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continue_and_stop_bodies() {
        assert_eq!(Query::continue_stream(7).to_wire(), serde_json::json!([2]));
        assert_eq!(Query::stop(7).to_wire(), serde_json::json!([3]));
    }

    #[test]
    fn start_body_carries_term_and_opts() {
        let q = Query {
            kind: QueryType::Start,
            token: 1,
            term: Some(serde_json::json!([15, [[14, ["test"]], "users"]])),
            opts: None,
        };
        assert_eq!(
            q.to_wire(),
            serde_json::json!([1, [15, [[14, ["test"]], "users"]], {}])
        );
    }

    #[test]
    fn parse_partial_reply() {
        let resp = Response::from_json(r#"{"t":3,"r":[1,{"a":2},null]}"#).unwrap();
        assert_eq!(resp.kind, ResponseType::SuccessPartial);
        assert!(resp.kind.has_more());
        let raw: Vec<&str> = resp.results.iter().map(|r| r.get()).collect();
        assert_eq!(raw, vec!["1", r#"{"a":2}"#, "null"]);
        assert!(resp.error().is_none());
    }

    #[test]
    fn parse_error_reply() {
        let resp = Response::from_json(r#"{"t":18,"r":["Table does not exist."]}"#).unwrap();
        assert!(!resp.kind.has_more());
        assert_eq!(
            resp.error(),
            Some(CursorError::Server {
                kind: ServerErrorKind::Runtime,
                message: "Table does not exist.".into(),
            })
        );
    }

    #[test]
    fn unknown_reply_type_is_rejected() {
        assert!(Response::from_json(r#"{"t":99,"r":[]}"#).is_err());
    }
}

use serde::Deserialize;

use crate::error::{CursorError, Result};

/// How a pseudotype from the wire is presented to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Convert into the native representation (timestamps, bytes, groups).
    #[default]
    Native,
    /// Leave the tagged object exactly as the server sent it.
    Raw,
}

/// Run options of the query a cursor belongs to.
///
/// Only the options that affect how returned values are interpreted are
/// kept; everything else the query was run with is the connection's concern.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryOpts {
    pub time_format: Format,
    pub binary_format: Format,
    pub group_format: Format,
    /// Fetch the next batch in the background while the caller consumes
    /// the current one.
    pub prefetch: bool,
}

impl Default for QueryOpts {
    fn default() -> Self {
        Self {
            time_format: Format::Native,
            binary_format: Format::Native,
            group_format: Format::Native,
            prefetch: true,
        }
    }
}

impl QueryOpts {
    /// Parse from a JSON object of run options.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CursorError::Config(format!("Invalid query options JSON: {e}")))
    }
}

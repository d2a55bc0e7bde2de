//! One JSON line per test.

use std::error::Error as StdError;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sw_connectivity::TestError;

use crate::cli::Proto;

#[derive(Debug, Serialize)]
pub struct Record {
    pub resolver: String,
    pub proto: &'static str,
    /// UTC, RFC 3339, whole seconds.
    pub time: String,
    pub duration_ms: u64,
    pub error: Option<ErrorRecord>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posix_error: Option<&'static str>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

impl ErrorRecord {
    pub fn from_test_error(err: &TestError) -> Self {
        Self {
            op: Some(err.op),
            posix_error: err.posix_error,
            msg: innermost(err).to_string(),
        }
    }
}

fn innermost<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut cur = err;
    while let Some(next) = cur.source() {
        cur = next;
    }
    cur
}

impl Record {
    pub fn new(
        resolver: String,
        proto: Proto,
        started: DateTime<Utc>,
        duration: Duration,
        result: &Result<(), TestError>,
    ) -> Self {
        Self {
            resolver,
            proto: proto.as_str(),
            time: started.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            error: result.as_ref().err().map(ErrorRecord::from_test_error),
        }
    }

    pub fn write_line<W: Write>(&self, mut out: W) -> Result<()> {
        serde_json::to_writer(&mut out, self).context("failed to output JSON")?;
        out.write_all(b"\n").context("failed to output JSON")?;
        Ok(())
    }
}

//! Response envelope shared by every command that returns analysis data.
//!
//! Success: `{"status": "success", "data": <payload>}`.
//! Failure: `{"status": "error", "code": "E2002", "message": "...", "hint": "..."}`.
//!
//! The envelope always goes to stdout (or the `--output` file on success);
//! logs stay on stderr.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use centrum_core::{CentralityError, ErrorCode};
use clap::ValueEnum;
use serde::Serialize;

/// Output formats for listing commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Aligned plain text.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope<'a, T: Serialize> {
    Success {
        data: &'a T,
    },
    Error {
        code: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<&'static str>,
    },
}

impl<T: Serialize> Envelope<'_, T> {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.code(),
            message: message.into(),
            hint: code.hint(),
        }
    }

    pub fn from_error(err: &CentralityError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}

fn write_json<T: Serialize>(w: &mut dyn Write, value: &T, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *w, value)?;
    } else {
        serde_json::to_writer(&mut *w, value)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Write `envelope` to `output`, or stdout when `None`.
pub fn emit<T: Serialize>(
    envelope: &Envelope<'_, T>,
    output: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let mut buf = Vec::new();
            write_json(&mut buf, envelope, pretty)?;
            fs::write(path, buf).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_json(&mut out, envelope, pretty)
        }
    }
}

//! Row-by-row reading of a Query API response.
//!
//! A scan is one unbounded statement. Its response body is consumed chunk by
//! chunk and the `data.values` array is split into rows as the bytes arrive,
//! so only the rows of the current page (plus one partial row) are in memory.

use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;

use crate::connection::common::ServerError;
use crate::error::{Error, Result};

/// Nesting depth of the `values` array: `{ "data": { "values": [`.
const VALUES_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before `"values": [`; bytes are kept in case the body is an error.
    Preamble,
    /// Inside the `values` array.
    Rows,
    /// After the `values` array closed; bytes are discarded.
    Trailer,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

/// Incremental splitter for the rows of a typed JSON response body.
#[derive(Debug)]
pub struct RowSplitter {
    buf: Vec<u8>,
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    string_start: usize,
    last_key: Option<(usize, usize)>,
    awaiting_values: bool,
    row_start: Option<usize>,
    phase: Phase,
}

impl Default for RowSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowSplitter {
    /// Creates a splitter positioned at the start of a body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            depth: 0,
            in_string: false,
            escaped: false,
            string_start: 0,
            last_key: None,
            awaiting_values: false,
            row_start: None,
            phase: Phase::Preamble,
        }
    }

    /// Consumes the next chunk of the body and returns every row completed
    /// by it.
    ///
    /// # Errors
    ///
    /// `Error::Json` when a complete row is not valid JSON.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Vec<Value>>> {
        if self.phase == Phase::Trailer {
            return Ok(Vec::new());
        }
        self.buf.extend_from_slice(chunk);
        let mut rows = Vec::new();

        while self.pos < self.buf.len() {
            let byte = self.buf[self.pos];

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                    if self.phase == Phase::Preamble && self.depth == VALUES_DEPTH - 1 {
                        self.last_key = Some((self.string_start, self.pos));
                    }
                }
                self.pos += 1;
                continue;
            }

            match byte {
                b'"' => {
                    self.in_string = true;
                    self.string_start = self.pos + 1;
                }
                b':' if self.phase == Phase::Preamble => {
                    self.awaiting_values = self.depth == VALUES_DEPTH - 1
                        && self
                            .last_key
                            .is_some_and(|(start, end)| &self.buf[start..end] == b"values");
                }
                b'[' | b'{' => {
                    if self.phase == Phase::Preamble
                        && self.awaiting_values
                        && byte == b'['
                        && self.depth == VALUES_DEPTH - 1
                    {
                        // Header is no longer needed once the rows start.
                        self.depth = VALUES_DEPTH;
                        self.phase = Phase::Rows;
                        self.buf.drain(..=self.pos);
                        self.pos = 0;
                        continue;
                    }
                    if self.phase == Phase::Rows && self.depth == VALUES_DEPTH {
                        self.row_start = Some(self.pos);
                    }
                    self.awaiting_values = false;
                    self.depth += 1;
                }
                b']' | b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.phase == Phase::Rows {
                        if self.depth == VALUES_DEPTH {
                            if let Some(start) = self.row_start.take() {
                                rows.push(serde_json::from_slice(&self.buf[start..=self.pos])?);
                            }
                        } else if self.depth < VALUES_DEPTH {
                            self.phase = Phase::Trailer;
                            self.buf.clear();
                            self.pos = 0;
                            return Ok(rows);
                        }
                    }
                }
                b' ' | b'\t' | b'\r' | b'\n' => {}
                _ => self.awaiting_values = false,
            }
            self.pos += 1;
        }

        if self.phase == Phase::Rows {
            let keep_from = self.row_start.unwrap_or(self.pos);
            self.buf.drain(..keep_from);
            self.pos -= keep_from;
            if self.row_start.is_some() {
                self.row_start = Some(0);
            }
        }

        Ok(rows)
    }

    /// Checks the body once it has ended.
    ///
    /// # Errors
    ///
    /// The server's error when the body carried `errors` instead of rows,
    /// `Error::Connection` when it stopped in the middle of the rows, and
    /// `Error::Query` when it carried neither.
    pub fn end(&mut self) -> Result<()> {
        match self.phase {
            Phase::Trailer => Ok(()),
            Phase::Rows => Err(Error::Connection(
                "Result stream ended before all rows arrived".to_string(),
            )),
            Phase::Preamble => {
                let envelope: Envelope = serde_json::from_slice(&std::mem::take(&mut self.buf))?;
                if let Some(err) = envelope.errors.into_iter().next() {
                    return Err(err.into_error());
                }
                match envelope.data {
                    Some(_) => Ok(()),
                    None => Err(Error::Query("Query response contains no data".to_string())),
                }
            }
        }
    }
}

/// An open scan: one statement whose rows are read on demand.
pub struct ResultCursor {
    statement: String,
    response: Response,
    splitter: RowSplitter,
    rows: VecDeque<Vec<Value>>,
    exhausted: bool,
    /// Key the next page request must present to continue this scan.
    pub(crate) resume_key: Option<String>,
}

impl ResultCursor {
    /// Wraps the response of `statement`.
    #[must_use]
    pub fn new(statement: &str, response: Response) -> Self {
        Self {
            statement: statement.to_string(),
            response,
            splitter: RowSplitter::new(),
            rows: VecDeque::new(),
            exhausted: false,
            resume_key: None,
        }
    }

    /// Statement this cursor is reading.
    #[must_use]
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Next row, or `None` once the scan is complete.
    pub async fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        while self.rows.is_empty() && !self.exhausted {
            self.pull().await?;
        }
        Ok(self.rows.pop_front())
    }

    /// Whether another row follows, reading ahead if needed.
    pub async fn has_next(&mut self) -> Result<bool> {
        while self.rows.is_empty() && !self.exhausted {
            self.pull().await?;
        }
        Ok(!self.rows.is_empty())
    }

    async fn pull(&mut self) -> Result<()> {
        let chunk = self
            .response
            .chunk()
            .await
            .map_err(|e| Error::Connection(format!("Result stream interrupted: {}", e)))?;

        match chunk {
            Some(bytes) => self.rows.extend(self.splitter.feed(&bytes)?),
            None => {
                self.exhausted = true;
                self.splitter.end()?;
            }
        }
        Ok(())
    }
}

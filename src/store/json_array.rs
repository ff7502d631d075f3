//! Incremental splitter for a streamed JSON array
//!
//! `runQuery` answers with one JSON array whose elements arrive over time.
//! The splitter is fed raw chunks and hands back each top-level element as
//! soon as its closing brace has been seen, so a response never has to be
//! held in memory as a whole.

use crate::error::{Error, Result};

/// Splits `[ {..}, {..}, ... ]` into its element byte slices
#[derive(Debug, Default)]
pub(crate) struct ArraySplitter {
    element: Vec<u8>,
    depth: usize,
    opened: bool,
    closed: bool,
    in_string: bool,
    escaped: bool,
}

impl ArraySplitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every element it completes
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut complete = Vec::new();

        for &byte in chunk {
            if self.depth > 0 {
                self.element.push(byte);
                if self.in_string {
                    if self.escaped {
                        self.escaped = false;
                    } else if byte == b'\\' {
                        self.escaped = true;
                    } else if byte == b'"' {
                        self.in_string = false;
                    }
                    continue;
                }
                match byte {
                    b'"' => self.in_string = true,
                    b'{' | b'[' => self.depth += 1,
                    b'}' | b']' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            complete.push(std::mem::take(&mut self.element));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            if byte.is_ascii_whitespace() {
                continue;
            }
            match (self.opened, self.closed, byte) {
                (false, _, b'[') => self.opened = true,
                (true, false, b',') => {}
                (true, false, b']') => self.closed = true,
                (true, false, b'{' | b'[') => {
                    self.depth = 1;
                    self.element.push(byte);
                }
                _ => {
                    return Err(Error::decode(format!(
                        "unexpected byte '{}' in query response",
                        char::from(byte)
                    )))
                }
            }
        }

        Ok(complete)
    }

    /// Check that the array was closed
    pub(crate) fn finish(&self) -> Result<()> {
        if self.closed {
            Ok(())
        } else {
            Err(Error::decode("query response ended before the array was closed"))
        }
    }
}

//! Flattening of structured log arguments into one display string.
//!
//! Arguments are rendered as `" name=value"` fragments into a fixed 4096
//! byte buffer. Every write is clamped to the remaining capacity minus one
//! terminator byte, so the rendered text never exceeds 4095 bytes no matter
//! how large the input fields are. Truncated fragments are cut, not dropped.

use std::borrow::Cow;
use std::fmt::{self, Write};

pub const ARG_BUFFER_SIZE: usize = 4096;

/// Value of a single log argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArgValue<'a> {
    String(&'a str),
    Int(i64),
    Float(f32),
}

pub struct ArgFormatter {
    buf: [u8; ARG_BUFFER_SIZE],
    len: usize,
}

impl ArgFormatter {
    pub fn new() -> Self {
        Self {
            buf: [0; ARG_BUFFER_SIZE],
            len: 0,
        }
    }

    fn remaining(&self) -> usize {
        ARG_BUFFER_SIZE - self.len
    }

    /// Append as much of `bytes` as fits, always leaving room for the
    /// terminator. Returns the number of bytes written.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining().saturating_sub(1));
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        debug_assert!(self.len < ARG_BUFFER_SIZE);
        n
    }

    /// Append `" name=value"`. A missing value renders as `" name="`.
    pub fn push_arg(&mut self, name: &str, value: Option<ArgValue<'_>>) {
        self.append(b" ");
        self.append(name.as_bytes());
        self.append(b"=");
        match value {
            Some(ArgValue::String(s)) => {
                self.append(b"\"");
                self.append(s.as_bytes());
                self.append(b"\"");
            }
            Some(ArgValue::Int(v)) => {
                let _ = write!(self, "{v}");
            }
            Some(ArgValue::Float(v)) => {
                let v = f64::from(v);
                if v.is_nan() {
                    self.append(b"nan");
                } else if v.is_infinite() {
                    self.append(if v > 0.0 { b"inf" } else { b"-inf" });
                } else {
                    let _ = write!(self, "{v:.6}");
                }
            }
            None => {}
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The rendered arguments without the leading separator space, or `None`
    /// if nothing was written. Bytes split by truncation are replaced lossily.
    pub fn message(&self) -> Option<Cow<'_, str>> {
        if self.len == 0 {
            return None;
        }
        Some(String::from_utf8_lossy(&self.buf[1..self.len]))
    }
}

impl Default for ArgFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ArgFormatter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // Truncation is not an error.
        self.append(s.as_bytes());
        Ok(())
    }
}

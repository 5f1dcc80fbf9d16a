//! Streaming Latin-1 to UTF-8 transcoding reader.

use std::io::{self, Read};

const RAW_STAGE_LEN: usize = 8 * 1024;

/// `Read` adapter converting Latin-1 (ISO-8859-1) bytes from an inner reader
/// into UTF-8 on the fly.
///
/// The legacy GeoLite tables are Latin-1 encoded; reading them through this
/// adapter lets the CSV layer and everything above it deal in valid UTF-8.
/// Bytes below 0x80 pass through unchanged; every other byte expands to the
/// two-byte UTF-8 sequence for the same code point.
///
/// Raw input is staged in an internal buffer and transcoded from there, so
/// bytes read from the inner reader but not yet emitted are replayed on the
/// next call and the inner reader needs no `Seek`. When a two-byte expansion
/// straddles the end of the destination, the trailing byte is held over and
/// written first on the next call; end of input is reported only after that
/// byte is out. Destination buffers of any nonzero size work, including
/// size 1.
pub struct Latin1Reader<R> {
    inner: R,
    stage: Box<[u8]>,
    pos: usize,
    cap: usize,
    pending: Option<u8>,
}

impl<R: Read> Latin1Reader<R> {
    /// Wrap `inner`, transcoding everything read through it.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            stage: vec![0; RAW_STAGE_LEN].into_boxed_slice(),
            pos: 0,
            cap: 0,
            pending: None,
        }
    }

    /// Unwrap, discarding staged raw input and any held-over output byte.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Latin1Reader<R> {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize> {
        if dest.is_empty() {
            return Ok(0);
        }

        let mut written = 0;

        // Second half of an expansion cut off by the previous call.
        if let Some(b) = self.pending.take() {
            dest[0] = b;
            written = 1;
        }

        // Refill the stage once it is drained, at most one inner read per
        // call. If the read fails after the held-over byte already went
        // out, report the partial success now; a persistent error shows up
        // again on the next call.
        if written < dest.len() && self.pos == self.cap {
            match self.inner.read(&mut self.stage) {
                Ok(n) => {
                    self.pos = 0;
                    self.cap = n;
                }
                Err(e) => {
                    if written > 0 {
                        return Ok(written);
                    }
                    return Err(e);
                }
            }
        }

        while written < dest.len() && self.pos < self.cap {
            let b = self.stage[self.pos];
            self.pos += 1;
            if b < 0x80 {
                dest[written] = b;
                written += 1;
            } else {
                dest[written] = 0xC0 | (b & 0xC0) >> 6;
                written += 1;
                let tail = 0x80 | (b & 0x3F);
                if written < dest.len() {
                    dest[written] = tail;
                    written += 1;
                } else {
                    self.pending = Some(tail);
                }
            }
        }

        Ok(written)
    }
}

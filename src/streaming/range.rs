//! HTTP `Range` header parsing.
//!
//! Only a single contiguous range in byte units is honored. Anything that
//! does not match `bytes=<digits>?-<digits>?` exactly is treated as if no
//! header had been sent, so the client gets the full file instead of an
//! error.

/// A parsed `Range` header value.
///
/// - both bounds absent: the whole file
/// - only `last`: a suffix of `last` bytes (`bytes=-N`)
/// - only `first`: from `first` to the end (`bytes=N-`)
/// - both: the closed interval `[first, last]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteRange {
    pub first: Option<u64>,
    pub last: Option<u64>,
}

/// The requested range cannot be served for a file of `size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeNotSatisfiable {
    pub size: u64,
}

impl ByteRange {
    /// Parse a raw header value.
    ///
    /// Returns `None` for anything outside the supported grammar, including
    /// other units, multiple ranges, whitespace and numbers that overflow.
    pub fn parse(header: &str) -> Option<Self> {
        let ranges = header.strip_prefix("bytes=")?;
        let (first, last) = ranges.split_once('-')?;

        Some(Self {
            first: parse_bound(first)?,
            last: parse_bound(last)?,
        })
    }

    /// Whether this range covers the whole file without any bounds.
    pub fn is_full(&self) -> bool {
        self.first.is_none() && self.last.is_none()
    }

    /// Resolve open-ended and suffix forms against `size` and validate the
    /// result. Out-of-bounds values are rejected, never clamped.
    pub fn resolve(&self, size: u64) -> Result<(u64, u64), RangeNotSatisfiable> {
        let unsatisfiable = RangeNotSatisfiable { size };
        let last_pos = size.checked_sub(1).ok_or(unsatisfiable)?;

        let (first, last) = match (self.first, self.last) {
            (None, None) => (0, last_pos),
            // bytes=-N (last N bytes)
            (None, Some(suffix)) => (size.checked_sub(suffix).ok_or(unsatisfiable)?, last_pos),
            // bytes=N- (from N to end)
            (Some(first), None) => (first, last_pos),
            (Some(first), Some(last)) => (first, last),
        };

        if first > last_pos || last > last_pos || first > last {
            return Err(unsatisfiable);
        }

        Ok((first, last))
    }
}

/// Parse one side of the `-`: empty means absent, otherwise ASCII digits only.
fn parse_bound(s: &str) -> Option<Option<u64>> {
    if s.is_empty() {
        return Some(None);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().map(Some)
}

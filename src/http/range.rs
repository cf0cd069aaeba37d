//! Byte range requests for stored uploads (RFC 7233, single range only)
//!
//! Media players seek in uploaded audio and video with `Range: bytes=...`.

/// Inclusive byte span inside a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    /// Number of bytes in the span (test validation only)
    #[cfg(test)]
    pub const fn content_length(self) -> usize {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a file of `total` bytes
    pub fn content_range(self, total: usize) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// How a request's `Range` header applies to a file
#[derive(Debug, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the whole file (no header, other unit, multi-range, malformed)
    Full,
    /// 206 with this span
    Partial(ByteRange),
    /// 416
    NotSatisfiable,
}

/// Resolve a `Range` header against a file of `file_size` bytes
pub fn resolve_range(range_header: Option<&str>, file_size: usize) -> RangeOutcome {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        suffix_range(last, file_size)
    } else {
        bounded_range(first, last, file_size)
    }
}

/// `bytes=-N`: the last N bytes
fn suffix_range(suffix: &str, file_size: usize) -> RangeOutcome {
    let Ok(suffix) = suffix.parse::<usize>() else {
        return RangeOutcome::Full;
    };
    if suffix == 0 || file_size == 0 {
        return RangeOutcome::NotSatisfiable;
    }
    RangeOutcome::Partial(ByteRange {
        start: file_size.saturating_sub(suffix),
        end: file_size - 1,
    })
}

/// `bytes=A-B` or `bytes=A-`; B is clamped to the last byte
fn bounded_range(first: &str, last: &str, file_size: usize) -> RangeOutcome {
    let Ok(start) = first.parse::<usize>() else {
        return RangeOutcome::Full;
    };
    if start >= file_size {
        return RangeOutcome::NotSatisfiable;
    }

    let end = if last.is_empty() {
        file_size - 1
    } else {
        match last.parse::<usize>() {
            Ok(end) => end.min(file_size - 1),
            Err(_) => return RangeOutcome::Full,
        }
    };

    if start > end {
        return RangeOutcome::NotSatisfiable;
    }
    RangeOutcome::Partial(ByteRange { start, end })
}

//! Hub buffer diffing
//!
//! The hub exposes recent modem traffic as a fixed-size hex ring buffer
//! followed by a two-digit write cursor:
//!
//! ```text
//! <response><BS>0262AABBCC0F11FF06000000000000000A</BS></response>
//!               |------------- data -------------||idx|
//! ```
//!
//! The cursor counts hex characters. Each poll extracts what was written
//! between the previous cursor (the baseline) and the current one.

use crate::error::{PortError, Result};

const START_TAG: &str = "<BS>";
const END_TAG: &str = "</BS>";

/// Parsed content of `/buffstatus.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferStatus {
    /// Ring buffer contents (hex digits)
    pub data: String,
    /// Write cursor, in hex characters
    pub cursor: usize,
}

/// Extract the ring buffer and cursor from a status body
pub fn parse_buffer_status(body: &str) -> Result<BufferStatus> {
    let malformed = || PortError::HubCursor {
        raw: body.chars().take(64).collect(),
    };

    let start = body.find(START_TAG).ok_or_else(malformed)? + START_TAG.len();
    let end = body[start..].find(END_TAG).ok_or_else(malformed)? + start;
    let content = body[start..end].trim();

    if content.len() < 2 || !content.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }

    let (data, idx) = content.split_at(content.len() - 2);
    let cursor = usize::from_str_radix(idx, 16).map_err(|_| malformed())?;

    Ok(BufferStatus {
        data: data.to_string(),
        cursor,
    })
}

fn is_cleared(hex: &str) -> bool {
    hex.bytes().all(|b| b == b'0')
}

/// Tracks the last-seen cursor of the hub ring buffer
#[derive(Debug, Default)]
pub struct HubPoller {
    baseline: Option<usize>,
}

impl HubPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the baseline; the next status only records a new one
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    pub fn baseline(&self) -> Option<usize> {
        self.baseline
    }

    /// Advance to `status` and return the newly arrived hex digits
    pub fn update(&mut self, status: &BufferStatus) -> String {
        let data = status.data.as_str();

        // First status after open or reset: everything before it is history
        let Some(baseline) = self.baseline else {
            self.baseline = Some(status.cursor);
            return String::new();
        };

        // The hub zeroes its buffer on some resets, zeros are never payload
        if is_cleared(data) {
            self.baseline = Some(0);
            return String::new();
        }

        let base = baseline.min(data.len());
        let idx = status.cursor.min(data.len());

        let mut fresh = String::new();
        if idx >= base {
            fresh.push_str(&data[base..idx]);
        } else {
            // Cursor wrapped around the ring
            let tail = &data[base..];
            if !is_cleared(tail) {
                fresh.push_str(tail);
            }
            fresh.push_str(&data[..idx]);
        }

        self.baseline = Some(status.cursor);
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(data: &str, cursor: usize) -> BufferStatus {
        BufferStatus {
            data: data.to_string(),
            cursor,
        }
    }

    #[test]
    fn test_parse_status_body() {
        let body = "<response><BS>0262AABB00000000000A</BS></response>";
        let parsed = parse_buffer_status(body).unwrap();
        assert_eq!(parsed.data, "0262AABB00000000");
        assert_eq!(parsed.cursor, 0x0A);
    }

    #[test]
    fn test_parse_rejects_missing_tags() {
        assert!(matches!(
            parse_buffer_status("<response></response>"),
            Err(PortError::HubCursor { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_cursor() {
        assert!(parse_buffer_status("<BS>0262ZZ</BS>").is_err());
        assert!(parse_buffer_status("<BS>0</BS>").is_err());
    }

    #[test]
    fn test_first_poll_only_records_baseline() {
        let mut poller = HubPoller::new();
        let fresh = poller.update(&status("0262AABB00000000", 8));
        assert!(fresh.is_empty());
        assert_eq!(poller.baseline(), Some(8));
    }

    #[test]
    fn test_forward_extraction() {
        let mut poller = HubPoller::new();
        poller.update(&status("0262AABB00000000", 4));
        let fresh = poller.update(&status("0262AABB06000000", 10));
        assert_eq!(fresh, "AABB06");
        assert_eq!(poller.baseline(), Some(10));
    }

    #[test]
    fn test_same_cursor_extracts_nothing() {
        let mut poller = HubPoller::new();
        poller.update(&status("0262AABB00000000", 6));
        let fresh = poller.update(&status("0262AABB00000000", 6));
        assert!(fresh.is_empty());
        assert_eq!(poller.baseline(), Some(6));
    }

    #[test]
    fn test_wraparound_discards_zero_tail() {
        let mut poller = HubPoller::new();
        poller.update(&status("AAAAAAAAAA000000", 10));
        assert_eq!(poller.baseline(), Some(10));

        let data = "0250AAAAAA000000";
        let fresh = poller.update(&status(data, 4));
        assert_eq!(fresh, &data[0..4]);
        assert_eq!(poller.baseline(), Some(4));
    }

    #[test]
    fn test_wraparound_keeps_real_tail() {
        let mut poller = HubPoller::new();
        poller.update(&status("0000000000000000", 0));
        poller.baseline = Some(12);

        let fresh = poller.update(&status("6202AAAAAAAA0250", 2));
        assert_eq!(fresh, "025062");
    }

    #[test]
    fn test_cleared_buffer_resets_baseline() {
        let mut poller = HubPoller::new();
        poller.update(&status("0262AABB06000000", 10));

        let fresh = poller.update(&status("0000000000000000", 10));
        assert!(fresh.is_empty());
        assert_eq!(poller.baseline(), Some(0));

    }

    #[test]
    fn test_first_poll_on_cleared_buffer_keeps_cursor() {
        let mut poller = HubPoller::new();
        assert!(poller.update(&status("0000000000000000", 6)).is_empty());
        assert_eq!(poller.baseline(), Some(6));

        // Nothing new was written past the recorded cursor
        let fresh = poller.update(&status("0262AA0000000000", 6));
        assert!(fresh.is_empty());
        assert_eq!(poller.baseline(), Some(6));
    }

    #[test]
    fn test_reset_forgets_baseline() {
        let mut poller = HubPoller::new();
        poller.update(&status("0262AABB06000000", 10));
        poller.reset();
        assert_eq!(poller.baseline(), None);
        assert!(poller.update(&status("0262AABB06000000", 12)).is_empty());
    }

    #[test]
    fn test_cursor_beyond_data_is_clamped() {
        let mut poller = HubPoller::new();
        poller.update(&status("0262AABB", 4));
        let fresh = poller.update(&status("0262AABB", 0xFE));
        assert_eq!(fresh, "AABB");
    }
}

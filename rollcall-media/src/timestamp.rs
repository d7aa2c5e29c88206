//! Wall-clock labels for sampled frames
//!
//! Labels are rendered in Indian Standard Time with the layout the attendance
//! service parses (`%d/%m/%Y, %I:%M:%S %p`).

use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::time::Duration;

/// Label layout understood by the attendance service
pub const LABEL_FORMAT: &str = "%d/%m/%Y, %I:%M:%S %p";

/// File stem layout used when frames are written to disk
pub const STEM_FORMAT: &str = "%Y-%m-%d_%Hh%Mm%Ss";

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Indian Standard Time, UTC+05:30
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Media offset of sample `index` when `total` is split into `count` slots.
///
/// Computed as `total * index / count` in whole nanoseconds so that equal
/// inputs always give equal seek points.
pub fn offset_for(index: usize, count: usize, total: Duration) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() * index as u128 / count as u128;
    Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
}

/// Wall-clock instant of a frame, in IST
pub fn frame_instant(start: DateTime<Utc>, offset: Duration) -> DateTime<FixedOffset> {
    let offset = chrono::Duration::from_std(offset).unwrap_or_else(|_| chrono::Duration::zero());
    (start + offset).with_timezone(&ist())
}

/// Label for a frame taken `offset` after `start`
pub fn frame_label(start: DateTime<Utc>, offset: Duration) -> String {
    format_label(&frame_instant(start, offset))
}

/// Render an instant with [`LABEL_FORMAT`]
pub fn format_label(at: &DateTime<FixedOffset>) -> String {
    at.format(LABEL_FORMAT).to_string()
}

/// Names frame files after their wall-clock second.
///
/// Several frames can fall inside the same second, so every stem carries a
/// two digit counter that increments while consecutive instants share a
/// second and resets to `00` otherwise.
#[derive(Debug, Default)]
pub struct FileStemNamer {
    last: Option<String>,
    repeat: u32,
}

impl FileStemNamer {
    /// New namer with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Stem and counter-suffixed label for the next frame
    pub fn next(&mut self, at: &DateTime<FixedOffset>, label: &str) -> (String, String) {
        let base = at.format(STEM_FORMAT).to_string();
        if self.last.as_deref() == Some(base.as_str()) {
            self.repeat += 1;
        } else {
            self.last = Some(base.clone());
            self.repeat = 0;
        }

        (
            format!("{}_{:02}", base, self.repeat),
            format!("{}, {}", label, self.repeat),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        // 24/11/2024 01:07:16 IST
        Utc.with_ymd_and_hms(2024, 11, 23, 19, 37, 16).unwrap()
    }

    #[test]
    fn test_label_in_ist() {
        assert_eq!(frame_label(start(), Duration::ZERO), "24/11/2024, 01:07:16 AM");
        assert_eq!(
            frame_label(start(), Duration::from_secs(12 * 3600)),
            "24/11/2024, 01:07:16 PM"
        );
    }

    #[test]
    fn test_offsets_are_even() {
        let total = Duration::from_secs(10);
        assert_eq!(offset_for(0, 20, total), Duration::ZERO);
        assert_eq!(offset_for(1, 20, total), Duration::from_millis(500));
        assert_eq!(offset_for(19, 20, total), Duration::from_millis(9500));
        assert_eq!(offset_for(3, 0, total), Duration::ZERO);
    }

    #[test]
    fn test_stem_counter() {
        let mut namer = FileStemNamer::new();
        let at = frame_instant(start(), Duration::ZERO);
        let label = format_label(&at);

        let (stem, modified) = namer.next(&at, &label);
        assert_eq!(stem, "2024-11-24_01h07m16s_00");
        assert_eq!(modified, "24/11/2024, 01:07:16 AM, 0");

        let (stem, _) = namer.next(&at, &label);
        assert_eq!(stem, "2024-11-24_01h07m16s_01");

        let later = frame_instant(start(), Duration::from_secs(1));
        let (stem, modified) = namer.next(&later, &format_label(&later));
        assert_eq!(stem, "2024-11-24_01h07m17s_00");
        assert!(modified.ends_with(", 0"));
    }
}

use serde::{Deserialize, Serialize};

/// A half-open time range within a single day, in minutes from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

/// Find the earliest gap of at least `duration` minutes inside `window`.
///
/// `busy` must be sorted by start and pairwise non-overlapping; the caller
/// loads intervals ordered from the store, so this is not re-checked here.
/// Returns the earliest fit, not the best fit.
pub fn find_slot(busy: &[Interval], window: Interval, duration: i64) -> Option<Interval> {
    let mut cursor = window.start;

    for slot in busy {
        if slot.start - cursor >= duration {
            return Some(Interval::new(cursor, cursor + duration));
        }
        cursor = cursor.max(slot.end);
    }

    if window.end - cursor >= duration {
        return Some(Interval::new(cursor, cursor + duration));
    }

    None
}

/// Convert minutes from midnight to an "HH:MM" string (e.g. 570 -> "09:30").
pub fn minutes_to_hhmm(minutes: i64) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parse an "HH:MM" string into minutes from midnight.
pub fn hhmm_to_minutes(value: &str) -> Option<i64> {
    let (hours, minutes) = value.split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_day_uses_window_start() {
        let window = Interval::new(540, 1080);
        let slot = find_slot(&[], window, 90).unwrap();
        assert_eq!(slot, Interval::new(540, 630));
    }

    #[test]
    fn gap_between_busy_intervals() {
        let window = Interval::new(540, 1080);
        let busy = [Interval::new(540, 600), Interval::new(720, 780)];
        let slot = find_slot(&busy, window, 60).unwrap();
        assert_eq!(slot, Interval::new(600, 660));
    }

    #[test]
    fn no_gap_wide_enough() {
        let window = Interval::new(540, 660);
        let busy = [Interval::new(540, 600), Interval::new(630, 660)];
        assert_eq!(find_slot(&busy, window, 45), None);
    }

    #[test]
    fn hhmm_round_trip() {
        assert_eq!(minutes_to_hhmm(570), "09:30");
        assert_eq!(hhmm_to_minutes("09:30"), Some(570));
        assert_eq!(hhmm_to_minutes("24:00"), None);
        assert_eq!(hhmm_to_minutes("oops"), None);
    }
}

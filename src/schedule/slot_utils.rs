use std::collections::HashMap;
use std::fmt;

use chrono::Weekday;

/// Parses a time string (HH:MM) to minutes since midnight
pub fn parse_time_to_minutes(time_str: &str) -> Option<u32> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hours: u32 = parts[0].trim().parse().ok()?;
    let minutes: u32 = parts[1].trim().parse().ok()?;
    // 24:00 is accepted as an end-of-day marker
    if hours > 24 || minutes >= 60 || (hours == 24 && minutes != 0) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight to time string (HH:MM)
pub fn minutes_to_time_string(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    format!("{:02}:{:02}", hours, mins)
}

/// A half-open time interval `[start, end)` within one day, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeInterval {
    pub start: u32,
    pub end: u32,
}

impl TimeInterval {
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Parses "HH:MM-HH:MM". Returns None for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = raw.trim().replace(['–', '—'], "-");
        let (start, end) = cleaned.split_once('-')?;
        Self::new(parse_time_to_minutes(start)?, parse_time_to_minutes(end)?)
    }

    /// True if the two intervals share at least one minute. Touching ends do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }

    /// The hour-long interval that ends where this one starts.
    pub fn preceding_hour(&self) -> Option<TimeInterval> {
        let start = self.start.checked_sub(60)?;
        Self::new(start, self.start)
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            minutes_to_time_string(self.start),
            minutes_to_time_string(self.end)
        )
    }
}

/// Weekdays in calendar order, used when the configuration lists none.
pub const WORKING_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

pub const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Parses a weekday from a Dutch or English name.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    let lower = raw.trim().to_lowercase();
    let dutch = match lower.as_str() {
        "maandag" | "ma" => Some(Weekday::Mon),
        "dinsdag" | "di" => Some(Weekday::Tue),
        "woensdag" | "wo" => Some(Weekday::Wed),
        "donderdag" | "do" => Some(Weekday::Thu),
        "vrijdag" | "vr" => Some(Weekday::Fri),
        "zaterdag" | "za" => Some(Weekday::Sat),
        "zondag" | "zo" => Some(Weekday::Sun),
        _ => None,
    };
    dutch.or_else(|| lower.parse::<Weekday>().ok())
}

/// English display name of a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Dutch column header for a weekday, as used by the registration sheets.
pub fn weekday_dutch_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Maandag",
        Weekday::Tue => "Dinsdag",
        Weekday::Wed => "Woensdag",
        Weekday::Thu => "Donderdag",
        Weekday::Fri => "Vrijdag",
        Weekday::Sat => "Zaterdag",
        Weekday::Sun => "Zondag",
    }
}

/// Parses a raw availability cell into sorted, disjoint intervals.
///
/// "Niet beschikbaar", "not available" and empty cells yield no intervals.
/// Malformed fragments are dropped; overlapping or touching intervals merge.
pub fn parse_availability(raw: &str) -> Vec<TimeInterval> {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() || lower == "niet beschikbaar" || lower == "not available" {
        return Vec::new();
    }

    let mut intervals: Vec<TimeInterval> = raw
        .split(',')
        .filter_map(TimeInterval::parse)
        .collect();
    intervals.sort();

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// A player's weekly availability: weekday -> disjoint time intervals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyAvailability {
    days: HashMap<Weekday, Vec<TimeInterval>>,
}

impl WeeklyAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_day(&mut self, day: Weekday, intervals: Vec<TimeInterval>) {
        if intervals.is_empty() {
            self.days.remove(&day);
        } else {
            self.days.insert(day, intervals);
        }
    }

    pub fn with_day(mut self, day: Weekday, raw: &str) -> Self {
        self.set_day(day, parse_availability(raw));
        self
    }

    pub fn intervals(&self, day: Weekday) -> &[TimeInterval] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if any interval on `day` overlaps `slot`.
    pub fn overlaps(&self, day: Weekday, slot: &TimeInterval) -> bool {
        self.intervals(day).iter().any(|i| i.overlaps(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_to_minutes() {
        assert_eq!(parse_time_to_minutes("18:30"), Some(18 * 60 + 30));
        assert_eq!(parse_time_to_minutes(" 9:05 "), Some(9 * 60 + 5));
        assert_eq!(parse_time_to_minutes("24:00"), Some(24 * 60));
        assert_eq!(parse_time_to_minutes("24:30"), None);
        assert_eq!(parse_time_to_minutes("18.30"), None);
        assert_eq!(parse_time_to_minutes("18:75"), None);
    }

    #[test]
    fn test_interval_parse_and_display() {
        let interval = TimeInterval::parse("18:00 - 19:30").unwrap();
        assert_eq!(interval.start, 18 * 60);
        assert_eq!(interval.end, 19 * 60 + 30);
        assert_eq!(interval.to_string(), "18:00-19:30");
        assert!(TimeInterval::parse("19:00-18:00").is_none());
        assert!(TimeInterval::parse("garbage").is_none());
    }

    #[test]
    fn test_interval_overlap() {
        let a = TimeInterval::parse("18:00-19:00").unwrap();
        let b = TimeInterval::parse("18:30-20:00").unwrap();
        let c = TimeInterval::parse("19:00-20:00").unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c), "touching intervals do not overlap");
    }

    #[test]
    fn test_preceding_hour() {
        let slot = TimeInterval::parse("19:00-20:00").unwrap();
        assert_eq!(slot.preceding_hour(), TimeInterval::parse("18:00-19:00"));
        let early = TimeInterval::parse("00:30-01:30").unwrap();
        assert_eq!(early.preceding_hour(), None);
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("Maandag"), Some(Weekday::Mon));
        assert_eq!(parse_weekday(" vrijdag"), Some(Weekday::Fri));
        assert_eq!(parse_weekday("Wednesday"), Some(Weekday::Wed));
        assert_eq!(parse_weekday("sun"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("someday"), None);
    }

    #[test]
    fn test_parse_availability_merges() {
        let intervals = parse_availability("19:00-20:00, 18:00-19:00, bogus, 21:00-22:00");
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].to_string(), "18:00-20:00");
        assert_eq!(intervals[1].to_string(), "21:00-22:00");
    }

    #[test]
    fn test_parse_availability_unavailable() {
        assert!(parse_availability("Niet beschikbaar").is_empty());
        assert!(parse_availability("").is_empty());
        assert!(parse_availability("whenever").is_empty());
    }

    #[test]
    fn test_weekly_availability() {
        let availability = WeeklyAvailability::new()
            .with_day(Weekday::Mon, "18:00-20:00")
            .with_day(Weekday::Tue, "Niet beschikbaar");
        let slot = TimeInterval::parse("19:00-20:00").unwrap();
        assert!(availability.overlaps(Weekday::Mon, &slot));
        assert!(!availability.overlaps(Weekday::Tue, &slot));
        assert!(availability.intervals(Weekday::Tue).is_empty());
    }
}

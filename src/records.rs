use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, collections::BTreeMap, fmt, str::FromStr};

use super::error::TimingPlanError;

static CLOCK_MINUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}$").unwrap());
static NUMERIC_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{2}$").unwrap());
static TYPE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{2}$").unwrap());

/// True for tokens shaped like a schedule time column, e.g. "08:00".
pub fn is_clock_minute(token: &str) -> bool {
    CLOCK_MINUTE.is_match(token)
}

/// True for exactly two decimal digits, e.g. "01".
pub fn is_numeric_code(token: &str) -> bool {
    NUMERIC_CODE.is_match(token)
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Day {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// Weekday number as printed in timing plans: 1 = Monday ... 7 = Sunday.
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Day::Monday,
            chrono::Weekday::Tue => Day::Tuesday,
            chrono::Weekday::Wed => Day::Wednesday,
            chrono::Weekday::Thu => Day::Thursday,
            chrono::Weekday::Fri => Day::Friday,
            chrono::Weekday::Sat => Day::Saturday,
            chrono::Weekday::Sun => Day::Sunday,
        }
    }
}

impl From<Day> for u8 {
    fn from(day: Day) -> Self {
        day.number()
    }
}

impl TryFrom<u8> for Day {
    type Error = TimingPlanError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1..=7 => Ok(Day::ALL[usize::from(n - 1)]),
            _ => Err(TimingPlanError::InvalidWeekday(n)),
        }
    }
}

impl FromStr for Day {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" | "1" => Ok(Day::Monday),
            "tuesday" | "2" => Ok(Day::Tuesday),
            "wednesday" | "3" => Ok(Day::Wednesday),
            "thursday" | "4" => Ok(Day::Thursday),
            "friday" | "5" => Ok(Day::Friday),
            "saturday" | "6" => Ok(Day::Saturday),
            "sunday" | "7" => Ok(Day::Sunday),
            _ => Err(()),
        }
    }
}

/// Two-character timing program identifier, always uppercase.
/// For example "01", "36" or "A3".
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeCode(String);

impl TypeCode {
    /// Accepts two ASCII letters or digits in any case.
    pub fn parse(token: &str) -> Option<Self> {
        TYPE_CODE
            .is_match(token)
            .then(|| TypeCode(token.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TypeCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value for time past midnight in seconds.
/// For example 8am is 28800 seconds past midnight.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct SecondsPastMidnight(pub u32);

pub trait TimeConversion: Sized {
    fn from_24hr_str(s: &str) -> Option<Self>;
}

impl TimeConversion for SecondsPastMidnight {
    /// Reads "HH:MM" or "HH:MM:SS". Fields are digits only, ranges are not checked.
    fn from_24hr_str(s: &str) -> Option<Self> {
        let mut fields = s.split(':');
        let hours = parse_digits(fields.next()?)?;
        let minutes = parse_digits(fields.next()?)?;
        let seconds = match fields.next() {
            Some(field) => parse_digits(field)?,
            None => 0,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(SecondsPastMidnight(hours * 3600 + minutes * 60 + seconds))
    }
}

fn parse_digits(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Wall-clock query time, at second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
    second: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        (hour < 24 && minute < 60 && second < 60).then_some(ClockTime {
            hour,
            minute,
            second,
        })
    }

    pub fn from_chrono(time: chrono::NaiveTime) -> Self {
        use chrono::Timelike;
        // NaiveTime keeps leap seconds in the nanosecond field, so second() is always < 60.
        ClockTime {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
        }
    }

    pub fn seconds_past_midnight(&self) -> SecondsPastMidnight {
        SecondsPastMidnight(
            u32::from(self.hour) * 3600 + u32::from(self.minute) * 60 + u32::from(self.second),
        )
    }
}

impl FromStr for ClockTime {
    type Err = TimingPlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimingPlanError::invalid_clock_time(s);
        let fields: Vec<&str> = s.trim().split(':').collect();
        if !(2..=3).contains(&fields.len()) || fields.iter().any(|f| f.len() != 2) {
            return Err(invalid());
        }
        let mut numbers = [0u8; 3];
        for (slot, field) in numbers.iter_mut().zip(&fields) {
            *slot = parse_digits(field).ok_or_else(invalid)? as u8;
        }
        ClockTime::new(numbers[0], numbers[1], numbers[2]).ok_or_else(invalid)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Starting at `time`, the day's active timing program switches to `timing_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub time: String,
    pub timing_type: TypeCode,
}

impl ScheduleEntry {
    pub fn starts_at(&self) -> SecondsPastMidnight {
        SecondsPastMidnight::from_24hr_str(&self.time).unwrap_or(SecondsPastMidnight(0))
    }
}

/// Schedule entries per weekday, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule(BTreeMap<Day, Vec<ScheduleEntry>>);

impl Default for WeeklySchedule {
    fn default() -> Self {
        WeeklySchedule(Day::ALL.iter().map(|day| (*day, Vec::new())).collect())
    }
}

impl WeeklySchedule {
    pub fn for_day(&self, day: Day) -> &[ScheduleEntry] {
        self.0.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Day, &[ScheduleEntry])> {
        self.0.iter().map(|(day, entries)| (*day, entries.as_slice()))
    }

    pub fn entry_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub(crate) fn push(&mut self, day: Day, entry: ScheduleEntry) {
        self.0.entry(day).or_default().push(entry);
    }
}

/// One signal-phase program: cycle length, offset and ordered phase durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingDefinition {
    pub period: u32,
    pub offset: i64,
    pub direction: i64,
    pub phase_type: String,
    pub phase_durations: Vec<u32>,
}

impl TimingDefinition {
    /// Period usable as a modulus; a zero period behaves as one second.
    pub fn cycle_length(&self) -> i64 {
        i64::from(self.period.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimingDefinitionTable(BTreeMap<TypeCode, TimingDefinition>);

impl TimingDefinitionTable {
    pub fn get(&self, type_code: &str) -> Option<&TimingDefinition> {
        self.0.get(type_code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeCode, &TimingDefinition)> {
        self.0.iter()
    }

    pub(crate) fn insert(
        &mut self,
        type_code: TypeCode,
        definition: TimingDefinition,
    ) -> Option<TimingDefinition> {
        self.0.insert(type_code, definition)
    }
}

/// Active phase at a point in time. `phase_index` is zero-based, -1 when indeterminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDescriptor {
    pub phase_type: String,
    pub phase_index: i32,
    pub remaining_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_code: Option<TypeCode>,
}

impl PhaseDescriptor {
    pub fn indeterminate() -> Self {
        PhaseDescriptor {
            phase_type: String::new(),
            phase_index: -1,
            remaining_seconds: 0,
            type_code: None,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.phase_index < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("08:00", true)]
    #[case("23:59", true)]
    #[case("8:00", false)]
    #[case("08:00:00", false)]
    #[case("０８:００", false)]
    fn test_is_clock_minute(#[case] token: &str, #[case] expected: bool) {
        assert_eq!(is_clock_minute(token), expected);
    }

    #[test]
    fn test_type_code_uppercases_and_rejects_other_shapes() {
        assert_eq!(TypeCode::parse("a3").unwrap().as_str(), "A3");
        assert_eq!(TypeCode::parse("36").unwrap().as_str(), "36");
        assert!(TypeCode::parse("A").is_none());
        assert!(TypeCode::parse("A3B").is_none());
        assert!(TypeCode::parse("A-").is_none());
        assert!(TypeCode::parse("時制").is_none());
    }

    #[test]
    fn test_day_numbering() {
        assert_eq!(Day::try_from(1u8).unwrap(), Day::Monday);
        assert_eq!(Day::try_from(7u8).unwrap(), Day::Sunday);
        assert!(Day::try_from(0u8).is_err());
        assert!(Day::try_from(8u8).is_err());
        assert_eq!(Day::from_chrono(chrono::Weekday::Sun).number(), 7);
        assert_eq!("Saturday".parse::<Day>(), Ok(Day::Saturday));
        assert_eq!("3".parse::<Day>(), Ok(Day::Wednesday));
    }

    #[test]
    fn test_clock_time_parsing() {
        let time: ClockTime = "08:00:29".parse().unwrap();
        assert_eq!(time.seconds_past_midnight(), SecondsPastMidnight(28829));
        assert_eq!(time.to_string(), "08:00:29");

        let without_seconds: ClockTime = "17:30".parse().unwrap();
        assert_eq!(without_seconds.to_string(), "17:30:00");

        assert!("8:00:00".parse::<ClockTime>().is_err());
        assert!("24:00:00".parse::<ClockTime>().is_err());
        assert!("12:60:00".parse::<ClockTime>().is_err());
        assert!("12:00:00:00".parse::<ClockTime>().is_err());
        assert!("ab:cd".parse::<ClockTime>().is_err());
    }

    #[test]
    fn test_seconds_from_24hr_str() {
        assert_eq!(
            SecondsPastMidnight::from_24hr_str("08:00"),
            Some(SecondsPastMidnight(28800))
        );
        assert_eq!(
            SecondsPastMidnight::from_24hr_str("00:01:05"),
            Some(SecondsPastMidnight(65))
        );
        assert_eq!(SecondsPastMidnight::from_24hr_str("0800"), None);
    }

    #[test]
    fn test_weekly_schedule_serializes_with_numbered_days() {
        let mut schedule = WeeklySchedule::default();
        schedule.push(
            Day::Monday,
            ScheduleEntry {
                time: "08:00".to_string(),
                timing_type: TypeCode::parse("01").unwrap(),
            },
        );
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["1"][0]["timingType"], "01");
        assert_eq!(json["7"], serde_json::json!([]));

        let back: WeeklySchedule = serde_json::from_value(json).unwrap();
        assert_eq!(back, schedule);
    }

    #[test]
    fn test_zero_period_cycles_every_second() {
        let definition = TimingDefinition {
            period: 0,
            offset: 0,
            direction: 0,
            phase_type: String::new(),
            phase_durations: vec![],
        };
        assert_eq!(definition.cycle_length(), 1);
    }
}

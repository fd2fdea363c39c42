//! Extracts the weekly schedule and the timing-type definitions from the
//! token rows of a signal timing plan.
//!
//! Plans carry no schema. The only reliable anchor is a pair of consecutive
//! rows whose first cells are the time label ("時間") and the timing-type label
//! ("時制"). In such a pair the upper row starts with a run of `HH:MM` cells,
//! one per weekday, and continues with the definition columns:
//!
//! ```text
//! 時間 08:00 08:00 ... | 36 120 0 1 PhaseA 30 40 50
//! 時制 01    01    ...
//! ```
//!
//! The end of the time run is the boundary between the two tables. Rows
//! that do not fit are skipped, so a damaged document yields partial tables.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::config::{ParserConfig, ScheduleCodeRule};
use super::records::{
    Day, ScheduleEntry, TimingDefinition, TimingDefinitionTable, TypeCode, WeeklySchedule,
    is_clock_minute, is_numeric_code,
};
use super::rows::{Row, tokenize_pages};

/// Both tables read from one plan document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingTables {
    pub timing_map: TimingDefinitionTable,
    pub schedule_map: WeeklySchedule,
}

/// Tokenizes page text and parses it with the default labels.
pub fn parse_pages<S: AsRef<str> + Sync>(pages: &[S]) -> TimingTables {
    parse_timing_table(&tokenize_pages(pages))
}

pub fn parse_timing_table(rows: &[Row]) -> TimingTables {
    parse_timing_table_with(rows, &ParserConfig::default())
}

pub fn parse_timing_table_with(rows: &[Row], config: &ParserConfig) -> TimingTables {
    let mut tables = TimingTables::default();
    let mut blocks = 0;

    let mut i = 0;
    while i + 1 < rows.len() {
        let upper = &rows[i];
        let lower = &rows[i + 1];
        if cell(upper, 0) != config.time_label || cell(lower, 0) != config.type_label {
            i += 1;
            continue;
        }
        blocks += 1;

        let boundary = time_run_end(upper);
        push_schedule_cells(
            &mut tables.schedule_map,
            upper,
            lower,
            boundary,
            config.schedule_codes,
        );
        if let Some((type_code, definition)) = read_definition(upper, boundary) {
            trace!(%type_code, ?definition, "Read timing definition");
            if tables.timing_map.insert(type_code.clone(), definition).is_some() {
                debug!(%type_code, "Timing definition redefined, keeping the later one");
            }
        }

        // The lower row belongs to this block, never the start of the next one
        i += 2;
    }

    debug!(
        blocks,
        definitions = tables.timing_map.len(),
        schedule_entries = tables.schedule_map.entry_count(),
        "Parsed timing tables"
    );
    tables
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|token| token.trim()).unwrap_or("")
}

/// Index of the first cell after the leading run of `HH:MM` cells.
fn time_run_end(upper: &[String]) -> usize {
    let mut boundary = 1;
    while boundary < upper.len() && is_clock_minute(cell(upper, boundary)) {
        boundary += 1;
    }
    boundary
}

fn push_schedule_cells(
    schedule: &mut WeeklySchedule,
    upper: &[String],
    lower: &[String],
    boundary: usize,
    rule: ScheduleCodeRule,
) {
    if boundary > Day::ALL.len() + 1 {
        trace!(columns = boundary - 1, "More time columns than weekdays, extras ignored");
    }
    for (column, day) in (1..boundary).zip(Day::ALL) {
        let time = cell(upper, column);
        let timing_type = cell(lower, column);
        let type_code = match rule {
            ScheduleCodeRule::Numeric if is_numeric_code(timing_type) => TypeCode::parse(timing_type),
            ScheduleCodeRule::Numeric => None,
            ScheduleCodeRule::Alphanumeric => TypeCode::parse(timing_type),
        };
        match type_code {
            Some(timing_type) if is_clock_minute(time) => schedule.push(
                day,
                ScheduleEntry {
                    time: time.to_string(),
                    timing_type,
                },
            ),
            _ => trace!(day = day.number(), time, timing_type, "Skipped schedule cell"),
        }
    }
}

fn read_definition(upper: &[String], boundary: usize) -> Option<(TypeCode, TimingDefinition)> {
    let raw_type_code = cell(upper, boundary);
    let Some(type_code) = TypeCode::parse(raw_type_code) else {
        trace!(raw_type_code, "No timing definition after the schedule columns");
        return None;
    };

    let definition = TimingDefinition {
        period: leading_uint(cell(upper, boundary + 1)).unwrap_or(0),
        offset: leading_int(cell(upper, boundary + 2)).unwrap_or(0),
        direction: leading_int(cell(upper, boundary + 3)).unwrap_or(0),
        phase_type: cell(upper, boundary + 4).to_string(),
        phase_durations: upper
            .iter()
            .skip(boundary + 5)
            .filter_map(|token| leading_uint(token.trim()))
            .collect(),
    };
    Some((type_code, definition))
}

/// Reads the integer a cell starts with: "30" and "30s" are 30, "-5" is -5.
fn leading_int(token: &str) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

fn leading_uint(token: &str) -> Option<u32> {
    leading_int(token).and_then(|value| u32::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(cells: &str) -> Row {
        cells.split_whitespace().map(str::to_string).collect()
    }

    fn entry(time: &str, timing_type: &str) -> ScheduleEntry {
        ScheduleEntry {
            time: time.to_string(),
            timing_type: TypeCode::parse(timing_type).unwrap(),
        }
    }

    #[test]
    fn test_no_header_pair_gives_empty_tables() {
        let rows = vec![row("路口 名稱"), row("時間 08:00"), row("其他 01")];
        let tables = parse_timing_table(&rows);
        assert!(tables.timing_map.is_empty());
        for day in Day::ALL {
            assert!(tables.schedule_map.for_day(day).is_empty());
        }
        assert_eq!(tables.schedule_map.iter().count(), 7);
    }

    #[test]
    fn test_schedule_and_definition_from_one_block() {
        let rows = vec![
            row("時間 08:00 09:00 36 120 0 1 PhaseA 30 40 50"),
            row("時制 01 02"),
        ];
        let tables = parse_timing_table(&rows);

        assert_eq!(tables.schedule_map.for_day(Day::Monday), [entry("08:00", "01")]);
        assert_eq!(tables.schedule_map.for_day(Day::Tuesday), [entry("09:00", "02")]);
        assert!(tables.schedule_map.for_day(Day::Wednesday).is_empty());

        assert_eq!(
            tables.timing_map.get("36"),
            Some(&TimingDefinition {
                period: 120,
                offset: 0,
                direction: 1,
                phase_type: "PhaseA".to_string(),
                phase_durations: vec![30, 40, 50],
            })
        );
    }

    #[test]
    fn test_consecutive_blocks_build_each_day_in_document_order() {
        let rows = vec![
            row("時間 00:00 00:00 01 120 0 1 A 60 60"),
            row("時制 01 01"),
            row("時間 08:00 09:00 02 90 10 2 B 45 45"),
            row("時制 02 02"),
        ];
        let tables = parse_timing_table(&rows);

        assert_eq!(
            tables.schedule_map.for_day(Day::Monday),
            [entry("00:00", "01"), entry("08:00", "02")]
        );
        assert_eq!(
            tables.schedule_map.for_day(Day::Tuesday),
            [entry("00:00", "01"), entry("09:00", "02")]
        );
        assert_eq!(tables.timing_map.len(), 2);
        assert_eq!(tables.timing_map.get("02").unwrap().offset, 10);
    }

    #[test]
    fn test_lower_row_is_not_reused_as_next_upper() {
        let rows = vec![
            row("時間 08:00 01 60 0 0 A 60"),
            row("時制 01"),
            row("時制 02"),
        ];
        let tables = parse_timing_table(&rows);
        assert_eq!(tables.schedule_map.entry_count(), 1);
    }

    #[test]
    fn test_alphanumeric_schedule_codes_are_dropped_by_default() {
        let rows = vec![
            row("時間 08:00 09:00 a3 120 0 1 Peak 60 60"),
            row("時制 A3 01"),
        ];
        let tables = parse_timing_table(&rows);
        assert!(tables.schedule_map.for_day(Day::Monday).is_empty());
        assert_eq!(tables.schedule_map.for_day(Day::Tuesday), [entry("09:00", "01")]);
        assert!(tables.timing_map.get("A3").is_some());

        let widened = ParserConfig {
            schedule_codes: ScheduleCodeRule::Alphanumeric,
            ..ParserConfig::default()
        };
        let tables = parse_timing_table_with(&rows, &widened);
        assert_eq!(tables.schedule_map.for_day(Day::Monday), [entry("08:00", "A3")]);
    }

    #[test]
    fn test_unparsable_definition_columns_default_to_zero() {
        let rows = vec![row("時間 08:00 36 x y z"), row("時制 01")];
        let tables = parse_timing_table(&rows);
        let definition = tables.timing_map.get("36").unwrap();
        assert_eq!(definition.period, 0);
        assert_eq!(definition.offset, 0);
        assert_eq!(definition.direction, 0);
        assert_eq!(definition.phase_type, "");
        assert!(definition.phase_durations.is_empty());
    }

    #[test]
    fn test_phase_durations_skip_unparsable_tokens() {
        let rows = vec![
            row("時間 08:00 36 120 -15 1 Mixed 30 -- 40s 黃燈 50"),
            row("時制 01"),
        ];
        let tables = parse_timing_table(&rows);
        let definition = tables.timing_map.get("36").unwrap();
        assert_eq!(definition.offset, -15);
        assert_eq!(definition.phase_durations, vec![30, 40, 50]);
    }

    #[test]
    fn test_later_definition_overwrites_earlier() {
        let rows = vec![
            row("時間 08:00 36 120 0 1 First 60 60"),
            row("時制 36"),
            row("時間 09:00 36 90 0 1 Second 45 45"),
            row("時制 36"),
        ];
        let tables = parse_timing_table(&rows);
        assert_eq!(tables.timing_map.len(), 1);
        assert_eq!(tables.timing_map.get("36").unwrap().phase_type, "Second");
    }

    #[test]
    fn test_time_columns_beyond_sunday_are_ignored() {
        let rows = vec![
            row("時間 01:00 02:00 03:00 04:00 05:00 06:00 07:00 08:00 01 60 0 0 A 60"),
            row("時制 01 01 01 01 01 01 01 01"),
        ];
        let tables = parse_timing_table(&rows);
        assert_eq!(tables.schedule_map.entry_count(), 7);
        assert_eq!(tables.schedule_map.for_day(Day::Sunday), [entry("07:00", "01")]);
        // "08:00" is part of the time run, so the definition starts after it
        assert!(tables.timing_map.get("01").is_some());
    }

    #[test]
    fn test_header_pair_without_times_still_reads_definition() {
        let rows = vec![row("時間 F0 60 5 2 Flash 60"), row("時制")];
        let tables = parse_timing_table(&rows);
        assert_eq!(tables.schedule_map.entry_count(), 0);
        assert_eq!(tables.timing_map.get("F0").unwrap().offset, 5);
    }

    #[rstest]
    #[case("30", Some(30))]
    #[case("30s", Some(30))]
    #[case("12.5", Some(12))]
    #[case("-5", Some(-5))]
    #[case("+7", Some(7))]
    #[case("abc", None)]
    #[case("-", None)]
    #[case("", None)]
    fn test_leading_int(#[case] token: &str, #[case] expected: Option<i64>) {
        assert_eq!(leading_int(token), expected);
    }

    #[test]
    fn test_parse_pages_tokenizes_first() {
        let pages = ["標題\n時間 08:00 09:00 36 120 0 1 PhaseA 30 40 50", "時制 01 02\n"];
        let tables = parse_pages(&pages);
        // The pair spans a page break, which is still two consecutive rows
        assert_eq!(tables.schedule_map.entry_count(), 2);
        assert!(tables.timing_map.get("36").is_some());
    }
}

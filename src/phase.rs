use chrono::{Datelike, NaiveDateTime};

use super::records::{
    ClockTime, Day, PhaseDescriptor, ScheduleEntry, SecondsPastMidnight, TimingDefinition,
    TimingDefinitionTable, TypeCode, WeeklySchedule,
};

/// Works out which phase of which timing program is showing at `time` on `day`.
///
/// Pure and cheap enough to call every second. Never fails: a day without
/// schedule entries, or a schedule referencing an undefined timing type,
/// yields [`PhaseDescriptor::indeterminate`].
pub fn compute_phase(
    time: &ClockTime,
    day: Day,
    timing_map: &TimingDefinitionTable,
    schedule_map: &WeeklySchedule,
) -> PhaseDescriptor {
    let schedule = schedule_map.for_day(day);
    let Some(timing_type) = current_timing_type(schedule, time) else {
        return PhaseDescriptor::indeterminate();
    };
    let Some(definition) = timing_map.get(timing_type.as_str()) else {
        return PhaseDescriptor::indeterminate();
    };

    let now = i128::from(time.seconds_past_midnight().0);
    let start = i128::from(program_start(schedule, timing_type).0);
    let period = i128::from(definition.cycle_length());
    let elapsed = (now - start - i128::from(definition.offset)).rem_euclid(period);

    locate_phase(definition, elapsed as u64, timing_type)
}

/// Same as [`compute_phase`] for a local calendar timestamp.
pub fn compute_phase_at(
    local: NaiveDateTime,
    timing_map: &TimingDefinitionTable,
    schedule_map: &WeeklySchedule,
) -> PhaseDescriptor {
    compute_phase(
        &ClockTime::from_chrono(local.time()),
        Day::from_chrono(local.weekday()),
        timing_map,
        schedule_map,
    )
}

/// The type of the last entry starting at or before `time`, or the first
/// entry's type when the day has not reached any entry yet. Entries are in
/// document order, which plans print chronologically.
fn current_timing_type<'a>(schedule: &'a [ScheduleEntry], time: &ClockTime) -> Option<&'a TypeCode> {
    let mut current = &schedule.first()?.timing_type;
    // Fixed-width "HH:MM" sorts the same way as "HH:MM:SS" does chronologically
    let query = time.to_string();
    for entry in schedule {
        if entry.time.as_str() > query.as_str() {
            break;
        }
        current = &entry.timing_type;
    }
    Some(current)
}

/// Start of the cycle count: the last entry in the day's list that switches to `timing_type`.
fn program_start(schedule: &[ScheduleEntry], timing_type: &TypeCode) -> SecondsPastMidnight {
    schedule
        .iter()
        .rev()
        .find(|entry| &entry.timing_type == timing_type)
        .map(ScheduleEntry::starts_at)
        .unwrap_or(SecondsPastMidnight(0))
}

fn locate_phase(
    definition: &TimingDefinition,
    elapsed: u64,
    timing_type: &TypeCode,
) -> PhaseDescriptor {
    let mut phase_end: u64 = 0;
    for (index, duration) in definition.phase_durations.iter().enumerate() {
        phase_end += u64::from(*duration);
        if phase_end > elapsed {
            return PhaseDescriptor {
                phase_type: definition.phase_type.clone(),
                phase_index: phase_number(index),
                remaining_seconds: u32::try_from(phase_end - elapsed).unwrap_or(u32::MAX),
                type_code: Some(timing_type.clone()),
            };
        }
    }

    // The listed phases end before the cycle does; hold the last one
    let last_index = match definition.phase_durations.len() {
        0 => -1,
        len => phase_number(len - 1),
    };
    PhaseDescriptor {
        phase_type: definition.phase_type.clone(),
        phase_index: last_index,
        remaining_seconds: 0,
        type_code: Some(timing_type.clone()),
    }
}

fn phase_number(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

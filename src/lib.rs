//! Reads the timing tables of a traffic-signal timing plan and works out
//! which signal phase is showing at a given time.
//!
//! The input is the text extracted from each page of a plan document (PDF
//! decoding happens elsewhere). From it the crate builds:
//!
//! - a [`TimingDefinitionTable`]: every timing program's cycle length,
//!   offset and phase durations, keyed by its two-character type code;
//! - a [`WeeklySchedule`]: for each weekday, the clock times at which the
//!   intersection switches program.
//!
//! [`compute_phase`] combines both with a wall-clock time to give the active
//! phase and the seconds left in it. [`correlate_graphics`] tags the phase
//! diagrams printed in the plan so the picture for the active phase can be
//! looked up with [`GraphicsByType::select_for_phase`].
//!
//! ```no_run
//! use signal_timing_plan::{ClockTime, Day, compute_phase, parse_pages};
//!
//! let pages = ["時間 08:00 36 120 0 1 PhaseA 30 40 50\n時制 36"];
//! let tables = parse_pages(&pages);
//! let time: ClockTime = "08:00:45".parse().unwrap();
//! let phase = compute_phase(&time, Day::Monday, &tables.timing_map, &tables.schedule_map);
//! assert_eq!((phase.phase_index, phase.remaining_seconds), (1, 25));
//! ```

pub mod config;
pub mod correlator;
pub mod error;
pub mod graphics;
pub mod phase;
pub mod records;
pub mod rows;
pub mod timing_table;

pub use config::{ParserConfig, ScheduleCodeRule, read_config};
pub use correlator::{Graphic, TaggedGraphic, correlate_graphics, correlate_graphics_with};
pub use error::{Result, TimingPlanError};
pub use graphics::{GraphicsByType, PhaseGraphic};
pub use phase::{compute_phase, compute_phase_at};
pub use records::{
    ClockTime, Day, PhaseDescriptor, ScheduleEntry, TimingDefinition, TimingDefinitionTable,
    TypeCode, WeeklySchedule,
};
pub use timing_table::{TimingTables, parse_pages, parse_timing_table, parse_timing_table_with};

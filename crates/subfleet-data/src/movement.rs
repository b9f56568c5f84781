//! Movement reports: one lazily read command stream per entity.
//!
//! Each line of `MovementReports/<ID>.txt` is `<direction> <distance>`. The
//! first blank line ends the report. Lines that cannot become a command are
//! handed to the core as `Err` items, which it skips.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use subfleet_core::{Command, CommandSource, CommandStream, EntityId, InvalidCommand};
use tracing::{debug, error, info, warn};

use crate::error::DataError;
use crate::layout::{txt_stems, DataLayout};

/// [`CommandSource`] backed by the `MovementReports/` directory.
#[derive(Debug, Clone)]
pub struct MovementReports {
    layout: DataLayout,
}

impl MovementReports {
    /// Reads reports under `layout`.
    #[must_use]
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    /// The layout this source reads from.
    #[must_use]
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Report stems sorted by name.
    ///
    /// # Errors
    ///
    /// Returns a [`DataError`] if `MovementReports/` cannot be listed.
    pub fn try_entity_ids(&self) -> Result<Vec<EntityId>, DataError> {
        txt_stems(&self.layout.movement_dir())
    }
}

impl CommandSource for MovementReports {
    fn entity_ids(&self) -> Vec<EntityId> {
        match self.try_entity_ids() {
            Ok(ids) => ids,
            Err(err) => {
                error!(error = %err, "movement reports unavailable");
                Vec::new()
            }
        }
    }

    fn open(&self, id: &EntityId) -> Option<CommandStream> {
        let path = self.layout.movement_file(id);
        match File::open(&path) {
            Ok(file) => Some(Box::new(ReportLines {
                entity: id.clone(),
                path,
                reader: BufReader::new(file),
                line: 0,
                loaded: 0,
                max_lines: self.layout.max_lines,
                done: false,
            })),
            Err(err) => {
                error!(entity = %id, path = %path.display(), error = %err, "movement report not readable");
                None
            }
        }
    }
}

/// Parses one non-blank report line.
///
/// # Errors
///
/// [`InvalidCommand::Malformed`] unless the line is exactly two tokens with an
/// integer distance; otherwise the validation errors of [`Command::parse`].
pub fn parse_line(line: &str) -> Result<Command, InvalidCommand> {
    let mut tokens = line.split_whitespace();
    let (Some(direction), Some(distance), None) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(InvalidCommand::Malformed(format!(
            "expected `<direction> <distance>`, got `{}`",
            line.trim()
        )));
    };
    let distance: i64 = distance
        .parse()
        .map_err(|_| InvalidCommand::Malformed(format!("distance `{distance}` is not an integer")))?;
    Command::parse(direction, distance)
}

struct ReportLines {
    entity: EntityId,
    path: PathBuf,
    reader: BufReader<File>,
    line: usize,
    loaded: usize,
    max_lines: usize,
    done: bool,
}

impl ReportLines {
    fn finish(&mut self) {
        self.done = true;
        info!(entity = %self.entity, moves = self.loaded, "movement report loaded");
    }
}

impl Iterator for ReportLines {
    type Item = Result<Command, InvalidCommand>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.finish();
                return None;
            }
            Ok(_) => {}
            Err(err) => {
                error!(entity = %self.entity, path = %self.path.display(), error = %err, "movement report read failed");
                self.finish();
                return None;
            }
        }
        self.line += 1;

        if self.loaded >= self.max_lines {
            warn!(
                entity = %self.entity,
                max_lines = self.max_lines,
                "movement report exceeds line cap; remaining lines ignored"
            );
            self.finish();
            return None;
        }

        let text = String::from_utf8_lossy(&buf);
        if text.trim().is_empty() {
            debug!(entity = %self.entity, line = self.line, "blank line ends movement report");
            self.finish();
            return None;
        }

        let item = parse_line(&text).map_err(|err| {
            InvalidCommand::Malformed(format!("{}:{}: {err}", self.path.display(), self.line))
        });
        if let Ok(command) = &item {
            self.loaded += 1;
            debug!(entity = %self.entity, line = self.line, %command, "loaded move");
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScratchDir;
    use subfleet_core::Direction;

    fn reports(scratch: &ScratchDir) -> MovementReports {
        MovementReports::new(DataLayout::new(scratch.path()))
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn well_formed_line() {
            assert_eq!(parse_line("forward 12\n"), Ok(Command::forward(12)));
            assert_eq!(parse_line("  up\t3 "), Ok(Command::up(3)));
        }

        #[test]
        fn wrong_token_count_is_malformed() {
            assert!(matches!(parse_line("forward"), Err(InvalidCommand::Malformed(_))));
            assert!(matches!(
                parse_line("forward 1 2"),
                Err(InvalidCommand::Malformed(_))
            ));
        }

        #[test]
        fn non_integer_distance_is_malformed() {
            assert!(matches!(
                parse_line("down five"),
                Err(InvalidCommand::Malformed(_))
            ));
        }

        #[test]
        fn validation_errors_pass_through() {
            assert_eq!(
                parse_line("Forward 1"),
                Err(InvalidCommand::UnknownDirection("Forward".into()))
            );
            assert_eq!(
                parse_line("down -4"),
                Err(InvalidCommand::NegativeDistance(-4))
            );
        }
    }

    mod source_tests {
        use super::*;

        #[test]
        fn ids_are_sorted_report_stems() {
            let scratch = ScratchDir::new("movement-ids");
            scratch.write("MovementReports/B.txt", "up 1\n");
            scratch.write("MovementReports/A.txt", "up 1\n");
            assert_eq!(
                reports(&scratch).entity_ids(),
                vec![EntityId::new("A"), EntityId::new("B")]
            );
        }

        #[test]
        fn missing_directory_enumerates_nothing() {
            let scratch = ScratchDir::new("movement-nodir");
            let source = reports(&scratch);
            assert!(source.entity_ids().is_empty());
            assert!(source.try_entity_ids().is_err());
        }

        #[test]
        fn missing_report_has_no_stream() {
            let scratch = ScratchDir::new("movement-missing");
            assert!(reports(&scratch).open(&EntityId::new("ghost")).is_none());
        }

        #[test]
        fn blank_line_ends_report() {
            let scratch = ScratchDir::new("movement-blank");
            scratch.write("MovementReports/A.txt", "up 1\ndown 2\n\nforward 3\n");
            let items: Vec<_> = reports(&scratch)
                .open(&EntityId::new("A"))
                .unwrap()
                .collect();
            assert_eq!(items, vec![Ok(Command::up(1)), Ok(Command::down(2))]);
        }

        #[test]
        fn bad_lines_become_errors_in_place() {
            let scratch = ScratchDir::new("movement-bad");
            scratch.write("MovementReports/A.txt", "forward five\nbackward 2\ndown 3\n");
            let items: Vec<_> = reports(&scratch)
                .open(&EntityId::new("A"))
                .unwrap()
                .collect();
            assert_eq!(items.len(), 3);
            assert!(items[0].is_err());
            assert!(items[1].is_err());
            assert_eq!(items[2], Ok(Command::down(3)));
        }

        #[test]
        fn line_cap_counts_valid_moves_only() {
            let scratch = ScratchDir::new("movement-cap");
            scratch.write("MovementReports/A.txt", "up 1\nnope\nup 2\nup 3\n");
            let source = MovementReports::new(DataLayout::new(scratch.path()).with_max_lines(2));
            let valid: Vec<_> = source
                .open(&EntityId::new("A"))
                .unwrap()
                .filter_map(Result::ok)
                .collect();
            assert_eq!(valid, vec![Command::up(1), Command::up(2)]);
        }

        #[test]
        fn streams_reopen_from_the_start() {
            let scratch = ScratchDir::new("movement-reopen");
            scratch.write("MovementReports/A.txt", "forward 4\n");
            let source = reports(&scratch);
            let id = EntityId::new("A");
            for _ in 0..2 {
                let first = source.open(&id).unwrap().next();
                assert_eq!(
                    first.map(|c| c.map(|c| c.direction)),
                    Some(Ok(Direction::Forward))
                );
            }
        }
    }

    mod simulation_tests {
        use std::sync::Arc;

        use glam::IVec2;
        use subfleet_core::{RecordingSink, SimEvent, Simulation, SimulationConfig};

        use super::*;

        fn fleet_files(scratch: &ScratchDir) {
            scratch.write("MovementReports/A.txt", "forward 2\nsideways 3\nup\nforward 1\n");
            scratch.write("MovementReports/B.txt", "forward 3\n");
            scratch.write("MovementReports/C.txt", "down 1\n\ndown 5\n");
            scratch.write("MovementReports/D.txt", "up 1\nup 1\nup 1\n");
        }

        #[test]
        fn report_files_drive_a_full_run() {
            let scratch = ScratchDir::new("movement-run");
            fleet_files(&scratch);
            let source = MovementReports::new(DataLayout::new(scratch.path()).with_max_lines(2));
            let sink = Arc::new(RecordingSink::new());
            let mut sim =
                Simulation::from_source(&source, SimulationConfig::default()).with_sink(sink.clone());

            let summary = sim.run();
            assert_eq!(summary.rounds, 2);
            assert_eq!(summary.collisions.len(), 1);
            assert!(summary.collisions[0].involves("A"));
            assert!(summary.collisions[0].involves("B"));
            assert_eq!(summary.collisions[0].position(), IVec2::new(3, 0));

            let fleet = sim.fleet();
            let a = fleet.get("A").unwrap();
            assert_eq!(a.history(), &[Command::forward(2), Command::forward(1)]);
            assert_eq!(a.skipped_total(), 2);
            assert!(!a.is_active());

            let c = fleet.get("C").unwrap();
            assert_eq!(c.position(), IVec2::new(0, 1));
            assert!(c.is_active());
            assert!(c.is_exhausted());

            let d = fleet.get("D").unwrap();
            assert_eq!(d.position(), IVec2::new(0, -2));
            assert!(d.is_exhausted());

            let rejected = sink
                .take_events()
                .iter()
                .filter(|e| matches!(e, SimEvent::CommandRejected { .. }))
                .count();
            assert_eq!(rejected, 2);
        }
    }
}

//! Per-round sensor analysis.
//!
//! `SensorData/<ID>.txt` holds one 208-character `0`/`1` pattern per line;
//! other lines are skipped. Each round, every active entity with sensor data
//! reads its next pattern. The zero count of a pattern is its number of sensor
//! errors, and pattern frequencies are tallied for the final summary.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};

use serde::{Deserialize, Serialize};
use subfleet_core::{Contact, EntityId};
use tracing::{debug, info, warn};

use crate::layout::DataLayout;

/// Length of a valid sensor pattern.
pub const PATTERN_LEN: usize = 208;

/// Number of patterns listed per entity in [`SensorSummary::top_patterns`].
pub const TOP_PATTERNS: usize = 5;

/// Returns `true` for a line that is exactly [`PATTERN_LEN`] `0`/`1` characters.
#[must_use]
pub fn is_pattern(line: &str) -> bool {
    line.len() == PATTERN_LEN && line.bytes().all(|b| b == b'0' || b == b'1')
}

/// Sensor errors (zeros) in a pattern.
#[must_use]
pub fn error_count(pattern: &str) -> u32 {
    let zeros = pattern.bytes().filter(|&b| b == b'0').count();
    u32::try_from(zeros).unwrap_or(u32::MAX)
}

/// One pattern read during a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Entity the pattern belongs to
    pub entity: EntityId,
    /// Zeros in the pattern
    pub errors: u32,
}

/// How often a pattern was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    /// The raw pattern
    pub pattern: String,
    /// Occurrences
    pub count: u64,
}

/// Final statistics for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSummary {
    /// Entity id
    pub entity: EntityId,
    /// Patterns read
    pub rounds_read: u64,
    /// Sum of sensor errors
    pub total_errors: u64,
    /// Largest error count of a single pattern
    pub max_errors: u32,
    /// Distinct patterns seen
    pub unique_patterns: usize,
    /// Most frequent patterns, ties in first-seen order
    pub top_patterns: Vec<PatternCount>,
}

type PatternLines = Box<dyn Iterator<Item = String> + Send>;

struct SensorFeed {
    entity: EntityId,
    lines: PatternLines,
    exhausted: bool,
    rounds_read: u64,
    total_errors: u64,
    max_errors: u32,
    // pattern -> (count, first-seen index)
    patterns: HashMap<String, (u64, usize)>,
}

impl SensorFeed {
    fn new(entity: EntityId, lines: PatternLines) -> Self {
        Self {
            entity,
            lines,
            exhausted: false,
            rounds_read: 0,
            total_errors: 0,
            max_errors: 0,
            patterns: HashMap::new(),
        }
    }

    fn read_next(&mut self, round: u64) -> Option<SensorReading> {
        if self.exhausted {
            return None;
        }
        let Some(pattern) = self.lines.by_ref().find(|line| is_pattern(line)) else {
            self.exhausted = true;
            debug!(entity = %self.entity, round, "no more sensor data");
            return None;
        };

        let errors = error_count(&pattern);
        self.rounds_read += 1;
        self.total_errors += u64::from(errors);
        self.max_errors = self.max_errors.max(errors);
        let next_index = self.patterns.len();
        self.patterns.entry(pattern).or_insert((0, next_index)).0 += 1;

        info!(entity = %self.entity, round, errors, "sensor errors this round");
        Some(SensorReading {
            entity: self.entity.clone(),
            errors,
        })
    }

    fn summary(&self) -> SensorSummary {
        let mut ranked: Vec<_> = self.patterns.iter().collect();
        ranked.sort_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)));
        SensorSummary {
            entity: self.entity.clone(),
            rounds_read: self.rounds_read,
            total_errors: self.total_errors,
            max_errors: self.max_errors,
            unique_patterns: self.patterns.len(),
            top_patterns: ranked
                .into_iter()
                .take(TOP_PATTERNS)
                .map(|(pattern, &(count, _))| PatternCount {
                    pattern: pattern.clone(),
                    count,
                })
                .collect(),
        }
    }
}

/// Reads sensor patterns round by round and accumulates statistics.
#[derive(Default)]
pub struct SensorAnalyzer {
    feeds: Vec<SensorFeed>,
}

impl SensorAnalyzer {
    /// Creates an analyzer with no feeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `SensorData/<ID>.txt` for each id. Ids without a readable file
    /// are warned about and get no feed. Returns the number of feeds opened.
    pub fn attach<'a>(&mut self, layout: &DataLayout, ids: impl IntoIterator<Item = &'a EntityId>) -> usize {
        let mut opened = 0;
        for id in ids {
            let path = layout.sensor_file(id);
            match File::open(&path) {
                Ok(file) => {
                    let lines = BufReader::new(file)
                        .lines()
                        .map_while(Result::ok)
                        .map(|line| line.trim().to_string());
                    self.attach_lines(id.clone(), lines);
                    opened += 1;
                }
                Err(err) => {
                    warn!(entity = %id, path = %path.display(), error = %err, "no sensor data");
                }
            }
        }
        opened
    }

    /// Adds a feed from raw lines.
    pub fn attach_lines<I>(&mut self, entity: EntityId, lines: I)
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        self.feeds.retain(|feed| feed.entity != entity);
        self.feeds.push(SensorFeed::new(entity, Box::new(lines.into_iter())));
    }

    /// Number of feeds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Returns `true` if no feeds are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Reads the next pattern for every active contact that has a feed.
    pub fn process_round<C: Contact>(&mut self, round: u64, contacts: &[C]) -> Vec<SensorReading> {
        let active: HashSet<&EntityId> = contacts
            .iter()
            .filter(|c| c.is_active())
            .map(Contact::id)
            .collect();

        self.feeds
            .iter_mut()
            .filter(|feed| active.contains(&feed.entity))
            .filter_map(|feed| feed.read_next(round))
            .collect()
    }

    /// Statistics per feed, in attach order.
    #[must_use]
    pub fn summary(&self) -> Vec<SensorSummary> {
        let summaries: Vec<_> = self.feeds.iter().map(SensorFeed::summary).collect();
        for s in &summaries {
            info!(
                entity = %s.entity,
                rounds = s.rounds_read,
                total_errors = s.total_errors,
                unique_patterns = s.unique_patterns,
                "sensor summary"
            );
        }
        summaries
    }
}

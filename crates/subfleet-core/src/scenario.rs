//! Seeded synthetic fleets.
//!
//! Used by tests, benchmarks and the `generate` command. The same seed always
//! yields the same scripts.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::command::{Command, Direction};
use crate::stream::ScriptedSource;

/// Largest distance of a generated command. Small distances keep the fleet
/// crowded enough for collisions and fire-control contacts to be common.
pub const MAX_GENERATED_DISTANCE: u16 = 4;

/// Id of the `index`-th generated submarine, starting at 1.
#[must_use]
pub fn scenario_id(index: usize) -> String {
    format!("SUB-{index:04}")
}

/// Generates `fleet_size` scripts of up to `max_len` commands each.
///
/// Script lengths are drawn uniformly from `0..=max_len`; directions and
/// distances (`0..=MAX_GENERATED_DISTANCE`) are uniform as well.
#[must_use]
pub fn random_scripts(seed: u64, fleet_size: usize, max_len: usize) -> ScriptedSource {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut source = ScriptedSource::new();
    for index in 1..=fleet_size {
        let len = rng.gen_range(0..=max_len);
        let commands = (0..len).map(|_| random_command(&mut rng)).collect();
        source = source.with_script(scenario_id(index), commands);
    }
    source
}

fn random_command<R: Rng>(rng: &mut R) -> Command {
    let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
    Command {
        direction,
        distance: u32::from(rng.gen_range(0..=MAX_GENERATED_DISTANCE)),
    }
}

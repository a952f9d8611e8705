//! Opening deployments
//!
//! Two facing lines with a commander behind each, jittered by a seeded RNG
//! so the same seed always produces the same battle.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::battle::cities::SpawnRequest;
use crate::battle::grid::GridSpec;
use crate::battle::units::UnitType;
use crate::core::types::{Team, Vec2};

/// Fraction of the map width between each line and its own edge
const LINE_INSET: f32 = 0.15;

/// Positions jitter by up to this many cells
const JITTER_CELLS: f32 = 0.4;

/// `per_side` line units plus one commander for each team
pub fn line_deployment(grid: &GridSpec, per_side: u32, seed: u64) -> Vec<SpawnRequest> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let width = grid.map_width();
    let height = grid.map_height();
    let jitter = JITTER_CELLS * grid.cell_width.min(grid.cell_height);
    let mut requests = Vec::with_capacity(2 * (per_side as usize + 1));

    for team in Team::all() {
        let (line_x, rear_x) = match team {
            Team::A => (width * LINE_INSET, width * LINE_INSET * 0.5),
            Team::B => (width * (1.0 - LINE_INSET), width * (1.0 - LINE_INSET * 0.5)),
        };
        let spacing = height / (per_side + 1) as f32;

        for i in 0..per_side {
            let y = spacing * (i + 1) as f32;
            requests.push(SpawnRequest {
                team,
                unit_type: UnitType::Line,
                position: grid.clamp_world(Vec2::new(
                    line_x + rng.gen_range(-jitter..=jitter),
                    y + rng.gen_range(-jitter..=jitter),
                )),
            });
        }

        requests.push(SpawnRequest {
            team,
            unit_type: UnitType::Commander,
            position: grid.clamp_world(Vec2::new(rear_x, height * 0.5)),
        });
    }

    requests
}

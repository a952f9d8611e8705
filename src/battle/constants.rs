//! Battle system constants - all fixed values in one place
//!
//! Balance values that change at runtime live in `Tuning` instead.

// Contact combat: units engage within this many cells of each other
pub const CONTACT_DISTANCE_CELLS: f32 = 1.5;

// Rotation (radians, radians per second)
pub const UNIT_TURN_RATE: f32 = 3.0;
pub const ROTATION_REENTRY_THRESHOLD: f32 = 0.5; // ~29 degrees off-heading
pub const ROTATION_MOVE_TOLERANCE: f32 = 0.12; // ~7 degrees

// Arrival snap tolerance as a fraction of the smaller cell side
pub const ARRIVAL_SNAP_FRACTION: f32 = 0.05;

// Route limits
pub const MAX_PATH_POINTS: usize = 256;

// Command speed multiplier bounds
pub const MIN_SPEED_MULTIPLIER: f32 = 0.25;
pub const MAX_SPEED_MULTIPLIER: f32 = 3.0;

// Influence field
pub const UNIT_INFLUENCE_SIGMA_CELLS: f32 = 2.5;
pub const UNIT_INFLUENCE_CUTOFF_SIGMAS: f32 = 3.0;

// Morale
pub const MORALE_SAMPLE_RADIUS: i32 = 1;
pub const MORALE_NEUTRAL: f32 = 50.0;
pub const MORALE_MAX: f32 = 100.0;
pub const MORALE_INFLUENCE_SCALE: f32 = 2.0;

// Damage mitigation bounds
pub const MIN_MITIGATION: f32 = 0.1;
pub const MAX_MITIGATION: f32 = 3.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_hysteresis() {
        // Leaving ROTATING needs a tighter heading than re-entering it
        assert!(ROTATION_MOVE_TOLERANCE < ROTATION_REENTRY_THRESHOLD);
    }

    #[test]
    fn test_speed_multiplier_bounds() {
        assert!(MIN_SPEED_MULTIPLIER > 0.0);
        assert!(MIN_SPEED_MULTIPLIER <= 1.0 && 1.0 <= MAX_SPEED_MULTIPLIER);
    }

    #[test]
    fn test_mitigation_bounds_contain_neutral() {
        assert!(MIN_MITIGATION < 1.0 && 1.0 < MAX_MITIGATION);
    }

    #[test]
    fn test_morale_neutral_is_midpoint() {
        assert_eq!(MORALE_NEUTRAL * 2.0, MORALE_MAX);
    }
}

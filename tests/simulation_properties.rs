//! Property tests for routing, engagement and tick bounds

use std::collections::{BTreeMap, BTreeSet};

use frontline::battle::*;
use frontline::core::{SimulationConfig, Team, UnitId, Vec2};
use proptest::prelude::*;

const COLS: u32 = 40;
const ROWS: u32 = 24;

fn grid() -> GridSpec {
    GridSpec::new(COLS, ROWS, 800.0, 480.0)
}

fn cell_strategy() -> impl Strategy<Value = GridCoordinate> {
    (0..COLS, 0..ROWS).prop_map(|(col, row)| GridCoordinate::new(col, row))
}

fn point_strategy() -> impl Strategy<Value = Vec2> {
    (-50.0f32..850.0, -50.0f32..530.0).prop_map(|(x, y)| Vec2::new(x, y))
}

fn terrain_strategy() -> impl Strategy<Value = TerrainGrid> {
    prop::collection::vec(cell_strategy(), 0..60).prop_map(|mountains| {
        let mut terrain = TerrainGrid::for_grid(&grid());
        for cell in mountains {
            terrain.set(cell, TerrainType::Mountains);
        }
        terrain
    })
}

fn deployment_strategy() -> impl Strategy<Value = Vec<SpawnRequest>> {
    prop::collection::vec((any::<bool>(), point_strategy()), 2..16).prop_map(|units| {
        units
            .into_iter()
            .map(|(is_a, position)| SpawnRequest {
                team: if is_a { Team::A } else { Team::B },
                unit_type: UnitType::Line,
                position,
            })
            .collect()
    })
}

fn small_config() -> SimulationConfig {
    SimulationConfig {
        grid_cols: COLS,
        grid_rows: ROWS,
        map_width: 800.0,
        map_height: 480.0,
        ..SimulationConfig::default()
    }
}

proptest! {
    #[test]
    fn route_is_clipped_prefix_of_rasterization(
        terrain in terrain_strategy(),
        start in cell_strategy(),
        waypoints in prop::collection::vec(point_strategy(), 0..6),
    ) {
        let grid = grid();
        let routed = route(&grid, &terrain, start, &waypoints);
        let raw = rasterize(&grid, start, &waypoints);

        prop_assert!(routed.len() <= raw.len());
        prop_assert_eq!(&raw[..routed.len()], &routed[..]);
        prop_assert!(routed.iter().all(|c| !terrain.is_impassable(*c)));
        // Stops exactly at the first blocked cell
        if let Some(next) = raw.get(routed.len()) {
            prop_assert!(terrain.is_impassable(*next));
        }
    }

    #[test]
    fn route_steps_are_four_connected(
        start in cell_strategy(),
        waypoints in prop::collection::vec(point_strategy(), 1..6),
    ) {
        let grid = grid();
        let terrain = TerrainGrid::for_grid(&grid);
        let routed = route(&grid, &terrain, start, &waypoints);

        let mut previous = start;
        for cell in routed {
            let dc = (cell.col as i64 - previous.col as i64).abs();
            let dr = (cell.row as i64 - previous.row as i64).abs();
            prop_assert_eq!(dc + dr, 1, "{:?} -> {:?}", previous, cell);
            previous = cell;
        }
    }

    #[test]
    fn engagements_are_sorted_and_opposed(deployment in deployment_strategy()) {
        let mut state = BattleState::new(small_config());
        state.reset_battle(&deployment);

        let pairs = detect_engagements(&state.units, state.grid.contact_distance());
        prop_assert!(pairs.windows(2).all(|w| w[0] < w[1]));
        for pair in &pairs {
            prop_assert!(pair.first < pair.second);
            let first = state.get_unit(pair.first).unwrap();
            let second = state.get_unit(pair.second).unwrap();
            prop_assert_ne!(first.team, second.team);
            prop_assert_eq!(pair.partner(pair.first), Some(pair.second));
        }
    }

    #[test]
    fn engagement_partners_are_mutual(deployment in deployment_strategy()) {
        let mut state = BattleState::new(small_config());
        state.reset_battle(&deployment);

        let pairs = detect_engagements(&state.units, state.grid.contact_distance());
        let mut partners: BTreeMap<UnitId, BTreeSet<UnitId>> = BTreeMap::new();
        for pair in &pairs {
            for id in [pair.first, pair.second] {
                if let Some(other) = pair.partner(id) {
                    partners.entry(id).or_default().insert(other);
                }
            }
        }

        for (id, set) in &partners {
            for other in set {
                prop_assert!(partners.get(other).is_some_and(|s| s.contains(id)));
            }
        }
        let engaged = engaged_units(&pairs);
        prop_assert_eq!(engaged, partners.keys().copied().collect::<BTreeSet<_>>());
    }

    #[test]
    fn ticks_keep_health_and_morale_in_bounds(
        deployment in deployment_strategy(),
        orders in prop::collection::vec(point_strategy(), 0..16),
        ticks in 1usize..60,
    ) {
        let mut state = BattleState::new(small_config());
        state.reset_battle(&deployment);
        state.start_battle().unwrap();

        // Send every unit toward a random point, some off the map
        let units: Vec<_> = state.units.iter().map(|u| (u.id, u.team)).collect();
        for ((id, team), target) in units.into_iter().zip(orders) {
            state
                .issue_path(&CommandIssuer::player(team), id, &[target], MovementCommandMode::default())
                .unwrap();
        }

        let mut revision = state.field().revision();
        for _ in 0..ticks {
            state.run_tick(0.05);

            prop_assert!(state.field().revision() >= revision);
            revision = state.field().revision();
            for unit in state.units.iter() {
                prop_assert!((0.0..=unit.health_max).contains(&unit.health));
                prop_assert!((0.0..=100.0).contains(&unit.morale_score));
                prop_assert!(unit.position.is_finite());
                prop_assert!((0.0..=state.grid.map_width()).contains(&unit.position.x));
                prop_assert!((0.0..=state.grid.map_height()).contains(&unit.position.y));
                let col = (unit.position.x / state.grid.cell_width).floor() as u32;
                let row = (unit.position.y / state.grid.cell_height).floor() as u32;
                // The right and bottom map edges belong to the last cell
                prop_assert_eq!(
                    state.grid.world_to_grid(unit.position),
                    GridCoordinate::new(col.min(COLS - 1), row.min(ROWS - 1))
                );
            }
        }
    }

    #[test]
    fn morale_stays_bounded_for_any_influence(value in -1.0e6f32..1.0e6, team in any::<bool>()) {
        let grid = grid();
        let terrain = TerrainGrid::filled(COLS, ROWS, TerrainType::Hills);
        let mut units = UnitTable::new();
        let team = if team { Team::A } else { Team::B };
        units.spawn(team, UnitType::Commander, grid.cell_center(GridCoordinate::new(5, 5)), 100.0);

        let mut field = InfluenceField::new(&grid);
        let tuning = Tuning {
            unit_influence_multiplier: value.abs(),
            ..Tuning::default()
        };
        field.recompute(&units, &FixedCities::default(), &tuning);

        let morale = morale_at(team, GridCoordinate::new(5, 5), &field, &terrain);
        prop_assert!((0.0..=100.0).contains(&morale));
    }
}

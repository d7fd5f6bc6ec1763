use islegen::{Grid, Map, MapError, NullOutput, CLIMATES, LAND, WATER};

fn new_map(height: u32, width: u32, seed: u32) -> Map {
    Map::new(height, width, Some(seed), Box::new(NullOutput))
}

fn values(grid: &Grid) -> Vec<Option<u8>> {
    grid.tiles().map(|tile| tile.value).collect()
}

fn land_count(grid: &Grid) -> usize {
    grid.tiles().filter(|tile| tile.value == Some(LAND)).count()
}

fn assert_water_border(grid: &Grid, waterborder: u32) {
    for tile in grid.tiles() {
        let on_border = tile.x() < waterborder
            || tile.x() >= grid.width() - waterborder
            || tile.y() < waterborder
            || tile.y() >= grid.height() - waterborder;
        if on_border {
            assert_eq!(
                tile.value,
                Some(WATER),
                "tile ({}, {}) inside the water border is not water",
                tile.x(),
                tile.y()
            );
        }
    }
}

#[test]
fn full_pipeline_is_deterministic() {
    let run = || {
        let mut map = new_map(24, 24, 42);
        map.generate_landmass(4, 10_000).unwrap();
        map.remove_lone_tiles(0).unwrap();
        map.centre_landmass().unwrap();
        map.generate_heatmap(4, 10_000).unwrap();
        map.soften_heatmap().unwrap();
        (
            values(map.landmass().unwrap()),
            values(map.heatmap().unwrap()),
        )
    };

    assert_eq!(run(), run());
}

#[test]
fn border_tiles_are_always_water() {
    for seed in [1, 7, 42, 1234, 987_654_321] {
        let mut map = new_map(24, 24, seed);
        map.generate_landmass(4, 10_000).unwrap();
        let landmass = map.landmass().unwrap();
        assert_water_border(landmass, 4);
        assert!(land_count(landmass) > 0, "seed {seed} produced no land");
    }
}

#[test]
fn heatmap_neighbors_differ_by_at_most_one() {
    let mut map = new_map(20, 20, 42);
    map.generate_landmass(4, 10_000).unwrap();

    let landmass = map.landmass().unwrap();
    assert_water_border(landmass, 4);
    assert!(land_count(landmass) > 0);

    map.generate_heatmap(4, 10_000).unwrap();
    let heatmap = map.heatmap().unwrap();
    assert_eq!(heatmap.width(), 5);
    assert_eq!(heatmap.height(), 5);

    for index in heatmap.indices() {
        let value = heatmap.get(index).value.expect("heatmap cell unresolved");
        for neighbor in heatmap.ring_at(index, 1) {
            let other = heatmap.get(neighbor).value.unwrap();
            assert!(
                value.abs_diff(other) <= 1,
                "adjacent heatmap cells differ by more than 1: {value} vs {other}"
            );
        }
    }
}

#[test]
fn softening_expands_to_full_resolution() {
    let mut map = new_map(20, 20, 99);
    map.generate_landmass(4, 10_000).unwrap();
    map.generate_heatmap(4, 10_000).unwrap();
    assert_eq!(map.resolution(), 4);

    map.soften_heatmap().unwrap();
    assert_eq!(map.resolution(), 1);

    let heatmap = map.heatmap().unwrap();
    assert_eq!(heatmap.width(), 20);
    assert_eq!(heatmap.height(), 20);
    for tile in heatmap.tiles() {
        let value = tile.value.expect("softened cell unresolved");
        assert!(value < CLIMATES);
    }
}

#[test]
fn snapshot_restore_round_trips() {
    let mut map = new_map(20, 20, 42);
    map.generate_landmass(4, 10_000).unwrap();
    assert_eq!(map.state_count(), 1);
    let generated = values(map.landmass().unwrap());

    map.save_state();
    assert_eq!(map.state_count(), 2);

    map.restore_state(None).unwrap();
    assert_eq!(map.state_count(), 1);
    assert_eq!(values(map.landmass().unwrap()), generated);

    // Restoring past the first snapshot leaves a blank map.
    map.restore_state(None).unwrap();
    assert_eq!(map.state_count(), 0);
    assert!(map.landmass().is_none());
    assert!(map.heatmap().is_none());

    assert!(matches!(map.restore_state(None), Err(MapError::NoStates)));
}

#[test]
fn restore_truncates_to_the_requested_index() {
    let mut map = new_map(20, 20, 7);
    map.generate_landmass(4, 10_000).unwrap();
    let after_landmass = values(map.landmass().unwrap());
    map.remove_lone_tiles(0).unwrap();
    map.centre_landmass().unwrap();
    assert_eq!(map.state_count(), 3);

    map.restore_state(Some(1)).unwrap();
    assert_eq!(map.state_count(), 1);
    assert_eq!(values(map.landmass().unwrap()), after_landmass);
}

#[test]
fn restore_to_blank_replays_identically() {
    let mut map = new_map(20, 20, 42);
    map.generate_landmass(4, 10_000).unwrap();
    let first = values(map.landmass().unwrap());

    // The blank map keeps the seed the landmass phase started from, so
    // regenerating reproduces the same grid.
    map.restore_state(None).unwrap();
    assert!(map.landmass().is_none());
    assert_eq!(map.seed(), 42);

    map.generate_landmass(4, 10_000).unwrap();
    assert_eq!(values(map.landmass().unwrap()), first);
}

#[test]
fn outline_leaves_the_landmass_untouched() {
    let mut map = new_map(20, 20, 13);
    map.generate_landmass(4, 10_000).unwrap();
    let before = values(map.landmass().unwrap());
    map.outline_landmass().unwrap();
    assert_eq!(values(map.landmass().unwrap()), before);
}

#[test]
fn lone_tiles_flip_and_supported_tiles_survive() {
    let mut map = new_map(8, 8, 1);
    let mut grid = Grid::filled(8, 8, WATER);
    // One fully isolated land tile and one 2x2 block.
    grid.tile_mut(5, 5).value = Some(LAND);
    for (x, y) in [(2, 2), (2, 3), (3, 2), (3, 3)] {
        grid.tile_mut(x, y).value = Some(LAND);
    }
    map.set_landmass(grid).unwrap();

    map.remove_lone_tiles(0).unwrap();
    let landmass = map.landmass().unwrap();
    assert_eq!(landmass.tile(5, 5).value, Some(WATER));
    for (x, y) in [(2, 2), (2, 3), (3, 2), (3, 3)] {
        assert_eq!(landmass.tile(x, y).value, Some(LAND));
    }
}

#[test]
fn phases_fail_before_their_preconditions() {
    let mut map = new_map(20, 20, 3);
    assert!(matches!(
        map.generate_heatmap(4, 10_000),
        Err(MapError::MissingLandmass)
    ));
    assert!(matches!(
        map.remove_lone_tiles(0),
        Err(MapError::MissingLandmass)
    ));
    assert!(matches!(
        map.centre_landmass(),
        Err(MapError::MissingLandmass)
    ));
    assert!(matches!(
        map.outline_landmass(),
        Err(MapError::MissingLandmass)
    ));
    assert!(matches!(
        map.soften_heatmap(),
        Err(MapError::MissingHeatmap)
    ));
}

#[test]
fn landmass_rejects_borders_without_interior() {
    let mut map = new_map(8, 8, 5);
    assert!(matches!(
        map.generate_landmass(4, 10_000),
        Err(MapError::InvalidParams(_))
    ));
}

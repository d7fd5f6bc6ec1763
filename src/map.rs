//! Map engine: generation phases, state snapshots, restore.
//!
//! A [`Map`] runs the pipeline landmass -> lone-tile removal -> centring ->
//! heatmap -> softening -> outline. Every phase reseeds its own PRNG stream
//! from the live seed before the first draw and commits a state snapshot
//! when it finishes, so a fixed constructor seed reproduces the whole
//! pipeline byte for byte.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::grid::{Grid, TileIndex};
use crate::output::Output;
use crate::palette;

/// Resolved landmass value for water (also the coldest climate class).
pub const WATER: u8 = 0;
/// Resolved landmass value for land.
pub const LAND: u8 = 1;

/// Ring depth used for landmass adjacency. The ring-weight table below is
/// derived from this value.
pub const LAYERS: u32 = 2;
/// Number of climate classes on the heatmap's ordinal temperature scale.
pub const CLIMATES: u8 = 5;

/// Climate the heatmap anchor tile is forced to (the temperate midpoint).
const TEMPERATE: u8 = 2;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("landmass has not been generated")]
    MissingLandmass,
    #[error("heatmap has not been generated")]
    MissingHeatmap,
    #[error("no saved state to restore")]
    NoStates,
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// One committed snapshot of the map's generated content.
#[derive(Clone)]
struct MapState {
    seed: u32,
    landmass: Option<Grid>,
    heatmap: Option<Grid>,
    resolution: u32,
}

/// The generation engine.
pub struct Map {
    height: u32,
    width: u32,
    seed: u32,
    output: Box<dyn Output>,
    landmass: Option<Grid>,
    heatmap: Option<Grid>,
    resolution: u32,
    states: Vec<MapState>,
}

impl Map {
    /// Creates an empty map. When `seed` is `None` a random one is drawn;
    /// everything after construction is deterministic in the seed.
    pub fn new(height: u32, width: u32, seed: Option<u32>, output: Box<dyn Output>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            height,
            width,
            seed,
            output,
            landmass: None,
            heatmap: None,
            resolution: 1,
            states: Vec::new(),
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn landmass(&self) -> Option<&Grid> {
        self.landmass.as_ref()
    }

    pub fn heatmap(&self) -> Option<&Grid> {
        self.heatmap.as_ref()
    }

    /// Scale factor between heatmap cells and landmass pixels (1 once the
    /// heatmap has been softened).
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn output(&self) -> &dyn Output {
        self.output.as_ref()
    }

    pub fn output_mut(&mut self) -> &mut dyn Output {
        self.output.as_mut()
    }

    /// Installs a prebuilt landmass grid, replacing any generated one.
    pub fn set_landmass(&mut self, grid: Grid) -> Result<(), MapError> {
        if grid.width() != self.width || grid.height() != self.height {
            return Err(MapError::InvalidParams(format!(
                "landmass grid is {}x{}, map is {}x{}",
                grid.width(),
                grid.height(),
                self.width,
                self.height
            )));
        }
        self.landmass = Some(grid);
        Ok(())
    }

    /// Generates the water/land grid with the constrained random fill.
    ///
    /// `waterborder` tiles from each edge are forced to water; `control` is
    /// the rarity denominator for the forced random outcomes.
    pub fn generate_landmass(&mut self, waterborder: u32, control: u32) -> Result<(), MapError> {
        if control < 2 {
            return Err(MapError::InvalidParams(
                "control must be at least 2".into(),
            ));
        }
        if self.width <= 2 * waterborder || self.height <= 2 * waterborder {
            return Err(MapError::InvalidParams(format!(
                "water border {waterborder} leaves no interior in a {}x{} map",
                self.width, self.height
            )));
        }
        let interior = (self.width - 2 * waterborder) as u64
            * (self.height - 2 * waterborder) as u64;
        if interior < 12 {
            return Err(MapError::InvalidParams(format!(
                "interior of {interior} tiles cannot hold the seed points"
            )));
        }

        log::info!(
            "generating landmass: {}x{}, seed {}, water border {}",
            self.width,
            self.height,
            self.seed,
            waterborder
        );
        let (width, height) = (self.width, self.height);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed as u64);
        let mut grid = Grid::new(height, width);

        let in_interior = |x: u32, y: u32| {
            x >= waterborder
                && x < width - waterborder
                && y >= waterborder
                && y < height - waterborder
        };

        // Border tiles collapse immediately; everything else joins the pool.
        let mut pool: Vec<TileIndex> = Vec::new();
        for x in 0..width {
            for y in 0..height {
                let index = grid.index(x, y);
                grid.load_adjacent(index, LAYERS);
                if in_interior(x, y) {
                    pool.push(index);
                } else {
                    grid.collapse(index, WATER);
                    self.output.tile_relief(grid.get(index));
                }
            }
        }
        pool.shuffle(&mut rng);

        let landpoints = rng.gen_range(2..=10);
        let waterpoints = rng.gen_range(0..=2);
        log::debug!("placing {landpoints} land and {waterpoints} water seed points");
        for (count, value) in [(landpoints, LAND), (waterpoints, WATER)] {
            for _ in 0..count {
                let index = loop {
                    let x = rng.gen_range(waterborder..width - waterborder);
                    let y = rng.gen_range(waterborder..height - waterborder);
                    let index = grid.index(x, y);
                    if grid.get(index).value.is_none() {
                        break index;
                    }
                };
                grid.collapse(index, value);
                self.output.tile_relief(grid.get(index));
                pool.retain(|&pooled| pooled != index);
            }
        }

        while let Some(index) = grid.find_next(&mut pool) {
            let value = pick_landmass_value(&grid, index, control, &mut rng);
            grid.collapse(index, value);
            self.output.tile_relief(grid.get(index));
        }

        self.landmass = Some(grid);
        self.commit_phase(&mut rng);
        Ok(())
    }

    /// Flips every tile with at most `threshold` same-valued immediate
    /// neighbors to the opposite value.
    ///
    /// Single pass: a flip can itself isolate a previously visited tile and
    /// that is not revisited.
    pub fn remove_lone_tiles(&mut self, threshold: u32) -> Result<(), MapError> {
        let grid = self.landmass.as_mut().ok_or(MapError::MissingLandmass)?;
        log::info!("removing lone tiles at threshold {threshold}");

        let mut flipped = 0u32;
        for index in grid.indices() {
            let value = grid.get(index).value;
            let flip = match value {
                Some(LAND) => WATER,
                Some(WATER) => LAND,
                _ => continue,
            };
            let same = grid
                .neighbors(index)
                .iter()
                .filter(|&&neighbor| grid.get(neighbor).value == value)
                .count() as u32;
            if same <= threshold {
                grid.collapse(index, flip);
                self.output.tile_relief(grid.get(index));
                flipped += 1;
            }
        }
        log::debug!("flipped {flipped} lone tiles");

        self.save_state();
        Ok(())
    }

    /// Shifts the landmass so its bounding box sits in the centre of the
    /// grid. Land pushed outside the grid by the shift is silently dropped.
    pub fn centre_landmass(&mut self) -> Result<(), MapError> {
        let grid = self.landmass.as_ref().ok_or(MapError::MissingLandmass)?;

        let mut min_x = self.width / 2;
        let mut min_y = self.height / 2;
        let mut max_x = self.width / 2;
        let mut max_y = self.height / 2;
        for tile in grid.tiles() {
            if tile.value == Some(LAND) {
                min_x = min_x.min(tile.x());
                min_y = min_y.min(tile.y());
                max_x = max_x.max(tile.x());
                max_y = max_y.max(tile.y());
            }
        }

        let dx = ((self.width - (max_x - min_x)) / 2) as i64 - min_x as i64;
        let dy = ((self.height - (max_y - min_y)) / 2) as i64 - min_y as i64;
        log::info!("centring landmass: translating by ({dx}, {dy})");

        let mut centred = Grid::filled(self.height, self.width, WATER);
        for index in grid.indices() {
            let tile = grid.get(index);
            if tile.value != Some(LAND) {
                continue;
            }
            let x = tile.x() as i64 + dx;
            let y = tile.y() as i64 + dy;
            if x >= 0 && x < self.width as i64 && y >= 0 && y < self.height as i64 {
                let moved = centred.index(x as u32, y as u32);
                centred.get_mut(moved).value = Some(LAND);
                self.output.tile_relief(centred.get(moved));
            }
        }
        // Repaint tiles the shift left behind.
        for index in grid.indices() {
            let tile = grid.get(index);
            if tile.value == Some(LAND) && centred.tile(tile.x(), tile.y()).value == Some(WATER) {
                self.output.tile_relief(centred.tile(tile.x(), tile.y()));
            }
        }

        self.landmass = Some(centred);
        self.save_state();
        Ok(())
    }

    /// Generates the climate grid at `1/resolution` scale over the landmass
    /// using ordinal constraint elimination.
    ///
    /// `_control` is accepted for symmetry with [`Map::generate_landmass`];
    /// constraint elimination has no forced random outcomes to control.
    pub fn generate_heatmap(&mut self, resolution: u32, _control: u32) -> Result<(), MapError> {
        let landmass = self.landmass.as_ref().ok_or(MapError::MissingLandmass)?;
        if resolution == 0 {
            return Err(MapError::InvalidParams(
                "heatmap resolution must be at least 1".into(),
            ));
        }

        let width = self.width.div_ceil(resolution);
        let height = self.height.div_ceil(resolution);
        log::info!(
            "generating heatmap: {width}x{height} at resolution {resolution}, seed {}",
            self.seed
        );

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed as u64);
        let mut grid = Grid::new(height, width);
        self.resolution = resolution;

        let mut pool: Vec<TileIndex> = Vec::new();
        for index in grid.indices() {
            grid.load_adjacent(index, CLIMATES as u32);
            pool.push(index);
        }
        pool.shuffle(&mut rng);

        let Some(anchor) = pool.pop() else {
            return Err(MapError::InvalidParams("heatmap grid is empty".into()));
        };
        grid.collapse(anchor, TEMPERATE);
        self.output
            .overlay_temperature(grid.get(anchor), landmass, resolution);

        while let Some(index) = grid.find_next(&mut pool) {
            let possibilities = eliminate_possibilities(&grid, index);
            let value = possibilities.choose(&mut rng).copied().unwrap_or(TEMPERATE);
            grid.collapse(index, value);
            self.output
                .overlay_temperature(grid.get(index), landmass, resolution);
        }

        self.heatmap = Some(grid);
        self.commit_phase(&mut rng);
        Ok(())
    }

    /// Refines the heatmap to full resolution: every coarse cell expands
    /// into its pixel block, then every tile re-collapses to a
    /// frequency-weighted pick over its neighborhood.
    pub fn soften_heatmap(&mut self) -> Result<(), MapError> {
        let heatmap = self.heatmap.as_ref().ok_or(MapError::MissingHeatmap)?;
        let landmass = self.landmass.as_ref().ok_or(MapError::MissingLandmass)?;
        let resolution = self.resolution;
        log::info!(
            "softening heatmap: expanding {}x{} by {resolution}, seed {}",
            heatmap.width(),
            heatmap.height(),
            self.seed
        );

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed as u64);
        let mut grid = Grid::new(self.height, self.width);

        let mut pool: Vec<TileIndex> = Vec::new();
        for coarse_x in 0..heatmap.width() {
            for coarse_y in 0..heatmap.height() {
                let value = heatmap.tile(coarse_x, coarse_y).value;
                for x_off in 0..resolution {
                    for y_off in 0..resolution {
                        let x = coarse_x * resolution + x_off;
                        let y = coarse_y * resolution + y_off;
                        // Cells on the far edge can overhang when the map
                        // dimensions are not divisible by the resolution.
                        if x >= self.width || y >= self.height {
                            continue;
                        }
                        let index = grid.index(x, y);
                        grid.get_mut(index).value = value;
                        grid.load_adjacent(index, CLIMATES as u32);
                        pool.push(index);
                    }
                }
            }
        }
        pool.shuffle(&mut rng);

        while let Some(index) = grid.find_next(&mut pool) {
            let value = pick_soft_value(&grid, index, &mut rng);
            grid.collapse(index, value);
            self.output.overlay_temperature(grid.get(index), landmass, 1);
        }

        self.resolution = 1;
        self.heatmap = Some(grid);
        self.commit_phase(&mut rng);
        Ok(())
    }

    /// Draws a coastline overlay: every water tile with an axis-aligned
    /// land neighbor gets a plot request. Map state is untouched.
    pub fn outline_landmass(&mut self) -> Result<(), MapError> {
        let landmass = self.landmass.as_ref().ok_or(MapError::MissingLandmass)?;
        log::info!("outlining landmass");

        for index in landmass.indices() {
            let tile = landmass.get(index);
            if tile.value != Some(WATER) {
                continue;
            }
            for neighbor in landmass.ring_at(index, 1) {
                let other = landmass.get(neighbor);
                if other.x() != tile.x() && other.y() != tile.y() {
                    continue;
                }
                if other.value == Some(LAND) {
                    self.output.plot((tile.x(), tile.y()), palette::OUTLINE);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Pushes a snapshot of the current state and deterministically rolls
    /// the live seed forward.
    pub fn save_state(&mut self) {
        self.push_state();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed as u64);
        self.seed = rng.gen();
    }

    /// Restores the snapshot preceding `index` (`None` = the latest) and
    /// truncates the history from `index` onward. Restoring past the first
    /// snapshot leaves a blank map carrying that snapshot's seed.
    pub fn restore_state(&mut self, index: Option<usize>) -> Result<(), MapError> {
        if self.states.is_empty() {
            return Err(MapError::NoStates);
        }
        let index = index.unwrap_or(self.states.len() - 1);
        if index >= self.states.len() {
            return Err(MapError::InvalidParams(format!(
                "state index {index} out of range ({} saved)",
                self.states.len()
            )));
        }

        let seed = self.states[index].seed;
        self.states.truncate(index);
        log::info!(
            "restored to state {index}; {} snapshots remain",
            self.states.len()
        );

        if let Some(state) = self.states.last() {
            let state = state.clone();
            self.landmass = state.landmass;
            self.heatmap = state.heatmap;
            self.resolution = state.resolution;
            self.seed = seed;
            if let Some(landmass) = self.landmass.as_ref() {
                self.output.map_relief(landmass);
            }
        } else {
            self.landmass = None;
            self.heatmap = None;
            self.resolution = 1;
            self.seed = seed;
            self.output.clear();
        }
        Ok(())
    }

    fn push_state(&mut self) {
        self.states.push(MapState {
            seed: self.seed,
            landmass: self.landmass.clone(),
            heatmap: self.heatmap.clone(),
            resolution: self.resolution,
        });
    }

    /// Ends a generation phase: snapshot first, then draw the next live
    /// seed from the phase's own stream.
    fn commit_phase(&mut self, rng: &mut ChaCha8Rng) {
        self.push_state();
        self.seed = rng.gen();
    }
}

/// Sum of the ring weights for the landmass draw:
/// `a(1) = 1, a(n) = a(n-1) + n*(n-1)^2`.
fn ring_weight_sum(layers: u32) -> u32 {
    let mut total = 1;
    for n in 2..=layers {
        total += n * (n - 1).pow(2);
    }
    total
}

/// Neighborhood frequency weight for softening:
/// `a(1) = 1, a(n) = a(n-1) + 8^(n-1)`.
fn climate_frequency_weight(n: u32) -> u64 {
    let mut total = 1u64;
    for k in 2..=n {
        total += 8u64.pow(k - 1);
    }
    total
}

/// Multi-tier weighted random choice for one landmass tile.
fn pick_landmass_value(
    grid: &Grid,
    index: TileIndex,
    control: u32,
    rng: &mut ChaCha8Rng,
) -> u8 {
    let mut ring_water = [0u32; LAYERS as usize];
    let mut ring_land = [0u32; LAYERS as usize];
    let mut water_score = 0u32;
    let mut land_score = 0u32;
    for (depth, ring) in grid.get(index).rings().iter().enumerate() {
        let reach = LAYERS - depth as u32;
        let weight = 8 * reach * reach.pow(2);
        for &neighbor in ring {
            match grid.get(neighbor).value {
                Some(WATER) => {
                    ring_water[depth] += 1;
                    water_score += weight;
                }
                Some(LAND) => {
                    ring_land[depth] += 1;
                    land_score += weight;
                }
                _ => {}
            }
        }
    }

    // A vanishingly rare forced outcome keeps noise possible even against
    // strong neighbor evidence.
    let chance = rng.gen_range(1..=control);
    if chance == 1 {
        return WATER;
    }
    if chance == 2 {
        return LAND;
    }

    let total = 8 * ring_weight_sum(LAYERS);
    let chance = rng.gen_range(1..=total);
    if chance <= water_score {
        return WATER;
    }
    if chance <= water_score + land_score {
        return LAND;
    }

    let chance = rng.gen_range(1..=8);
    if chance <= ring_water[0] {
        return WATER;
    }
    if chance <= ring_water[0] + ring_land[0] {
        return LAND;
    }

    // No neighbor evidence at all: unbiased coin.
    if water_score + land_score == 0 {
        return if rng.gen_bool(0.5) { WATER } else { LAND };
    }
    let chance = rng.gen_range(1..=water_score + land_score);
    if chance <= water_score {
        WATER
    } else {
        LAND
    }
}

/// Ordinal constraint propagation for one heatmap tile: each resolved
/// neighbor at ring depth `i` bounds the value to within `i + 1` of its
/// own. Falls back to the full range if every possibility is eliminated.
fn eliminate_possibilities(grid: &Grid, index: TileIndex) -> Vec<u8> {
    let mut possibilities: Vec<u8> = (0..CLIMATES).collect();
    for (depth, ring) in grid.get(index).rings().iter().enumerate() {
        let reach = (depth + 1) as i16;
        for &neighbor in ring {
            let Some(value) = grid.get(neighbor).value else {
                continue;
            };
            let value = value as i16;
            possibilities
                .retain(|&p| (p as i16) <= value + reach && (p as i16) >= value - reach);
            if possibilities.len() == 1 {
                return possibilities;
            }
        }
    }
    if possibilities.is_empty() {
        return (0..CLIMATES).collect();
    }
    possibilities
}

/// Frequency-weighted climate pick for one softened tile.
fn pick_soft_value(grid: &Grid, index: TileIndex, rng: &mut ChaCha8Rng) -> u8 {
    let mut frequency = [0u64; CLIMATES as usize];
    for (depth, ring) in grid.get(index).rings().iter().enumerate() {
        let weight = climate_frequency_weight(CLIMATES as u32 - depth as u32);
        for &neighbor in ring {
            if let Some(value) = grid.get(neighbor).value {
                frequency[value as usize] += weight;
            }
        }
    }
    match WeightedIndex::new(frequency) {
        Ok(distribution) => distribution.sample(rng) as u8,
        // No resolved neighbor in any ring: degenerate uniform pick.
        Err(_) => rng.gen_range(0..CLIMATES),
    }
}

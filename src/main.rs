use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use islegen::{ImageOutput, Map, MapParams, LAND};

#[derive(Debug, Parser)]
#[command(author, version, about = "Procedural terrain map generator")]
struct Cli {
    /// Path to a YAML parameter file (flags below override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Map height in tiles
    #[arg(long)]
    height: Option<u32>,

    /// Map width in tiles
    #[arg(long)]
    width: Option<u32>,

    /// Fixed seed (random when omitted)
    #[arg(long)]
    seed: Option<u32>,

    /// Water border width in tiles
    #[arg(long)]
    waterborder: Option<u32>,

    /// Heatmap resolution (landmass pixels per heatmap cell)
    #[arg(long)]
    resolution: Option<u32>,

    /// Output pixels per map tile
    #[arg(long)]
    pixel_size: Option<u32>,

    /// Where to write the rendered map
    #[arg(long, default_value = "map.png")]
    out: PathBuf,

    /// Leave the heatmap at coarse resolution
    #[arg(long)]
    skip_soften: bool,

    /// Skip the coastline overlay
    #[arg(long)]
    skip_outline: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => MapParams::load_from_path(path)
            .with_context(|| format!("loading params from {}", path.display()))?,
        None => MapParams::default(),
    };
    if let Some(height) = cli.height {
        params.height = height;
    }
    if let Some(width) = cli.width {
        params.width = width;
    }
    if let Some(seed) = cli.seed {
        params.seed = Some(seed);
    }
    if let Some(waterborder) = cli.waterborder {
        params.waterborder = waterborder;
    }
    if let Some(resolution) = cli.resolution {
        params.resolution = resolution;
    }
    if let Some(pixel_size) = cli.pixel_size {
        params.pixel_size = pixel_size;
    }
    params.validate()?;

    let seed = params.seed.unwrap_or_else(rand::random);
    let output = ImageOutput::new(params.height, params.width, params.pixel_size);
    let mut map = Map::new(params.height, params.width, Some(seed), Box::new(output));

    map.generate_landmass(params.waterborder, params.control)?;
    map.remove_lone_tiles(params.lone_tile_threshold)?;
    map.centre_landmass()?;
    map.generate_heatmap(params.resolution, params.control)?;
    if !cli.skip_soften {
        map.soften_heatmap()?;
    }
    if !cli.skip_outline {
        map.outline_landmass()?;
    }

    let land_tiles = map
        .landmass()
        .map(|grid| grid.tiles().filter(|tile| tile.value == Some(LAND)).count())
        .unwrap_or(0);

    let image = map
        .output()
        .as_any()
        .downcast_ref::<ImageOutput>()
        .context("output sink is not an image buffer")?;
    image
        .save(&cli.out)
        .with_context(|| format!("writing {}", cli.out.display()))?;

    println!(
        "Generated {}x{} map with seed {}: {} land tiles, written to {}",
        params.width,
        params.height,
        seed,
        land_tiles,
        cli.out.display()
    );
    Ok(())
}

pub mod config;
pub mod grid;
pub mod map;
pub mod output;
pub mod palette;

pub use config::{MapParams, ParamsError};
pub use grid::{Grid, Tile, TileIndex, TilePos};
pub use map::{Map, MapError, CLIMATES, LAND, LAYERS, WATER};
pub use output::{ChannelOutput, ImageOutput, NullOutput, Output, PlotEvent};

//! Output sinks for plot notifications.
//!
//! The map engine fires a notification after every tile commit and never
//! reads anything back; sinks must not block generation. The composite
//! notifications (`tile_relief`, `map_relief`, `overlay_temperature`) have
//! default implementations that reduce everything to [`Output::plot`], so a
//! concrete sink only needs to decide what a pixel and a clear mean.

use std::any::Any;
use std::path::Path;
use std::sync::mpsc::Sender;

use image::{Rgba, RgbaImage};

use crate::grid::{Grid, Tile};
use crate::palette::{self, Rgb};

/// One rendering event, as queued for an asynchronous consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotEvent {
    Clear,
    Pixel { pos: (u32, u32), color: Rgb },
}

/// Write-only notification sink consumed by the map engine.
pub trait Output {
    /// Resets the visible surface.
    fn clear(&mut self) {}

    /// Raw pixel-level draw request in map coordinates.
    fn plot(&mut self, pos: (u32, u32), color: Rgb) {
        let _ = (pos, color);
    }

    /// A single landmass tile has been resolved.
    fn tile_relief(&mut self, tile: &Tile) {
        if let Some(value) = tile.value {
            self.plot((tile.x(), tile.y()), palette::relief(value));
        }
    }

    /// Redraws an entire landmass grid (used after a state restore).
    fn map_relief(&mut self, grid: &Grid) {
        for tile in grid.tiles() {
            self.tile_relief(tile);
        }
    }

    /// Composites a heatmap cell over the landmass pixels it covers at the
    /// given scale, clipping at the landmass edge.
    fn overlay_temperature(&mut self, tile: &Tile, landmass: &Grid, resolution: u32) {
        let Some(climate) = tile.value else {
            return;
        };
        for x_off in 0..resolution {
            let x = tile.x() * resolution + x_off;
            if x >= landmass.width() {
                break;
            }
            for y_off in 0..resolution {
                let y = tile.y() * resolution + y_off;
                if y >= landmass.height() {
                    break;
                }
                if let Some(relief) = landmass.tile(x, y).value {
                    self.plot((x, y), palette::overlay(relief, climate));
                }
            }
        }
    }

    /// Escape hatch so callers holding a `Box<dyn Output>` can recover the
    /// concrete sink.
    fn as_any(&self) -> &dyn Any;
}

/// Discards every notification.
#[derive(Debug, Default)]
pub struct NullOutput;

impl Output for NullOutput {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Forwards events over an unbounded channel to a renderer on another
/// thread. Sending never blocks; a hung-up receiver is ignored.
pub struct ChannelOutput {
    sender: Sender<PlotEvent>,
    pixel_size: u32,
}

impl ChannelOutput {
    pub fn new(sender: Sender<PlotEvent>, pixel_size: u32) -> Self {
        Self {
            sender,
            pixel_size: pixel_size.max(1),
        }
    }
}

impl Output for ChannelOutput {
    fn clear(&mut self) {
        let _ = self.sender.send(PlotEvent::Clear);
    }

    fn plot(&mut self, pos: (u32, u32), color: Rgb) {
        for x_off in 0..self.pixel_size {
            for y_off in 0..self.pixel_size {
                let event = PlotEvent::Pixel {
                    pos: (
                        pos.0 * self.pixel_size + x_off,
                        pos.1 * self.pixel_size + y_off,
                    ),
                    color,
                };
                let _ = self.sender.send(event);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Accumulates plots into an RGBA buffer for PNG export.
pub struct ImageOutput {
    image: RgbaImage,
    pixel_size: u32,
}

impl ImageOutput {
    pub fn new(height: u32, width: u32, pixel_size: u32) -> Self {
        let pixel_size = pixel_size.max(1);
        Self {
            image: RgbaImage::from_pixel(
                width * pixel_size,
                height * pixel_size,
                Rgba([0, 0, 0, 255]),
            ),
            pixel_size,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.image.save(path)
    }
}

impl Output for ImageOutput {
    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 255]);
        }
    }

    fn plot(&mut self, pos: (u32, u32), color: Rgb) {
        let (r, g, b) = color;
        for x_off in 0..self.pixel_size {
            for y_off in 0..self.pixel_size {
                let x = pos.0 * self.pixel_size + x_off;
                let y = pos.1 * self.pixel_size + y_off;
                if x < self.image.width() && y < self.image.height() {
                    self.image.put_pixel(x, y, Rgba([r, g, b, 255]));
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

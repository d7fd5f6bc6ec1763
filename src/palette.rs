//! Color tables used by the output sinks.

pub type Rgb = (u8, u8, u8);

/// Coastline overlay color.
pub const OUTLINE: Rgb = (255, 255, 255);

const RELIEFS: [Rgb; 2] = [
    (100, 100, 100), // water
    (255, 255, 255), // land
];

const TEMPERATURES: [Rgb; 5] = [
    (16, 91, 222),
    (16, 194, 222),
    (16, 222, 44),
    (222, 147, 16),
    (222, 44, 16),
];

/// Relief x climate composite table: row is the underlying relief value,
/// column is the climate class. Rows beyond land are reserved for terrain
/// types the generator does not produce yet.
const OVERLAY: [[Rgb; 5]; 5] = [
    [
        (97, 242, 255),
        (99, 209, 255),
        (93, 166, 255),
        (87, 129, 255),
        (100, 109, 233),
    ],
    [
        (238, 230, 36),
        (161, 229, 55),
        (109, 204, 0),
        (53, 193, 110),
        (0, 161, 87),
    ],
    [
        (206, 193, 75),
        (185, 167, 51),
        (149, 142, 0),
        (121, 134, 69),
        (130, 157, 87),
    ],
    [
        (206, 193, 155),
        (185, 167, 154),
        (149, 142, 142),
        (121, 134, 141),
        (147, 171, 168),
    ],
    [
        (230, 172, 151),
        (209, 185, 171),
        (194, 194, 204),
        (220, 224, 231),
        (223, 233, 240),
    ],
];

/// Color for a resolved landmass value.
pub fn relief(value: u8) -> Rgb {
    *RELIEFS.get(value as usize).unwrap_or(&RELIEFS[0])
}

/// Color for a bare climate value.
pub fn temperature(value: u8) -> Rgb {
    *TEMPERATURES
        .get(value as usize)
        .unwrap_or(&TEMPERATURES[0])
}

/// Composite color for a climate value drawn over a landmass value.
pub fn overlay(relief: u8, climate: u8) -> Rgb {
    let row = OVERLAY.get(relief as usize).unwrap_or(&OVERLAY[0]);
    *row.get(climate as usize).unwrap_or(&row[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_clamp_out_of_range_values() {
        assert_eq!(relief(0), (100, 100, 100));
        assert_eq!(relief(200), relief(0));
        assert_eq!(temperature(4), (222, 44, 16));
        assert_eq!(overlay(1, 2), (109, 204, 0));
        assert_eq!(overlay(9, 9), overlay(0, 0));
    }
}

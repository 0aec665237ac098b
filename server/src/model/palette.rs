//! Region palettes for dynamically constructed map regions.

/// Palette width and height in 8x8 chunks.
pub const PALETTE_SIZE: usize = 13;
pub const PALETTE_PLANES: usize = 4;

/// A chunk copied from elsewhere in the map, optionally rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteTile {
    pub x: u16,
    pub y: u16,
    pub z: u8,
    pub rotation: u8,
}

impl PaletteTile {
    pub const fn new(x: u16, y: u16, z: u8, rotation: u8) -> Self {
        Self { x, y, z, rotation }
    }

    /// Source chunk coordinates and rotation packed into 26 bits.
    pub fn packed(&self) -> u32 {
        (u32::from(self.z) & 0x3) << 24
            | (u32::from(self.x) & 0x3ff) << 14
            | (u32::from(self.y) & 0x7ff) << 3
            | (u32::from(self.rotation) & 0x3) << 1
    }
}

/// A 13x13 chunk grid per plane. Empty cells render as nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    tiles: [[[Option<PaletteTile>; PALETTE_SIZE]; PALETTE_SIZE]; PALETTE_PLANES],
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<PaletteTile> {
        *self.tiles.get(z)?.get(x)?.get(y)?
    }

    /// Returns false if the cell is outside the grid.
    pub fn set(&mut self, x: usize, y: usize, z: usize, tile: Option<PaletteTile>) -> bool {
        match self.tiles.get_mut(z).and_then(|p| p.get_mut(x)).and_then(|c| c.get_mut(y)) {
            Some(cell) => {
                *cell = tile;
                true
            }
            None => false,
        }
    }
}

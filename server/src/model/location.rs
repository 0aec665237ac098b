use std::fmt;

/// An absolute tile position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

impl Location {
    /// Lumbridge.
    pub const DEFAULT: Location = Location::new(3222, 3222, 0);

    pub const fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    /// 8x8 chunk column.
    pub fn chunk_x(&self) -> u16 {
        self.x >> 3
    }

    pub fn chunk_y(&self) -> u16 {
        self.y >> 3
    }

    /// Chunk coordinate of the south-west corner of the 104x104 area the
    /// client loads around this location.
    pub fn region_x(&self) -> u16 {
        self.chunk_x().saturating_sub(6)
    }

    pub fn region_y(&self) -> u16 {
        self.chunk_y().saturating_sub(6)
    }

    /// Offset from the loaded area's south-west corner.
    pub fn local_x(&self) -> u16 {
        self.x - self.region_x() * 8
    }

    pub fn local_y(&self) -> u16 {
        self.y - self.region_y() * 8
    }

    pub fn transform(&self, dx: i32, dy: i32, dz: i32) -> Location {
        Location {
            x: (i32::from(self.x) + dx).clamp(0, i32::from(u16::MAX)) as u16,
            y: (i32::from(self.y) + dy).clamp(0, i32::from(u16::MAX)) as u16,
            z: (i32::from(self.z) + dz).clamp(0, 3) as u8,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_of_default_location() {
        let location = Location::DEFAULT;
        assert_eq!(location.chunk_x(), 402);
        assert_eq!(location.region_x(), 396);
        assert_eq!(location.region_y(), 396);
        assert_eq!(location.local_x(), 54);
    }

    #[test]
    fn test_region_near_origin_saturates() {
        let location = Location::new(10, 10, 0);
        assert_eq!(location.region_x(), 0);
        assert_eq!(location.local_x(), 10);
    }

    #[test]
    fn test_transform_clamps_height() {
        let location = Location::new(100, 100, 3).transform(-1, 2, 1);
        assert_eq!(location, Location::new(99, 102, 3));
    }
}

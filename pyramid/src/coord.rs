use std::fmt;

/// Deepest level whose tile indices fit in `u32`.
pub const MAX_LEVEL: u32 = 31;

/// Number of tiles along one side of `level`.
#[inline]
pub fn level_dim(level: u32) -> u32 {
    1 << level
}

/// Address of a tile in the pyramid. Level 0 is the single coarsest tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub level: u32,
    pub col: u32,
    pub row: u32,
}

impl TileCoord {
    pub const fn new(level: u32, col: u32, row: u32) -> Self {
        Self { level, col, row }
    }

    pub fn is_valid(&self) -> bool {
        let dim = level_dim(self.level);
        self.col < dim && self.row < dim
    }

    /// The four tiles one level finer, in join order: top-left, top-right,
    /// bottom-left, bottom-right.
    pub fn children(&self) -> [TileCoord; 4] {
        let level = self.level + 1;
        let (c, r) = (self.col * 2, self.row * 2);
        [
            TileCoord::new(level, c, r),
            TileCoord::new(level, c + 1, r),
            TileCoord::new(level, c, r + 1),
            TileCoord::new(level, c + 1, r + 1),
        ]
    }

    pub fn parent(&self) -> Option<TileCoord> {
        if self.level == 0 {
            return None;
        }
        Some(TileCoord::new(self.level - 1, self.col / 2, self.row / 2))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.col, self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_cover_the_2x2_block() {
        let children = TileCoord::new(3, 2, 5).children();
        assert_eq!(
            children,
            [
                TileCoord::new(4, 4, 10),
                TileCoord::new(4, 5, 10),
                TileCoord::new(4, 4, 11),
                TileCoord::new(4, 5, 11),
            ]
        );
        for child in children {
            assert_eq!(child.parent(), Some(TileCoord::new(3, 2, 5)));
        }
    }

    #[test]
    fn root_has_no_parent() {
        assert_eq!(TileCoord::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn validity_follows_level_dim() {
        assert!(TileCoord::new(0, 0, 0).is_valid());
        assert!(!TileCoord::new(0, 1, 0).is_valid());
        assert!(TileCoord::new(11, 2047, 2047).is_valid());
        assert!(!TileCoord::new(11, 2048, 0).is_valid());
        assert_eq!(level_dim(11), 2048);
    }
}

//! Terrain grid and board coordinates.
//!
//! The grid is read-only during a tick. Coordinates use `x` for the file
//! (column letter A-L) and `y` for the rank (row number 1-12, stored 0-based).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Side length of the standard board. Algebraic notation covers A-L / 1-12.
pub const BOARD_SIZE: u32 = 12;

/// A cell position on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Column (file), 0-based.
    pub x: u32,
    /// Row (rank), 0-based.
    pub y: u32,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another coordinate.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Chebyshev (king-move) distance to another coordinate.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// The four orthogonal neighbors that do not underflow.
    ///
    /// Order is west, east, south, north. Upper bounds are checked by the grid.
    pub fn orthogonal_neighbors(self) -> impl Iterator<Item = Coord> {
        let west = self.x.checked_sub(1).map(|x| Coord::new(x, self.y));
        let east = Some(Coord::new(self.x + 1, self.y));
        let south = self.y.checked_sub(1).map(|y| Coord::new(self.x, y));
        let north = Some(Coord::new(self.x, self.y + 1));
        [west, east, south, north].into_iter().flatten()
    }

    /// Convert algebraic components (file letter, rank number) to a coordinate.
    ///
    /// The file must be a single uppercase letter A-L and the rank 1-12.
    ///
    /// # Example
    ///
    /// ```
    /// use tactics_core::grid::Coord;
    ///
    /// assert_eq!(Coord::from_algebraic("A", 1).unwrap(), Coord::new(0, 0));
    /// assert_eq!(Coord::from_algebraic("L", 12).unwrap(), Coord::new(11, 11));
    /// assert!(Coord::from_algebraic("M", 1).is_err());
    /// ```
    pub fn from_algebraic(file: &str, rank: i64) -> Result<Self> {
        let invalid = || GameError::InvalidCoordinate(format!("{file}{rank}"));

        let mut chars = file.chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else {
            return Err(invalid());
        };
        if !letter.is_ascii_uppercase() {
            return Err(invalid());
        }
        let x = u32::from(letter) - u32::from('A');
        if x >= BOARD_SIZE || rank < 1 || rank > i64::from(BOARD_SIZE) {
            return Err(invalid());
        }

        Ok(Self::new(x, (rank - 1) as u32))
    }

    /// Parse a tile label such as `"C4"` or `"L12"`.
    pub fn parse_algebraic(label: &str) -> Result<Self> {
        let invalid = || GameError::InvalidCoordinate(label.to_string());
        if !label.is_ascii() || label.len() < 2 {
            return Err(invalid());
        }
        let (file, rank) = label.split_at(1);
        let rank: i64 = rank.parse().map_err(|_| invalid())?;
        Self::from_algebraic(file, rank)
    }

    /// Format as an algebraic tile label, e.g. `"A1"`.
    ///
    /// Coordinates beyond the lettered files fall back to `"?"` for the file.
    #[must_use]
    pub fn to_algebraic(self) -> String {
        let file = char::from_u32(u32::from('A') + self.x)
            .filter(|_| self.x < BOARD_SIZE)
            .unwrap_or('?');
        format!("{file}{}", self.y + 1)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Terrain classification of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open ground.
    #[default]
    Ground,
    /// Hill: slow to leave, gives cover.
    Hill,
    /// Forest: slow to leave, gives cover.
    Forest,
    /// Water: impassable.
    Water,
    /// Home base: gives cover.
    Base,
}

impl TerrainKind {
    /// Parse a single-character map symbol.
    ///
    /// `.` ground, `H` hill, `F` forest, `~` water, `B` base.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Self::Ground),
            'H' => Some(Self::Hill),
            'F' => Some(Self::Forest),
            '~' => Some(Self::Water),
            'B' => Some(Self::Base),
            _ => None,
        }
    }

    /// Map symbol for this terrain, inverse of [`from_symbol`](Self::from_symbol).
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Ground => '.',
            Self::Hill => 'H',
            Self::Forest => 'F',
            Self::Water => '~',
            Self::Base => 'B',
        }
    }

    /// Lowercase name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::Hill => "hill",
            Self::Forest => "forest",
            Self::Water => "water",
            Self::Base => "base",
        }
    }

    /// Units can stand on everything except water.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Water)
    }

    /// Hill and forest: slows movement out of the cell and changes path cost.
    #[must_use]
    pub const fn is_rough(self) -> bool {
        matches!(self, Self::Hill | Self::Forest)
    }

    /// Hill, forest and base reduce combat damage taken.
    #[must_use]
    pub const fn gives_cover(self) -> bool {
        matches!(self, Self::Hill | Self::Forest | Self::Base)
    }
}

/// Rectangular terrain map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    /// Grid width in cells.
    width: u32,
    /// Grid height in cells.
    height: u32,
    /// Cell data stored in row-major order (index = y * width + x).
    cells: Vec<TerrainKind>,
}

impl TerrainGrid {
    /// Create a grid filled with a single terrain kind.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn filled(width: u32, height: u32, terrain: TerrainKind) -> Self {
        assert!(width > 0, "TerrainGrid width must be positive");
        assert!(height > 0, "TerrainGrid height must be positive");

        Self {
            width,
            height,
            cells: vec![terrain; (width as usize) * (height as usize)],
        }
    }

    /// Build a grid from rows of terrain, row index = `y`.
    pub fn from_rows(rows: &[Vec<TerrainKind>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 || height == 0 {
            return Err(GameError::InvalidTerrain("layout is empty".into()));
        }
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(GameError::InvalidTerrain(format!(
                "row {y} has {} cells, expected {width}",
                row.len()
            )));
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            cells: rows.iter().flatten().copied().collect(),
        })
    }

    /// Build a grid from symbol rows (see [`TerrainKind::from_symbol`]).
    ///
    /// Whitespace inside a row is ignored, so rows may be written spaced out.
    pub fn from_ascii<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let parsed = rows
            .iter()
            .enumerate()
            .map(|(y, row)| {
                row.as_ref()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| {
                        TerrainKind::from_symbol(c).ok_or_else(|| {
                            GameError::InvalidTerrain(format!("unknown symbol {c:?} in row {y}"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(&parsed)
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Check if a coordinate lies within the grid.
    #[must_use]
    pub const fn in_bounds(&self, at: Coord) -> bool {
        at.x < self.width && at.y < self.height
    }

    /// Terrain at a coordinate, `None` if out of bounds.
    #[must_use]
    pub fn terrain(&self, at: Coord) -> Option<TerrainKind> {
        if self.in_bounds(at) {
            Some(self.cells[(at.y as usize) * (self.width as usize) + (at.x as usize)])
        } else {
            None
        }
    }

    /// Set terrain at a coordinate. Returns `false` if out of bounds.
    pub fn set_terrain(&mut self, at: Coord, terrain: TerrainKind) -> bool {
        if self.in_bounds(at) {
            let index = (at.y as usize) * (self.width as usize) + (at.x as usize);
            self.cells[index] = terrain;
            true
        } else {
            false
        }
    }

    /// In bounds and not water.
    #[must_use]
    pub fn is_passable(&self, at: Coord) -> bool {
        self.terrain(at).is_some_and(TerrainKind::is_passable)
    }

    /// Iterate all coordinates of base tiles.
    pub fn base_tiles(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, t)| {
            (*t == TerrainKind::Base)
                .then(|| Coord::new(i as u32 % self.width, i as u32 / self.width))
        })
    }

    /// Render the grid as symbol rows, row 0 first.
    #[must_use]
    pub fn to_ascii(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|t| t.symbol()).collect())
            .collect()
    }
}

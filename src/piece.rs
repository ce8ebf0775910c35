//! Pieces: kinds, colours, rotation states and the geometry table.

/// Grid cell: column `x`, row `y`. y=0 is top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Tetromino kinds (I, O, S, Z, T, L, J).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    S,
    Z,
    T,
    L,
    J,
}

type Offsets = [(i32, i32); 4];

/// Offsets relative to the anchor, indexed by [kind][rotation / 90].
/// The anchor (0, 0) comes first in every pattern.
const GEOMETRY: [[Offsets; 4]; 7] = {
    const I_FLAT: Offsets = [(0, 0), (1, 0), (-1, 0), (-2, 0)];
    const I_UPRIGHT: Offsets = [(0, 0), (0, -1), (0, -2), (0, 1)];
    const O: Offsets = [(0, 0), (-1, 0), (0, 1), (-1, 1)];
    const S_FLAT: Offsets = [(0, 0), (1, 0), (0, 1), (-1, 1)];
    const S_UPRIGHT: Offsets = [(0, 0), (0, -1), (1, 0), (1, 1)];
    const Z_FLAT: Offsets = [(0, 0), (-1, 0), (0, 1), (1, 1)];
    const Z_UPRIGHT: Offsets = [(0, 0), (0, -1), (-1, 0), (-1, 1)];
    [
        [I_FLAT, I_UPRIGHT, I_FLAT, I_UPRIGHT],
        [O, O, O, O],
        [S_FLAT, S_UPRIGHT, S_FLAT, S_UPRIGHT],
        [Z_FLAT, Z_UPRIGHT, Z_FLAT, Z_UPRIGHT],
        // T
        [
            [(0, 0), (-1, 0), (1, 0), (0, 1)],
            [(0, 0), (0, 1), (0, -1), (1, 0)],
            [(0, 0), (-1, 0), (1, 0), (0, -1)],
            [(0, 0), (0, 1), (0, -1), (-1, 0)],
        ],
        // L
        [
            [(0, 0), (0, -1), (0, -2), (1, 0)],
            [(0, 0), (0, -1), (-1, 0), (-2, 0)],
            [(0, 0), (0, 1), (0, 2), (-1, 0)],
            [(0, 0), (0, 1), (1, 0), (2, 0)],
        ],
        // J
        [
            [(0, 0), (0, -1), (0, -2), (-1, 0)],
            [(0, 0), (0, 1), (-1, 0), (-2, 0)],
            [(0, 0), (0, 1), (0, 2), (1, 0)],
            [(0, 0), (0, -1), (1, 0), (2, 0)],
        ],
    ]
};

impl PieceKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::S, Self::Z, Self::T, Self::L, Self::J];

    /// 4 cells relative to the anchor for the given rotation; each (dx, dy).
    pub fn offsets(self, rotation: Rotation) -> &'static Offsets {
        &GEOMETRY[self as usize][rotation.index()]
    }

    pub fn name(self) -> char {
        match self {
            Self::I => 'I',
            Self::O => 'O',
            Self::S => 'S',
            Self::Z => 'Z',
            Self::T => 'T',
            Self::L => 'L',
            Self::J => 'J',
        }
    }
}

/// Rotation in 90° steps, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Self; 4] = [Self::R0, Self::R90, Self::R180, Self::R270];

    pub fn degrees(self) -> u16 {
        self.index() as u16 * 90
    }

    /// Next state clockwise, wrapping 270 → 0.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % 4]
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Fixed block palette. Mapped to terminal colours by the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockColor {
    Red,
    Blue,
    Green,
    Yellow,
}

impl BlockColor {
    pub const ALL: [Self; 4] = [Self::Red, Self::Blue, Self::Green, Self::Yellow];

    /// Index into `Theme::blocks`.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Hypothetical placement used to preview a move without touching the piece.
/// Unset fields fall back to the piece's own values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Override {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub rotation: Option<Rotation>,
}

impl Override {
    pub fn x(x: i32) -> Self {
        Self {
            x: Some(x),
            ..Self::default()
        }
    }

    pub fn y(y: i32) -> Self {
        Self {
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn rotation(rotation: Rotation) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }
}

/// The falling piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: BlockColor,
    pub anchor: Cell,
    pub rotation: Rotation,
}

impl Piece {
    pub fn new(kind: PieceKind, color: BlockColor, anchor: Cell) -> Self {
        Self {
            kind,
            color,
            anchor,
            rotation: Rotation::R0,
        }
    }

    /// Absolute cells at the current position and rotation.
    pub fn cells(&self) -> [Cell; 4] {
        self.cells_with(Override::default())
    }

    /// Absolute cells the piece would occupy under `ov`.
    pub fn cells_with(&self, ov: Override) -> [Cell; 4] {
        let anchor = Cell::new(ov.x.unwrap_or(self.anchor.x), ov.y.unwrap_or(self.anchor.y));
        let offsets = *self.kind.offsets(ov.rotation.unwrap_or(self.rotation));
        offsets.map(|(dx, dy)| anchor.offset(dx, dy))
    }
}

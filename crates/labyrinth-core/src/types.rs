use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::board::BoardError;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 1,
    East = 2,
    South = 4,
    West = 8,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    pub const fn bit(self) -> u8 {
        self as u8
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Row and column delta of one step in this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (-1, 0),
            Self::East => (0, 1),
            Self::South => (1, 0),
            Self::West => (0, -1),
        }
    }
}

/// Clockwise orientation of a card.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0 = 0,
    R90 = 1,
    R180 = 2,
    R270 = 3,
}

impl Rotation {
    pub const ALL: [Self; 4] = [Self::R0, Self::R90, Self::R180, Self::R270];

    pub const fn quarter_turns(self) -> u8 {
        self as u8
    }

    pub const fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Self::R0,
            1 => Self::R90,
            2 => Self::R180,
            _ => Self::R270,
        }
    }

    pub const fn degrees(self) -> i16 {
        self as i16 * 90
    }

    pub const fn from_degrees(degrees: i16) -> Option<Self> {
        match degrees {
            0 => Some(Self::R0),
            90 => Some(Self::R90),
            180 => Some(Self::R180),
            270 => Some(Self::R270),
            _ => None,
        }
    }
}

impl TryFrom<i16> for Rotation {
    type Error = BoardError;

    fn try_from(degrees: i16) -> Result<Self, Self::Error> {
        Self::from_degrees(degrees).ok_or(BoardError::InvalidRotation(degrees))
    }
}

/// Canonical card shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Straight,
    Corner,
    TJunction,
    Cross,
}

impl Shape {
    pub const ALL: [Self; 4] = [Self::Straight, Self::Corner, Self::TJunction, Self::Cross];

    pub const fn out_paths(self) -> OutPaths {
        match self {
            Self::Straight => OutPaths::STRAIGHT,
            Self::Corner => OutPaths::CORNER,
            Self::TJunction => OutPaths::T_JUNCTION,
            Self::Cross => OutPaths::CROSS,
        }
    }

    pub const fn code(self) -> char {
        match self {
            Self::Straight => 'I',
            Self::Corner => 'L',
            Self::TJunction => 'T',
            Self::Cross => 'X',
        }
    }

    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'I' => Some(Self::Straight),
            'L' => Some(Self::Corner),
            'T' => Some(Self::TJunction),
            'X' => Some(Self::Cross),
            _ => None,
        }
    }
}

/// Bitmask of open sides, N=1 E=2 S=4 W=8.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OutPaths(u8);

impl OutPaths {
    pub const STRAIGHT: Self = Self(1 | 4);
    pub const CORNER: Self = Self(1 | 2);
    /// Open to east, south and west; closed to the north.
    pub const T_JUNCTION: Self = Self(2 | 4 | 8);
    pub const CROSS: Self = Self(0x0F);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub const fn rotated(self, rotation: Rotation) -> Self {
        let turns = rotation.quarter_turns();
        if turns == 0 {
            return self;
        }
        Self(((self.0 << turns) | (self.0 >> (4 - turns))) & 0x0F)
    }

    pub fn shape(self) -> Option<Shape> {
        match self.0.count_ones() {
            4 => Some(Shape::Cross),
            3 => Some(Shape::TJunction),
            2 if self.0 == 0b0101 || self.0 == 0b1010 => Some(Shape::Straight),
            2 => Some(Shape::Corner),
            _ => None,
        }
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub out_paths: OutPaths,
    pub rotation: Rotation,
}

impl Card {
    pub const fn new(id: CardId, out_paths: OutPaths, rotation: Rotation) -> Self {
        Self {
            id,
            out_paths,
            rotation,
        }
    }

    pub const fn with_rotation(self, rotation: Rotation) -> Self {
        Self { rotation, ..self }
    }

    /// Open sides after applying the card's rotation.
    pub const fn effective(self) -> OutPaths {
        self.out_paths.rotated(self.rotation)
    }

    pub const fn connects(self, direction: Direction) -> bool {
        self.effective().contains(direction)
    }

    pub fn shape(self) -> Option<Shape> {
        self.out_paths.shape()
    }

    /// Rotations that produce pairwise different open sides: one for a cross,
    /// two for a straight, four otherwise.
    pub fn distinguishable_rotations(self) -> ArrayVec<Rotation, 4> {
        let mut seen = ArrayVec::<OutPaths, 4>::new();
        let mut rotations = ArrayVec::new();
        for rotation in Rotation::ALL {
            let mask = self.out_paths.rotated(rotation);
            if !seen.contains(&mask) {
                seen.push(mask);
                rotations.push(rotation);
            }
        }
        rotations
    }
}

/// Hands out card identifiers for one grid construction.
#[derive(Debug, Clone, Default)]
pub struct CardIdFactory {
    next: u32,
}

impl CardIdFactory {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    pub const fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> CardId {
        let id = CardId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    pub fn card(&mut self, out_paths: OutPaths, rotation: Rotation) -> Card {
        Card::new(self.next_id(), out_paths, rotation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: u8,
    pub column: u8,
}

impl Location {
    pub const fn new(row: u8, column: u8) -> Self {
        Self { row, column }
    }

    /// Parses `row-column`.
    pub fn parse(input: &str) -> Option<Self> {
        let (row, column) = input.split_once('-')?;
        let row = row.parse::<u8>().ok()?;
        let column = column.parse::<u8>().ok()?;
        Some(Self::new(row, column))
    }

    pub const fn manhattan(self, other: Self) -> u32 {
        self.row.abs_diff(other.row) as u32 + self.column.abs_diff(other.column) as u32
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.column)
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub card: CardId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftAction {
    pub location: Location,
    pub rotation: Rotation,
}

impl ShiftAction {
    pub const fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveAction {
    pub location: Location,
}

impl MoveAction {
    pub const fn new(location: Location) -> Self {
        Self { location }
    }
}

/// One ply: a shift followed by a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub shift: ShiftAction,
    #[serde(rename = "move")]
    pub move_to: MoveAction,
}

impl Action {
    pub const fn new(shift: ShiftAction, move_to: MoveAction) -> Self {
        Self { shift, move_to }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shift {}@{} move {}",
            self.shift.location,
            self.shift.rotation.degrees(),
            self.move_to.location
        )
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Score(pub i32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_turns_sides_clockwise() {
        let corner = OutPaths::CORNER;
        assert_eq!(corner.rotated(Rotation::R90).bits(), 2 | 4);
        assert_eq!(corner.rotated(Rotation::R180).bits(), 4 | 8);
        assert_eq!(corner.rotated(Rotation::R270).bits(), 8 | 1);
    }

    #[test]
    fn distinguishable_rotation_counts_follow_shape() {
        let mut ids = CardIdFactory::new();
        let count = |shape: Shape, ids: &mut CardIdFactory| {
            ids.card(shape.out_paths(), Rotation::R0)
                .distinguishable_rotations()
                .len()
        };
        assert_eq!(count(Shape::Cross, &mut ids), 1);
        assert_eq!(count(Shape::Straight, &mut ids), 2);
        assert_eq!(count(Shape::Corner, &mut ids), 4);
        assert_eq!(count(Shape::TJunction, &mut ids), 4);
    }

    #[test]
    fn shape_is_rotation_invariant() {
        for shape in Shape::ALL {
            for rotation in Rotation::ALL {
                assert_eq!(shape.out_paths().rotated(rotation).shape(), Some(shape));
            }
        }
    }

    #[test]
    fn rotation_degrees_conversion() {
        for rotation in Rotation::ALL {
            assert_eq!(Rotation::try_from(rotation.degrees()), Ok(rotation));
        }
        assert_eq!(Rotation::try_from(45), Err(BoardError::InvalidRotation(45)));
        assert_eq!(Rotation::from_degrees(-90), None);
    }

    #[test]
    fn parse_location() {
        assert_eq!(Location::parse("0-2"), Some(Location::new(0, 2)));
        assert_eq!(Location::parse("6-6"), Some(Location::new(6, 6)));
        assert_eq!(Location::parse("-1-2"), None);
        assert_eq!(Location::parse("bad"), None);
    }

    #[test]
    fn card_id_factory_is_sequential() {
        let mut ids = CardIdFactory::starting_at(7);
        assert_eq!(ids.next_id(), CardId(7));
        assert_eq!(ids.next_id(), CardId(8));
    }
}

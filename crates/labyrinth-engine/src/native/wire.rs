//! `#[repr(C)]` records exchanged with natively compiled engines.

use labyrinth_core::{
    Action, Board, BoardError, Card, CardId, Grid, Location, MoveAction, OutPaths, Rotation,
    ShiftAction, Token, TokenId, MAX_EXTENT, MIN_EXTENT,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("null pointer in native records")]
    NullPointer,
    #[error("invalid extent {0}")]
    InvalidExtent(i32),
    #[error("expected {expected} nodes, received {actual}")]
    NodeCount { expected: usize, actual: usize },
    #[error("invalid location ({0}, {1})")]
    InvalidLocation(i16, i16),
    #[error("invalid rotation {0}")]
    InvalidRotation(i16),
    #[error("objective {0} is not on the board")]
    UnknownObjective(u32),
    #[error("board error")]
    Board(#[from] BoardError),
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireNode {
    pub identifier: u32,
    /// N=1, E=2, S=4, W=8, before rotation.
    pub out_paths: u8,
    /// Clockwise degrees.
    pub rotation: i16,
}

impl From<Card> for WireNode {
    fn from(card: Card) -> Self {
        Self {
            identifier: card.id.0,
            out_paths: card.out_paths.bits(),
            rotation: card.rotation.degrees(),
        }
    }
}

impl TryFrom<WireNode> for Card {
    type Error = WireError;

    fn try_from(node: WireNode) -> Result<Self, Self::Error> {
        let rotation =
            Rotation::from_degrees(node.rotation).ok_or(WireError::InvalidRotation(node.rotation))?;
        Ok(Card::new(
            CardId(node.identifier),
            OutPaths::from_bits(node.out_paths),
            rotation,
        ))
    }
}

/// Row-major nodes followed by one leftover node.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WireGraph {
    pub extent: i32,
    pub count: u32,
    pub nodes: *const WireNode,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLocation {
    pub row: i16,
    pub column: i16,
}

impl WireLocation {
    pub const NONE: Self = Self { row: -1, column: -1 };

    pub const fn is_none(self) -> bool {
        self.row == -1 && self.column == -1
    }

    pub fn to_location(self) -> Result<Option<Location>, WireError> {
        if self.is_none() {
            return Ok(None);
        }
        let row = u8::try_from(self.row).map_err(|_| WireError::InvalidLocation(self.row, self.column))?;
        let column =
            u8::try_from(self.column).map_err(|_| WireError::InvalidLocation(self.row, self.column))?;
        Ok(Some(Location::new(row, column)))
    }
}

impl From<Location> for WireLocation {
    fn from(location: Location) -> Self {
        Self {
            row: i16::from(location.row),
            column: i16::from(location.column),
        }
    }
}

impl From<Option<Location>> for WireLocation {
    fn from(location: Option<Location>) -> Self {
        location.map_or(Self::NONE, Self::from)
    }
}

/// Token locations, the acting token first.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WireMultiLocation {
    pub locations: *const WireLocation,
    pub count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireAction {
    /// `WireLocation::NONE` when the engine found nothing.
    pub shift: WireLocation,
    pub rotation: i16,
    pub move_to: WireLocation,
}

impl WireAction {
    pub const NONE: Self = Self {
        shift: WireLocation::NONE,
        rotation: 0,
        move_to: WireLocation::NONE,
    };

    pub fn to_action(self) -> Result<Option<Action>, WireError> {
        let Some(shift) = self.shift.to_location()? else {
            return Ok(None);
        };
        let rotation =
            Rotation::from_degrees(self.rotation).ok_or(WireError::InvalidRotation(self.rotation))?;
        let target = self
            .move_to
            .to_location()?
            .ok_or(WireError::InvalidLocation(self.move_to.row, self.move_to.column))?;
        Ok(Some(Action::new(
            ShiftAction::new(shift, rotation),
            MoveAction::new(target),
        )))
    }
}

impl From<Option<Action>> for WireAction {
    fn from(action: Option<Action>) -> Self {
        match action {
            Some(action) => Self {
                shift: action.shift.location.into(),
                rotation: action.shift.rotation.degrees(),
                move_to: action.move_to.location.into(),
            },
            None => Self::NONE,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireStatus {
    pub depth: u8,
    pub terminated: bool,
}

/// Owned record buffers for one call; the raw views borrow from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBoard {
    extent: i32,
    nodes: Vec<WireNode>,
    locations: Vec<WireLocation>,
    objective: u32,
    previous_shift: WireLocation,
}

impl EncodedBoard {
    pub fn encode(board: &Board, acting: TokenId) -> Result<Self, WireError> {
        let grid = board.grid();
        let acting_location = board
            .token_location(acting)
            .ok_or(BoardError::UnknownToken(acting.0))?;

        let mut nodes = grid.cards().iter().copied().map(WireNode::from).collect::<Vec<_>>();
        nodes.push(board.leftover().into());

        let mut locations = vec![WireLocation::from(acting_location)];
        locations.extend(
            board
                .tokens()
                .iter()
                .filter(|token| token.id != acting)
                .filter_map(|token| grid.locate(token.card))
                .map(WireLocation::from),
        );

        Ok(Self {
            extent: grid.extent() as i32,
            nodes,
            locations,
            objective: board.objective().0,
            previous_shift: board.previous_shift().into(),
        })
    }

    pub fn graph(&self) -> WireGraph {
        WireGraph {
            extent: self.extent,
            count: self.nodes.len() as u32,
            nodes: self.nodes.as_ptr(),
        }
    }

    pub fn multi_location(&self) -> WireMultiLocation {
        WireMultiLocation {
            locations: self.locations.as_ptr(),
            count: self.locations.len() as u32,
        }
    }

    pub const fn objective(&self) -> u32 {
        self.objective
    }

    pub const fn previous_shift(&self) -> WireLocation {
        self.previous_shift
    }

    pub fn decode(&self) -> Result<Board, WireError> {
        decode_records(
            self.extent,
            &self.nodes,
            &self.locations,
            self.objective,
            self.previous_shift,
        )
    }
}

/// Rebuilds a board from record slices. Token `i` stands on `locations[i]`.
pub fn decode_records(
    extent: i32,
    nodes: &[WireNode],
    locations: &[WireLocation],
    objective: u32,
    previous_shift: WireLocation,
) -> Result<Board, WireError> {
    let size = usize::try_from(extent)
        .ok()
        .filter(|size| (MIN_EXTENT..=MAX_EXTENT).contains(size) && size % 2 == 1)
        .ok_or(WireError::InvalidExtent(extent))?;
    if nodes.len() != size * size + 1 {
        return Err(WireError::NodeCount {
            expected: size * size + 1,
            actual: nodes.len(),
        });
    }

    let cards = nodes
        .iter()
        .map(|node| Card::try_from(*node))
        .collect::<Result<Vec<_>, _>>()?;
    let (leftover, cards) = match cards.split_last() {
        Some((leftover, cards)) => (*leftover, cards.to_vec()),
        None => return Err(WireError::NodeCount { expected: size * size + 1, actual: 0 }),
    };
    let grid = Grid::new(size, cards).map_err(BoardError::from)?;

    let objective = CardId(objective);
    if leftover.id != objective && grid.locate(objective).is_none() {
        return Err(WireError::UnknownObjective(objective.0));
    }

    let mut tokens = Vec::with_capacity(locations.len());
    for (index, wire) in locations.iter().enumerate() {
        let location = wire
            .to_location()?
            .ok_or(WireError::InvalidLocation(wire.row, wire.column))?;
        let card = grid
            .get(location)
            .ok_or(WireError::InvalidLocation(wire.row, wire.column))?;
        tokens.push(Token {
            id: TokenId(index as u8),
            card: card.id,
        });
    }

    let previous_shift = previous_shift.to_location()?;
    Ok(Board::new(grid, leftover, objective, tokens)?.with_previous_shift(previous_shift))
}

/// Reads native records through raw pointers.
///
/// # Safety
///
/// Non-null pointers must point to valid records; `graph.nodes` must hold
/// `graph.count` nodes and `locations.locations` must hold `locations.count`
/// entries, all alive for the duration of the call.
pub unsafe fn decode_board(
    graph: *const WireGraph,
    locations: *const WireMultiLocation,
    objective: u32,
    previous_shift: *const WireLocation,
) -> Result<Board, WireError> {
    let graph = graph.as_ref().ok_or(WireError::NullPointer)?;
    let multi = locations.as_ref().ok_or(WireError::NullPointer)?;
    if graph.nodes.is_null() || (multi.count > 0 && multi.locations.is_null()) {
        return Err(WireError::NullPointer);
    }

    let nodes = std::slice::from_raw_parts(graph.nodes, graph.count as usize);
    let tokens = if multi.count == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(multi.locations, multi.count as usize)
    };
    let previous_shift = previous_shift.as_ref().copied().unwrap_or(WireLocation::NONE);

    decode_records(graph.extent, nodes, tokens, objective, previous_shift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labyrinth_core::{parse_board, CLASSIC_POSITION};

    #[test]
    fn record_layouts_are_stable() {
        assert_eq!(std::mem::size_of::<WireNode>(), 8);
        assert_eq!(std::mem::size_of::<WireLocation>(), 4);
        assert_eq!(std::mem::size_of::<WireAction>(), 10);
        assert_eq!(std::mem::size_of::<WireStatus>(), 2);
    }

    #[test]
    fn acting_token_is_encoded_first() {
        let board = parse_board(CLASSIC_POSITION).unwrap();
        let encoded = EncodedBoard::encode(&board, TokenId(1)).unwrap();

        assert_eq!(encoded.locations[0], WireLocation { row: 6, column: 6 });
        assert_eq!(encoded.locations[1], WireLocation { row: 0, column: 0 });
        assert_eq!(encoded.nodes.len(), 50);
        assert_eq!(encoded.previous_shift(), WireLocation::NONE);
    }

    #[test]
    fn negative_locations_other_than_none_are_rejected() {
        assert_eq!(
            WireLocation { row: -1, column: 3 }.to_location(),
            Err(WireError::InvalidLocation(-1, 3))
        );
        assert_eq!(WireLocation::NONE.to_location(), Ok(None));
    }
}

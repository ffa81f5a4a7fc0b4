use std::ops::{Deref, DerefMut};

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::grid::{Grid, GridError};
use crate::reachability::ReachabilityGraph;
use crate::types::{Card, CardId, Location, Rotation, ShiftAction, Token, TokenId};

pub const MAX_TOKENS: usize = 64;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    #[error("{0} is not an insertion location")]
    InvalidInsertionLocation(Location),
    #[error("invalid rotation {0}, expected 0, 90, 180 or 270")]
    InvalidRotation(i16),
    #[error("{0} is not reachable")]
    UnreachableLocation(Location),
    #[error("shifting at {0} would push back the previous shift")]
    NoPushback(Location),
    #[error("unknown token {0}")]
    UnknownToken(u8),
    #[error("token {0} is not on the grid")]
    TokenOffGrid(u8),
    #[error("{0} is outside the grid")]
    OffGrid(Location),
    #[error("objective card {0} is neither on the grid nor the leftover")]
    UnknownObjective(u32),
    #[error("at most 64 tokens are supported, got {0}")]
    TooManyTokens(usize),
    #[error("grid error")]
    Grid(#[from] GridError),
}

/// What a shift changed, enough to restore the board exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftUndo {
    pub location: Location,
    pub opposite: Location,
    pub ejected_rotation: Rotation,
    pub leftover_rotation: Rotation,
    pub previous_shift: Option<Location>,
    rehomed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveUndo {
    pub token: TokenId,
    pub from: Location,
    index: usize,
    card: CardId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: Location,
    pub to: Location,
    pub reached_objective: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    grid: Grid,
    leftover: Card,
    objective: CardId,
    tokens: Vec<Token>,
    previous_shift: Option<Location>,
}

impl Board {
    pub fn new(
        grid: Grid,
        leftover: Card,
        objective: CardId,
        tokens: Vec<Token>,
    ) -> Result<Self, BoardError> {
        if tokens.len() > MAX_TOKENS {
            return Err(BoardError::TooManyTokens(tokens.len()));
        }
        if leftover.id != objective && grid.locate(objective).is_none() {
            return Err(BoardError::UnknownObjective(objective.0));
        }
        if let Some(token) = tokens.iter().find(|token| grid.locate(token.card).is_none()) {
            return Err(BoardError::TokenOffGrid(token.id.0));
        }

        Ok(Self {
            grid,
            leftover,
            objective,
            tokens,
            previous_shift: None,
        })
    }

    pub fn with_previous_shift(mut self, previous_shift: Option<Location>) -> Self {
        self.previous_shift = previous_shift;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub const fn leftover(&self) -> Card {
        self.leftover
    }

    pub const fn objective(&self) -> CardId {
        self.objective
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub const fn previous_shift(&self) -> Option<Location> {
        self.previous_shift
    }

    pub fn set_previous_shift(&mut self, previous_shift: Option<Location>) {
        self.previous_shift = previous_shift;
    }

    pub fn token(&self, id: TokenId) -> Option<Token> {
        self.tokens.iter().copied().find(|token| token.id == id)
    }

    pub fn token_location(&self, id: TokenId) -> Option<Location> {
        self.token(id).and_then(|token| self.grid.locate(token.card))
    }

    /// `None` while the objective is the leftover card.
    pub fn objective_location(&self) -> Option<Location> {
        self.grid.locate(self.objective)
    }

    pub fn is_objective_leftover(&self) -> bool {
        self.leftover.id == self.objective
    }

    pub fn is_on_objective(&self, id: TokenId) -> bool {
        self.token(id).is_some_and(|token| token.card == self.objective)
    }

    /// Whether inserting at `location` would undo the previous shift.
    pub fn is_pushback(&self, location: Location) -> bool {
        self.previous_shift
            .and_then(|previous| self.grid.opposing_insertion_location(previous))
            == Some(location)
    }

    pub fn legal_shift_locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.grid
            .insertion_locations()
            .iter()
            .copied()
            .filter(|&location| !self.is_pushback(location))
    }

    pub fn opposing_insertion_location(&self, location: Location) -> Option<Location> {
        self.grid.opposing_insertion_location(location)
    }

    pub fn shift(&mut self, action: ShiftAction) -> Result<ShiftUndo, BoardError> {
        if !self.grid.is_insertion_location(action.location) {
            return Err(BoardError::InvalidInsertionLocation(action.location));
        }
        if self.is_pushback(action.location) {
            return Err(BoardError::NoPushback(action.location));
        }
        self.force_shift(action)
    }

    /// Shifts without the no-pushback check.
    pub fn force_shift(&mut self, action: ShiftAction) -> Result<ShiftUndo, BoardError> {
        let opposite = self
            .grid
            .opposing_insertion_location(action.location)
            .ok_or(BoardError::InvalidInsertionLocation(action.location))?;

        let leftover_rotation = self.leftover.rotation;
        let inserted = self.leftover.with_rotation(action.rotation);
        let ejected = self.grid.shift_line(action.location, inserted);

        let mut rehomed = 0u64;
        for (index, token) in self.tokens.iter_mut().enumerate() {
            if token.card == ejected.id {
                token.card = inserted.id;
                rehomed |= 1 << index;
            }
        }

        self.leftover = ejected;
        let undo = ShiftUndo {
            location: action.location,
            opposite,
            ejected_rotation: ejected.rotation,
            leftover_rotation,
            previous_shift: self.previous_shift,
            rehomed,
        };
        self.previous_shift = Some(action.location);
        Ok(undo)
    }

    pub fn unshift(&mut self, undo: ShiftUndo) {
        let returning = self.leftover.with_rotation(undo.ejected_rotation);
        let inserted = self.grid.shift_line(undo.opposite, returning);
        self.leftover = inserted.with_rotation(undo.leftover_rotation);

        for (index, token) in self.tokens.iter_mut().enumerate() {
            if undo.rehomed & (1 << index) != 0 {
                token.card = returning.id;
            }
        }
        self.previous_shift = undo.previous_shift;
    }

    /// Sets the rotation of the card at `location`, returning the old one.
    pub fn rotate_card(
        &mut self,
        location: Location,
        rotation: Rotation,
    ) -> Result<Rotation, BoardError> {
        let card = self
            .grid
            .get_mut(location)
            .ok_or(BoardError::OffGrid(location))?;
        Ok(std::mem::replace(&mut card.rotation, rotation))
    }

    /// Moves a token along open corridors. Reaching the objective assigns a
    /// new one, drawn uniformly from the on-grid cards no token stands on.
    pub fn move_token<R: Rng + ?Sized>(
        &mut self,
        id: TokenId,
        target: Location,
        rng: &mut R,
    ) -> Result<MoveOutcome, BoardError> {
        let index = self.token_index(id)?;
        let from = self
            .grid
            .locate(self.tokens[index].card)
            .ok_or(BoardError::TokenOffGrid(id.0))?;
        let card = self
            .grid
            .get(target)
            .ok_or(BoardError::OffGrid(target))?
            .id;
        if !ReachabilityGraph::new(&self.grid).is_reachable(from, target) {
            return Err(BoardError::UnreachableLocation(target));
        }

        self.tokens[index].card = card;
        let reached_objective = card == self.objective;
        if reached_objective {
            self.reassign_objective(rng);
        }

        Ok(MoveOutcome {
            from,
            to: target,
            reached_objective,
        })
    }

    /// Moves a token without checking reachability or touching the objective.
    pub fn place_token(&mut self, id: TokenId, target: Location) -> Result<MoveUndo, BoardError> {
        let index = self.token_index(id)?;
        let previous = self.tokens[index].card;
        let from = self
            .grid
            .locate(previous)
            .ok_or(BoardError::TokenOffGrid(id.0))?;
        let card = self
            .grid
            .get(target)
            .ok_or(BoardError::OffGrid(target))?
            .id;

        self.tokens[index].card = card;
        Ok(MoveUndo {
            token: id,
            from,
            index,
            card: previous,
        })
    }

    pub fn unplace_token(&mut self, undo: MoveUndo) {
        self.tokens[undo.index].card = undo.card;
    }

    /// Forced shift that is undone when the guard drops.
    pub fn scoped_shift(&mut self, action: ShiftAction) -> Result<ScopedShift<'_>, BoardError> {
        let undo = self.force_shift(action)?;
        Ok(ScopedShift { board: self, undo })
    }

    pub fn scoped_move(&mut self, id: TokenId, target: Location) -> Result<ScopedMove<'_>, BoardError> {
        let undo = self.place_token(id, target)?;
        Ok(ScopedMove { board: self, undo })
    }

    /// Replays a line of forced shifts, undoing all of them in reverse order
    /// when the guard drops.
    pub fn scoped_shifts(&mut self, actions: &[ShiftAction]) -> Result<ScopedShifts<'_>, BoardError> {
        let mut guard = ScopedShifts {
            board: self,
            undos: Vec::with_capacity(actions.len()),
        };
        for &action in actions {
            let undo = guard.board.force_shift(action)?;
            guard.undos.push(undo);
        }
        Ok(guard)
    }

    fn token_index(&self, id: TokenId) -> Result<usize, BoardError> {
        self.tokens
            .iter()
            .position(|token| token.id == id)
            .ok_or(BoardError::UnknownToken(id.0))
    }

    fn reassign_objective<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let candidates = self
            .grid
            .cards()
            .iter()
            .map(|card| card.id)
            .filter(|id| self.tokens.iter().all(|token| token.card != *id))
            .collect::<Vec<_>>();
        if let Some(&objective) = candidates.choose(rng) {
            debug!("objective moves from card {} to card {}", self.objective.0, objective.0);
            self.objective = objective;
        }
    }
}

pub struct ScopedShift<'a> {
    board: &'a mut Board,
    undo: ShiftUndo,
}

impl ScopedShift<'_> {
    pub fn undo(&self) -> &ShiftUndo {
        &self.undo
    }

    /// Turns the freshly inserted card; the original leftover rotation still
    /// comes back on drop.
    pub fn rotate_inserted(&mut self, rotation: Rotation) {
        if let Some(card) = self.board.grid.get_mut(self.undo.location) {
            card.rotation = rotation;
        }
    }
}

impl Deref for ScopedShift<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        self.board
    }
}

impl DerefMut for ScopedShift<'_> {
    fn deref_mut(&mut self) -> &mut Board {
        self.board
    }
}

impl Drop for ScopedShift<'_> {
    fn drop(&mut self) {
        self.board.unshift(self.undo);
    }
}

pub struct ScopedMove<'a> {
    board: &'a mut Board,
    undo: MoveUndo,
}

impl ScopedMove<'_> {
    pub fn undo(&self) -> &MoveUndo {
        &self.undo
    }
}

impl Deref for ScopedMove<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        self.board
    }
}

impl DerefMut for ScopedMove<'_> {
    fn deref_mut(&mut self) -> &mut Board {
        self.board
    }
}

impl Drop for ScopedMove<'_> {
    fn drop(&mut self) {
        self.board.unplace_token(self.undo);
    }
}

pub struct ScopedShifts<'a> {
    board: &'a mut Board,
    undos: Vec<ShiftUndo>,
}

impl Deref for ScopedShifts<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        self.board
    }
}

impl DerefMut for ScopedShifts<'_> {
    fn deref_mut(&mut self) -> &mut Board {
        self.board
    }
}

impl Drop for ScopedShifts<'_> {
    fn drop(&mut self) {
        while let Some(undo) = self.undos.pop() {
            self.board.unshift(undo);
        }
    }
}

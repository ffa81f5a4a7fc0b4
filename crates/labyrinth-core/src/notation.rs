use std::fmt::Write as _;

use thiserror::Error;

use crate::board::{Board, BoardError};
use crate::grid::{Grid, GridError};
use crate::types::{Card, CardIdFactory, Location, OutPaths, Rotation, Shape, Token, TokenId};

/// 7x7 tournament-sized position with both tokens in opposite corners.
pub const CLASSIC_POSITION: &str = "L1I1T0L2T0I1L2/I0L3X0I1T2L0I0/T3I1T3L1T0I0T1/L0T2I0X0I1L3I0/T3L2T2I1T1X0T1/I0L1I1T3L0I0L3/L0I1T2I0T2L1L3 T0 3-3 0-0,6-6 -";
/// The token already has an open corridor to the objective.
pub const CORRIDOR_POSITION: &str = "L1I1L2/I0X0I0/L0I1L3 I0 0-2 0-0 -";
/// The token is walled in and can only get out by shifting its own row.
pub const SELF_DISPLACEMENT_POSITION: &str = "L0I1L2/I0L0X0/L1I1L3 I0 1-2 1-0 -";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("expected 5 fields, received {0}")]
    FieldCount(usize),
    #[error("expected {expected} cards in row {row}, received {actual}")]
    RowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("invalid card code {0:?}")]
    InvalidCard(String),
    #[error("invalid location {0:?}")]
    InvalidLocation(String),
    #[error("board error")]
    Board(#[from] BoardError),
    #[error("grid error")]
    Grid(#[from] GridError),
}

/// Parses `rows leftover objective tokens previous-shift`.
///
/// Cards are written as a shape letter (`I`, `L`, `T`, `X`) followed by the
/// number of clockwise quarter turns; `?` plus a hex side mask stands in for
/// the letter when the open sides are not a canonical shape. The objective is
/// a location or `*` for the leftover. Tokens are a comma-separated list of
/// locations, numbered in order, or `-` for none.
pub fn parse_board(notation: &str) -> Result<Board, NotationError> {
    parse_board_with(notation, &mut CardIdFactory::new())
}

pub fn parse_board_with(notation: &str, ids: &mut CardIdFactory) -> Result<Board, NotationError> {
    let fields = notation.split_whitespace().collect::<Vec<_>>();
    if fields.len() != 5 {
        return Err(NotationError::FieldCount(fields.len()));
    }

    let rows = fields[0].split('/').collect::<Vec<_>>();
    let extent = rows.len();
    let mut shapes = Vec::with_capacity(extent * extent);
    for (row, text) in rows.iter().enumerate() {
        let cards = parse_cards(text)?;
        if cards.len() != extent {
            return Err(NotationError::RowLength {
                row,
                expected: extent,
                actual: cards.len(),
            });
        }
        shapes.extend(cards);
    }
    let grid = Grid::from_shapes(extent, shapes, ids)?;

    let leftover = match parse_cards(fields[1])?.as_slice() {
        [(out_paths, rotation)] => ids.card(*out_paths, *rotation),
        _ => return Err(NotationError::InvalidCard(fields[1].to_string())),
    };

    let objective = if fields[2] == "*" {
        leftover.id
    } else {
        let location = parse_location(fields[2])?;
        grid.get(location).ok_or(BoardError::OffGrid(location))?.id
    };

    let mut tokens = Vec::new();
    if fields[3] != "-" {
        for (index, text) in fields[3].split(',').enumerate() {
            let location = parse_location(text)?;
            let card = grid.get(location).ok_or(BoardError::OffGrid(location))?.id;
            tokens.push(Token {
                id: TokenId(index as u8),
                card,
            });
        }
    }

    let previous_shift = match fields[4] {
        "-" => None,
        text => Some(parse_location(text)?),
    };

    Ok(Board::new(grid, leftover, objective, tokens)?.with_previous_shift(previous_shift))
}

pub fn encode_board(board: &Board) -> String {
    let grid = board.grid();
    let mut out = String::new();
    for (index, card) in grid.cards().iter().enumerate() {
        if index > 0 && index % grid.extent() == 0 {
            out.push('/');
        }
        push_card(&mut out, card);
    }

    out.push(' ');
    push_card(&mut out, &board.leftover());

    out.push(' ');
    match board.objective_location() {
        Some(location) => {
            let _ = write!(out, "{location}");
        }
        None => out.push('*'),
    }

    out.push(' ');
    let tokens = board
        .tokens()
        .iter()
        .filter_map(|token| grid.locate(token.card))
        .map(|location| location.to_string())
        .collect::<Vec<_>>();
    if tokens.is_empty() {
        out.push('-');
    } else {
        out.push_str(&tokens.join(","));
    }

    out.push(' ');
    match board.previous_shift() {
        Some(location) => {
            let _ = write!(out, "{location}");
        }
        None => out.push('-'),
    }
    out
}

fn push_card(out: &mut String, card: &Card) {
    match card.shape() {
        Some(shape) if shape.out_paths() == card.out_paths => out.push(shape.code()),
        _ => {
            let _ = write!(out, "?{:x}", card.out_paths.bits());
        }
    }
    out.push(char::from(b'0' + card.rotation.quarter_turns()));
}

fn parse_cards(text: &str) -> Result<Vec<(OutPaths, Rotation)>, NotationError> {
    let invalid = || NotationError::InvalidCard(text.to_string());
    let mut cards = Vec::new();
    let mut chars = text.chars();

    while let Some(code) = chars.next() {
        let out_paths = if code == '?' {
            let mask = chars.next().and_then(|c| c.to_digit(16)).ok_or_else(invalid)?;
            OutPaths::from_bits(mask as u8)
        } else {
            Shape::from_code(code).ok_or_else(invalid)?.out_paths()
        };
        let turns = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .filter(|turns| *turns < 4)
            .ok_or_else(invalid)?;
        cards.push((out_paths, Rotation::from_quarter_turns(turns as u8)));
    }

    Ok(cards)
}

fn parse_location(text: &str) -> Result<Location, NotationError> {
    Location::parse(text).ok_or_else(|| NotationError::InvalidLocation(text.to_string()))
}

pub mod board;
pub mod eval;
pub mod grid;
pub mod location_set;
pub mod notation;
pub mod reachability;
pub mod rotatable;
pub mod search;
pub mod types;

pub use board::{
    Board, BoardError, MoveOutcome, MoveUndo, ScopedMove, ScopedShift, ScopedShifts, ShiftUndo,
    MAX_TOKENS,
};
pub use eval::Evaluator;
pub use grid::{Grid, GridError, MAX_EXTENT, MIN_EXTENT};
pub use location_set::LocationSet;
pub use notation::{
    encode_board, parse_board, parse_board_with, NotationError, CLASSIC_POSITION,
    CORRIDOR_POSITION, SELF_DISPLACEMENT_POSITION,
};
pub use reachability::{Provenance, ReachabilityGraph};
pub use rotatable::{RotatableReach, RotatableReachabilityGraph};
pub use search::{
    CancelToken, PushbackRule, SearchLimits, SearchRequest, SearchResult, Searcher,
};
pub use types::{
    Action, Card, CardId, CardIdFactory, Direction, Location, MoveAction, OutPaths, Rotation,
    Score, Shape, ShiftAction, Token, TokenId,
};

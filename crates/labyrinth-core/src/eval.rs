use crate::board::Board;
use crate::types::{Score, TokenId};

/// Static evaluation from the point of view of `mover`.
pub trait Evaluator: Send {
    fn evaluate(&self, board: &Board, mover: TokenId, opponent: TokenId) -> Score;
}

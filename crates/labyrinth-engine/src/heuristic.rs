use labyrinth_core::{Board, Evaluator, Location, ReachabilityGraph, Score, Shape, TokenId};
use serde::{Deserialize, Serialize};

const DEFAULT_WIN: i32 = 100_000;
const DEFAULT_MOBILITY: i32 = 1;
const DEFAULT_DISTANCE: i32 = 5;
const DEFAULT_JUNCTION: i32 = 16;

/// Weights of the evaluation terms, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalWeights {
    /// Score of a token standing on the objective. Must dominate every other
    /// term combined.
    pub win: i32,
    pub mobility: i32,
    pub distance: i32,
    pub junction: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            win: DEFAULT_WIN,
            mobility: DEFAULT_MOBILITY,
            distance: DEFAULT_DISTANCE,
            junction: DEFAULT_JUNCTION,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MazeEval {
    weights: EvalWeights,
}

impl MazeEval {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_weights(weights: EvalWeights) -> Self {
        Self { weights }
    }

    pub const fn weights(&self) -> EvalWeights {
        self.weights
    }
}

impl Evaluator for MazeEval {
    fn evaluate(&self, board: &Board, mover: TokenId, opponent: TokenId) -> Score {
        if board.is_on_objective(mover) {
            return Score(self.weights.win);
        }
        if board.is_on_objective(opponent) {
            return Score(-self.weights.win);
        }

        let mobility = mobility(board, mover) - mobility(board, opponent);
        let distance = objective_distance(board, opponent) as i32
            - objective_distance(board, mover) as i32;
        let junction = i32::from(on_junction(board, mover)) - i32::from(on_junction(board, opponent));

        let positional = i64::from(mobility)
            * i64::from(mobility.abs())
            * i64::from(self.weights.mobility)
            + i64::from(distance) * i64::from(self.weights.distance)
            + i64::from(junction) * i64::from(self.weights.junction);
        let bound = self.positional_bound();
        Score(positional.clamp(-bound, bound) as i32)
    }
}

impl MazeEval {
    /// Largest magnitude a non-terminal position may score, kept below the
    /// decisive threshold of `win / 2`.
    fn positional_bound(&self) -> i64 {
        (i64::from(self.weights.win) / 2 - 1).max(0)
    }
}

/// Estimated distance from a token to the objective.
///
/// Manhattan distance, one less when token and objective share a movable row
/// or column. While the objective is the leftover card, the distance to the
/// nearest insertion location.
pub fn objective_distance(board: &Board, token: TokenId) -> u32 {
    let grid = board.grid();
    let Some(location) = board.token_location(token) else {
        return 2 * grid.extent() as u32;
    };
    match board.objective_location() {
        Some(objective) => location_distance(board, location, objective),
        None => grid
            .insertion_locations()
            .iter()
            .map(|slot| location.manhattan(*slot))
            .min()
            .unwrap_or(0),
    }
}

pub(crate) fn location_distance(board: &Board, from: Location, objective: Location) -> u32 {
    let grid = board.grid();
    let distance = from.manhattan(objective);
    let shares_line = (from.row == objective.row && grid.is_movable_line(from.row))
        || (from.column == objective.column && grid.is_movable_line(from.column));
    if distance > 0 && shares_line {
        distance - 1
    } else {
        distance
    }
}

fn mobility(board: &Board, token: TokenId) -> i32 {
    board
        .token_location(token)
        .map(|location| ReachabilityGraph::new(board.grid()).reachable_from(location).len() as i32)
        .unwrap_or(0)
}

fn on_junction(board: &Board, token: TokenId) -> bool {
    board
        .token_location(token)
        .and_then(|location| board.grid().get(location))
        .is_some_and(|card| card.shape() == Some(Shape::TJunction))
}

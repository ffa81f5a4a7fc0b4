use labyrinth_core::{
    Action, Board, CancelToken, MoveAction, ReachabilityGraph, Rotation, Score, SearchRequest,
    SearchResult, Searcher, ShiftAction, TokenId,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// A uniformly random legal slot and rotation, then any reachable target.
/// `None` only when the token is not on the board.
pub fn random_action<R: Rng + ?Sized>(board: &Board, token: TokenId, rng: &mut R) -> Option<Action> {
    let slots = board.legal_shift_locations().collect::<Vec<_>>();
    let slot = *slots.choose(rng)?;
    let rotation = *Rotation::ALL.choose(rng)?;
    let shift = ShiftAction::new(slot, rotation);

    let mut working = board.clone();
    let shifted = working.scoped_shift(shift).ok()?;
    let origin = shifted.token_location(token)?;
    let targets = ReachabilityGraph::new(shifted.grid())
        .reachable_from(origin)
        .iter()
        .collect::<Vec<_>>();
    let target = *targets.choose(rng)?;

    Some(Action::new(shift, MoveAction::new(target)))
}

#[derive(Debug)]
pub struct RandomSearcher {
    rng: StdRng,
}

impl RandomSearcher {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Searcher for RandomSearcher {
    fn search(
        &mut self,
        board: &Board,
        request: SearchRequest,
        _cancel: &CancelToken,
    ) -> SearchResult {
        SearchResult {
            best_action: random_action(board, request.token, &mut self.rng),
            score: Score(0),
            nodes_searched: 1,
        }
    }
}

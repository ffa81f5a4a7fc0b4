use std::sync::Arc;
use std::time::{Duration, Instant};

use arrayvec::ArrayVec;
use labyrinth_core::{
    Action, Board, CancelToken, Evaluator, Location, MoveAction, PushbackRule, RotatableReach,
    RotatableReachabilityGraph, Rotation, Score, SearchLimits, SearchRequest, SearchResult,
    Searcher, ShiftAction, TokenId,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::heuristic::{location_distance, EvalWeights, MazeEval};
use crate::status::SearchStatus;

const DEFAULT_MAX_DEPTH: u8 = 3;
const CHECK_INTERVAL_NODES: u64 = 256;
const MAX_PLY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphaBetaConfig {
    pub max_depth: u8,
    pub pushback: PushbackRule,
    pub weights: EvalWeights,
}

impl Default for AlphaBetaConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            pushback: PushbackRule::default(),
            weights: EvalWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaBetaResult {
    pub best_action: Option<Action>,
    pub score: Score,
    pub depth: u8,
    pub nodes: u64,
}

/// Shifts made so far along the current line, for the pushback rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShiftHistory {
    last: Option<Location>,
    by_side: [Option<Location>; 2],
}

impl ShiftHistory {
    fn root(previous_shift: Option<Location>) -> Self {
        Self {
            last: previous_shift,
            by_side: [None, previous_shift],
        }
    }

    fn blocking(&self, rule: PushbackRule, side: usize) -> Option<Location> {
        match rule {
            PushbackRule::AnyPlayer => self.last,
            PushbackRule::SamePlayer => self.by_side[side],
        }
    }

    fn after(mut self, side: usize, shift: Location) -> Self {
        self.last = Some(shift);
        self.by_side[side] = Some(shift);
        self
    }
}

pub struct AlphaBetaSearcher {
    eval: Box<dyn Evaluator>,
    max_depth: u8,
    pushback: PushbackRule,
    win_score: i32,
    nodes: u64,
    stop: bool,
    node_limit: Option<u64>,
    time_limit: Option<Duration>,
    started_at: Instant,
    last_completed_depth: u8,
    killers: [Option<Location>; MAX_PLY],
    players: [TokenId; 2],
    cancel: CancelToken,
    status: Option<Arc<SearchStatus>>,
}

impl std::fmt::Debug for AlphaBetaSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaBetaSearcher")
            .field("eval", &"<Evaluator>")
            .field("max_depth", &self.max_depth)
            .field("pushback", &self.pushback)
            .field("win_score", &self.win_score)
            .field("nodes", &self.nodes)
            .field("stop", &self.stop)
            .field("node_limit", &self.node_limit)
            .field("time_limit", &self.time_limit)
            .field("last_completed_depth", &self.last_completed_depth)
            .finish()
    }
}

impl AlphaBetaSearcher {
    pub fn new(config: AlphaBetaConfig) -> Self {
        Self::with_eval(config, Box::new(MazeEval::with_weights(config.weights)))
    }

    pub fn with_eval(config: AlphaBetaConfig, eval: Box<dyn Evaluator>) -> Self {
        Self {
            eval,
            max_depth: config.max_depth,
            pushback: config.pushback,
            win_score: config.weights.win,
            nodes: 0,
            stop: false,
            node_limit: None,
            time_limit: None,
            started_at: Instant::now(),
            last_completed_depth: 0,
            killers: [None; MAX_PLY],
            players: [TokenId(0), TokenId(1)],
            cancel: CancelToken::new(),
            status: None,
        }
    }

    /// Publishes completed depths and termination to `status`.
    pub fn with_status(mut self, status: Arc<SearchStatus>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn search_with_info(
        &mut self,
        board: &Board,
        request: SearchRequest,
        cancel: &CancelToken,
    ) -> AlphaBetaResult {
        let max_depth = request.limits.depth.unwrap_or(self.max_depth);
        self.run(board, request, cancel, 1..=max_depth)
    }

    /// One iteration at exactly `depth`, without the shallower ones first.
    /// Depth 0 searches nothing and yields no action.
    pub fn search_fixed_depth(
        &mut self,
        board: &Board,
        token: TokenId,
        depth: u8,
        cancel: &CancelToken,
    ) -> AlphaBetaResult {
        self.run(board, SearchRequest::new(token), cancel, depth..=depth)
    }

    fn run(
        &mut self,
        board: &Board,
        request: SearchRequest,
        cancel: &CancelToken,
        depths: std::ops::RangeInclusive<u8>,
    ) -> AlphaBetaResult {
        self.reset(request.limits, cancel);

        let mut result = AlphaBetaResult {
            best_action: None,
            score: Score(0),
            depth: 0,
            nodes: 0,
        };
        let Some(opponent) = board
            .tokens()
            .iter()
            .map(|token| token.id)
            .find(|id| *id != request.token)
        else {
            warn!("adversarial search needs an opponent token, board has none");
            self.finish();
            return result;
        };
        if board.token(request.token).is_none() {
            warn!("token {} is not on the board", request.token.0);
            self.finish();
            return result;
        }
        self.players = [request.token, opponent];

        let mut working = board.clone();
        let history = ShiftHistory::root(board.previous_shift());
        let decisive = self.win_score / 2;
        let depths = (*depths.start()).max(1)..=*depths.end();

        for depth in depths {
            if self.should_stop() {
                break;
            }
            self.clear_killers();

            match self.search_root(&mut working, depth, history) {
                Ok((Some(action), score)) => {
                    result.best_action = Some(action);
                    result.score = Score(score);
                    self.last_completed_depth = depth;
                    if let Some(status) = &self.status {
                        status.set_depth(depth);
                    }
                    debug!(
                        "depth {depth} complete: {action} score {score} nodes {}",
                        self.nodes
                    );
                    if score.abs() >= decisive {
                        break;
                    }
                }
                Ok((None, _)) => break,
                Err(AbortSearch) => break,
            }
        }

        result.depth = self.last_completed_depth;
        result.nodes = self.nodes;
        self.finish();
        result
    }

    fn reset(&mut self, limits: SearchLimits, cancel: &CancelToken) {
        self.nodes = 0;
        self.stop = false;
        self.last_completed_depth = 0;
        self.node_limit = limits.nodes;
        self.time_limit = limits.time_ms.map(Duration::from_millis);
        self.started_at = Instant::now();
        self.cancel = cancel.clone();
        if let Some(status) = &self.status {
            status.reset();
        }
    }

    fn finish(&self) {
        if let Some(status) = &self.status {
            status.terminate();
        }
    }

    fn search_root(
        &mut self,
        board: &mut Board,
        depth: u8,
        history: ShiftHistory,
    ) -> Result<(Option<Action>, i32), AbortSearch> {
        self.bump_nodes()?;

        let mut alpha = -self.win_score;
        let beta = self.win_score;
        let mut best_action = None;
        let mut best_score = -self.win_score;
        let best_possible = self.win_score - 1;

        for slot in self.slot_order(board, history, 0, 0) {
            let (score, action) = self.search_slot(board, slot, depth, alpha, beta, 0, history)?;
            if let Some(action) = action {
                if best_action.is_none() || score > best_score {
                    best_score = score;
                    best_action = Some(action);
                }
            }
            alpha = alpha.max(best_score);
            if best_score >= best_possible {
                break;
            }
        }

        Ok((best_action, best_score))
    }

    fn negamax(
        &mut self,
        board: &mut Board,
        depth: u8,
        mut alpha: i32,
        beta: i32,
        ply: u8,
        history: ShiftHistory,
    ) -> Result<i32, AbortSearch> {
        self.bump_nodes()?;

        let side = usize::from(ply % 2);
        let mover = self.players[side];
        let opponent = self.players[1 - side];
        if board.is_on_objective(mover) {
            return Ok(self.win_score - i32::from(ply));
        }
        if board.is_on_objective(opponent) {
            return Ok(-(self.win_score - i32::from(ply)));
        }
        if depth == 0 || usize::from(ply) >= MAX_PLY {
            return Ok(self.eval.evaluate(board, mover, opponent).0);
        }

        let mut best_score = -self.win_score;
        let mut best_slot = None;
        let best_possible = self.win_score - i32::from(ply) - 1;

        for slot in self.slot_order(board, history, side, ply) {
            let (score, action) =
                self.search_slot(board, slot, depth, alpha, beta, ply, history)?;
            if action.is_some() && (best_slot.is_none() || score > best_score) {
                best_score = score;
                best_slot = Some(slot);
            }
            alpha = alpha.max(best_score);
            if alpha >= beta || best_score >= best_possible {
                break;
            }
        }

        if let Some(slot) = best_slot {
            self.store_killer(slot, ply);
        }
        Ok(best_score)
    }

    /// Searches every child that starts with a shift at `slot` and returns
    /// the best score among them with the action that produced it.
    #[allow(clippy::too_many_arguments)]
    fn search_slot(
        &mut self,
        board: &mut Board,
        slot: Location,
        depth: u8,
        mut alpha: i32,
        beta: i32,
        ply: u8,
        history: ShiftHistory,
    ) -> Result<(i32, Option<Action>), AbortSearch> {
        let side = usize::from(ply % 2);
        let mover = self.players[side];
        let Ok(mut shifted) = board.scoped_shift(ShiftAction::new(slot, Rotation::R0)) else {
            return Ok((-self.win_score, None));
        };
        let Some(origin) = shifted.token_location(mover) else {
            return Ok((-self.win_score, None));
        };

        let reach = RotatableReachabilityGraph::new(shifted.grid(), slot).reachable_from(origin);
        let candidates = candidates(&shifted, &reach);
        let child_history = history.after(side, slot);

        let mut best_score = -self.win_score;
        let mut best_action = None;
        for (rotation, target) in candidates {
            shifted.rotate_inserted(rotation);
            let Ok(mut moved) = shifted.scoped_move(mover, target) else {
                continue;
            };
            let score = -self.negamax(
                &mut moved,
                depth.saturating_sub(1),
                -beta,
                -alpha,
                ply + 1,
                child_history,
            )?;
            drop(moved);

            if best_action.is_none() || score > best_score {
                best_score = score;
                best_action = Some(Action::new(
                    ShiftAction::new(slot, rotation),
                    MoveAction::new(target),
                ));
            }
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }

        Ok((best_score, best_action))
    }

    /// Legal slots for this node, with the killer slot of this ply first.
    fn slot_order(
        &self,
        board: &Board,
        history: ShiftHistory,
        side: usize,
        ply: u8,
    ) -> ArrayVec<Location, 64> {
        let grid = board.grid();
        let disabled = history
            .blocking(self.pushback, side)
            .and_then(|previous| grid.opposing_insertion_location(previous));
        let mut slots = grid
            .insertion_locations()
            .iter()
            .copied()
            .filter(|slot| Some(*slot) != disabled)
            .take(64)
            .collect::<ArrayVec<Location, 64>>();

        if ply > 0 {
            if let Some(killer) = self.killers[usize::from(ply)] {
                if let Some(index) = slots.iter().position(|slot| *slot == killer) {
                    slots[..=index].rotate_right(1);
                }
            }
        }
        slots
    }

    fn store_killer(&mut self, slot: Location, ply: u8) {
        if let Some(killer) = self.killers.get_mut(usize::from(ply)) {
            *killer = Some(slot);
        }
    }

    fn clear_killers(&mut self) {
        self.killers = [None; MAX_PLY];
    }

    fn bump_nodes(&mut self) -> Result<(), AbortSearch> {
        self.nodes = self.nodes.saturating_add(1);
        if self.cancel.is_cancelled() {
            self.stop = true;
            return Err(AbortSearch);
        }
        if self.nodes.is_multiple_of(CHECK_INTERVAL_NODES) && self.should_stop() {
            return Err(AbortSearch);
        }
        Ok(())
    }

    fn should_stop(&mut self) -> bool {
        if self.stop {
            return true;
        }

        if self.cancel.is_cancelled() {
            self.stop = true;
            return true;
        }

        if self.node_limit.is_some_and(|limit| self.nodes >= limit) {
            self.stop = true;
            return true;
        }

        if self
            .time_limit
            .is_some_and(|limit| self.started_at.elapsed() >= limit)
        {
            self.stop = true;
            return true;
        }

        false
    }
}

/// Rotation and target pairs worth exploring after a shift. A reachable
/// objective collapses them to the single winning child.
fn candidates(board: &Board, reach: &RotatableReach) -> Vec<(Rotation, Location)> {
    if let Some(objective) = board.objective_location() {
        if let Some(&rotation) = reach.rotations_reaching(objective).first() {
            return vec![(rotation, objective)];
        }
    }

    let mut children = Vec::new();
    for rotation in reach.rotations() {
        let mut targets = reach.reachable_under(rotation).iter().collect::<Vec<_>>();
        if let Some(objective) = board.objective_location() {
            targets.sort_by_key(|target| location_distance(board, *target, objective));
        }
        children.extend(targets.into_iter().map(|target| (rotation, target)));
    }
    children
}

impl Default for AlphaBetaSearcher {
    fn default() -> Self {
        Self::new(AlphaBetaConfig::default())
    }
}

impl Searcher for AlphaBetaSearcher {
    fn search(
        &mut self,
        board: &Board,
        request: SearchRequest,
        cancel: &CancelToken,
    ) -> SearchResult {
        let result = self.search_with_info(board, request, cancel);
        SearchResult {
            best_action: result.best_action,
            score: result.score,
            nodes_searched: result.nodes,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AbortSearch;

#[cfg(test)]
mod tests {
    use super::*;
    use labyrinth_core::parse_board;

    #[test]
    fn pushback_history_follows_rule() {
        let root = ShiftHistory::root(Some(Location::new(1, 0)));
        assert_eq!(root.blocking(PushbackRule::AnyPlayer, 0), Some(Location::new(1, 0)));
        assert_eq!(root.blocking(PushbackRule::SamePlayer, 0), None);

        let next = root.after(0, Location::new(0, 1));
        assert_eq!(next.blocking(PushbackRule::AnyPlayer, 1), Some(Location::new(0, 1)));
        assert_eq!(next.blocking(PushbackRule::SamePlayer, 1), Some(Location::new(1, 0)));
    }

    #[test]
    fn killer_slot_is_tried_first_below_root() {
        let board = parse_board("L1I1L2/I0X0I0/L0I1L3 I0 1-1 0-0,2-2 -").unwrap();
        let mut searcher = AlphaBetaSearcher::default();
        let history = ShiftHistory::root(None);

        searcher.store_killer(Location::new(2, 1), 1);
        let order = searcher.slot_order(&board, history, 1, 1);
        assert_eq!(order[0], Location::new(2, 1));
        assert_eq!(order.len(), 4);

        let root_order = searcher.slot_order(&board, history, 0, 0);
        assert_eq!(root_order[0], Location::new(0, 1));
    }

    #[test]
    fn forced_win_collapses_candidates() {
        let board = parse_board("L1I1L2/I0X0I0/L0I1L3 I0 0-2 0-0,2-2 -").unwrap();
        let mut working = board.clone();
        let shifted = working
            .scoped_shift(ShiftAction::new(Location::new(1, 0), Rotation::R0))
            .unwrap();
        let reach = RotatableReachabilityGraph::new(shifted.grid(), Location::new(1, 0))
            .reachable_from(Location::new(0, 0));

        assert_eq!(
            candidates(&shifted, &reach),
            vec![(Rotation::R0, Location::new(0, 2))]
        );
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use labyrinth_core::{
    Action, Board, CancelToken, Location, LocationSet, MoveAction, ReachabilityGraph, Score,
    SearchRequest, SearchResult, Searcher, ShiftAction, TokenId,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::status::SearchStatus;

const DEFAULT_NODE_LIMIT: u64 = 2_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhaustiveConfig {
    /// Longest action sequence to look for.
    pub max_depth: Option<u8>,
    /// Generated nodes after which the search gives up.
    pub node_limit: Option<u64>,
}

impl Default for ExhaustiveConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            node_limit: Some(DEFAULT_NODE_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhaustiveResult {
    pub actions: Vec<Action>,
    pub nodes: u64,
    pub depth: u8,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    parent: Option<usize>,
    shift: Option<ShiftAction>,
}

/// Breadth-first search for the shortest action sequence that brings a single
/// token onto the objective, ignoring every other token.
#[derive(Debug, Default)]
pub struct ExhaustiveSearcher {
    config: ExhaustiveConfig,
    nodes: u64,
    status: Option<Arc<SearchStatus>>,
}

impl ExhaustiveSearcher {
    pub fn new(config: ExhaustiveConfig) -> Self {
        Self {
            config,
            nodes: 0,
            status: None,
        }
    }

    pub fn with_status(mut self, status: Arc<SearchStatus>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn search_path(
        &mut self,
        board: &Board,
        request: SearchRequest,
        cancel: &CancelToken,
    ) -> Option<ExhaustiveResult> {
        self.nodes = 0;
        if let Some(status) = &self.status {
            status.reset();
        }
        let result = self.run(board, request, cancel);
        if let Some(status) = &self.status {
            status.terminate();
        }
        result
    }

    fn run(
        &mut self,
        board: &Board,
        request: SearchRequest,
        cancel: &CancelToken,
    ) -> Option<ExhaustiveResult> {
        let token = request.token;
        let Some(origin) = board.token_location(token) else {
            warn!("token {} is not on the board", token.0);
            return None;
        };
        if board.is_on_objective(token) {
            return Some(ExhaustiveResult {
                actions: Vec::new(),
                nodes: 0,
                depth: 0,
            });
        }

        let max_depth = request.limits.depth.or(self.config.max_depth);
        let node_limit = request.limits.nodes.or(self.config.node_limit);
        let deadline = request
            .limits
            .time_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let mut working = board.clone();
        let slots = working.grid().insertion_locations().to_vec();
        let mut arena = vec![Node {
            parent: None,
            shift: None,
        }];
        let mut root_reached = LocationSet::new(working.grid().extent());
        root_reached.insert(origin);
        let mut frontier = vec![(0usize, root_reached)];
        let mut depth = 0u8;

        while !frontier.is_empty() {
            if max_depth.is_some_and(|max| depth >= max) {
                debug!("exhaustive search hit depth cap {depth}");
                return None;
            }
            depth += 1;
            let mut next = Vec::new();

            for (index, reached) in &frontier {
                let path = shift_path(&arena, *index);
                let Ok(mut replayed) = working.scoped_shifts(&path) else {
                    continue;
                };
                let blocked = replayed
                    .previous_shift()
                    .and_then(|previous| replayed.grid().opposing_insertion_location(previous));
                let rotations = replayed.leftover().distinguishable_rotations();
                let before = reached.iter().collect::<Vec<_>>();

                for &slot in &slots {
                    if Some(slot) == blocked {
                        continue;
                    }
                    let sources = before
                        .iter()
                        .map(|location| replayed.grid().shifted_location(slot, *location))
                        .collect::<Vec<_>>();

                    for &rotation in &rotations {
                        if cancel.is_cancelled() {
                            debug!("exhaustive search cancelled after {} nodes", self.nodes);
                            return None;
                        }
                        if node_limit.is_some_and(|limit| self.nodes >= limit)
                            || deadline.is_some_and(|deadline| Instant::now() >= deadline)
                        {
                            warn!("exhaustive search gave up after {} nodes", self.nodes);
                            return None;
                        }
                        self.nodes += 1;

                        let action = ShiftAction::new(slot, rotation);
                        let Ok(shifted) = replayed.scoped_shift(action) else {
                            continue;
                        };
                        let child_reached =
                            ReachabilityGraph::new(shifted.grid()).reachable_from_all(&sources);
                        arena.push(Node {
                            parent: Some(*index),
                            shift: Some(action),
                        });
                        let child = arena.len() - 1;

                        if shifted
                            .objective_location()
                            .is_some_and(|objective| child_reached.contains(objective))
                        {
                            let shifts = shift_path(&arena, child);
                            let actions = reconstruct(board, origin, &shifts)?;
                            debug!(
                                "exhaustive search solved in {depth} plies, {} nodes",
                                self.nodes
                            );
                            return Some(ExhaustiveResult {
                                actions,
                                nodes: self.nodes,
                                depth,
                            });
                        }
                        next.push((child, child_reached));
                    }
                }
            }

            debug!(
                "exhaustive ply {depth}: {} open nodes, {} generated",
                next.len(),
                self.nodes
            );
            if let Some(status) = &self.status {
                status.set_depth(depth);
            }
            frontier = next;
        }

        None
    }
}

/// Shifts from the root down to `index`.
fn shift_path(arena: &[Node], mut index: usize) -> Vec<ShiftAction> {
    let mut path = Vec::new();
    loop {
        let node = arena[index];
        if let Some(shift) = node.shift {
            path.push(shift);
        }
        match node.parent {
            Some(parent) => index = parent,
            None => break,
        }
    }
    path.reverse();
    path
}

/// Recovers the move of every ply by replaying the shifts and walking the
/// provenance of the objective back to the token's starting location.
fn reconstruct(board: &Board, origin: Location, shifts: &[ShiftAction]) -> Option<Vec<Action>> {
    let mut working = board.clone();
    let mut reached = vec![origin];
    let mut layers = Vec::with_capacity(shifts.len());

    for &shift in shifts {
        let sources = reached
            .iter()
            .map(|location| working.grid().shifted_location(shift.location, *location))
            .collect::<Vec<_>>();
        working.force_shift(shift).ok()?;
        let provenance = ReachabilityGraph::new(working.grid()).reachable_with_provenance(&sources);
        let next = provenance.reached.iter().collect::<Vec<_>>();
        layers.push((std::mem::replace(&mut reached, next), provenance));
    }

    let mut target = working.objective_location()?;
    let mut actions = Vec::with_capacity(shifts.len());
    for (&shift, (previous, provenance)) in shifts.iter().zip(&layers).rev() {
        actions.push(Action::new(shift, MoveAction::new(target)));
        let source = provenance.origin(target)?;
        target = previous.get(source).copied()?;
    }
    actions.reverse();
    Some(actions)
}

/// A ply that keeps `token` on its card: the first legal slot whose line
/// does not push that card off, with the leftover inserted as it lies.
pub fn holding_action(board: &Board, token: TokenId) -> Option<Action> {
    let location = board.token_location(token)?;
    let grid = board.grid();
    let slots = board.legal_shift_locations().collect::<Vec<_>>();
    let slot = slots
        .iter()
        .copied()
        .find(|&slot| grid.shifted_location(slot, location) != slot)
        .or_else(|| slots.first().copied())?;
    Some(Action::new(
        ShiftAction::new(slot, board.leftover().rotation),
        MoveAction::new(grid.shifted_location(slot, location)),
    ))
}

impl Searcher for ExhaustiveSearcher {
    fn search(
        &mut self,
        board: &Board,
        request: SearchRequest,
        cancel: &CancelToken,
    ) -> SearchResult {
        match self.search_path(board, request, cancel) {
            Some(result) => SearchResult {
                best_action: result
                    .actions
                    .first()
                    .copied()
                    .or_else(|| holding_action(board, request.token)),
                score: Score(-i32::from(result.depth)),
                nodes_searched: result.nodes,
            },
            None => SearchResult::none(self.nodes),
        }
    }
}

/// Convenience for a one-off search with the default configuration.
pub fn find_path(board: &Board, token: TokenId, cancel: &CancelToken) -> Option<Vec<Action>> {
    ExhaustiveSearcher::default()
        .search_path(board, SearchRequest::new(token), cancel)
        .map(|result| result.actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labyrinth_core::Rotation;

    #[test]
    fn shift_path_walks_parents_in_order() {
        let first = ShiftAction::new(Location::new(0, 1), Rotation::R0);
        let second = ShiftAction::new(Location::new(1, 0), Rotation::R90);
        let arena = [
            Node {
                parent: None,
                shift: None,
            },
            Node {
                parent: Some(0),
                shift: Some(first),
            },
            Node {
                parent: Some(1),
                shift: Some(second),
            },
        ];

        assert_eq!(shift_path(&arena, 2), vec![first, second]);
        assert!(shift_path(&arena, 0).is_empty());
    }
}

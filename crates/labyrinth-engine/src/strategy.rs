use std::sync::Arc;

use labyrinth_core::{Action, Board, CancelToken, SearchRequest, Searcher};
use log::warn;

use crate::alphabeta::{AlphaBetaConfig, AlphaBetaSearcher};
use crate::exhaustive::{ExhaustiveConfig, ExhaustiveSearcher};
use crate::native::{NativeBinding, NativeEngine};
use crate::random::random_action;

/// The ways a bot can pick its next action.
#[derive(Debug, Clone)]
pub enum Strategy {
    Random,
    Exhaustive(ExhaustiveConfig),
    AlphaBeta(AlphaBetaConfig),
    Native(Arc<NativeEngine>),
}

impl Strategy {
    /// Built-in strategy with its default configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "random" => Some(Self::Random),
            "exhaustive" | "bfs" => Some(Self::Exhaustive(ExhaustiveConfig::default())),
            "alphabeta" | "minimax" => Some(Self::AlphaBeta(AlphaBetaConfig::default())),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Random => "random",
            Self::Exhaustive(_) => "exhaustive",
            Self::AlphaBeta(_) => "alphabeta",
            Self::Native(engine) => engine.name(),
        }
    }

    /// Runs to completion or until `cancel` fires.
    pub fn run(&self, board: &Board, request: SearchRequest, cancel: &CancelToken) -> Option<Action> {
        match self {
            Self::Random => random_action(board, request.token, &mut rand::thread_rng()),
            Self::Exhaustive(config) => ExhaustiveSearcher::new(*config)
                .search(board, request, cancel)
                .best_action,
            Self::AlphaBeta(config) => AlphaBetaSearcher::new(*config)
                .search_with_info(board, request, cancel)
                .best_action,
            Self::Native(engine) => {
                match NativeBinding::new(Arc::clone(engine), board, request.token)
                    .and_then(|binding| binding.find_action_until(cancel))
                {
                    Ok(action) => action,
                    Err(err) => {
                        warn!("native engine {} failed: {err}", engine.name());
                        None
                    }
                }
            }
        }
    }

    /// Out-of-band stop for strategies that do not watch the cancel token.
    pub fn abort(&self) {
        if let Self::Native(engine) = self {
            engine.abort_search();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in ["random", "exhaustive", "alphabeta"] {
            let strategy = Strategy::from_name(name).unwrap();
            assert_eq!(strategy.name(), name);
        }
        assert!(Strategy::from_name("oracle").is_none());
    }
}

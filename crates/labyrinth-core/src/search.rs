use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::types::{Action, Score, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchLimits {
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub token: TokenId,
    pub limits: SearchLimits,
}

impl SearchRequest {
    pub const fn new(token: TokenId) -> Self {
        Self {
            token,
            limits: SearchLimits {
                depth: None,
                nodes: None,
                time_ms: None,
            },
        }
    }

    pub const fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Which earlier shift a new shift may not push back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PushbackRule {
    /// The shift made immediately before, by either player.
    #[default]
    AnyPlayer,
    /// The acting player's own previous shift.
    SamePlayer,
}

/// Cooperative cancellation flag shared between a search and its supervisor.
/// Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub best_action: Option<Action>,
    pub score: Score,
    pub nodes_searched: u64,
}

impl SearchResult {
    pub const fn none(nodes_searched: u64) -> Self {
        Self {
            best_action: None,
            score: Score(0),
            nodes_searched,
        }
    }
}

pub trait Searcher {
    fn search(&mut self, board: &Board, request: SearchRequest, cancel: &CancelToken)
        -> SearchResult;
}

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use labyrinth_core::{Action, Board, CancelToken, SearchRequest, TokenId};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::random::random_action;
use crate::strategy::Strategy;

const DEFAULT_BUDGET_MS: u64 = 1_500;
const DEFAULT_GRACE_MS: u64 = 200;
const ABORT_RESEND: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Time the strategy gets before it is asked to stop.
    pub budget_ms: u64,
    /// Extra time to wait for a best-effort answer after stopping.
    pub grace_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            budget_ms: DEFAULT_BUDGET_MS,
            grace_ms: DEFAULT_GRACE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Strategy,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// `None` only when the token is not on the board.
    pub action: Option<Action>,
    pub source: DecisionSource,
    pub elapsed: Duration,
}

/// Runs strategies on worker threads under a time budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchSupervisor {
    config: SupervisorConfig,
}

impl SearchSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> SupervisorConfig {
        self.config
    }

    pub fn start(&self, strategy: Strategy, board: &Board, request: SearchRequest) -> SearchHandle {
        let cancel = CancelToken::new();
        let (sender, receiver) = channel::bounded(1);

        let worker = {
            let strategy = strategy.clone();
            let board = board.clone();
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("search-{}", strategy.name()))
                .spawn(move || {
                    let action = strategy.run(&board, request, &cancel);
                    let _ = sender.send(action);
                })
        };
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("could not spawn search worker: {err}");
                None
            }
        };

        SearchHandle {
            strategy,
            board: board.clone(),
            token: request.token,
            cancel,
            receiver,
            worker,
            started_at: Instant::now(),
            budget: Duration::from_millis(self.config.budget_ms),
            grace: Duration::from_millis(self.config.grace_ms),
            finished: false,
        }
    }

    /// Starts a search and blocks until it yields a decision.
    pub fn run(&self, strategy: Strategy, board: &Board, request: SearchRequest) -> Decision {
        self.start(strategy, board, request).wait()
    }
}

/// A running search. Dropping it cancels the search.
#[derive(Debug)]
pub struct SearchHandle {
    strategy: Strategy,
    board: Board,
    token: TokenId,
    cancel: CancelToken,
    receiver: Receiver<Option<Action>>,
    worker: Option<JoinHandle<()>>,
    started_at: Instant,
    budget: Duration,
    grace: Duration,
    finished: bool,
}

impl SearchHandle {
    /// Stops the search. Calling it again has no further effect.
    pub fn cancel(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.strategy.abort();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits out the budget, then the grace period, then falls back to a
    /// random legal action.
    pub fn wait(mut self) -> Decision {
        let outcome = match self.receiver.recv_deadline(self.started_at + self.budget) {
            Ok(action) => Some(action),
            Err(RecvTimeoutError::Timeout) => self.wait_for_grace(),
            Err(RecvTimeoutError::Disconnected) => None,
        };
        self.finished = true;

        if let Some(worker) = self.worker.take() {
            if outcome.is_some() {
                if worker.join().is_err() {
                    warn!("search worker panicked");
                }
            } else {
                warn!(
                    "{} search did not answer within {:?}, leaving it detached",
                    self.strategy.name(),
                    self.budget + self.grace
                );
            }
        }

        let elapsed = self.started_at.elapsed();
        match outcome.flatten() {
            Some(action) => {
                info!("{} chose {action} in {elapsed:?}", self.strategy.name());
                Decision {
                    action: Some(action),
                    source: DecisionSource::Strategy,
                    elapsed,
                }
            }
            None => {
                let action = random_action(&self.board, self.token, &mut rand::thread_rng());
                warn!(
                    "{} produced no action, falling back to random {:?}",
                    self.strategy.name(),
                    action.map(|action| action.to_string())
                );
                Decision {
                    action,
                    source: DecisionSource::Fallback,
                    elapsed: self.started_at.elapsed(),
                }
            }
        }
    }

    /// Aborts the strategy and keeps aborting it while the grace period
    /// runs, whether or not the token was already cancelled.
    fn wait_for_grace(&self) -> Option<Option<Action>> {
        self.cancel.cancel();
        let deadline = Instant::now() + self.grace;
        loop {
            self.strategy.abort();
            let now = Instant::now();
            if now >= deadline {
                return self.receiver.try_recv().ok();
            }
            match self.receiver.recv_timeout(ABORT_RESEND.min(deadline - now)) {
                Ok(action) => return Some(action),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel();
        }
    }
}

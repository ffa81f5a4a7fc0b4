//! The search engines behind the native engine ABI.
//!
//! Built as a `cdylib` for hosts that load engines by path, and as an `rlib`
//! so the same entry points can be linked directly through [`symbols`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use labyrinth_core::{Action, Board, CancelToken, SearchRequest, Searcher, TokenId};
use labyrinth_engine::native::{
    decode_board, GetStatusFn, WireAction, WireGraph, WireLocation, WireMultiLocation,
    WireStatus,
};
use labyrinth_engine::{
    AlphaBetaConfig, AlphaBetaSearcher, EngineSymbols, ExhaustiveConfig, ExhaustiveSearcher,
    SearchStatus,
};
use log::{debug, warn};

/// Deepening cap for adversarial searches; `abort_search` ends them earlier.
pub const NATIVE_MAX_DEPTH: u8 = 16;

static STATUS: OnceLock<Arc<SearchStatus>> = OnceLock::new();
static ACTIVE: Mutex<Vec<(u64, CancelToken)>> = Mutex::new(Vec::new());
static NEXT_CALL: AtomicU64 = AtomicU64::new(0);

fn status() -> &'static Arc<SearchStatus> {
    STATUS.get_or_init(|| {
        let status = SearchStatus::new();
        status.terminate();
        Arc::new(status)
    })
}

/// Registers a call so `abort_search` can reach it; unregisters on drop.
struct ActiveCall {
    id: u64,
    cancel: CancelToken,
}

impl ActiveCall {
    fn begin() -> Self {
        let id = NEXT_CALL.fetch_add(1, Ordering::Relaxed);
        let cancel = CancelToken::new();
        ACTIVE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, cancel.clone()));
        Self { id, cancel }
    }
}

impl Drop for ActiveCall {
    fn drop(&mut self) {
        ACTIVE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != self.id);
    }
}

fn search(board: &Board, cancel: &CancelToken) -> Option<Action> {
    let request = SearchRequest::new(TokenId(0));
    let status = Arc::clone(status());

    if board.tokens().len() < 2 {
        ExhaustiveSearcher::new(ExhaustiveConfig::default())
            .with_status(status)
            .search(board, request, cancel)
            .best_action
    } else {
        AlphaBetaSearcher::new(AlphaBetaConfig {
            max_depth: NATIVE_MAX_DEPTH,
            ..Default::default()
        })
        .with_status(status)
        .search_with_info(board, request, cancel)
        .best_action
    }
}

/// Searches for the next action of the first token in `locations`.
///
/// Returns [`WireAction::NONE`] for malformed records or when nothing was
/// found before an abort.
///
/// # Safety
///
/// Pointers must be null or point to records laid out as described in
/// `labyrinth_engine::native`, valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn find_action(
    graph: *const WireGraph,
    locations: *const WireMultiLocation,
    objective: u32,
    previous_shift: *const WireLocation,
) -> WireAction {
    let board = match decode_board(graph, locations, objective, previous_shift) {
        Ok(board) => board,
        Err(err) => {
            warn!("rejected native records: {err}");
            return WireAction::NONE;
        }
    };

    let call = ActiveCall::begin();
    let action = panic::catch_unwind(AssertUnwindSafe(|| search(&board, &call.cancel)))
        .unwrap_or_else(|_| {
            warn!("search panicked, answering with no action");
            status().terminate();
            None
        });
    debug!("native call {} answered {:?}", call.id, action.map(|a| a.to_string()));
    WireAction::from(action)
}

/// Stops every running `find_action`. Callable from any thread.
#[no_mangle]
pub extern "C" fn abort_search() {
    let active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
    debug!("aborting {} native searches", active.len());
    for (_, cancel) in active.iter() {
        cancel.cancel();
    }
}

/// Depth of the last completed iteration and whether the search has ended.
#[no_mangle]
pub extern "C" fn get_status() -> WireStatus {
    let status = status();
    WireStatus {
        depth: status.depth(),
        terminated: status.is_terminated(),
    }
}

/// The entry points above, for linking without a dynamic library.
pub fn symbols() -> EngineSymbols {
    EngineSymbols {
        find_action,
        abort_search,
        get_status: Some(get_status as GetStatusFn),
    }
}

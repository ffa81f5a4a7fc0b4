use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use labyrinth_core::{
    parse_board, Action, Board, Location, Rotation, SearchRequest, TokenId, SELF_DISPLACEMENT_POSITION,
};
use labyrinth_engine::native::{decode_board, WireAction, WireGraph, WireLocation, WireMultiLocation};
use labyrinth_engine::{
    random_action, AlphaBetaConfig, DecisionSource, EngineSymbols, ExhaustiveConfig, NativeEngine,
    SearchSupervisor, Strategy, SupervisorConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const VERTICAL_CORRIDORS: &str = "I0I0I0I0I0I0I0/I0I0I0I0I0I0I0/I0I0I0I0I0I0I0/I0I0I0I0I0I0I0/I0I0I0I0I0I0I0/I0I0I0I0I0I0I0/I0I0I0I0I0I0I0 I1 3-4 0-0,6-6 -";

static COOPERATIVE_ABORTED: AtomicBool = AtomicBool::new(false);

unsafe extern "C" fn stubborn_find_action(
    _graph: *const WireGraph,
    _locations: *const WireMultiLocation,
    _objective: u32,
    _previous_shift: *const WireLocation,
) -> WireAction {
    thread::sleep(Duration::from_millis(1_000));
    WireAction::NONE
}

unsafe extern "C" fn ignore_abort() {}

unsafe extern "C" fn cooperative_find_action(
    graph: *const WireGraph,
    locations: *const WireMultiLocation,
    objective: u32,
    previous_shift: *const WireLocation,
) -> WireAction {
    let board = decode_board(graph, locations, objective, previous_shift);
    while !COOPERATIVE_ABORTED.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(1));
    }
    match board {
        Ok(board) => WireAction::from(random_action(&board, TokenId(0), &mut StdRng::seed_from_u64(3))),
        Err(_) => WireAction::NONE,
    }
}

unsafe extern "C" fn cooperative_abort() {
    COOPERATIVE_ABORTED.store(true, Ordering::Release);
}

static LATE_REGISTERED: AtomicBool = AtomicBool::new(false);
static LATE_ABORTED: AtomicBool = AtomicBool::new(false);
static LATE_RUNNING: AtomicBool = AtomicBool::new(false);

// Only honours aborts that arrive after it has registered the call.
unsafe extern "C" fn late_find_action(
    graph: *const WireGraph,
    locations: *const WireMultiLocation,
    objective: u32,
    previous_shift: *const WireLocation,
) -> WireAction {
    LATE_RUNNING.store(true, Ordering::Release);
    let board = decode_board(graph, locations, objective, previous_shift);
    thread::sleep(Duration::from_millis(20));
    LATE_REGISTERED.store(true, Ordering::Release);
    let give_up = Instant::now() + Duration::from_secs(5);
    while !LATE_ABORTED.load(Ordering::Acquire) && Instant::now() < give_up {
        thread::sleep(Duration::from_millis(1));
    }
    LATE_RUNNING.store(false, Ordering::Release);
    match board {
        Ok(board) => WireAction::from(random_action(&board, TokenId(0), &mut StdRng::seed_from_u64(5))),
        Err(_) => WireAction::NONE,
    }
}

unsafe extern "C" fn late_abort() {
    if LATE_REGISTERED.load(Ordering::Acquire) {
        LATE_ABORTED.store(true, Ordering::Release);
    }
}

fn supervisor(budget_ms: u64, grace_ms: u64) -> SearchSupervisor {
    SearchSupervisor::new(SupervisorConfig { budget_ms, grace_ms })
}

fn assert_legal(board: &Board, token: TokenId, decision_action: Option<Action>) {
    let action = decision_action.expect("an action");
    let mut replay = board.clone();
    replay.shift(action.shift).expect("legal shift");
    replay
        .move_token(token, action.move_to.location, &mut StdRng::seed_from_u64(0))
        .expect("reachable target");
}

#[test]
fn strategy_answer_within_budget_is_used() {
    let board = parse_board(SELF_DISPLACEMENT_POSITION).expect("position");
    let decision = supervisor(5_000, 200).run(
        Strategy::Exhaustive(ExhaustiveConfig::default()),
        &board,
        SearchRequest::new(TokenId(0)),
    );

    assert_eq!(decision.source, DecisionSource::Strategy);
    let action = decision.action.expect("an action");
    assert_eq!(action.shift.location, Location::new(1, 2));
    assert_eq!(action.shift.rotation, Rotation::R90);
}

#[test]
fn token_on_objective_is_answered_by_the_strategy() {
    let board = parse_board("L1I1L2/I0X0I0/L0I1L3 I0 1-1 1-1 -").expect("position");
    let decision = supervisor(5_000, 200).run(
        Strategy::Exhaustive(ExhaustiveConfig::default()),
        &board,
        SearchRequest::new(TokenId(0)),
    );

    assert_eq!(decision.source, DecisionSource::Strategy);
    assert_legal(&board, TokenId(0), decision.action);
}

#[test]
fn expired_budget_still_yields_legal_action() {
    let board = parse_board(VERTICAL_CORRIDORS).expect("position");
    let strategy = Strategy::AlphaBeta(AlphaBetaConfig {
        max_depth: 16,
        ..Default::default()
    });
    let decision = supervisor(300, 2_000).run(strategy, &board, SearchRequest::new(TokenId(0)));

    assert!(decision.elapsed < Duration::from_secs(3));
    assert_legal(&board, TokenId(0), decision.action);
}

#[test]
fn unresponsive_engine_falls_back_to_random() {
    let board = parse_board(SELF_DISPLACEMENT_POSITION).expect("position");
    let engine = NativeEngine::from_symbols(
        "stubborn",
        EngineSymbols {
            find_action: stubborn_find_action,
            abort_search: ignore_abort,
            get_status: None,
        },
    );
    let decision = supervisor(30, 20).run(
        Strategy::Native(Arc::new(engine)),
        &board,
        SearchRequest::new(TokenId(0)),
    );

    assert_eq!(decision.source, DecisionSource::Fallback);
    assert!(decision.elapsed < Duration::from_millis(900));
    assert_legal(&board, TokenId(0), decision.action);
}

#[test]
fn abort_reaches_native_engine() {
    let board = parse_board(SELF_DISPLACEMENT_POSITION).expect("position");
    let engine = NativeEngine::from_symbols(
        "cooperative",
        EngineSymbols {
            find_action: cooperative_find_action,
            abort_search: cooperative_abort,
            get_status: None,
        },
    );
    let decision = supervisor(30, 2_000).run(
        Strategy::Native(Arc::new(engine)),
        &board,
        SearchRequest::new(TokenId(0)),
    );

    assert!(COOPERATIVE_ABORTED.load(Ordering::Acquire));
    assert_eq!(decision.source, DecisionSource::Strategy);
    assert_legal(&board, TokenId(0), decision.action);
}

#[test]
fn early_cancel_still_stops_late_registering_engine() {
    let board = parse_board(SELF_DISPLACEMENT_POSITION).expect("position");
    let engine = NativeEngine::from_symbols(
        "late",
        EngineSymbols {
            find_action: late_find_action,
            abort_search: late_abort,
            get_status: None,
        },
    );
    let handle = supervisor(100, 1_000).start(
        Strategy::Native(Arc::new(engine)),
        &board,
        SearchRequest::new(TokenId(0)),
    );
    handle.cancel();
    let decision = handle.wait();

    assert!(decision.elapsed < Duration::from_secs(2));
    assert_legal(&board, TokenId(0), decision.action);
    let settle = Instant::now() + Duration::from_secs(1);
    while LATE_RUNNING.load(Ordering::Acquire) && Instant::now() < settle {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!LATE_RUNNING.load(Ordering::Acquire));
}

#[test]
fn cancel_is_idempotent() {
    let board = parse_board(VERTICAL_CORRIDORS).expect("position");
    let handle = supervisor(10_000, 2_000).start(
        Strategy::AlphaBeta(AlphaBetaConfig {
            max_depth: 16,
            ..Default::default()
        }),
        &board,
        SearchRequest::new(TokenId(1)),
    );

    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());
    assert!(handle.cancel_token().is_cancelled());

    let decision = handle.wait();
    assert!(decision.elapsed < Duration::from_secs(5));
    assert_legal(&board, TokenId(1), decision.action);
}

#[test]
fn missing_token_yields_no_action() {
    let board = parse_board(SELF_DISPLACEMENT_POSITION).expect("position");
    let decision = supervisor(200, 50).run(Strategy::Random, &board, SearchRequest::new(TokenId(7)));

    assert_eq!(decision.action, None);
    assert_eq!(decision.source, DecisionSource::Fallback);
}

use std::sync::Arc;

use labyrinth_core::{parse_board, Board, SearchRequest, TokenId, CLASSIC_POSITION};
use labyrinth_engine::{DecisionSource, NativeEngine, SearchSupervisor, Strategy, SupervisorConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

const MAX_TURNS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchResult {
    FirstWin,
    SecondWin,
    Draw,
}

fn parse_strategy(s: &str) -> Strategy {
    if let Some(path) = s.strip_prefix("native:") {
        match NativeEngine::load(path) {
            Ok(engine) => return Strategy::Native(Arc::new(engine)),
            Err(err) => {
                eprintln!("Could not load native engine '{path}': {err}, using random");
                return Strategy::Random;
            }
        }
    }
    Strategy::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown strategy '{s}', defaulting to random");
        Strategy::Random
    })
}

fn play_game(
    start: &Board,
    supervisor: &SearchSupervisor,
    players: [&Strategy; 2],
    seed: u64,
) -> (u32, u32, MatchResult) {
    let mut board = start.clone();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut fallbacks = 0u32;

    for turn in 0..MAX_TURNS {
        let side = (turn % 2) as usize;
        let token = TokenId(side as u8);
        let decision = supervisor.run(players[side].clone(), &board, SearchRequest::new(token));
        if decision.source == DecisionSource::Fallback {
            fallbacks = fallbacks.saturating_add(1);
        }

        let Some(action) = decision.action else {
            eprintln!("Token {side} has no action, ending game");
            break;
        };
        if let Err(err) = board.shift(action.shift) {
            eprintln!("Token {side} played illegal shift {action}: {err}");
            break;
        }
        match board.move_token(token, action.move_to.location, &mut rng) {
            Ok(outcome) if outcome.reached_objective => {
                let result = if side == 0 {
                    MatchResult::FirstWin
                } else {
                    MatchResult::SecondWin
                };
                return (turn + 1, fallbacks, result);
            }
            Ok(_) => {}
            Err(err) => {
                eprintln!("Token {side} played illegal move {action}: {err}");
                break;
            }
        }
    }

    (MAX_TURNS, fallbacks, MatchResult::Draw)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let num_games: u32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10);
    let first = parse_strategy(args.get(2).map(String::as_str).unwrap_or("alphabeta"));
    let second = parse_strategy(args.get(3).map(String::as_str).unwrap_or("random"));
    let budget_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(500);
    let notation = args.get(5).map(String::as_str).unwrap_or(CLASSIC_POSITION);

    let board = match parse_board(notation) {
        Ok(board) => board,
        Err(err) => {
            eprintln!("Invalid board '{notation}': {err}");
            std::process::exit(2);
        }
    };
    if board.tokens().len() < 2 {
        eprintln!("Arena boards need two tokens");
        std::process::exit(2);
    }

    let supervisor = SearchSupervisor::new(SupervisorConfig {
        budget_ms,
        ..Default::default()
    });

    eprintln!(
        "Running {num_games} arena games: {} vs {} with {budget_ms}ms per move...",
        first.name(),
        second.name()
    );

    let mut first_wins = 0u32;
    let mut second_wins = 0u32;
    let mut draws = 0u32;
    for game in 1..=num_games {
        // Alternate who moves first.
        let swapped = game % 2 == 0;
        let players = if swapped {
            [&second, &first]
        } else {
            [&first, &second]
        };
        let (turns, fallbacks, result) = play_game(&board, &supervisor, players, u64::from(game));
        let result = match (result, swapped) {
            (MatchResult::FirstWin, true) => MatchResult::SecondWin,
            (MatchResult::SecondWin, true) => MatchResult::FirstWin,
            (result, _) => result,
        };

        match result {
            MatchResult::FirstWin => first_wins = first_wins.saturating_add(1),
            MatchResult::SecondWin => second_wins = second_wins.saturating_add(1),
            MatchResult::Draw => draws = draws.saturating_add(1),
        }
        eprintln!("Game {game}/{num_games}: {turns} turns, {result:?}, {fallbacks} fallbacks");
    }

    eprintln!(
        "{}: {first_wins}W/{second_wins}L/{draws}D | {}: {second_wins}W/{first_wins}L/{draws}D",
        first.name(),
        second.name()
    );
}

pub mod alphabeta;
pub mod exhaustive;
pub mod heuristic;
pub mod native;
pub mod random;
pub mod status;
pub mod strategy;
pub mod supervisor;

pub use alphabeta::{AlphaBetaConfig, AlphaBetaResult, AlphaBetaSearcher};
pub use exhaustive::{
    find_path, holding_action, ExhaustiveConfig, ExhaustiveResult, ExhaustiveSearcher,
};
pub use heuristic::{objective_distance, EvalWeights, MazeEval};
pub use native::{EngineSymbols, NativeBinding, NativeEngine, NativeError};
pub use random::{random_action, RandomSearcher};
pub use status::SearchStatus;
pub use strategy::Strategy;
pub use supervisor::{Decision, DecisionSource, SearchHandle, SearchSupervisor, SupervisorConfig};

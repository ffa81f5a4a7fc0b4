//! Binding to engines compiled as native libraries exposing `find_action`,
//! `abort_search` and optionally `get_status` with the C ABI.

pub mod wire;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use labyrinth_core::{Action, Board, CancelToken, TokenId};
use libloading::Library;
use log::{debug, warn};
use thiserror::Error;

pub use wire::{
    decode_board, decode_records, EncodedBoard, WireAction, WireError, WireGraph, WireLocation,
    WireMultiLocation, WireNode, WireStatus,
};

pub type FindActionFn = unsafe extern "C" fn(
    graph: *const WireGraph,
    locations: *const WireMultiLocation,
    objective: u32,
    previous_shift: *const WireLocation,
) -> WireAction;
pub type AbortSearchFn = unsafe extern "C" fn();
pub type GetStatusFn = unsafe extern "C" fn() -> WireStatus;

/// How often a cancelled call re-sends `abort_search` until `find_action`
/// returns.
const ABORT_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Error)]
pub enum NativeError {
    #[error("failed to load native engine {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("native engine does not export {name}")]
    Symbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("wire error")]
    Wire(#[from] WireError),
}

#[derive(Debug, Clone, Copy)]
pub struct EngineSymbols {
    pub find_action: FindActionFn,
    pub abort_search: AbortSearchFn,
    pub get_status: Option<GetStatusFn>,
}

/// A native engine. Shared between searches through `Arc`.
pub struct NativeEngine {
    name: String,
    symbols: EngineSymbols,
    // Keeps the symbols above valid.
    _library: Option<Library>,
}

impl fmt::Debug for NativeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEngine")
            .field("name", &self.name)
            .field("dynamic", &self._library.is_some())
            .field("has_status", &self.symbols.get_status.is_some())
            .finish()
    }
}

impl NativeEngine {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NativeError> {
        let path = path.as_ref();
        // SAFETY: loading runs the library's initialisers; engine libraries
        // are trusted to be well behaved.
        let library = unsafe { Library::new(path) }.map_err(|source| {
            warn!("could not load native engine {}: {source}", path.display());
            NativeError::Load {
                path: path.to_path_buf(),
                source,
            }
        })?;

        // SAFETY: the signatures match the engine ABI; the pointers stay
        // valid while `library` is held by the returned engine.
        let symbols = unsafe {
            EngineSymbols {
                find_action: *library
                    .get::<FindActionFn>(b"find_action\0")
                    .map_err(|source| NativeError::Symbol {
                        name: "find_action",
                        source,
                    })?,
                abort_search: *library
                    .get::<AbortSearchFn>(b"abort_search\0")
                    .map_err(|source| NativeError::Symbol {
                        name: "abort_search",
                        source,
                    })?,
                get_status: library
                    .get::<GetStatusFn>(b"get_status\0")
                    .ok()
                    .map(|symbol| *symbol),
            }
        };
        debug!("loaded native engine {}", path.display());

        Ok(Self {
            name: path.display().to_string(),
            symbols,
            _library: Some(library),
        })
    }

    /// Wraps entry points linked into this process.
    pub fn from_symbols(name: impl Into<String>, symbols: EngineSymbols) -> Self {
        Self {
            name: name.into(),
            symbols,
            _library: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks a running `find_action` to return early. Safe to call from any
    /// thread.
    pub fn abort_search(&self) {
        // SAFETY: `abort_search` takes no arguments and is required to be
        // callable concurrently with `find_action`.
        unsafe { (self.symbols.abort_search)() }
    }

    pub fn status(&self) -> Option<WireStatus> {
        // SAFETY: `get_status` takes no arguments and returns by value.
        self.symbols.get_status.map(|get_status| unsafe { get_status() })
    }

    fn find_action(&self, encoded: &EncodedBoard) -> WireAction {
        let graph = encoded.graph();
        let locations = encoded.multi_location();
        let previous_shift = encoded.previous_shift();
        // SAFETY: all records borrow from `encoded`, which outlives the call.
        unsafe {
            (self.symbols.find_action)(&graph, &locations, encoded.objective(), &previous_shift)
        }
    }
}

/// One engine call on one board snapshot.
#[derive(Debug)]
pub struct NativeBinding {
    engine: Arc<NativeEngine>,
    encoded: EncodedBoard,
}

impl NativeBinding {
    pub fn new(engine: Arc<NativeEngine>, board: &Board, token: TokenId) -> Result<Self, NativeError> {
        Ok(Self {
            engine,
            encoded: EncodedBoard::encode(board, token)?,
        })
    }

    pub fn find_action(self) -> Result<Option<Action>, NativeError> {
        let action = self.engine.find_action(&self.encoded);
        Ok(action.to_action()?)
    }

    /// Like [`find_action`](Self::find_action), but forwards `cancel` to the
    /// engine. The engine may register the call after the token fires, so
    /// the abort is repeated until the call returns.
    pub fn find_action_until(self, cancel: &CancelToken) -> Result<Option<Action>, NativeError> {
        if cancel.is_cancelled() {
            debug!("{} cancelled before the call started", self.engine.name());
            return Ok(None);
        }

        let (done, finished) = channel::bounded::<()>(0);
        let engine = &self.engine;
        let action = thread::scope(|scope| {
            scope.spawn(move || loop {
                match finished.recv_timeout(ABORT_POLL) {
                    Err(RecvTimeoutError::Timeout) => {
                        if cancel.is_cancelled() {
                            engine.abort_search();
                        }
                    }
                    _ => break,
                }
            });
            let action = engine.find_action(&self.encoded);
            drop(done);
            action
        });
        Ok(action.to_action()?)
    }
}

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use snapfit_contracts::capture::{CapturedImage, StoredCapture};
use snapfit_contracts::result::Timestamped;
use snapfit_contracts::storage::{CaptureStore, KeyValueStore};

use crate::error::IdentifyError;
use crate::Identifier;

const UNKNOWN_ERROR: &str = "Unknown error";
const INTERRUPTED: &str = "Identification was interrupted";

/// Lifecycle of the current identification attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentificationState<R> {
    Idle,
    Loading,
    Success(R),
    Error(String),
}

impl<R> IdentificationState<R> {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}

struct Attempts<R> {
    state: IdentificationState<R>,
    generation: u64,
}

/// Moves an attempt that unwound out of the identifier from `Loading` to
/// `Error`, so the session does not stay busy forever.
struct UnwindGuard<'a, R> {
    attempts: &'a Mutex<Attempts<R>>,
    generation: u64,
}

impl<R> Drop for UnwindGuard<'_, R> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        if attempts.generation == self.generation
            && matches!(attempts.state, IdentificationState::Loading)
        {
            log::error!("identify attempt={} panicked", self.generation);
            attempts.state = IdentificationState::Error(INTERRUPTED.to_string());
        }
    }
}

/// Drives one identifier through `Idle -> Loading -> Success | Error` and
/// records the last successful capture.
///
/// Only one attempt may be loading at a time. `reset` returns to `Idle`
/// immediately; an attempt still in flight at that point is superseded and
/// its outcome is neither stored nor applied.
pub struct IdentificationSession<I: Identifier, S> {
    identifier: I,
    store: CaptureStore<S>,
    attempts: Mutex<Attempts<I::Output>>,
}

impl<I: Identifier, S: KeyValueStore> IdentificationSession<I, S> {
    pub fn new(identifier: I, store: S) -> Self {
        Self {
            identifier,
            store: CaptureStore::new(store),
            attempts: Mutex::new(Attempts {
                state: IdentificationState::Idle,
                generation: 0,
            }),
        }
    }

    pub fn identifier(&self) -> &I {
        &self.identifier
    }

    pub fn store(&self) -> &CaptureStore<S> {
        &self.store
    }

    pub fn identify(&self, image: &CapturedImage) -> Result<I::Output, IdentifyError> {
        let generation = {
            let mut attempts = self.lock();
            if matches!(attempts.state, IdentificationState::Loading) {
                return Err(IdentifyError::Busy);
            }
            attempts.generation += 1;
            attempts.state = IdentificationState::Loading;
            attempts.generation
        };
        log::info!(
            "identify start identifier={} attempt={generation}",
            self.identifier.name()
        );

        let guard = UnwindGuard {
            attempts: &self.attempts,
            generation,
        };
        let outcome = self.identifier.identify(image);
        drop(guard);

        let capture = {
            let mut attempts = self.lock();
            if attempts.generation != generation {
                log::info!("identify attempt={generation} superseded by reset");
                return outcome;
            }
            match &outcome {
                Ok(result) => {
                    log::info!("identify attempt={generation} succeeded");
                    attempts.state = IdentificationState::Success(result.clone());
                    StoredCapture {
                        image_uri: image.uri().to_string(),
                        timestamp: result.timestamp(),
                        result: Some(result.clone()),
                    }
                }
                Err(err) => {
                    log::error!("identify attempt={generation} failed kind={}: {err}", err.kind());
                    let message = err.to_string();
                    attempts.state = if message.trim().is_empty() {
                        IdentificationState::Error(UNKNOWN_ERROR.to_string())
                    } else {
                        IdentificationState::Error(message)
                    };
                    return outcome;
                }
            }
        };
        // Written outside the lock; state queries never wait on storage.
        self.store.save_last_capture(&capture);
        outcome
    }

    pub fn reset(&self) {
        let mut attempts = self.lock();
        attempts.generation += 1;
        attempts.state = IdentificationState::Idle;
    }

    pub fn state(&self) -> IdentificationState<I::Output> {
        self.lock().state.clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.lock().state, IdentificationState::Loading)
    }

    pub fn result(&self) -> Option<I::Output> {
        match &self.lock().state {
            IdentificationState::Success(result) => Some(result.clone()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        match &self.lock().state {
            IdentificationState::Error(message) => Some(message.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Attempts<I::Output>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

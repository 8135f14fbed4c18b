//! A local fake model for testing purpose.

mod script;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use skillbench_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelTurn,
};

pub use script::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Error {
    pub fn message(&self) -> &str {
        self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Default)]
struct SharedState {
    cursor: AtomicU64,
    round_trips: AtomicU64,
    failed_attempts: Mutex<HashMap<u64, u64>>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to set up the script, which is the
/// sequence of turns the model should answer with. Each request consumes
/// the next scripted turn; when the script runs out, an error is returned.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetTurn>,
    state: Arc<SharedState>,
}

impl TestModelProvider {
    /// Appends a scripted turn to the script.
    #[inline]
    pub fn add_turn(&mut self, preset: PresetTurn) {
        self.script.push(preset);
    }

    /// Returns the number of round trips this provider has served,
    /// including the ones that were answered with a scripted failure.
    #[inline]
    pub fn round_trips(&self) -> u64 {
        self.state.round_trips.load(Ordering::SeqCst)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = Error;

    fn send_request(
        &self,
        _req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelTurn, Self::Error>> + Send + 'static
    {
        let this = self.clone();
        async move {
            this.state.round_trips.fetch_add(1, Ordering::SeqCst);

            let idx = this.state.cursor.load(Ordering::SeqCst);
            let Some(preset) = this.script.get(idx as usize) else {
                return Err(Error {
                    message: "no scripted turns left",
                    kind: ErrorKind::Other,
                });
            };

            if let Some(failures) = preset.failures {
                let mut attempts = this
                    .state
                    .failed_attempts
                    .lock()
                    .expect("test model state is poisoned");
                let count = attempts.entry(idx).or_insert(0);
                if failures == 0 || *count < failures {
                    *count += 1;
                    return Err(Error {
                        message: "scripted failure",
                        kind: ErrorKind::Transport,
                    });
                }
            }

            this.state.cursor.fetch_add(1, Ordering::SeqCst);
            Ok(preset.turn.clone())
        }
    }
}

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::{StreamExt, future, stream};

use super::MemoryStore;
use crate::source::{FragmentSource, FragmentStream};
use crate::{Error, Result};

/// What a [`ScriptedSource`] does after its last fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEnd {
    /// End the stream normally.
    Exhaust,
    /// Raise a source error with the given message.
    Fail(String),
    /// Never yield again.
    Pending,
}

/// Fragment source that replays a fixed script.
///
/// Yields to the runtime between fragments so concurrent sessions interleave.
pub struct ScriptedSource {
    fragments: Vec<String>,
    end: ScriptEnd,
    open_error: Option<String>,
    probe: Option<MemoryStore>,
    state: Mutex<ScriptState>,
}

#[derive(Default)]
struct ScriptState {
    prompts: Vec<String>,
    writes_at_open: Vec<usize>,
}

impl ScriptedSource {
    /// Creates a source yielding `fragments` and then ending normally.
    pub fn new<I>(fragments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            end: ScriptEnd::Exhaust,
            open_error: None,
            probe: None,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Raises an error after the last fragment.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.end = ScriptEnd::Fail(message.into());
        self
    }

    /// Stays pending forever after the last fragment.
    pub fn then_pending(mut self) -> Self {
        self.end = ScriptEnd::Pending;
        self
    }

    /// Fails to open with the given message.
    pub fn failing_to_open(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Records how many writes `store` had seen each time the source is opened.
    pub fn observing(mut self, store: MemoryStore) -> Self {
        self.probe = Some(store);
        self
    }

    /// Returns the prompts the source was opened with.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Returns the observed store write counts at each open.
    pub fn writes_at_open(&self) -> Vec<usize> {
        self.lock().writes_at_open.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FragmentSource for ScriptedSource {
    async fn open(&self, prompt: &str) -> Result<FragmentStream> {
        {
            let mut state = self.lock();
            state.prompts.push(prompt.to_owned());
            if let Some(store) = &self.probe {
                state.writes_at_open.push(store.writes().len());
            }
        }

        if let Some(message) = &self.open_error {
            return Err(Error::source_failure().with_message(message.clone()));
        }

        let fragments = stream::iter(self.fragments.clone()).then(|fragment| async move {
            tokio::task::yield_now().await;
            Ok::<_, Error>(fragment)
        });

        let tail: FragmentStream = match &self.end {
            ScriptEnd::Exhaust => stream::empty().boxed(),
            ScriptEnd::Fail(message) => {
                let error = Error::source_failure().with_message(message.clone());
                stream::once(future::ready(Err(error))).boxed()
            }
            ScriptEnd::Pending => stream::pending().boxed(),
        };

        Ok(fragments.chain(tail).boxed())
    }
}

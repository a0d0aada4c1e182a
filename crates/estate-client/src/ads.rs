//! Screen-owned ad placement lifecycle.
//!
//! An [`AdSession`] wraps one provider placement and walks it through
//! `Unloaded -> Loading -> Ready -> Showing -> Unloaded`. After a failed load
//! or a closed ad, the session schedules a single reload according to its
//! [`RetryPolicy`]; a timed reload the provider refuses schedules the next.
//! Dropping the session cancels the pending reload.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdState {
    Unloaded,
    Loading,
    Ready,
    Showing,
}

impl AdState {
    pub fn label(self) -> &'static str {
        match self {
            AdState::Unloaded => "unloaded",
            AdState::Loading => "loading",
            AdState::Ready => "ready",
            AdState::Showing => "showing",
        }
    }
}

impl fmt::Display for AdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdError {
    #[error("cannot {action} while the ad is {from}")]
    InvalidTransition { from: AdState, action: &'static str },
    #[error("ad provider error: {0}")]
    Provider(String),
}

/// The `load`/`show`/`close` contract of a third-party ad placement.
///
/// Load completion is reported back through [`AdSession::loaded`] or
/// [`AdSession::load_failed`]; dismissal through [`AdSession::closed`].
pub trait AdProvider: Send + Sync + 'static {
    fn load(&self) -> Result<(), AdError>;
    fn show(&self) -> Result<(), AdError>;
    fn close(&self) -> Result<(), AdError>;
}

/// Delay before reloading a placement: `interval` plus up to `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn new(interval: Duration, jitter: Duration) -> Self {
        Self { interval, jitter }
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(rng.gen_range(0..=jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(15))
    }
}

struct Machine {
    state: AdState,
    reopen: Option<JoinHandle<()>>,
    generation: u64,
    /// Set once the owning session is dropped; nothing is scheduled after.
    retired: bool,
}

struct Shared<P> {
    provider: P,
    machine: Mutex<Machine>,
}

impl<P: AdProvider> Shared<P> {
    fn machine(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().expect("ad session mutex poisoned")
    }

    fn transition(
        &self,
        from: AdState,
        to: AdState,
        action: &'static str,
    ) -> Result<(), AdError> {
        let mut machine = self.machine();
        if machine.state != from {
            return Err(AdError::InvalidTransition {
                from: machine.state,
                action,
            });
        }
        machine.state = to;
        debug!(%from, %to, "ad transition");
        Ok(())
    }

    fn begin_load(&self) -> Result<(), AdError> {
        self.transition(AdState::Unloaded, AdState::Loading, "load")?;
        if let Err(err) = self.provider.load() {
            self.machine().state = AdState::Unloaded;
            return Err(err);
        }
        Ok(())
    }

    /// Claims a fired reopen timer. `false` if it was superseded meanwhile.
    fn claim_reopen(&self, generation: u64) -> bool {
        let mut machine = self.machine();
        if machine.generation != generation {
            return false;
        }
        machine.reopen = None;
        true
    }

    /// Arms the single reload timer, replacing any pending one. A provider
    /// error from the timed load arms it again.
    fn schedule_reopen(self: &Arc<Self>, policy: RetryPolicy) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; ad reload not scheduled");
            return;
        };
        let delay = policy.next_delay(&mut rand::thread_rng());

        let mut machine = self.machine();
        if machine.retired {
            return;
        }
        machine.generation += 1;
        if let Some(previous) = machine.reopen.take() {
            previous.abort();
        }
        let generation = machine.generation;
        let shared = Arc::clone(self);
        debug!(delay_ms = delay.as_millis() as u64, "ad reload scheduled");
        machine.reopen = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !shared.claim_reopen(generation) {
                return;
            }
            match shared.begin_load() {
                Ok(()) => {}
                Err(err @ AdError::Provider(_)) => {
                    warn!(error = %err, "scheduled ad reload failed; retrying");
                    shared.schedule_reopen(policy);
                }
                Err(err) => warn!(error = %err, "scheduled ad reload skipped"),
            }
        }));
    }
}

/// One ad placement owned by the screen that shows it.
pub struct AdSession<P: AdProvider> {
    shared: Arc<Shared<P>>,
    policy: RetryPolicy,
}

impl<P: AdProvider> AdSession<P> {
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                machine: Mutex::new(Machine {
                    state: AdState::Unloaded,
                    reopen: None,
                    generation: 0,
                    retired: false,
                }),
            }),
            policy,
        }
    }

    pub fn state(&self) -> AdState {
        self.shared.machine().state
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn provider(&self) -> &P {
        &self.shared.provider
    }

    pub fn has_pending_reopen(&self) -> bool {
        self.shared.machine().reopen.is_some()
    }

    /// Ask the provider for an ad. Cancels any scheduled reload.
    pub fn begin_load(&self) -> Result<(), AdError> {
        self.cancel_reopen();
        let result = self.shared.begin_load();
        if let Err(AdError::Provider(_)) = &result {
            self.schedule_reopen();
        }
        result
    }

    pub fn loaded(&self) -> Result<(), AdError> {
        self.shared
            .transition(AdState::Loading, AdState::Ready, "finish loading")
    }

    pub fn load_failed(&self) -> Result<(), AdError> {
        self.shared
            .transition(AdState::Loading, AdState::Unloaded, "fail loading")?;
        self.schedule_reopen();
        Ok(())
    }

    pub fn show(&self) -> Result<(), AdError> {
        self.shared
            .transition(AdState::Ready, AdState::Showing, "show")?;
        if let Err(err) = self.shared.provider.show() {
            self.shared.machine().state = AdState::Unloaded;
            self.schedule_reopen();
            return Err(err);
        }
        Ok(())
    }

    /// The user dismissed the ad.
    pub fn closed(&self) -> Result<(), AdError> {
        self.shared
            .transition(AdState::Showing, AdState::Unloaded, "close")?;
        self.schedule_reopen();
        Ok(())
    }

    fn cancel_reopen(&self) {
        let mut machine = self.shared.machine();
        machine.generation += 1;
        if let Some(handle) = machine.reopen.take() {
            handle.abort();
        }
    }

    fn schedule_reopen(&self) {
        self.shared.schedule_reopen(self.policy);
    }
}

impl<P: AdProvider> Drop for AdSession<P> {
    fn drop(&mut self) {
        let showing = {
            let mut machine = self.shared.machine();
            machine.retired = true;
            if let Some(handle) = machine.reopen.take() {
                handle.abort();
            }
            machine.state == AdState::Showing
        };
        if showing {
            if let Err(err) = self.shared.provider.close() {
                warn!(error = %err, "closing ad on teardown failed");
            }
        }
    }
}

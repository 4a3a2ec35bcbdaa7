//! Service controller
//!
//! The streaming process is needed iff at least one subscription asks for
//! instant delivery. The controller holds the process-wide run-state and
//! applies a desired state by issuing a start or stop command to the
//! lifecycle collaborator. Check and act happen under one lock, so two
//! concurrent callers can never issue contradictory commands based on the
//! same stale state.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::subscriber::SubscriptionId;
use crate::utils::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    Start,
    Stop,
}

impl From<RunState> for ServiceCommand {
    fn from(desired: RunState) -> Self {
        match desired {
            RunState::Running => ServiceCommand::Start,
            RunState::Stopped => ServiceCommand::Stop,
        }
    }
}

/// Starts and stops the process that owns the streaming connections.
pub trait ServiceLifecycle: Send + Sync {
    fn execute(&self, command: ServiceCommand) -> Result<()>;
}

impl ServiceLifecycle for UnboundedSender<ServiceCommand> {
    fn execute(&self, command: ServiceCommand) -> Result<()> {
        self.send(command)
            .map_err(|_| Error::Lifecycle(format!("{command:?}: command queue is closed")))
    }
}

/// `Running` iff at least one subscription has instant delivery enabled.
pub fn decide_run_state<I>(subscriptions: I) -> RunState
where
    I: IntoIterator<Item = (SubscriptionId, bool)>,
{
    if subscriptions.into_iter().any(|(_, instant)| instant) {
        RunState::Running
    } else {
        RunState::Stopped
    }
}

#[derive(Debug)]
pub struct ServiceController<L> {
    state: Mutex<RunState>,
    lifecycle: L,
}

impl<L: ServiceLifecycle> ServiceController<L> {
    pub fn new(lifecycle: L) -> Self {
        Self::with_state(lifecycle, RunState::Stopped)
    }

    pub fn with_state(lifecycle: L, state: RunState) -> Self {
        Self {
            state: Mutex::new(state),
            lifecycle,
        }
    }

    pub fn run_state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lifecycle(&self) -> &L {
        &self.lifecycle
    }

    /// Issues the command for `desired` unless it would stop an already
    /// stopped service. Starting a running service is re-issued so the
    /// process picks up a changed subscription set.
    ///
    /// Returns the command issued, if any. On a failed command the recorded
    /// state is left unchanged.
    pub fn apply_run_state(&self, desired: RunState) -> Result<Option<ServiceCommand>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if desired == RunState::Stopped && *state == RunState::Stopped {
            debug!("Subscriber service already stopped");
            return Ok(None);
        }

        let command = ServiceCommand::from(desired);
        info!(?command, current = ?*state, "Performing subscriber service action");
        if let Err(e) = self.lifecycle.execute(command) {
            warn!(?command, error = %e, "Subscriber service action failed");
            return Err(e);
        }
        *state = desired;
        Ok(Some(command))
    }

    /// Decides from `subscriptions` and applies the result.
    pub fn refresh<I>(&self, subscriptions: I) -> Result<Option<ServiceCommand>>
    where
        I: IntoIterator<Item = (SubscriptionId, bool)>,
    {
        self.apply_run_state(decide_run_state(subscriptions))
    }
}

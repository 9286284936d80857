//! Provisioning controller with a single-session guard

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info};

use crate::{
    config::Settings,
    core::{
        error::{ProvisionError, ProvisionResult},
        progress::ProgressSink,
        session::Session,
        types::{Credentials, DeviceRef, Outcome, SessionId, Stage},
    },
    transport::Connector,
};

/// Bookkeeping for the one session allowed at a time
#[derive(Debug, Default)]
struct SessionSlot {
    active: Option<SessionId>,
    last_outcome: Option<Outcome>,
}

impl SessionSlot {
    fn begin(&mut self, id: SessionId) -> ProvisionResult<()> {
        match self.active {
            None => {
                self.active = Some(id);
                Ok(())
            }
            Some(_) => Err(ProvisionError::SessionBusy),
        }
    }

    fn finish(&mut self, id: SessionId) {
        if self.active == Some(id) {
            self.active = None;
        }
    }
}

fn lock(slot: &Mutex<SessionSlot>) -> MutexGuard<'_, SessionSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Claim on the controller's session slot, held by the running session
///
/// Dropping the lease frees the slot and resets the published stage to
/// `Idle`, including when the session task panics.
pub(crate) struct SessionLease {
    id: SessionId,
    slot: Arc<Mutex<SessionSlot>>,
    stage: Arc<watch::Sender<Stage>>,
}

impl SessionLease {
    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn publish(&self, stage: Stage) {
        self.stage.send_replace(stage);
    }

    /// Record the outcome and free the slot
    pub(crate) fn release(self, outcome: Outcome) {
        lock(&self.slot).last_outcome = Some(outcome);
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        lock(&self.slot).finish(self.id);
        self.stage.send_replace(Stage::Idle);
    }
}

/// Requests cooperative cancellation of one session
#[derive(Debug, Clone)]
pub struct Canceller(Arc<watch::Sender<bool>>);

impl Canceller {
    /// Ask the session to stop at its next suspension point
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Handle to a running session
pub struct SessionHandle {
    id: SessionId,
    cancel: Arc<watch::Sender<bool>>,
    task: JoinHandle<Outcome>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Ask the session to stop at its next suspension point
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Cancellation handle that outlives [`SessionHandle::wait`]
    pub fn canceller(&self) -> Canceller {
        Canceller(self.cancel.clone())
    }

    /// Wait for the session to reach its terminal state
    pub async fn wait(self) -> Outcome {
        let SessionHandle {
            id,
            cancel: _cancel,
            task,
        } = self;

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(session = %id, "Session worker aborted: {}", e);
                Outcome::Failed {
                    stage: Stage::Failed,
                    error: ProvisionError::ConnectionError(format!("session worker aborted: {e}")),
                }
            }
        }
    }
}

/// Drives provisioning sessions, one at a time
///
/// Each session runs on its own task. Starting a session while another one
/// is active fails with [`ProvisionError::SessionBusy`].
pub struct ProvisioningController<C: Connector> {
    connector: Arc<C>,
    settings: Settings,
    slot: Arc<Mutex<SessionSlot>>,
    stage: Arc<watch::Sender<Stage>>,
}

impl<C: Connector> ProvisioningController<C> {
    /// Create a new provisioning controller
    pub fn new(connector: Arc<C>, settings: Settings) -> Self {
        let (stage, _) = watch::channel(Stage::Idle);

        Self {
            connector,
            settings,
            slot: Arc::new(Mutex::new(SessionSlot::default())),
            stage: Arc::new(stage),
        }
    }

    /// Begin one session on a dedicated task
    ///
    /// Returns as soon as the session is spawned; progress goes to `sink`.
    pub fn start<S: ProgressSink>(
        &self,
        device: DeviceRef,
        credentials: Credentials,
        sink: Arc<S>,
    ) -> ProvisionResult<SessionHandle> {
        let id = SessionId::new();
        lock(&self.slot).begin(id)?;

        let lease = SessionLease {
            id,
            slot: self.slot.clone(),
            stage: self.stage.clone(),
        };
        let (cancel_tx, cancel_rx) = watch::channel(false);

        info!(session = %id, device = %device, ssid = credentials.ssid(), "Starting provisioning session");

        let session = Session::new(
            device,
            credentials,
            self.settings.clone(),
            self.connector.clone(),
            sink,
            cancel_rx,
        )
        .with_lease(lease);

        let task = tokio::spawn(session.run());

        Ok(SessionHandle {
            id,
            cancel: Arc::new(cancel_tx),
            task,
        })
    }

    /// Run one session to completion
    pub async fn provision<S: ProgressSink>(
        &self,
        device: DeviceRef,
        credentials: Credentials,
        sink: Arc<S>,
    ) -> ProvisionResult<Outcome> {
        Ok(self.start(device, credentials, sink)?.wait().await)
    }

    /// Stage of the active session, `Idle` when none is running
    pub fn stage(&self) -> Stage {
        *self.stage.borrow()
    }

    /// Subscribe to stage changes
    pub fn watch_stage(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.slot).active.is_some()
    }

    /// Outcome of the most recently finished session
    pub fn last_outcome(&self) -> Option<Outcome> {
        lock(&self.slot).last_outcome.clone()
    }
}

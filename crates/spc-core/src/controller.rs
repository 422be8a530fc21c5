// ── Controller abstraction ──
//
// Lifecycle management for one SPC panel: login, the poll loop, command
// serialization and state publication. Every network operation against
// the panel runs while holding the client lock, so polls and commands
// never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use spc_api::{Credentials, PanelCommand, PanelInfo, PanelState, Transport, WebUiClient};

use crate::command::{Ack, CommandIssuer};
use crate::config::PanelConfig;
use crate::error::CoreError;
use crate::model::{PanelSnapshot, SchedulerPhase};

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the Web UI client
/// behind one lock shared by the poll loop and commands.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: PanelConfig,
    transport: Option<Arc<dyn Transport>>,
    background: bool,
    client: Mutex<Option<WebUiClient>>,
    snapshot: watch::Sender<PanelSnapshot>,
    phase: watch::Sender<SchedulerPhase>,
    connection_state: watch::Sender<ConnectionState>,
    panel_info: watch::Sender<PanelInfo>,
    cancel: Mutex<Option<CancellationToken>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a new Controller from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to log in and start polling.
    pub fn new(config: PanelConfig) -> Self {
        Self::build(config, None, true)
    }

    /// Like [`new()`](Self::new), but talking through `transport` instead
    /// of a legacy TLS connection to `config.url`.
    pub fn with_transport(config: PanelConfig, transport: Arc<dyn Transport>) -> Self {
        Self::build(config, Some(transport), true)
    }

    fn build(config: PanelConfig, transport: Option<Arc<dyn Transport>>, background: bool) -> Self {
        let (snapshot, _) = watch::channel(PanelSnapshot::default());
        let (phase, _) = watch::channel(SchedulerPhase::Idle);
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (panel_info, _) = watch::channel(PanelInfo::default());

        Self {
            inner: Arc::new(ControllerInner {
                config,
                transport,
                background,
                client: Mutex::new(None),
                snapshot,
                phase,
                connection_state,
                panel_info,
                cancel: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the panel configuration.
    pub fn config(&self) -> &PanelConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the panel.
    ///
    /// Logs in, runs an initial poll and spawns the poll loop. Only rejected
    /// credentials or an unreachable panel fail the connect: an unreadable
    /// first poll is counted like any other failed poll.
    ///
    /// Also the way out of [`Failed`](ConnectionState::Failed) after the
    /// panel rejected the credentials mid-session.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        config.validate()?;

        if *self.inner.connection_state.borrow() == ConnectionState::Connected {
            debug!("already connected");
            return Ok(());
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let mut client = match self.build_client() {
            Ok(client) => client,
            Err(e) => {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                return Err(e);
            }
        };

        if let Err(e) = client.login().await {
            self.inner.connection_state.send_replace(ConnectionState::Failed);
            let err = CoreError::from(e);
            error!(url = %config.url, error = %err, "panel login failed");
            return Err(err);
        }

        self.inner.panel_info.send_replace(client.panel_info().clone());
        *self.inner.client.lock().await = Some(client);

        // Initial read; failures here are reflected in the snapshot.
        if let Err(e) = self.refresh().await {
            if *self.inner.connection_state.borrow() == ConnectionState::Failed {
                return Err(e);
            }
            debug!(error = %e, "initial poll failed");
        }

        if self.inner.background {
            let cancel = CancellationToken::new();
            let ctrl = self.clone();
            let handle = tokio::spawn(poll_task(ctrl, config.poll_interval, cancel.clone()));
            self.inner.task_handles.lock().await.push(handle);
            *self.inner.cancel.lock().await = Some(cancel);
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connected);
        info!(
            panel = %self.panel_info().display_name(),
            url = %config.url,
            "connected to panel"
        );
        Ok(())
    }

    /// Disconnect from the panel.
    ///
    /// Stops the poll loop, logs out (best effort) and resets the connection
    /// state to [`Disconnected`](ConnectionState::Disconnected). The
    /// controller may be connected again afterwards.
    pub async fn disconnect(&self) {
        if let Some(cancel) = self.inner.cancel.lock().await.take() {
            cancel.cancel();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        let client = self.inner.client.lock().await.take();
        if let Some(mut client) = client {
            if let Err(e) = client.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }

        self.inner.phase.send_replace(SchedulerPhase::Idle);
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        info!("disconnected from panel");
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// No poll loop is started; the closure sees the state from the
    /// initial poll and may [`refresh()`](Self::refresh) or issue commands.
    pub async fn oneshot<F, Fut, T>(config: PanelConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let controller = Self::build(config, None, false);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Run one poll now, waiting for any in-flight operation first.
    pub async fn refresh(&self) -> Result<PanelState, CoreError> {
        let mut guard = self.inner.client.lock().await;
        let client = guard.as_mut().ok_or(CoreError::NotConnected)?;

        self.inner.phase.send_replace(SchedulerPhase::Polling);
        let result = client.read_state().await;
        let rejected = client.credentials_rejected();
        self.reconcile(&result);

        if rejected {
            *guard = None;
            drop(guard);
            self.halt_after_rejection().await;
        }
        result.map_err(CoreError::from)
    }

    /// Last confirmed state, or `Unknown` while the panel is unavailable.
    pub fn get_state(&self) -> PanelState {
        self.inner.snapshot.borrow().effective_state()
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Arm or disarm "All Areas" and wait for the panel to confirm.
    ///
    /// Queues behind any in-flight poll. The whole call, including that
    /// wait, is bounded by the configured command timeout; dropping the
    /// future abandons the command.
    pub async fn set_state(&self, command: PanelCommand) -> Result<Ack, CoreError> {
        let limit = self.inner.config.command_timeout;
        match tokio::time::timeout(limit, self.run_command(command)).await {
            Ok(result) => result,
            Err(_) => {
                self.settle_phase();
                let last_state = self.inner.snapshot.borrow().state;
                warn!(%command, timeout_secs = limit.as_secs(), "command timed out");
                Err(CoreError::CommandTimeout {
                    command,
                    last_state,
                })
            }
        }
    }

    async fn run_command(&self, command: PanelCommand) -> Result<Ack, CoreError> {
        let mut guard = self.inner.client.lock().await;
        let client = guard.as_mut().ok_or(CoreError::NotConnected)?;

        let config = &self.inner.config;
        let issuer = CommandIssuer::new(config.confirmation_polls, config.confirmation_interval);
        let last_known = self.inner.snapshot.borrow().state;

        info!(%command, "issuing command");
        self.inner.phase.send_replace(SchedulerPhase::Polling);

        let result = issuer
            .issue(client, command, last_known, |read| self.reconcile(read))
            .await;

        if client.credentials_rejected() {
            *guard = None;
            drop(guard);
            self.halt_after_rejection().await;
        } else if result.is_err() {
            self.settle_phase();
        }
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Current published snapshot.
    pub fn snapshot(&self) -> PanelSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Subscribe to scheduler phase changes.
    pub fn phase(&self) -> watch::Receiver<SchedulerPhase> {
        self.inner.phase.subscribe()
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Panel identification captured at connect.
    pub fn panel_info(&self) -> PanelInfo {
        self.inner.panel_info.borrow().clone()
    }

    // ── Internals ────────────────────────────────────────────────

    fn build_client(&self) -> Result<WebUiClient, CoreError> {
        let config = &self.inner.config;
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let endpoints = config.endpoints.clone();

        let client = match &self.inner.transport {
            Some(transport) => {
                WebUiClient::with_transport(Arc::clone(transport), credentials, endpoints)
            }
            None => WebUiClient::new(&config.url, credentials, endpoints, &config.transport())?,
        };
        Ok(client)
    }

    /// Fold one read into the published snapshot and phase.
    fn reconcile(&self, result: &Result<PanelState, spc_api::Error>) {
        let threshold = self.inner.config.failure_threshold;

        match result {
            Ok(state) => {
                self.inner.phase.send_replace(SchedulerPhase::Reconciling);
                let state = *state;
                self.inner.snapshot.send_modify(|snap| {
                    if !snap.available && snap.consecutive_failures >= threshold {
                        info!(%state, "panel available again");
                    } else if snap.state != state {
                        info!(from = %snap.state, to = %state, "panel state changed");
                    }
                    snap.state = state;
                    snap.available = true;
                    snap.consecutive_failures = 0;
                    snap.updated_at = Some(chrono::Utc::now());
                    snap.last_error = None;
                });
            }
            Err(e) => {
                self.inner.snapshot.send_modify(|snap| {
                    snap.consecutive_failures = snap.consecutive_failures.saturating_add(1);
                    snap.last_error = Some(e.to_string());
                    let failures = snap.consecutive_failures;

                    if e.is_auth_rejected() || e.is_auth_expired() {
                        error!(failures, error = %e, "panel poll failed: authentication");
                    } else {
                        warn!(failures, error = %e, "panel poll failed");
                    }

                    if failures >= threshold && snap.available {
                        warn!(failures, "panel unavailable");
                        snap.available = false;
                    }
                });
            }
        }

        self.settle_phase();
    }

    /// Rejected credentials are terminal: the client is dropped and the
    /// poll loop stopped, so nothing posts them again until the host calls
    /// [`connect()`](Self::connect).
    async fn halt_after_rejection(&self) {
        if let Some(cancel) = self.inner.cancel.lock().await.take() {
            cancel.cancel();
        }
        self.inner.snapshot.send_modify(|snap| snap.available = false);
        self.inner.phase.send_replace(SchedulerPhase::Faulted);
        self.inner.connection_state.send_replace(ConnectionState::Failed);
        error!("panel rejected the credentials, polling stopped until reconnect");
    }

    fn settle_phase(&self) {
        let snap = self.inner.snapshot.borrow();
        let faulted = snap.consecutive_failures >= self.inner.config.failure_threshold;
        drop(snap);
        self.inner.phase.send_replace(if faulted {
            SchedulerPhase::Faulted
        } else {
            SchedulerPhase::Idle
        });
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Poll the panel on a fixed interval until cancelled.
async fn poll_task(controller: Controller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match controller.refresh().await {
                    Ok(_) => {}
                    Err(CoreError::NotConnected) => break,
                    Err(e) => debug!(error = %e, "scheduled poll failed"),
                }
            }
        }
    }
    debug!("poll loop stopped");
}

#![allow(clippy::unwrap_used)]
// Scheduler and command tests against a scripted in-process panel.
//
// All tests run on tokio's paused clock: the fake panel sleeps to simulate
// latency, and the runtime auto-advances time whenever every task waits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::header::LOCATION;
use http::{HeaderMap, Method, StatusCode};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use url::Url;

use spc_api::{PanelRequest, PanelResponse};
use spc_core::{
    Ack, ConnectionState, Controller, CoreError, PanelCommand, PanelConfig, PanelState,
    SchedulerPhase, Transport,
};

// ── Scripted panel ──────────────────────────────────────────────────

const LATENCY: Duration = Duration::from_millis(50);

const LOGIN_PAGE: &str =
    r#"<form action="login.htm"><input name="userid"><input type="password" name="password"></form>"#;

#[derive(Debug, Clone, Copy)]
enum Fault {
    Timeout,
    Garbage,
    Expire,
}

struct Script {
    state: PanelState,
    session: Option<u32>,
    next_session: u32,
    faults: VecDeque<Fault>,
    pending: Option<(PanelState, u32)>,
    apply_delay: u32,
    ignore_commands: bool,
    reject_commands: bool,
    password_ok: bool,
}

struct FakePanel {
    script: Mutex<Script>,
    log: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakePanel {
    fn new(state: PanelState) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script {
                state,
                session: None,
                next_session: 1,
                faults: VecDeque::new(),
                pending: None,
                apply_delay: 0,
                ignore_commands: false,
                reject_commands: false,
                password_ok: true,
            }),
            log: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn configure(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    fn push_faults(&self, faults: &[Fault]) {
        self.script.lock().unwrap().faults.extend(faults.iter().copied());
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    fn count(&self, op: &str) -> usize {
        self.log().iter().filter(|entry| *entry == op).count()
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, op: impl Into<String>) {
        self.log.lock().unwrap().push(op.into());
    }

    fn handle(&self, request: &PanelRequest) -> Result<PanelResponse, spc_api::Error> {
        let mut script = self.script.lock().unwrap();
        let path = request.path.as_str();

        if path.starts_with("/login.htm") {
            self.record("login");
            if !script.password_ok {
                return Ok(page(StatusCode::OK, LOGIN_PAGE));
            }
            let id = script.next_session;
            script.next_session += 1;
            script.session = Some(id);
            return Ok(redirect(&format!(
                "/secure.htm?session=0x{id:02X}&page=spc_home"
            )));
        }

        let session_ok = script.session.is_some_and(|id| path.contains(&format!("session=0x{id:02X}&")));

        if path.contains("page=spc_home") {
            self.record("landing");
            return Ok(page(
                StatusCode::OK,
                "<table><tr><td>Panel Type</td><td>SPC4320</td></tr></table>",
            ));
        }

        if path.contains("page=logout") {
            self.record("logout");
            script.session = None;
            return Ok(page(StatusCode::OK, "bye"));
        }

        if path.contains("action=update") && request.method == Method::POST {
            let form = request.form.clone().unwrap_or_default();
            let command = if form.contains("fullset_all") {
                PanelCommand::Arm
            } else {
                PanelCommand::Disarm
            };
            if !session_ok {
                return Ok(page(StatusCode::OK, LOGIN_PAGE));
            }
            self.record(format!("command:{command}"));
            if script.reject_commands {
                return Ok(page(StatusCode::INTERNAL_SERVER_ERROR, "refused"));
            }
            if !script.ignore_commands {
                script.pending = Some((command.target_state(), script.apply_delay));
            }
            return Ok(page(StatusCode::OK, &summary(script.state)));
        }

        if path.contains("page=system_summary") {
            if !session_ok {
                self.record("status:expired");
                return Ok(page(StatusCode::OK, LOGIN_PAGE));
            }
            self.record("status");
            match script.faults.pop_front() {
                Some(Fault::Timeout) => return Err(spc_api::Error::Timeout { timeout_secs: 10 }),
                Some(Fault::Garbage) => {
                    return Ok(page(StatusCode::OK, "<h1>System busy</h1>"));
                }
                Some(Fault::Expire) => {
                    script.session = None;
                    return Ok(page(StatusCode::OK, LOGIN_PAGE));
                }
                None => {}
            }
            if let Some((target, remaining)) = script.pending {
                if remaining == 0 {
                    script.state = target;
                    script.pending = None;
                } else {
                    script.pending = Some((target, remaining - 1));
                }
            }
            return Ok(page(StatusCode::OK, &summary(script.state)));
        }

        Ok(page(StatusCode::NOT_FOUND, "not found"))
    }
}

#[async_trait]
impl Transport for FakePanel {
    async fn send(&self, request: PanelRequest) -> Result<PanelResponse, spc_api::Error> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(LATENCY).await;
        let response = self.handle(&request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

fn summary(state: PanelState) -> String {
    let label = match state {
        PanelState::Unset => "Unset",
        PanelState::Fullset => "Fullset",
        PanelState::Unknown => "",
    };
    format!(
        "<table><tr><td>All Areas</td><td>{label}</td>\
         <td><input type=\"submit\" name=\"fullset_all\" value=\"Fullset\"></td></tr></table>"
    )
}

fn page(status: StatusCode, body: &str) -> PanelResponse {
    PanelResponse {
        status,
        headers: HeaderMap::new(),
        body: body.to_owned(),
    }
}

fn redirect(location: &str) -> PanelResponse {
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, location.parse().unwrap());
    PanelResponse {
        status: StatusCode::FOUND,
        headers,
        body: String::new(),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn config() -> PanelConfig {
    PanelConfig::new(
        Url::parse("https://panel.test").unwrap(),
        "engineer",
        SecretString::from("1111".to_string()),
    )
}

async fn connected(state: PanelState) -> (Arc<FakePanel>, Controller) {
    connected_with(state, config()).await
}

async fn connected_with(state: PanelState, config: PanelConfig) -> (Arc<FakePanel>, Controller) {
    let panel = FakePanel::new(state);
    let controller = Controller::with_transport(config, panel.clone());
    controller.connect().await.unwrap();
    panel.clear_log();
    (panel, controller)
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_connect_publishes_initial_state() {
    let panel = FakePanel::new(PanelState::Unset);
    let controller = Controller::with_transport(config(), panel.clone());

    controller.connect().await.unwrap();

    assert_eq!(panel.log(), vec!["login", "landing", "status"]);
    assert_eq!(controller.get_state(), PanelState::Unset);
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Connected);
    assert_eq!(controller.panel_info().display_name(), "SPC4320");

    let snapshot = controller.snapshot();
    assert!(snapshot.available);
    assert!(snapshot.updated_at.is_some());

    controller.disconnect().await;
    assert_eq!(panel.log().last().map(String::as_str), Some("logout"));
    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_credentials_fail_connect() {
    let panel = FakePanel::new(PanelState::Unset);
    panel.configure(|s| s.password_ok = false);
    let controller = Controller::with_transport(config(), panel.clone());

    let result = controller.connect().await;

    assert!(
        matches!(result, Err(CoreError::AuthenticationFailed { .. })),
        "expected AuthenticationFailed, got: {result:?}"
    );
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Failed);
    assert_eq!(panel.count("status"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_disconnect() {
    let (panel, controller) = connected(PanelState::Fullset).await;

    controller.disconnect().await;
    controller.connect().await.unwrap();

    assert_eq!(panel.count("login"), 1);
    assert_eq!(controller.get_state(), PanelState::Fullset);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_commands_require_connection() {
    let panel = FakePanel::new(PanelState::Unset);
    let controller = Controller::with_transport(config(), panel.clone());

    let result = controller.set_state(PanelCommand::Arm).await;

    assert!(matches!(result, Err(CoreError::NotConnected)));
    assert!(panel.log().is_empty());
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_poll_loop_runs_on_interval() {
    let (panel, controller) = connected(PanelState::Unset).await;

    panel.configure(|s| s.state = PanelState::Fullset);
    tokio::time::sleep(Duration::from_secs(75)).await;

    assert_eq!(panel.count("status"), 2);
    assert_eq!(controller.get_state(), PanelState::Fullset);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_parse_error_keeps_last_state() {
    let (panel, controller) = connected(PanelState::Fullset).await;
    panel.push_faults(&[Fault::Garbage]);

    let result = controller.refresh().await;

    assert!(matches!(result, Err(CoreError::Parse(_))), "got: {result:?}");
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, PanelState::Fullset);
    assert!(snapshot.available);
    assert_eq!(snapshot.consecutive_failures, 1);
    assert!(snapshot.last_error.is_some());
    assert_eq!(controller.get_state(), PanelState::Fullset);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_faults_after_threshold_and_recovers() {
    let (panel, controller) = connected(PanelState::Unset).await;
    panel.push_faults(&[Fault::Timeout, Fault::Timeout, Fault::Timeout]);

    for _ in 0..2 {
        assert!(controller.refresh().await.is_err());
    }
    assert!(controller.snapshot().available);
    assert_eq!(*controller.phase().borrow(), SchedulerPhase::Idle);

    let err = controller.refresh().await.unwrap_err();
    assert!(matches!(err, CoreError::Timeout { .. }));
    assert!(!controller.snapshot().available);
    assert_eq!(controller.get_state(), PanelState::Unknown);
    assert_eq!(*controller.phase().borrow(), SchedulerPhase::Faulted);

    assert_eq!(controller.refresh().await.unwrap(), PanelState::Unset);
    let snapshot = controller.snapshot();
    assert!(snapshot.available);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(controller.get_state(), PanelState::Unset);
    assert_eq!(*controller.phase().borrow(), SchedulerPhase::Idle);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_reauthenticates_once() {
    let (panel, controller) = connected(PanelState::Unset).await;
    panel.push_faults(&[Fault::Expire]);

    assert_eq!(controller.refresh().await.unwrap(), PanelState::Unset);

    assert_eq!(panel.count("login"), 1);
    assert_eq!(panel.count("status"), 2);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_auth_failure_during_poll_counts_as_failure() {
    let (panel, controller) = connected(PanelState::Unset).await;
    panel.configure(|s| s.password_ok = false);
    panel.push_faults(&[Fault::Expire]);

    let err = controller.refresh().await.unwrap_err();

    assert!(matches!(err, CoreError::AuthenticationFailed { .. }), "got: {err:?}");
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.consecutive_failures, 1);
    assert!(snapshot.last_error.is_some());
    assert_eq!(snapshot.state, PanelState::Unset);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_rejected_credentials_stop_polling() {
    let (panel, controller) = connected(PanelState::Unset).await;
    panel.configure(|s| s.password_ok = false);
    panel.push_faults(&[Fault::Expire]);

    tokio::time::sleep(Duration::from_secs(305)).await;

    assert_eq!(panel.count("login"), 1);
    assert_eq!(panel.count("status"), 1);
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Failed);
    assert_eq!(*controller.phase().borrow(), SchedulerPhase::Faulted);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.consecutive_failures, 1);
    assert!(!snapshot.available);
    assert_eq!(controller.get_state(), PanelState::Unknown);

    let result = controller.set_state(PanelCommand::Arm).await;
    assert!(matches!(result, Err(CoreError::NotConnected)), "got: {result:?}");
    assert_eq!(panel.count("login"), 1);

    panel.configure(|s| s.password_ok = true);
    controller.connect().await.unwrap();
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Connected);
    assert_eq!(controller.get_state(), PanelState::Unset);
    controller.disconnect().await;
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_arm_when_already_armed_acks() {
    let (panel, controller) = connected(PanelState::Fullset).await;

    let ack = controller.set_state(PanelCommand::Arm).await.unwrap();

    assert_eq!(
        ack,
        Ack {
            state: PanelState::Fullset,
            polls: 1
        }
    );
    assert_eq!(panel.log(), vec!["command:arm", "status"]);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_disarm_converges_within_window() {
    let (panel, controller) = connected(PanelState::Fullset).await;
    panel.configure(|s| s.apply_delay = 2);

    let ack = controller.set_state(PanelCommand::Disarm).await.unwrap();

    assert_eq!(ack.polls, 3);
    assert_eq!(ack.state, PanelState::Unset);
    assert_eq!(controller.get_state(), PanelState::Unset);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_command_times_out() {
    let (panel, controller) = connected(PanelState::Unset).await;
    panel.configure(|s| s.ignore_commands = true);

    let err = controller.set_state(PanelCommand::Arm).await.unwrap_err();

    match err {
        CoreError::CommandTimeout {
            command,
            last_state,
        } => {
            assert_eq!(command, PanelCommand::Arm);
            assert_eq!(last_state, PanelState::Unset);
        }
        other => panic!("expected CommandTimeout, got: {other:?}"),
    }
    assert_eq!(panel.count("command:arm"), 1);
    assert_eq!(panel.count("status"), 3);
    assert_eq!(controller.get_state(), PanelState::Unset);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_rejected_command_is_surfaced() {
    let (panel, controller) = connected(PanelState::Unset).await;
    panel.configure(|s| s.reject_commands = true);

    let err = controller.set_state(PanelCommand::Arm).await.unwrap_err();

    assert!(
        matches!(err, CoreError::CommandRejected { status: 500, .. }),
        "got: {err:?}"
    );
    assert_eq!(panel.count("status"), 0);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_command_bounded_by_timeout() {
    let mut config = config();
    config.command_timeout = Duration::from_secs(1);
    let (panel, controller) = connected_with(PanelState::Unset, config).await;
    panel.configure(|s| s.ignore_commands = true);

    let err = controller.set_state(PanelCommand::Arm).await.unwrap_err();

    assert!(
        matches!(
            err,
            CoreError::CommandTimeout {
                last_state: PanelState::Unset,
                ..
            }
        ),
        "got: {err:?}"
    );
    // Only the first confirmation poll fits inside the bound.
    assert_eq!(panel.count("status"), 1);
    assert_eq!(*controller.phase().borrow(), SchedulerPhase::Idle);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_command_timeout_during_read_settles_phase() {
    let mut config = config();
    // Expires while the first confirmation read is on the wire.
    config.command_timeout = Duration::from_millis(75);
    let (panel, controller) = connected_with(PanelState::Unset, config).await;

    let err = controller.set_state(PanelCommand::Arm).await.unwrap_err();

    assert!(matches!(err, CoreError::CommandTimeout { .. }), "got: {err:?}");
    assert_eq!(panel.count("command:arm"), 1);
    assert_eq!(panel.count("status"), 0);
    assert_eq!(*controller.phase().borrow(), SchedulerPhase::Idle);
    controller.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_command_waits_for_inflight_poll() {
    let (panel, controller) = connected(PanelState::Fullset).await;

    let poller = controller.clone();
    let poll = tokio::spawn(async move { poller.refresh().await });
    while panel.in_flight() == 0 {
        tokio::task::yield_now().await;
    }

    let ack = controller.set_state(PanelCommand::Disarm).await.unwrap();
    poll.await.unwrap().unwrap();

    assert_eq!(ack.state, PanelState::Unset);
    assert_eq!(panel.log(), vec!["status", "command:disarm", "status"]);
    assert_eq!(panel.max_in_flight(), 1);
    controller.disconnect().await;
}

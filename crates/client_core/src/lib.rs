use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use shared::{
    domain::{StudentForm, StudentRecord, Uid},
    protocol::RegisterStudentRequest,
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

pub mod api;
pub mod config;
pub mod error;

pub use api::DeskApi;
pub use config::{load_settings, Settings};
pub use error::{AuthError, FetchError, RegistrationError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Source of "the most recently scanned UID". `Ok(None)` means no scan has
/// been observed yet, which is an ordinary answer rather than a failure.
#[async_trait]
pub trait UidSource: Send + Sync {
    async fn latest_uid(&self) -> Result<Option<Uid>, FetchError>;
}

#[async_trait]
pub trait RegistrationSink: Send + Sync {
    async fn register(&self, request: RegisterStudentRequest)
        -> Result<StudentRecord, RegistrationError>;
}

#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn list_students(&self) -> Result<Vec<StudentRecord>, FetchError>;
}

pub struct MissingUidSource;

#[async_trait]
impl UidSource for MissingUidSource {
    async fn latest_uid(&self) -> Result<Option<Uid>, FetchError> {
        Err(FetchError::Transport("uid source is not configured".into()))
    }
}

pub struct MissingRegistrationSink;

#[async_trait]
impl RegistrationSink for MissingRegistrationSink {
    async fn register(
        &self,
        _request: RegisterStudentRequest,
    ) -> Result<StudentRecord, RegistrationError> {
        Err(RegistrationError::Transport(
            "registration sink is not configured".into(),
        ))
    }
}

/// Last hardware UID observed. Replaced wholesale on every new observation.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedUid {
    pub value: Uid,
    pub captured_at: Instant,
}

impl CapturedUid {
    fn new(value: Uid) -> Self {
        Self {
            value,
            captured_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Waiting,
    Captured(CapturedUid),
    Refreshing,
    Failed(String),
}

impl CaptureState {
    pub fn uid(&self) -> Option<&Uid> {
        match self {
            CaptureState::Captured(captured) => Some(&captured.value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CaptureEvent {
    StateChanged(CaptureState),
    RegistrationAccepted(StudentRecord),
}

struct ControllerInner {
    /// Advanced on every session open and close. A response tagged with any
    /// other epoch is stale and must not mutate state or notify.
    epoch: u64,
    state: CaptureState,
    poll_task: Option<JoinHandle<()>>,
    poll_in_flight: bool,
    refresh_in_flight: bool,
}

/// Owns one capture session at a time: a background polling task against the
/// UID source, an explicit single-flight refresh, and the capture state the
/// registration form keys off. Constructed once and shared; the presentation
/// layer subscribes to [`CaptureEvent`]s instead of being reached into.
pub struct CaptureController {
    source: Arc<dyn UidSource>,
    sink: Arc<dyn RegistrationSink>,
    poll_interval: Duration,
    inner: Mutex<ControllerInner>,
    events: broadcast::Sender<CaptureEvent>,
}

impl CaptureController {
    pub fn new(
        source: Arc<dyn UidSource>,
        sink: Arc<dyn RegistrationSink>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            source,
            sink,
            poll_interval,
            inner: Mutex::new(ControllerInner {
                epoch: 0,
                state: CaptureState::Idle,
                poll_task: None,
                poll_in_flight: false,
                refresh_in_flight: false,
            }),
            events,
        })
    }

    /// Controller with no backend wired up yet; every probe fails until the
    /// real collaborators replace it.
    pub fn unconfigured() -> Arc<Self> {
        Self::new(
            Arc::new(MissingUidSource),
            Arc::new(MissingRegistrationSink),
            DEFAULT_POLL_INTERVAL,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    /// Starts a capture session: state goes to `Waiting` and the polling
    /// task probes the UID source immediately, then at the configured
    /// interval. An already-open session is closed first, so there is never
    /// more than one polling task.
    pub async fn open_session(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        if let Some(task) = inner.poll_task.take() {
            task.abort();
        }
        inner.epoch += 1;
        inner.poll_in_flight = false;
        inner.refresh_in_flight = false;
        inner.state = CaptureState::Waiting;
        let epoch = inner.epoch;

        let controller = Arc::clone(self);
        inner.poll_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(controller.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                controller.poll_once(epoch).await;
            }
        }));
        // Emitted before the lock is released so the spawned task cannot
        // announce a capture ahead of the Waiting notification.
        self.emit(CaptureState::Waiting);
    }

    /// Stops polling and discards the session. Idempotent. In-flight results
    /// are invalidated by the epoch advance; no network-level cancellation
    /// is attempted.
    pub async fn close_session(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == CaptureState::Idle && inner.poll_task.is_none() {
            return;
        }
        if let Some(task) = inner.poll_task.take() {
            task.abort();
        }
        inner.epoch += 1;
        inner.poll_in_flight = false;
        inner.refresh_in_flight = false;
        inner.state = CaptureState::Idle;
        self.emit(CaptureState::Idle);
    }

    /// One background probe, tagged with the epoch current when the owning
    /// session started. Ticks that fire while a previous probe is still in
    /// flight are skipped rather than queued.
    async fn poll_once(&self, epoch: u64) {
        {
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch || inner.poll_in_flight {
                return;
            }
            inner.poll_in_flight = true;
        }

        let result = self.source.latest_uid().await;

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            return;
        }
        inner.poll_in_flight = false;
        match result {
            Ok(Some(uid)) => {
                let already_captured =
                    matches!(&inner.state, CaptureState::Captured(captured) if captured.value == uid);
                if !already_captured {
                    let state = CaptureState::Captured(CapturedUid::new(uid.clone()));
                    inner.state = state.clone();
                    info!("capture: new uid detected uid={uid}");
                    self.emit(state);
                }
            }
            Ok(None) => {
                // A transient empty poll never regresses a capture; it only
                // clears a Failed state left behind by an explicit refresh.
                if matches!(inner.state, CaptureState::Failed(_)) {
                    inner.state = CaptureState::Waiting;
                    self.emit(CaptureState::Waiting);
                }
            }
            Err(err) => {
                warn!("capture: background poll failed, retrying next tick: {err}");
            }
        }
    }

    /// Explicit operator-driven probe. Single-flight: a call that overlaps an
    /// outstanding refresh issues no request and reports the in-flight state.
    /// Unlike background polling, an empty answer regresses to `Waiting` and
    /// a fetch failure surfaces as `Failed`.
    pub async fn refresh(&self) -> CaptureState {
        let epoch = {
            let mut inner = self.inner.lock().await;
            if inner.state == CaptureState::Idle {
                return CaptureState::Idle;
            }
            if inner.refresh_in_flight {
                return inner.state.clone();
            }
            inner.refresh_in_flight = true;
            inner.state = CaptureState::Refreshing;
            self.emit(CaptureState::Refreshing);
            inner.epoch
        };

        let result = self.source.latest_uid().await;

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            return inner.state.clone();
        }
        inner.refresh_in_flight = false;
        let state = match result {
            Ok(Some(uid)) => CaptureState::Captured(CapturedUid::new(uid)),
            Ok(None) => CaptureState::Waiting,
            Err(err) => {
                warn!("capture: refresh failed: {err}");
                CaptureState::Failed(err.to_string())
            }
        };
        inner.state = state.clone();
        self.emit(state.clone());
        state
    }

    pub async fn current_state(&self) -> CaptureState {
        self.inner.lock().await.state.clone()
    }

    /// The captured UID, only while state is `Captured`. `Refreshing` and
    /// `Failed` both answer `None` so a submission can never reuse a stale
    /// UID while a fresh check is outstanding.
    pub async fn current_uid(&self) -> Option<Uid> {
        self.inner.lock().await.state.uid().cloned()
    }

    pub async fn can_submit(&self) -> bool {
        matches!(self.inner.lock().await.state, CaptureState::Captured(_))
    }

    /// Validates the form, attaches the captured UID, and submits. Success
    /// destroys the session. Rejection leaves the capture state untouched so
    /// the same UID stays valid for a retry.
    pub async fn register_student(
        &self,
        form: StudentForm,
    ) -> Result<StudentRecord, RegistrationError> {
        validate_form(&form)?;

        let (uid, epoch) = {
            let inner = self.inner.lock().await;
            match &inner.state {
                CaptureState::Captured(captured) => (captured.value.clone(), inner.epoch),
                _ => return Err(RegistrationError::NoCapturedUid),
            }
        };

        let record = self
            .sink
            .register(RegisterStudentRequest::from_form(form, uid))
            .await?;
        info!(
            "registration accepted matric_no={} uid={:?}",
            record.matric_no, record.uid
        );
        // Only tear down the session the capture belonged to. If it was
        // closed or replaced while the request was in flight, the current
        // session is left alone.
        let same_session = self.inner.lock().await.epoch == epoch;
        if same_session {
            self.close_session().await;
        }
        let _ = self
            .events
            .send(CaptureEvent::RegistrationAccepted(record.clone()));
        Ok(record)
    }

    // Called with the state lock held, so notifications arrive in the same
    // order the transitions happened.
    fn emit(&self, state: CaptureState) {
        let _ = self.events.send(CaptureEvent::StateChanged(state));
    }
}

fn validate_form(form: &StudentForm) -> Result<(), RegistrationError> {
    let required: [(&'static str, &str); 6] = [
        ("name", &form.name),
        ("matric number", &form.matric_no),
        ("email", &form.email),
        ("phone", &form.phone),
        ("level", &form.level),
        ("department", &form.department),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(RegistrationError::MissingField { field });
        }
    }
    if !is_plausible_email(&form.email) {
        return Err(RegistrationError::InvalidEmail(form.email.clone()));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            let clean = |s: &str| !s.is_empty() && !s.contains(char::is_whitespace);
            clean(local) && domain.contains('.') && clean(domain) && !domain.ends_with('.')
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

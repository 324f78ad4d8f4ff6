//! One in-progress form: a blueprint, its answer store, the navigator and
//! the autosave task, all owned by the session and dropped with it.

use std::sync::Arc;
use std::time::Duration;

use rfq_form_spec::{
    Answer, AnswerError, AnswerMap, AnswerSet, AnswerStore, Blueprint, CompletenessReport,
    FormPolicy, HydrationReport, NavState, Navigation, NavigationError, Navigator, RenderSection,
    SubmissionAdapter, SubmissionError, SubmissionId, SubscriptionId, TemplateRegistry,
    overall_completeness,
};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, SubmitCleanup};
use crate::drafts::{DraftError, DraftStore};
use crate::submission::{SubmissionClient, Submitter};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("form has already been submitted")]
    AlreadySubmitted,
    #[error("session is closed")]
    Closed,
    #[error("no template registered for category '{0}'")]
    UnknownTemplate(String),
    #[error("submission result arrived for a stale attempt")]
    StaleSubmission,
}

/// A submission call running in the background.
#[derive(Debug)]
pub struct PendingSubmission {
    instance_id: Uuid,
    attempt: u64,
    handle: JoinHandle<Result<SubmissionId, SubmissionError>>,
}

impl PendingSubmission {
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Waits for the collaborator call to finish.
    pub async fn outcome(self) -> SubmissionOutcome {
        let result = match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(SubmissionError::Unknown(format!(
                "submission task failed: {err}"
            ))),
        };
        SubmissionOutcome {
            instance_id: self.instance_id,
            attempt: self.attempt,
            result,
        }
    }
}

/// Result of a submission attempt, tagged with the attempt that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub instance_id: Uuid,
    pub attempt: u64,
    pub result: Result<SubmissionId, SubmissionError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Submitted(SubmissionId),
    Failed(SubmissionError),
    /// The outcome belongs to another session, an older attempt, or a
    /// session that was closed meanwhile. Nothing was changed.
    Stale,
}

#[derive(Debug)]
struct Autosave {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    subscription: SubscriptionId,
}

pub struct FormSession {
    instance_id: Uuid,
    blueprint: Blueprint,
    policy: FormPolicy,
    cleanup: SubmitCleanup,
    store: AnswerStore,
    navigator: Navigator,
    drafts: Arc<dyn DraftStore>,
    submitter: Submitter,
    autosave: Option<Autosave>,
    hydration: Option<HydrationReport>,
    attempt: u64,
    in_flight: Option<u64>,
    listing: Option<SubmissionId>,
    closed: bool,
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("instance_id", &self.instance_id)
            .field("form_id", &self.blueprint.form_id())
            .field("state", &self.navigator.state())
            .field("attempt", &self.attempt)
            .field("in_flight", &self.in_flight)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl FormSession {
    /// Opens a session, restoring a saved draft when one exists. Draft load
    /// failures are logged and the session starts empty.
    pub async fn open(
        blueprint: Blueprint,
        config: &EngineConfig,
        drafts: Arc<dyn DraftStore>,
        client: Arc<dyn SubmissionClient>,
    ) -> Result<Self, SessionError> {
        let policy = config.form_policy();
        let submitter = Submitter::new(
            client,
            SubmissionAdapter::new(policy.completion, policy.required),
            config.submission_timeout(),
        );
        let mut session = Self {
            instance_id: Uuid::new_v4(),
            store: AnswerStore::new(blueprint.clone()),
            navigator: Navigator::new(blueprint.clone(), policy.navigation, policy.required),
            blueprint,
            policy,
            cleanup: config.submit_cleanup,
            drafts,
            submitter,
            autosave: None,
            hydration: None,
            attempt: 0,
            in_flight: None,
            listing: None,
            closed: false,
        };

        let form_id = session.blueprint.form_id().to_string();
        match session.drafts.load_draft(&form_id).await {
            Ok(Some(draft)) => {
                let report = session.store.hydrate(draft);
                let index = session.navigator.resume(session.store.answers())?;
                info!(
                    form = %form_id,
                    applied = report.applied.len(),
                    dropped = report.dropped.len(),
                    section = index,
                    "draft restored"
                );
                session.hydration = Some(report);
            }
            Ok(None) => {}
            Err(err) => warn!(form = %form_id, error = %err, "ignoring unreadable draft"),
        }

        if let Some(period) = config.autosave_interval() {
            session.start_autosave(period);
        }
        debug!(form = %form_id, instance = %session.instance_id, "session opened");
        Ok(session)
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn policy(&self) -> &FormPolicy {
        &self.policy
    }

    pub fn answers(&self) -> &AnswerMap {
        self.store.answers()
    }

    pub fn store(&self) -> &AnswerStore {
        &self.store
    }

    pub fn state(&self) -> NavState {
        self.navigator.state()
    }

    /// Report of the draft restored by [`FormSession::open`], if any.
    pub fn hydration(&self) -> Option<&HydrationReport> {
        self.hydration.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_autosaving(&self) -> bool {
        self.autosave.is_some()
    }

    pub fn listing_id(&self) -> Option<&SubmissionId> {
        self.listing.as_ref()
    }

    pub fn set_answer(
        &mut self,
        component_id: &str,
        field_id: &str,
        value: impl Into<Answer>,
    ) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.store.set(component_id, field_id, value.into())?;
        Ok(())
    }

    pub fn set_option_checked(
        &mut self,
        component_id: &str,
        field_id: &str,
        label: &str,
        checked: bool,
    ) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.store
            .set_option_checked(component_id, field_id, label, checked)?;
        Ok(())
    }

    pub fn set_option_detail(
        &mut self,
        component_id: &str,
        field_id: &str,
        label: &str,
        detail: f64,
    ) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.store
            .set_option_detail(component_id, field_id, label, detail)?;
        Ok(())
    }

    pub fn clear_field(
        &mut self,
        component_id: &str,
        field_id: &str,
    ) -> Result<Option<Answer>, SessionError> {
        self.ensure_editable()?;
        Ok(self.store.clear_field(component_id, field_id)?)
    }

    /// Merges a category template's prefill into the answers.
    pub fn apply_template(
        &mut self,
        registry: &TemplateRegistry,
        category: &str,
    ) -> Result<HydrationReport, SessionError> {
        self.ensure_editable()?;
        let template = registry
            .get(category)
            .ok_or_else(|| SessionError::UnknownTemplate(category.to_string()))?;
        let report = self.store.merge(template.prefill.clone());
        debug!(
            form = %self.blueprint.form_id(),
            category = %template.category,
            applied = report.applied.len(),
            "template applied"
        );
        Ok(report)
    }

    pub fn completeness(&self) -> CompletenessReport {
        overall_completeness(&self.blueprint, self.store.answers(), &self.policy.required)
    }

    pub fn current_section(&self) -> Result<RenderSection, SessionError> {
        Ok(self.navigator.render(self.store.answers())?)
    }

    pub fn next(&mut self) -> Result<Navigation, SessionError> {
        self.ensure_open()?;
        Ok(self.navigator.next(self.store.answers())?)
    }

    pub fn previous(&mut self) -> Result<Navigation, SessionError> {
        self.ensure_open()?;
        Ok(self.navigator.previous()?)
    }

    pub fn jump_to(&mut self, index: usize) -> Result<Navigation, SessionError> {
        self.ensure_open()?;
        Ok(self.navigator.jump_to(index, self.store.answers())?)
    }

    /// Persists the current answers immediately.
    pub async fn save_draft(&self) -> Result<(), SessionError> {
        let snapshot = stamp(self.store.snapshot());
        self.drafts
            .save_draft(self.blueprint.form_id(), &snapshot)
            .await?;
        Ok(())
    }

    /// Validates the answers and starts the collaborator call in the
    /// background. Only one call may be in flight at a time.
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, SessionError> {
        self.ensure_open()?;
        if self.in_flight.is_some() {
            return Err(SessionError::SubmissionInFlight);
        }
        let payload = self
            .submitter
            .adapter()
            .prepare(&self.blueprint, self.store.answers())?;

        self.attempt += 1;
        self.in_flight = Some(self.attempt);
        info!(
            form = %self.blueprint.form_id(),
            instance = %self.instance_id,
            attempt = self.attempt,
            "submission started"
        );

        let submitter = self.submitter.clone();
        let handle = tokio::spawn(async move { submitter.send(&payload).await });
        Ok(PendingSubmission {
            instance_id: self.instance_id,
            attempt: self.attempt,
            handle,
        })
    }

    /// Applies the outcome of [`FormSession::begin_submit`]. Outcomes that do
    /// not match the in-flight attempt of this open session are ignored.
    pub async fn complete_submit(&mut self, outcome: SubmissionOutcome) -> SubmitStatus {
        if outcome.instance_id != self.instance_id
            || self.closed
            || self.in_flight != Some(outcome.attempt)
        {
            debug!(
                instance = %outcome.instance_id,
                attempt = outcome.attempt,
                "ignoring stale submission outcome"
            );
            return SubmitStatus::Stale;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(id) => {
                self.navigator.mark_submitted();
                self.stop_autosave().await;
                if self.cleanup == SubmitCleanup::Clear {
                    self.store.clear();
                    let form_id = self.blueprint.form_id();
                    if let Err(err) = self.drafts.discard_draft(form_id).await {
                        warn!(form = %form_id, error = %err, "failed to discard draft");
                    }
                }
                self.listing = Some(id.clone());
                SubmitStatus::Submitted(id)
            }
            Err(err) => SubmitStatus::Failed(err),
        }
    }

    /// Submits and waits for the result.
    pub async fn submit(&mut self) -> Result<SubmissionId, SessionError> {
        let pending = self.begin_submit()?;
        let outcome = pending.outcome().await;
        match self.complete_submit(outcome).await {
            SubmitStatus::Submitted(id) => Ok(id),
            SubmitStatus::Failed(err) => Err(err.into()),
            SubmitStatus::Stale => Err(SessionError::StaleSubmission),
        }
    }

    /// Stops autosave and persists unsubmitted answers. An in-flight
    /// submission keeps running but its outcome will be ignored.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stop_autosave().await;
        if !self.navigator.is_submitted() && !self.store.is_empty() {
            self.save_draft().await?;
        }
        debug!(form = %self.blueprint.form_id(), instance = %self.instance_id, "session closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if self.navigator.is_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.in_flight.is_some() {
            return Err(SessionError::SubmissionInFlight);
        }
        Ok(())
    }

    fn start_autosave(&mut self, period: Duration) {
        let (tx, rx) = watch::channel(self.store.snapshot());
        let form_id = self.blueprint.form_id().to_string();
        let subscription = self.store.subscribe({
            let form_id = form_id.clone();
            move |_, answers| {
                tx.send_replace(AnswerSet {
                    form_id: form_id.clone(),
                    answers: answers.clone(),
                    meta: None,
                });
            }
        });

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_autosave(
            form_id,
            Arc::clone(&self.drafts),
            rx,
            period,
            cancel.clone(),
        ));
        self.autosave = Some(Autosave {
            cancel,
            handle,
            subscription,
        });
    }

    /// Cancels the autosave task and waits for it, so a write already in
    /// progress lands before anything the caller does next.
    async fn stop_autosave(&mut self) {
        let Some(autosave) = self.autosave.take() else {
            return;
        };
        autosave.cancel.cancel();
        self.store.unsubscribe(autosave.subscription);
        if let Err(err) = autosave.handle.await {
            warn!(form = %self.blueprint.form_id(), error = %err, "autosave task failed");
        }
    }
}

impl Drop for FormSession {
    fn drop(&mut self) {
        if let Some(autosave) = &self.autosave {
            autosave.cancel.cancel();
        }
    }
}

fn stamp(snapshot: AnswerSet) -> AnswerSet {
    match OffsetDateTime::now_utc().format(&Rfc3339) {
        Ok(saved_at) => snapshot.with_saved_at(saved_at),
        Err(_) => snapshot,
    }
}

async fn run_autosave(
    form_id: String,
    drafts: Arc<dyn DraftStore>,
    mut snapshots: watch::Receiver<AnswerSet>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(form = %form_id, ?period, "autosave started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match snapshots.has_changed() {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => break,
                }
                let snapshot = stamp(snapshots.borrow_and_update().clone());
                // Runs to completion even if cancelled meanwhile; stopping
                // waits for it.
                match drafts.save_draft(&form_id, &snapshot).await {
                    Ok(()) => {
                        debug!(form = %form_id, fields = snapshot.field_count(), "autosaved")
                    }
                    Err(err) => warn!(form = %form_id, error = %err, "autosave failed"),
                }
            }
        }
    }
    debug!(form = %form_id, "autosave stopped");
}

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rfq_form_spec::{
    Answer, AnswerSet, Blueprint, CollaboratorError, NavState, Navigation, NavigationError,
    RFQ_INTAKE_BLUEPRINT, SubmissionError, SubmissionId, SubmissionPayload, TemplateRegistry,
};
use stackmatch_forms::{
    DraftError, DraftStore, EngineConfig, FormSession, MemoryDraftStore, SessionError, SubmissionClient,
    SubmitCleanup, SubmitStatus,
};

const TWO_QUESTIONS: &str = include_str!("fixtures/two_questions.json");

struct FakeClient {
    delay: Duration,
    result: Result<SubmissionId, CollaboratorError>,
    seen: Mutex<Vec<SubmissionPayload>>,
}

impl FakeClient {
    fn ok(id: &str) -> Arc<Self> {
        Self::with(Duration::from_millis(10), Ok(SubmissionId::from(id)))
    }

    fn with(delay: Duration, result: Result<SubmissionId, CollaboratorError>) -> Arc<Self> {
        Arc::new(Self {
            delay,
            result,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl SubmissionClient for FakeClient {
    async fn create_listing(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionId, CollaboratorError> {
        self.seen.lock().unwrap().push(payload.clone());
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

fn blueprint() -> Blueprint {
    Blueprint::from_json_str(TWO_QUESTIONS).expect("blueprint")
}

fn memory() -> Arc<MemoryDraftStore> {
    Arc::new(MemoryDraftStore::new())
}

fn quiet_config() -> EngineConfig {
    EngineConfig {
        autosave_interval_secs: 0,
        ..EngineConfig::default()
    }
}

async fn open(
    config: &EngineConfig,
    drafts: Arc<MemoryDraftStore>,
    client: Arc<FakeClient>,
) -> FormSession {
    FormSession::open(blueprint(), config, drafts, client)
        .await
        .expect("session")
}

async fn answered(
    config: &EngineConfig,
    drafts: Arc<MemoryDraftStore>,
    client: Arc<FakeClient>,
) -> FormSession {
    let mut session = open(config, drafts, client).await;
    session.set_answer("c1", "q1", "hello").expect("q1");
    session.set_answer("c1", "q2", "world").expect("q2");
    session
}

#[tokio::test]
async fn open_restores_draft_and_resumes() {
    let drafts = memory();
    let raw = serde_json::json!({
        "formId": "f",
        "answers": { "c1": { "q1": "a", "q2": "b", "old": "x" } }
    });
    let draft: AnswerSet = serde_json::from_value(raw).expect("draft");
    drafts.save_draft("f", &draft).await.expect("seed");

    let session = open(&quiet_config(), drafts, FakeClient::ok("lst_1")).await;
    let report = session.hydration().expect("hydrated");
    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(session.state(), NavState::AtSection { index: 1 });
    assert_eq!(session.completeness().percent, 100);
}

#[tokio::test]
async fn navigation_is_gated_through_the_session() {
    let mut session = open(
        &quiet_config(),
        memory(),
        FakeClient::ok("lst_1"),
    )
    .await;

    assert!(matches!(
        session.next(),
        Err(SessionError::Navigation(NavigationError::Blocked(_)))
    ));
    session.set_answer("c1", "q1", "hello").expect("q1");
    session.set_answer("c1", "q2", "world").expect("q2");
    assert_eq!(session.next().expect("next"), Navigation::Moved { from: 0, to: 1 });
    assert_eq!(
        session.next().expect("last"),
        Navigation::ReadyToSubmit { index: 1 }
    );
    assert_eq!(session.current_section().expect("render").section_id, "s2");
    assert_eq!(session.previous().expect("back"), Navigation::Moved { from: 1, to: 0 });
    assert!(session.jump_to(1).is_ok());
}

#[tokio::test(start_paused = true)]
async fn autosave_writes_only_changed_snapshots() {
    let drafts = memory();
    let config = EngineConfig::default();
    let mut session = open(&config, drafts.clone(), FakeClient::ok("lst_1")).await;
    assert!(session.is_autosaving());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(drafts.is_empty(), "nothing changed yet");

    session.set_answer("c1", "q1", "hello").expect("q1");
    tokio::time::sleep(Duration::from_secs(5)).await;
    let saved = drafts.get("f").expect("autosaved");
    assert_eq!(saved.answers["c1"]["q1"], Answer::text("hello"));
    assert!(saved.meta.and_then(|meta| meta.saved_at).is_some());

    drafts.discard_draft("f").await.expect("discard");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(drafts.is_empty(), "unchanged snapshot is not saved again");

    session.close().await.expect("close");
    assert!(!session.is_autosaving());
}

#[tokio::test(start_paused = true)]
async fn close_persists_answers_and_stops_autosave() {
    let drafts = memory();
    let config = EngineConfig::default();
    let mut session = open(&config, drafts.clone(), FakeClient::ok("lst_1")).await;
    session.set_answer("c1", "q1", "hello").expect("q1");

    session.close().await.expect("close");
    assert!(session.is_closed());
    let draft = drafts.get("f").expect("draft");
    assert_eq!(draft.answers["c1"]["q1"], Answer::text("hello"));

    drafts.discard_draft("f").await.expect("discard");
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(drafts.is_empty());
    assert!(matches!(
        session.set_answer("c1", "q2", "late"),
        Err(SessionError::Closed)
    ));
}

/// Draft store whose first write takes a second to land.
struct SlowDrafts {
    inner: MemoryDraftStore,
    first_write: AtomicBool,
}

#[async_trait]
impl DraftStore for SlowDrafts {
    async fn save_draft(&self, form_id: &str, snapshot: &AnswerSet) -> Result<(), DraftError> {
        if self.first_write.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.inner.save_draft(form_id, snapshot).await
    }

    async fn load_draft(&self, form_id: &str) -> Result<Option<AnswerSet>, DraftError> {
        self.inner.load_draft(form_id).await
    }

    async fn discard_draft(&self, form_id: &str) -> Result<(), DraftError> {
        self.inner.discard_draft(form_id).await
    }
}

fn slow_drafts() -> Arc<SlowDrafts> {
    Arc::new(SlowDrafts {
        inner: MemoryDraftStore::new(),
        first_write: AtomicBool::new(true),
    })
}

fn fast_autosave() -> EngineConfig {
    EngineConfig {
        autosave_interval_secs: 1,
        ..EngineConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn autosave_in_progress_cannot_restore_a_submitted_draft() {
    let drafts = slow_drafts();
    let mut session = FormSession::open(
        blueprint(),
        &fast_autosave(),
        drafts.clone(),
        FakeClient::ok("lst_1"),
    )
    .await
    .expect("session");
    session.set_answer("c1", "q1", "a").expect("q1");
    session.set_answer("c1", "q2", "b").expect("q2");

    // The autosave tick at 1s is still writing when the submission lands.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    session.submit().await.expect("submit");
    assert!(drafts.inner.get("f").is_none());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(drafts.inner.get("f").is_none(), "submitted answers came back as a draft");
}

#[tokio::test(start_paused = true)]
async fn close_keeps_the_latest_answers_over_an_older_autosave() {
    let drafts = slow_drafts();
    let mut session = FormSession::open(
        blueprint(),
        &fast_autosave(),
        drafts.clone(),
        FakeClient::ok("lst_1"),
    )
    .await
    .expect("session");
    session.set_answer("c1", "q1", "a").expect("q1");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    session.set_answer("c1", "q2", "b").expect("q2");
    session.close().await.expect("close");

    tokio::time::sleep(Duration::from_secs(3)).await;
    let draft = drafts.inner.get("f").expect("draft");
    assert_eq!(draft.answers["c1"]["q2"], Answer::text("b"));
}

#[tokio::test]
async fn successful_submit_clears_answers_and_draft() {
    let drafts = memory();
    let client = FakeClient::ok("lst_42");
    let mut session = answered(&quiet_config(), drafts.clone(), client.clone()).await;
    session.save_draft().await.expect("save");

    let id = session.submit().await.expect("submit");
    assert_eq!(id, SubmissionId::from("lst_42"));
    assert_eq!(session.listing_id(), Some(&id));
    assert_eq!(session.state(), NavState::Submitted);
    assert!(session.answers().is_empty());
    assert!(drafts.get("f").is_none());

    let seen = client.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].components["c1"]["q1"], Answer::text("hello"));

    assert!(matches!(
        session.set_answer("c1", "q1", "again"),
        Err(SessionError::AlreadySubmitted)
    ));
    assert!(matches!(session.next(), Err(SessionError::AlreadySubmitted)));
}

#[tokio::test]
async fn archive_cleanup_keeps_answers() {
    let config = EngineConfig {
        submit_cleanup: SubmitCleanup::Archive,
        ..quiet_config()
    };
    let mut session = answered(&config, memory(), FakeClient::ok("lst_7")).await;
    session.submit().await.expect("submit");
    assert_eq!(session.answers()["c1"]["q2"], Answer::text("world"));
}

#[tokio::test]
async fn incomplete_answers_never_reach_the_client() {
    let client = FakeClient::ok("lst_1");
    let mut session = open(&quiet_config(), memory(), client.clone()).await;
    session.set_answer("c1", "q1", "hello").expect("q1");

    let err = session.submit().await.unwrap_err();
    match err {
        SessionError::Submission(SubmissionError::ValidationFailed { percent, missing }) => {
            assert_eq!(percent, 50);
            assert_eq!(missing.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.calls(), 0);
    assert!(!session.is_submitting());
}

#[tokio::test]
async fn only_one_submission_in_flight() {
    let client = FakeClient::with(Duration::from_millis(50), Ok(SubmissionId::from("lst_1")));
    let mut session = answered(&quiet_config(), memory(), client.clone()).await;

    let pending = session.begin_submit().expect("begin");
    assert!(session.is_submitting());
    assert!(matches!(
        session.begin_submit(),
        Err(SessionError::SubmissionInFlight)
    ));
    assert!(matches!(
        session.set_answer("c1", "q1", "edit"),
        Err(SessionError::SubmissionInFlight)
    ));

    let outcome = pending.outcome().await;
    assert_eq!(
        session.complete_submit(outcome.clone()).await,
        SubmitStatus::Submitted(SubmissionId::from("lst_1"))
    );
    // A duplicate delivery of the same outcome changes nothing.
    assert_eq!(session.complete_submit(outcome).await, SubmitStatus::Stale);
    assert_eq!(client.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_client_times_out_as_unavailable() {
    let config = EngineConfig {
        submission_timeout_secs: 3,
        ..quiet_config()
    };
    let client = FakeClient::with(Duration::from_secs(60), Ok(SubmissionId::from("late")));
    let mut session = answered(&config, memory(), client).await;

    let err = session.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Submission(SubmissionError::CollaboratorUnavailable(_))
    ));
    assert!(!session.is_submitting());
    assert_eq!(session.state(), NavState::AtSection { index: 0 });
    assert_eq!(session.answers()["c1"]["q1"], Answer::text("hello"));
}

#[tokio::test]
async fn failed_submission_can_be_retried() {
    let client = FakeClient::with(
        Duration::from_millis(1),
        Err(CollaboratorError::Unavailable("connection refused".into())),
    );
    let mut session = answered(&quiet_config(), memory(), client.clone()).await;

    let pending = session.begin_submit().expect("begin");
    let status = session.complete_submit(pending.outcome().await).await;
    assert!(matches!(
        status,
        SubmitStatus::Failed(SubmissionError::CollaboratorUnavailable(_))
    ));

    let second = session.begin_submit().expect("retry");
    assert_eq!(second.attempt(), 2);
    drop(second);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn late_outcomes_are_ignored_after_close() {
    let drafts = memory();
    let mut session = answered(&quiet_config(), drafts.clone(), FakeClient::ok("lst_1")).await;

    let pending = session.begin_submit().expect("begin");
    session.close().await.expect("close");
    let outcome = pending.outcome().await;
    assert!(outcome.result.is_ok());

    assert_eq!(session.complete_submit(outcome).await, SubmitStatus::Stale);
    assert_eq!(session.state(), NavState::AtSection { index: 0 });
    assert!(session.listing_id().is_none());
    assert!(drafts.get("f").is_some(), "draft written on close is kept");
}

#[tokio::test]
async fn outcomes_from_other_sessions_are_ignored() {
    let mut first = answered(&quiet_config(), memory(), FakeClient::ok("a")).await;
    let mut second = answered(&quiet_config(), memory(), FakeClient::ok("b")).await;
    assert_ne!(first.instance_id(), second.instance_id());

    let pending = first.begin_submit().expect("begin first");
    let _other = second.begin_submit().expect("begin second");
    let outcome = pending.outcome().await;

    assert_eq!(second.complete_submit(outcome.clone()).await, SubmitStatus::Stale);
    assert!(second.is_submitting());
    assert_eq!(
        first.complete_submit(outcome).await,
        SubmitStatus::Submitted(SubmissionId::from("a"))
    );
}

#[tokio::test]
async fn templates_prefill_the_intake_form() {
    let blueprint = Blueprint::from_json_str(RFQ_INTAKE_BLUEPRINT).expect("intake");
    let mut session = FormSession::open(
        blueprint,
        &quiet_config(),
        memory(),
        FakeClient::ok("lst_1"),
    )
    .await
    .expect("session");

    let report = session
        .apply_template(&TemplateRegistry::builtin(), "Security")
        .expect("template");
    assert!(report.is_clean());
    assert_eq!(
        session.store().get("project_scope", "category"),
        Some(&Answer::text("Security"))
    );
    assert!(matches!(
        session.apply_template(&TemplateRegistry::empty(), "crm"),
        Err(SessionError::UnknownTemplate(_))
    ));
}

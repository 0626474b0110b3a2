// Integration tests for scenarios against a fake booking site
//
// These drive a real browser and are ignored by default. Run with:
//   cargo test -p araucaria-verify --test scenarios_test -- --ignored
//
// Tests cover:
// - Checkpoints written on success
// - The quote-to-details booking flow
// - Waits that tolerate several matches for the same text
// - Legal dialogs close without ticking consent
// - Interception of the payment-code API
// - Bounded waits for elements that disappear
// - Failure diagnostics and terminal state on failure

mod common;
mod test_server;

use std::time::Duration;

use araucaria_verify::scenarios::{
    BookingFlow, HeroSearch, HeroTitles, LegalModals, PaymentCode, PromoMessage,
};
use araucaria_verify::{
    BaseUrlConfig, Outcome, Result, RunState, Runner, RunnerConfig, Scenario, ScenarioContext,
    Timeouts,
};
use async_trait::async_trait;
use test_server::TestServer;

fn runner(server: &TestServer, artifacts: &std::path::Path) -> Runner {
    let timeouts = Timeouts {
        assertion: Duration::from_secs(2),
        element: Duration::from_secs(5),
        ..Timeouts::default()
    };
    Runner::new(
        RunnerConfig::default()
            .base_url(BaseUrlConfig::default().url(server.url()))
            .timeouts(timeouts)
            .artifacts_dir(artifacts),
    )
}

#[tokio::test]
#[ignore = "requires Playwright browsers"]
async fn test_hero_titles_writes_checkpoint() {
    common::init_tracing();
    let server = TestServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let report = runner(&server, tmp.path()).run(&HeroTitles).await;

    assert!(report.is_success(), "{:?}", report.outcome);
    assert_eq!(
        report.artifacts,
        vec![tmp.path().join("hero-titles").join("hero-titles.png")]
    );
    assert!(report.artifacts[0].exists());
    assert_eq!(report.states.first(), Some(&RunState::Idle));
    assert_eq!(report.states.last(), Some(&RunState::Success));

    server.shutdown();
}

#[tokio::test]
#[ignore = "requires Playwright browsers"]
async fn test_promo_hides_after_return_requested() {
    common::init_tracing();
    let server = TestServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let report = runner(&server, tmp.path()).run(&PromoMessage).await;

    assert!(report.is_success(), "{:?}", report.outcome);
    assert_eq!(
        checkpoint_names(&report),
        vec!["promo-visible.png", "promo-hidden.png"]
    );

    server.shutdown();
}

#[tokio::test]
#[ignore = "requires Playwright browsers"]
async fn test_payment_code_uses_mocked_api() {
    common::init_tracing();
    let server = TestServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let report = runner(&server, tmp.path()).run(&PaymentCode).await;

    assert!(report.is_success(), "{:?}", report.outcome);
    assert!(tmp.path().join("payment-code/validated.png").exists());

    server.shutdown();
}

fn checkpoint_names(report: &araucaria_verify::RunReport) -> Vec<String> {
    report
        .artifacts
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
#[ignore = "requires Playwright browsers"]
async fn test_booking_flow_reaches_payment_details() {
    common::init_tracing();
    let server = TestServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let report = runner(&server, tmp.path()).run(&BookingFlow).await;

    assert!(report.is_success(), "{:?}", report.outcome);
    let screenshot = tmp.path().join("booking-flow").join("verification.png");
    assert_eq!(report.artifacts, vec![screenshot.clone()]);
    assert!(std::fs::metadata(&screenshot).unwrap().len() > 0);
    assert!(report.states.contains(&RunState::Step {
        index: 2,
        name: "Fill personal details".into()
    }));

    server.shutdown();
}

#[tokio::test]
#[ignore = "requires Playwright browsers"]
async fn test_hero_search_waits_on_first_summary_match() {
    common::init_tracing();
    let server = TestServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    // The summary sheet has both a "Resumen" title and "Resumen de la búsqueda"
    let report = runner(&server, tmp.path()).run(&HeroSearch).await;

    assert!(report.is_success(), "{:?}", report.outcome);
    assert_eq!(checkpoint_names(&report), vec!["summary-sheet.png"]);

    server.shutdown();
}

#[tokio::test]
#[ignore = "requires Playwright browsers"]
async fn test_legal_modals_leave_consent_unchecked() {
    common::init_tracing();
    let server = TestServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let report = runner(&server, tmp.path()).run(&LegalModals).await;

    assert!(report.is_success(), "{:?}", report.outcome);
    assert_eq!(
        checkpoint_names(&report),
        vec!["terms-modal.png", "privacy-modal.png"]
    );
    assert!(!tmp.path().join("legal-modals/failure.png").exists());

    server.shutdown();
}

/// Fails on a selector the fake site never renders
struct MissingSummary;

#[async_trait]
impl Scenario for MissingSummary {
    fn name(&self) -> &'static str {
        "missing-summary"
    }

    fn description(&self) -> &'static str {
        "Expects an element that does not exist"
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.step("Open home page");
        cx.goto("/").await?;
        cx.step("Expect summary");
        cx.expect_visible("text=Resumen de tu viaje").await
    }
}

#[tokio::test]
#[ignore = "requires Playwright browsers"]
async fn test_failure_leaves_screenshot_and_html() {
    common::init_tracing();
    let server = TestServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let report = runner(&server, tmp.path()).run(&MissingSummary).await;

    match &report.outcome {
        Outcome::Failure { message, setup } => {
            assert!(!setup);
            assert!(message.contains("Resumen de tu viaje"), "{}", message);
        }
        Outcome::Success => panic!("scenario should fail"),
    }

    let dir = tmp.path().join("missing-summary");
    assert!(dir.join("failure.png").exists());
    let html = std::fs::read_to_string(dir.join("failure.html")).unwrap();
    assert!(html.contains("Viajes privados y de turismo"));

    assert!(report.states.contains(&RunState::Step {
        index: 2,
        name: "Expect summary".into()
    }));
    assert_eq!(
        &report.states[report.states.len() - 2..],
        &[RunState::Teardown, RunState::Failure]
    );

    server.shutdown();
}

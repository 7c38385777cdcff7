mod common;

use std::sync::Arc;

use adosim::{
    ExportReport, JsonReportAssembler, MarkdownReportAssembler, ReportAssembler, SessionConfig,
    SimulationSession,
};

use common::{patch_db_response, response, scenario, ScriptedClient};

async fn played_session() -> SimulationSession {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(patch_db_response()),
        Ok(response([("H1", 0.2), ("H2", 0.5), ("H3", 0.3)], 600.0, 520.0, 15.0)),
        Ok(response([("H1", 0.2), ("H2", 0.4), ("H3", 0.4)], 520.0, 480.0, 4.0)),
    ]));
    let session =
        SimulationSession::initialize(scenario(), client, SessionConfig::default()).unwrap();
    for action in ["patch_db", "auth_logs", "web_honeypot"] {
        session.apply_action(action).await.unwrap();
    }
    session
}

#[tokio::test]
async fn test_report_carries_the_full_audit_trail() {
    let session = played_session().await;
    let report = ExportReport::from_snapshot(&session.snapshot());

    assert_eq!(report.turns_taken, 3);
    assert_eq!(report.turn_limit, 3);
    assert!(!report.degraded);
    assert!((report.beliefs_sum - 1.0).abs() < 1e-6);
    assert!((report.final_expected_loss - 480.0).abs() < f64::EPSILON);

    let actions: Vec<&str> = report.history.iter().map(|r| r.action_id.as_str()).collect();
    assert_eq!(actions, vec!["patch_db", "auth_logs", "web_honeypot"]);
    assert_eq!(report.ledger_digest, session.ledger().digest());
    assert_eq!(report.assumptions.len(), 5);
}

#[tokio::test]
async fn test_markdown_and_json_documents_are_produced() {
    let session = played_session().await;
    let report = ExportReport::from_snapshot(&session.snapshot());

    let md = MarkdownReportAssembler.assemble(&report).unwrap();
    assert!(md.contains("- Total Turns: 3 of 3"));
    assert!(md.contains("| 3 | Deploy web honeypot placeholder | $8 |"));
    assert!(!md.contains("Offline Mode"));

    let json = JsonReportAssembler::default().assemble(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["history"].as_array().unwrap().len(), 3);
    assert_eq!(value["history"][0]["turn"], 1);
    let h3 = value["final_beliefs"]["H3"].as_f64().unwrap();
    assert!((h3 - 0.4).abs() < 1e-9);
}

#[tokio::test]
async fn test_digest_changes_with_every_turn_and_resets() {
    let client = Arc::new(ScriptedClient::new(vec![Ok(patch_db_response())]));
    let session =
        SimulationSession::initialize(scenario(), client, SessionConfig::default()).unwrap();
    let empty = session.ledger().digest();

    session.apply_action("patch_db").await.unwrap();
    let one = session.ledger().digest();
    assert_ne!(empty, one);

    session.reset();
    assert_eq!(session.ledger().digest(), empty);
}

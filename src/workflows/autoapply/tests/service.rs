use serde_json::json;

use super::common::*;
use crate::workflows::autoapply::domain::{JobId, ListingRecord};
use crate::workflows::autoapply::evaluation::{
    EvaluationConfig, JobOutcome, KeywordFilter, SkipReason,
};
use crate::workflows::autoapply::service::{AutoApplyService, JobSource, RunError, RunOutcome};
use crate::workflows::autoapply::session::ListingPage;

const PAGED: JobSource = JobSource::Listings { per_page: 25 };

fn watermark() -> chrono::NaiveDateTime {
    at(2024, 1, 1, 0)
}

#[test]
fn deferred_job_is_first_candidate_of_next_run() {
    let opens_at = at(2024, 4, 1, 9);
    let mut first = FakeSession::default()
        .with_page(1, page(vec![listing(1000001, "Analyst", at(2024, 2, 1, 0))]))
        .with_detail(1000001, opening_detail(opens_at));
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = service.run(&mut first, PAGED).expect("run completes");
    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.deferred, 1);
    assert_eq!(service.store().deferred_ids(), vec![1000001]);

    let carried = service.store().deferred_records();
    let mut second = FakeSession::default()
        .with_page(1, page(vec![listing(1000002, "Engineer", at(2024, 3, 2, 0))]))
        .with_detail(1000001, open_detail(&[1]))
        .with_detail(1000002, open_detail(&[1]));
    let next = build_service(
        MemoryStore::new(Some(now()), carried),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = next.run(&mut second, PAGED).expect("run completes");
    assert_eq!(second.detail_ids(), vec![1000001, 1000002]);
    assert_eq!(summary.applied, 2);
    assert!(next.store().deferred_ids().is_empty());
}

#[test]
fn logged_application_is_skipped_without_network() {
    let mut session = FakeSession::default()
        .with_page(1, page(vec![listing(10410427, "Analyst", at(2024, 2, 1, 0))]))
        .with_detail(10410427, open_detail(&[1]));
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::with_applied(&[10410427]),
        EvaluationConfig::default(),
    );

    let summary = service.run(&mut session, PAGED).expect("run completes");
    assert!(session.detail_ids().is_empty());
    assert!(session.submitted_ids().is_empty());
    assert_eq!(summary.skip_reasons.get("already-applied"), Some(&1));
}

#[test]
fn pagination_stops_at_watermark_and_evaluates_oldest_first() {
    let mut session = FakeSession::default()
        .with_page(
            1,
            page(vec![
                listing(1000003, "Newest", at(2024, 2, 3, 0)),
                listing(1000002, "Newer", at(2024, 2, 2, 0)),
                listing(10410427, "Already seen", at(2023, 12, 31, 0)),
                listing(1000000, "Older", at(2023, 12, 1, 0)),
            ]),
        )
        .with_page(2, page(vec![listing(1000009, "Never", at(2024, 2, 5, 0))]))
        .with_detail(1000002, open_detail(&[1]))
        .with_detail(1000003, open_detail(&[1]));
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = service.run(&mut session, PAGED).expect("run completes");
    assert_eq!(*session.page_calls.borrow(), vec![1]);
    assert_eq!(session.detail_ids(), vec![1000002, 1000003]);
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.pages_fetched, 1);
}

#[test]
fn pagination_continues_until_empty_page_or_total() {
    let mut open_ended = FakeSession::default()
        .with_page(1, page(vec![listing(1000002, "B", at(2024, 2, 2, 0))]))
        .with_page(2, page(vec![listing(1000001, "A", at(2024, 2, 1, 0))]));
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );
    service.run(&mut open_ended, PAGED).expect("run completes");
    assert_eq!(*open_ended.page_calls.borrow(), vec![1, 2, 3]);

    let mut counted = FakeSession::default().with_page(
        1,
        PageScript::Page(ListingPage {
            listings: vec![listing(1000002, "B", at(2024, 2, 2, 0))],
            total: Some(1),
        }),
    );
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );
    service.run(&mut counted, PAGED).expect("run completes");
    assert_eq!(*counted.page_calls.borrow(), vec![1]);
}

#[test]
fn successful_run_advances_watermark_monotonically() {
    let mut session = FakeSession::default();
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );
    let summary = service.run(&mut session, PAGED).expect("run completes");
    assert_eq!(summary.watermark, Some(now()));
    let state = service.store().state();
    assert_eq!(state.watermark, Some(now()));
    assert!(state.valid);
    assert_eq!(state.cookies["_trajectory_session"], "refreshed");

    let ahead = at(2030, 1, 1, 0);
    let service = build_service(
        MemoryStore::new(Some(ahead), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );
    service
        .run(&mut FakeSession::default(), PAGED)
        .expect("run completes");
    assert_eq!(service.store().state().watermark, Some(ahead));
}

#[test]
fn submission_failure_halts_and_keeps_collected_deferrals() {
    let mut session = FakeSession::default()
        .with_page(
            1,
            page(vec![
                listing(1000003, "Later", at(2024, 2, 3, 0)),
                listing(1000002, "Rejected", at(2024, 2, 2, 0)),
                listing(1000001, "Opens soon", at(2024, 2, 1, 0)),
            ]),
        )
        .with_detail(1000001, opening_detail(at(2024, 5, 1, 0)))
        .with_detail(1000002, open_detail(&[1]))
        .with_detail(1000003, open_detail(&[1]))
        .rejecting_submission(1000002, 401);
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = service.run(&mut session, PAGED).expect("halt is not an error");
    assert_eq!(summary.outcome, RunOutcome::SessionInvalid);
    assert!(summary.failure.is_some());
    assert_eq!(session.detail_ids(), vec![1000001, 1000002]);
    assert_eq!(service.store().deferred_ids(), vec![1000001]);

    let state = service.store().state();
    assert!(!state.valid);
    assert_eq!(state.watermark, Some(watermark()));
    assert_eq!(state.cookies["_trajectory_session"], "refreshed");
    assert!(service.log().entries().is_empty());
}

#[test]
fn failure_during_replay_keeps_unevaluated_deferrals() {
    let deferred: Vec<ListingRecord> = [1000001, 1000002, 1000003]
        .into_iter()
        .map(|id| ListingRecord::from(&listing(id, "Deferred", at(2024, 2, 1, 0))))
        .collect();
    let mut session = FakeSession::default()
        .with_detail(1000001, opening_detail(at(2024, 5, 1, 0)))
        .with_detail(1000002, open_detail(&[1]))
        .rejecting_submission(1000002, 403);
    let service = build_service(
        MemoryStore::new(Some(watermark()), deferred),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = service.run(&mut session, PAGED).expect("halt is not an error");
    assert_eq!(summary.outcome, RunOutcome::SessionInvalid);
    assert!(session.page_calls.borrow().is_empty());
    assert_eq!(
        service.store().deferred_ids(),
        vec![1000001, 1000002, 1000003]
    );
}

#[test]
fn bootstrap_failure_evaluates_nothing() {
    let deferred = vec![ListingRecord::from(&listing(
        1000001,
        "Deferred",
        at(2024, 2, 1, 0),
    ))];
    let mut session = FakeSession {
        token_status: Some(401),
        ..FakeSession::default()
    };
    let service = build_service(
        MemoryStore::new(Some(watermark()), deferred),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = service.run(&mut session, PAGED).expect("halt is not an error");
    assert_eq!(summary.outcome, RunOutcome::SessionInvalid);
    assert!(matches!(
        summary.ensure_session_valid(),
        Err(RunError::SessionRejected(_))
    ));
    assert_eq!(summary.checked, 0);
    assert!(session.detail_ids().is_empty());
    assert_eq!(service.store().deferred_ids(), vec![1000001]);
    assert!(!service.store().state().valid);
}

#[test]
fn listing_failures_distinguish_rejection_from_interruption() {
    let mut rejected = FakeSession::default().with_page(1, PageScript::Status(401));
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );
    let summary = service.run(&mut rejected, PAGED).expect("halt is not an error");
    assert_eq!(summary.outcome, RunOutcome::SessionInvalid);
    assert!(!service.store().state().valid);

    let mut dropped = FakeSession::default()
        .with_page(1, page(vec![listing(1000002, "B", at(2024, 2, 2, 0))]))
        .with_page(2, PageScript::Transport)
        .with_detail(1000002, open_detail(&[1]));
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );
    let summary = service.run(&mut dropped, PAGED).expect("halt is not an error");
    assert_eq!(summary.outcome, RunOutcome::ListingInterrupted);
    assert!(summary.ensure_session_valid().is_ok());
    assert_eq!(summary.applied, 1);
    let state = service.store().state();
    assert!(state.valid);
    assert_eq!(state.watermark, Some(watermark()));
}

#[test]
fn explicit_ids_skip_pagination_and_log_applications() {
    let mut session = FakeSession::default()
        .with_page(1, page(vec![listing(1000009, "Ignored", at(2024, 2, 2, 0))]))
        .with_detail(10410427, open_detail(&[1, 3]))
        .with_detail(1000001, external_detail());
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = service
        .run(
            &mut session,
            JobSource::Identifiers(vec![
                JobId(10410427),
                JobId(1000001),
                JobId(10410427),
                JobId(1000005),
            ]),
        )
        .expect("run completes");

    assert!(session.page_calls.borrow().is_empty());
    assert_eq!(session.detail_ids(), vec![10410427, 1000001, 1000005]);
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.skip_reasons.get("external"), Some(&1));
    assert_eq!(summary.skip_reasons.get("already-applied"), Some(&1));
    assert_eq!(summary.skip_reasons.get("fetch-failed"), Some(&1));
    assert_eq!(summary.retryable, 1);

    let entries = service.log().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Job ID 10410427");
    assert_eq!(entries[0].applied_at, now());
    assert_eq!(service.store().state().watermark, Some(now()));
}

#[test]
fn keyword_filter_runs_before_detail_fetch() {
    let mut session = FakeSession::default()
        .with_page(
            1,
            page(vec![
                listing(1000002, "Registered Nurse", at(2024, 2, 2, 0)),
                listing(1000001, "Data Analyst", at(2024, 2, 1, 0)),
            ]),
        )
        .with_detail(1000001, open_detail(&[1]))
        .with_detail(1000002, open_detail(&[1]));
    let config = EvaluationConfig {
        keywords: KeywordFilter::new(["data"], ["nurse"]),
        ..EvaluationConfig::default()
    };
    let service = build_service(
        MemoryStore::new(Some(watermark()), Vec::new()),
        MemoryLog::default(),
        config,
    );

    let summary = service.run(&mut session, PAGED).expect("run completes");
    assert_eq!(session.detail_ids(), vec![1000001]);
    assert_eq!(summary.filtered, 1);
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.checked, 2);
    assert!(matches!(
        summary.jobs[1].outcome,
        JobOutcome::Skipped(SkipReason::Filtered)
    ));
}

#[test]
fn deferred_job_relisted_in_same_run_is_not_reevaluated() {
    let deferred = vec![ListingRecord::from(&listing(
        1000001,
        "Deferred",
        at(2024, 2, 1, 0),
    ))];
    let mut session = FakeSession::default()
        .with_page(1, page(vec![listing(1000001, "Deferred", at(2024, 2, 1, 0))]))
        .with_detail(1000001, opening_detail(at(2024, 5, 1, 0)));
    let service = build_service(
        MemoryStore::new(Some(watermark()), deferred),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = service.run(&mut session, PAGED).expect("run completes");
    assert_eq!(session.detail_ids(), vec![1000001]);
    assert_eq!(summary.skip_reasons.get("already-evaluated"), Some(&1));
    assert_eq!(service.store().deferred_ids(), vec![1000001]);
    assert_eq!(*service.store().saves.lock().expect("saves mutex"), 2);
}

#[test]
fn replayed_deferral_follows_current_detail_open_time() {
    let mut record = ListingRecord::from(&listing(1000001, "Analyst", at(2024, 2, 1, 0)));
    record.apply_start = Some("2024-02-15T00:00:00".to_string());
    record
        .extra
        .insert("salary_string".to_string(), json!("$20/hr"));
    let mut session =
        FakeSession::default().with_detail(1000001, opening_detail(at(2024, 6, 1, 0)));
    let service = build_service(
        MemoryStore::new(Some(watermark()), vec![record.clone()]),
        MemoryLog::default(),
        EvaluationConfig::default(),
    );

    let summary = service.run(&mut session, PAGED).expect("run completes");
    assert!(session.submitted_ids().is_empty());
    assert_eq!(
        summary.jobs[0].outcome,
        JobOutcome::Deferred {
            opens_at: at(2024, 6, 1, 0)
        }
    );
    assert_eq!(service.store().deferred_records(), vec![record]);
}

#[test]
fn failing_application_log_keeps_run_state() {
    let mut session = FakeSession::default()
        .with_page(
            1,
            page(vec![
                listing(1000002, "Engineer", at(2024, 2, 2, 0)),
                listing(1000001, "Analyst", at(2024, 2, 1, 0)),
            ]),
        )
        .with_detail(1000001, opening_detail(at(2024, 4, 1, 9)))
        .with_detail(1000002, open_detail(&[1]));
    let service = AutoApplyService::new(
        MemoryStore::new(Some(watermark()), Vec::new()),
        FlakyLog::failing(usize::MAX),
        engine(EvaluationConfig::default()),
    );

    let summary = service.run(&mut session, PAGED).expect("run completes");
    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(session.submitted_ids(), vec![1000002]);
    assert_eq!(summary.unlogged, vec![JobId(1000002)]);
    assert_eq!(service.store().deferred_ids(), vec![1000001]);
    let state = service.store().state();
    assert_eq!(state.watermark, Some(now()));
    assert_eq!(state.cookies["_trajectory_session"], "refreshed");
}

#[test]
fn failed_log_write_is_retried_at_next_checkpoint() {
    let mut session = FakeSession::default().with_detail(1000002, open_detail(&[1]));
    let service = AutoApplyService::new(
        MemoryStore::new(Some(watermark()), Vec::new()),
        FlakyLog::failing(1),
        engine(EvaluationConfig::default()),
    );

    let summary = service
        .run(&mut session, JobSource::Identifiers(vec![JobId(1000002)]))
        .expect("run completes");
    assert_eq!(summary.applied, 1);
    assert!(summary.unlogged.is_empty());
    assert_eq!(service.log().entry_ids(), vec![1000002]);
}

#[test]
fn invalid_credentials_refuse_to_run() {
    let store = MemoryStore::new(None, Vec::new());
    store.state.lock().expect("state mutex").valid = false;
    let service = build_service(store, MemoryLog::default(), EvaluationConfig::default());

    let mut session = FakeSession::default();
    assert!(matches!(
        service.run(&mut session, PAGED),
        Err(RunError::CredentialsInvalid)
    ));
    assert!(!session.token_refreshed);
}

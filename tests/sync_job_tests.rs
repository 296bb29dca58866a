//! End-to-end job runs: mock marketplace in front, SQLite stores behind.

#[path = "test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::{Value, json};
use seller_sync::marketplace::RateLimiter;
use seller_sync::models::{JobKind, JobStatus};
use seller_sync::scheduler::{CycleStats, SyncScheduler};
use seller_sync::sync_executor::JobOutcome;
use seller_sync::repositories::{CredentialLookup, JobStore};
use test_utils::{
    CARDS_PATH, PASSES_PATH, REPORT_V1_PATH, REPORT_V5_PATH, TOKEN, harness, test_config,
};
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWNER: i64 = 1;

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn report_row(rrd_id: i64, nm_id: i64) -> Value {
    json!({
        "rrd_id": rrd_id,
        "realizationreport_id": 5001,
        "srid": format!("srid-{nm_id}"),
        "supplier_oper_name": "Продажа",
        "nm_id": nm_id,
        "quantity": 1,
        "retail_price": 1500.5,
        "sale_dt": "2024-03-02T10:11:12Z",
        "rr_dt": "2024-03-03"
    })
}

async fn mount_report_pages(server: &MockServer, route: &str, rows: Value, last_rrd_id: i64) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("rrdid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("rrdid", last_rrd_id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn report_job_saves_then_deduplicates() -> Result<()> {
    let server = MockServer::start().await;
    mount_report_pages(
        &server,
        REPORT_V5_PATH,
        json!([report_row(1, 101), report_row(2, 102), report_row(3, 103)]),
        3,
    )
    .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let first = h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    let outcome = h.executor.run_job(&first).await?;
    assert_eq!(
        outcome,
        JobOutcome::Success("Total: 3, Saved: 3, Duplicates: 0, Failed: 0".to_string())
    );

    let stored = h.jobs.find(first.id).await?.expect("job exists");
    assert_eq!(stored.status, JobStatus::Success);
    assert_eq!(
        stored.last_error.as_deref(),
        Some("Total: 3, Saved: 3, Duplicates: 0, Failed: 0")
    );
    assert!(!stored.retryable);

    let second = h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    let outcome = h.executor.run_job(&second).await?;
    assert_eq!(
        outcome,
        JobOutcome::Success("Total: 3, Saved: 0, Duplicates: 3, Failed: 0".to_string())
    );
    assert_eq!(h.records.count_reports(OWNER).await?, 3);
    Ok(())
}

#[tokio::test]
async fn january_period_saves_then_deduplicates_through_legacy_report() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPORT_V1_PATH))
        .and(query_param("dateFrom", "2024-01-01"))
        .and(query_param("dateTo", "2024-01-10"))
        .and(query_param("rrdid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            report_row(1, 201),
            report_row(2, 202),
            report_row(3, 203)
        ])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REPORT_V1_PATH))
        .and(query_param("rrdid", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REPORT_V5_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let first = h.jobs.enqueue_report(OWNER, day(1, 1), day(1, 10)).await?;
    assert_eq!(
        h.executor.run_job(&first).await?,
        JobOutcome::Success("Total: 3, Saved: 3, Duplicates: 0, Failed: 0".to_string())
    );

    let second = h.jobs.enqueue_report(OWNER, day(1, 1), day(1, 10)).await?;
    assert_eq!(
        h.executor.run_job(&second).await?,
        JobOutcome::Success("Total: 3, Saved: 0, Duplicates: 3, Failed: 0".to_string())
    );

    for id in [first.id, second.id] {
        let stored = h.jobs.find(id).await?.expect("job exists");
        assert_eq!(stored.status, JobStatus::Success);
        assert!(!stored.retryable);
    }
    assert_eq!(h.records.count_reports(OWNER).await?, 3);
    Ok(())
}

#[tokio::test]
async fn period_across_cutover_uses_both_report_versions() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPORT_V1_PATH))
        .and(query_param("dateFrom", "2024-01-20"))
        .and(query_param("dateTo", "2024-01-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"nm_id": 7}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REPORT_V5_PATH))
        .and(query_param("dateFrom", "2024-01-29"))
        .and(query_param("dateTo", "2024-02-05"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"nm_id": 8}])))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_report(OWNER, day(1, 20), day(2, 5)).await?;
    let outcome = h.executor.run_job(&job).await?;

    assert_eq!(
        outcome,
        JobOutcome::Success("Total: 2, Saved: 2, Duplicates: 0, Failed: 0".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn throttling_sentinel_marks_job_retryable() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPORT_V5_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"title": "too many requests"}])),
        )
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    let outcome = h.executor.run_job(&job).await?;
    assert!(outcome.is_retryable());

    let stored = h.jobs.find(job.id).await?.expect("job exists");
    assert_eq!(stored.status, JobStatus::Error);
    assert!(stored.retryable);
    assert_eq!(h.records.count_reports(OWNER).await?, 0);

    assert_eq!(h.jobs.requeue_retryable(JobKind::Report).await?, 1);
    let requeued = h.jobs.find(job.id).await?.expect("job exists");
    assert_eq!(requeued.status, JobStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn missing_report_endpoint_is_permanent() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPORT_V5_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"title": "path not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    let outcome = h.executor.run_job(&job).await?;

    match outcome {
        JobOutcome::Failed(err) => {
            assert!(!err.retryable);
            assert!(err.message.contains("path not found"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn empty_report_fails_with_no_data() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPORT_V5_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    h.executor.run_job(&job).await?;
    let stored = h.jobs.find(job.id).await?.expect("job exists");
    assert_eq!(stored.status, JobStatus::Error);
    assert_eq!(stored.last_error.as_deref(), Some("No data"));
    assert!(!stored.retryable);
    Ok(())
}

#[tokio::test]
async fn rows_that_cannot_be_normalized_fail_the_job() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPORT_V5_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["junk", 5])))
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    let outcome = h.executor.run_job(&job).await?;
    assert_eq!(
        outcome,
        JobOutcome::Failed(seller_sync::sync_executor::JobError::permanent(
            "Total: 2, Saved: 0, Duplicates: 0, Failed: 2"
        ))
    );
    Ok(())
}

#[tokio::test]
async fn page_ceiling_is_noted_in_the_summary() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPORT_V5_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([report_row(9, 900)])))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.marketplace.max_pages = 2;
    let h = harness(&config).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    let outcome = h.executor.run_job(&job).await?;
    assert_eq!(
        outcome,
        JobOutcome::Success(
            "Total: 2, Saved: 1, Duplicates: 1, Failed: 0; page limit reached in 1 window(s)"
                .to_string()
        )
    );
    Ok(())
}

#[tokio::test]
async fn inverted_period_fails_without_requests() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_report(OWNER, day(3, 10), day(3, 1)).await?;
    match h.executor.run_job(&job).await? {
        JobOutcome::Failed(err) => {
            assert!(!err.retryable);
            assert!(err.message.contains("invalid period"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn malformed_credential_fails_without_requests() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, "no-dots-here").await?;

    let job = h.jobs.enqueue_card(OWNER).await?;
    let outcome = h.executor.run_job(&job).await?;
    assert!(matches!(outcome, JobOutcome::Failed(ref err) if !err.retryable));
    assert_eq!(h.gate.acquired(), 0);
    Ok(())
}

#[tokio::test]
async fn rejected_credential_probe_is_permanent() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PASSES_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CARDS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.marketplace.verify_credentials = true;
    let h = harness(&config).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_card(OWNER).await?;
    match h.executor.run_job(&job).await? {
        JobOutcome::Failed(err) => {
            assert!(!err.retryable);
            assert!(err.message.contains("rejected"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_marketplace_is_retryable() -> Result<()> {
    let mut config = test_config("http://127.0.0.1:1");
    config.marketplace.timeout_ms = 500;
    let h = harness(&config).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    let outcome = h.executor.run_job(&job).await?;
    assert!(outcome.is_retryable());
    Ok(())
}

#[tokio::test]
async fn card_job_upserts_by_article() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CARDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cards": [
                {
                    "nmID": 1001,
                    "title": "Платье",
                    "vendorCode": "DRESS-1",
                    "sizes": [{"chrtID": 55, "techSize": "42", "wbSize": "48", "skus": ["2000000000011"]}]
                },
                {"nmID": 1002, "title": "Юбка"}
            ],
            "cursor": {"updatedAt": "2024-03-01T10:00:00Z", "nmID": 1002, "total": 2}
        })))
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    for _ in 0..2 {
        let job = h.jobs.enqueue_card(OWNER).await?;
        let outcome = h.executor.run_job(&job).await?;
        assert_eq!(
            outcome,
            JobOutcome::Success("Total: 2, Saved: 2, Duplicates: 0, Failed: 0".to_string())
        );
    }

    let cards = h.records.list_cards(OWNER).await?;
    assert_eq!(cards.len(), 2);
    let dress = cards
        .iter()
        .find(|card| card.articule == "1001")
        .expect("dress stored");
    assert_eq!(dress.name.as_deref(), Some("Платье"));
    assert_eq!(dress.chrt_id, Some(55));
    Ok(())
}

#[tokio::test]
async fn empty_catalogue_fails_the_card_job() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CARDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cards": [], "cursor": {}})))
        .mount(&server)
        .await;

    let h = harness(&test_config(&server.uri())).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;

    let job = h.jobs.enqueue_card(OWNER).await?;
    assert_eq!(
        h.executor.run_job(&job).await?,
        JobOutcome::Failed(seller_sync::sync_executor::JobError::permanent(
            "No articles data received"
        ))
    );
    Ok(())
}

#[tokio::test]
async fn scheduler_cycle_drains_pending_jobs_of_its_kind() -> Result<()> {
    let server = MockServer::start().await;
    mount_report_pages(&server, REPORT_V5_PATH, json!([report_row(1, 101)]), 1).await;

    let config = test_config(&server.uri());
    let h = harness(&config).await?;
    h.credentials.set_owner_credential(OWNER, TOKEN).await?;
    h.jobs.enqueue_report(OWNER, day(3, 1), day(3, 10)).await?;
    let card_job = h.jobs.enqueue_card(OWNER).await?;

    let jobs = Arc::new(h.jobs);
    let scheduler = SyncScheduler::new(
        jobs.clone(),
        Arc::new(h.executor),
        Arc::new(RateLimiter::new(&config.rate_limit)),
    );

    let stats = scheduler.run_once(JobKind::Report).await?;
    assert_eq!(
        stats,
        CycleStats {
            processed: 1,
            succeeded: 1,
            failed: 0,
            retryable: 0,
        }
    );
    assert!(jobs.list_pending(JobKind::Report).await?.is_empty());

    let untouched = jobs.find(card_job.id).await?.expect("card job exists");
    assert_eq!(untouched.status, JobStatus::Pending);
    Ok(())
}

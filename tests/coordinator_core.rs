// tests/coordinator_core.rs

mod common;
use crate::common::builders::{StaticResolver, ids};
use crate::common::{init_tracing, with_timeout};

use stampede::dag::{TargetQueue, WorkUnit};
use stampede::engine::protocol::{MAX_MESSAGE_BYTES, read_message, write_message};
use stampede::engine::{BuildStatusHandle, CoordinatorCore, WorkRequest, WorkResponse};
use stampede::errors::StampedeError;
use stampede::types::BuildStatus;
use tokio::io::{AsyncWriteExt, BufReader};

fn fan_in_core() -> (CoordinatorCore, BuildStatusHandle) {
    let queue = StaticResolver::new()
        .target("D", &["B", "C"])
        .target("B", &["A"])
        .target("C", &["A"])
        .target("A", &[])
        .queue(&["D"]);
    let status = BuildStatusHandle::new();
    (CoordinatorCore::new(queue, status.clone()), status)
}

fn request(finished: &[&str], max_units: usize) -> WorkRequest {
    WorkRequest::new("m1", ids(finished), max_units)
}

fn targets(response: &WorkResponse) -> Vec<Vec<String>> {
    response
        .work_units
        .iter()
        .map(|u| u.target_ids.clone())
        .collect()
}

#[test]
fn serves_units_until_complete() {
    init_tracing();
    let (mut core, status) = fan_in_core();

    let r = core.handle_request(&request(&[], 2)).unwrap();
    assert_eq!(targets(&r), vec![ids(&["A"])]);
    assert!(!r.build_complete);

    let r = core.handle_request(&request(&["A"], 2)).unwrap();
    assert_eq!(targets(&r), vec![ids(&["B"]), ids(&["C"])]);

    let r = core.handle_request(&request(&["B", "C"], 2)).unwrap();
    assert_eq!(targets(&r), vec![ids(&["D"])]);
    assert_eq!(status.get(), BuildStatus::Running);

    let r = core.handle_request(&request(&["D"], 2)).unwrap();
    assert!(r.work_units.is_empty());
    assert!(r.build_complete);
    assert!(!r.build_failed);
    assert_eq!(status.get(), BuildStatus::Finished);
    assert_eq!(core.stats().finished, 4);
}

#[test]
fn finished_session_answers_complete_without_touching_queue() {
    let (mut core, _status) = fan_in_core();
    core.status_handle().mark_finished();

    let r = core.handle_request(&request(&["A"], 2)).unwrap();
    assert_eq!(r, WorkResponse::finished(false));
    assert_eq!(core.stats().finished, 0);
}

#[test]
fn empty_queue_finishes_immediately() {
    let status = BuildStatusHandle::new();
    let mut core = CoordinatorCore::new(TargetQueue::empty(), status.clone());
    assert_eq!(status.get(), BuildStatus::Finished);

    let r = core.handle_request(&request(&[], 3)).unwrap();
    assert!(r.build_complete);
    assert!(r.work_units.is_empty());
}

#[test]
fn reported_failure_fails_the_build() {
    init_tracing();
    let (mut core, status) = fan_in_core();
    core.handle_request(&request(&[], 1)).unwrap();
    core.handle_request(&request(&["A"], 1)).unwrap();

    let failed = request(&[], 0).with_failed(ids(&["B"]));
    let r = core.handle_request(&failed).unwrap();
    assert_eq!(r, WorkResponse::finished(true));
    assert_eq!(status.get(), BuildStatus::Failed);
    assert_eq!(core.failed_targets(), ids(&["B"]).as_slice());

    // No more work once failed, even though C is ready.
    let r = core.handle_request(&request(&[], 4)).unwrap();
    assert!(r.work_units.is_empty());
    assert!(r.build_failed);
    assert!(core.queue().has_ready_work());
}

#[test]
fn protocol_violation_aborts_session() {
    init_tracing();
    let (mut core, status) = fan_in_core();
    core.handle_request(&request(&[], 1)).unwrap();
    core.handle_request(&request(&["A"], 0)).unwrap();

    let err = core.handle_request(&request(&["A"], 1)).unwrap_err();
    assert!(matches!(err, StampedeError::ProtocolViolation(_)), "{err:?}");
    assert_eq!(status.get(), BuildStatus::Failed);

    let violation = core.take_violation();
    assert!(matches!(violation, Some(StampedeError::ProtocolViolation(_))));
    assert!(core.take_violation().is_none());
}

#[test]
fn first_final_status_wins() {
    let status = BuildStatusHandle::new();
    assert!(!status.is_terminal());

    assert!(status.mark_failed());
    assert!(!status.mark_finished());
    assert_eq!(status.get(), BuildStatus::Failed);

    let clone = status.clone();
    assert!(clone.is_terminal());
}

#[tokio::test]
async fn wait_terminal_resolves_on_transition() {
    let status = BuildStatusHandle::new();
    let waiter = {
        let status = status.clone();
        tokio::spawn(async move { status.wait_terminal().await })
    };

    tokio::task::yield_now().await;
    status.mark_finished();

    let seen = with_timeout(waiter).await.unwrap();
    assert_eq!(seen, BuildStatus::Finished);
}

#[test]
fn wire_format_uses_camel_case_keys() {
    let req = WorkRequest::new("m7", ids(&["//a:b"]), 3);
    let json: serde_json::Value = serde_json::to_value(&req).unwrap();
    assert_eq!(json["minionId"], "m7");
    assert_eq!(json["finishedTargetIds"][0], "//a:b");
    assert_eq!(json["maxUnitsRequested"], 3);
    assert!(json.get("failedTargetIds").is_none());

    // Minimal response from a peer that doesn't know about `buildFailed`.
    let resp: WorkResponse =
        serde_json::from_str(r#"{"workUnits":[{"targetIds":["x","y"]}],"buildComplete":false}"#)
            .unwrap();
    assert_eq!(resp.work_units, vec![WorkUnit::new(ids(&["x", "y"]))]);
    assert!(!resp.build_complete);
    assert!(!resp.build_failed);
}

#[tokio::test]
async fn line_codec_skips_blank_lines_and_reports_eof() {
    let (client, server) = tokio::io::duplex(1024);
    let mut reader = BufReader::new(server);

    let writer = tokio::spawn(async move {
        let mut client = client;
        client.write_all(b"\n  \n").await.unwrap();
        write_message(&mut client, &request(&["A"], 1)).await.unwrap();
        client.shutdown().await.unwrap();
    });

    let first: Option<WorkRequest> = read_message(&mut reader).await.unwrap();
    assert_eq!(first, Some(request(&["A"], 1)));

    writer.await.unwrap();
    let next: Option<WorkRequest> = read_message(&mut reader).await.unwrap();
    assert!(next.is_none());
}

#[tokio::test]
async fn oversized_line_is_a_transport_error() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let mut reader = BufReader::new(server);

    tokio::spawn(async move {
        let mut client = client;
        let flood = vec![b'x'; MAX_MESSAGE_BYTES + 1024];
        // The reader gives up early, so this write may fail.
        let _ = client.write_all(&flood).await;
    });

    let err = with_timeout(read_message::<_, WorkRequest>(&mut reader))
        .await
        .unwrap_err();
    assert!(matches!(err, StampedeError::Transport(_)), "{err:?}");
}

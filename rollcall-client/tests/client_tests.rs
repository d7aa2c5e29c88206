//! Integration tests for the attendance service client
//!
//! A tiny HTTP/1.1 stub on a local TcpListener replays canned JSON answers and
//! hands every request it saw back to the test.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use rollcall_client::*;

#[derive(Debug)]
struct SeenRequest {
    method: String,
    path: String,
    body: String,
}

struct Reply {
    status: u16,
    body: &'static str,
}

fn reply(status: u16, body: &'static str) -> Reply {
    Reply { status, body }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

async fn read_request(stream: &mut TcpStream) -> SeenRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_len = loop {
        if let Some(end) = header_end(&buf) {
            break end;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_len]).to_string();
    let mut request_line = head.lines().next().unwrap().split_whitespace();
    let method = request_line.next().unwrap().to_string();
    let path = request_line.next().unwrap().to_string();

    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.trim().parse::<usize>().unwrap());
    let chunked = head.to_ascii_lowercase().contains("transfer-encoding: chunked");

    loop {
        let body = &buf[head_len..];
        let complete = match content_length {
            Some(len) => body.len() >= len,
            None if chunked => body.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if complete {
            break;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    SeenRequest {
        method,
        path,
        body: String::from_utf8_lossy(&buf[head_len..]).to_string(),
    }
}

/// Serve `replies` in order, one connection each
async fn start_stub(replies: Vec<Reply>) -> (String, mpsc::UnboundedReceiver<SeenRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for reply in replies {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let _ = tx.send(request);

            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.status,
                reply.body.len(),
                reply.body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    (format!("http://{}", addr), rx)
}

fn client(base_url: String) -> AttendanceClient {
    AttendanceClient::new(ClientConfig {
        base_url,
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

fn two_frame_form() -> UploadForm {
    UploadForm::new(
        vec![
            "data:image/jpeg;base64,AAEC".to_string(),
            "data:image/jpeg;base64,AwQF".to_string(),
        ],
        vec![
            "24/11/2024, 01:07:16 AM".to_string(),
            "24/11/2024, 01:07:21 AM".to_string(),
        ],
        ProcessingMode::Dynamic,
    )
    .with_field("num_students", "3")
}

// ============================================================================
// UPLOAD
// ============================================================================

#[tokio::test]
async fn test_upload_sends_expected_fields() {
    let (base, mut seen) = start_stub(vec![reply(
        200,
        r#"{"status":"success","message":"Image processing completed!!","time":"0.5 secs!"}"#,
    )])
    .await;

    let response = tokio_test::assert_ok!(client(base).upload(&two_frame_form()).await);
    assert!(response.is_success());
    assert_eq!(response.time.as_deref(), Some("0.5 secs!"));

    let request = seen.recv().await.unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/upload_video");
    assert!(request.body.contains("name=\"videoData\""));
    assert!(request
        .body
        .contains(r#"["data:image/jpeg;base64,AAEC","data:image/jpeg;base64,AwQF"]"#));
    assert!(request.body.contains("name=\"timestamps\""));
    assert!(request
        .body
        .contains(r#"["24/11/2024, 01:07:16 AM","24/11/2024, 01:07:21 AM"]"#));
    assert!(request.body.contains("name=\"frame_count\""));
    assert!(request.body.contains("name=\"processing_mode\""));
    assert!(request.body.contains("Dynamic"));
    assert!(request.body.contains("name=\"num_students\""));
}

#[tokio::test]
async fn test_upload_frames_field_is_configurable() {
    let (base, mut seen) = start_stub(vec![reply(200, r#"{"status":"success"}"#)]).await;
    let client = AttendanceClient::new(ClientConfig {
        base_url: base,
        frames_field: "video_data".to_string(),
        ..Default::default()
    })
    .unwrap();

    client.upload(&two_frame_form()).await.unwrap();
    let request = seen.recv().await.unwrap();
    assert!(request.body.contains("name=\"video_data\""));
    assert!(!request.body.contains("name=\"videoData\""));
}

#[tokio::test]
async fn test_upload_rejection_reads_error_body() {
    let (base, _seen) = start_stub(vec![reply(
        400,
        r#"{"status":"error","message":"No video data received"}"#,
    )])
    .await;

    let err = client(base).upload(&two_frame_form()).await.unwrap_err();
    match err {
        ClientError::UploadRejected { status, message } => {
            assert_eq!(status, "error");
            assert_eq!(message.as_deref(), Some("No video data received"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let (base, _seen) = start_stub(vec![reply(500, "Internal Server Error")]).await;

    let err = client(base).upload(&two_frame_form()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse { .. }));
    assert!(err.to_string().contains("500"));
}

// ============================================================================
// COMPUTE
// ============================================================================

#[tokio::test]
async fn test_calc_completed_points_at_results() {
    let (base, mut seen) = start_stub(vec![reply(
        200,
        r#"{"status":"completed","response":"Attendance calculation successful","time":"12.1 secs"}"#,
    )])
    .await;

    let outcome = client(base.clone()).calc_attendance().await.unwrap();
    assert_eq!(
        outcome,
        CalcOutcome::Completed {
            results_url: format!("{}/results", base),
            time: Some("12.1 secs".to_string()),
        }
    );

    let request = seen.recv().await.unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/calc_attendance");
}

#[tokio::test]
async fn test_calc_other_status_is_fatal() {
    let (base, _seen) = start_stub(vec![reply(200, r#"{"status":"busy"}"#)]).await;

    let err = client(base).calc_attendance().await.unwrap_err();
    assert!(matches!(err, ClientError::ComputationFailed { ref status, .. } if status == "busy"));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_submit_uploads_then_computes() {
    let (base, mut seen) = start_stub(vec![
        reply(200, r#"{"status":"success"}"#),
        reply(200, r#"{"status":"completed"}"#),
    ])
    .await;

    let outcome = client(base).submit(&two_frame_form()).await.unwrap();
    assert!(matches!(outcome, CalcOutcome::Completed { .. }));
    assert_eq!(seen.recv().await.unwrap().path, "/upload_video");
    assert_eq!(seen.recv().await.unwrap().path, "/calc_attendance");
}

#[tokio::test]
async fn test_submit_stops_after_rejected_upload() {
    let (base, mut seen) = start_stub(vec![reply(200, r#"{"status":"error"}"#)]).await;

    let err = client(base).submit(&two_frame_form()).await.unwrap_err();
    assert!(matches!(err, ClientError::UploadRejected { .. }));
    assert_eq!(seen.recv().await.unwrap().path, "/upload_video");
    assert!(seen.recv().await.is_none());
}

// ============================================================================
// HEALTH AND TRANSPORT
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let (base, mut seen) = start_stub(vec![reply(
        200,
        r#"{"status":"success","message":"Server is running!!"}"#,
    )])
    .await;

    let health = tokio_test::assert_ok!(client(base).health().await);
    assert_eq!(health.status, "success");
    assert_eq!(seen.recv().await.unwrap().path, "/test");
}

#[tokio::test]
async fn test_unreachable_service_is_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{}", addr))
        .calc_attendance()
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Http { .. }));
    assert!(err.is_recoverable());
}

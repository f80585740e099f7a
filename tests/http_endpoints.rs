use interview_report::report::{HttpReportClient, ReportSource};
use interview_report::status::{HttpStatusSource, StatusSource};
use interview_report::{CallResolver, ReportError, ResolutionRequest};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Request as seen by the stub server
#[derive(Debug, Clone)]
struct SeenRequest {
    head: String,
    body: String,
}

/// Minimal HTTP/1.1 server that answers each connection with the next scripted response
async fn start_stub(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<SeenRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_server = seen.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            handle_connection(stream, status, body, &seen_by_server).await;
        }
    });

    (format!("http://{}", addr), seen)
}

async fn handle_connection(mut stream: TcpStream, status: u16, body: &str, seen: &Mutex<Vec<SeenRequest>>) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buffer.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    let request_body = String::from_utf8_lossy(&buffer[body_start.min(buffer.len())..]).to_string();
    seen.lock().unwrap().push(SeenRequest {
        head,
        body: request_body,
    });

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

#[tokio::test]
async fn test_status_source_lists_calls_with_bearer_token() {
    let (base_url, seen) = start_stub(vec![(
        200,
        r#"[{"id":"call-1","status":"ended","createdAt":"2025-05-01T10:00:00Z","endedAt":"2025-05-01T10:20:00Z"}]"#,
    )])
    .await;

    let source = HttpStatusSource::new(base_url);
    let records = source.list_calls("assistant-42", "secret-token").await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "call-1");
    assert!(records[0].is_terminal());

    let seen = seen.lock().unwrap();
    let head = seen[0].head.to_lowercase();
    assert!(head.starts_with("get /call?assistantid=assistant-42 "));
    assert!(head.contains("authorization: bearer secret-token"));
}

#[tokio::test]
async fn test_status_source_non_success_is_transport_error() {
    let (base_url, _seen) = start_stub(vec![(401, r#"{"message":"Unauthorized"}"#)]).await;

    let err = HttpStatusSource::new(base_url)
        .list_calls("assistant-42", "bad-token")
        .await
        .unwrap_err();

    match err {
        ReportError::Transport(msg) => assert!(msg.contains("401")),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_status_source_object_body_is_malformed() {
    let (base_url, _seen) = start_stub(vec![(200, r#"{"calls":[]}"#)]).await;

    let err = HttpStatusSource::new(base_url)
        .list_calls("assistant-42", "token")
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Malformed(_)));
}

#[tokio::test]
async fn test_resolver_polls_http_source_until_call_ends() {
    let (base_url, seen) = start_stub(vec![
        (200, "[]"),
        (
            200,
            r#"[{"id":"call-7","status":"in-progress","createdAt":"2025-05-01T10:00:00Z"}]"#,
        ),
        (
            200,
            r#"[{"id":"call-7","status":"ended","createdAt":"2025-05-01T10:00:00Z","updatedAt":"2025-05-01T10:31:00Z"}]"#,
        ),
    ])
    .await;

    let resolver = CallResolver::new(Arc::new(HttpStatusSource::new(base_url)));
    let request = ResolutionRequest::new("assistant-42", "token")
        .with_target(Some("call-7".to_string()))
        .with_timings(Duration::from_secs(5), Duration::from_millis(20));

    let resolution = resolver.resolve(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(resolution.call_id, "call-7");
    assert_eq!(resolution.polls, 3);
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_resolver_stops_on_server_error() {
    let (base_url, seen) = start_stub(vec![(200, "[]"), (503, "{}"), (200, "[]")]).await;

    let resolver = CallResolver::new(Arc::new(HttpStatusSource::new(base_url)));
    let request = ResolutionRequest::new("assistant-42", "token")
        .with_timings(Duration::from_secs(5), Duration::from_millis(20));

    let err = resolver.resolve(&request, &CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, ReportError::Transport(_)));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancel_during_wait_stops_polling() {
    let (base_url, seen) = start_stub(vec![(200, "[]"), (200, "[]")]).await;

    let resolver = CallResolver::new(Arc::new(HttpStatusSource::new(base_url)));
    let request = ResolutionRequest::new("assistant-42", "token")
        .with_timings(Duration::from_secs(60), Duration::from_secs(30));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = resolver.resolve(&request, &cancel).await.unwrap_err();

    assert!(matches!(err, ReportError::Cancelled));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_client_posts_resume_id() {
    let (base_url, seen) = start_stub(vec![(
        200,
        r#"{"report":{"candidate_name":"Asha Rao","position":"Backend Engineer","overall_score":8,
            "scores_per_skill":[{"skill":"Rust","score":9}],"overall_strengths":["Ownership"]}}"#,
    )])
    .await;

    let report = HttpReportClient::new(base_url)
        .fetch_interview_report("call-7", "resume-3", "token")
        .await
        .unwrap();

    assert_eq!(report.candidate_name, "Asha Rao");
    assert_eq!(report.overall_score, 8.0);

    let seen = seen.lock().unwrap();
    assert!(seen[0].head.starts_with("POST /api/interviews/fetch/call-7/ "));
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body["resume_id"], "resume-3");
}

#[tokio::test]
async fn test_report_client_missing_report_is_dependent_fetch_error() {
    let (base_url, _seen) = start_stub(vec![(200, r#"{"detail":"still processing"}"#)]).await;

    let err = HttpReportClient::new(base_url)
        .fetch_interview_report("call-7", "resume-3", "token")
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::DependentFetch(_)));
}

#[tokio::test]
async fn test_resume_report_fetch() {
    let (base_url, seen) = start_stub(vec![(
        200,
        r#"{"summary":"Strong fundamentals","strengths":["Testing"],"overall_recommendation":"Hire",
            "scores":{"technical":8,"communication":7,"behavioral":"9"},"avg_rating":8}"#,
    )])
    .await;

    let report = HttpReportClient::new(base_url).fetch_resume_report("resume-3").await.unwrap();

    assert_eq!(report.scores.behavioral, 9.0);
    assert_eq!(report.rating_label(), "8/10");
    assert!(seen.lock().unwrap()[0].head.starts_with("GET /api/interview/report/resume-3/ "));
}

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use assist_api::{
    AssistApiClient, AssistApiConfig, AssistApiError, AssistRequest, Frame, StreamEnd,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

#[derive(Clone)]
struct ResponseChunk {
    delay_ms: u64,
    bytes: Vec<u8>,
}

#[derive(Clone)]
enum ScriptedResponse {
    Respond {
        status: u16,
        content_type: &'static str,
        chunks: Vec<ResponseChunk>,
    },
    Reset,
}

#[derive(Debug, Clone)]
struct RecordedRequest {
    head: String,
    body: Vec<u8>,
}

impl RecordedRequest {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

struct ScriptedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}/api");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let requests = Arc::clone(&requests);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, requests).await;
                    });
                }
            }
        });

        Self {
            base_url,
            requests,
            handle,
        }
    }

    fn client(&self) -> AssistApiClient {
        AssistApiClient::new(AssistApiConfig::new(&self.base_url).with_access_token("tok"))
            .expect("client")
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn response_stream(lines: &[&str]) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: data_lines(lines),
        }],
    }
}

fn response_json(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status,
        content_type: "application/json",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.as_bytes().to_vec(),
        }],
    }
}

fn data_lines(lines: &[&str]) -> Vec<u8> {
    let mut body = String::new();

    for line in lines {
        body.push_str("data: ");
        body.push_str(line);
        body.push_str("\n\n");
    }

    body.into_bytes()
}

fn hint_request() -> AssistRequest {
    AssistRequest::new("/ai/hint", json!({"problemId": "two-sum", "hintLevel": 2}))
}

fn content(text: &str) -> Frame {
    Frame::Content {
        text: text.to_string(),
    }
}

#[tokio::test]
async fn stream_integration_successful_completion() {
    let server = ScriptedServer::new(vec![response_stream(&[
        r#"{"text":"Hello"}"#,
        r#"{"text":" world"}"#,
        "[DONE]",
    ])])
    .await;

    let result = server
        .client()
        .stream(&hint_request(), None)
        .await
        .expect("stream should succeed");

    assert_eq!(result.end, StreamEnd::Done);
    assert_eq!(
        result.frames,
        vec![content("Hello"), content(" world"), Frame::Terminal]
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request_line(), "POST /api/ai/hint HTTP/1.1");
    assert_eq!(
        requests[0].header("authorization").as_deref(),
        Some("Bearer tok")
    );
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("request body is json");
    assert_eq!(body, json!({"problemId": "two-sum", "hintLevel": 2}));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_frames_split_across_chunks() {
    let body = data_lines(&[r#"{"text":"🧠 The Core Idea\n"}"#, "[DONE]"]);
    let (first, second) = body.split_at(17);

    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![
            ResponseChunk {
                delay_ms: 0,
                bytes: first.to_vec(),
            },
            ResponseChunk {
                delay_ms: 20,
                bytes: second.to_vec(),
            },
        ],
    }])
    .await;

    let result = server
        .client()
        .stream(&hint_request(), None)
        .await
        .expect("stream should succeed");

    assert_eq!(
        result.frames,
        vec![content("🧠 The Core Idea\n"), Frame::Terminal]
    );

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_error_frame_ends_stream() {
    let server = ScriptedServer::new(vec![response_stream(&[
        r#"{"text":"partial"}"#,
        r#"{"error":"model overloaded"}"#,
        r#"{"text":"ignored"}"#,
    ])])
    .await;

    let result = server
        .client()
        .stream(&hint_request(), None)
        .await
        .expect("stream should open");

    assert_eq!(
        result.end,
        StreamEnd::Failed {
            message: "model overloaded".to_string()
        }
    );
    assert_eq!(result.frames.len(), 2);

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_eof_without_done_reports_eof() {
    let server = ScriptedServer::new(vec![response_stream(&[r#"{"text":"cut off"}"#])]).await;

    let result = server
        .client()
        .stream(&hint_request(), None)
        .await
        .expect("stream should open");

    assert_eq!(result.end, StreamEnd::Eof);
    assert_eq!(result.frames, vec![content("cut off")]);

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_status_error_carries_server_message() {
    let server = ScriptedServer::new(vec![response_json(
        429,
        r#"{"message":"Hint limit reached"}"#,
    )])
    .await;

    let error = server
        .client()
        .stream(&hint_request(), None)
        .await
        .expect_err("stream should fail");

    assert!(matches!(
        &error,
        AssistApiError::Status { status, .. } if status.as_u16() == 429
    ));
    assert_eq!(error.server_message(), Some("Hint limit reached"));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_success_with_json_body_is_not_a_stream() {
    let server = ScriptedServer::new(vec![response_json(
        200,
        r#"{"message":"Problem not found"}"#,
    )])
    .await;

    let error = server
        .client()
        .stream(&hint_request(), None)
        .await
        .expect_err("json body is not a stream");

    assert!(matches!(error, AssistApiError::NotAStream { .. }));
    assert_eq!(error.server_message(), Some("Problem not found"));

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_success_with_html_body_is_not_a_stream() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/html; charset=utf-8",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: b"<html>login</html>".to_vec(),
        }],
    }])
    .await;

    let error = server
        .client()
        .stream(&hint_request(), None)
        .await
        .expect_err("html body is not a stream");

    assert!(matches!(
        &error,
        AssistApiError::NotAStream { content_type, .. } if content_type.starts_with("text/html")
    ));
    assert_eq!(error.server_message(), None);

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_cancellation_during_stream() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![
            ResponseChunk {
                delay_ms: 0,
                bytes: data_lines(&[r#"{"text":"stream"}"#]),
            },
            ResponseChunk {
                delay_ms: 500,
                bytes: data_lines(&["[DONE]"]),
            },
        ],
    }])
    .await;

    let client = Arc::new(server.client());
    let request = hint_request();
    let cancellation = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let stream_task = tokio::spawn({
        let client = Arc::clone(&client);
        let cancellation = Arc::clone(&cancellation);
        let seen = Arc::clone(&seen);
        async move {
            client
                .stream_with_handler(&request, Some(&cancellation), |frame| {
                    seen.lock().expect("seen lock").push(frame);
                })
                .await
        }
    });

    sleep(Duration::from_millis(150)).await;
    cancellation.store(true, Ordering::Release);

    let result = timeout(Duration::from_secs(5), stream_task)
        .await
        .expect("stream task should resolve")
        .expect("join handle should resolve")
        .expect_err("cancellation should abort stream");

    assert!(matches!(result, AssistApiError::Cancelled));
    assert_eq!(*seen.lock().expect("seen lock"), vec![content("stream")]);
    server.shutdown();
}

#[tokio::test]
async fn stream_integration_connection_reset_is_request_error() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Reset]).await;

    let result = timeout(
        Duration::from_secs(5),
        server.client().stream(&hint_request(), None),
    )
    .await
    .expect("reset should resolve")
    .expect_err("connection reset should surface as failure");

    assert!(matches!(result, AssistApiError::Request(_)));

    server.shutdown();
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        429 => "Too Many Requests",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Ok(recorded) = read_request(&mut socket).await else {
        return;
    };

    let index = {
        let mut requests = requests.lock().expect("requests lock");
        requests.push(recorded);
        requests.len() - 1
    };
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| response_json(500, r#"{"message":"unexpected request"}"#));

    match response {
        ScriptedResponse::Reset => {}
        ScriptedResponse::Respond {
            status,
            content_type,
            chunks,
        } => {
            let headers = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                status_reason(status),
                content_type,
            );

            if socket.write_all(headers.as_bytes()).await.is_err() {
                return;
            }

            for chunk in chunks {
                if chunk.delay_ms > 0 {
                    sleep(Duration::from_millis(chunk.delay_ms)).await;
                }
                let prefix = format!("{:X}\r\n", chunk.bytes.len());
                if socket.write_all(prefix.as_bytes()).await.is_err() {
                    return;
                }
                if socket.write_all(&chunk.bytes).await.is_err() {
                    return;
                }
                if socket.write_all(b"\r\n").await.is_err() {
                    return;
                }
            }

            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
    }
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    let head_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(position) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..head_end]).to_string();
    let mut recorded = RecordedRequest {
        head,
        body: request[head_end..].to_vec(),
    };
    let content_length = recorded
        .header("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);

    while recorded.body.len() < content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        recorded.body.extend_from_slice(&buffer[..n]);
    }

    Ok(recorded)
}

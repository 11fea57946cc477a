use crate::common::{chunk_payload, config};
use abstract_classifier::{
    api::{ChatCompletionRequest, ChatMessage},
    classify::QueryTarget,
    prelude::*,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::{
    fs,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

const COMPLETIONS: &str = "/v1/chat/completions";

fn sse_body(contents: &[&str]) -> String {
    let mut body = String::from(": keep-alive\n\n");
    for content in contents {
        body.push_str(&format!("data: {}\n\n", chunk_payload(content)));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn api_config(server: &ServerGuard) -> ApiConfig {
    let address = server.socket_address();
    ApiConfig::default()
        .with_api_host(address.ip().to_string())
        .with_api_port(address.port())
        .with_api_key("test-key")
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new(
        "local-model",
        0.0,
        vec![ChatMessage::system("You are a researcher"), ChatMessage::user("question")],
    )
}

#[tokio::test]
async fn streamed_answer_is_extracted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS)
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "local-model",
            "stream": true,
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&["She", " thinks Yes", " or No"]))
        .create_async()
        .await;

    let client = ApiClient::new(api_config(&server)).unwrap();
    let fragments = client.stream_chat(&request()).await.unwrap();
    let answer = ResponseExtractor::new().extract(fragments).await.unwrap();

    assert_eq!(answer, Answer::Yes);
    mock.assert_async().await;
}

fn target() -> QueryTarget {
    QueryTarget {
        record: RecordId(1),
        group: KeywordGroupId(1),
        run: 1,
    }
}

/// Accepts connections, sends stream headers plus one comment line, then never
/// finishes the body. Returns the address and a count of accepted connections.
async fn stalling_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n9\r\n: ping\n\n\n\r\n",
                    )
                    .await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });
    (address, accepted)
}

#[tokio::test]
async fn undecodable_line_is_skipped_over_http() {
    let mut server = Server::new_async().await;
    let mut body = b"data: {\"choices\":[{\"delta\":{\"content\":\"\xff\xfe\"}}]}\n\n".to_vec();
    body.extend_from_slice(sse_body(&["Yes"]).as_bytes());
    let mock = server
        .mock("POST", COMPLETIONS)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .expect(1)
        .create_async()
        .await;

    let client = ApiClient::new(api_config(&server)).unwrap();
    let runner = QueryRunner::new(&client, 3);

    assert_eq!(runner.run(&request(), target()).await, Answer::Yes);
    mock.assert_async().await;
}

#[tokio::test]
async fn stalled_stream_times_out_and_costs_an_attempt() {
    let (address, accepted) = stalling_server().await;
    let config = ApiConfig::default()
        .with_api_host(address.ip().to_string())
        .with_api_port(address.port())
        .with_api_key("test-key")
        .with_request_timeout(Duration::from_millis(300));
    let client = ApiClient::new(config).unwrap();

    let fragments = client.stream_chat(&request()).await.unwrap();
    assert!(ResponseExtractor::new().extract(fragments).await.is_err());

    let runner = QueryRunner::new(&client, 2);
    assert_eq!(runner.run(&request(), target()).await, Answer::NoAnswer);
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn error_status_is_retried_until_exhausted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS)
        .with_status(503)
        .with_body("model is loading")
        .expect(3)
        .create_async()
        .await;

    let client = ApiClient::new(api_config(&server)).unwrap();
    let error = client.stream_chat(&request()).await.err().unwrap();
    assert!(matches!(error, ClientError::Status { status: 503, .. }));

    let runner = QueryRunner::new(&client, 2);
    assert_eq!(runner.run(&request(), target()).await, Answer::NoAnswer);
    mock.assert_async().await;
}

#[tokio::test]
async fn classifies_csv_dataset_over_http() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&["Y"]))
        .expect(2 * 2 * 3)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("papers.csv");
    fs::write(
        &source,
        "Title,Abstract,Journal\nFirst,\"Tumor growth, in mice.\",Nature\nSecond,Soil bacteria.,Science\n",
    )
    .unwrap();

    let mut config = config().with_dataset_path(&source);
    config.api_config = api_config(&server);
    let backend = ApiClient::new(config.api_config.clone()).unwrap();
    let classifier = AbstractClassifier::with_backend(config, backend);

    let mut store = classifier.open_csv_store().unwrap();
    let summary = classifier.run(&mut store).await.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.count(Verdict::Yes), 4);
    mock.assert_async().await;

    let copy = fs::read_to_string(dir.path().join("papers_copy.csv")).unwrap();
    let lines: Vec<&str> = copy.lines().collect();
    assert_eq!(
        lines[0],
        "Title,Abstract,Journal,Processed,Keyword_Group_1_Response,Keyword_Group_2_Response"
    );
    assert_eq!(lines[1], "First,\"Tumor growth, in mice.\",Nature,True,Y,Y");
    assert_eq!(lines[2], "Second,Soil bacteria.,Science,True,Y,Y");

    let mut reopened = classifier.open_csv_store().unwrap();
    assert!(reopened.pending().is_empty());
    let summary = classifier.run(&mut reopened).await.unwrap();
    assert_eq!(summary.completed, 0);
}

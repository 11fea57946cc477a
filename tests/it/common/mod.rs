use abstract_classifier::{api::ChatCompletionRequest, prelude::*};
use futures::StreamExt;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

pub const CONFIG_YAML: &str = r#"
port_number: 1234
model_name: "local-model"
keywords_list: "cancer, tumor; mouse, mice"
temperature: 0.0
file_path: "papers.csv"
example_abstract: "We study tumor growth in human patients."
example_answer: "Y,N"
run_times: 3
max_retries: 5
"#;

/// Chat completion chunk payload carrying `content`, as a server would send it.
pub fn chunk_payload(content: &str) -> String {
    serde_json::json!({
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": content } }],
    })
    .to_string()
}

pub fn fragments_from_payloads<I, S>(payloads: I) -> FragmentStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let payloads: Vec<Result<String, ClientError>> =
        payloads.into_iter().map(|p| Ok(p.into())).collect();
    futures::stream::iter(payloads).boxed()
}

pub fn config() -> ClassifierConfig {
    ClassifierConfig::from_yaml_str(CONFIG_YAML).unwrap()
}

/// What the stub sends back for one attempt.
#[derive(Clone, Debug)]
pub enum Reply {
    /// Streamed delta contents, one chunk each.
    Text(Vec<&'static str>),
    /// Raw `data:` payloads.
    Payloads(Vec<String>),
    /// Transport failure before any fragment.
    Fail,
}

impl Reply {
    pub fn text(content: &'static str) -> Self {
        Reply::Text(vec![content])
    }
}

type Responder = Box<dyn Fn(&str, usize) -> Reply + Send + Sync>;

/// In-process chat backend. `respond` sees the final user message and how many
/// times that exact message was asked before.
pub struct StubBackend {
    respond: Responder,
    seen: Mutex<HashMap<String, usize>>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub latency: Duration,
}

impl StubBackend {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, usize) -> Reply + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            seen: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self::new(move |_, _| reply.clone())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChatBackend for StubBackend {
    async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<FragmentStream, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let question = request.last_user_content().unwrap_or_default().to_owned();
        let nth = {
            let mut seen = self.seen.lock().unwrap();
            let count = seen.entry(question.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };
        match (self.respond)(&question, nth) {
            Reply::Text(parts) => Ok(fragments_from_payloads(
                parts.into_iter().map(chunk_payload),
            )),
            Reply::Payloads(payloads) => Ok(fragments_from_payloads(payloads)),
            Reply::Fail => Err(ClientError::Status {
                status: 500,
                body: "stub failure".into(),
            }),
        }
    }
}

/// Store whose next `failures` persists fail.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failures: usize,
}

impl CheckpointStore for FlakyStore {
    fn records(&self) -> &[Record] {
        self.inner.records()
    }

    fn records_mut(&mut self) -> &mut [Record] {
        self.inner.records_mut()
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.persist()
    }
}

pub fn abstracts(n: usize) -> MemoryStore {
    MemoryStore::from_abstracts(
        (1..=n).map(|i| (format!("Paper {i}"), format!("Abstract number {i}."))),
    )
}

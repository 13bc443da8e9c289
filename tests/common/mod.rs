//! 集成测试共用的内存传输与拨号器

#![allow(dead_code)]

use async_trait::async_trait;
use flare_registry_client::{
    Dialer, FeedConnection, FeedError, Frame, HttpRequest, HttpResponse, Options, RegistryClient,
    RegistryError, Result, Transport,
};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// 测试地址，不会真正建立连接
pub const TEST_ADDR: &str = "127.0.0.1:30100";

/// 初始化测试日志，重复调用无副作用
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("flare_registry_client=debug")
        .with_test_writer()
        .try_init();
}

// ---- 请求/响应 ----

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync;

/// 按闭包应答并记录所有请求的传输
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

pub fn json_response(status: StatusCode, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}

pub fn with_header(mut response: HttpResponse, name: &'static str, value: &str) -> HttpResponse {
    response
        .headers
        .insert(name, HeaderValue::from_str(value).unwrap());
    response
}

/// 读取请求 URL 中的查询参数
pub fn query_param(request: &HttpRequest, name: &str) -> Option<String> {
    let url = reqwest::Url::parse(&request.url).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub fn path_of(request: &HttpRequest) -> String {
    reqwest::Url::parse(&request.url).unwrap().path().to_string()
}

// ---- 长连接 ----

/// 测试侧向连接推送帧或错误
pub type FeedSender = mpsc::UnboundedSender<std::result::Result<Frame, FeedError>>;

enum DialOutcome {
    Fail,
    Connect(mpsc::UnboundedReceiver<std::result::Result<Frame, FeedError>>),
}

/// 按脚本返回拨号结果的拨号器
///
/// 脚本耗尽后所有拨号都失败。
#[derive(Default)]
pub struct MockDialer {
    script: Mutex<VecDeque<DialOutcome>>,
    dials: Mutex<Vec<(String, Instant)>>,
    closes: Arc<AtomicUsize>,
}

impl MockDialer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_failure(&self) {
        self.script.lock().unwrap().push_back(DialOutcome::Fail);
    }

    /// 追加一次成功拨号，返回该连接的推送端
    ///
    /// 推送端保持存活时连接一直可读；丢弃后连接以无关闭码的方式结束。
    pub fn push_connection(&self) -> FeedSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().push_back(DialOutcome::Connect(rx));
        tx
    }

    pub fn dial_count(&self) -> usize {
        self.dials.lock().unwrap().len()
    }

    pub fn dial_urls(&self) -> Vec<String> {
        self.dials.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn dial_instants(&self) -> Vec<Instant> {
        self.dials.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, url: &str, _headers: &HeaderMap) -> Result<Box<dyn FeedConnection>> {
        self.dials
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let outcome = self.script.lock().unwrap().pop_front();
        match outcome {
            Some(DialOutcome::Connect(frames)) => Ok(Box::new(ScriptedConnection {
                frames,
                closes: Arc::clone(&self.closes),
            })),
            Some(DialOutcome::Fail) | None => Err(RegistryError::transport("connection refused")),
        }
    }
}

struct ScriptedConnection {
    frames: mpsc::UnboundedReceiver<std::result::Result<Frame, FeedError>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl FeedConnection for ScriptedConnection {
    async fn read_frame(&mut self) -> std::result::Result<Frame, FeedError> {
        match self.frames.recv().await {
            Some(next) => next,
            None => Err(FeedError::Closed {
                code: None,
                reason: "peer gone".to_string(),
            }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 使用内存传输与拨号器构建客户端
pub fn build_client(
    options: Options,
    transport: Arc<MockTransport>,
    dialer: Arc<MockDialer>,
) -> RegistryClient {
    RegistryClient::builder(options)
        .transport(transport)
        .dialer(dialer)
        .build()
        .expect("Failed to build client")
}

/// 不会收到请求的传输
pub fn unused_transport() -> Arc<MockTransport> {
    MockTransport::new(|request| {
        Err(RegistryError::transport(format!("unexpected request to {}", request.url)))
    })
}

//! 长连接会话集成测试
//!
//! 使用暂停的 tokio 时钟驱动退避计时，拨号器按脚本返回成功或失败。

mod common;

use bytes::Bytes;
use common::{MockDialer, build_client, unused_transport};
use flare_registry_client::{
    EventAction, FeedError, Frame, MicroServiceInstanceChangedEvent, Options, ReconnectConfig,
    RegistryClient, RegistryError, SessionState,
};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant, sleep};

const SERVICE_ID: &str = "s-1";
const INSTANCE_ID: &str = "i-1";

fn options(reconnect: ReconnectConfig) -> Options {
    Options::new([common::TEST_ADDR])
        .with_project("default")
        .with_reconnect(reconnect)
}

/// 无抖动的默认退避：1s, 2s, 4s, 8s ...
fn steady_backoff() -> ReconnectConfig {
    ReconnectConfig {
        randomization_factor: 0.0,
        ..ReconnectConfig::default()
    }
}

fn client_with(dialer: &Arc<MockDialer>, reconnect: ReconnectConfig) -> RegistryClient {
    build_client(options(reconnect), unused_transport(), Arc::clone(dialer))
}

fn event_text(action: &str) -> Frame {
    Frame::Text(format!(
        r#"{{"action":"{}","instance":{{"instanceId":"{}","serviceId":"{}"}}}}"#,
        action, INSTANCE_ID, SERVICE_ID
    ))
}

type Events = Arc<Mutex<Vec<EventAction>>>;

fn collector() -> (Events, impl Fn(MicroServiceInstanceChangedEvent) + Send + Sync + 'static) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    (events, move |event: MicroServiceInstanceChangedEvent| {
        sink.lock().unwrap().push(event.action);
    })
}

/// 轮询等待条件成立，超过虚拟时间上限则失败
async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(120);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        sleep(Duration::from_millis(10)).await;
    }
}

fn assert_gap(actual: Duration, expected_secs: u64) {
    let expected = Duration::from_secs(expected_secs);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(50),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

/// 测试：重复订阅同一服务只建立一条连接
#[tokio::test(start_paused = true)]
async fn test_duplicate_watch_dials_once() {
    common::init_tracing();
    let dialer = MockDialer::new();
    let _conn = dialer.push_connection();
    let _spare = dialer.push_connection();
    let client = client_with(&dialer, steady_backoff());

    let (_events, first) = collector();
    let (_events2, second) = collector();
    let (a, b) = tokio::join!(
        client.watch_microservice(SERVICE_ID, first),
        client.watch_microservice(SERVICE_ID, second)
    );
    a.expect("Failed to watch");
    b.expect("Failed to watch");

    let (_events3, third) = collector();
    client
        .watch_microservice(SERVICE_ID, third)
        .await
        .expect("Failed to watch");

    assert_eq!(dialer.dial_count(), 1);
    assert_eq!(client.session_count().await, 1);
    assert!(client.is_watching(SERVICE_ID).await);
    assert_eq!(
        dialer.dial_urls(),
        vec!["ws://127.0.0.1:30100/v4/default/registry/microservices/s-1/watch".to_string()]
    );
}

/// 测试：断线后按 1s/2s/4s/8s 退避重连，重连后继续投递事件
#[tokio::test(start_paused = true)]
async fn test_watch_reconnects_with_backoff() {
    common::init_tracing();
    let dialer = MockDialer::new();
    let first = dialer.push_connection();
    let client = client_with(&dialer, steady_backoff());

    let (events, callback) = collector();
    client
        .watch_microservice(SERVICE_ID, callback)
        .await
        .expect("Failed to watch");

    first.send(Ok(event_text("CREATE"))).unwrap();
    wait_until("first event", || events.lock().unwrap().len() == 1).await;

    for _ in 0..3 {
        dialer.push_failure();
    }
    let second = dialer.push_connection();

    let lost_at = Instant::now();
    drop(first);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(client.watch_state(SERVICE_ID).await, Some(SessionState::Backoff));
    assert_eq!(client.session_count().await, 1);

    wait_until("four reconnect attempts", || dialer.dial_count() == 5).await;
    let instants = dialer.dial_instants();
    assert_gap(instants[1] - lost_at, 1);
    assert_gap(instants[2] - instants[1], 2);
    assert_gap(instants[3] - instants[2], 4);
    assert_gap(instants[4] - instants[3], 8);

    sleep(Duration::from_millis(10)).await;
    assert!(client.is_watching(SERVICE_ID).await);

    second.send(Ok(event_text("DELETE"))).unwrap();
    wait_until("second event", || events.lock().unwrap().len() == 2).await;
    assert_eq!(
        *events.lock().unwrap(),
        vec![EventAction::Create, EventAction::Delete]
    );
    assert_eq!(dialer.close_count(), 1);
}

/// 测试：重连成功后退避重新从初始间隔开始
#[tokio::test(start_paused = true)]
async fn test_backoff_resets_after_successful_reconnect() {
    common::init_tracing();
    let dialer = MockDialer::new();
    let first = dialer.push_connection();
    let client = client_with(&dialer, steady_backoff());

    let (_events, callback) = collector();
    client
        .watch_microservice(SERVICE_ID, callback)
        .await
        .expect("Failed to watch");

    dialer.push_failure();
    let second = dialer.push_connection();
    drop(first);
    wait_until("reconnect", || dialer.dial_count() == 3).await;

    let _third = dialer.push_connection();
    sleep(Duration::from_millis(10)).await;
    let lost_at = Instant::now();
    drop(second);
    wait_until("second reconnect", || dialer.dial_count() == 4).await;

    assert_gap(dialer.dial_instants()[3] - lost_at, 1);
}

/// 测试：实例被删除的关闭码在下一次重连前触发一次重新注册
#[tokio::test(start_paused = true)]
async fn test_heartbeat_removed_runs_callback_once() {
    common::init_tracing();
    let dialer = MockDialer::new();
    let first = dialer.push_connection();
    let second = dialer.push_connection();
    let _third = dialer.push_connection();
    let client = client_with(&dialer, steady_backoff());

    // 记录回调执行时已发生的拨号次数
    let seen_dials: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let on_removed = {
        let seen_dials = Arc::clone(&seen_dials);
        let dialer = Arc::clone(&dialer);
        move || {
            let seen_dials = Arc::clone(&seen_dials);
            let dialer = Arc::clone(&dialer);
            async move {
                seen_dials.lock().unwrap().push(dialer.dial_count());
            }
        }
    };
    client
        .ws_heartbeat(SERVICE_ID, INSTANCE_ID, on_removed)
        .await
        .expect("Failed to start heartbeat");
    assert_eq!(
        dialer.dial_urls()[0],
        "ws://127.0.0.1:30100/v4/default/registry/microservices/s-1/instances/i-1/heartbeat"
    );

    first
        .send(Err(FeedError::Closed {
            code: Some(4004),
            reason: "instance not exists".to_string(),
        }))
        .unwrap();
    wait_until("reconnect after removal", || dialer.dial_count() == 2).await;
    assert_eq!(*seen_dials.lock().unwrap(), vec![1]);

    // 其他关闭原因只重连，不触发回调
    second
        .send(Err(FeedError::Closed {
            code: Some(1000),
            reason: String::new(),
        }))
        .unwrap();
    wait_until("plain reconnect", || dialer.dial_count() == 3).await;
    assert_eq!(*seen_dials.lock().unwrap(), vec![1]);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(
        client.heartbeat_state(SERVICE_ID, INSTANCE_ID).await,
        Some(SessionState::Active)
    );
}

/// 测试：实例被删除后的重连沿用原实例 ID，ID 中的保留字符按路径段编码
#[tokio::test(start_paused = true)]
async fn test_heartbeat_reconnect_keeps_instance_path() {
    common::init_tracing();
    let dialer = MockDialer::new();
    let first = dialer.push_connection();
    let _second = dialer.push_connection();
    let client = client_with(&dialer, steady_backoff());

    client
        .ws_heartbeat(SERVICE_ID, "i/1?x", || async {})
        .await
        .expect("Failed to start heartbeat");

    first
        .send(Err(FeedError::Closed {
            code: Some(4004),
            reason: "instance not exists".to_string(),
        }))
        .unwrap();
    wait_until("reconnect after removal", || dialer.dial_count() == 2).await;

    let expected =
        "ws://127.0.0.1:30100/v4/default/registry/microservices/s-1/instances/i%2F1%3Fx/heartbeat";
    assert_eq!(dialer.dial_urls(), vec![expected.to_string(), expected.to_string()]);
}

/// 测试：首次拨号失败同步返回错误并释放槽位
#[tokio::test(start_paused = true)]
async fn test_initial_dial_failure_is_returned() {
    common::init_tracing();
    let dialer = MockDialer::new();
    dialer.push_failure();
    let client = client_with(&dialer, steady_backoff());

    let (_events, callback) = collector();
    let result = client.watch_microservice(SERVICE_ID, callback).await;
    assert!(matches!(result, Err(RegistryError::Transport(_))));
    assert_eq!(client.session_count().await, 0);
    assert_eq!(client.watch_state(SERVICE_ID).await, None);

    let _conn = dialer.push_connection();
    let (_events, callback) = collector();
    client
        .watch_microservice(SERVICE_ID, callback)
        .await
        .expect("Failed to watch");
    assert_eq!(dialer.dial_count(), 2);
    assert!(client.is_watching(SERVICE_ID).await);
}

/// 测试：无法解码的帧视为连接失效，控制帧被跳过
#[tokio::test(start_paused = true)]
async fn test_decode_failure_reconnects() {
    common::init_tracing();
    let dialer = MockDialer::new();
    let first = dialer.push_connection();
    let second = dialer.push_connection();
    let client = client_with(&dialer, steady_backoff());

    let (events, callback) = collector();
    client
        .watch_microservice(SERVICE_ID, callback)
        .await
        .expect("Failed to watch");

    first.send(Ok(Frame::Ping(Bytes::from_static(b"hb")))).unwrap();
    first.send(Ok(Frame::Text("not an event".to_string()))).unwrap();
    wait_until("reconnect after decode failure", || dialer.dial_count() == 2).await;
    assert!(events.lock().unwrap().is_empty());

    second.send(Ok(event_text("UPDATE"))).unwrap();
    wait_until("event after reconnect", || events.lock().unwrap().len() == 1).await;
    assert_eq!(*events.lock().unwrap(), vec![EventAction::Update]);
}

/// 测试：设置重连时间上限后放弃重连并释放槽位
#[tokio::test(start_paused = true)]
async fn test_bounded_reconnect_gives_up() {
    common::init_tracing();
    let dialer = MockDialer::new();
    let first = dialer.push_connection();
    let reconnect = ReconnectConfig {
        max_elapsed_ms: Some(5_000),
        ..steady_backoff()
    };
    let client = client_with(&dialer, reconnect);

    let (_events, callback) = collector();
    client
        .watch_microservice(SERVICE_ID, callback)
        .await
        .expect("Failed to watch");
    drop(first);

    let deadline = Instant::now() + Duration::from_secs(60);
    while client.session_count().await > 0 {
        assert!(Instant::now() < deadline, "session was never released");
        sleep(Duration::from_millis(10)).await;
    }
    // 1s + 2s 之后下一次 4s 超出上限
    assert_eq!(dialer.dial_count(), 3);
}

/// 测试：关闭客户端后所有连接被关闭，新的订阅返回 Closed
#[tokio::test(start_paused = true)]
async fn test_close_tears_down_sessions() {
    common::init_tracing();
    let dialer = MockDialer::new();
    let _watch_conn = dialer.push_connection();
    let _heartbeat_conn = dialer.push_connection();
    let client = client_with(&dialer, steady_backoff());

    let (_events, callback) = collector();
    client
        .watch_microservice(SERVICE_ID, callback)
        .await
        .expect("Failed to watch");
    client
        .ws_heartbeat(SERVICE_ID, INSTANCE_ID, || async {})
        .await
        .expect("Failed to start heartbeat");
    assert_eq!(client.session_count().await, 2);

    client.close().await;

    assert_eq!(client.session_count().await, 0);
    assert_eq!(dialer.close_count(), 2);

    let (_events, callback) = collector();
    assert_eq!(
        client.watch_microservice(SERVICE_ID, callback).await,
        Err(RegistryError::Closed)
    );
    assert_eq!(dialer.dial_count(), 2);
}

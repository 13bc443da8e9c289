//! 注册中心客户端
//!
//! 一次性调用经地址池选址后通过 [`Transport`] 发出；实例查询走 revision 条件拉取；
//! watch 与心跳长连接由会话表管理，断线后在后台按指数退避重连。
//!
//! 多个任务可共享同一个 `Arc<RegistryClient>`。

pub mod builder;

pub use builder::RegistryClientBuilder;

use crate::config::{CallOptions, Options};
use crate::error::{RegistryError, Result};
use crate::model::{
    ExistenceIdResponse, FindInstancesResult, MicroService, MicroServiceInstance,
    MicroServiceInstanceChangedEvent, MicroServiceInstanceRequest, MicroServiceInstancesResponse,
    MicroServiceRequest, MicroServiceResponse, MicroServicesResponse,
};
use crate::registry::pool::AddressPool;
use crate::registry::revision::RevisionCache;
use crate::registry::routes::{
    ERR_CODE_SERVICE_NOT_EXISTS, HEADER_CONSUMER_ID, HEADER_REVISION, QUERY_REVISION, RoutePath,
    Routes, build_url,
};
use crate::session::heartbeat::RemovedCallback;
use crate::session::watch::EventCallback;
use crate::session::{FeedContext, HeartbeatHandler, SessionState, WatchHandler, subscribe};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use futures::future::BoxFuture;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 关闭时等待会话退出的时间
const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// 注册中心端点的协议前缀
const REST_SCHEME: &str = "rest";

/// 注册中心客户端
pub struct RegistryClient {
    options: Options,
    transport: Arc<dyn Transport>,
    pool: Arc<AddressPool>,
    routes: Routes,
    revision: RevisionCache,
    headers: HeaderMap,
    feed: Arc<FeedContext>,
    closed: AtomicBool,
}

impl RegistryClient {
    /// 使用默认传输创建客户端
    pub fn new(options: Options) -> Result<Self> {
        RegistryClientBuilder::new(options).build()
    }

    pub fn builder(options: Options) -> RegistryClientBuilder {
        RegistryClientBuilder::new(options)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn pool(&self) -> &Arc<AddressPool> {
        &self.pool
    }

    /// 每个请求携带的默认请求头
    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    // ---- 微服务 ----

    /// 注册微服务，返回服务 ID
    pub async fn register_service(&self, service: &MicroService) -> Result<String> {
        require("serviceName", &service.service_name)?;
        require("version", &service.version)?;

        let body = serde_json::to_vec(&MicroServiceRequest { service })?;
        let response = self
            .call(Method::POST, &self.routes.microservices(), &[], None, Some(body))
            .await?;
        let created: ExistenceIdResponse = response.json()?;
        info!(service_id = %created.service_id, name = %service.service_name, "microservice registered");
        Ok(created.service_id)
    }

    /// 按 app/名称/版本/环境查询服务 ID
    pub async fn get_microservice_id(
        &self,
        app_id: &str,
        service_name: &str,
        version: &str,
        env: &str,
    ) -> Result<String> {
        require("serviceName", service_name)?;
        require("version", version)?;

        let query = [
            ("type", "microservice"),
            ("appId", app_id),
            ("serviceName", service_name),
            ("version", version),
            ("env", env),
        ];
        let response = self
            .call(Method::GET, &self.routes.existence(), &query, None, None)
            .await?;
        let found: ExistenceIdResponse = response.json()?;
        if found.service_id.is_empty() {
            return Err(RegistryError::MicroServiceNotExists);
        }
        Ok(found.service_id)
    }

    pub async fn get_all_microservices(&self) -> Result<Vec<MicroService>> {
        let response = self
            .call(Method::GET, &self.routes.microservices(), &[], None, None)
            .await?;
        Ok(response.json::<MicroServicesResponse>()?.services)
    }

    pub async fn get_microservice(&self, service_id: &str) -> Result<MicroService> {
        require("serviceId", service_id)?;

        let response = self
            .call(Method::GET, &self.routes.microservice(service_id), &[], None, None)
            .await?;
        response
            .json::<MicroServiceResponse>()?
            .service
            .ok_or(RegistryError::MicroServiceNotExists)
    }

    pub async fn unregister_microservice(&self, service_id: &str) -> Result<bool> {
        require("serviceId", service_id)?;

        self.call(Method::DELETE, &self.routes.microservice(service_id), &[], None, None)
            .await?;
        info!(service_id = %service_id, "microservice unregistered");
        Ok(true)
    }

    // ---- 实例 ----

    /// 注册实例，返回实例 ID
    pub async fn register_microservice_instance(&self, instance: &MicroServiceInstance) -> Result<String> {
        require("serviceId", &instance.service_id)?;
        require("hostName", &instance.host_name)?;

        let body = serde_json::to_vec(&MicroServiceInstanceRequest { instance })?;
        let response = self
            .call(
                Method::POST,
                &self.routes.instances(&instance.service_id),
                &[],
                None,
                Some(body),
            )
            .await?;
        let created: ExistenceIdResponse = response.json()?;
        info!(
            service_id = %instance.service_id,
            instance_id = %created.instance_id,
            "microservice instance registered"
        );
        Ok(created.instance_id)
    }

    /// 以消费者身份获取某个服务的全部实例
    pub async fn get_microservice_instances(
        &self,
        consumer_id: &str,
        provider_id: &str,
    ) -> Result<Vec<MicroServiceInstance>> {
        require("providerId", provider_id)?;

        let response = self
            .call(
                Method::GET,
                &self.routes.instances(provider_id),
                &[],
                Some(consumer_id),
                None,
            )
            .await?;
        Ok(response.json::<MicroServiceInstancesResponse>()?.instances)
    }

    /// 按版本规则查找实例
    ///
    /// 默认携带缓存的 revision；列表未变化时返回 [`RegistryError::NotModified`]。
    pub async fn find_microservice_instances(
        &self,
        consumer_id: &str,
        app_id: &str,
        service_name: &str,
        version_rule: &str,
        env: &str,
        opts: CallOptions,
    ) -> Result<Vec<MicroServiceInstance>> {
        self.find_microservice_instances_result(consumer_id, app_id, service_name, version_rule, env, opts)
            .await
            .map(|result| result.instances)
    }

    /// 同 [`find_microservice_instances`](Self::find_microservice_instances)，额外返回响应中的 revision
    pub async fn find_microservice_instances_result(
        &self,
        consumer_id: &str,
        app_id: &str,
        service_name: &str,
        version_rule: &str,
        env: &str,
        opts: CallOptions,
    ) -> Result<FindInstancesResult> {
        require("serviceName", service_name)?;
        require("versionRule", version_rule)?;

        // 显式指定的 revision 不写回缓存
        let (token, use_cache) = if opts.without_revision {
            (None, false)
        } else if let Some(revision) = opts.revision {
            (Some(revision), false)
        } else {
            (Some(self.revision.get().await), true)
        };

        let mut query = vec![
            ("appId", app_id),
            ("serviceName", service_name),
            ("version", version_rule),
            ("env", env),
        ];
        if let Some(token) = token.as_deref() {
            query.push((QUERY_REVISION, token));
        }

        let response = self
            .call(
                Method::GET,
                &self.routes.find_instances(),
                &query,
                Some(consumer_id),
                None,
            )
            .await?;

        // 响应体解码成功后才采用新的 revision
        let instances = response.json::<MicroServiceInstancesResponse>()?.instances;
        let revision = response.header(HEADER_REVISION).map(str::to_string);
        if use_cache {
            if let Some(revision) = &revision {
                self.revision.set(revision.as_str()).await;
            }
        }
        debug!(
            service_name = %service_name,
            count = instances.len(),
            revision = ?revision,
            "microservice instances fetched"
        );
        Ok(FindInstancesResult { instances, revision })
    }

    pub async fn unregister_microservice_instance(&self, service_id: &str, instance_id: &str) -> Result<bool> {
        require("serviceId", service_id)?;
        require("instanceId", instance_id)?;

        self.call(
            Method::DELETE,
            &self.routes.instance(service_id, instance_id),
            &[],
            None,
            None,
        )
        .await?;
        info!(service_id = %service_id, instance_id = %instance_id, "microservice instance unregistered");
        Ok(true)
    }

    /// 一次性 HTTP 心跳
    pub async fn heartbeat(&self, service_id: &str, instance_id: &str) -> Result<bool> {
        require("serviceId", service_id)?;
        require("instanceId", instance_id)?;

        self.call(
            Method::PUT,
            &self.routes.heartbeat(service_id, instance_id),
            &[],
            None,
            None,
        )
        .await?;
        Ok(true)
    }

    pub async fn update_instance_status(
        &self,
        service_id: &str,
        instance_id: &str,
        status: &str,
    ) -> Result<bool> {
        require("serviceId", service_id)?;
        require("instanceId", instance_id)?;
        require("status", status)?;

        self.call(
            Method::PUT,
            &self.routes.instance_status(service_id, instance_id),
            &[("value", status)],
            None,
            None,
        )
        .await?;
        Ok(true)
    }

    /// 注册中心自身的实例列表
    pub async fn health(&self) -> Result<Vec<MicroServiceInstance>> {
        let response = self
            .call(Method::GET, &self.routes.health(), &[], None, None)
            .await?;
        Ok(response.json::<MicroServiceInstancesResponse>()?.instances)
    }

    // ---- 地址同步 ----

    /// 启动地址探测，并用注册中心自报的端点替换地址池
    ///
    /// 获取失败或端点为空时地址池保持不变。
    pub async fn sync_endpoints(&self) -> Result<()> {
        self.ensure_open()?;
        self.pool.monitor().await;

        let instances = self.health().await?;
        let mut endpoints: Vec<String> = Vec::new();
        for instance in &instances {
            for endpoint in instance.endpoints_for(REST_SCHEME) {
                if !endpoints.contains(&endpoint) {
                    endpoints.push(endpoint);
                }
            }
        }

        if endpoints.is_empty() {
            warn!("registry reported no rest endpoints, keeping current addresses");
            return Err(RegistryError::NoAvailableAddress);
        }
        self.pool.set_address(endpoints).await;
        Ok(())
    }

    // ---- revision ----

    pub async fn revision(&self) -> String {
        self.revision.get().await
    }

    /// 丢弃缓存的 revision，下一次查询拉取全量
    pub async fn reset_revision(&self) {
        self.revision.reset().await;
    }

    // ---- 长连接 ----

    /// 订阅某个服务的实例变更
    ///
    /// 同一服务重复订阅不会建立第二条连接。首次连接失败直接返回错误；
    /// 之后的断线在后台重连，事件按到达顺序同步交给回调。
    pub async fn watch_microservice<F>(&self, service_id: &str, callback: F) -> Result<()>
    where
        F: Fn(MicroServiceInstanceChangedEvent) + Send + Sync + 'static,
    {
        require("serviceId", service_id)?;
        self.ensure_open()?;

        let callback: EventCallback = Arc::new(callback);
        let handler = Arc::new(WatchHandler::new(service_id, callback));
        subscribe(
            Arc::clone(&self.feed),
            watch_key(service_id),
            self.routes.watch(service_id),
            handler,
        )
        .await
    }

    /// 建立实例心跳长连接
    ///
    /// 注册中心以实例不存在为由关闭连接时，`on_removed` 在下一次重连前执行一次，
    /// 通常用于重新注册实例。重连仍使用原来的 `instance_id`，因此重新注册时必须在
    /// [`MicroServiceInstance::instance_id`] 中带上同一个 ID；注册中心分配了新 ID 时，
    /// 需要调用方自行以新 ID 再次调用本方法。
    pub async fn ws_heartbeat<F, Fut>(&self, service_id: &str, instance_id: &str, on_removed: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        require("serviceId", service_id)?;
        require("instanceId", instance_id)?;
        self.ensure_open()?;

        let on_removed: RemovedCallback = Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(on_removed()) });
        let handler = Arc::new(HeartbeatHandler::new(service_id, instance_id, on_removed));
        subscribe(
            Arc::clone(&self.feed),
            heartbeat_key(service_id, instance_id),
            self.routes.heartbeat(service_id, instance_id),
            handler,
        )
        .await
    }

    pub async fn is_watching(&self, service_id: &str) -> bool {
        self.feed.sessions.is_ready(&watch_key(service_id)).await
    }

    pub async fn watch_state(&self, service_id: &str) -> Option<SessionState> {
        self.feed.sessions.state(&watch_key(service_id)).await
    }

    pub async fn heartbeat_state(&self, service_id: &str, instance_id: &str) -> Option<SessionState> {
        self.feed
            .sessions
            .state(&heartbeat_key(service_id, instance_id))
            .await
    }

    pub async fn session_count(&self) -> usize {
        self.feed.sessions.len().await
    }

    /// 关闭所有长连接并停止地址探测，之后的调用返回 [`RegistryError::Closed`]
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.feed.sessions.close(SESSION_CLOSE_TIMEOUT).await;
        self.pool.shutdown().await;
        info!("registry client closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // ---- 内部 ----

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(RegistryError::Closed)
        } else {
            Ok(())
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &RoutePath,
        query: &[(&str, &str)],
        consumer_id: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        self.ensure_open()?;

        let address = self.pool.get_available_address().await;
        let url = build_url(self.options.http_scheme(), &address, path, query)?;

        let mut headers = self.headers.clone();
        if let Some(consumer_id) = consumer_id.filter(|id| !id.is_empty()) {
            headers.insert(HEADER_CONSUMER_ID, HeaderValue::from_str(consumer_id)?);
        }

        let mut request = HttpRequest::new(method, url).with_headers(headers);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let response = self.transport.send(request).await?;
        check_status(response)
    }
}

/// 把响应状态码映射为结果
fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.status.is_success() {
        return Ok(response);
    }
    if response.status == StatusCode::NOT_MODIFIED {
        return Err(RegistryError::NotModified);
    }
    if response.status == StatusCode::BAD_REQUEST
        && response.body_text().contains(ERR_CODE_SERVICE_NOT_EXISTS)
    {
        return Err(RegistryError::MicroServiceNotExists);
    }
    response.error_for_status()
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RegistryError::invalid_argument(format!("{} 不能为空", field)));
    }
    Ok(())
}

fn watch_key(service_id: &str) -> String {
    format!("watch/{}", service_id)
}

fn heartbeat_key(service_id: &str, instance_id: &str) -> String {
    format!("heartbeat/{}/{}", service_id, instance_id)
}

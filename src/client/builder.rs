//! 客户端构建器

use super::RegistryClient;
use crate::config::Options;
use crate::error::Result;
use crate::registry::pool::AddressPool;
use crate::registry::revision::RevisionCache;
use crate::registry::routes::{HEADER_DOMAIN_NAME, Routes};
use crate::session::{FeedContext, SessionTable};
use crate::transport::{Dialer, ReqwestTransport, Transport, WsDialer};
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

const CLIENT_USER_AGENT: &str = concat!("flare-registry-client/", env!("CARGO_PKG_VERSION"));

/// 客户端构建器
///
/// 未注入 [`Transport`] / [`Dialer`] 时分别使用 reqwest 与 WebSocket 实现。
pub struct RegistryClientBuilder {
    options: Options,
    transport: Option<Arc<dyn Transport>>,
    dialer: Option<Arc<dyn Dialer>>,
}

impl RegistryClientBuilder {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            transport: None,
            dialer: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        let options = self.options;

        let mut addrs = options.addrs.clone();
        if addrs.is_empty() {
            warn!(fallback = %options.fallback_address, "no registry address configured, using fallback");
            addrs.push(options.fallback_address.clone());
        }

        let pool = Arc::new(
            AddressPool::new(addrs)
                .with_probe_interval(options.resolved_probe_interval())
                .with_default_port(options.default_port)
                .with_fallback(options.fallback_address.clone()),
        );

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(options.request_timeout(), options.verbose)?),
        };
        let dialer: Arc<dyn Dialer> = match self.dialer {
            Some(dialer) => dialer,
            None => Arc::new(WsDialer::new()),
        };

        let headers = default_headers(&options)?;
        let project = options.resolved_project();
        let routes = Routes::new(&options.version, &project);

        let feed = Arc::new(FeedContext {
            pool: Arc::clone(&pool),
            dialer,
            headers: headers.clone(),
            scheme: options.feed_scheme(),
            reconnect: options.reconnect.clone(),
            sessions: Arc::new(SessionTable::new()),
        });

        info!(
            addresses = ?options.addrs,
            project = %project,
            ssl = options.enable_ssl,
            "registry client created"
        );

        Ok(RegistryClient {
            options,
            transport,
            pool,
            routes,
            revision: RevisionCache::new(),
            headers,
            feed,
            closed: AtomicBool::new(false),
        })
    }
}

fn default_headers(options: &Options) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    headers.insert(HEADER_DOMAIN_NAME, HeaderValue::from_str(&options.tenant)?);
    Ok(headers)
}

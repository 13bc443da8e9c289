//! 注册中心路由与协议常量

use crate::error::{RegistryError, Result};
use std::fmt;

/// 携带实例列表 revision 的响应头
pub const HEADER_REVISION: &str = "X-Resource-Revision";
pub const HEADER_CONSUMER_ID: &str = "X-ConsumerId";
pub const HEADER_DOMAIN_NAME: &str = "X-Domain-Name";

/// 查询参数中的 revision
pub const QUERY_REVISION: &str = "rev";

/// 400 响应体中表示"微服务不存在"的错误码
pub const ERR_CODE_SERVICE_NOT_EXISTS: &str = "400012";

/// 心跳长连接上表示"实例已被删除"的关闭码
pub const INSTANCE_NOT_EXISTS_CLOSE_CODE: u16 = 4004;

/// 由路径段组成的 API 路径
///
/// 路径段在拼接 URL 时逐段百分号编码，ID 中的 `/`、`?`、`#` 不会改变路由。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePath {
    segments: Vec<String>,
}

impl RoutePath {
    fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// API 路径
#[derive(Debug, Clone)]
pub struct Routes {
    base: RoutePath,
}

impl Routes {
    pub fn new(version: &str, project: &str) -> Self {
        Self {
            base: RoutePath {
                segments: vec![version.to_string(), project.to_string(), "registry".to_string()],
            },
        }
    }

    pub fn microservices(&self) -> RoutePath {
        self.base.child("microservices")
    }

    pub fn microservice(&self, service_id: &str) -> RoutePath {
        self.microservices().child(service_id)
    }

    pub fn existence(&self) -> RoutePath {
        self.base.child("existence")
    }

    pub fn instances(&self, service_id: &str) -> RoutePath {
        self.microservice(service_id).child("instances")
    }

    pub fn instance(&self, service_id: &str, instance_id: &str) -> RoutePath {
        self.instances(service_id).child(instance_id)
    }

    pub fn heartbeat(&self, service_id: &str, instance_id: &str) -> RoutePath {
        self.instance(service_id, instance_id).child("heartbeat")
    }

    pub fn instance_status(&self, service_id: &str, instance_id: &str) -> RoutePath {
        self.instance(service_id, instance_id).child("status")
    }

    pub fn find_instances(&self) -> RoutePath {
        self.base.child("instances")
    }

    pub fn health(&self) -> RoutePath {
        self.base.child("health")
    }

    pub fn watch(&self, service_id: &str) -> RoutePath {
        self.microservice(service_id).child("watch")
    }
}

/// 拼接完整 URL，逐段编码路径并编码查询参数
pub fn build_url(
    scheme: &str,
    address: &str,
    path: &RoutePath,
    query: &[(&str, &str)],
) -> Result<String> {
    let raw = format!("{}://{}/", scheme, address);
    let mut url = reqwest::Url::parse(&raw)
        .map_err(|e| RegistryError::invalid_argument(format!("非法的 URL {}: {}", raw, e)))?;
    url.path_segments_mut()
        .map_err(|_| RegistryError::invalid_argument(format!("URL 不支持路径: {}", raw)))?
        .pop_if_empty()
        .extend(path.segments());
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url.into())
}

//! 微服务实例定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 实例状态：在线
pub const MS_INSTANCE_UP: &str = "UP";
/// 实例状态：下线
pub const MS_INSTANCE_DOWN: &str = "DOWN";
/// 心跳方式的健康检查
pub const CHECK_BY_HEARTBEAT: &str = "push";
/// 默认租约续期间隔（秒）
pub const DEFAULT_LEASE_RENEWAL_INTERVAL: i32 = 30;

/// 微服务实例
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MicroServiceInstance {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance_id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_id: String,

    /// 形如 `rest://10.0.0.1:8080?sslEnabled=false`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub host_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub timestamp: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_center_info: Option<DataCenterInfo>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub environment: String,
}

/// 健康检查配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheck {
    pub mode: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub port: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub interval: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub times: i32,
}

/// 数据中心信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataCenterInfo {
    pub name: String,
    pub region: String,
    pub available_zone: String,
}

/// 实例标识
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MicroServiceInstanceKey {
    pub instance_id: String,
    pub service_id: String,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

impl MicroServiceInstance {
    /// 创建新的实例描述
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            status: MS_INSTANCE_UP.to_string(),
            ..Default::default()
        }
    }

    /// 设置所属微服务
    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = service_id.into();
        self
    }

    /// 添加访问端点
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// 添加属性
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// 设置环境
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// 使用心跳方式保活
    pub fn with_heartbeat_check(mut self, interval: i32, times: i32) -> Self {
        self.health_check = Some(HealthCheck {
            mode: CHECK_BY_HEARTBEAT.to_string(),
            port: 0,
            interval,
            times,
        });
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == MS_INSTANCE_UP
    }

    /// 提取指定协议的 `host:port`
    ///
    /// 例如 `rest://10.0.0.1:30100?sslEnabled=true` 在协议为 `rest` 时得到 `10.0.0.1:30100`。
    pub fn endpoints_for(&self, scheme: &str) -> Vec<String> {
        self.endpoints
            .iter()
            .filter_map(|ep| {
                let uri = ep.parse::<http::Uri>().ok()?;
                if uri.scheme_str()? != scheme {
                    return None;
                }
                uri.authority().map(|a| a.as_str().to_string())
            })
            .collect()
    }

    pub fn key(&self) -> MicroServiceInstanceKey {
        MicroServiceInstanceKey {
            instance_id: self.instance_id.clone(),
            service_id: self.service_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_host_port_for_scheme() {
        let instance = MicroServiceInstance::new("node-1")
            .with_endpoint("rest://10.0.0.1:30100?sslEnabled=false")
            .with_endpoint("grpc://10.0.0.1:30110")
            .with_endpoint("not a uri");

        assert_eq!(instance.endpoints_for("rest"), vec!["10.0.0.1:30100"]);
        assert_eq!(instance.endpoints_for("grpc"), vec!["10.0.0.1:30110"]);
        assert!(instance.endpoints_for("highway").is_empty());
    }

    #[test]
    fn serializes_camel_case_and_skips_empty_fields() {
        let instance = MicroServiceInstance::new("node-1")
            .with_service_id("svc-1")
            .with_heartbeat_check(30, 3);
        let json = serde_json::to_value(&instance).unwrap();

        assert_eq!(json["serviceId"], "svc-1");
        assert_eq!(json["hostName"], "node-1");
        assert_eq!(json["status"], MS_INSTANCE_UP);
        assert_eq!(json["healthCheck"]["mode"], CHECK_BY_HEARTBEAT);
        assert!(json.get("instanceId").is_none());
        assert!(json.get("endpoints").is_none());
    }
}

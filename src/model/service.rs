//! 微服务定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 微服务状态：在线
pub const MICROSERVICE_UP: &str = "UP";
/// 微服务状态：下线
pub const MICROSERVICE_DOWN: &str = "DOWN";

/// 微服务
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MicroService {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_id: String,
    #[serde(rename = "appId", skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub level: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<ServicePath>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<DependencyMicroService>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub register_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub environment: String,
}

impl MicroService {
    pub fn new(
        app_id: impl Into<String>,
        service_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            service_name: service_name.into(),
            version: version.into(),
            status: MICROSERVICE_UP.to_string(),
            ..Default::default()
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_framework(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.framework = Some(Framework {
            name: name.into(),
            version: version.into(),
        });
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// 服务路由路径
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicePath {
    pub path: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub property: HashMap<String, String>,
}

/// 框架信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Framework {
    pub name: String,
    pub version: String,
}

/// 微服务唯一键
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MicroServiceKey {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tenant: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(rename = "appId", skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stage: String,
}

/// 依赖的微服务
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependencyMicroService {
    #[serde(rename = "appId")]
    pub app_id: String,
    pub service_name: String,
    pub version: String,
}

/// 消费者与提供者的依赖关系
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroServiceDependency {
    pub consumer: Option<DependencyMicroService>,
    pub providers: Vec<DependencyMicroService>,
}

//! 注册中心请求/响应体

use super::{MicroService, MicroServiceInstance};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct MicroServiceRequest<'a> {
    pub service: &'a MicroService,
}

#[derive(Debug, Clone, Serialize)]
pub struct MicroServiceInstanceRequest<'a> {
    pub instance: &'a MicroServiceInstance,
}

/// 注册/查询返回的 ID
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExistenceIdResponse {
    pub service_id: String,
    pub schema_id: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MicroServiceResponse {
    pub service: Option<MicroService>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MicroServicesResponse {
    pub services: Vec<MicroService>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MicroServiceInstancesResponse {
    pub instances: Vec<MicroServiceInstance>,
}

/// 条件拉取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindInstancesResult {
    pub instances: Vec<MicroServiceInstance>,
    /// 服务端返回的 revision（响应头缺失时为 `None`）
    pub revision: Option<String>,
}

//! 注册中心数据模型

pub mod event;
pub mod instance;
pub mod response;
pub mod service;

pub use event::{EventAction, MicroServiceInstanceChangedEvent};
pub use instance::{
    CHECK_BY_HEARTBEAT, DEFAULT_LEASE_RENEWAL_INTERVAL, DataCenterInfo, HealthCheck,
    MS_INSTANCE_DOWN, MS_INSTANCE_UP, MicroServiceInstance, MicroServiceInstanceKey,
};
pub use response::{
    ExistenceIdResponse, FindInstancesResult, MicroServiceInstanceRequest,
    MicroServiceInstancesResponse, MicroServiceRequest, MicroServiceResponse,
    MicroServicesResponse,
};
pub use service::{
    DependencyMicroService, Framework, MICROSERVICE_DOWN, MICROSERVICE_UP, MicroService,
    MicroServiceDependency, MicroServiceKey, ServicePath,
};

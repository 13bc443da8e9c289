//! 实例变更事件

use super::{MicroServiceInstance, MicroServiceKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 事件动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventAction {
    Create,
    Update,
    Delete,
    Error,
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventAction::Create => write!(f, "CREATE"),
            EventAction::Update => write!(f, "UPDATE"),
            EventAction::Delete => write!(f, "DELETE"),
            EventAction::Error => write!(f, "ERROR"),
        }
    }
}

/// 订阅推送的实例变更事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroServiceInstanceChangedEvent {
    pub action: EventAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<MicroServiceKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<MicroServiceInstance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_registry_payload() {
        let raw = r#"{
            "action": "UPDATE",
            "key": {"appId": "default", "serviceName": "orders", "version": "1.0.0"},
            "instance": {"instanceId": "i-1", "serviceId": "s-1", "status": "DOWN"}
        }"#;
        let event: MicroServiceInstanceChangedEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(event.action, EventAction::Update);
        assert_eq!(event.key.unwrap().service_name, "orders");
        assert_eq!(event.instance.unwrap().instance_id, "i-1");
    }

    #[test]
    fn rejects_unknown_action() {
        let raw = r#"{"action": "RENAME"}"#;
        assert!(serde_json::from_str::<MicroServiceInstanceChangedEvent>(raw).is_err());
    }
}

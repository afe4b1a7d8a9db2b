use async_trait::async_trait;
use control_plane::ControlPlaneError;
use model::{LifecycleEvent, SecretValue};
use provisioner::ProvisionError;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;

/// Result of a successful Create or Update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOutput {
    /// Identity for the resource, used only when the event did not carry one.
    pub physical_resource_id: Option<String>,
    /// Attributes exported to the stack.
    pub data: BTreeMap<String, String>,
}

impl HandlerOutput {
    pub fn with_data(key: &str, value: impl Into<String>) -> Self {
        HandlerOutput {
            physical_resource_id: None,
            data: BTreeMap::from([(key.to_string(), value.into())]),
        }
    }
}

/// Every way a dispatched action can fail. The display text becomes the
/// reason reported back to the orchestrator.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    ControlPlane(#[from] ControlPlaneError),
    #[error("{0}")]
    Provision(#[from] ProvisionError),
    #[error("missing resource property {0}")]
    MissingProperty(&'static str),
    #[error("malformed lifecycle event: {0}")]
    MalformedEvent(String),
    #[error("handler did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Reason to report when the underlying message is blank.
    pub fn fallback_reason(&self) -> &'static str {
        match self {
            HandlerError::ControlPlane(_) => "control plane call failed",
            HandlerError::Provision(_) => "database provisioning failed",
            HandlerError::MissingProperty(_) => "missing resource property",
            HandlerError::MalformedEvent(_) => "malformed lifecycle event",
            HandlerError::TimedOut(_) => "handler timed out",
            HandlerError::Panicked(_) => "handler panicked",
        }
    }

    /// The text sent as `Reason`. Never empty.
    pub fn reason(&self) -> String {
        let message: String = self.to_string();

        match message.trim().is_empty() {
            true => self.fallback_reason().to_string(),
            false => message,
        }
    }
}

/// Secret properties lifted out of the event before it was logged.
#[derive(Debug, Default)]
pub struct Secrets(HashMap<&'static str, SecretValue>);

impl Secrets {
    pub fn insert(&mut self, key: &'static str, value: SecretValue) {
        self.0.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&SecretValue> {
        self.0.get(key)
    }
}

/// Resource-specific behaviour plugged into the [`crate::LifecycleDispatcher`].
///
/// Delete is handled by the dispatcher itself and never reaches a handler.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Properties removed from the event before anything is logged.
    fn secret_properties(&self) -> &'static [&'static str] {
        &[]
    }

    async fn create(
        &self,
        event: &LifecycleEvent,
        secrets: &Secrets,
    ) -> Result<HandlerOutput, HandlerError>;

    async fn update(
        &self,
        event: &LifecycleEvent,
        secrets: &Secrets,
    ) -> Result<HandlerOutput, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_the_underlying_message() {
        let err: HandlerError =
            ControlPlaneError::new("ModifyDBInstance", "DBInstanceNotFound: ghost-db").into();
        assert_eq!("DBInstanceNotFound: ghost-db", err.to_string());

        let err: HandlerError = ProvisionError::new("Access denied for user 'root'").into();
        assert_eq!("Access denied for user 'root'", err.to_string());
    }

    #[test]
    fn blank_messages_still_give_a_reason() {
        let err: HandlerError = ControlPlaneError::new("ModifyDBInstance", "").into();
        assert_eq!("control plane call failed", err.reason());

        let err: HandlerError = ProvisionError::new("  ").into();
        assert_eq!("database provisioning failed", err.reason());

        let err: HandlerError = ProvisionError::new("Unknown database 'ghost'").into();
        assert_eq!("Unknown database 'ghost'", err.reason());
    }

    #[test]
    fn timeout_reason_names_the_limit() {
        let err: HandlerError = HandlerError::TimedOut(Duration::from_secs(170));
        assert_eq!("handler did not finish within 170s", err.to_string());
    }

    #[test]
    fn secrets_debug_does_not_expose_values() {
        let mut secrets: Secrets = Secrets::default();
        secrets.insert("Password", SecretValue::new("hunter2"));

        assert!(!format!("{secrets:?}").contains("hunter2"));
        assert_eq!(Some("hunter2"), secrets.get("Password").map(SecretValue::expose));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// A lifecycle request delivered by the orchestrator for a single custom resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    // Presigned, single-use callback address
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    // Only present on Update and Delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
    #[serde(default)]
    pub resource_properties: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<HashMap<String, Value>>,
}

impl LifecycleEvent {
    /// Look up a resource property which is expected to be a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.resource_properties.get(key).and_then(Value::as_str)
    }

    /// Remove a secret from the event, leaving an empty string in its place.
    ///
    /// The previous properties of an Update are cleared as well so that no
    /// representation of the event still carries the value.
    pub fn take_secret(&mut self, key: &str) -> Option<SecretValue> {
        if let Some(old) = self.old_resource_properties.as_mut() {
            clear_property(old, key);
        }

        clear_property(&mut self.resource_properties, key).map(SecretValue)
    }

    pub fn response_url_for_log(&self) -> &str {
        url_for_log(&self.response_url)
    }
}

/// A presigned address without its query string, which carries the signature.
pub fn url_for_log(url: &str) -> &str {
    match url.split_once('?') {
        Some((base, _)) => base,
        None => url,
    }
}

fn clear_property(properties: &mut HashMap<String, Value>, key: &str) -> Option<String> {
    let value: &mut Value = properties.get_mut(key)?;

    let secret: String = match value.take() {
        Value::String(secret) => secret,
        other => other.to_string(),
    };
    *value = Value::String(String::new());

    Some(secret)
}

/// A secret lifted out of an event. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        SecretValue(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for SecretValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

/// The fields needed to answer the orchestrator, available even when the
/// rest of the event is unusable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorrelationIds {
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
}

impl CorrelationIds {
    pub fn response_url_for_log(&self) -> &str {
        url_for_log(&self.response_url)
    }
}

impl From<&LifecycleEvent> for CorrelationIds {
    fn from(event: &LifecycleEvent) -> Self {
        CorrelationIds {
            response_url: event.response_url.clone(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            physical_resource_id: event.physical_resource_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update_event() -> LifecycleEvent {
        serde_json::from_value(json!({
            "RequestType": "Update",
            "ServiceToken": "arn:aws:lambda:ap-southeast-2:123456789012:function:InitDBFunction",
            "ResponseURL": "https://cloudformation-custom-resource-response.s3.amazonaws.com/path?X-Amz-Signature=abc",
            "StackId": "arn:aws:cloudformation:ap-southeast-2:123456789012:stack/ghost/1",
            "RequestId": "5d478078-13e9-baf0-464a-7ef285ecc786",
            "LogicalResourceId": "DBInit",
            "PhysicalResourceId": "2024/01/01/[$LATEST]abc",
            "ResourceType": "Custom::DBInit",
            "ResourceProperties": { "Password": "hunter2", "DBHost": "db.local" },
            "OldResourceProperties": { "Password": "hunter1" }
        }))
        .unwrap()
    }

    #[test]
    fn parses_orchestrator_event() {
        let event: LifecycleEvent = update_event();

        assert_eq!(RequestType::Update, event.request_type);
        assert_eq!("DBInit", event.logical_resource_id);
        assert_eq!(Some("2024/01/01/[$LATEST]abc"), event.physical_resource_id.as_deref());
        assert_eq!(Some("db.local"), event.property_str("DBHost"));
    }

    #[test]
    fn create_event_has_no_physical_id() {
        let event: LifecycleEvent = serde_json::from_value(json!({
            "RequestType": "Create",
            "ResponseURL": "https://example.com/cb",
            "StackId": "stack",
            "RequestId": "request",
            "LogicalResourceId": "CodeBuildInit",
            "ResourceProperties": { "ProjectName": "build-x" }
        }))
        .unwrap();

        assert_eq!(None, event.physical_resource_id);
        assert_eq!(Some("build-x"), event.property_str("ProjectName"));
    }

    #[test]
    fn take_secret_clears_every_copy() {
        let mut event: LifecycleEvent = update_event();

        let secret: SecretValue = event.take_secret("Password").expect("Password is present");

        assert_eq!("hunter2", secret.expose());
        assert_eq!(Some(""), event.property_str("Password"));

        let logged: String = format!("{:?}", event);
        assert!(!logged.contains("hunter2"));
        assert!(!logged.contains("hunter1"));
    }

    #[test]
    fn take_secret_of_missing_key_is_none() {
        let mut event: LifecycleEvent = update_event();

        assert!(event.take_secret("Token").is_none());
        assert!(!event.resource_properties.contains_key("Token"));
    }

    #[test]
    fn secret_debug_hides_value() {
        let secret: SecretValue = SecretValue::new("hunter2");

        assert_eq!("SecretValue(***)", format!("{:?}", secret));
    }

    #[test]
    fn response_url_for_log_drops_signature() {
        let event: LifecycleEvent = update_event();

        assert_eq!(
            "https://cloudformation-custom-resource-response.s3.amazonaws.com/path",
            event.response_url_for_log()
        );
        assert_eq!(
            event.response_url_for_log(),
            CorrelationIds::from(&event).response_url_for_log()
        );
    }

    #[test]
    fn url_without_query_is_kept() {
        assert_eq!("http://127.0.0.1:8080/cb", url_for_log("http://127.0.0.1:8080/cb"));
    }

    #[test]
    fn correlation_ids_parse_from_partial_event() {
        let ids: CorrelationIds = serde_json::from_value(json!({
            "RequestType": "Rename",
            "ResponseURL": "https://example.com/cb",
            "StackId": "stack",
            "RequestId": "request",
            "LogicalResourceId": "DBInit"
        }))
        .unwrap();

        assert_eq!("request", ids.request_id);
        assert_eq!(None, ids.physical_resource_id);
    }
}

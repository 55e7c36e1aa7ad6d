//! Request and response bodies for `/operations/{resource}/{operation}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Either a batch of items or a single bare item.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OperationRequest {
    Batch {
        items: Vec<Value>,
        #[serde(default, rename = "continueOnFail")]
        continue_on_fail: bool,
    },
    Single(Map<String, Value>),
}

impl OperationRequest {
    /// Items to run, and whether failing items are recorded instead of aborting the batch.
    pub fn into_parts(self) -> (Vec<Value>, bool) {
        match self {
            OperationRequest::Batch { items, continue_on_fail } => (items, continue_on_fail),
            OperationRequest::Single(item) => (vec![Value::Object(item)], false),
        }
    }
}

impl Default for OperationRequest {
    fn default() -> Self {
        OperationRequest::Single(Map::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub data: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_request() {
        let request: OperationRequest =
            serde_json::from_value(json!({"items": [{"userId": "u1"}, {"userId": "u2"}], "continueOnFail": true})).unwrap();
        let (items, continue_on_fail) = request.into_parts();
        assert_eq!(items.len(), 2);
        assert!(continue_on_fail);
    }

    #[test]
    fn test_bare_object_is_single_item() {
        let request: OperationRequest = serde_json::from_value(json!({"userId": "u1"})).unwrap();
        assert_eq!(request.into_parts(), (vec![json!({"userId": "u1"})], false));
    }

    #[test]
    fn test_non_array_items_is_single_item() {
        // An `items` field that isn't a list is just another parameter.
        let request: OperationRequest = serde_json::from_value(json!({"items": "x"})).unwrap();
        assert_eq!(request.into_parts().0, vec![json!({"items": "x"})]);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(serde_json::from_value::<OperationRequest>(json!([1, 2])).is_err());
    }
}

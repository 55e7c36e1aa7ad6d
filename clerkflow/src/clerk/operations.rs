//! Running a `(resource, operation)` over a batch of workflow items.

use std::sync::Arc;

use metrics::counter;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::clerk::client::ClerkClient;
use crate::clerk::params::{OperationParams, to_query_pairs};
use crate::clerk::table::{CallKind, Endpoint, OperationTable};
use crate::errors::{Error, Result};
use crate::types::{Operation, Resource};

#[derive(Debug, Clone)]
pub struct OperationExecutor {
    client: ClerkClient,
    table: Arc<OperationTable>,
}

impl OperationExecutor {
    pub fn new(client: ClerkClient, table: Arc<OperationTable>) -> Self {
        Self { client, table }
    }

    pub fn table(&self) -> &OperationTable {
        &self.table
    }

    /// Run the operation once per item, in order.
    ///
    /// Array responses are flattened into the output. When `continue_on_fail` is set a failing
    /// item contributes `{"error": message}` and processing goes on; otherwise the first failure
    /// aborts the batch with the item's index.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn execute(
        &self,
        resource: Resource,
        operation: Operation,
        items: &[Value],
        continue_on_fail: bool,
    ) -> Result<Vec<Value>> {
        let endpoint = self.table.lookup(resource, operation)?;
        let mut output = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            match self.execute_item(endpoint, item).await {
                Ok(Value::Array(values)) => output.extend(values),
                Ok(value) => output.push(value),
                Err(err) if continue_on_fail => {
                    counter!("clerkflow_operations_total", "outcome" => "item_failed").increment(1);
                    warn!(index, error = %err, "Operation item failed, continuing");
                    output.push(json!({ "error": err.item_message() }));
                }
                Err(err) => {
                    counter!("clerkflow_operations_total", "outcome" => "failed").increment(1);
                    return Err(Error::ItemFailed {
                        index,
                        source: Box::new(err),
                    });
                }
            }
        }

        counter!("clerkflow_operations_total", "outcome" => "success").increment(1);
        debug!(results = output.len(), "Operation complete");
        Ok(output)
    }

    async fn execute_item(&self, endpoint: &Endpoint, item: &Value) -> Result<Value> {
        let params = OperationParams::new(item)?;
        let segments = endpoint.path_segments(&params)?;
        let body = endpoint.build_body(&params)?;
        let query = to_query_pairs(&endpoint.build_query(&params)?);
        let method = endpoint.method.clone();

        match endpoint.call {
            CallKind::Single => self.client.request(method, &segments, &body, &query).await,
            CallKind::Paged => {
                let max = (!params.return_all()).then(|| params.limit());
                let items = self.client.request_all_items(method, &segments, &query, max).await?;
                Ok(Value::Array(items))
            }
            CallKind::AllItems => {
                let items = self.client.request_all_items(method, &segments, &query, None).await?;
                Ok(Value::Array(items))
            }
        }
    }
}

//! Running Clerk Backend API operations on behalf of a workflow.

use axum::{
    Json,
    extract::{Path, State},
};
use bytes::Bytes;
use tracing::instrument;

use crate::{
    AppState,
    api::models::operations::{OperationRequest, OperationResponse},
    errors::{Error, Result},
    types::{Operation, Resource},
};

/// `POST /operations/{resource}/{operation}`.
///
/// Accepts `{"items": [...], "continueOnFail": bool}` or a single bare item; an empty body is one
/// item with no parameters.
#[instrument(skip_all, fields(resource = %resource, operation = %operation))]
pub async fn run_operation(
    State(state): State<AppState>,
    Path((resource, operation)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<OperationResponse>> {
    let resource: Resource = resource.parse().map_err(|_| Error::NotFound {
        resource: "Resource".to_string(),
        id: resource.clone(),
    })?;
    let operation: Operation = operation.parse().map_err(|_| Error::NotFound {
        resource: "Operation".to_string(),
        id: operation.clone(),
    })?;

    let executor = state.operations.as_ref().ok_or_else(|| Error::Internal {
        operation: "run Clerk operation: clerk.secret_key is not configured".to_string(),
    })?;

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        OperationRequest::default()
    } else {
        serde_json::from_slice::<OperationRequest>(&body).map_err(|_| Error::BadRequest {
            message: "Invalid JSON body".to_string(),
        })?
    };
    let (items, continue_on_fail) = request.into_parts();

    let data = executor.execute(resource, operation, &items, continue_on_fail).await?;
    Ok(Json(OperationResponse { data }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::models::operations::OperationResponse;
    use crate::test_utils::{create_test_config, create_test_server, with_clerk_base_url};
    use crate::webhooks::LogDispatcher;

    async fn server_for(clerk: &MockServer) -> axum_test::TestServer {
        let config = with_clerk_base_url(create_test_config(), &clerk.uri());
        create_test_server(config, Arc::new(LogDispatcher))
    }

    #[tokio::test]
    async fn test_single_item_operation() {
        let clerk = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/user_1"))
            .and(header("authorization", "Bearer sk_test_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "user_1"})))
            .expect(1)
            .mount(&clerk)
            .await;

        let server = server_for(&clerk).await;
        let response = server.post("/operations/user/get").json(&json!({"userId": "user_1"})).await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<OperationResponse>(),
            OperationResponse {
                data: vec![json!({"id": "user_1"})]
            }
        );
    }

    #[tokio::test]
    async fn test_batch_with_continue_on_fail() {
        let clerk = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/users/user_1/metadata"))
            .and(body_json(json!({"public_metadata": {"tier": "gold"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "user_1"})))
            .mount(&clerk)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v1/users/user_2/metadata"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "errors": [{"message": "invalid", "long_message": "Metadata is invalid"}]
            })))
            .mount(&clerk)
            .await;

        let server = server_for(&clerk).await;
        let response = server
            .post("/operations/user/updateMetadata")
            .json(&json!({
                "items": [
                    {"userId": "user_1", "metadata": {"publicMetadata": "{\"tier\":\"gold\"}"}},
                    {"userId": "user_2", "metadata": {"publicMetadata": "{\"tier\":\"gold\"}"}}
                ],
                "continueOnFail": true
            }))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>(),
            json!({"data": [{"id": "user_1"}, {"error": "Metadata is invalid"}]})
        );
    }

    #[tokio::test]
    async fn test_clerk_client_error_passes_through() {
        let clerk = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/sess_1/revoke"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": [{"message": "Session not found"}]})))
            .mount(&clerk)
            .await;

        let server = server_for(&clerk).await;
        let response = server.post("/operations/session/revoke").json(&json!({"sessionId": "sess_1"})).await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>(), json!({"error": "Item 0: Session not found"}));
    }

    #[tokio::test]
    async fn test_clerk_server_error_is_bad_gateway() {
        let clerk = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/sess_1/revoke"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&clerk)
            .await;

        let server = server_for(&clerk).await;
        let response = server.post("/operations/session/revoke").json(&json!({"sessionId": "sess_1"})).await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert_eq!(response.json::<Value>(), json!({"error": "Item 0: Unknown Clerk API error"}));
    }

    #[tokio::test]
    async fn test_paged_list_honours_limit() {
        let clerk = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/invitations"))
            .and(query_param("limit", "3"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "inv_1"}, {"id": "inv_2"}, {"id": "inv_3"}],
                "total_count": 10
            })))
            .expect(1)
            .mount(&clerk)
            .await;

        let server = server_for(&clerk).await;
        let response = server.post("/operations/invitation/getAll").json(&json!({"limit": 3})).await;

        response.assert_status_ok();
        assert_eq!(response.json::<OperationResponse>().data.len(), 3);
    }

    #[tokio::test]
    async fn test_unsupported_operation_is_bad_request() {
        let clerk = MockServer::start().await;
        let server = server_for(&clerk).await;

        let response = server.post("/operations/session/ban").json(&json!({})).await;
        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>(),
            json!({"error": "The operation \"ban\" is not supported for resource \"session\""})
        );
    }

    #[tokio::test]
    async fn test_unknown_names_not_found() {
        let clerk = MockServer::start().await;
        let server = server_for(&clerk).await;

        server.post("/operations/widget/get").json(&json!({})).await.assert_status_not_found();
        server.post("/operations/user/explode").json(&json!({})).await.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_missing_parameter_is_bad_request() {
        let clerk = MockServer::start().await;
        let server = server_for(&clerk).await;

        let response = server.post("/operations/user/get").await;
        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>(),
            json!({"error": "Item 0: Missing required parameter \"userId\""})
        );
    }

    #[tokio::test]
    async fn test_without_secret_key_is_internal_error() {
        let clerk = MockServer::start().await;
        let mut config = with_clerk_base_url(create_test_config(), &clerk.uri());
        config.clerk.secret_key = String::new();
        let server = create_test_server(config, Arc::new(LogDispatcher));

        let response = server.post("/operations/user/get").json(&json!({"userId": "u"})).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>(), json!({"error": "Internal server error"}));
    }
}

use crate::completion::{CompletionClient, CompletionRequest};
use crate::config::GenerationParams;
use crate::error::QueryError;
use crate::knowledge::KnowledgeBase;
use lambda_http::http::{header, HeaderValue, Method, StatusCode};
use lambda_http::{Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::sync::Arc;
use tracing::{error, info, warn};

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, x-api-key, anthropic-version";

/// Everything a handler instance needs, built once during cold start
pub struct AppState {
    pub knowledge: KnowledgeBase,
    pub completion: Arc<dyn CompletionClient>,
    pub params: GenerationParams,
}

/// Incoming request payload
#[derive(Deserialize)]
struct QueryRequest {
    /// The user's question
    #[serde(default)]
    user_query: Option<String>,
}

/// Successful answer payload
#[derive(Debug, PartialEq, Serialize)]
pub struct QueryReply {
    #[serde(rename = "aiReply")]
    pub ai_reply: String,
}

/// Error response payload
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Lambda handler function.
///
/// Answers CORS preflight requests directly; everything else goes through
/// [`answer_query`] and [`into_response`].
pub async fn function_handler(
    state: Arc<AppState>,
    event: Request,
) -> Result<Response<Body>, Error> {
    if event.method() == Method::OPTIONS {
        return Ok(preflight_response());
    }

    let result = answer_query(&state, event.body()).await;
    Ok(into_response(result))
}

/// Validates the body, builds the prompt and calls the completion API once.
pub async fn answer_query(state: &AppState, body: &[u8]) -> Result<QueryReply, QueryError> {
    let question = parse_query(body)?;

    let request = CompletionRequest {
        prompt: state.knowledge.build_prompt(&question),
        params: state.params.clone(),
    };

    info!(
        provider = state.completion.name(),
        query_len = question.len(),
        prompt_len = request.prompt.len(),
        "Calling completion API"
    );

    let completion = state.completion.complete(&request).await?;

    Ok(QueryReply {
        ai_reply: completion.trim().to_string(),
    })
}

/// Extracts the trimmed question from the request body.
///
/// An empty body counts as `{}`. Syntax errors are unexpected failures, while
/// well-formed JSON with the wrong shape is the caller's fault.
fn parse_query(body: &[u8]) -> Result<String, QueryError> {
    let body: &[u8] = if body.trim_ascii().is_empty() { b"{}" } else { body };

    let request: QueryRequest = serde_json::from_slice(body).map_err(|e| match e.classify() {
        Category::Data => QueryError::Client(format!("Invalid request body: {e}")),
        _ => QueryError::Unexpected(format!("Invalid JSON: {e}")),
    })?;

    let question = request.user_query.as_deref().unwrap_or_default().trim();
    if question.is_empty() {
        return Err(QueryError::Client("Missing 'user_query'".to_string()));
    }

    Ok(question.to_string())
}

/// Maps the outcome of [`answer_query`] to an HTTP response.
pub fn into_response(result: Result<QueryReply, QueryError>) -> Response<Body> {
    match result {
        Ok(reply) => match serde_json::to_string(&reply) {
            Ok(body) => {
                info!(reply_len = reply.ai_reply.len(), "Answer generated successfully");
                json_response(StatusCode::OK, body)
            }
            Err(e) => error_from_query_error(&QueryError::from(e)),
        },
        Err(err) => {
            if err.is_client_error() {
                warn!("Rejected query: {}", err);
            } else {
                error!("Query failed: {}", err);
            }
            error_from_query_error(&err)
        }
    }
}

/// Helper function to create error responses from QueryError
fn error_from_query_error(err: &QueryError) -> Response<Body> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::to_string(&ErrorResponse {
        error: err.user_message(),
    })
    .unwrap_or_else(|_| r#"{"error":"Unknown error"}"#.to_string());

    json_response(status, body)
}

fn json_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = cors_response(status, Body::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn preflight_response() -> Response<Body> {
    let mut response = cors_response(StatusCode::OK, Body::Empty);
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

fn cors_response(status: StatusCode, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

//! Step Functions client
//!
//! Speaks the AWS JSON 1.0 protocol: every call is a `POST /` with an
//! `X-Amz-Target: AWSStepFunctions.<Operation>` header and a JSON body.
//! Request signing is not done here; point the endpoint at Step Functions
//! Local or at a signing proxy.

use async_trait::async_trait;
use fp_core::{
    EngineConfig, Error, ExecutionDescription, ExecutionId, HistoryPage, Result,
    StartedExecution, WorkflowEngine,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.0";
const TARGET_HEADER: &str = "X-Amz-Target";
const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";
const TARGET_PREFIX: &str = "AWSStepFunctions";

/// Error code the engine uses for an unknown execution ARN
const EXECUTION_DOES_NOT_EXIST: &str = "ExecutionDoesNotExist";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartExecutionInput<'a> {
    state_machine_arn: &'a str,
    input: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetExecutionHistoryInput<'a> {
    execution_arn: &'a str,
    max_results: u32,
    reverse_order: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeExecutionInput<'a> {
    execution_arn: &'a str,
}

/// Error body returned by the engine
#[derive(Debug, Default, Deserialize)]
struct EngineErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// HTTP client for a Step Functions compatible endpoint
pub struct StepFunctionsClient {
    config: EngineConfig,
    http_client: reqwest::Client,
}

impl StepFunctionsClient {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(AMZ_JSON_CONTENT_TYPE));

        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| Error::config("Invalid engine bearer token"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let response = self
            .http_client
            .post(&self.config.endpoint)
            .header(TARGET_HEADER, format!("{}.{}", TARGET_PREFIX, operation))
            .body(payload)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        let header_code = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(operation, e))?;

        if !status.is_success() {
            let body: EngineErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            let code = body
                .kind
                .or(header_code)
                .map(|kind| error_code(&kind).to_string())
                .unwrap_or_else(|| "UnknownError".to_string());
            let message = body
                .message
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());

            warn!(operation, status = status.as_u16(), code = %code, "Engine call failed");

            if code == EXECUTION_DOES_NOT_EXIST {
                return Err(Error::unknown_execution(message));
            }
            return Err(Error::engine_api(status.as_u16(), code, message));
        }

        debug!(operation, bytes = bytes.len(), "Engine call succeeded");
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// `com.amazonaws.swf.service.v2.model#ExecutionDoesNotExist` -> `ExecutionDoesNotExist`
fn error_code(kind: &str) -> &str {
    let code = kind.rsplit('#').next().unwrap_or(kind);
    code.split(':').next().unwrap_or(code)
}

fn transport_error(operation: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::EngineTimeout(format!("{}: {}", operation, err))
    } else {
        Error::engine_unavailable(format!("{}: {}", operation, err))
    }
}

#[async_trait]
impl WorkflowEngine for StepFunctionsClient {
    fn name(&self) -> &'static str {
        "step-functions"
    }

    #[instrument(skip(self, input), fields(input_bytes = input.len()))]
    async fn start_execution(&self, definition: &str, input: &str) -> Result<StartedExecution> {
        self.call(
            "StartExecution",
            &StartExecutionInput {
                state_machine_arn: definition,
                input,
            },
        )
        .await
    }

    #[instrument(skip(self), fields(execution_id = %execution_id))]
    async fn get_execution_history_page(
        &self,
        execution_id: &ExecutionId,
        next_token: Option<&str>,
    ) -> Result<HistoryPage> {
        self.call(
            "GetExecutionHistory",
            &GetExecutionHistoryInput {
                execution_arn: execution_id.as_str(),
                max_results: self.config.history_page_size,
                reverse_order: false,
                next_token,
            },
        )
        .await
    }

    #[instrument(skip(self), fields(execution_id = %execution_id))]
    async fn describe_execution(&self, execution_id: &ExecutionId) -> Result<ExecutionDescription> {
        self.call(
            "DescribeExecution",
            &DescribeExecutionInput {
                execution_arn: execution_id.as_str(),
            },
        )
        .await
    }
}

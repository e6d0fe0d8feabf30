//! Step Functions client against a mocked endpoint

#[cfg(test)]
mod tests {
    use fp_core::{EngineConfig, Error, EventKind, ExecutionId, ExecutionStatus, WorkflowEngine};
    use fp_engine::StepFunctionsClient;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARN: &str = "arn:aws:states:us-east-1:123456789012:execution:Grades:run-1";

    fn client_for(server: &MockServer) -> StepFunctionsClient {
        let config = EngineConfig::default()
            .with_endpoint(server.uri())
            .with_history_page_size(2)
            .with_timeout(Duration::from_millis(500));
        StepFunctionsClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_start_execution_sends_target_and_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Amz-Target", "AWSStepFunctions.StartExecution"))
            .and(header("content-type", "application/x-amz-json-1.0"))
            .and(body_partial_json(json!({
                "stateMachineArn": "arn:aws:states:us-east-1:123456789012:stateMachine:Grades",
                "input": "{\"marks\":[90,75]}"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionArn": ARN,
                "startDate": 1700000000.5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let started = client_for(&server)
            .start_execution(
                "arn:aws:states:us-east-1:123456789012:stateMachine:Grades",
                "{\"marks\":[90,75]}",
            )
            .await
            .unwrap();

        assert_eq!(started.execution_arn.as_str(), ARN);
    }

    #[tokio::test]
    async fn test_history_pages_are_concatenated() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("X-Amz-Target", "AWSStepFunctions.GetExecutionHistory"))
            .and(body_partial_json(json!({ "nextToken": "page-2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [
                    { "id": 3, "previousEventId": 2, "timestamp": 1700000002.0,
                      "type": "ExecutionSucceeded",
                      "executionSucceededEventDetails": { "output": "{\"grade\":\"A\"}" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("X-Amz-Target", "AWSStepFunctions.GetExecutionHistory"))
            .and(body_partial_json(json!({ "executionArn": ARN, "maxResults": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [
                    { "id": 1, "previousEventId": 0, "timestamp": 1700000000.0,
                      "type": "ExecutionStarted",
                      "executionStartedEventDetails": { "input": "{}" } },
                    { "id": 2, "previousEventId": 1, "timestamp": 1700000001.0,
                      "type": "TaskStateEntered",
                      "stateEnteredEventDetails": { "name": "Grade", "input": "{}" } }
                ],
                "nextToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = client_for(&server)
            .get_execution_history(&ExecutionId::new(ARN))
            .await
            .unwrap();

        let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["ExecutionStarted", "TaskStateEntered", "ExecutionSucceeded"]);
        assert_eq!(events[1].entered_state(), Some("Grade"));
        assert_eq!(events[2].kind, EventKind::ExecutionSucceeded);
    }

    #[tokio::test]
    async fn test_describe_execution() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Amz-Target", "AWSStepFunctions.DescribeExecution"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionArn": ARN,
                "stateMachineArn": "arn:aws:states:us-east-1:123456789012:stateMachine:Grades",
                "status": "SUCCEEDED",
                "output": "{\"grade\":\"A\"}",
                "startDate": 1700000000.0,
                "stopDate": 1700000003.0
            })))
            .mount(&server)
            .await;

        let description = client_for(&server)
            .describe_execution(&ExecutionId::new(ARN))
            .await
            .unwrap();

        assert_eq!(description.status, ExecutionStatus::Succeeded);
        assert_eq!(description.output.as_deref(), Some("{\"grade\":\"A\"}"));
    }

    #[tokio::test]
    async fn test_unknown_execution_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "com.amazonaws.swf.service.v2.model#ExecutionDoesNotExist",
                "message": "Execution Does Not Exist: 'arn:missing'"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .describe_execution(&ExecutionId::new("arn:missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownExecution(ref msg) if msg.contains("arn:missing")));
    }

    #[tokio::test]
    async fn test_other_engine_errors_keep_status_and_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "InvalidArn",
                "message": "Invalid Arn: 'nope'"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .describe_execution(&ExecutionId::new("nope"))
            .await
            .unwrap_err();

        match err {
            Error::EngineApi { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code, "InvalidArn");
                assert!(message.contains("nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_type_header_is_used_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503)
                    .insert_header("x-amzn-ErrorType", "ServiceUnavailable")
                    .set_body_string("down"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .describe_execution(&ExecutionId::new(ARN))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EngineApi { status: 503, ref code, .. } if code == "ServiceUnavailable"));
    }

    #[tokio::test]
    async fn test_slow_engine_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "executionArn": ARN, "status": "RUNNING" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .describe_execution(&ExecutionId::new(ARN))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EngineTimeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_engine() {
        let config = EngineConfig::default()
            .with_endpoint("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(500));
        let client = StepFunctionsClient::new(config).unwrap();

        let err = client
            .describe_execution(&ExecutionId::new(ARN))
            .await
            .unwrap_err();

        assert!(err.is_engine_error());
        assert!(matches!(err, Error::EngineUnavailable(_) | Error::EngineTimeout(_)));
    }
}

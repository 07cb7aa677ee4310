// HTTP route handlers for the custom test API

use axum::{
    extract::{rejection::FormRejection, Form, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use customtest_common::types::{ExecutionRequest, SubmissionRecord, TEST_SITE_PERM};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::form::{FormContext, SubmissionForm, ValidationError};
use crate::metrics;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub output: String,
}

/// GET /customtest - Editor context, prefilled from the user's last run
pub async fn custom_test_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<FormContext>, ApiError> {
    if !user.has_perm(TEST_SITE_PERM) {
        info!(user_id = %user.id, "Custom test page requested without permission");
        return Err(ApiError::ComingSoon);
    }

    let last_run = state.store.latest_submission(&user.id).await?;

    // The profile is only consulted when there is no history to go by
    let profile_language = match &last_run {
        Some(run) => run.language.clone(),
        None => state
            .store
            .profile_language(&user.id)
            .await?
            .unwrap_or_else(|| state.config.default_language.clone()),
    };

    Ok(Json(FormContext::build(
        last_run,
        profile_language,
        &state.languages,
        &state.config,
    )))
}

/// POST /customtest/run - Record the submission, run it on Judge0, return the output
pub async fn run_custom_test(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    form: Result<Form<SubmissionForm>, FormRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    if !user.has_perm(TEST_SITE_PERM) {
        return Err(ApiError::Forbidden);
    }

    let submission = form
        .map_err(|e| ValidationError::Malformed(e.body_text()))
        .and_then(|Form(form)| form.validate(&state.languages, &state.config));
    let submission = match submission {
        Ok(s) => s,
        Err(e) => {
            info!(user_id = %user.id, reason = %e, "Rejected custom test submission");
            metrics::record_outcome("invalid");
            return Err(e.into());
        }
    };

    // Saved before the call so a Judge0 failure never loses the user's input
    let record = SubmissionRecord::new(
        user.id,
        submission.language.key.clone(),
        submission.source.clone(),
        submission.input.clone(),
    );
    if let Err(e) = state.store.upsert_submission(&record).await {
        metrics::record_outcome("store_failed");
        return Err(e.into());
    }

    let request = ExecutionRequest {
        source_code: submission.source,
        stdin: submission.input,
        language_id: submission.language.judge0_id,
    };

    let timer = metrics::JUDGE0_LATENCY.start_timer();
    let result = state.judge.run(&request).await;
    timer.observe_duration();

    match result {
        Ok(response) => {
            info!(
                user_id = %user.id,
                language = %record.language,
                status = response.status.as_deref().unwrap_or("unknown"),
                stderr = response.stderr.as_deref().unwrap_or(""),
                "Custom test executed"
            );
            metrics::record_outcome("success");
            Ok(Json(RunResponse {
                output: response.display_output(),
            }))
        }
        Err(e) => {
            error!(user_id = %user.id, language = %record.language, error = %e, "Judge0 call failed");
            metrics::record_outcome("judge_failed");
            Err(e.into())
        }
    }
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn export_metrics() -> impl IntoResponse {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge0::{ExecutionService, JudgeError};
    use crate::language_config::LanguageRegistry;
    use crate::routes;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        Router,
    };
    use customtest_common::config::Config;
    use customtest_common::store::{MemoryStore, Store};
    use customtest_common::types::{ExecutionResponse, User, EMPTY_OUTPUT_MESSAGE};
    use std::sync::Mutex;
    use tower::ServiceExt; // for `oneshot`

    const TOKEN: &str = "test-token";

    struct FakeJudge {
        response: Option<ExecutionResponse>,
        store: MemoryStore,
        calls: Mutex<Vec<ExecutionRequest>>,
        history_seen_at_call: Mutex<Vec<usize>>,
    }

    impl FakeJudge {
        fn new(store: &MemoryStore, response: Option<ExecutionResponse>) -> Arc<Self> {
            Arc::new(Self {
                response,
                store: store.clone(),
                calls: Mutex::new(Vec::new()),
                history_seen_at_call: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ExecutionService for FakeJudge {
        async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, JudgeError> {
            self.calls.lock().unwrap().push(request.clone());
            self.history_seen_at_call
                .lock()
                .unwrap()
                .push(self.store.history_len());
            self.response.clone().ok_or(JudgeError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn registry() -> LanguageRegistry {
        LanguageRegistry::from_json(
            r#"{"languages": [
                { "key": "py3", "name": "Python 3", "judge0_id": 71 },
                { "key": "cpp17", "name": "C++17", "judge0_id": 54 }
            ]}"#,
        )
        .unwrap()
    }

    /// Sessions resolve normally, every write to history fails
    struct FailingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl Store for FailingStore {
        async fn session_user(&self, token: &str) -> redis::RedisResult<Option<User>> {
            self.inner.session_user(token).await
        }

        async fn profile_language(&self, user_id: &uuid::Uuid) -> redis::RedisResult<Option<String>> {
            self.inner.profile_language(user_id).await
        }

        async fn latest_submission(
            &self,
            user_id: &uuid::Uuid,
        ) -> redis::RedisResult<Option<SubmissionRecord>> {
            self.inner.latest_submission(user_id).await
        }

        async fn upsert_submission(&self, _record: &SubmissionRecord) -> redis::RedisResult<()> {
            Err(redis::RedisError::from((redis::ErrorKind::IoError, "connection refused")))
        }
    }

    fn app(store: &MemoryStore, judge: Arc<FakeJudge>) -> Router {
        app_with_store(Arc::new(store.clone()), judge)
    }

    fn app_with_store(store: Arc<dyn Store>, judge: Arc<FakeJudge>) -> Router {
        let state = Arc::new(AppState {
            store,
            judge,
            languages: registry(),
            config: Config::default(),
        });
        routes::routes().with_state(state)
    }

    fn permitted_user(store: &MemoryStore) -> User {
        let mut user = User::new("alice");
        user.grant(TEST_SITE_PERM);
        store.add_user(user.clone(), TOKEN);
        user
    }

    fn page_request() -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri("/customtest")
            .header("Authorization", format!("Bearer {}", TOKEN))
            .body(Body::empty())
            .unwrap()
    }

    fn run_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/customtest/run")
            .header("Authorization", format!("Bearer {}", TOKEN))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn stdout(text: &str) -> Option<ExecutionResponse> {
        Some(ExecutionResponse {
            stdout: Some(text.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_page_defaults_to_profile_language() {
        let store = MemoryStore::new();
        let user = permitted_user(&store);
        store.set_profile_language(user.id, "cpp17");

        let (status, body) = send(app(&store, FakeJudge::new(&store, None)), page_request()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_lang"], "cpp17");
        assert_eq!(body["form"]["language"], "cpp17");
        assert_eq!(body["form"]["source"], "");
        assert_eq!(body["langs"].as_array().unwrap().len(), 2);
        assert_eq!(body["title"], "Custom Test");
    }

    #[tokio::test]
    async fn test_page_without_profile_uses_configured_default() {
        let store = MemoryStore::new();
        permitted_user(&store);

        let (status, body) = send(app(&store, FakeJudge::new(&store, None)), page_request()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_lang"], "py3");
    }

    #[tokio::test]
    async fn test_page_prefills_from_last_run() {
        let store = MemoryStore::new();
        let user = permitted_user(&store);
        store.set_profile_language(user.id, "cpp17");
        store
            .upsert_submission(&SubmissionRecord::new(
                user.id,
                "py3".into(),
                "print(input())".into(),
                "hello".into(),
            ))
            .await
            .unwrap();

        let (status, body) = send(app(&store, FakeJudge::new(&store, None)), page_request()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_lang"], "py3");
        assert_eq!(body["form"]["language"], "py3");
        assert_eq!(body["form"]["source"], "print(input())");
        assert_eq!(body["form"]["input"], "hello");
    }

    #[tokio::test]
    async fn test_page_without_permission_is_coming_soon() {
        let store = MemoryStore::new();
        store.add_user(User::new("mallory"), TOKEN);

        let (status, body) = send(app(&store, FakeJudge::new(&store, None)), page_request()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], crate::error::COMING_SOON_MESSAGE);
        assert!(body.get("form").is_none());
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let store = MemoryStore::new();
        let request = Request::builder()
            .uri("/customtest")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(&store, FakeJudge::new(&store, None)), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }

    #[tokio::test]
    async fn test_run_records_submission_and_returns_stdout() {
        let store = MemoryStore::new();
        let user = permitted_user(&store);
        let judge = FakeJudge::new(&store, stdout("hi\n"));

        let (status, body) = send(
            app(&store, judge.clone()),
            run_request("language=py3&source=print%28input%28%29%29&input=hi"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "hi\n");

        let record = store.history(&user.id).unwrap();
        assert_eq!(record.language, "py3");
        assert_eq!(record.code, "print(input())");
        assert_eq!(record.input_data, "hi");
        assert_eq!(store.history_len(), 1);

        let calls = judge.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].language_id, 71);
        assert_eq!(calls[0].source_code, "print(input())");
        assert_eq!(calls[0].stdin, "hi");
    }

    #[tokio::test]
    async fn test_record_is_saved_before_judge_call() {
        let store = MemoryStore::new();
        permitted_user(&store);
        let judge = FakeJudge::new(&store, stdout("1"));

        send(app(&store, judge.clone()), run_request("language=py3&source=print%281%29")).await;

        assert_eq!(*judge.history_seen_at_call.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_second_run_overwrites_record() {
        let store = MemoryStore::new();
        let user = permitted_user(&store);
        let judge = FakeJudge::new(&store, stdout("ok"));

        send(app(&store, judge.clone()), run_request("language=py3&source=a")).await;
        send(app(&store, judge.clone()), run_request("language=cpp17&source=b&input=c")).await;

        assert_eq!(store.history_len(), 1);
        let record = store.history(&user.id).unwrap();
        assert_eq!(record.language, "cpp17");
        assert_eq!(record.code, "b");
        assert_eq!(record.input_data, "c");
    }

    #[tokio::test]
    async fn test_missing_source_is_rejected_without_side_effects() {
        let store = MemoryStore::new();
        let user = permitted_user(&store);
        let previous = SubmissionRecord::new(user.id, "py3".into(), "old".into(), String::new());
        store.upsert_submission(&previous).await.unwrap();
        let judge = FakeJudge::new(&store, stdout("never"));

        let (status, body) = send(app(&store, judge.clone()), run_request("language=cpp17&input=1")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "Invalid input" }));
        assert_eq!(store.history(&user.id), Some(previous));
        assert!(judge.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_language_is_rejected() {
        let store = MemoryStore::new();
        permitted_user(&store);
        let judge = FakeJudge::new(&store, stdout("never"));

        let (status, _) = send(app(&store, judge.clone()), run_request("language=cobol&source=x")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.history_len(), 0);
    }

    #[tokio::test]
    async fn test_non_form_body_is_rejected() {
        let store = MemoryStore::new();
        permitted_user(&store);
        let request = Request::builder()
            .method("POST")
            .uri("/customtest/run")
            .header("Authorization", format!("Bearer {}", TOKEN))
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"language":"py3","source":"x"}"#))
            .unwrap();

        let (status, body) = send(app(&store, FakeJudge::new(&store, None)), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid input");
        assert_eq!(store.history_len(), 0);
    }

    #[tokio::test]
    async fn test_compile_output_wins_over_stdout() {
        let store = MemoryStore::new();
        permitted_user(&store);
        let judge = FakeJudge::new(
            &store,
            Some(ExecutionResponse {
                stdout: Some("partial".to_string()),
                compile_output: Some("error: expected ';'".to_string()),
                ..Default::default()
            }),
        );

        let (status, body) = send(app(&store, judge), run_request("language=cpp17&source=int+main%28%29")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "error: expected ';'");
    }

    #[tokio::test]
    async fn test_empty_stdout_gets_placeholder() {
        let store = MemoryStore::new();
        permitted_user(&store);
        let judge = FakeJudge::new(&store, stdout(""));

        let (status, body) = send(app(&store, judge), run_request("language=py3&source=pass")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], EMPTY_OUTPUT_MESSAGE);
    }

    #[tokio::test]
    async fn test_judge_failure_is_server_error_and_keeps_record() {
        let store = MemoryStore::new();
        let user = permitted_user(&store);
        let judge = FakeJudge::new(&store, None);

        let (status, body) = send(app(&store, judge), run_request("language=py3&source=print%281%29&input=7")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({ "error": "Judge0 call failed" }));
        let record = store.history(&user.id).unwrap();
        assert_eq!(record.code, "print(1)");
        assert_eq!(record.input_data, "7");
    }

    #[tokio::test]
    async fn test_store_failure_is_server_error_and_skips_judge() {
        let store = MemoryStore::new();
        permitted_user(&store);
        let judge = FakeJudge::new(&store, stdout("never"));
        let failing = Arc::new(FailingStore { inner: store.clone() });

        let (status, body) = send(
            app_with_store(failing, judge.clone()),
            run_request("language=py3&source=print%281%29"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({ "error": "Internal server error" }));
        assert!(judge.calls.lock().unwrap().is_empty());
        assert_eq!(store.history_len(), 0);
    }

    #[tokio::test]
    async fn test_run_without_permission_is_forbidden() {
        let store = MemoryStore::new();
        store.add_user(User::new("mallory"), TOKEN);
        let judge = FakeJudge::new(&store, stdout("never"));

        let (status, _) = send(app(&store, judge.clone()), run_request("language=py3&source=x")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(store.history_len(), 0);
        assert!(judge.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = MemoryStore::new();
        let request = Request::builder().uri("/status").body(Body::empty()).unwrap();
        let response = app(&store, FakeJudge::new(&store, None))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

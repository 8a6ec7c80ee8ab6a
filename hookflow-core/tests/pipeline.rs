// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end pipeline behavior: ordering, gating, failure classification,
//! timeouts, result passing and concurrent runs.

use async_trait::async_trait;
use hookflow_core::hooks::{CallbackHandler, FnHandler, NoOpHandler};
use hookflow_core::operation::{
    ContextData, ModelResponse, ModelSessionService, ParseOptions, Session, SessionConfig,
    StructuralData, StructuralParser,
};
use hookflow_core::{
    CollaboratorError, Collaborators, Condition, EngineEvent, HookConfig, HookContext, HookEngine,
    HookError, HookHandler, HookStatus, Operation, OperationKind, OperationOutput, Phase,
    PipelineRequest, SkipReason,
};
use parking_lot::Mutex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct RecordingParser {
    calls: AtomicUsize,
}

#[async_trait]
impl StructuralParser for RecordingParser {
    async fn parse_file(
        &self,
        path: &Path,
        options: &ParseOptions,
    ) -> Result<StructuralData, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StructuralData {
            file_path: path.to_path_buf(),
            language: options.language.clone().or_else(|| Some("javascript".to_string())),
            symbols: Vec::new(),
            tree: json!({"type": "Program"}),
        })
    }

    async fn generate_context(
        &self,
        files: &[PathBuf],
        task: &str,
    ) -> Result<ContextData, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ContextData {
            task: task.to_string(),
            files: files.to_vec(),
            content: format!("{} files", files.len()),
            token_estimate: Some(files.len() * 100),
        })
    }
}

struct EchoSessions;

#[async_trait]
impl ModelSessionService for EchoSessions {
    async fn create_session(&self, config: &SessionConfig) -> Result<Session, CollaboratorError> {
        Ok(Session {
            id: "session-1".to_string(),
            model: config.model.clone().unwrap_or_else(|| "default".to_string()),
            created_at: chrono::Utc::now(),
        })
    }

    async fn process_context(
        &self,
        _session: &Session,
        prompt: &str,
    ) -> Result<ModelResponse, CollaboratorError> {
        Ok(ModelResponse {
            content: prompt.to_uppercase(),
            input_tokens: Some(1),
            output_tokens: Some(1),
        })
    }
}

fn engine() -> (Arc<HookEngine>, Arc<RecordingParser>) {
    let parser = Arc::new(RecordingParser::default());
    let engine = HookEngine::with_collaborators(
        Collaborators::new()
            .with_parser(parser.clone())
            .with_sessions(Arc::new(EchoSessions)),
    );
    (Arc::new(engine), parser)
}

fn recorder(name: &'static str, order: &Arc<Mutex<Vec<String>>>) -> impl HookHandler + 'static {
    let order = order.clone();
    CallbackHandler::new(name, move |_ctx: &HookContext| {
        order.lock().push(name.to_string());
        Ok(json!({"ok": true}))
    })
}

#[tokio::test]
async fn hooks_run_in_priority_order_regardless_of_registration() {
    let (engine, _) = engine();
    let order = Arc::new(Mutex::new(Vec::new()));

    for (name, priority) in [("p3", 30), ("p1", 10), ("p2", 20)] {
        engine
            .register_hook(
                name,
                recorder(name, &order),
                HookConfig::before(OperationKind::Parse).with_priority(priority),
            )
            .unwrap();
    }

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(result.success);
    assert_eq!(order.lock().as_slice(), &["p1", "p2", "p3"]);
}

#[tokio::test]
async fn missing_dependency_is_skipped_and_never_invoked() {
    let (engine, _) = engine();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    engine
        .register_hook(
            "dependent",
            CallbackHandler::new("dependent", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(true))
            }),
            HookConfig::before(OperationKind::Parse).depends_on("X"),
        )
        .unwrap();

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let record = result.hook("dependent").unwrap();
    assert_eq!(record.status(), HookStatus::Skipped);
    assert_eq!(record.skip_reason(), Some(SkipReason::DependenciesNotMet));
}

#[tokio::test]
async fn file_condition_gates_on_path_substring() {
    let (engine, _) = engine();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    engine
        .register_hook(
            "specific",
            CallbackHandler::new("specific", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(true))
            }),
            HookConfig::before(OperationKind::Parse)
                .with_condition(Condition::file_exists("specific-file.js")),
        )
        .unwrap();

    let skipped = engine.execute_pipeline(Operation::parse("/src/other.js")).await;
    assert_eq!(
        skipped.hook("specific").unwrap().skip_reason(),
        Some(SkipReason::ConditionsNotMet)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let ran = engine
        .execute_pipeline(Operation::parse("/src/specific-file.js"))
        .await;
    assert_eq!(ran.hook("specific").unwrap().status(), HookStatus::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn side_channel_conditions_follow_the_main_operation() {
    let (engine, _) = engine();

    engine
        .register_hook(
            "pre-ast",
            NoOpHandler::new("pre-ast"),
            HookConfig::before(OperationKind::Parse).with_condition(Condition::HasAstData),
        )
        .unwrap();
    engine
        .register_hook(
            "post-ast",
            NoOpHandler::new("post-ast"),
            HookConfig::after(OperationKind::Parse).with_condition(Condition::HasAstData),
        )
        .unwrap();
    engine
        .register_hook(
            "post-session",
            NoOpHandler::new("post-session"),
            HookConfig::after(OperationKind::ModelSession)
                .with_condition(Condition::HasModelSession),
        )
        .unwrap();

    let parse = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert_eq!(
        parse.hook("pre-ast").unwrap().skip_reason(),
        Some(SkipReason::ConditionsNotMet)
    );
    assert_eq!(parse.hook("post-ast").unwrap().status(), HookStatus::Success);
    assert!(parse.hook("post-session").is_none());

    let session = engine
        .execute_pipeline(Operation::model_session(
            SessionConfig::default(),
            Some("hello".to_string()),
        ))
        .await;
    assert_eq!(
        session.hook("post-session").unwrap().status(),
        HookStatus::Success
    );
    match session.output {
        Some(OperationOutput::ModelSession { response, .. }) => {
            assert_eq!(response.unwrap().content, "HELLO");
        }
        other => panic!("unexpected output {:?}", other),
    }
}

#[tokio::test]
async fn required_pre_hook_failure_aborts_before_main_operation() {
    let (engine, parser) = engine();

    engine
        .register_hook(
            "C",
            CallbackHandler::new("C", |_| Err(HookError::failed("boom"))),
            HookConfig::before(OperationKind::Parse),
        )
        .unwrap();
    engine
        .register_hook(
            "post",
            NoOpHandler::new("post"),
            HookConfig::after(OperationKind::Parse),
        )
        .unwrap();

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("boom"));
    assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
    assert!(result.output.is_none());
    assert_eq!(result.hooks.len(), 1);
    assert_eq!(result.hook("C").unwrap().status(), HookStatus::Error);

    let stats = engine.statistics();
    assert_eq!(stats.failed_executions, 1);
    assert_eq!(stats.hook("C").unwrap().failures, 1);
}

#[tokio::test]
async fn required_post_hook_failure_keeps_partial_state() {
    let (engine, parser) = engine();

    engine
        .register_hook(
            "pre",
            CallbackHandler::new("pre", |_| Ok(json!({"checked": true}))),
            HookConfig::before(OperationKind::Parse),
        )
        .unwrap();
    engine
        .register_hook(
            "post",
            CallbackHandler::new("post", |_| Err(HookError::failed("audit rejected"))),
            HookConfig::after(OperationKind::Parse),
        )
        .unwrap();

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(!result.success);
    assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.results["pre"], json!({"checked": true}));
    assert!(matches!(result.output, Some(OperationOutput::Parse { .. })));
    assert_eq!(result.hooks.len(), 2);
}

#[tokio::test]
async fn optional_failure_does_not_stop_later_hooks() {
    let (engine, _) = engine();
    let order = Arc::new(Mutex::new(Vec::new()));

    engine
        .register_hook(
            "flaky",
            CallbackHandler::new("flaky", |_| Err(HookError::failed("network down"))),
            HookConfig::before(OperationKind::Parse)
                .with_priority(1)
                .optional(),
        )
        .unwrap();
    engine
        .register_hook(
            "next",
            recorder("next", &order),
            HookConfig::before(OperationKind::Parse).with_priority(2),
        )
        .unwrap();
    engine
        .register_hook(
            "post",
            recorder("post", &order),
            HookConfig::after(OperationKind::Parse),
        )
        .unwrap();

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(result.success);
    assert_eq!(order.lock().as_slice(), &["next", "post"]);
    assert_eq!(result.hook("flaky").unwrap().status(), HookStatus::Error);
    assert!(!result.results.contains_key("flaky"));
}

#[tokio::test]
async fn optional_timeout_is_an_error_record_on_a_successful_run() {
    let (engine, _) = engine();

    engine
        .register_hook(
            "hang",
            FnHandler::new("hang", |_ctx| async {
                std::future::pending::<()>().await;
                Ok(json!(null))
            }),
            HookConfig::before(OperationKind::Parse)
                .with_timeout_ms(30)
                .optional(),
        )
        .unwrap();

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(result.success);

    let record = result.hook("hang").unwrap();
    assert_eq!(record.status(), HookStatus::Error);
    assert!(record.error_message().unwrap().contains("timeout"));
}

#[tokio::test]
async fn required_timeout_fails_the_run() {
    let (engine, parser) = engine();

    engine
        .register_hook(
            "slow",
            FnHandler::new("slow", |_ctx| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!(true))
            }),
            HookConfig::before(OperationKind::Parse).with_timeout_ms(20),
        )
        .unwrap();

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("Hook slow timeout"));
    assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn optional_panicking_hook_is_recorded_as_error() {
    let (engine, parser) = engine();
    let order = Arc::new(Mutex::new(Vec::new()));

    engine
        .register_hook(
            "crash",
            FnHandler::new("crash", |_ctx| async {
                let empty: Vec<u32> = Vec::new();
                Ok(json!(empty[3]))
            }),
            HookConfig::before(OperationKind::Parse)
                .with_priority(1)
                .optional(),
        )
        .unwrap();
    engine
        .register_hook(
            "after-crash",
            recorder("after-crash", &order),
            HookConfig::before(OperationKind::Parse).with_priority(2),
        )
        .unwrap();

    let handle = tokio::spawn({
        let engine = engine.clone();
        async move { engine.execute_pipeline(Operation::parse("/f.js")).await }
    });
    let result = handle.await.unwrap();

    assert!(result.success);
    let record = result.hook("crash").unwrap();
    assert_eq!(record.status(), HookStatus::Error);
    assert!(record.error_message().unwrap().contains("panicked"));
    assert_eq!(order.lock().as_slice(), &["after-crash"]);
    assert_eq!(parser.calls.load(Ordering::SeqCst), 1);

    let stats = engine.statistics();
    assert_eq!(stats.successful_executions, 1);
    assert_eq!(stats.in_flight(), 0);
    assert_eq!(stats.hook("crash").unwrap().failures, 1);
}

#[tokio::test]
async fn required_panicking_hook_fails_the_run() {
    let (engine, parser) = engine();

    engine
        .register_hook(
            "crash",
            CallbackHandler::new("crash", |_ctx: &HookContext| {
                if true {
                    panic!("handler bug");
                }
                Ok(json!(null))
            }),
            HookConfig::before(OperationKind::Parse),
        )
        .unwrap();

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Hook crash panicked"));
    assert_eq!(parser.calls.load(Ordering::SeqCst), 0);

    let stats = engine.statistics();
    assert_eq!(stats.failed_executions, 1);
    assert_eq!(stats.in_flight(), 0);
    assert!(engine.active_executions().is_empty());
}

#[tokio::test]
async fn blocking_callback_is_bounded_by_timeout() {
    let (engine, _) = engine();

    engine
        .register_hook(
            "blocking",
            CallbackHandler::new("blocking", |_ctx| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(json!(true))
            }),
            HookConfig::before(OperationKind::Parse)
                .with_timeout_ms(20)
                .optional(),
        )
        .unwrap();

    let started = std::time::Instant::now();
    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;

    assert!(result.success);
    assert!(started.elapsed() < Duration::from_millis(400));
    let record = result.hook("blocking").unwrap();
    assert_eq!(record.status(), HookStatus::Error);
    assert!(record.error_message().unwrap().contains("timeout"));
}

#[tokio::test]
async fn results_are_visible_to_every_later_hook() {
    let (engine, _) = engine();
    let seen = Arc::new(Mutex::new(Vec::new()));

    engine
        .register_hook(
            "producer",
            CallbackHandler::new("producer", |_| Ok(json!({"token": 42}))),
            HookConfig::before(OperationKind::Parse).with_priority(1),
        )
        .unwrap();

    for (name, config) in [
        ("pre-reader", HookConfig::before(OperationKind::Parse).with_priority(2)),
        ("post-reader", HookConfig::after(OperationKind::Parse)),
    ] {
        let seen = seen.clone();
        engine
            .register_hook(
                name,
                CallbackHandler::new(name, move |ctx| {
                    seen.lock().push((
                        ctx.hook_name.clone(),
                        ctx.result("producer").cloned(),
                        ctx.previous_result.clone(),
                    ));
                    Ok(json!(true))
                }),
                config.depends_on("producer"),
            )
            .unwrap();
    }

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(result.success);

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    for (_, produced, _) in seen.iter() {
        assert_eq!(produced.as_ref(), Some(&json!({"token": 42})));
    }
    // Pre-phase hooks see the previous hook's value; the first post-phase
    // hook sees the main operation's result.
    assert_eq!(seen[0].2, Some(json!({"token": 42})));
    assert_eq!(seen[1].2.as_ref().unwrap()["kind"], "parse");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_are_isolated() {
    let (engine, parser) = engine();

    engine
        .register_hook(
            "echo",
            CallbackHandler::new("echo", |ctx| {
                Ok(json!({ "execution": ctx.execution_id.to_string() }))
            }),
            HookConfig::before(OperationKind::Parse),
        )
        .unwrap();
    engine
        .register_hook(
            "pause",
            FnHandler::new("pause", |_ctx| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(json!(true))
            }),
            HookConfig::after(OperationKind::Parse),
        )
        .unwrap();

    let before = engine.statistics().total_executions;

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .execute_pipeline(Operation::parse(format!("/file-{}.js", i)))
                    .await
            })
        })
        .collect();

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.success);
        assert_eq!(
            result.results["echo"]["execution"],
            json!(result.execution_id.to_string())
        );
        assert!(ids.insert(result.execution_id));
    }

    let stats = engine.statistics();
    assert_eq!(stats.total_executions - before, 5);
    assert_eq!(stats.successful_executions, 5);
    assert_eq!(stats.hook("echo").unwrap().executions, 5);
    assert_eq!(parser.calls.load(Ordering::SeqCst), 5);
    assert!(engine.active_executions().is_empty());
}

#[tokio::test]
async fn scenario_pre_and_post_hooks_around_parse() {
    let (engine, _) = engine();

    engine
        .register_hook(
            "A",
            CallbackHandler::new("A", |_| Ok(json!({"ok": true}))),
            HookConfig::before(OperationKind::Parse).with_priority(10),
        )
        .unwrap();
    engine
        .register_hook(
            "B",
            CallbackHandler::new("B", |_| Ok(json!({"ok": true}))),
            HookConfig::after(OperationKind::Parse).with_priority(5),
        )
        .unwrap();

    let request =
        PipelineRequest::from_json(r#"{"operation": "parse", "file_path": "/f.js"}"#).unwrap();
    let result = engine.execute_pipeline(request).await;

    assert!(result.success);
    assert_eq!(result.hooks.len(), 2);
    assert_eq!(result.hooks[0].hook_name, "A");
    assert_eq!(result.hooks[0].phase, Phase::Pre);
    assert_eq!(result.hooks[0].status(), HookStatus::Success);
    assert_eq!(result.hooks[1].hook_name, "B");
    assert_eq!(result.hooks[1].phase, Phase::Post);
    assert_eq!(result.records_for(Phase::Post).count(), 1);
}

#[tokio::test]
async fn events_follow_the_pipeline_lifecycle() {
    let (engine, _) = engine();
    engine
        .register_hook(
            "pre",
            NoOpHandler::new("pre"),
            HookConfig::before(OperationKind::Parse),
        )
        .unwrap();
    engine
        .register_hook(
            "gated",
            NoOpHandler::new("gated"),
            HookConfig::after(OperationKind::Parse).depends_on("missing"),
        )
        .unwrap();

    let mut rx = engine.subscribe();
    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.execution_id(), Some(result.execution_id));
        names.push(event.name());
    }
    assert_eq!(
        names,
        vec![
            "pipeline_started",
            "hook_started",
            "hook_completed",
            "operation_started",
            "operation_completed",
            "hook_skipped",
            "pipeline_completed",
        ]
    );
}

#[tokio::test]
async fn pipeline_error_event_carries_message() {
    let (engine, _) = engine();
    engine
        .register_hook(
            "guard",
            CallbackHandler::new("guard", |_| Err(HookError::failed("denied"))),
            HookConfig::default(),
        )
        .unwrap();

    let mut rx = engine.subscribe();
    engine.execute_pipeline(Operation::parse("/f.js")).await;

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    match last {
        Some(EngineEvent::PipelineError { error, .. }) => assert!(error.contains("denied")),
        other => panic!("unexpected final event {:?}", other),
    }
}

#[tokio::test]
async fn context_assembly_runs_through_the_parser() {
    let (engine, parser) = engine();
    engine
        .register_hook(
            "only-lib",
            NoOpHandler::new("only-lib"),
            HookConfig::before(OperationKind::ContextAssembly)
                .with_condition(Condition::file_exists("lib.rs")),
        )
        .unwrap();

    let result = engine
        .execute_pipeline(Operation::context_assembly(
            vec![PathBuf::from("/a/lib.rs"), PathBuf::from("/a/main.rs")],
            "summarize",
        ))
        .await;

    assert!(result.success);
    assert_eq!(result.hook("only-lib").unwrap().status(), HookStatus::Success);
    assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
    match result.output {
        Some(OperationOutput::ContextAssembly { context }) => {
            assert_eq!(context.token_estimate, Some(200))
        }
        other => panic!("unexpected output {:?}", other),
    }
}

#[tokio::test]
async fn reset_clears_hooks_and_statistics() {
    let (engine, _) = engine();
    engine
        .register_hook("a", NoOpHandler::new("a"), HookConfig::default())
        .unwrap();
    engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert_eq!(engine.statistics().total_executions, 1);

    engine.reset();

    assert_eq!(engine.hook_count(), 0);
    assert_eq!(engine.statistics().total_executions, 0);
    assert!(engine.statistics().hooks.is_empty());
}

#[tokio::test]
async fn disabled_hooks_are_not_run() {
    let (engine, _) = engine();
    engine
        .register_hook(
            "a",
            NoOpHandler::new("a"),
            HookConfig::before(OperationKind::Parse),
        )
        .unwrap();
    assert!(engine.set_hook_enabled("a", false));

    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert!(result.success);
    assert!(result.hooks.is_empty());

    assert!(engine.set_hook_enabled("a", true));
    let result = engine.execute_pipeline(Operation::parse("/f.js")).await;
    assert_eq!(result.hooks.len(), 1);
}

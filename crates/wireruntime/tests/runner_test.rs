// crates/wireruntime/tests/runner_test.rs

mod common;

use common::*;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use wirecore::{
    EventBus, ExecutionEvent, ExecutionStatus, FnObserver, Graph, GraphError, InMemoryMemory,
    Memory, RunError, RunOutcome, RunSummary, Value,
};
use wireruntime::{FlowRunner, RunPhase, RuntimeConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

type Transitions = Arc<Mutex<Vec<(String, ExecutionStatus)>>>;

/// Observer that records every transition and counts completions
fn recording_observer(
    transitions: &Transitions,
    completions: &Arc<Mutex<Vec<RunSummary>>>,
) -> Arc<dyn wirecore::ExecutionObserver> {
    let transitions = transitions.clone();
    let completions = completions.clone();
    Arc::new(FnObserver::new(
        move |node_id: &str, state: &wirecore::ExecutionState| {
            transitions
                .lock()
                .unwrap()
                .push((node_id.to_string(), state.status));
        },
        move |summary: &RunSummary| completions.lock().unwrap().push(summary.clone()),
    ))
}

#[tokio::test]
async fn test_scrape_scenario_runs_every_node_in_order() {
    init_tracing();
    let journal = journal();
    let graph = scrape_graph(Behavior::Emit(vec![("posts", posts())]), &journal);
    let runner = FlowRunner::new(graph);

    let report = runner.run().await.unwrap();

    assert_eq!(report.order, vec!["start", "fetch", "filter", "log"]);
    assert_eq!(invoked(&journal), vec!["start", "fetch", "filter", "log"]);
    assert!(report.is_success());
    for id in ["start", "fetch", "filter", "log"] {
        assert_eq!(report.status(id), Some(ExecutionStatus::Success), "{}", id);
    }

    assert_eq!(inputs_of(&journal, "filter").get("posts"), Some(&posts()));
    assert_eq!(inputs_of(&journal, "log").get("message"), Some(&posts()));
    // Exec edges carry no values
    assert!(inputs_of(&journal, "fetch").is_empty());

    let filter = report.state("filter").unwrap();
    assert_eq!(filter.outputs.get("output"), Some(&posts()));
    assert!(filter.started_at.unwrap() <= filter.ended_at.unwrap());
    assert_eq!(runner.phase().await, RunPhase::Completed);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_node_failure_halts_the_run() {
    init_tracing();
    let journal = journal();
    let graph = scrape_graph(Behavior::Fail("network error"), &journal);
    let runner = FlowRunner::new(graph);

    // run() resolves even though a node failed
    let report = runner.run().await.unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::Halted {
            node_id: "fetch".to_string()
        }
    );
    assert_eq!(report.failed_node(), Some("fetch"));
    assert_eq!(report.status("start"), Some(ExecutionStatus::Success));
    assert_eq!(report.status("fetch"), Some(ExecutionStatus::Error));
    assert_eq!(
        report.state("fetch").unwrap().error.as_deref(),
        Some("network error")
    );
    assert_eq!(report.status("filter"), Some(ExecutionStatus::Pending));
    assert_eq!(report.status("log"), Some(ExecutionStatus::Pending));
    assert_eq!(invoked(&journal), vec!["start", "fetch"]);

    let log = runner.state("log").await.unwrap();
    assert!(log.started_at.is_none());
    assert_eq!(runner.phase().await, RunPhase::Completed);
}

#[tokio::test]
async fn test_cycle_aborts_before_any_node_runs() {
    let journal = journal();
    let mut graph = Graph::new();
    graph.add_node("a", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph.add_node("b", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph.add_node("c", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph.connect("a", "out", "b", "in").unwrap();
    graph.connect("b", "exec", "c", "exec").unwrap();
    graph.connect("c", "out", "a", "in").unwrap();

    let transitions: Transitions = Arc::new(Mutex::new(Vec::new()));
    let completions = Arc::new(Mutex::new(Vec::new()));
    let runner =
        FlowRunner::new(graph).with_observer(recording_observer(&transitions, &completions));

    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, RunError::CycleDetected { .. }));
    assert!(invoked(&journal).is_empty());
    assert_eq!(runner.phase().await, RunPhase::Aborted);

    for (_, state) in runner.states().await {
        assert_eq!(state.status, ExecutionStatus::Pending);
    }
    assert!(transitions
        .lock()
        .unwrap()
        .iter()
        .all(|(_, status)| *status == ExecutionStatus::Pending));

    let completions = completions.lock().unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].executed, 0);
    assert!(matches!(completions[0].outcome, RunOutcome::Aborted { .. }));
}

#[tokio::test]
async fn test_data_edge_delivers_named_output() {
    let journal = journal();
    let mut graph = Graph::new();
    graph
        .add_node("a", general(Behavior::Emit(vec![("x", Value::from(42.0))]), &journal))
        .unwrap();
    graph.add_node("b", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph.connect("a", "x", "b", "in").unwrap();

    let report = FlowRunner::new(graph).run().await.unwrap();

    assert!(report.is_success());
    assert_eq!(inputs_of(&journal, "b").get("in"), Some(&Value::Number(42.0)));
    assert_eq!(
        report.state("b").unwrap().inputs.get("in"),
        Some(&Value::Number(42.0))
    );
}

#[tokio::test]
async fn test_missing_upstream_output_yields_no_input() {
    let journal = journal();
    let mut graph = Graph::new();
    // "a" succeeds but never writes "out"
    graph.add_node("a", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph
        .add_node("b", general(Behavior::Map { from: "in", to: "out" }, &journal))
        .unwrap();
    graph.connect("a", "out", "b", "in").unwrap();

    let report = FlowRunner::new(graph).run().await.unwrap();

    assert!(report.is_success());
    assert!(inputs_of(&journal, "b").is_empty());
    assert!(report.state("b").unwrap().outputs.is_empty());
}

#[tokio::test]
async fn test_multiple_input_collects_values_in_edge_order() {
    let journal = journal();
    let mut graph = Graph::new();
    graph.add_node("sink", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph
        .add_node("one", general(Behavior::Emit(vec![("out", Value::from(1.0))]), &journal))
        .unwrap();
    graph
        .add_node("two", general(Behavior::Emit(vec![("out", Value::from(2.0))]), &journal))
        .unwrap();
    graph.connect("two", "out", "sink", "many").unwrap();
    graph.connect("one", "out", "sink", "many").unwrap();

    FlowRunner::new(graph).run().await.unwrap();

    assert_eq!(invoked(&journal), vec!["one", "two", "sink"]);
    assert_eq!(
        inputs_of(&journal, "sink").get("many"),
        Some(&Value::Array(vec![Value::from(2.0), Value::from(1.0)]))
    );
}

#[tokio::test]
async fn test_isolated_nodes_run_in_insertion_order() {
    let journal = journal();
    let mut graph = Graph::new();
    for id in ["c", "a", "b"] {
        graph.add_node(id, general(Behavior::Emit(vec![]), &journal)).unwrap();
    }

    let report = FlowRunner::new(graph).run().await.unwrap();
    assert_eq!(report.order, vec!["c", "a", "b"]);
    assert_eq!(invoked(&journal), vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_reentrant_run_is_rejected() {
    init_tracing();
    let journal = journal();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let mut graph = Graph::new();
    graph
        .add_node(
            "gate",
            general(
                Behavior::Gate {
                    started: started.clone(),
                    release: release.clone(),
                },
                &journal,
            ),
        )
        .unwrap();
    graph.add_node("after", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph.connect("gate", "exec", "after", "exec").unwrap();

    let runner = Arc::new(FlowRunner::new(graph));
    let first = tokio::spawn({
        let runner = runner.clone();
        async move { runner.run().await }
    });

    started.notified().await;
    assert!(runner.is_running());
    assert_eq!(runner.phase().await, RunPhase::Executing);
    assert_eq!(
        runner.state("gate").await.unwrap().status,
        ExecutionStatus::Running
    );

    assert_eq!(runner.run().await.unwrap_err(), RunError::AlreadyRunning);
    assert_eq!(
        runner.state("gate").await.unwrap().status,
        ExecutionStatus::Running
    );

    release.notify_one();
    let report = first.await.unwrap().unwrap();
    assert!(report.is_success());
    assert_eq!(invoked(&journal), vec!["gate", "after"]);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_graph_is_locked_while_running() {
    let journal = journal();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let mut graph = Graph::new();
    graph
        .add_node(
            "gate",
            general(
                Behavior::Gate {
                    started: started.clone(),
                    release: release.clone(),
                },
                &journal,
            ),
        )
        .unwrap();

    let runner = Arc::new(FlowRunner::new(graph));
    let handle = tokio::spawn({
        let runner = runner.clone();
        async move { runner.run().await }
    });
    started.notified().await;

    let err = runner
        .add_node("late", general(Behavior::Emit(vec![]), &journal))
        .await
        .unwrap_err();
    assert_eq!(err, GraphError::RunInProgress);
    assert_eq!(runner.remove_node("gate").await.unwrap_err(), GraphError::RunInProgress);

    release.notify_one();
    handle.await.unwrap().unwrap();

    runner
        .add_node("late", general(Behavior::Emit(vec![]), &journal))
        .await
        .unwrap();
    runner.connect("gate", "exec", "late", "exec").await.unwrap();
    assert_eq!(runner.graph().await.len(), 2);
}

#[tokio::test]
async fn test_stop_halts_before_next_node() {
    let journal = journal();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let mut graph = Graph::new();
    graph
        .add_node(
            "gate",
            general(
                Behavior::Gate {
                    started: started.clone(),
                    release: release.clone(),
                },
                &journal,
            ),
        )
        .unwrap();
    graph.add_node("next", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph.connect("gate", "exec", "next", "exec").unwrap();

    let runner = Arc::new(FlowRunner::new(graph));
    let handle = tokio::spawn({
        let runner = runner.clone();
        async move { runner.run().await }
    });
    started.notified().await;

    runner.stop().await;
    release.notify_one();
    let report = handle.await.unwrap().unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::Stopped {
            before: "next".to_string()
        }
    );
    assert_eq!(report.status("gate"), Some(ExecutionStatus::Success));
    assert_eq!(report.status("next"), Some(ExecutionStatus::Pending));
    assert_eq!(invoked(&journal), vec!["gate"]);

    // The stop request does not leak into the next run
    release.notify_one();
    let report = runner.run().await.unwrap();
    assert!(report.is_success());
}

#[tokio::test]
async fn test_stop_cancels_node_watching_its_token() {
    let journal = journal();
    let started = Arc::new(Notify::new());

    let mut graph = Graph::new();
    graph
        .add_node(
            "wait",
            general(
                Behavior::AwaitCancel {
                    started: started.clone(),
                },
                &journal,
            ),
        )
        .unwrap();
    graph.add_node("next", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph.connect("wait", "exec", "next", "exec").unwrap();

    let transitions: Transitions = Arc::new(Mutex::new(Vec::new()));
    let completions = Arc::new(Mutex::new(Vec::new()));
    let runner = Arc::new(
        FlowRunner::new(graph).with_observer(recording_observer(&transitions, &completions)),
    );
    let handle = tokio::spawn({
        let runner = runner.clone();
        async move { runner.run().await }
    });
    started.notified().await;

    runner.stop().await;
    let report = handle.await.unwrap().unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::Stopped {
            before: "next".to_string()
        }
    );
    assert_eq!(report.failed_node(), None);
    assert!(!report.is_success());
    assert_eq!(report.status("next"), Some(ExecutionStatus::Pending));
    assert_eq!(invoked(&journal), vec!["wait"]);
    assert_eq!(runner.phase().await, RunPhase::Completed);

    let completions = completions.lock().unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].outcome, report.outcome);
}

#[tokio::test]
async fn test_cancelled_last_node_is_the_resume_point() {
    let journal = journal();
    let started = Arc::new(Notify::new());

    let mut graph = Graph::new();
    graph.add_node("first", general(Behavior::Emit(vec![]), &journal)).unwrap();
    graph
        .add_node(
            "wait",
            general(
                Behavior::AwaitCancel {
                    started: started.clone(),
                },
                &journal,
            ),
        )
        .unwrap();
    graph.connect("first", "exec", "wait", "exec").unwrap();

    let runner = Arc::new(FlowRunner::new(graph));
    let handle = tokio::spawn({
        let runner = runner.clone();
        async move { runner.run().await }
    });
    started.notified().await;
    runner.stop().await;
    let report = handle.await.unwrap().unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::Stopped {
            before: "wait".to_string()
        }
    );
    assert_eq!(report.status("first"), Some(ExecutionStatus::Success));
}

#[tokio::test]
async fn test_cancelled_without_stop_is_a_failure() {
    let journal = journal();
    let mut graph = Graph::new();
    graph
        .add_node(
            "bail",
            Arc::new(CancelledNode {
                journal: journal.clone(),
            }),
        )
        .unwrap();

    let report = FlowRunner::new(graph).run().await.unwrap();
    assert_eq!(
        report.outcome,
        RunOutcome::Halted {
            node_id: "bail".to_string()
        }
    );
    assert_eq!(report.failed_node(), Some("bail"));
}

/// Returns `Cancelled` on its own, without any stop request
struct CancelledNode {
    journal: Journal,
}

#[async_trait::async_trait]
impl wirecore::Node for CancelledNode {
    fn node_type(&self) -> &str {
        "test.cancelled"
    }

    async fn execute(
        &self,
        ctx: wirecore::NodeContext,
    ) -> Result<wirecore::NodeOutput, wirecore::NodeError> {
        self.journal.lock().unwrap().push((ctx.node_id, ctx.inputs));
        Err(wirecore::NodeError::Cancelled)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_never_break_a_run() {
    for _ in 0..200 {
        let journal = journal();
        let mut graph = Graph::new();
        graph.add_node("a", general(Behavior::Emit(vec![]), &journal)).unwrap();
        graph.add_node("b", general(Behavior::Emit(vec![]), &journal)).unwrap();
        graph.connect("a", "exec", "b", "exec").unwrap();
        let runner = Arc::new(FlowRunner::new(graph));

        let run = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run().await }
        });
        let edit = tokio::spawn({
            let runner = runner.clone();
            async move {
                let removed = runner.remove_node("b").await;
                let replaced = runner.replace_graph(Graph::new()).await;
                (removed, replaced)
            }
        });

        let report = run.await.unwrap().unwrap();
        let (removed, replaced) = edit.await.unwrap();

        assert!(report.is_success(), "{:?}", report.outcome);
        assert_eq!(runner.phase().await, RunPhase::Completed);
        for (id, state) in &report.states {
            assert_eq!(state.status, ExecutionStatus::Success, "{}", id);
        }
        for result in [removed.map(|_| ()), replaced] {
            assert!(matches!(result, Ok(()) | Err(GraphError::RunInProgress)));
        }
    }
}

#[tokio::test]
async fn test_repeated_runs_are_deterministic() {
    let journal = journal();
    let mut graph = Graph::new();
    for id in ["e", "d", "c", "b", "a"] {
        graph
            .add_node(id, general(Behavior::Emit(vec![("out", Value::from(id))]), &journal))
            .unwrap();
    }
    graph.connect("a", "out", "b", "many").unwrap();
    graph.connect("a", "exec", "c", "exec").unwrap();
    graph.connect("b", "out", "d", "many").unwrap();
    graph.connect("c", "out", "d", "many").unwrap();
    graph.connect("d", "exec", "e", "exec").unwrap();

    let transitions: Transitions = Arc::new(Mutex::new(Vec::new()));
    let completions = Arc::new(Mutex::new(Vec::new()));
    let runner =
        FlowRunner::new(graph).with_observer(recording_observer(&transitions, &completions));

    let first = runner.run().await.unwrap();
    let first_transitions = std::mem::take(&mut *transitions.lock().unwrap());
    let first_invoked = invoked(&journal);
    journal.lock().unwrap().clear();

    let second = runner.run().await.unwrap();
    let second_transitions = transitions.lock().unwrap().clone();

    assert_eq!(first.order, second.order);
    assert_eq!(first_invoked, invoked(&journal));
    assert_eq!(first_transitions, second_transitions);
    // 5 resets + 2 transitions per node
    assert_eq!(first_transitions.len(), 15);
    assert_eq!(completions.lock().unwrap().len(), 2);

    for edge in runner.graph().await.edges() {
        let pos = |id: &str| first.order.iter().position(|n| n == id).unwrap();
        assert!(pos(&edge.source) < pos(&edge.target));
    }
}

#[tokio::test]
async fn test_node_logs_are_recorded() {
    let journal = journal();
    let mut graph = Graph::new();
    graph
        .add_node("chatty", general(Behavior::Log(vec!["one", "two", "three"]), &journal))
        .unwrap();

    let report = FlowRunner::new(graph.clone()).run().await.unwrap();
    let logs = &report.state("chatty").unwrap().logs;
    let messages: Vec<&str> = logs.iter().map(|l| l.message.as_str()).collect();
    assert_eq!(messages, vec!["one", "two", "three"]);

    let capped = FlowRunner::new(graph.clone()).with_config(RuntimeConfig {
        max_log_entries: 2,
        ..RuntimeConfig::default()
    });
    let report = capped.run().await.unwrap();
    assert_eq!(report.state("chatty").unwrap().logs.len(), 2);

    let mut flood = Graph::new();
    flood
        .add_node("flood", general(Behavior::Log(vec!["spam"; 10_000]), &journal))
        .unwrap();
    let report = FlowRunner::new(flood)
        .with_config(RuntimeConfig {
            max_log_entries: 5,
            ..RuntimeConfig::default()
        })
        .run()
        .await
        .unwrap();
    assert_eq!(report.state("flood").unwrap().logs.len(), 5);

    let silent = FlowRunner::new(graph).with_config(RuntimeConfig {
        capture_node_logs: false,
        ..RuntimeConfig::default()
    });
    let report = silent.run().await.unwrap();
    assert!(report.state("chatty").unwrap().logs.is_empty());
}

#[tokio::test]
async fn test_memory_survives_across_runs() {
    let journal = journal();
    let memory = Arc::new(InMemoryMemory::new());
    let mut graph = Graph::new();
    graph.add_node("counter", general(Behavior::Count("visits"), &journal)).unwrap();

    let runner = FlowRunner::new(graph).with_memory(memory.clone());
    runner.run().await.unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(
        report.state("counter").unwrap().outputs.get("count"),
        Some(&Value::Number(2.0))
    );
    assert_eq!(memory.get("visits").await.unwrap(), Some(Value::Number(2.0)));
}

#[tokio::test]
async fn test_remove_node_clears_its_state() {
    let journal = journal();
    let graph = scrape_graph(Behavior::Emit(vec![("posts", posts())]), &journal);
    let runner = FlowRunner::new(graph);
    runner.run().await.unwrap();
    assert!(runner.state("filter").await.is_some());

    let removed = runner.remove_node("filter").await.unwrap();
    assert_eq!(removed.len(), 2);
    assert!(runner.state("filter").await.is_none());
    assert_eq!(runner.states().await.len(), 3);

    journal.lock().unwrap().clear();
    let report = runner.run().await.unwrap();
    assert_eq!(report.order, vec!["start", "fetch", "log"]);
    assert!(inputs_of(&journal, "log").is_empty());
}

#[tokio::test]
async fn test_replace_graph_drops_previous_states() {
    let journal = journal();
    let graph = scrape_graph(Behavior::Emit(vec![("posts", posts())]), &journal);
    let runner = FlowRunner::new(graph);
    runner.run().await.unwrap();
    assert_eq!(runner.states().await.len(), 4);

    let mut replacement = Graph::new();
    replacement
        .add_node("only", general(Behavior::Emit(vec![]), &journal))
        .unwrap();
    runner.replace_graph(replacement).await.unwrap();
    assert!(runner.states().await.is_empty());

    let report = runner.run().await.unwrap();
    assert_eq!(report.order, vec!["only"]);
    assert!(runner.state("fetch").await.is_none());
}

#[tokio::test]
async fn test_event_bus_publishes_run_lifecycle() {
    let journal = journal();
    let graph = scrape_graph(Behavior::Fail("network error"), &journal);
    let bus = Arc::new(EventBus::new(64));
    let mut events = bus.subscribe();

    let runner = FlowRunner::new(graph).with_observer(bus.clone());
    runner.run().await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert!(matches!(received.first(), Some(ExecutionEvent::RunStarted { .. })));
    match received.last() {
        Some(ExecutionEvent::RunCompleted {
            outcome, executed, ..
        }) => {
            assert_eq!(
                *outcome,
                RunOutcome::Halted {
                    node_id: "fetch".to_string()
                }
            );
            assert_eq!(*executed, 2);
        }
        other => panic!("expected RunCompleted, got {:?}", other),
    }
    let failure = received.iter().find_map(|event| match event {
        ExecutionEvent::NodeStateChanged {
            node_id,
            status: ExecutionStatus::Error,
            error,
            ..
        } => Some((node_id.clone(), error.clone())),
        _ => None,
    });
    assert_eq!(
        failure,
        Some(("fetch".to_string(), Some("network error".to_string())))
    );
}

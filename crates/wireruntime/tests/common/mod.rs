// Shared stub nodes for runtime tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use wirecore::{
    Graph, Node, NodeContext, NodeError, NodeId, NodeOutput, PortSpec, Value,
};

/// Every invocation, in order: node id and the inputs it received
pub type Journal = Arc<Mutex<Vec<(NodeId, HashMap<String, Value>)>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn invoked(journal: &Journal) -> Vec<NodeId> {
    journal.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
}

pub fn inputs_of(journal: &Journal, node_id: &str) -> HashMap<String, Value> {
    journal
        .lock()
        .unwrap()
        .iter()
        .find(|(id, _)| id == node_id)
        .map(|(_, inputs)| inputs.clone())
        .unwrap_or_else(|| panic!("{} was never invoked", node_id))
}

pub enum Behavior {
    /// Succeed with these outputs
    Emit(Vec<(&'static str, Value)>),
    /// Succeed, copying input `from` to output `to` when present
    Map { from: &'static str, to: &'static str },
    /// Fail with this message
    Fail(&'static str),
    /// Signal `started`, then wait for `release`
    Gate {
        started: Arc<Notify>,
        release: Arc<Notify>,
    },
    /// Signal `started`, then wait for the run's cancellation token
    AwaitCancel { started: Arc<Notify> },
    /// Write log lines through the context logger
    Log(Vec<&'static str>),
    /// Increment the memory counter under this key
    Count(&'static str),
}

pub struct StubNode {
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
    pub behavior: Behavior,
    pub journal: Journal,
}

#[async_trait]
impl Node for StubNode {
    fn node_type(&self) -> &str {
        "test.stub"
    }

    fn inputs(&self) -> Vec<PortSpec> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<PortSpec> {
        self.outputs.clone()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        self.journal
            .lock()
            .unwrap()
            .push((ctx.node_id.clone(), ctx.inputs.clone()));

        match &self.behavior {
            Behavior::Emit(values) => Ok(values
                .iter()
                .fold(NodeOutput::new(), |out, (port, value)| {
                    out.with_output(*port, value.clone())
                })),
            Behavior::Map { from, to } => {
                let mut out = NodeOutput::new();
                if let Some(value) = ctx.input(from) {
                    out = out.with_output(*to, value.clone());
                }
                Ok(out)
            }
            Behavior::Fail(message) => Err(NodeError::ExecutionFailed(message.to_string())),
            Behavior::Gate { started, release } => {
                started.notify_one();
                release.notified().await;
                Ok(NodeOutput::new())
            }
            Behavior::AwaitCancel { started } => {
                started.notify_one();
                ctx.cancellation.cancelled().await;
                Err(NodeError::Cancelled)
            }
            Behavior::Log(lines) => {
                for line in lines {
                    ctx.log.info(*line);
                }
                Ok(NodeOutput::new())
            }
            Behavior::Count(key) => {
                let current = ctx
                    .memory
                    .get(key)
                    .await?
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0);
                ctx.memory.set(key, Value::from(current + 1.0)).await?;
                Ok(NodeOutput::new().with_output("count", current + 1.0))
            }
        }
    }
}

/// Ports shared by most test nodes
pub fn general(behavior: Behavior, journal: &Journal) -> Arc<dyn Node> {
    Arc::new(StubNode {
        inputs: vec![
            PortSpec::exec("exec"),
            PortSpec::data("in"),
            PortSpec::data("many").with_multiple(),
        ],
        outputs: vec![
            PortSpec::exec("exec"),
            PortSpec::data("out"),
            PortSpec::data("x"),
        ],
        behavior,
        journal: journal.clone(),
    })
}

/// Start --exec--> Fetch --data(posts)--> Filter --data(output)--> Log
pub fn scrape_graph(fetch: Behavior, journal: &Journal) -> Graph {
    let mut graph = Graph::new();
    graph
        .add_node(
            "start",
            Arc::new(StubNode {
                inputs: vec![],
                outputs: vec![PortSpec::exec("exec")],
                behavior: Behavior::Emit(vec![]),
                journal: journal.clone(),
            }),
        )
        .unwrap();
    graph
        .add_node(
            "fetch",
            Arc::new(StubNode {
                inputs: vec![PortSpec::exec("exec")],
                outputs: vec![PortSpec::exec("exec"), PortSpec::data("posts")],
                behavior: fetch,
                journal: journal.clone(),
            }),
        )
        .unwrap();
    graph
        .add_node(
            "filter",
            Arc::new(StubNode {
                inputs: vec![PortSpec::data("posts")],
                outputs: vec![PortSpec::data("output")],
                behavior: Behavior::Map {
                    from: "posts",
                    to: "output",
                },
                journal: journal.clone(),
            }),
        )
        .unwrap();
    graph
        .add_node(
            "log",
            Arc::new(StubNode {
                inputs: vec![PortSpec::any("message")],
                outputs: vec![],
                behavior: Behavior::Map {
                    from: "message",
                    to: "message",
                },
                journal: journal.clone(),
            }),
        )
        .unwrap();

    graph.connect("start", "exec", "fetch", "exec").unwrap();
    graph.connect("fetch", "posts", "filter", "posts").unwrap();
    graph.connect("filter", "output", "log", "message").unwrap();
    graph
}

pub fn posts() -> Value {
    Value::Array(vec![
        Value::from("rust 1.80 released"),
        Value::from("weekly news"),
    ])
}

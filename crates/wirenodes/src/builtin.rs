use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wireruntime::{NodeFactory, NodeMetadata, NodeRegistry};
use wirecore::{Node, NodeError, PortSpec};

use crate::control::{DelayConfig, DelayNode, StartConfig, StartNode};
use crate::debug::{LogConfig, LogNode};
use crate::http::{FetchConfig, FetchNode, WebhookConfig, WebhookNode};
use crate::memory::{MemoryGetConfig, MemoryGetNode, MemorySetConfig, MemorySetNode};
use crate::transform::{FilterConfig, FilterNode, SummarizeConfig, SummarizeNode};

/// The closed set of built-in node types with their typed configuration.
///
/// Serialized the way workflow documents store nodes: `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BuiltinNode {
    #[serde(rename = "start")]
    Start(StartConfig),
    #[serde(rename = "http.fetch")]
    Fetch(FetchConfig),
    #[serde(rename = "filter.keyword")]
    Filter(FilterConfig),
    #[serde(rename = "text.summarize")]
    Summarize(SummarizeConfig),
    #[serde(rename = "debug.log")]
    Log(LogConfig),
    #[serde(rename = "time.delay")]
    Delay(DelayConfig),
    #[serde(rename = "memory.get")]
    MemoryGet(MemoryGetConfig),
    #[serde(rename = "memory.set")]
    MemorySet(MemorySetConfig),
    #[serde(rename = "notify.webhook")]
    Webhook(WebhookConfig),
}

impl BuiltinNode {
    /// Parse a node from its type name and raw config. A null config is
    /// treated as an empty object.
    pub fn from_parts(node_type: &str, data: &serde_json::Value) -> Result<Self, NodeError> {
        let data = if data.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            data.clone()
        };
        let tagged = serde_json::json!({ "type": node_type, "data": data });
        serde_json::from_value(tagged)
            .map_err(|e| NodeError::Configuration(format!("{}: {}", node_type, e)))
    }

    pub fn node_type(&self) -> &'static str {
        match self {
            BuiltinNode::Start(_) => "start",
            BuiltinNode::Fetch(_) => "http.fetch",
            BuiltinNode::Filter(_) => "filter.keyword",
            BuiltinNode::Summarize(_) => "text.summarize",
            BuiltinNode::Log(_) => "debug.log",
            BuiltinNode::Delay(_) => "time.delay",
            BuiltinNode::MemoryGet(_) => "memory.get",
            BuiltinNode::MemorySet(_) => "memory.set",
            BuiltinNode::Webhook(_) => "notify.webhook",
        }
    }

    pub fn into_node(self) -> Arc<dyn Node> {
        match self {
            BuiltinNode::Start(config) => Arc::new(StartNode::new(config)),
            BuiltinNode::Fetch(config) => Arc::new(FetchNode::new(config)),
            BuiltinNode::Filter(config) => Arc::new(FilterNode::new(config)),
            BuiltinNode::Summarize(config) => Arc::new(SummarizeNode::new(config)),
            BuiltinNode::Log(config) => Arc::new(LogNode::new(config)),
            BuiltinNode::Delay(config) => Arc::new(DelayNode::new(config)),
            BuiltinNode::MemoryGet(config) => Arc::new(MemoryGetNode::new(config)),
            BuiltinNode::MemorySet(config) => Arc::new(MemorySetNode::new(config)),
            BuiltinNode::Webhook(config) => Arc::new(WebhookNode::new(config)),
        }
    }
}

/// Factory for one built-in node type
#[derive(Clone, Copy)]
pub struct BuiltinFactory {
    node_type: &'static str,
    description: &'static str,
    category: &'static str,
    inputs: fn() -> Vec<PortSpec>,
    outputs: fn() -> Vec<PortSpec>,
}

impl NodeFactory for BuiltinFactory {
    fn create(&self, config: &serde_json::Value) -> Result<Arc<dyn Node>, NodeError> {
        BuiltinNode::from_parts(self.node_type, config).map(BuiltinNode::into_node)
    }

    fn node_type(&self) -> &str {
        self.node_type
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: self.description.to_string(),
            category: self.category.to_string(),
            inputs: (self.inputs)(),
            outputs: (self.outputs)(),
        }
    }
}

const FACTORIES: &[BuiltinFactory] = &[
    BuiltinFactory {
        node_type: "start",
        description: "Entry point that triggers the workflow",
        category: "control",
        inputs: StartNode::input_ports,
        outputs: StartNode::output_ports,
    },
    BuiltinFactory {
        node_type: "http.fetch",
        description: "Fetch a URL and extract a list of posts",
        category: "http",
        inputs: FetchNode::input_ports,
        outputs: FetchNode::output_ports,
    },
    BuiltinFactory {
        node_type: "filter.keyword",
        description: "Keep items that mention a keyword",
        category: "transform",
        inputs: FilterNode::input_ports,
        outputs: FilterNode::output_ports,
    },
    BuiltinFactory {
        node_type: "text.summarize",
        description: "Condense a list of items into a bullet digest",
        category: "transform",
        inputs: SummarizeNode::input_ports,
        outputs: SummarizeNode::output_ports,
    },
    BuiltinFactory {
        node_type: "debug.log",
        description: "Log values for debugging",
        category: "debug",
        inputs: LogNode::input_ports,
        outputs: LogNode::output_ports,
    },
    BuiltinFactory {
        node_type: "time.delay",
        description: "Delay execution for a specified duration",
        category: "control",
        inputs: DelayNode::input_ports,
        outputs: DelayNode::output_ports,
    },
    BuiltinFactory {
        node_type: "memory.get",
        description: "Read a value from workflow memory",
        category: "memory",
        inputs: MemoryGetNode::input_ports,
        outputs: MemoryGetNode::output_ports,
    },
    BuiltinFactory {
        node_type: "memory.set",
        description: "Store a value in workflow memory",
        category: "memory",
        inputs: MemorySetNode::input_ports,
        outputs: MemorySetNode::output_ports,
    },
    BuiltinFactory {
        node_type: "notify.webhook",
        description: "Post a message to a webhook",
        category: "http",
        inputs: WebhookNode::input_ports,
        outputs: WebhookNode::output_ports,
    },
];

/// Register all built-in nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    for factory in FACTORIES {
        registry.register(Arc::new(*factory));
    }
    tracing::debug!("Registered {} built-in node types", FACTORIES.len());
}

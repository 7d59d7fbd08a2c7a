use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wirecore::{Node, NodeContext, NodeError, NodeOutput, PortSpec, Value};

fn require_key(key: &str) -> Result<(), NodeError> {
    if key.trim().is_empty() {
        return Err(NodeError::Configuration("memory key must not be empty".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySetConfig {
    pub key: String,
}

/// Stores its input under a key in the workflow memory
pub struct MemorySetNode {
    config: MemorySetConfig,
}

impl MemorySetNode {
    pub fn new(config: MemorySetConfig) -> Self {
        Self { config }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec"), PortSpec::any("value")]
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec")]
    }
}

#[async_trait]
impl Node for MemorySetNode {
    fn node_type(&self) -> &str {
        "memory.set"
    }

    fn inputs(&self) -> Vec<PortSpec> {
        Self::input_ports()
    }

    fn outputs(&self) -> Vec<PortSpec> {
        Self::output_ports()
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        require_key(&self.config.key)?;
        let value = ctx.require_input("value")?.clone();
        ctx.memory.set(&self.config.key, value).await?;
        ctx.log.debug(format!("Stored '{}'", self.config.key));
        Ok(NodeOutput::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryGetConfig {
    pub key: String,
    /// Emitted when the key is absent
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// Reads a key from the workflow memory
pub struct MemoryGetNode {
    config: MemoryGetConfig,
}

impl MemoryGetNode {
    pub fn new(config: MemoryGetConfig) -> Self {
        Self { config }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec")]
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec"), PortSpec::any("value")]
    }
}

#[async_trait]
impl Node for MemoryGetNode {
    fn node_type(&self) -> &str {
        "memory.get"
    }

    fn inputs(&self) -> Vec<PortSpec> {
        Self::input_ports()
    }

    fn outputs(&self) -> Vec<PortSpec> {
        Self::output_ports()
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        require_key(&self.config.key)?;
        let stored = ctx.memory.get(&self.config.key).await?;
        let value = stored.or_else(|| self.config.default.clone().map(Value::from));

        match value {
            Some(value) => Ok(NodeOutput::new().with_output("value", value)),
            None => {
                ctx.log.warn(format!("No value stored under '{}'", self.config.key));
                Ok(NodeOutput::new())
            }
        }
    }
}

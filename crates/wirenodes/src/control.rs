use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use wirecore::{Node, NodeContext, NodeError, NodeOutput, PortSpec};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartConfig {
    pub label: Option<String>,
}

/// Entry point of a workflow; fires its exec output
pub struct StartNode {
    config: StartConfig,
}

impl StartNode {
    pub fn new(config: StartConfig) -> Self {
        Self { config }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        Vec::new()
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec")]
    }
}

#[async_trait]
impl Node for StartNode {
    fn node_type(&self) -> &str {
        "start"
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
        match &self.config.label {
            Some(label) => ctx.log.info(format!("Workflow triggered: {}", label)),
            None => ctx.log.info("Workflow triggered"),
        }
        Ok(NodeOutput::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub delay_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

/// Delay execution for a specified duration
pub struct DelayNode {
    config: DelayConfig,
}

impl DelayNode {
    pub fn new(config: DelayConfig) -> Self {
        Self { config }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec"), PortSpec::any("value")]
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec"), PortSpec::any("value")]
    }
}

#[async_trait]
impl Node for DelayNode {
    fn node_type(&self) -> &str {
        "time.delay"
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
        ctx.log.info(format!("Delaying for {}ms", self.config.delay_ms));

        tokio::select! {
            _ = sleep(Duration::from_millis(self.config.delay_ms)) => {}
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        }

        // Pass the value through untouched
        let mut output = NodeOutput::new();
        if let Some(value) = ctx.input("value") {
            output = output.with_output("value", value.clone());
        }
        Ok(output)
    }
}

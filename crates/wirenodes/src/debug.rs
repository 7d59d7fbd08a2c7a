use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wirecore::{Node, NodeContext, NodeError, NodeOutput, PortSpec};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub prefix: Option<String>,
}

/// Logs its input and passes it on
pub struct LogNode {
    config: LogConfig,
}

impl LogNode {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec"), PortSpec::any("message")]
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec"), PortSpec::any("message")]
    }
}

#[async_trait]
impl Node for LogNode {
    fn node_type(&self) -> &str {
        "debug.log"
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
        let prefix = self.config.prefix.as_deref().unwrap_or("LOG");

        let Some(message) = ctx.input("message") else {
            ctx.log.info(format!("{}: (no message)", prefix));
            return Ok(NodeOutput::new());
        };

        ctx.log.info(format!("{}: {}", prefix, message.to_text()));
        Ok(NodeOutput::new().with_output("message", message.clone()))
    }
}

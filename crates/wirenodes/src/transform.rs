use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wirecore::{Node, NodeContext, NodeError, NodeOutput, PortSpec, Value};

/// Items of a list input. JSON arrays are accepted as well.
fn items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Json(serde_json::Value::Array(items)) => {
            Some(items.iter().cloned().map(Value::from).collect())
        }
        _ => None,
    }
}

/// Text of one item, optionally taken from a named field of an object.
fn item_text(item: &Value, field: Option<&str>) -> String {
    let Some(field) = field else {
        return item.to_text();
    };
    match item.to_json().get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// An item matches when its text contains any keyword. No keywords
    /// matches everything.
    pub keywords: Vec<String>,
    pub field: Option<String>,
    pub case_sensitive: bool,
    /// Keep the items that do not match instead.
    pub exclude: bool,
}

/// Keeps list items that mention one of the configured keywords
pub struct FilterNode {
    config: FilterConfig,
}

impl FilterNode {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        vec![PortSpec::data("posts")]
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![PortSpec::data("output"), PortSpec::data("count")]
    }

    fn matches(&self, item: &Value) -> bool {
        if self.config.keywords.is_empty() {
            return true;
        }
        let text = item_text(item, self.config.field.as_deref());
        let hit = if self.config.case_sensitive {
            self.config.keywords.iter().any(|k| text.contains(k.as_str()))
        } else {
            let text = text.to_lowercase();
            self.config
                .keywords
                .iter()
                .any(|k| text.contains(&k.to_lowercase()))
        };
        hit != self.config.exclude
    }
}

#[async_trait]
impl Node for FilterNode {
    fn node_type(&self) -> &str {
        "filter.keyword"
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
        let posts = ctx.require_input("posts")?;
        let all = items(posts).ok_or_else(|| NodeError::InvalidInputType {
            field: "posts".to_string(),
            expected: "array".to_string(),
            actual: posts.type_name().to_string(),
        })?;

        let total = all.len();
        let kept: Vec<Value> = all.into_iter().filter(|item| self.matches(item)).collect();
        ctx.log.info(format!("Kept {} of {} items", kept.len(), total));

        Ok(NodeOutput::new()
            .with_output("count", kept.len() as f64)
            .with_output("output", kept))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeConfig {
    pub max_items: usize,
    pub field: Option<String>,
    pub heading: Option<String>,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            max_items: 5,
            field: None,
            heading: None,
        }
    }
}

/// Extractive digest: one bullet per item, capped at `max_items`
pub struct SummarizeNode {
    config: SummarizeConfig,
}

impl SummarizeNode {
    pub fn new(config: SummarizeConfig) -> Self {
        Self { config }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        vec![PortSpec::data("input")]
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![PortSpec::data("summary")]
    }

    fn summarize(&self, input: &Value) -> String {
        let field = self.config.field.as_deref();
        let mut lines = Vec::new();
        if let Some(heading) = &self.config.heading {
            lines.push(heading.clone());
        }

        match items(input) {
            Some(list) if list.is_empty() => lines.push("No items.".to_string()),
            Some(list) => {
                for item in list.iter().take(self.config.max_items) {
                    lines.push(format!("- {}", item_text(item, field)));
                }
                if list.len() > self.config.max_items {
                    lines.push(format!("...and {} more", list.len() - self.config.max_items));
                }
            }
            None => lines.push(item_text(input, field)),
        }
        lines.join("\n")
    }
}

#[async_trait]
impl Node for SummarizeNode {
    fn node_type(&self) -> &str {
        "text.summarize"
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
        let input = ctx.require_input("input")?;
        let summary = self.summarize(input);
        ctx.log.debug(format!("Summary is {} characters", summary.len()));
        Ok(NodeOutput::new().with_output("summary", summary))
    }
}

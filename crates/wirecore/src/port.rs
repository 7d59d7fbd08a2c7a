use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal kind a port carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Exec,
    Data,
    Any,
}

impl PortKind {
    /// `Any` pairs with everything; otherwise kinds must match.
    pub fn is_compatible_with(self, other: PortKind) -> bool {
        match (self, other) {
            (PortKind::Any, _) | (_, PortKind::Any) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Exec => f.write_str("exec"),
            PortKind::Data => f.write_str("data"),
            PortKind::Any => f.write_str("any"),
        }
    }
}

/// Declaration of a named input or output port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    pub kind: PortKind,
    /// Input ports only: accept more than one incoming connection.
    #[serde(default)]
    pub multiple: bool,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            kind,
            multiple: false,
        }
    }

    pub fn exec(name: impl Into<String>) -> Self {
        Self::new(name, PortKind::Exec)
    }

    pub fn data(name: impl Into<String>) -> Self {
        Self::new(name, PortKind::Data)
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, PortKind::Any)
    }

    pub fn with_multiple(mut self) -> Self {
        self.multiple = true;
        self
    }
}

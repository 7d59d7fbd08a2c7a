//! Standard node library
//!
//! Built-in nodes for the news digest style of workflow: trigger, fetch,
//! filter, summarize, log, plus delay, memory access and webhook delivery.

mod builtin;
mod control;
mod debug;
mod http;
mod memory;
mod transform;

pub use builtin::{register_all, BuiltinFactory, BuiltinNode};
pub use control::{DelayConfig, DelayNode, StartConfig, StartNode};
pub use debug::{LogConfig, LogNode};
pub use http::{extract_posts, FetchConfig, FetchNode, WebhookConfig, WebhookNode};
pub use memory::{MemoryGetConfig, MemoryGetNode, MemorySetConfig, MemorySetNode};
pub use transform::{FilterConfig, FilterNode, SummarizeConfig, SummarizeNode};

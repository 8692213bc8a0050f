//! Custom tracing layers for Ferry
//!
//! This module provides the layer that attaches node context to spans, and
//! the JSONL formatting layer shared by console and file output.

use tracing::{Subscriber, span};
use tracing_subscriber::{
    fmt::{
        self, MakeWriter,
        format::{Format, Json, JsonFields},
    },
    layer::{Context, Layer},
    registry::{LookupSpan, SpanRef},
};

use crate::config::LogConfig;
use crate::context::{NodeContextData, NodeContextGuard};

/// Layer that attaches node context to spans
///
/// Every span opened while a [`NodeContextGuard`] is active carries a
/// [`NodeContextExtension`] that later layers can read back with
/// [`node_context_of`].
pub struct NodeContextLayer;

impl NodeContextLayer {
    /// Create a new node context layer
    pub fn new() -> Self {
        Self
    }
}

impl Default for NodeContextLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct NodeContextExtension {
    pub data: NodeContextData,
}

impl<S> Layer<S> for NodeContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id)
            && let Some(node_ctx) = NodeContextGuard::current()
        {
            span.extensions_mut()
                .insert(NodeContextExtension { data: node_ctx });
        }
    }
}

/// Node context recorded on a span, if any
pub fn node_context_of<'a, S>(span: &SpanRef<'a, S>) -> Option<NodeContextData>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    span.extensions()
        .get::<NodeContextExtension>()
        .map(|ext| ext.data.clone())
}

/// Create a JSONL formatting layer writing to `writer`
///
/// Event fields sit at the top level of each object.
pub fn jsonl_layer<S, W>(
    config: &LogConfig,
    writer: W,
) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(config.with_spans)
        .with_span_list(config.with_spans)
        .with_file(config.with_location)
        .with_line_number(config.with_location)
        .with_writer(writer)
}

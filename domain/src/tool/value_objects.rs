//! Tool call value objects
//!
//! Every handler execution produces a [`ToolCallResult`]. Expected failures
//! (remote API errors, non-zero exits, per-handler timeouts) are carried as
//! `is_error: true` results with diagnostic text, never as panics or raw
//! stack traces. [`CallOutcome`] is what the gateway hands to its caller:
//! either a real result or a "still working" placeholder correlated by task
//! id.

use serde::{Deserialize, Serialize};

/// A single piece of result content.
///
/// The baseline implementation produces text; the enum leaves room for
/// other content kinds without breaking the wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    /// The textual payload of this item
    pub fn as_text(&self) -> &str {
        match self {
            ContentItem::Text { text } => text,
        }
    }
}

/// Normalized result of a tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Result content items
    pub content: Vec<ContentItem>,
    /// Whether the execution failed in an expected way
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: false,
        }
    }

    /// Create an error result carrying a diagnostic message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(message)],
            is_error: true,
        }
    }

    /// Merge several results into one: concatenated content, OR-ed error flag
    pub fn merge(results: impl IntoIterator<Item = ToolCallResult>) -> Self {
        let mut content = Vec::new();
        let mut is_error = false;
        for result in results {
            content.extend(result.content);
            is_error |= result.is_error;
        }
        Self { content, is_error }
    }

    /// Concatenated text of all content items
    pub fn combined_text(&self) -> String {
        self.content
            .iter()
            .map(ContentItem::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text of the first content item, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(ContentItem::as_text)
    }
}

/// What a caller receives from the gateway.
///
/// A deadline loss is not an error: the work keeps running and the caller
/// can poll later with the same tool name and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CallOutcome {
    /// The execution finished within the deadline
    Completed(ToolCallResult),
    /// The deadline won the race; the result will appear in the cache
    Pending { task_id: String, tool_name: String },
}

impl CallOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, CallOutcome::Pending { .. })
    }

    /// The real result, if the execution finished in time
    pub fn result(&self) -> Option<&ToolCallResult> {
        match self {
            CallOutcome::Completed(result) => Some(result),
            CallOutcome::Pending { .. } => None,
        }
    }
}

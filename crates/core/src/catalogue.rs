use crate::action::{ActionKind, ToolIds};
use serde::{Deserialize, Serialize};

/// AI tool as listed by `GET /ai-tools`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub tool_type: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

impl ToolSummary {
    /// The editor action this tool serves, if any
    pub fn action(&self) -> Option<ActionKind> {
        ActionKind::from_tool_type(&self.tool_type)
    }
}

/// Response body of `GET /ai-tools`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCatalogue {
    pub tools: Vec<ToolSummary>,
}

impl ToolIds {
    /// Map each action to the catalogue entry with a matching tool type
    ///
    /// Actions without a matching entry keep their id from `fallback`. When
    /// several entries share a tool type the first one wins.
    pub fn resolve(catalogue: &ToolCatalogue, fallback: ToolIds) -> ToolIds {
        let mut ids = fallback;
        for kind in ActionKind::ALL {
            if let Some(tool) = catalogue.tools.iter().find(|t| t.action() == Some(kind)) {
                ids.set(kind, tool.id);
            }
        }
        ids
    }
}

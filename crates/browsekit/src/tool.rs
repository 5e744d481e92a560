//! Tool contract for browsekit
//!
//! Names, descriptions and input schemas of the four tools, plus dispatch of
//! a tool call onto a [`Browser`].

use crate::browser::Browser;
use crate::types::{BrowseRequest, SearchRequest};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const BROWSE_TOOL: &str = "browse_url";
pub const SEARCH_TOOL: &str = "search_cached_content";
pub const CLEAR_TOOL: &str = "clear_cache";
pub const STATS_TOOL: &str = "get_cache_stats";

/// Input of the tools that take no arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoArguments {}

/// A tool as advertised to an LLM client
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_default()
}

/// Every tool, in a stable order
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: BROWSE_TOOL,
            description: crate::TOOL_DESCRIPTION,
            input_schema: schema::<BrowseRequest>(),
        },
        ToolDefinition {
            name: SEARCH_TOOL,
            description: "Search all cached pages for lines matching a regex pattern, \
                with grep-style context, inversion, line number and whole-word options.",
            input_schema: schema::<SearchRequest>(),
        },
        ToolDefinition {
            name: CLEAR_TOOL,
            description: "Clear the entire web browsing cache.",
            input_schema: schema::<NoArguments>(),
        },
        ToolDefinition {
            name: STATS_TOOL,
            description: "Get statistics about the web browsing cache.",
            input_schema: schema::<NoArguments>(),
        },
    ]
}

/// Run the named tool with JSON arguments
///
/// Every failure, including unknown tools and malformed arguments, comes back
/// as an error message meant for the caller to read.
pub async fn call_tool(browser: &Browser, name: &str, arguments: Value) -> Result<String, String> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };

    match name {
        BROWSE_TOOL => {
            let req: BrowseRequest = parse_arguments(arguments)?;
            browser.browse(&req).await.map_err(|e| e.to_string())
        }
        SEARCH_TOOL => {
            let req: SearchRequest = parse_arguments(arguments)?;
            browser.search_cached(&req).map_err(|e| e.to_string())
        }
        CLEAR_TOOL => browser.clear_cache().map_err(|e| e.to_string()),
        STATS_TOOL => browser.cache_stats().map_err(|e| e.to_string()),
        other => Err(format!("Unknown tool: {}", other)),
    }
}

fn parse_arguments<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, String> {
    serde_json::from_value(arguments).map_err(|e| format!("Invalid arguments: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use serde_json::json;

    fn browser() -> Browser {
        Browser::builder().store(MemoryStore::new()).build().unwrap()
    }

    #[test]
    fn test_tool_definitions() {
        let tools = tool_definitions();
        let names: Vec<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["browse_url", "search_cached_content", "clear_cache", "get_cache_stats"]
        );
        assert!(tools.iter().all(|t| !t.description.is_empty()));
    }

    #[test]
    fn test_browse_schema() {
        let tools = tool_definitions();
        let schema = &tools[0].input_schema;
        assert!(schema["properties"]["url"].is_object());
        assert!(schema["properties"]["grep_pattern"].is_object());
        assert!(schema["properties"]["content_priority"].is_object());
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("url")));
    }

    #[test]
    fn test_definition_serializes_camel_case_schema() {
        let json = serde_json::to_value(&tool_definitions()[2]).unwrap();
        assert_eq!(json["name"], "clear_cache");
        assert!(json["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let err = call_tool(&browser(), "delete_everything", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err, "Unknown tool: delete_everything");
    }

    #[tokio::test]
    async fn test_call_with_bad_arguments() {
        let err = call_tool(&browser(), BROWSE_TOOL, json!({"grep_pattern": "x"}))
            .await
            .unwrap_err();
        assert!(err.starts_with("Invalid arguments:"));
    }

    #[tokio::test]
    async fn test_call_cache_tools() {
        let b = browser();
        let out = call_tool(&b, CLEAR_TOOL, Value::Null).await.unwrap();
        assert_eq!(out, "Cache cleared successfully. 0 entries removed.");

        let out = call_tool(&b, STATS_TOOL, json!({})).await.unwrap();
        assert!(out.contains("- Database location: in-memory\n"));

        let out = call_tool(&b, SEARCH_TOOL, json!({"grep_pattern": "rust"}))
            .await
            .unwrap();
        assert_eq!(out, "No cached content available to search.");
    }
}

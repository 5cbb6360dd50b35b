//! External reasoning capability.
//!
//! The bridge consumes reasoning as an opaque multi-turn capability behind
//! the [`Reasoner`] trait: given a message pair and a tool session, produce a
//! transcript ending in a final assistant message. The production
//! implementation drives an OpenAI-compatible chat-completions API and
//! executes requested tool calls through the session between turns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{QueryError, QueryResult};
use crate::mcp::{ToolDescriptor, ToolSession};

/// Tool-call rounds allowed before the loop is cut off.
const MAX_TOOL_ROUNDS: usize = 8;

/// Fixed dialect guidance sent as the system message with every query.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that can explore PostgreSQL databases using SQL queries.

IMPORTANT: Use PostgreSQL syntax, NOT MySQL syntax. For example:
- To list all tables: SELECT table_name FROM information_schema.tables WHERE table_schema = 'public';
- To describe a table: SELECT column_name, data_type FROM information_schema.columns WHERE table_name = 'table_name';
- To show database size: SELECT pg_size_pretty(pg_database_size(current_database()));

Avoid using MySQL commands like SHOW TABLES, DESCRIBE table_name, etc. as they won't work in PostgreSQL.

When using the query tool, always provide the full SQL query in the 'sql' parameter.";

/// One transcript entry. Tool-call metadata is carried through so the full
/// conversation can be returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Opaque multi-turn reasoning capability. May issue zero or more tool calls
/// through the session before terminating with a final message.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(
        &self,
        messages: Vec<ChatMessage>,
        session: Arc<dyn ToolSession>,
    ) -> QueryResult<Vec<ChatMessage>>;
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct OpenAiReasoner {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiReasoner {
    /// Build from configuration. A missing API key is only an error once the
    /// first query arrives, so the server can start without one.
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            temperature: config.temperature,
        }
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> QueryResult<AssistantTurn> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| QueryError("LLM_API_KEY is not set".to_string()))?;
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.to_vec());
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueryError(format!("LLM request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(QueryError(format!("LLM returned HTTP {status}: {detail}")));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| QueryError(format!("invalid LLM response: {e}")))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| QueryError("LLM response contained no choices".to_string()))
    }
}

#[async_trait]
impl Reasoner for OpenAiReasoner {
    async fn reason(
        &self,
        mut messages: Vec<ChatMessage>,
        session: Arc<dyn ToolSession>,
    ) -> QueryResult<Vec<ChatMessage>> {
        let tools = tool_specs(session.tools());

        for round in 0..=MAX_TOOL_ROUNDS {
            let turn = self.complete(&messages, &tools).await?;
            let tool_calls = turn.tool_calls.clone().unwrap_or_default();

            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: turn.content.clone().unwrap_or_default(),
                tool_calls: (!tool_calls.is_empty())
                    .then(|| serde_json::to_value(&tool_calls).unwrap_or(Value::Null)),
                tool_call_id: None,
            });

            if tool_calls.is_empty() {
                return Ok(messages);
            }
            if round == MAX_TOOL_ROUNDS {
                warn!("tool-call round limit reached, stopping reasoning loop");
                return Err(QueryError(
                    "reasoning did not converge within the tool-call limit".to_string(),
                ));
            }

            for call in tool_calls {
                let args: Value =
                    serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
                debug!(tool = %call.function.name, "executing tool call");
                let result = session
                    .call_tool(&call.function.name, args)
                    .await
                    .map_err(|e| QueryError(e.to_string()))?;
                messages.push(ChatMessage {
                    role: "tool".to_string(),
                    content: result,
                    tool_calls: None,
                    tool_call_id: Some(call.id),
                });
            }
        }

        unreachable!("loop returns or errors within the round limit");
    }
}

/// Map the tool catalog onto OpenAI function-tool specifications.
pub(crate) fn tool_specs(catalog: &[ToolDescriptor]) -> Vec<Value> {
    catalog
        .iter()
        .map(|tool| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                },
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantTurn,
}

#[derive(Debug, Deserialize)]
struct AssistantTurn {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_specs_carry_schema_through() {
        let catalog = vec![ToolDescriptor {
            name: "query".to_string(),
            description: "Run a SQL query".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"sql": {"type": "string"}}
            }),
        }];

        let specs = tool_specs(&catalog);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0]["type"], "function");
        assert_eq!(specs[0]["function"]["name"], "query");
        assert!(specs[0]["function"]["parameters"]["properties"]["sql"].is_object());
    }

    #[test]
    fn system_prompt_insists_on_postgres_dialect() {
        assert!(SYSTEM_PROMPT.contains("PostgreSQL syntax"));
        assert!(SYSTEM_PROMPT.contains("information_schema.tables"));
    }

    #[test]
    fn assistant_turn_deserializes_tool_calls() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "query", "arguments": "{\"sql\":\"SELECT 1\"}"}
                    }]
                }
            }]
        });
        let completion: ChatCompletion = serde_json::from_value(raw).unwrap();
        let turn = &completion.choices[0].message;
        assert!(turn.content.is_none());
        assert_eq!(turn.tool_calls.as_ref().unwrap()[0].function.name, "query");
    }
}

//! Query bridge: natural-language question in, transcript and answer out.

use std::sync::Arc;

use crate::error::{QueryError, QueryResult};
use crate::llm::{ChatMessage, Reasoner, SYSTEM_PROMPT};
use crate::mcp::SessionManager;

/// Result of one bridged query: the full message transcript plus the content
/// of the final message.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub transcript: Vec<ChatMessage>,
    pub answer: String,
}

/// Bridges incoming queries to the reasoning capability, acquiring the tool
/// session lazily and reusing it across calls.
pub struct QueryService {
    session: Arc<SessionManager>,
    reasoner: Arc<dyn Reasoner>,
}

impl QueryService {
    pub fn new(session: Arc<SessionManager>, reasoner: Arc<dyn Reasoner>) -> Self {
        Self { session, reasoner }
    }

    /// Answer one natural-language query. Fails without a partial answer on
    /// any session or reasoning error.
    pub async fn handle(&self, query: &str) -> QueryResult<QueryOutcome> {
        let session = self.session.acquire().await?;

        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(query)];
        let transcript = self.reasoner.reason(messages, session).await?;

        let answer = transcript
            .last()
            .map(|message| message.content.clone())
            .ok_or_else(|| QueryError("reasoning produced an empty transcript".to_string()))?;

        Ok(QueryOutcome { transcript, answer })
    }
}

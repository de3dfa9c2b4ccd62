//! Query expansion
//!
//! Turns one question into several search queries with a single completion
//! call. The verbatim question always comes first.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::provider::CompletionProvider;
use crate::error::Result;

/// Default number of generated queries
pub const DEFAULT_NUM_QUERIES: usize = 4;

/// Generates paraphrased search queries for a question
pub struct QueryExpander {
    llm: Arc<dyn CompletionProvider>,
    num_queries: usize,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self {
            llm,
            num_queries: DEFAULT_NUM_QUERIES,
        }
    }

    /// Set how many queries to request from the model
    pub fn with_num_queries(mut self, num_queries: usize) -> Self {
        self.num_queries = num_queries;
        self
    }

    pub fn num_queries(&self) -> usize {
        self.num_queries
    }

    /// Render the instruction sent to the model
    pub fn prompt(&self, question: &str) -> String {
        format!(
            "You are a helpful assistant that generates multiple search queries based on a single input query. \
             Generate {} search queries, one on each line, related to the following input query:\n\
             Query: {}\n\
             Queries:\n",
            self.num_queries, question
        )
    }

    /// Expand a question into `[question, q1, ..., qn]`
    ///
    /// Fewer than `n` usable lines is accepted as-is.
    pub async fn expand(&self, question: &str) -> Result<Vec<String>> {
        let mut queries = vec![question.to_string()];
        if self.num_queries == 0 {
            return Ok(queries);
        }

        let output = self.llm.complete(&self.prompt(question)).await?;
        queries.extend(parse_queries(&output, self.num_queries));

        debug!(generated = queries.len() - 1, "Query expansion complete");
        Ok(queries)
    }

    /// Like [`expand`](Self::expand), but falls back to the question alone
    /// when the completion call fails
    pub async fn expand_or_original(&self, question: &str) -> Vec<String> {
        match self.expand(question).await {
            Ok(queries) => queries,
            Err(e) => {
                warn!(error = %e, "Query expansion failed, searching with the question only");
                vec![question.to_string()]
            }
        }
    }
}

/// Extract at most `limit` queries from model output, one per non-empty line
pub fn parse_queries(output: &str, limit: usize) -> Vec<String> {
    output
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(limit)
        .map(String::from)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    let rest = if digits > 0 {
        match line[digits..].strip_prefix(['.', ')']) {
            Some(rest) => rest,
            None => line,
        }
    } else {
        line.strip_prefix(['-', '*', '•']).unwrap_or(line)
    };
    rest.trim()
}

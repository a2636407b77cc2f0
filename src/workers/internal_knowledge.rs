use super::{query_context, Worker};
use crate::cache::Params;
use crate::llm::LLMClient;
use crate::types::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are an internal pharmaceutical knowledge analyst with access to \
proprietary domain expertise. Answer in concise, factual markdown.";

/// Report drawn from the model's own domain knowledge, steered by the query
pub struct InternalKnowledgeWorker {
    llm: Arc<dyn LLMClient>,
}

impl InternalKnowledgeWorker {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    fn prompt(subject: &str, query: Option<&str>) -> String {
        format!(
            "Molecule: {subject}\nQuery context: {context}\n\n\
             Provide, in 200-300 words:\n\
             1. Molecular properties overview (3-4 key properties)\n\
             2. Known therapeutic applications, primary and secondary\n\
             3. Competitive landscape: similar molecules and positioning\n\
             4. Strategic insights on manufacturing, formulation or regulation\n\
             5. Risk factors",
            context = query.unwrap_or("General analysis")
        )
    }
}

#[async_trait]
impl Worker for InternalKnowledgeWorker {
    fn name(&self) -> &str {
        "internal_knowledge"
    }

    fn display_name(&self) -> &str {
        "Internal Knowledge"
    }

    fn description(&self) -> &str {
        "Properties, applications and risks from internal domain knowledge"
    }

    async fn invoke(&self, subject: &str, params: &Params) -> Result<Value> {
        let prompt = Self::prompt(subject, query_context(params));
        let report = self.llm.generate_with_system(SYSTEM_PROMPT, &prompt).await?;
        Ok(Value::String(report))
    }
}

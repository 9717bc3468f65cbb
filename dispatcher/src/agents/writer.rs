use std::sync::Arc;

use crate::model_client::{ModelClient, ModelError, Prompt};

const WRITER_SYSTEM_PROMPT: &str = "You are WriterAgent, the writing specialist of a multi-agent lab. \
You write, rewrite, outline and document. Answer with the finished text only: no preamble, \
no commentary about yourself, no questions back unless the task is impossible without them.";

/// Writing specialist. No state, no retries.
#[derive(Clone)]
pub struct WriterAgent {
    client: Arc<dyn ModelClient>,
}

impl WriterAgent {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    pub async fn respond(
        &self,
        base_url: &str,
        model: &str,
        task: &str,
    ) -> Result<String, ModelError> {
        self.client
            .complete(base_url, model, &Self::prompt(task))
            .await
    }

    pub fn prompt(task: &str) -> Prompt {
        Prompt::new(
            WRITER_SYSTEM_PROMPT,
            format!(
                "## Task\n{}\n\n\
                 Write a clear, readable text for this task.\n\
                 - Open by stating the purpose in one or two sentences.\n\
                 - Give the body with a few concrete details.\n\
                 - Close with a short conclusion or next step.\n\
                 Use Markdown headings only when the text is longer than a few paragraphs.",
                task.trim()
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_wraps_task() {
        let prompt = WriterAgent::prompt("  draft a memo \n");
        assert!(prompt.user.starts_with("## Task\ndraft a memo\n"));
        assert!(prompt
            .system
            .as_deref()
            .unwrap()
            .starts_with("You are WriterAgent"));
    }
}

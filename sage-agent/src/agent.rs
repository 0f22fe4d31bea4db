//! Agent implementation - drives the LLM <-> tool conversation loop

use std::path::Path;

use sage_core::heuristics;
use sage_core::{
    extract_json_object, parse_tool_calls, ChatMessage, CompletionRequest, Confirmer, LlmProvider,
    Tool, ToolRegistry,
};
use serde::{Deserialize, Serialize};

/// Prompt injected when the model asks about file conflicts instead of
/// acting. Confirmation is the registry's job, not the model's.
const FORCED_ACTION_PROMPT: &str = "Just create the file. If it exists, overwrite it automatically. The system handles confirmation. Use write_file tool now. Do not ask questions - just create.";

const FALLBACK_RESPONSE: &str =
    "I'm not sure how to help with that. Could you be more specific?";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Add detailed teaching explanations to every response
    pub teach_mode: bool,
    /// Review generated code and score it
    pub critic_mode: bool,
    /// Hard cap on LLM round trips per task
    pub max_iterations: usize,
    /// Print tool executions as they happen
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            teach_mode: false,
            critic_mode: false,
            max_iterations: 5,
            verbose: true,
        }
    }
}

/// A clarifying question with selectable answers, for vague tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clarification {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Outcome of a critic-mode code review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticReview {
    #[serde(default = "default_score")]
    pub score: u8,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

fn default_score() -> u8 {
    5
}

impl Default for CriticReview {
    fn default() -> Self {
        Self {
            score: 5,
            issues: Vec::new(),
            suggestions: Vec::new(),
            explanation: "Could not complete review.".to_string(),
        }
    }
}

/// The conversational agent. Generic over the provider so tests can
/// script model responses.
pub struct Agent<P: LlmProvider> {
    provider: P,
    registry: ToolRegistry,
    confirmer: Box<dyn Confirmer>,
    config: AgentConfig,
}

impl<P: LlmProvider> Agent<P> {
    pub fn new(provider: P, confirmer: Box<dyn Confirmer>) -> Self {
        Self::with_config(provider, confirmer, AgentConfig::default())
    }

    pub fn with_config(provider: P, confirmer: Box<dyn Confirmer>, config: AgentConfig) -> Self {
        Self {
            provider,
            registry: ToolRegistry::new(),
            confirmer,
            config,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Forget file approvals from the previous task
    pub fn reset_confirmed_paths(&mut self) {
        self.registry.reset_confirmed_paths();
    }

    // ------------------------------------------------------------------------
    // System prompt
    // ------------------------------------------------------------------------

    fn system_prompt(&self) -> String {
        let mut prompt = String::from(
            r#"You are Sage, a friendly AI terminal agent for learning and building, designed for non-technical users.

Your personality:
- Patient, encouraging, and educational
- Never use jargon without explaining it
- Always explain what you're doing in plain English
- Ask clarifying questions when tasks are vague
- End responses with questions to encourage learning

Available tools (call them using TOOL_CALL format):
- read_file(file_path="path/to/file"): Read a file
- write_file(file_path="path/to/file", content="file content"): Write/create a file
- run_command(command="shell command"): Execute shell commands
- list_files(directory="path/to/dir"): List directory contents

When you need to use a tool, format it exactly like this:
TOOL_CALL: tool_name(param1="value1", param2="value2")

For multiline content (like file content), use triple quotes:
TOOL_CALL: write_file(file_path="app.py", content="""multiline
content
here""")

Important rules:
1. ALWAYS ACT - use tools to create files, run commands, etc. Do NOT ask questions unless the task is completely unclear.
2. If the user wants something created, CREATE IT IMMEDIATELY using tools. Do not ask "what should I create?" - just create it.
3. After every action, explain what was done in simple terms
4. If in teaching mode, provide detailed explanations with definitions
5. Use friendly, encouraging language like "Great choice!", "Nice!", "Let's do this!"
6. If you need to create or modify files, use the write_file tool. The system will ask for confirmation automatically.
7. CRITICAL: When user asks to create something, CREATE IT. Do not ask more questions - just create files and execute commands.
"#,
        );

        if self.config.teach_mode {
            prompt.push_str(
                r#"
TEACHING MODE ENABLED:
- Provide detailed explanations for every concept
- Define technical terms (e.g., "HTML is the skeleton of a webpage")
- Break down complex ideas into simple steps
- Use analogies when helpful
"#,
            );
        }

        if self.config.critic_mode {
            prompt.push_str(
                r#"
CRITIC MODE ENABLED:
- Review all code for bugs, style, and security
- Provide a score from 1-10
- Suggest fixes if score is below 8
- Explain each issue clearly
"#,
            );
        }

        prompt
    }

    // ------------------------------------------------------------------------
    // Conversation loop
    // ------------------------------------------------------------------------

    /// Run the conversation loop for one task and return the final
    /// response text. Provider failures come back as actionable advice
    /// rather than raw errors.
    pub async fn process_task(&mut self, task: &str) -> String {
        let system_prompt = self.system_prompt();
        let mut messages = vec![ChatMessage::user(task)];
        let mut last_response = String::new();

        for _ in 0..self.config.max_iterations {
            let mut full_messages = vec![ChatMessage::system(&system_prompt)];
            full_messages.extend(messages.iter().cloned());

            let request = CompletionRequest::new(full_messages).with_temperature(0.7);
            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => return heuristics::provider_diagnostic(&e.to_string()),
            };
            let response_text = response.content.unwrap_or_default();

            let tool_calls = parse_tool_calls(&response_text);

            if tool_calls.is_empty() {
                // No tool calls. If the model is dithering over a file
                // conflict, push it to act; otherwise we are done.
                if heuristics::stalls_on_file_conflict(&response_text) {
                    messages.push(ChatMessage::assistant(&response_text));
                    messages.push(ChatMessage::user(FORCED_ACTION_PROMPT));
                    last_response = response_text;
                    continue;
                }
                return response_text;
            }

            let mut tool_results = Vec::new();
            for call in &tool_calls {
                if self.config.verbose {
                    println!("Executing: {}({})", call.name, summarize_args(call));
                }
                let result = match Tool::parse(&call.name) {
                    Ok(tool) => {
                        self.registry
                            .execute(tool, &call.args, self.confirmer.as_ref())
                            .await
                    }
                    Err(_) => format!("Unknown tool: {}", call.name),
                };
                tool_results.push(format!("{} result: {}", call.name, result));
            }

            messages.push(ChatMessage::assistant(&response_text));
            messages.push(ChatMessage::user(format!(
                "Tool results:\n{}",
                tool_results.join("\n")
            )));
            last_response = response_text;
        }

        if last_response.is_empty() {
            FALLBACK_RESPONSE.to_string()
        } else {
            last_response
        }
    }

    // ------------------------------------------------------------------------
    // Single-shot helpers
    // ------------------------------------------------------------------------

    /// Ask the model to turn a vague task into a concrete question with
    /// selectable options. Returns None when the model's answer cannot
    /// be parsed.
    pub async fn ask_clarifying_question(&self, vague_task: &str) -> Option<Clarification> {
        let prompt = format!(
            r#"The user said: "{vague_task}"

This task is vague. Generate 3-5 numbered options to clarify what they want.
Format: Return ONLY a JSON object with this structure:
{{
    "question": "What kind of [thing] would you like?",
    "options": [
        "Option 1 description",
        "Option 2 description",
        "Option 3 description"
    ]
}}

Return ONLY the JSON, no other text."#
        );

        let response = self.provider.prompt(&prompt).await.ok()?;
        let json = extract_json_object(&response)?;
        serde_json::from_str(json).ok()
    }

    /// Generate a plain-English explanation of a completed action.
    /// Falls back to a canned summary when the provider is unavailable.
    pub async fn explain_action(&self, action: &str, result: &str) -> String {
        let depth = if self.config.teach_mode {
            "Include detailed explanations and definitions if this is teaching mode."
        } else {
            "Keep it concise but informative."
        };
        let prompt = format!(
            r#"The following action was performed:
Action: {action}
Result: {result}

Generate a friendly, plain English explanation of what happened.
{depth}
Use encouraging language. End with a question to encourage learning."#
        );

        match self.provider.prompt(&prompt).await {
            Ok(explanation) => explanation,
            Err(_) => format!("Completed: {}. {}", action, result),
        }
    }

    /// Review a code file and score it 1-10. Unparseable responses
    /// yield the neutral default review.
    pub async fn critic_review(&self, code: &str, file_path: &str) -> CriticReview {
        let lang = language_for(file_path);
        let prompt = format!(
            r#"Review this {lang} code from '{file_path}':

```{lang}
{code}
```

Provide a JSON response with:
{{
    "score": <1-10>,
    "issues": ["issue1", "issue2"],
    "suggestions": ["suggestion1", "suggestion2"],
    "explanation": "Overall assessment"
}}

Return ONLY the JSON."#
        );

        let review = match self.provider.prompt(&prompt).await {
            Ok(response) => extract_json_object(&response)
                .and_then(|json| serde_json::from_str::<CriticReview>(json).ok()),
            Err(_) => None,
        };
        review.unwrap_or_default()
    }
}

/// Map a file extension to the language tag used in review prompts
fn language_for(file_path: &str) -> &'static str {
    match Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
    {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "html" => "html",
        "css" => "css",
        _ => "code",
    }
}

/// Render tool arguments for progress output, long values truncated
fn summarize_args(call: &sage_core::ToolCall) -> String {
    let mut parts: Vec<String> = call
        .args
        .iter()
        .map(|(k, v)| {
            if v.chars().count() > 20 {
                let prefix: String = v.chars().take(20).collect();
                format!("{}={}...", k, prefix)
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect();
    parts.sort();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_core::provider::{CompletionResponse, ProviderError, Usage};
    use sage_core::AutoApprove;
    use std::sync::Mutex;

    /// Provider that replays a fixed list of responses
    struct Scripted {
        responses: Mutex<Vec<Result<String, ProviderError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn replay(responses: &[&str]) -> Self {
            Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
        }

        fn calls_made(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, idx: usize) -> CompletionRequest {
            self.requests.lock().unwrap()[idx].clone()
        }
    }

    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-1"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(CompletionResponse {
                    model: "scripted-1".to_string(),
                    content: Some("Anything else?".to_string()),
                    usage: Usage::default(),
                });
            }
            responses.remove(0).map(|content| CompletionResponse {
                model: "scripted-1".to_string(),
                content: Some(content),
                usage: Usage::default(),
            })
        }
    }

    fn quiet_config() -> AgentConfig {
        AgentConfig {
            verbose: false,
            ..Default::default()
        }
    }

    fn agent(provider: Scripted) -> Agent<Scripted> {
        Agent::with_config(provider, Box::new(AutoApprove), quiet_config())
    }

    #[tokio::test]
    async fn test_plain_answer_returns_immediately() {
        let mut agent = agent(Scripted::replay(&["Here is what a variable is: ..."]));
        let response = agent.process_task("explain what a variable is please").await;
        assert_eq!(response, "Here is what a variable is: ...");
        assert_eq!(agent.provider().calls_made(), 1);
    }

    #[tokio::test]
    async fn test_tool_results_are_fed_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeting.txt");
        let path_str = path.to_str().unwrap();

        let first = format!(
            "TOOL_CALL: write_file(file_path=\"{}\", content=\"hi there\")",
            path_str
        );
        let mut agent = agent(Scripted::replay(&[&first, "Done! I created the file."]));

        let response = agent.process_task("write a greeting file for me").await;
        assert_eq!(response, "Done! I created the file.");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi there");

        // second request must carry the tool result back to the model
        let second = agent.provider().request(1);
        let last = second.messages.last().unwrap();
        assert!(last.content.starts_with("Tool results:\n"));
        assert!(last.content.contains("write_file result: Successfully wrote"));
    }

    #[tokio::test]
    async fn test_iteration_cap_under_adversarial_model() {
        // model that emits a tool call every time never terminates on
        // its own; the loop must stop at max_iterations
        let looping = "TOOL_CALL: list_files(directory=\".\")";
        let mut agent = agent(Scripted::replay(&[looping; 10]));

        let response = agent.process_task("list the files in this directory").await;
        assert_eq!(agent.provider().calls_made(), 5);
        assert_eq!(response, looping);
    }

    #[tokio::test]
    async fn test_garbled_tool_call_terminates_immediately() {
        // noise that parses to nothing is not a tool call; without a
        // question the loop ends on the first round
        let mut agent = agent(Scripted::replay(&["TOOL_CALL: read_file(!!!)"; 10]));
        let response = agent.process_task("read my notes and summarize them").await;
        assert_eq!(agent.provider().calls_made(), 1);
        assert_eq!(response, "TOOL_CALL: read_file(!!!)");
    }

    #[tokio::test]
    async fn test_file_conflict_stall_is_overridden() {
        let mut agent = agent(Scripted::replay(&[
            "The file index.html already exists. Should I overwrite it?",
            "Overwritten! Your page is ready.",
        ]));

        let response = agent.process_task("create an index.html landing page").await;
        assert_eq!(response, "Overwritten! Your page is ready.");

        let second = agent.provider().request(1);
        let last = second.messages.last().unwrap();
        assert_eq!(last.content, FORCED_ACTION_PROMPT);
    }

    #[tokio::test]
    async fn test_ordinary_question_is_not_overridden() {
        let mut agent = agent(Scripted::replay(&["What color scheme would you like?"]));
        let response = agent.process_task("make me a really nice fancy website").await;
        assert_eq!(response, "What color scheme would you like?");
        assert_eq!(agent.provider().calls_made(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_in_results() {
        let mut agent = agent(Scripted::replay(&[
            "TOOL_CALL: delete_everything(target=\"/\")",
            "Sorry, I cannot do that.",
        ]));

        let response = agent.process_task("please wipe the whole machine").await;
        assert_eq!(response, "Sorry, I cannot do that.");

        let second = agent.provider().request(1);
        let last = second.messages.last().unwrap();
        assert!(last
            .content
            .contains("delete_everything result: Unknown tool: delete_everything"));
    }

    #[tokio::test]
    async fn test_provider_quota_error_becomes_advice() {
        let mut agent = agent(Scripted::new(vec![Err(ProviderError::RateLimited {
            retry_after: None,
        })]));
        let response = agent.process_task("make a small python script for me").await;
        assert!(response.contains("quota exceeded"));
        assert!(response.contains("sage setup"));
    }

    #[tokio::test]
    async fn test_provider_model_missing_becomes_advice() {
        let mut agent = agent(Scripted::new(vec![Err(ProviderError::ModelNotFound(
            "gpt-99".to_string(),
        ))]));
        let response = agent.process_task("make a small python script for me").await;
        assert!(response.contains("might not be available"));
    }

    #[tokio::test]
    async fn test_clarification_parses_json_with_noise() {
        let agent = agent(Scripted::replay(&[
            "Here you go:\n{\"question\": \"What kind of website?\", \"options\": [\"Blog\", \"Shop\"]}",
        ]));
        let clarification = agent
            .ask_clarifying_question("make a website")
            .await
            .unwrap();
        assert_eq!(clarification.question, "What kind of website?");
        assert_eq!(clarification.options, vec!["Blog", "Shop"]);
    }

    #[tokio::test]
    async fn test_clarification_bad_json_is_none() {
        let agent = agent(Scripted::replay(&["I would rather chat about the weather."]));
        assert!(agent.ask_clarifying_question("make a thing").await.is_none());
    }

    #[tokio::test]
    async fn test_critic_review_fallback() {
        let agent = agent(Scripted::new(vec![Err(ProviderError::Network(
            "connection refused".to_string(),
        ))]));
        let review = agent.critic_review("print('hi')", "app.py").await;
        assert_eq!(review.score, 5);
        assert_eq!(review.explanation, "Could not complete review.");
    }

    #[tokio::test]
    async fn test_critic_review_parses_scores() {
        let agent = agent(Scripted::replay(&[
            "{\"score\": 9, \"issues\": [], \"suggestions\": [\"add a docstring\"], \"explanation\": \"Clean.\"}",
        ]));
        let review = agent.critic_review("print('hi')", "app.py").await;
        assert_eq!(review.score, 9);
        assert_eq!(review.suggestions, vec!["add a docstring"]);
    }

    #[tokio::test]
    async fn test_explain_action_fallback() {
        let agent = agent(Scripted::new(vec![Err(ProviderError::Other(
            "down".to_string(),
        ))]));
        let explanation = agent.explain_action("Task execution", "done").await;
        assert_eq!(explanation, "Completed: Task execution. done");
    }

    #[test]
    fn test_language_mapping() {
        assert_eq!(language_for("app.py"), "python");
        assert_eq!(language_for("component.tsx"), "typescript");
        assert_eq!(language_for("Makefile"), "code");
    }

    #[test]
    fn test_teach_and_critic_prompt_sections() {
        let agent = Agent::with_config(
            Scripted::replay(&[]),
            Box::new(AutoApprove),
            AgentConfig {
                teach_mode: true,
                critic_mode: true,
                verbose: false,
                ..Default::default()
            },
        );
        let prompt = agent.system_prompt();
        assert!(prompt.contains("TEACHING MODE ENABLED"));
        assert!(prompt.contains("CRITIC MODE ENABLED"));
    }
}

//! Tool-calling agent loop.
//!
//! One run alternates between asking the model for the next message and
//! executing the tools it requests, until the model answers without tool
//! calls:
//!
//! ```text
//! AwaitingModel --tool calls--> AwaitingTools --results appended--> AwaitingModel
//! AwaitingModel --no tool calls--> Done
//! ```
//!
//! Every model call sees the system instruction followed by the whole
//! conversation so far. Tool failures never end a run; they are reported to
//! the model as that call's result. Runs are bounded by an iteration count
//! and a wall-clock deadline.

use crate::backend::ModelClient;
use crate::error::{AgentError, LlmError};
use crate::prompt::SYSTEM_INSTRUCTION;
use jupiter_conversation::{
    ConversationState, Message, MessageRole, Session, ToolCall, ToolRegistry, ToolResult,
};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Limits applied to each agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model calls allowed per run before giving up.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Bound on a single model call, retries included.
    #[serde(default = "default_model_timeout_seconds")]
    pub model_timeout_seconds: u64,
    /// Bound on a single tool call.
    #[serde(default = "default_tool_timeout_seconds")]
    pub tool_timeout_seconds: u64,
    /// Bound on the whole run.
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: u64,
    /// Whether [`Agent::respond`] sends earlier session turns to the model.
    #[serde(default = "default_include_history")]
    pub include_history: bool,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_model_timeout_seconds() -> u64 {
    120
}

fn default_tool_timeout_seconds() -> u64 {
    30
}

fn default_deadline_seconds() -> u64 {
    300
}

fn default_include_history() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            model_timeout_seconds: default_model_timeout_seconds(),
            tool_timeout_seconds: default_tool_timeout_seconds(),
            deadline_seconds: default_deadline_seconds(),
            include_history: default_include_history(),
        }
    }
}

impl AgentConfig {
    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Timeout for tool dispatch, for building the [`ToolRegistry`].
    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_seconds)
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    /// The next step is a model call.
    AwaitingModel,
    /// The model asked for these tools; results are pending.
    AwaitingTools(Vec<ToolCall>),
    /// The model answered; this is the final text.
    Done(String),
}

/// A finished run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The final answer text.
    pub answer: String,
    /// Everything appended during the run, starting with any history and
    /// the user message. Does not include the system instruction.
    pub conversation: ConversationState,
    /// Model calls made.
    pub model_calls: u32,
    /// Tool calls dispatched.
    pub tool_calls: usize,
}

/// Start of the assistant turn recorded in place of a failed answer.
pub const FAILED_TURN_PREFIX: &str = "❌ Error: ";

/// The assistant turn produced for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced an answer.
    Answered { answer: String },
    /// The run failed; `message` is the error text shown in its place.
    Failed { error: AgentError, message: String },
}

impl TurnOutcome {
    /// Text appended to the session as the assistant turn.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Answered { answer } => answer,
            Self::Failed { message, .. } => message,
        }
    }

    /// Appends `question` and this outcome to `session` as a user turn
    /// followed by an assistant turn.
    pub fn record(&self, session: &mut Session, question: &str) {
        session.add_message(Message::user(question));
        session.generate_title();
        session.add_message(Message::assistant(self.text()));
    }
}

/// Drives a [`ModelClient`] and a [`ToolRegistry`] to answer one message.
///
/// Holds no per-run state, so one agent can serve concurrent sessions.
pub struct Agent {
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    system_prompt: String,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model.model())
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish()
    }
}

impl Agent {
    /// Creates an agent. A `max_iterations` of zero is raised to one.
    #[must_use]
    pub fn new(model: Arc<dyn ModelClient>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        let config = AgentConfig {
            max_iterations: config.max_iterations.max(1),
            ..config
        };
        Self {
            model,
            tools,
            config,
            system_prompt: SYSTEM_INSTRUCTION.to_string(),
        }
    }

    /// Replaces the system instruction.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// The limits this agent runs with.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answers `user_message` with no prior context.
    pub async fn run(&self, user_message: &str) -> Result<String, Report<AgentError>> {
        Ok(self.execute(Vec::new(), user_message).await?.answer)
    }

    /// Answers `user_message` after the given earlier turns.
    pub async fn run_with_history(
        &self,
        history: &[Message],
        user_message: &str,
    ) -> Result<AgentOutcome, Report<AgentError>> {
        Ok(self.execute(history.to_vec(), user_message).await?)
    }

    /// Asks `question` on behalf of a chat session.
    ///
    /// The question and the reply are appended to the session as user and
    /// assistant turns. A failed run still yields an assistant turn, holding
    /// the error text, so the transcript stays consistent.
    pub async fn respond(&self, session: &mut Session, question: &str) -> TurnOutcome {
        let outcome = self.reply(self.history_for(session), question).await;
        outcome.record(session, question);
        outcome
    }

    /// Answers `question` after `history` without touching any session.
    ///
    /// Callers that share a session between requests take the history up
    /// front and [`TurnOutcome::record`] the result once the run is over.
    pub async fn reply(&self, history: Vec<Message>, question: &str) -> TurnOutcome {
        match self.execute(history, question).await {
            Ok(run) => TurnOutcome::Answered { answer: run.answer },
            Err(error) => {
                warn!(%error, "agent run failed");
                TurnOutcome::Failed {
                    message: format!("{FAILED_TURN_PREFIX}{error}"),
                    error,
                }
            }
        }
    }

    /// Earlier turns of `session` to send with the next question.
    ///
    /// Empty unless `include_history` is set. Failed questions and their
    /// error turns are left out.
    #[must_use]
    pub fn history_for(&self, session: &Session) -> Vec<Message> {
        if !self.config.include_history {
            return Vec::new();
        }
        let mut turns: Vec<Message> = Vec::new();
        for message in session.transcript() {
            if message.role == MessageRole::Assistant
                && message.content.starts_with(FAILED_TURN_PREFIX)
            {
                if turns.last().is_some_and(|m| m.role == MessageRole::User) {
                    turns.pop();
                }
                continue;
            }
            turns.push(message.clone());
        }
        turns
    }

    #[instrument(skip_all, fields(model = %self.model.model(), history = history.len()))]
    async fn execute(
        &self,
        history: Vec<Message>,
        user_message: &str,
    ) -> Result<AgentOutcome, AgentError> {
        if user_message.trim().is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let mut conversation = ConversationState::with_history(history);
        conversation.push(Message::user(user_message));

        let deadline = Duration::from_secs(self.config.deadline_seconds);
        let outcome = tokio::time::timeout(deadline, self.drive(conversation))
            .await
            .map_err(|_| AgentError::DeadlineExceeded {
                seconds: self.config.deadline_seconds,
            })??;

        info!(
            model_calls = outcome.model_calls,
            tool_calls = outcome.tool_calls,
            "agent run finished"
        );
        Ok(outcome)
    }

    async fn drive(&self, mut conversation: ConversationState) -> Result<AgentOutcome, AgentError> {
        let mut state = AgentState::AwaitingModel;
        let mut model_calls = 0u32;
        let mut tool_calls = 0usize;

        loop {
            state = match state {
                AgentState::AwaitingModel => {
                    if model_calls >= self.config.max_iterations {
                        warn!(
                            max_iterations = self.config.max_iterations,
                            "model kept requesting tools"
                        );
                        return Err(AgentError::MaxIterationsExceeded {
                            max: self.config.max_iterations,
                        });
                    }
                    model_calls += 1;

                    let reply = self.call_model(&conversation).await?;
                    debug!(
                        iteration = model_calls,
                        tool_calls = reply.tool_calls.len(),
                        "model replied"
                    );
                    let next = if reply.has_tool_calls() {
                        AgentState::AwaitingTools(reply.tool_calls.clone())
                    } else {
                        AgentState::Done(reply.content.clone())
                    };
                    conversation.push(reply);
                    next
                }
                AgentState::AwaitingTools(calls) => {
                    tool_calls += calls.len();
                    let results = self.tools.execute_all(&calls).await;
                    conversation.extend(results.into_iter().map(ToolResult::into_message));
                    AgentState::AwaitingModel
                }
                AgentState::Done(answer) => {
                    return Ok(AgentOutcome {
                        answer,
                        conversation,
                        model_calls,
                        tool_calls,
                    });
                }
            };
        }
    }

    async fn call_model(&self, conversation: &ConversationState) -> Result<Message, AgentError> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend_from_slice(conversation.messages());

        let limit = Duration::from_secs(self.config.model_timeout_seconds);
        let reply = tokio::time::timeout(
            limit,
            self.model.complete(&messages, self.tools.definitions()),
        )
        .await
        .map_err(|_| LlmError::Timeout)??;

        check_reply(&reply)?;
        Ok(reply)
    }
}

/// Rejects replies the loop cannot act on.
fn check_reply(reply: &Message) -> Result<(), AgentError> {
    if reply.role != MessageRole::Assistant {
        return Err(AgentError::ModelProtocol {
            reason: format!("expected an assistant message, got {}", reply.role.as_str()),
        });
    }

    let mut seen = HashSet::new();
    for call in &reply.tool_calls {
        if call.id.is_empty() {
            return Err(AgentError::ModelProtocol {
                reason: format!("tool call for '{}' has no id", call.name),
            });
        }
        if !seen.insert(call.id.as_str()) {
            return Err(AgentError::ModelProtocol {
                reason: format!("duplicate tool call id '{}'", call.id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jupiter_conversation::{
        RETRIEVAL_TOOL_NAME, RetrievalTool, Tool, ToolDefinition, ToolError,
    };
    use serde_json::{Value as JsonValue, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays canned replies and records what it was sent.
    #[derive(Default)]
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Message, LlmError>>>,
        requests: Mutex<Vec<Vec<Message>>>,
        /// Returned once the script runs out.
        fallback: Option<Message>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<Message, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        fn looping(reply: Message) -> Self {
            Self {
                fallback: Some(reply),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().expect("lock").len()
        }

        fn request(&self, index: usize) -> Vec<Message> {
            self.requests.lock().expect("lock")[index].clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<Message, LlmError> {
            self.requests.lock().expect("lock").push(messages.to_vec());
            let next = self.replies.lock().expect("lock").pop_front();
            match (next, &self.fallback) {
                (Some(reply), _) => reply,
                (None, Some(reply)) => Ok(reply.clone()),
                (None, None) => panic!("script exhausted"),
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    /// Counts invocations; sleeps for `delay_ms`, fails on `fail`.
    #[derive(Default)]
    struct ProbeTool {
        invocations: AtomicUsize,
    }

    #[async_trait]
    impl Tool for ProbeTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("probe", "Test tool")
        }

        async fn invoke(&self, arguments: JsonValue) -> Result<String, ToolError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if let Some(ms) = arguments["delay_ms"].as_u64() {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            if let Some(reason) = arguments["fail"].as_str() {
                return Err(ToolError::ExecutionFailed {
                    name: "probe".to_string(),
                    reason: reason.to_string(),
                });
            }
            Ok(format!("probe:{}", arguments["tag"].as_str().unwrap_or("")))
        }
    }

    fn tool_turn(calls: &[(&str, &str, JsonValue)]) -> Message {
        calls.iter().fold(Message::assistant(""), |msg, (id, name, args)| {
            msg.with_tool_call(ToolCall::new(*id, *name, args.clone()))
        })
    }

    fn agent_with(model: Arc<ScriptedModel>, probe: Arc<ProbeTool>) -> Agent {
        let mut registry = ToolRegistry::new();
        registry.register(probe).expect("register probe");
        registry
            .register(Arc::new(RetrievalTool::new()))
            .expect("register retrieval");
        Agent::new(model, Arc::new(registry), AgentConfig::default())
    }

    fn tool_messages(outcome: &AgentOutcome) -> Vec<&Message> {
        outcome
            .conversation
            .messages()
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .collect()
    }

    #[test]
    fn config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.tool_timeout(), Duration::from_secs(30));
        assert!(config.include_history);
    }

    #[tokio::test]
    async fn answers_without_tools_in_one_call() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(Message::assistant("42"))]));
        let probe = Arc::new(ProbeTool::default());
        let agent = agent_with(model.clone(), probe.clone());

        let outcome = agent.run_with_history(&[], "meaning?").await.expect("run");

        assert_eq!(outcome.answer, "42");
        assert_eq!(outcome.model_calls, 1);
        assert_eq!(outcome.tool_calls, 0);
        assert_eq!(model.calls(), 1);
        assert_eq!(probe.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.conversation.len(), 2);
    }

    #[tokio::test]
    async fn run_returns_answer_text() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(Message::assistant("hello"))]));
        let agent = agent_with(model, Arc::new(ProbeTool::default()));
        assert_eq!(agent.run("hi").await.expect("run"), "hello");
    }

    #[tokio::test]
    async fn every_call_sees_system_prompt_and_full_history() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(tool_turn(&[("c1", "probe", json!({"tag": "x"}))])),
            Ok(Message::assistant("done")),
        ]));
        let agent = agent_with(model.clone(), Arc::new(ProbeTool::default()));

        agent.run("question").await.expect("run");

        let first = model.request(0);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].role, MessageRole::System);
        assert_eq!(first[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(first[1].content, "question");

        let second = model.request(1);
        let roles: Vec<_> = second.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool
            ]
        );
    }

    #[tokio::test]
    async fn single_tool_round_trip() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(tool_turn(&[("call_1", "probe", json!({"tag": "a"}))])),
            Ok(Message::assistant("final")),
        ]));
        let probe = Arc::new(ProbeTool::default());
        let agent = agent_with(model.clone(), probe.clone());

        let outcome = agent.run_with_history(&[], "q").await.expect("run");

        assert_eq!(outcome.answer, "final");
        assert_eq!(probe.invocations.load(Ordering::SeqCst), 1);
        assert_eq!(model.calls(), 2);

        let results = tool_messages(&outcome);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(results[0].content, "probe:a");
        assert!(outcome.conversation.tool_results_are_linked());
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(tool_turn(&[("c1", "web_search", json!({"q": "x"}))])),
            Ok(Message::assistant("sorry, I cannot search the web")),
        ]));
        let agent = agent_with(model.clone(), Arc::new(ProbeTool::default()));

        let outcome = agent.run_with_history(&[], "q").await.expect("run");

        let results = tool_messages(&outcome);
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("not available"));
        assert_eq!(model.calls(), 2);
        assert_eq!(outcome.answer, "sorry, I cannot search the web");
    }

    #[tokio::test]
    async fn failing_tool_is_reported_to_the_model() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(tool_turn(&[("c1", "probe", json!({"fail": "index offline"}))])),
            Ok(Message::assistant("the index is offline")),
        ]));
        let agent = agent_with(model.clone(), Arc::new(ProbeTool::default()));

        let outcome = agent.run_with_history(&[], "q").await.expect("run");

        let results = tool_messages(&outcome);
        assert_eq!(results[0].content, "Error: tool 'probe' failed: index offline");
        assert_eq!(model.calls(), 2);
        assert!(outcome.conversation.tool_results_are_linked());
    }

    #[tokio::test(start_paused = true)]
    async fn tool_results_follow_call_order() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(tool_turn(&[
                ("c1", "probe", json!({"tag": "one", "delay_ms": 300})),
                ("c2", "probe", json!({"tag": "two", "delay_ms": 5})),
                ("c3", "probe", json!({"tag": "three", "delay_ms": 50})),
            ])),
            Ok(Message::assistant("done")),
        ]));
        let probe = Arc::new(ProbeTool::default());
        let agent = agent_with(model, probe.clone());

        let outcome = agent.run_with_history(&[], "q").await.expect("run");

        let results: Vec<_> = tool_messages(&outcome)
            .into_iter()
            .map(|m| (m.tool_call_id.clone().unwrap_or_default(), m.content.clone()))
            .collect();
        assert_eq!(
            results,
            [
                ("c1".to_string(), "probe:one".to_string()),
                ("c2".to_string(), "probe:two".to_string()),
                ("c3".to_string(), "probe:three".to_string()),
            ]
        );
        assert_eq!(outcome.tool_calls, 3);
        assert_eq!(probe.invocations.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn endless_tool_requests_hit_the_iteration_bound() {
        let model = Arc::new(ScriptedModel::looping(tool_turn(&[(
            "c1",
            "probe",
            json!({}),
        )])));
        let probe = Arc::new(ProbeTool::default());
        let mut registry = ToolRegistry::new();
        registry.register(probe.clone()).expect("register");
        let agent = Agent::new(
            model.clone(),
            Arc::new(registry),
            AgentConfig::default().with_max_iterations(4),
        );

        let err = agent.run("loop forever").await.unwrap_err();

        assert!(err.to_string().contains("exceeded 4 model iterations"));
        assert_eq!(model.calls(), 4);
        assert_eq!(probe.invocations.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn retrieval_stub_result_is_passed_through() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(tool_turn(&[(
                "r1",
                RETRIEVAL_TOOL_NAME,
                json!({"query": "summary"}),
            )])),
            Ok(Message::assistant("I could not find anything in your documents.")),
        ]));
        let agent = agent_with(model, Arc::new(ProbeTool::default()));

        let outcome = agent.run_with_history(&[], "summarize").await.expect("run");

        let results = tool_messages(&outcome);
        assert!(results[0].content.contains("No PDF retrieval implemented yet"));
    }

    #[tokio::test]
    async fn model_outage_is_surfaced() {
        let model = Arc::new(ScriptedModel::new(vec![Err(LlmError::RequestFailed {
            reason: "connection refused".to_string(),
        })]));
        let agent = agent_with(model, Arc::new(ProbeTool::default()));

        let err = agent.run("q").await.unwrap_err();
        assert!(err.to_string().contains("model unavailable"));
    }

    #[tokio::test]
    async fn duplicate_call_ids_are_protocol_errors() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(tool_turn(&[
            ("same", "probe", json!({})),
            ("same", "probe", json!({})),
        ]))]));
        let probe = Arc::new(ProbeTool::default());
        let agent = agent_with(model, probe.clone());

        let err = agent.run("q").await.unwrap_err();
        assert!(err.to_string().contains("duplicate tool call id 'same'"));
        assert_eq!(probe.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let model = Arc::new(ScriptedModel::new(Vec::new()));
        let agent = agent_with(model.clone(), Arc::new(ProbeTool::default()));

        let err = agent.run("   ").await.unwrap_err();
        assert!(err.to_string().contains("message must not be empty"));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_runs_hit_the_deadline() {
        let model = Arc::new(ScriptedModel::looping(tool_turn(&[(
            "c1",
            "probe",
            json!({"delay_ms": 60_000}),
        )])));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(ProbeTool::default()))
            .expect("register");
        let config = AgentConfig {
            deadline_seconds: 90,
            tool_timeout_seconds: 120,
            ..AgentConfig::default()
        };
        let agent = Agent::new(model, Arc::new(registry), config);

        let err = agent.run("q").await.unwrap_err();
        assert!(err.to_string().contains("did not finish within 90s"));
    }

    #[tokio::test]
    async fn history_precedes_new_question() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(Message::assistant("again"))]));
        let agent = agent_with(model.clone(), Arc::new(ProbeTool::default()));
        let history = [Message::user("earlier"), Message::assistant("earlier answer")];

        let outcome = agent.run_with_history(&history, "now").await.expect("run");

        let sent: Vec<_> = model.request(0).iter().map(|m| m.content.clone()).collect();
        assert_eq!(sent[1..], ["earlier", "earlier answer", "now"]);
        assert_eq!(outcome.conversation.len(), 4);
    }

    #[tokio::test]
    async fn respond_appends_answer_to_session() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(Message::assistant("first answer")),
            Ok(Message::assistant("second answer")),
        ]));
        let agent = agent_with(model.clone(), Arc::new(ProbeTool::default()));
        let mut session = Session::new();

        let first = agent.respond(&mut session, "first question").await;
        assert_eq!(
            first,
            TurnOutcome::Answered {
                answer: "first answer".to_string()
            }
        );
        agent.respond(&mut session, "second question").await;

        let transcript: Vec<_> = session.transcript().map(|m| m.content.as_str()).collect();
        assert_eq!(
            transcript,
            [
                "first question",
                "first answer",
                "second question",
                "second answer"
            ]
        );
        assert_eq!(model.request(1).len(), 4);
        assert_eq!(session.metadata.title.as_deref(), Some("first question"));
    }

    #[tokio::test]
    async fn empty_reply_is_the_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(Message::assistant(""))]));
        let agent = agent_with(model.clone(), Arc::new(ProbeTool::default()));

        let answer = agent.run("q").await.expect("run");

        assert_eq!(answer, "");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn failed_turns_are_left_out_of_history() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(Message::assistant("first answer")),
            Err(LlmError::Timeout),
            Ok(Message::assistant("third answer")),
        ]));
        let agent = agent_with(model.clone(), Arc::new(ProbeTool::default()));
        let mut session = Session::new();

        agent.respond(&mut session, "first").await;
        let failed = agent.respond(&mut session, "second").await;
        assert!(failed.text().starts_with(FAILED_TURN_PREFIX));
        agent.respond(&mut session, "third").await;

        let sent: Vec<_> = model.request(2).iter().map(|m| m.content.clone()).collect();
        assert_eq!(sent[1..], ["first", "first answer", "third"]);
        assert_eq!(session.transcript().count(), 6);
    }

    #[tokio::test]
    async fn history_is_omitted_when_disabled() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(Message::assistant("a"))]));
        let agent = Agent::new(
            model.clone(),
            Arc::new(ToolRegistry::new()),
            AgentConfig {
                include_history: false,
                ..AgentConfig::default()
            },
        );
        let mut session = Session::new();
        session.add_message(Message::user("earlier"));
        session.add_message(Message::assistant("earlier answer"));

        assert!(agent.history_for(&session).is_empty());
        agent.respond(&mut session, "now").await;
        assert_eq!(model.request(0).len(), 2);
    }

    #[tokio::test]
    async fn respond_records_errors_as_assistant_turns() {
        let model = Arc::new(ScriptedModel::new(vec![Err(LlmError::ProviderUnavailable {
            provider: "openai".to_string(),
            reason: "invalid api key".to_string(),
        })]));
        let agent = agent_with(model, Arc::new(ProbeTool::default()));
        let mut session = Session::new();

        let outcome = agent.respond(&mut session, "hello").await;

        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                error: AgentError::ModelUnavailable { .. },
                ..
            }
        ));
        let last = session.last_message().expect("assistant turn");
        assert_eq!(last.role, MessageRole::Assistant);
        assert!(last.content.starts_with("❌ Error: model unavailable"));
        assert_eq!(session.messages.len(), 2);
    }
}

//! Request/response turns over one engine
//!
//! A chat host answers each user message with one [`Turn`]: the replies the
//! engine produced until it suspended on the next `ask` or halted. The
//! pending prompt itself is shown as an assistant message.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::executor::{Engine, EngineError, EngineOptions, NoInput, ScriptedAnswers, Status};
use crate::types::Program;

/// Transcript window a chat host usually renders
pub const DEFAULT_TRANSCRIPT_WINDOW: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown session {id}")]
    UnknownSession { id: Uuid },

    #[error("session is over")]
    Closed,

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The run failed partway through a turn. `messages` were produced
    /// before the failure and are already in the transcript.
    #[error("{source}")]
    Interrupted {
        messages: Vec<ChatMessage>,
        source: EngineError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Awaiting {
    pub var: String,
    pub prompt: String,
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Assistant messages produced by this turn, prompt last
    pub messages: Vec<ChatMessage>,
    pub awaiting: Option<Awaiting>,
    /// The engine halted; no further input is accepted
    pub ended: bool,
}

/* ===================== Session ===================== */

#[derive(Debug)]
pub struct Session {
    engine: Engine,
    transcript: Vec<ChatMessage>,
}

impl Session {
    /// Build an engine for `program` and run it to its first stop.
    pub fn start(program: Arc<Program>, config: &Config) -> Result<(Self, Turn), SessionError> {
        let mut builder = Engine::builder(program)
            .options(EngineOptions::from(config))
            .boxed_classifier(config.classifier.build());
        if let Some(path) = &config.context_file {
            builder = builder.seed_from_store(path);
        }

        let mut session = Self {
            engine: builder.build()?,
            transcript: Vec::new(),
        };
        let turn = session.advance()?;
        Ok((session, turn))
    }

    /// Answer the pending `ask` with `text` and run to the next stop.
    ///
    /// The answer is used once; a second `ask` in the same turn suspends.
    pub fn send(&mut self, text: &str) -> Result<Turn, SessionError> {
        if matches!(self.engine.status(), Status::Halted | Status::Failed { .. }) {
            return Err(SessionError::Closed);
        }

        self.transcript.push(ChatMessage::user(text));
        self.engine.set_ask_handler(ScriptedAnswers::new([text]));
        let turn = self.advance();
        self.engine.set_ask_handler(NoInput);
        turn
    }

    /// Pull until the engine suspends or halts. A failure midway returns
    /// [`SessionError::Interrupted`] with the messages pulled so far.
    fn advance(&mut self) -> Result<Turn, SessionError> {
        let mut messages = Vec::new();

        for line in self.engine.run() {
            let line = match line {
                Ok(line) => line,
                Err(source) => return Err(SessionError::Interrupted { messages, source }),
            };
            let message = ChatMessage::assistant(line);
            self.transcript.push(message.clone());
            messages.push(message);
        }

        let awaiting = self.engine.awaiting().map(|(var, prompt)| Awaiting {
            var: var.to_string(),
            prompt: prompt.to_string(),
        });
        if let Some(awaiting) = &awaiting {
            let prompt = ChatMessage::assistant(awaiting.prompt.clone());
            self.transcript.push(prompt.clone());
            messages.push(prompt);
        }

        Ok(Turn {
            messages,
            awaiting,
            ended: self.engine.is_ended(),
        })
    }

    /// Last `limit` messages of the conversation.
    pub fn transcript(&self, limit: usize) -> &[ChatMessage] {
        let start = self.transcript.len().saturating_sub(limit);
        &self.transcript[start..]
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn is_ended(&self) -> bool {
        self.engine.is_ended()
    }
}

/* ===================== Manager ===================== */

/// Sessions of one host, keyed by random ids.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<Uuid, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, program: Arc<Program>, config: &Config) -> Result<(Uuid, Turn), SessionError> {
        let (session, turn) = Session::start(program, config)?;
        let id = Uuid::new_v4();
        self.sessions.insert(id, session);
        tracing::debug!(%id, "session started");
        Ok((id, turn))
    }

    pub fn send(&mut self, id: Uuid, text: &str) -> Result<Turn, SessionError> {
        self.sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession { id })?
            .send(text)
    }

    pub fn get(&self, id: Uuid) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    const GREETING: &str = r#"
flow main
state greet
  reply "Hello {{name|default:"there"}}"
  ask name "What is your name?"
  goto done
state done
  reply "Nice to meet you, {{name}}"
"#;

    fn program(source: &str) -> Arc<Program> {
        Arc::new(parse(source).expect("Parse failed"))
    }

    #[test]
    fn test_start_suspends_on_first_ask() {
        let (session, turn) = Session::start(program(GREETING), &Config::default()).unwrap();

        assert_eq!(
            turn,
            Turn {
                messages: vec![
                    ChatMessage::assistant("Hello there"),
                    ChatMessage::assistant("What is your name?"),
                ],
                awaiting: Some(Awaiting {
                    var: "name".to_string(),
                    prompt: "What is your name?".to_string()
                }),
                ended: false,
            }
        );
        assert!(!session.is_ended());
    }

    #[test]
    fn test_send_answers_and_ends() {
        let (mut session, _) = Session::start(program(GREETING), &Config::default()).unwrap();
        let turn = session.send("Ann").unwrap();

        assert_eq!(turn.messages, vec![ChatMessage::assistant("Nice to meet you, Ann")]);
        assert_eq!(turn.awaiting, None);
        assert!(turn.ended);

        assert_eq!(
            session.transcript(DEFAULT_TRANSCRIPT_WINDOW),
            &[
                ChatMessage::assistant("Hello there"),
                ChatMessage::assistant("What is your name?"),
                ChatMessage::user("Ann"),
                ChatMessage::assistant("Nice to meet you, Ann"),
            ]
        );
        assert_eq!(session.transcript(1), &[ChatMessage::assistant("Nice to meet you, Ann")]);

        assert!(matches!(session.send("again"), Err(SessionError::Closed)));
    }

    #[test]
    fn test_answer_is_used_once_per_turn() {
        let source = r#"
flow main
state form
  ask name "Name?"
  ask city "City?"
  reply "{{name}} from {{city}}"
"#;

        let (mut session, turn) = Session::start(program(source), &Config::default()).unwrap();
        assert_eq!(turn.messages, vec![ChatMessage::assistant("Name?")]);

        let turn = session.send("Ann").unwrap();
        assert_eq!(turn.messages, vec![ChatMessage::assistant("City?")]);
        assert_eq!(turn.awaiting.map(|a| a.var), Some("city".to_string()));

        let turn = session.send("Oslo").unwrap();
        assert_eq!(turn.messages, vec![ChatMessage::assistant("Ann from Oslo")]);
        assert!(turn.ended);
    }

    #[test]
    fn test_engine_errors_surface() {
        let source = "flow main\nstate a\n  reply \"before\"\n  goto nowhere";
        match Session::start(program(source), &Config::default()) {
            Err(SessionError::Interrupted {
                messages,
                source: EngineError::UnknownState { state, .. },
            }) => {
                assert_eq!(state, "nowhere");
                assert_eq!(messages, vec![ChatMessage::assistant("before")]);
            }
            other => panic!("Expected engine error, got {:?}", other.map(|(_, turn)| turn)),
        }

        let config = Config {
            flow: "missing".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            Session::start(program(GREETING), &config),
            Err(SessionError::Engine(EngineError::FlowNotFound { .. }))
        ));
    }

    #[test]
    fn test_failed_turn_keeps_its_messages() {
        let source = r#"
flow main
state ask_n
  ask n "Number?"
  reply "got {{n}}"
  goto halve
state halve
  set half = n / 2
  reply "half is {{half}}"
"#;
        let (mut session, _) = Session::start(program(source), &Config::default()).unwrap();

        match session.send("abc") {
            Err(SessionError::Interrupted { messages, source }) => {
                assert_eq!(messages, vec![ChatMessage::assistant("got abc")]);
                assert!(matches!(source, EngineError::Expression { .. }));
            }
            other => panic!("Expected interrupted turn, got {:?}", other),
        }
        assert_eq!(
            session.transcript(2),
            &[ChatMessage::user("abc"), ChatMessage::assistant("got abc")]
        );
        assert!(matches!(session.send("4"), Err(SessionError::Closed)));
    }

    #[test]
    fn test_manager_routes_by_id() {
        let mut manager = SessionManager::new();
        let (first, _) = manager.start(program(GREETING), &Config::default()).unwrap();
        let (second, _) = manager.start(program(GREETING), &Config::default()).unwrap();
        assert_ne!(first, second);
        assert_eq!(manager.len(), 2);

        let turn = manager.send(second, "Bo").unwrap();
        assert_eq!(turn.messages, vec![ChatMessage::assistant("Nice to meet you, Bo")]);
        assert!(!manager.get(first).unwrap().is_ended());

        assert!(manager.remove(second).is_some());
        let missing = manager.send(second, "hi").unwrap_err();
        assert!(matches!(missing, SessionError::UnknownSession { id } if id == second));
    }

    #[test]
    fn test_turn_serializes_for_chat_clients() {
        let (_, turn) = Session::start(program(GREETING), &Config::default()).unwrap();
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["messages"][0]["role"], "assistant");
        assert_eq!(json["awaiting"]["var"], "name");
        assert_eq!(json["ended"], false);
    }
}

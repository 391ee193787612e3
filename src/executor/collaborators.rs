//! Collaborators the engine is given instead of reaching for I/O itself
//!
//! - [`AskHandler`] answers `ask` actions
//! - [`IntentClassifier`] suggests a next state from a free-text answer

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

/* ===================== Ask ===================== */

/// Supplies answers to `ask` actions.
///
/// Returning `None` means the answer is not available yet: the engine
/// suspends at the same `ask` and calls the handler again on the next pull.
pub trait AskHandler: Send {
    fn ask(&mut self, var: &str, prompt: &str) -> Option<String>;
}

impl<F> AskHandler for F
where
    F: FnMut(&str, &str) -> Option<String> + Send,
{
    fn ask(&mut self, var: &str, prompt: &str) -> Option<String> {
        self(var, prompt)
    }
}

/// Never answers. Every unbound `ask` suspends the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl AskHandler for NoInput {
    fn ask(&mut self, _var: &str, _prompt: &str) -> Option<String> {
        None
    }
}

/// Answers from a queue, one answer per call, then suspends.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAnswers {
    answers: VecDeque<String>,
}

impl ScriptedAnswers {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, answer: impl Into<String>) {
        self.answers.push_back(answer.into());
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl AskHandler for ScriptedAnswers {
    fn ask(&mut self, _var: &str, _prompt: &str) -> Option<String> {
        self.answers.pop_front()
    }
}

/// Prompts on a writer and reads one line per answer.
///
/// End of input counts as "no answer yet", which suspends the run.
pub struct TerminalAsk<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalAsk<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{} ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl TerminalAsk<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> AskHandler for TerminalAsk<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn ask(&mut self, var: &str, prompt: &str) -> Option<String> {
        match self.read_answer(prompt) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(var, error = %e, "failed to read answer");
                None
            }
        }
    }
}

/* ===================== Intent Classification ===================== */

/// Suggests a next state for a free-text answer.
///
/// The engine only follows a suggestion that names a state of the flow
/// other than `excluded`.
pub trait IntentClassifier: Send {
    fn classify(&self, utterance: &str, candidates: &[String], excluded: &str) -> Option<String>;
}

/// Never suggests anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClassifier;

impl IntentClassifier for NoopClassifier {
    fn classify(&self, _utterance: &str, _candidates: &[String], _excluded: &str) -> Option<String> {
        None
    }
}

/// Offline classifier: picks the first candidate whose name appears in the
/// utterance, or that contains the whole utterance. Case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, utterance: &str, candidates: &[String], excluded: &str) -> Option<String> {
        let text = utterance.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }

        candidates
            .iter()
            .filter(|candidate| candidate.as_str() != excluded)
            .find(|candidate| {
                let name = candidate.to_lowercase();
                text.contains(&name) || name.contains(&text)
            })
            .cloned()
    }
}

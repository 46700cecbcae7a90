//! Classification engine: validated panel registry and per-session
//! decision-tree traversal.
//!
//! Panels are validated when registered (fail fast); a malformed tree is
//! never traversable. Sessions own their traversal state, so independent
//! traversals over the same panel share nothing mutable.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    Answer, ClassificationResult, DecisionStep, Node, NodeKind, Panel, PanelError,
};

/// Input errors raised during traversal. These are the caller's fault and
/// never indicate a malformed tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("node {node} expects {expected}, got answer {got}")]
    InvalidAnswer {
        node: String,
        expected: &'static str,
        got: String,
    },

    #[error("node {node} has no option {option}")]
    UnknownOption { node: String, option: String },

    #[error("traversal already finished")]
    AlreadyFinished,

    #[error("answer sequence exhausted before reaching an end node")]
    AnswersExhausted,

    #[error("unknown panel {0}")]
    UnknownPanel(String),
}

/// Result of one traversal step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Advanced to the named node; more input required
    Advanced { node_id: String },
    /// Reached an end node; traversal is complete
    Finished(ClassificationResult),
}

/// One in-progress traversal of a panel
pub struct ClassificationSession {
    panel: Arc<Panel>,
    current: String,
    path: Vec<DecisionStep>,
    finished: bool,
}

impl ClassificationSession {
    /// Begin a traversal at the panel's start node.
    ///
    /// The panel must already be validated (the registry guarantees this).
    pub fn new(panel: Arc<Panel>) -> Self {
        let current = panel.start_node_id.clone();
        Self {
            panel,
            current,
            path: Vec::new(),
            finished: false,
        }
    }

    /// The node awaiting input
    pub fn current_node(&self) -> &Node {
        // Targets were resolved at load time
        self.panel
            .node(&self.current)
            .expect("validated panel has no dangling targets")
    }

    /// The path accumulated so far
    pub fn decision_path(&self) -> &[DecisionStep] {
        &self.path
    }

    /// Apply one answer to the current node.
    ///
    /// Start/screenshot nodes take [`Answer::Continue`]; question nodes
    /// take yes/no; select nodes take a matching option id. An unmatched
    /// select id is an input error, not a tree error.
    pub fn step(&mut self, answer: Answer) -> Result<StepOutcome, EngineError> {
        if self.finished {
            return Err(EngineError::AlreadyFinished);
        }

        let node = self.current_node().clone();
        let next_id = match (&node.kind, &answer) {
            (NodeKind::Start { continue_target }, Answer::Continue)
            | (NodeKind::Screenshot { continue_target }, Answer::Continue) => {
                continue_target.clone()
            }
            (NodeKind::Start { .. }, other) | (NodeKind::Screenshot { .. }, other) => {
                return Err(EngineError::InvalidAnswer {
                    node: node.id,
                    expected: "continue",
                    got: other.to_string(),
                });
            }
            (NodeKind::Question { yes_target, .. }, Answer::Yes) => yes_target.clone(),
            (NodeKind::Question { no_target, .. }, Answer::No) => no_target.clone(),
            (NodeKind::Question { .. }, other) => {
                return Err(EngineError::InvalidAnswer {
                    node: node.id,
                    expected: "yes or no",
                    got: other.to_string(),
                });
            }
            (NodeKind::Select { select_options }, Answer::Select(option)) => select_options
                .iter()
                .find(|o| o.id == *option)
                .map(|o| o.next_node_id.clone())
                .ok_or_else(|| EngineError::UnknownOption {
                    node: node.id.clone(),
                    option: option.clone(),
                })?,
            (NodeKind::Select { .. }, other) => {
                return Err(EngineError::InvalidAnswer {
                    node: node.id,
                    expected: "a select option id",
                    got: other.to_string(),
                });
            }
            (NodeKind::End { .. }, _) => {
                // Unreachable through step(): reaching an End finishes the
                // session before another answer is accepted.
                return Err(EngineError::AlreadyFinished);
            }
        };

        self.path.push(DecisionStep {
            node_id: node.id.clone(),
            node_text: node.node_text.clone(),
            answer: answer.to_string(),
        });
        debug!(panel = %self.panel.id, from = %node.id, to = %next_id, "classification step");

        self.current = next_id.clone();
        let next = self.current_node().clone();
        if let NodeKind::End { outcome } = &next.kind {
            self.path.push(DecisionStep {
                node_id: next.id.clone(),
                node_text: next.node_text.clone(),
                answer: outcome.classification.clone(),
            });
            self.finished = true;
            return Ok(StepOutcome::Finished(ClassificationResult {
                panel: self.panel.id.clone(),
                classification: outcome.classification.clone(),
                category: outcome.category.clone(),
                description: outcome.description.clone(),
                success: true,
                decision_path: self.path.clone(),
            }));
        }

        Ok(StepOutcome::Advanced { node_id: next_id })
    }

    /// Replay a full answer sequence to a result.
    ///
    /// Deterministic: the same answers against the same panel version yield
    /// an identical path and result.
    pub fn run(
        panel: Arc<Panel>,
        answers: &[Answer],
    ) -> Result<ClassificationResult, EngineError> {
        let mut session = Self::new(panel);
        for answer in answers {
            match session.step(answer.clone())? {
                StepOutcome::Finished(result) => return Ok(result),
                StepOutcome::Advanced { .. } => {}
            }
        }
        Err(EngineError::AnswersExhausted)
    }
}

/// Validated panels, resolvable by id or jurisdiction code
#[derive(Default)]
pub struct PanelRegistry {
    panels: HashMap<String, Arc<Panel>>,
    by_jurisdiction: HashMap<String, String>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a panel, rejecting malformed trees before they are usable
    pub fn insert(&mut self, panel: Panel) -> Result<(), PanelError> {
        panel.validate()?;
        for code in &panel.jurisdiction_codes {
            self.by_jurisdiction
                .insert(code.to_uppercase(), panel.id.clone());
        }
        self.panels.insert(panel.id.clone(), Arc::new(panel));
        Ok(())
    }

    /// Parse and register a JSON array of panels
    pub fn load_json(&mut self, json: &str) -> Result<usize, PanelLoadError> {
        let panels: Vec<Panel> = serde_json::from_str(json)?;
        let count = panels.len();
        for panel in panels {
            self.insert(panel)?;
        }
        Ok(count)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Panel>> {
        self.panels.get(id).cloned()
    }

    pub fn for_jurisdiction(&self, code: &str) -> Option<Arc<Panel>> {
        let id = self.by_jurisdiction.get(&code.to_uppercase())?;
        self.get(id)
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn panel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.panels.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Panel registration failures: malformed JSON or a malformed tree
#[derive(Debug, thiserror::Error)]
pub enum PanelLoadError {
    #[error("panel file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] PanelError),
}

//! Decision-tree entities for jurisdiction-specific classification panels.
//!
//! A panel is a directed graph of typed nodes. Each node kind is its own
//! variant carrying only the fields that kind uses, so a `select` node
//! without options is unrepresentable rather than tolerated. Panels are
//! validated in full when loaded; traversal never has to handle a
//! malformed tree.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Terminal outcome carried by an `end` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Regulatory classification code (e.g. "FE-NFE-IGE")
    pub classification: String,
    /// Broad category the classification falls under
    pub category: String,
    /// Human-readable explanation
    pub description: String,
}

/// One choice offered by a `select` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOption {
    pub id: String,
    pub text: String,
    pub next_node_id: String,
}

/// Node behavior, one variant per node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum NodeKind {
    /// Entry point; advances unconditionally
    Start { continue_target: String },
    /// Informational screen; advances unconditionally
    Screenshot { continue_target: String },
    /// Multiple-choice branch
    Select { select_options: Vec<SelectOption> },
    /// Yes/no branch
    Question {
        yes_target: String,
        no_target: String,
    },
    /// Terminal node emitting the classification outcome
    End { outcome: Outcome },
}

/// A single node in a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub node_text: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// A jurisdiction's decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: String,
    pub jurisdiction_codes: Vec<String>,
    pub start_node_id: String,
    pub nodes: Vec<Node>,
}

/// Structural defects that reject a panel at load time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("panel {panel}: duplicate node id {id}")]
    DuplicateNodeId { panel: String, id: String },

    #[error("panel {panel}: start node {id} does not exist")]
    UnknownStartNode { panel: String, id: String },

    #[error("panel {panel}: start node {id} is not a start node")]
    StartNodeWrongKind { panel: String, id: String },

    #[error("panel {panel}: node {node} targets nonexistent node {target}")]
    DanglingTarget {
        panel: String,
        node: String,
        target: String,
    },

    #[error("panel {panel}: select node {node} has no options")]
    EmptySelect { panel: String, node: String },

    #[error("panel {panel}: cycle through node {node}")]
    Cycle { panel: String, node: String },
}

impl Panel {
    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Validate the full node graph before the panel is usable.
    ///
    /// Checks: unique node ids, start node resolves to a `start` node,
    /// every target resolves, select nodes carry options, and the graph is
    /// acyclic (acyclicity guarantees every traversal terminates at an
    /// `end` node, since only `end` nodes lack outgoing edges).
    pub fn validate(&self) -> Result<(), PanelError> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(PanelError::DuplicateNodeId {
                    panel: self.id.clone(),
                    id: node.id.clone(),
                });
            }
        }

        let start = self
            .node(&self.start_node_id)
            .ok_or_else(|| PanelError::UnknownStartNode {
                panel: self.id.clone(),
                id: self.start_node_id.clone(),
            })?;
        if !matches!(start.kind, NodeKind::Start { .. }) {
            return Err(PanelError::StartNodeWrongKind {
                panel: self.id.clone(),
                id: start.id.clone(),
            });
        }

        for node in &self.nodes {
            for target in node_targets(node) {
                if !ids.contains(target) {
                    return Err(PanelError::DanglingTarget {
                        panel: self.id.clone(),
                        node: node.id.clone(),
                        target: target.to_string(),
                    });
                }
            }
            if let NodeKind::Select { select_options } = &node.kind {
                if select_options.is_empty() {
                    return Err(PanelError::EmptySelect {
                        panel: self.id.clone(),
                        node: node.id.clone(),
                    });
                }
            }
        }

        self.check_acyclic()?;
        Ok(())
    }

    /// DFS cycle detection over the whole node graph
    fn check_acyclic(&self) -> Result<(), PanelError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        let by_id: HashMap<&str, &Node> = self.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut marks: HashMap<&str, Mark> = HashMap::new();

        for root in &self.nodes {
            if marks.contains_key(root.id.as_str()) {
                continue;
            }

            // Explicit stack; (node, targets, next-child-index) frames
            let mut stack: Vec<(&str, Vec<&str>, usize)> = Vec::new();
            marks.insert(root.id.as_str(), Mark::InProgress);
            stack.push((root.id.as_str(), node_targets(root), 0));

            while let Some((node_id, targets, next)) = stack.pop() {
                if next >= targets.len() {
                    marks.insert(node_id, Mark::Done);
                    continue;
                }
                let child = targets[next];
                stack.push((node_id, targets, next + 1));

                match marks.get(child) {
                    Some(Mark::InProgress) => {
                        return Err(PanelError::Cycle {
                            panel: self.id.clone(),
                            node: child.to_string(),
                        });
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::InProgress);
                        stack.push((child, node_targets(by_id[child]), 0));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Outgoing edges of a node
fn node_targets(node: &Node) -> Vec<&str> {
    match &node.kind {
        NodeKind::Start { continue_target } | NodeKind::Screenshot { continue_target } => {
            vec![continue_target.as_str()]
        }
        NodeKind::Select { select_options } => select_options
            .iter()
            .map(|o| o.next_node_id.as_str())
            .collect(),
        NodeKind::Question {
            yes_target,
            no_target,
        } => vec![yes_target.as_str(), no_target.as_str()],
        NodeKind::End { .. } => Vec::new(),
    }
}

/// A caller-supplied answer for one traversal step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    /// Acknowledge a start/screenshot node
    Continue,
    Yes,
    No,
    /// A `select` option id
    Select(String),
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Continue => write!(f, "continue"),
            Answer::Yes => write!(f, "yes"),
            Answer::No => write!(f, "no"),
            Answer::Select(id) => write!(f, "{id}"),
        }
    }
}

impl Answer {
    /// Parse the wire form used by the run endpoint: `continue`, `yes`,
    /// `no`, or a select-option id.
    pub fn parse(s: &str) -> Self {
        match s {
            "continue" => Answer::Continue,
            "yes" => Answer::Yes,
            "no" => Answer::No,
            other => Answer::Select(other.to_string()),
        }
    }
}

/// One visited node in a decision path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionStep {
    pub node_id: String,
    pub node_text: String,
    pub answer: String,
}

/// Result of a completed panel traversal.
///
/// `decision_path` is the audit trail of why the classification was
/// reached: replaying the same answers against the same panel version
/// yields an identical path and result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub panel: String,
    pub classification: String,
    pub category: String,
    pub description: String,
    pub success: bool,
    pub decision_path: Vec<DecisionStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(id: &str, target: &str) -> Node {
        Node {
            id: id.to_string(),
            node_text: "start".to_string(),
            kind: NodeKind::Start {
                continue_target: target.to_string(),
            },
        }
    }

    fn question(id: &str, yes: &str, no: &str) -> Node {
        Node {
            id: id.to_string(),
            node_text: format!("question {id}"),
            kind: NodeKind::Question {
                yes_target: yes.to_string(),
                no_target: no.to_string(),
            },
        }
    }

    fn end(id: &str, classification: &str) -> Node {
        Node {
            id: id.to_string(),
            node_text: "done".to_string(),
            kind: NodeKind::End {
                outcome: Outcome {
                    classification: classification.to_string(),
                    category: "test".to_string(),
                    description: "test outcome".to_string(),
                },
            },
        }
    }

    fn panel(nodes: Vec<Node>) -> Panel {
        Panel {
            id: "p1".to_string(),
            jurisdiction_codes: vec!["DE".to_string()],
            start_node_id: "s".to_string(),
            nodes,
        }
    }

    #[test]
    fn test_valid_panel_passes() {
        let p = panel(vec![
            start("s", "q1"),
            question("q1", "e1", "e2"),
            end("e1", "A"),
            end("e2", "B"),
        ]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_dangling_target_rejected() {
        let p = panel(vec![start("s", "q1"), question("q1", "missing", "e1"), end("e1", "A")]);
        let err = p.validate().unwrap_err();
        assert!(matches!(err, PanelError::DanglingTarget { ref target, .. } if target == "missing"));
    }

    #[test]
    fn test_unknown_start_rejected() {
        let mut p = panel(vec![start("s", "e1"), end("e1", "A")]);
        p.start_node_id = "nope".to_string();
        assert!(matches!(p.validate().unwrap_err(), PanelError::UnknownStartNode { .. }));
    }

    #[test]
    fn test_start_wrong_kind_rejected() {
        let mut p = panel(vec![start("s", "e1"), end("e1", "A")]);
        p.start_node_id = "e1".to_string();
        assert!(matches!(p.validate().unwrap_err(), PanelError::StartNodeWrongKind { .. }));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let p = panel(vec![start("s", "e1"), end("e1", "A"), end("e1", "B")]);
        assert!(matches!(p.validate().unwrap_err(), PanelError::DuplicateNodeId { .. }));
    }

    #[test]
    fn test_empty_select_rejected() {
        let p = panel(vec![
            start("s", "sel"),
            Node {
                id: "sel".to_string(),
                node_text: "pick".to_string(),
                kind: NodeKind::Select {
                    select_options: vec![],
                },
            },
        ]);
        assert!(matches!(p.validate().unwrap_err(), PanelError::EmptySelect { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let p = panel(vec![
            start("s", "q1"),
            question("q1", "q2", "e1"),
            question("q2", "q1", "e1"),
            end("e1", "A"),
        ]);
        assert!(matches!(p.validate().unwrap_err(), PanelError::Cycle { .. }));
    }

    #[test]
    fn test_cycle_outside_start_path_also_rejected() {
        // Even a cycle the start node never reaches marks the tree
        // malformed; validation covers the whole graph.
        let p = panel(vec![
            start("s", "e1"),
            end("e1", "A"),
            question("island1", "island2", "island2"),
            question("island2", "island1", "island1"),
        ]);
        assert!(matches!(p.validate().unwrap_err(), PanelError::Cycle { .. }));
    }

    #[test]
    fn test_panel_json_roundtrip() {
        let p = panel(vec![
            start("s", "q1"),
            question("q1", "e1", "e1"),
            end("e1", "A"),
        ]);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains(r#""nodeType":"question""#));
        assert!(json.contains(r#""yesTarget":"e1""#));
        let back: Panel = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_end_without_outcome_fails_deserialization() {
        // Missing outcome on an end node is unrepresentable; the JSON is
        // rejected at parse time, before any traversal.
        let json = r#"{"id":"e1","nodeText":"done","nodeType":"end"}"#;
        assert!(serde_json::from_str::<Node>(json).is_err());
    }

    #[test]
    fn test_answer_parse() {
        assert_eq!(Answer::parse("yes"), Answer::Yes);
        assert_eq!(Answer::parse("no"), Answer::No);
        assert_eq!(Answer::parse("continue"), Answer::Continue);
        assert_eq!(Answer::parse("opt-3"), Answer::Select("opt-3".to_string()));
    }
}

use std::collections::BTreeSet;

use crate::error::Result;
use crate::store::{Cmp, Column, Filter, Select, TreeNode, TreeStore};
use crate::tree::{Bounds, NestedSet};

const MAX_FINDINGS: usize = 32;

/// Indicates the severity level of a verification finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifySeverity {
    /// Informational message about the verification process.
    Info,
    /// Structural violation of the boundary encoding.
    Error,
}

/// Represents a single issue discovered during verification.
#[derive(Clone, Debug)]
pub struct VerifyFinding {
    /// The severity level of this finding.
    pub severity: VerifySeverity,
    /// Tree the finding belongs to, `None` for store-wide findings.
    pub scope: Option<i64>,
    /// Human-readable description of the issue.
    pub message: String,
}

/// Statistics collected during the verification process.
#[derive(Clone, Debug, Default)]
pub struct VerifyCounts {
    /// Attached nodes examined.
    pub nodes: u64,
    /// Trees examined.
    pub scopes: u64,
    /// Rows without valid boundaries.
    pub detached: u64,
}

/// Complete report of a verification operation.
#[derive(Clone, Debug, Default)]
pub struct VerifyReport {
    /// Whether verification passed without finding any error.
    pub success: bool,
    /// List of issues discovered during verification.
    pub findings: Vec<VerifyFinding>,
    /// Statistics about the trees examined.
    pub counts: VerifyCounts,
}

impl VerifyReport {
    fn push(&mut self, severity: VerifySeverity, scope: Option<i64>, message: String) {
        if self.findings.len() < MAX_FINDINGS {
            self.findings.push(VerifyFinding {
                severity,
                scope,
                message,
            });
        }
    }

    fn error(&mut self, scope: i64, message: String) {
        self.success = false;
        self.push(VerifySeverity::Error, Some(scope), message);
    }
}

/// Verifies every tree in the store.
///
/// Without scoping the whole store is checked as a single tree.
pub fn verify<S: TreeStore>(tree: &NestedSet<S>) -> Result<VerifyReport> {
    let mut report = VerifyReport {
        success: true,
        ..VerifyReport::default()
    };
    if tree.scoping() {
        for scope in tree.scopes()? {
            check_scope(tree, scope, &mut report)?;
        }
    } else {
        check_scope(tree, 0, &mut report)?;
    }

    let detached = Filter::new().and(Column::Left, Cmp::Lt, 1);
    report.counts.detached = tree.store().select(&Select::filter(detached))?.len() as u64;
    if report.counts.detached > 0 {
        let message = format!("{} detached row(s)", report.counts.detached);
        report.push(VerifySeverity::Info, None, message);
    }
    Ok(report)
}

/// Verifies one tree.
pub fn verify_scope<S: TreeStore>(tree: &NestedSet<S>, scope: i64) -> Result<VerifyReport> {
    let mut report = VerifyReport {
        success: true,
        ..VerifyReport::default()
    };
    check_scope(tree, scope, &mut report)?;
    Ok(report)
}

fn check_scope<S: TreeStore>(
    tree: &NestedSet<S>,
    scope: i64,
    report: &mut VerifyReport,
) -> Result<()> {
    let nodes: Vec<(String, Bounds)> = tree
        .tree(scope)?
        .iter()
        .map(|node| (label(node), node.bounds()))
        .collect();
    report.counts.scopes += 1;
    report.counts.nodes += nodes.len() as u64;
    if nodes.is_empty() {
        report.push(VerifySeverity::Info, Some(scope), "tree is empty".into());
        return Ok(());
    }

    check_shapes(scope, &nodes, report);
    check_boundary_set(scope, &nodes, report);
    check_nesting(scope, &nodes, report);
    Ok(())
}

fn label<N: TreeNode>(node: &N) -> String {
    match node.id() {
        Some(id) => format!("node {id}"),
        None => "unsaved node".into(),
    }
}

fn check_shapes(scope: i64, nodes: &[(String, Bounds)], report: &mut VerifyReport) {
    for (label, b) in nodes {
        if !b.is_valid() {
            report.error(scope, format!("{label} has right {} <= left {}", b.right, b.left));
        } else if (b.right - b.left) % 2 == 0 {
            report.error(scope, format!("{label} spans an even width ({}, {})", b.left, b.right));
        }
        if b.level < 0 {
            report.error(scope, format!("{label} has negative level {}", b.level));
        }
    }

    let roots: Vec<&(String, Bounds)> = nodes.iter().filter(|(_, b)| b.is_root()).collect();
    match roots.as_slice() {
        [] => report.error(scope, "no root (left = 1)".into()),
        [(label, root)] => {
            if root.level != 0 {
                report.error(scope, format!("root {label} has level {}", root.level));
            }
            let expected = 2 * nodes.len() as i64;
            if root.right != expected {
                report.error(
                    scope,
                    format!("root {label} has right {}, expected {expected}", root.right),
                );
            }
        }
        many => report.error(scope, format!("{} nodes claim left = 1", many.len())),
    }
}

// Boundary values must be exactly 1..=2N.
fn check_boundary_set(scope: i64, nodes: &[(String, Bounds)], report: &mut VerifyReport) {
    let expected = 2 * nodes.len() as i64;
    let mut seen = BTreeSet::new();
    for (label, b) in nodes {
        for value in [b.left, b.right] {
            if !seen.insert(value) {
                report.error(scope, format!("{label} reuses boundary {value}"));
            }
            if value < 1 || value > expected {
                report.error(
                    scope,
                    format!("{label} boundary {value} outside 1..={expected}"),
                );
            }
        }
    }
    let missing = (1..=expected).filter(|v| !seen.contains(v)).count();
    if missing > 0 {
        report.error(scope, format!("{missing} boundary value(s) missing from 1..={expected}"));
    }
}

// Pre-order sweep with an ancestor stack: every node must close inside its enclosing
// interval and sit exactly one level below it.
fn check_nesting(scope: i64, nodes: &[(String, Bounds)], report: &mut VerifyReport) {
    let mut stack: Vec<&(String, Bounds)> = Vec::new();
    for entry in nodes {
        let (label, b) = entry;
        while stack.last().is_some_and(|(_, open)| open.right < b.left) {
            stack.pop();
        }
        if let Some((parent, open)) = stack.last() {
            if b.right >= open.right {
                report.error(
                    scope,
                    format!("{label} ({}, {}) overlaps {parent} ({}, {})", b.left, b.right, open.left, open.right),
                );
            } else if b.level != open.level + 1 {
                report.error(
                    scope,
                    format!("{label} has level {}, parent {parent} has level {}", b.level, open.level),
                );
            }
        }
        stack.push(entry);
    }
}

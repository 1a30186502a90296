//! Read-only catalog of preset example graphs.
//!
//! Templates are static reference data for the editor's "load example"
//! menu. They are never persisted; a user who edits one saves it as an
//! ordinary project.

use serde::Serialize;

/// One example graph.
///
/// `nodes` is a comma-separated label list and `edges` a newline-separated
/// list of `A-B` pairs, the same text format the editor accepts as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub nodes: &'static str,
    pub edges: &'static str,
    pub category: &'static str,
}

impl GraphTemplate {
    /// Node labels, trimmed, blanks dropped.
    pub fn node_labels(&self) -> Vec<&'static str> {
        self.nodes
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .collect()
    }

    /// Edge endpoints in declaration order. Lines without a `-` are skipped.
    pub fn edge_pairs(&self) -> Vec<(&'static str, &'static str)> {
        self.edges
            .lines()
            .filter_map(|line| line.trim().split_once('-'))
            .map(|(a, b)| (a.trim(), b.trim()))
            .collect()
    }
}

static CATALOG: &[GraphTemplate] = &[
    GraphTemplate {
        name: "Hamming H(2,2)",
        description: "Binary words of length 2 joined when they differ in one bit (a 4-cycle)",
        nodes: "00,01,10,11",
        edges: "00-01\n00-10\n01-11\n10-11",
        category: "hamming",
    },
    GraphTemplate {
        name: "Hamming H(3,2)",
        description: "Binary words of length 3 at Hamming distance 1: the 3-cube",
        nodes: "000,001,010,011,100,101,110,111",
        edges: "000-001\n000-010\n000-100\n001-011\n001-101\n010-011\n\
                010-110\n011-111\n100-101\n100-110\n101-111\n110-111",
        category: "hamming",
    },
    GraphTemplate {
        name: "Hamming H(2,3)",
        description: "Ternary words of length 2 at Hamming distance 1 (the 3x3 rook's graph)",
        nodes: "00,01,02,10,11,12,20,21,22",
        edges: "00-01\n00-02\n01-02\n10-11\n10-12\n11-12\n20-21\n20-22\n21-22\n\
                00-10\n00-20\n10-20\n01-11\n01-21\n11-21\n02-12\n02-22\n12-22",
        category: "hamming",
    },
    GraphTemplate {
        name: "Complete K4",
        description: "Every pair of four vertices adjacent",
        nodes: "A,B,C,D",
        edges: "A-B\nA-C\nA-D\nB-C\nB-D\nC-D",
        category: "classic",
    },
    GraphTemplate {
        name: "Cycle C5",
        description: "Five vertices in a ring",
        nodes: "A,B,C,D,E",
        edges: "A-B\nB-C\nC-D\nD-E\nE-A",
        category: "classic",
    },
    GraphTemplate {
        name: "Petersen",
        description: "Outer 5-cycle, inner pentagram, joined by spokes",
        nodes: "0,1,2,3,4,5,6,7,8,9",
        edges: "0-1\n1-2\n2-3\n3-4\n4-0\n0-5\n1-6\n2-7\n3-8\n4-9\n\
                5-7\n7-9\n9-6\n6-8\n8-5",
        category: "classic",
    },
    GraphTemplate {
        name: "Star S5",
        description: "One hub connected to five leaves",
        nodes: "Hub,L1,L2,L3,L4,L5",
        edges: "Hub-L1\nHub-L2\nHub-L3\nHub-L4\nHub-L5",
        category: "tree",
    },
    GraphTemplate {
        name: "Path P4",
        description: "Four vertices in a line",
        nodes: "A,B,C,D",
        edges: "A-B\nB-C\nC-D",
        category: "tree",
    },
];

/// Every template, in menu order.
pub fn catalog() -> &'static [GraphTemplate] {
    CATALOG
}

/// Look a template up by exact name.
pub fn find(name: &str) -> Option<&'static GraphTemplate> {
    CATALOG.iter().find(|t| t.name == name)
}

/// Distinct categories, in first-appearance order.
pub fn categories() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for template in CATALOG {
        if !seen.contains(&template.category) {
            seen.push(template.category);
        }
    }
    seen
}

// ── tests ────────────────────────────────────────────────────────────

//! Evaluation order.
//!
//! Strongly connected components of the dependency graph become iteration
//! groups; the condensed graph is then ordered with Kahn's algorithm. Among
//! ready stages the one containing the earliest-registered component runs
//! first, so the order is fully determined by the graph and registration
//! order.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use ef_core::CompId;
use ef_graph::WiringGraph;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// One step of the evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// An acyclic component, evaluated once per pass.
    Single(CompId),
    /// Mutually dependent components, sub-iterated as a block. Members are in
    /// registration order.
    IterationGroup(Vec<CompId>),
}

impl Stage {
    pub fn members(&self) -> &[CompId] {
        match self {
            Stage::Single(c) => std::slice::from_ref(c),
            Stage::IterationGroup(members) => members,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Stage::IterationGroup(_))
    }
}

/// Evaluation order computed once at freeze time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    stages: Vec<Stage>,
}

impl Schedule {
    pub fn from_graph(graph: &WiringGraph) -> Self {
        Self::from_dependencies(graph.components().len(), &graph.dependencies())
    }

    /// Build from `component_count` components and `(producer, consumer)` edges.
    pub fn from_dependencies(component_count: usize, edges: &[(CompId, CompId)]) -> Self {
        let mut g: DiGraph<CompId, ()> = DiGraph::with_capacity(component_count, edges.len());
        let nodes: Vec<NodeIndex> = (0..component_count)
            .map(|i| g.add_node(CompId::from_index(i as u32)))
            .collect();
        for &(from, to) in edges {
            if let (Some(&a), Some(&b)) = (nodes.get(from.slot()), nodes.get(to.slot())) {
                g.update_edge(a, b, ());
            }
        }

        // Strongly connected components, members in registration order.
        let mut sccs: Vec<Vec<CompId>> = tarjan_scc(&g)
            .into_iter()
            .map(|scc| {
                let mut members: Vec<CompId> = scc.into_iter().map(|n| g[n]).collect();
                members.sort();
                members
            })
            .collect();
        sccs.sort_by_key(|members| members.first().copied());

        let mut scc_of = vec![0usize; component_count];
        for (s, members) in sccs.iter().enumerate() {
            for c in members {
                scc_of[c.slot()] = s;
            }
        }

        // Condensation edges and in-degrees.
        let mut cond: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); sccs.len()];
        for &(from, to) in edges {
            let (Some(&a), Some(&b)) = (scc_of.get(from.slot()), scc_of.get(to.slot())) else {
                continue;
            };
            if a != b {
                cond[a].insert(b);
            }
        }
        let mut in_degree = vec![0usize; sccs.len()];
        for targets in &cond {
            for &t in targets {
                in_degree[t] += 1;
            }
        }

        // Kahn's algorithm; sccs are sorted by first member, so the smallest
        // scc index is the earliest-registered ready stage.
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(s, _)| Reverse(s))
            .collect();
        let mut stages = Vec::with_capacity(sccs.len());
        while let Some(Reverse(s)) = ready.pop() {
            let members = &sccs[s];
            let self_loop = members.len() == 1 && edges.contains(&(members[0], members[0]));
            stages.push(if members.len() > 1 || self_loop {
                Stage::IterationGroup(members.clone())
            } else {
                Stage::Single(members[0])
            });
            for &t in &cond[s] {
                in_degree[t] -= 1;
                if in_degree[t] == 0 {
                    ready.push(Reverse(t));
                }
            }
        }

        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn group_count(&self) -> usize {
        self.stages.iter().filter(|s| s.is_group()).count()
    }

    /// Flattened component order.
    pub fn order(&self) -> Vec<CompId> {
        self.stages
            .iter()
            .flat_map(|s| s.members().iter().copied())
            .collect()
    }
}

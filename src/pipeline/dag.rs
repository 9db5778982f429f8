// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! DAG (Directed Acyclic Graph) builder for stage data dependencies
//!
//! Edges come from stage inputs. A stage may only read outputs of stages
//! declared before it, so the declaration order is always a valid
//! topological order and cycles cannot be expressed.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use crate::errors::MlpipeError;
use crate::pipeline::Pipeline;

/// Builder for stage dependency DAGs
pub struct DagBuilder {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    names: Vec<String>,
}

impl DagBuilder {
    /// Build a DAG from a pipeline
    ///
    /// Fails on the first duplicate stage name or the first input that does
    /// not resolve to a declared output of an earlier stage.
    pub fn build(pipeline: &Pipeline) -> Result<Self, MlpipeError> {
        let mut builder = Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            names: Vec::with_capacity(pipeline.stages.len()),
        };

        for (idx, stage) in pipeline.stages.iter().enumerate() {
            if builder.name_to_index.contains_key(&stage.name) {
                return Err(MlpipeError::DuplicateStage {
                    stage: stage.name.clone(),
                });
            }

            let node = builder.graph.add_node(idx);

            for input in stage.inputs.values() {
                let Some((dep_name, output)) = input.references_stage() else {
                    continue;
                };

                // Only earlier stages are in the map at this point
                let dep_node = builder.name_to_index.get(dep_name).copied().ok_or_else(|| {
                    MlpipeError::UnknownInput {
                        stage: stage.name.clone(),
                        reference: input.to_string(),
                    }
                })?;

                if !pipeline.stages[builder.graph[dep_node]].produces(output) {
                    return Err(MlpipeError::UnknownInput {
                        stage: stage.name.clone(),
                        reference: input.to_string(),
                    });
                }

                if !builder.graph.contains_edge(dep_node, node) {
                    builder.graph.add_edge(dep_node, node, ());
                }
            }

            builder.name_to_index.insert(stage.name.clone(), node);
            builder.names.push(stage.name.clone());
        }

        Ok(builder)
    }

    /// Stage names in execution order
    pub fn order(&self) -> &[String] {
        &self.names
    }

    /// Number of stages in the graph
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn neighbors_sorted(&self, stage_name: &str, direction: Direction) -> Option<Vec<String>> {
        let node = self.name_to_index.get(stage_name)?;
        let mut nodes: Vec<NodeIndex> = self.graph.neighbors_directed(*node, direction).collect();
        nodes.sort();
        Some(nodes.into_iter().map(|n| self.names[n.index()].clone()).collect())
    }

    /// Get dependencies for a stage (stages that must run before it)
    pub fn dependencies(&self, stage_name: &str) -> Option<Vec<String>> {
        self.neighbors_sorted(stage_name, Direction::Incoming)
    }

    /// Get dependents for a stage (stages that read its outputs)
    pub fn dependents(&self, stage_name: &str) -> Option<Vec<String>> {
        self.neighbors_sorted(stage_name, Direction::Outgoing)
    }

    /// Check if stage A depends (directly or transitively) on stage B
    pub fn depends_on(&self, stage_a: &str, stage_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(stage_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(stage_b) else {
            return false;
        };
        if node_a == node_b {
            return false;
        }

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Group stages into tiers; every stage's dependencies sit in earlier tiers
    pub fn tiers(&self) -> Vec<Vec<String>> {
        let mut level = vec![0usize; self.names.len()];

        // Dependencies always have lower indices, so one forward pass suffices
        for node in self.graph.node_indices() {
            level[node.index()] = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|dep| level[dep.index()] + 1)
                .max()
                .unwrap_or(0);
        }

        let depth = level.iter().max().map(|m| m + 1).unwrap_or(0);
        let mut tiers = vec![Vec::new(); depth];
        for (idx, name) in self.names.iter().enumerate() {
            tiers[level[idx]].push(name.clone());
        }
        tiers
    }

    fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .collect();
        edges.sort();
        edges
            .into_iter()
            .map(|(from, to)| (self.names[from.index()].as_str(), self.names[to.index()].as_str()))
            .collect()
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for name in &self.names {
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for (from, to) in self.edges() {
            out.push_str(&format!("    {} --> {}\n", from, to));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for name in &self.names {
            out.push_str(&format!("    \"{}\";\n", name));
        }

        for (from, to) in self.edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self, pipeline: &Pipeline) -> String {
        let mut out = String::new();

        for (i, stage) in pipeline.stages.iter().enumerate() {
            let deps = self.dependencies(&stage.name).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, stage.name, stage.executor_name()));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ComponentKind, InputRef, Stage};
    use std::collections::BTreeMap;

    /// Each entry is (name, [upstream stage names]); every stage outputs "out"
    fn make_test_pipeline(stages: Vec<(&str, Vec<&str>)>) -> Pipeline {
        Pipeline {
            version: "1".into(),
            name: "test".into(),
            description: None,
            parameters: BTreeMap::new(),
            stages: stages
                .into_iter()
                .map(|(name, deps)| {
                    deps.into_iter().fold(
                        Stage::component(name, ComponentKind::Transform).with_output("out"),
                        |stage, dep| stage.with_input(dep, InputRef::from_stage(dep, "out")),
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_linear_dag() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        assert_eq!(dag.order(), ["a", "b", "c"]);
        assert_eq!(dag.dependencies("c").unwrap(), vec!["b"]);
        assert_eq!(dag.dependents("a").unwrap(), vec!["b"]);
    }

    #[test]
    fn test_diamond_tiers() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        assert_eq!(
            dag.tiers(),
            vec![vec!["a"], vec!["b", "c"], vec!["d"]]
        );
        assert_eq!(dag.dependencies("d").unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let pipeline = make_test_pipeline(vec![("a", vec!["b"]), ("b", vec![])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(
            result,
            Err(MlpipeError::UnknownInput { ref stage, .. }) if stage == "a"
        ));
    }

    #[test]
    fn test_unknown_stage() {
        let pipeline = make_test_pipeline(vec![("a", vec!["nonexistent"])]);

        let err = DagBuilder::build(&pipeline).err().unwrap();
        assert!(err.is_validation());
        assert!(err.to_string().contains("'a'"));
        assert!(err.to_string().contains("nonexistent.out"));
    }

    #[test]
    fn test_unknown_output() {
        let mut pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec![])]);
        pipeline.stages[1]
            .inputs
            .insert("x".into(), InputRef::from_stage("a", "missing"));

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(
            result,
            Err(MlpipeError::UnknownInput { ref reference, .. }) if reference == "a.missing"
        ));
    }

    #[test]
    fn test_duplicate_stage() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("a", vec![])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(result, Err(MlpipeError::DuplicateStage { .. })));
    }

    #[test]
    fn test_depends_on_check() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        assert!(dag.depends_on("c", "a")); // transitive
        assert!(dag.depends_on("c", "b")); // direct
        assert!(!dag.depends_on("a", "c"));
        assert!(!dag.depends_on("a", "a"));
    }

    #[test]
    fn test_renderers() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a"])]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        assert!(dag.to_mermaid().contains("a --> b"));
        assert!(dag.to_dot().contains("\"a\" -> \"b\";"));
        assert_eq!(
            dag.to_text(&pipeline),
            "1. a (transform)\n2. b (transform) [depends: a]\n"
        );
    }
}

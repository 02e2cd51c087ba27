// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Pipe reference graph
//!
//! An edge runs from a controller to every pipe it may call. Unlike a
//! stage DAG the graph may contain cycles: recursion between pipes is
//! legal and bounded at run time by the router's call stack.

use indexmap::IndexMap;
use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::Library;
use crate::pipe::PipeKind;

#[derive(Debug, Clone)]
struct PipeNode {
    code: String,
    kind: PipeKind,
}

/// Graph of which pipe calls which
pub struct LibraryGraph {
    graph: DiGraph<PipeNode, ()>,
    code_to_index: IndexMap<String, NodeIndex>,
}

impl LibraryGraph {
    /// Build the graph of a library
    ///
    /// References to unknown pipes are left out; the library validator
    /// reports them.
    pub fn build(library: &Library) -> Self {
        let mut graph = DiGraph::new();
        let mut code_to_index = IndexMap::new();

        for pipe in library.pipes() {
            let node = graph.add_node(PipeNode {
                code: pipe.code().to_string(),
                kind: pipe.kind(),
            });
            code_to_index.insert(pipe.code().to_string(), node);
        }

        for pipe in library.pipes() {
            let from = code_to_index[pipe.code()];
            for sub in pipe.sub_pipe_codes() {
                let Some(target) = library.get_pipe(sub) else {
                    continue;
                };
                let to = code_to_index[target.code()];
                if !graph.contains_edge(from, to) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self {
            graph,
            code_to_index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Pipes called directly by `code`
    pub fn sub_pipes(&self, code: &str) -> Option<Vec<String>> {
        self.neighbors(code, Direction::Outgoing)
    }

    /// Pipes that call `code` directly
    pub fn callers(&self, code: &str) -> Option<Vec<String>> {
        self.neighbors(code, Direction::Incoming)
    }

    fn neighbors(&self, code: &str, direction: Direction) -> Option<Vec<String>> {
        let node = self.code_to_index.get(code)?;
        let mut codes: Vec<String> = self
            .graph
            .neighbors_directed(*node, direction)
            .map(|n| self.graph[n].code.clone())
            .collect();
        codes.sort();
        Some(codes)
    }

    /// Whether running `from` may end up running `to`
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let (Some(from), Some(to)) = (self.code_to_index.get(from), self.code_to_index.get(to))
        else {
            return false;
        };
        has_path_connecting(&self.graph, *from, *to, None)
    }

    /// Groups of mutually recursive pipes, each sorted by code
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut codes: Vec<String> = component
                    .into_iter()
                    .map(|n| self.graph[n].code.clone())
                    .collect();
                codes.sort();
                codes
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for node in self.code_to_index.values() {
            let pipe = &self.graph[*node];
            out.push_str(&format!("    {}[\"{} ({})\"]\n", pipe.code, pipe.code, pipe.kind));
        }

        for edge in self.graph.raw_edges() {
            let from = &self.graph[edge.source()].code;
            let to = &self.graph[edge.target()].code;
            out.push_str(&format!("    {} --> {}\n", from, to));
        }

        out
    }

    /// Graphviz DOT
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipes {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for node in self.code_to_index.values() {
            let pipe = &self.graph[*node];
            let shape = if pipe.kind.is_controller() {
                ", shape=box3d"
            } else {
                ""
            };
            out.push_str(&format!(
                "    \"{}\" [label=\"{}\\n{}\"{}];\n",
                pipe.code, pipe.code, pipe.kind, shape
            ));
        }

        for edge in self.graph.raw_edges() {
            let from = &self.graph[edge.source()].code;
            let to = &self.graph[edge.target()].code;
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        out.push_str("}\n");
        out
    }

    /// Plain listing, one pipe per line with what it calls
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for (i, (code, node)) in self.code_to_index.iter().enumerate() {
            out.push_str(&format!("{}. {} ({})", i + 1, code, self.graph[*node].kind));

            let calls = self.sub_pipes(code).unwrap_or_default();
            if !calls.is_empty() {
                out.push_str(&format!(" [calls: {}]", calls.join(", ")));
            }

            out.push('\n');
        }

        for cycle in self.cycles() {
            out.push_str(&format!("recursive: {}\n", cycle.join(" ⇄ ")));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryLoader;

    const LIBRARY: &str = r#"
domain = "demo"

[pipe.shout]
type = "PipeFunc"
definition = "Uppercase"
inputs = { text = "Text" }
function_name = "shout"

[pipe.whisper]
type = "PipeFunc"
definition = "Lowercase"
inputs = { text = "Text" }
function_name = "whisper"

[pipe.both]
type = "PipeParallel"
definition = "Both"
inputs = { text = "Text" }
parallels = [{ pipe = "shout", result = "loud" }, { pipe = "whisper", result = "soft" }]
add_each_output = true

[pipe.flow]
type = "PipeSequence"
definition = "Flow"
inputs = { text = "Text" }
steps = [{ pipe = "both", result = "pair" }, { pipe = "shout", result = "again" }]

[pipe.ping]
type = "PipeSequence"
definition = "Ping"
inputs = { text = "Text" }
steps = [{ pipe = "pong" }]

[pipe.pong]
type = "PipeSequence"
definition = "Pong"
inputs = { text = "Text" }
steps = [{ pipe = "ping" }]
"#;

    fn graph() -> LibraryGraph {
        LibraryLoader::new()
            .load_str(LIBRARY, "demo.toml")
            .unwrap()
            .graph()
    }

    #[test]
    fn test_build_graph() {
        let graph = graph();
        assert_eq!(graph.node_count(), 6);
        // flow -> shout is recorded once
        assert_eq!(graph.edge_count(), 6);
        assert_eq!(graph.sub_pipes("flow").unwrap(), vec!["both", "shout"]);
        assert_eq!(graph.callers("shout").unwrap(), vec!["both", "flow"]);
        assert!(graph.sub_pipes("unknown").is_none());
    }

    #[test]
    fn test_reaches() {
        let graph = graph();
        assert!(graph.reaches("flow", "whisper"));
        assert!(!graph.reaches("whisper", "flow"));
        assert!(!graph.reaches("flow", "unknown"));
    }

    #[test]
    fn test_cycles() {
        let graph = graph();
        assert_eq!(graph.cycles(), vec![vec!["ping".to_string(), "pong".to_string()]]);
    }

    #[test]
    fn test_renderings() {
        let graph = graph();

        let mermaid = graph.to_mermaid();
        assert!(mermaid.starts_with("graph TD"));
        assert!(mermaid.contains("both --> whisper"));

        let dot = graph.to_dot();
        assert!(dot.contains("\"flow\" -> \"both\";"));
        assert!(dot.ends_with("}\n"));

        let text = graph.to_text();
        assert!(text.contains("4. flow (PipeSequence) [calls: both, shout]"));
        assert!(text.contains("recursive: ping ⇄ pong"));
    }
}

// ABOUTME: Dependency graph construction, validation and execution planning
// ABOUTME: Turns task declarations into a validated task set plus a serializable graph

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::error::{ExecutionError, Result};
use super::result::NodeStatus;
use super::task::{TaskDeclaration, TaskSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    pub status: NodeStatus,
}

/// `source` requires the result of `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Visualization/audit view of a run. Scheduling never reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    /// Create a graph from a validated task set, every node not run
    pub fn from_tasks(tasks: &TaskSet) -> Self {
        let nodes = tasks
            .iter()
            .map(|spec| GraphNode {
                name: spec.name.clone(),
                status: NodeStatus::NotRun,
            })
            .collect();

        let edges = tasks
            .iter()
            .flat_map(|spec| {
                spec.dependencies.iter().map(move |dependency| GraphEdge {
                    source: spec.name.clone(),
                    target: dependency.clone(),
                })
            })
            .collect();

        Self { nodes, edges }
    }

    /// Relabel a node. Returns false when no node carries that name.
    pub fn set_status(&mut self, task: &str, status: NodeStatus) -> bool {
        match self.nodes.iter_mut().find(|node| node.name == task) {
            Some(node) => {
                node.status = status;
                true
            }
            None => false,
        }
    }

    pub fn node(&self, task: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.name == task)
    }

    pub fn status(&self, task: &str) -> Option<NodeStatus> {
        self.node(task).map(|node| node.status)
    }

    /// Get all tasks that the given task depends on
    pub fn dependencies_of(&self, task: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|edge| edge.source == task)
            .map(|edge| edge.target.as_str())
            .collect()
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target)
    }
}

/// Task specs whose dependencies are known to exist and to be acyclic.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    specs: IndexMap<String, TaskSpec>,
}

impl TaskSet {
    /// Validate specs into a task set, keeping their order
    pub fn new(specs: impl IntoIterator<Item = TaskSpec>) -> Result<Self> {
        let mut indexed = IndexMap::new();
        for spec in specs {
            if spec.name.trim().is_empty() {
                return Err(ExecutionError::InvalidTaskName { name: spec.name });
            }
            if indexed.contains_key(&spec.name) {
                return Err(ExecutionError::DuplicateTask { task: spec.name });
            }
            indexed.insert(spec.name.clone(), spec);
        }

        Self::check_references(&indexed)?;
        Self::check_cycles(&indexed)?;

        Ok(Self { specs: indexed })
    }

    fn check_references(specs: &IndexMap<String, TaskSpec>) -> Result<()> {
        for spec in specs.values() {
            for dependency in &spec.dependencies {
                if !specs.contains_key(dependency) {
                    return Err(ExecutionError::UnknownDependency {
                        task: spec.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_cycles(specs: &IndexMap<String, TaskSpec>) -> Result<()> {
        let mut graph: Graph<usize, ()> = Graph::new();
        let indices: Vec<NodeIndex> = (0..specs.len()).map(|idx| graph.add_node(idx)).collect();

        // Edge from dependency to task (dependency -> task)
        for (task_idx, spec) in specs.values().enumerate() {
            for dependency in &spec.dependencies {
                if let Some(dep_idx) = specs.get_index_of(dependency) {
                    graph.add_edge(indices[dep_idx], indices[task_idx], ());
                }
            }
        }

        for component in tarjan_scc(&graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.contains_edge(node, node));

            if cyclic {
                let mut members: Vec<usize> = component.iter().map(|&node| graph[node]).collect();
                members.sort_unstable();
                let tasks = members
                    .into_iter()
                    .filter_map(|idx| specs.get_index(idx).map(|(name, _)| name.clone()))
                    .collect();
                return Err(ExecutionError::CircularDependency { tasks });
            }
        }

        Ok(())
    }

    pub fn get(&self, task: &str) -> Option<&TaskSpec> {
        self.specs.get(task)
    }

    pub fn contains(&self, task: &str) -> bool {
        self.specs.contains_key(task)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskSpec> {
        self.specs.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Group tasks into waves: every task sits one wave after its latest
    /// dependency. Informational only, the executor starts tasks as soon as
    /// they become eligible rather than wave by wave.
    pub fn execution_levels(&self) -> Vec<Vec<String>> {
        let mut levels: Vec<Vec<String>> = Vec::new();
        let mut completed: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&TaskSpec> = self.specs.values().collect();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<&TaskSpec>, Vec<&TaskSpec>) =
                remaining.into_iter().partition(|spec| {
                    spec.dependencies
                        .iter()
                        .all(|dependency| completed.contains(dependency.as_str()))
                });

            if ready.is_empty() {
                // Unreachable for a validated set
                break;
            }

            completed.extend(ready.iter().map(|spec| spec.name.as_str()));
            levels.push(ready.into_iter().map(|spec| spec.name.clone()).collect());
            remaining = blocked;
        }

        levels
    }

    /// Get the maximum parallelism level (largest wave)
    pub fn max_parallelism(&self) -> usize {
        self.execution_levels()
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Tasks no other task depends on
    pub fn leaf_tasks(&self) -> Vec<String> {
        let depended_on: HashSet<&str> = self
            .specs
            .values()
            .flat_map(|spec| spec.dependencies.iter().map(String::as_str))
            .collect();

        self.specs
            .keys()
            .filter(|name| !depended_on.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Output of the graph builder.
#[derive(Debug, Clone)]
pub struct BuiltWorkflow {
    pub tasks: TaskSet,
    pub graph: DependencyGraph,
}

pub struct GraphBuilder;

impl GraphBuilder {
    /// Normalize declarations into validated specs and a graph in declaration order
    pub fn build<I, S>(declarations: I) -> Result<BuiltWorkflow>
    where
        I: IntoIterator<Item = (S, TaskDeclaration)>,
        S: Into<String>,
    {
        let mut specs = Vec::new();
        for (name, declaration) in declarations {
            let spec = declaration.into_spec(name)?;
            debug!(
                "Declared task '{}' with dependencies {:?}",
                spec.name, spec.dependencies
            );
            specs.push(spec);
        }

        let tasks = TaskSet::new(specs)?;
        let graph = DependencyGraph::from_tasks(&tasks);

        Ok(BuiltWorkflow { tasks, graph })
    }
}

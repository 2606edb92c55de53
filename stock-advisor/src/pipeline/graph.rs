//! The stage dependency graph.

use super::StageSpec;
use crate::errors::GraphDefinitionError;
use std::collections::HashMap;

/// A directed acyclic graph of stages.
///
/// Stages are declared one at a time and may only depend on stages that
/// were declared before them, so the graph is acyclic by construction.
#[derive(Debug, Clone, Default)]
pub struct StageGraph {
    /// The pipeline name.
    name: String,
    /// Stages in declaration order.
    stages: Vec<StageSpec>,
    /// Position of each stage in `stages`.
    index: HashMap<String, usize>,
    /// Dependency depth of each stage, parallel to `stages`.
    depths: Vec<usize>,
}

impl StageGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declares a stage, builder style.
    ///
    /// # Errors
    ///
    /// See [`StageGraph::declare`].
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, GraphDefinitionError> {
        self.declare(spec)?;
        Ok(self)
    }

    /// Declares a stage and assigns its ordinal.
    ///
    /// # Errors
    ///
    /// Returns `CyclicDependency` if the stage depends on itself,
    /// `UnknownDependency` if a dependency was not declared earlier, and
    /// `DuplicateStage` if the name is taken.
    pub fn declare(&mut self, mut spec: StageSpec) -> Result<(), GraphDefinitionError> {
        if self.index.contains_key(&spec.name) {
            return Err(GraphDefinitionError::DuplicateStage { stage: spec.name });
        }

        // A forward reference can never close a cycle, so the only cycle a
        // single declaration can introduce is a self-edge.
        if spec.dependencies.contains(&spec.name) {
            return Err(GraphDefinitionError::cycle(vec![
                spec.name.clone(),
                spec.name.clone(),
            ]));
        }

        let mut depth = 0;
        for dep in &spec.dependencies {
            let Some(&pos) = self.index.get(dep) else {
                return Err(GraphDefinitionError::unknown_dependency(&spec.name, dep));
            };
            depth = depth.max(self.depths[pos] + 1);
        }

        spec.ordinal = self.stages.len();
        self.index.insert(spec.name.clone(), spec.ordinal);
        self.depths.push(depth);
        self.stages.push(spec);
        Ok(())
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stage has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StageSpec> {
        self.index.get(name).map(|&pos| &self.stages[pos])
    }

    /// Returns the stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Checks that the graph can be run.
    ///
    /// # Errors
    ///
    /// Returns `Empty` if no stage has been declared.
    pub fn validate(&self) -> Result<(), GraphDefinitionError> {
        if self.is_empty() {
            return Err(GraphDefinitionError::Empty);
        }
        Ok(())
    }

    /// Partitions the stages into tiers.
    ///
    /// Tier 0 holds every stage without dependencies. A stage lands in tier
    /// `n` when its deepest dependency sits in tier `n - 1`. Stages within a
    /// tier keep declaration order and may run concurrently.
    #[must_use]
    pub fn topology(&self) -> Vec<Vec<&StageSpec>> {
        let tier_count = self.depths.iter().max().map_or(0, |d| d + 1);
        let mut tiers: Vec<Vec<&StageSpec>> = vec![Vec::new(); tier_count];
        for (spec, &depth) in self.stages.iter().zip(&self.depths) {
            tiers[depth].push(spec);
        }
        tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<'a>(tier: &[&'a StageSpec]) -> Vec<&'a str> {
        tier.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_declare_assigns_ordinals() {
        let graph = StageGraph::new("test")
            .stage(StageSpec::new("a"))
            .unwrap()
            .stage(StageSpec::new("b").with_dependency("a"))
            .unwrap();

        assert_eq!(graph.name(), "test");
        assert_eq!(graph.stage_count(), 2);
        assert_eq!(graph.get("a").unwrap().ordinal, 0);
        assert_eq!(graph.get("b").unwrap().ordinal, 1);
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err = StageGraph::new("test")
            .stage(StageSpec::new("b").with_dependency("a"))
            .unwrap_err();

        assert_eq!(err, GraphDefinitionError::unknown_dependency("b", "a"));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = StageGraph::new("test")
            .stage(StageSpec::new("a").with_dependency("a"))
            .unwrap_err();

        assert!(matches!(err, GraphDefinitionError::CyclicDependency { .. }));
        assert!(err.to_string().contains("a -> a"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = StageGraph::new("test")
            .stage(StageSpec::new("a"))
            .unwrap()
            .stage(StageSpec::new("a"))
            .unwrap_err();

        assert_eq!(err, GraphDefinitionError::DuplicateStage { stage: "a".to_string() });
    }

    #[test]
    fn test_failed_declare_leaves_graph_unchanged() {
        let mut graph = StageGraph::new("test");
        graph.declare(StageSpec::new("a")).unwrap();
        assert!(graph.declare(StageSpec::new("b").with_dependency("zzz")).is_err());

        assert_eq!(graph.stage_count(), 1);
        assert!(graph.get("b").is_none());
    }

    #[test]
    fn test_topology_groups_by_depth() {
        let graph = StageGraph::new("diamond")
            .stage(StageSpec::new("a"))
            .unwrap()
            .stage(StageSpec::new("b"))
            .unwrap()
            .stage(StageSpec::new("c").with_dependency("a"))
            .unwrap()
            .stage(StageSpec::new("d").with_dependencies(["b", "c"]))
            .unwrap()
            .stage(StageSpec::new("e").with_dependency("b"))
            .unwrap();

        let tiers = graph.topology();
        assert_eq!(tiers.len(), 3);
        assert_eq!(names(&tiers[0]), vec!["a", "b"]);
        assert_eq!(names(&tiers[1]), vec!["c", "e"]);
        assert_eq!(names(&tiers[2]), vec!["d"]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = StageGraph::new("empty");
        assert!(graph.topology().is_empty());
        assert_eq!(graph.validate(), Err(GraphDefinitionError::Empty));
    }
}

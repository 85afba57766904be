//! Classification plan IR shared by the rule compilers and the backends.
//!
//! A plan is pure data: per geometry kind, an ordered pipeline of
//! classifiers. Backends render it to target code; the `eval` module runs
//! it directly so the semantics can be tested without string comparison.

#[cfg(test)]
pub mod eval;

/// Boolean guard over an entity's tag set.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    /// Always matches (empty constraint list).
    True,
    /// Never matches; anchors an otherwise empty else-if chain.
    False,
    /// Key present, any value.
    HasKey(String),
    /// Key present with exactly this value.
    HasValue(String, String),
    /// Conjunction, evaluated left to right as declared.
    All(Vec<Guard>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryArm {
    pub guard: Guard,
    pub category: String,
}

/// One rule family's contribution to an area's pipeline. Each classifier
/// either consumes the entity (within its own scope) or passes; a match in
/// one classifier never suppresses the ones after it.
#[derive(Debug, Clone, PartialEq)]
pub enum Classifier {
    /// Records the area's boundary relation and retains it.
    Boundary { guard: Guard },
    /// First-match-wins chain over relations; a match merges the relation
    /// into the transit-line table keyed by its `ref` tag.
    TransitLines { arms: Vec<CategoryArm> },
    /// First-match-wins chain over nodes.
    TransitStops { arms: Vec<Guard> },
    /// First-match-wins chain over ways.
    Streets { arms: Vec<CategoryArm> },
    /// All-match: every matching arm registers the entity independently.
    NatureFeatures { arms: Vec<CategoryArm> },
    /// All-match, like nature features.
    Buildings { arms: Vec<CategoryArm> },
}

/// A fully compiled area: ordered classifier pipelines per geometry kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPlan {
    pub name: String,
    pub node_source: Option<String>,
    pub relations: Vec<Classifier>,
    pub ways: Vec<Classifier>,
    pub nodes: Vec<Classifier>,
}

/// Builder threaded through the rule-family compilers. Owned by exactly
/// one area compilation; finishing it yields the plan, so nothing can leak
/// into the next area.
#[derive(Debug)]
pub struct PlanBuilder {
    plan: AreaPlan,
}

impl PlanBuilder {
    pub fn new(name: impl Into<String>, node_source: Option<String>) -> Self {
        PlanBuilder {
            plan: AreaPlan {
                name: name.into(),
                node_source,
                relations: Vec::new(),
                ways: Vec::new(),
                nodes: Vec::new(),
            },
        }
    }

    pub fn push_relation(&mut self, classifier: Classifier) {
        self.plan.relations.push(classifier);
    }

    pub fn push_way(&mut self, classifier: Classifier) {
        self.plan.ways.push(classifier);
    }

    pub fn push_node(&mut self, classifier: Classifier) {
        self.plan.nodes.push(classifier);
    }

    pub fn finish(self) -> AreaPlan {
        self.plan
    }
}

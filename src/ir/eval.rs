//! Reference evaluation of classification plans.
//!
//! Mirrors the control flow of the generated importer: phase 1 classifies
//! a tagged entity stream and collects retained ids, phase 2 expands
//! retained ways into their node references (one level, ways only), phase
//! 3 buckets the survivors. Phases 2 and 3 are pure functions of their
//! inputs.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{AreaPlan, Classifier, Guard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: i64,
    pub kind: EntityKind,
    pub tags: HashMap<String, String>,
    /// Node references for ways, member ids for relations.
    pub refs: Vec<i64>,
}

/// A transit line being assembled from its route relations.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitLine {
    pub category: String,
    pub inbound: Option<i64>,
    pub outbound: Option<i64>,
}

/// Everything the generated importer accumulates during phase 1.
#[derive(Debug, Default)]
pub struct ImportState {
    pub boundary: Option<i64>,
    pub lines: HashMap<String, TransitLine>,
    pub stops: BTreeSet<i64>,
    pub streets: Vec<(i64, String)>,
    pub natural_features: Vec<(i64, String)>,
    pub buildings: Vec<(i64, String)>,
    pub retained: HashSet<i64>,
}

impl ImportState {
    /// Registers an entity in the retained set: nodes and ways by their
    /// own id, relations by their member ids.
    fn add_geo_reference(&mut self, entity: &Entity) {
        match entity.kind {
            EntityKind::Node | EntityKind::Way => {
                self.retained.insert(entity.id);
            }
            EntityKind::Relation => {
                self.retained.extend(entity.refs.iter().copied());
            }
        }
    }
}

/// Evaluate a guard against a tag set.
pub fn guard_matches(guard: &Guard, tags: &HashMap<String, String>) -> bool {
    match guard {
        Guard::True => true,
        Guard::False => false,
        Guard::HasKey(key) => tags.contains_key(key),
        Guard::HasValue(key, value) => tags.get(key).is_some_and(|actual| actual == value),
        Guard::All(inner) => inner.iter().all(|g| guard_matches(g, tags)),
    }
}

/// Phase 1: run an area's pipelines over the entity stream.
pub fn classify(plan: &AreaPlan, entities: &[Entity], state: &mut ImportState) {
    for entity in entities {
        if entity.tags.is_empty() {
            continue;
        }
        let pipeline = match entity.kind {
            EntityKind::Relation => &plan.relations,
            EntityKind::Way => &plan.ways,
            EntityKind::Node => &plan.nodes,
        };
        for classifier in pipeline {
            run_classifier(classifier, entity, state);
        }
    }
}

fn run_classifier(classifier: &Classifier, entity: &Entity, state: &mut ImportState) {
    match classifier {
        Classifier::Boundary { guard } => {
            if guard_matches(guard, &entity.tags) {
                state.boundary = Some(entity.id);
                state.add_geo_reference(entity);
            }
        }
        Classifier::TransitLines { arms } => {
            let Some(arm) = arms
                .iter()
                .find(|arm| guard_matches(&arm.guard, &entity.tags))
            else {
                return;
            };
            state.add_geo_reference(entity);

            let line_name = entity.tags.get("ref").cloned().unwrap_or_default();
            match state.lines.get_mut(&line_name) {
                Some(pair) => pair.outbound = Some(entity.id),
                None => {
                    state.lines.insert(
                        line_name,
                        TransitLine {
                            category: arm.category.clone(),
                            inbound: Some(entity.id),
                            outbound: None,
                        },
                    );
                }
            }
        }
        Classifier::TransitStops { arms } => {
            if arms.iter().any(|guard| guard_matches(guard, &entity.tags)) {
                state.stops.insert(entity.id);
                state.add_geo_reference(entity);
            }
        }
        Classifier::Streets { arms } => {
            if let Some(arm) = arms
                .iter()
                .find(|arm| guard_matches(&arm.guard, &entity.tags))
            {
                state.streets.push((entity.id, arm.category.clone()));
                state.add_geo_reference(entity);
            }
        }
        Classifier::NatureFeatures { arms } => {
            for arm in arms {
                if guard_matches(&arm.guard, &entity.tags) {
                    state
                        .natural_features
                        .push((entity.id, arm.category.clone()));
                    state.add_geo_reference(entity);
                }
            }
        }
        Classifier::Buildings { arms } => {
            for arm in arms {
                if guard_matches(&arm.guard, &entity.tags) {
                    state.buildings.push((entity.id, arm.category.clone()));
                    state.add_geo_reference(entity);
                }
            }
        }
    }
}

/// Phase 2: every node referenced by a retained way is retained. Exactly
/// one level; relations are not re-walked here.
pub fn expand_way_references(entities: &[Entity], retained: &mut HashSet<i64>) {
    for entity in entities {
        if entity.kind == EntityKind::Way && retained.contains(&entity.id) {
            retained.extend(entity.refs.iter().copied());
        }
    }
}

/// Phase 3: filter to retained ids; relations are dropped, ways and nodes
/// land in id-keyed stores.
pub fn bucket(
    entities: &[Entity],
    retained: &HashSet<i64>,
) -> (BTreeMap<i64, Entity>, BTreeMap<i64, Entity>) {
    let mut ways = BTreeMap::new();
    let mut nodes = BTreeMap::new();
    for entity in entities {
        if !retained.contains(&entity.id) {
            continue;
        }
        match entity.kind {
            EntityKind::Relation => {}
            EntityKind::Way => {
                ways.insert(entity.id, entity.clone());
            }
            EntityKind::Node => {
                nodes.insert(entity.id, entity.clone());
            }
        }
    }
    (ways, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::CategoryArm;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn way(id: i64, pairs: &[(&str, &str)], refs: &[i64]) -> Entity {
        Entity {
            id,
            kind: EntityKind::Way,
            tags: tags(pairs),
            refs: refs.to_vec(),
        }
    }

    fn node(id: i64, pairs: &[(&str, &str)]) -> Entity {
        Entity {
            id,
            kind: EntityKind::Node,
            tags: tags(pairs),
            refs: vec![],
        }
    }

    fn relation(id: i64, pairs: &[(&str, &str)], members: &[i64]) -> Entity {
        Entity {
            id,
            kind: EntityKind::Relation,
            tags: tags(pairs),
            refs: members.to_vec(),
        }
    }

    fn arm(key: &str, value: &str, category: &str) -> CategoryArm {
        CategoryArm {
            guard: Guard::HasValue(key.into(), value.into()),
            category: category.into(),
        }
    }

    fn empty_plan(name: &str) -> AreaPlan {
        AreaPlan {
            name: name.into(),
            node_source: None,
            relations: vec![],
            ways: vec![],
            nodes: vec![],
        }
    }

    #[test]
    fn street_chain_is_first_match_wins() {
        let mut plan = empty_plan("Test");
        plan.ways.push(Classifier::Streets {
            arms: vec![
                arm("highway", "primary", "Primary"),
                CategoryArm {
                    guard: Guard::HasKey("highway".into()),
                    category: "Other".into(),
                },
            ],
        });

        let entities = vec![way(1, &[("highway", "primary")], &[])];
        let mut state = ImportState::default();
        classify(&plan, &entities, &mut state);

        // Both arms match; only the first one may fire.
        assert_eq!(state.streets, vec![(1, "Primary".to_string())]);
    }

    #[test]
    fn nature_arms_are_all_match() {
        let mut plan = empty_plan("Test");
        plan.ways.push(Classifier::NatureFeatures {
            arms: vec![
                arm("leisure", "park", "Park"),
                CategoryArm {
                    guard: Guard::HasKey("leisure".into()),
                    category: "Green".into(),
                },
            ],
        });

        let entities = vec![way(7, &[("leisure", "park")], &[])];
        let mut state = ImportState::default();
        classify(&plan, &entities, &mut state);

        assert_eq!(
            state.natural_features,
            vec![(7, "Park".to_string()), (7, "Green".to_string())]
        );
    }

    #[test]
    fn transit_relations_merge_by_ref() {
        let mut plan = empty_plan("Test");
        plan.relations.push(Classifier::TransitLines {
            arms: vec![arm("route", "subway", "Subway")],
        });

        let entities = vec![
            relation(10, &[("route", "subway"), ("ref", "U2")], &[100, 101]),
            relation(11, &[("route", "subway"), ("ref", "U2")], &[102]),
        ];
        let mut state = ImportState::default();
        classify(&plan, &entities, &mut state);

        let line = state.lines.get("U2").unwrap();
        assert_eq!(line.category, "Subway");
        assert_eq!(line.inbound, Some(10));
        assert_eq!(line.outbound, Some(11));
        // Relations retain their members, not themselves.
        assert!(state.retained.contains(&100));
        assert!(state.retained.contains(&102));
        assert!(!state.retained.contains(&10));
    }

    #[test]
    fn zero_transit_rules_have_no_side_effects() {
        let mut plan = empty_plan("Test");
        plan.relations
            .push(Classifier::TransitLines { arms: vec![] });

        let entities = vec![relation(1, &[("route", "subway")], &[5])];
        let mut state = ImportState::default();
        classify(&plan, &entities, &mut state);

        assert!(state.lines.is_empty());
        assert!(state.retained.is_empty());
    }

    #[test]
    fn untagged_entities_are_skipped() {
        let mut plan = empty_plan("Test");
        plan.nodes.push(Classifier::TransitStops {
            arms: vec![Guard::True],
        });

        let entities = vec![node(4, &[])];
        let mut state = ImportState::default();
        classify(&plan, &entities, &mut state);
        assert!(state.stops.is_empty());
    }

    #[test]
    fn expansion_is_one_level_only() {
        // Node 300 is reachable only through a retained relation; it must
        // not survive.
        let entities = vec![
            relation(1, &[("type", "boundary")], &[300]),
            way(2, &[("highway", "primary")], &[200, 201]),
            node(200, &[("x", "y")]),
            node(201, &[("x", "y")]),
            node(300, &[("x", "y")]),
        ];
        let mut retained: HashSet<i64> = [2].into_iter().collect();
        expand_way_references(&entities, &mut retained);

        assert!(retained.contains(&200));
        assert!(retained.contains(&201));
        assert!(!retained.contains(&300));
    }

    #[test]
    fn retention_phases_are_idempotent() {
        let entities = vec![
            way(2, &[("highway", "primary")], &[200, 201]),
            node(200, &[("x", "y")]),
            node(201, &[("x", "y")]),
        ];
        let mut retained: HashSet<i64> = [2].into_iter().collect();

        expand_way_references(&entities, &mut retained);
        let (ways_once, nodes_once) = bucket(&entities, &retained);

        expand_way_references(&entities, &mut retained);
        let (ways_twice, nodes_twice) = bucket(&entities, &retained);

        assert_eq!(
            ways_once.keys().collect::<Vec<_>>(),
            ways_twice.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            nodes_once.keys().collect::<Vec<_>>(),
            nodes_twice.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn boundary_and_street_end_to_end() {
        let mut plan = empty_plan("Test");
        plan.relations.push(Classifier::Boundary {
            guard: Guard::All(vec![
                Guard::HasValue("name".into(), "Test".into()),
                Guard::HasValue("admin_level".into(), "8".into()),
            ]),
        });
        plan.ways.push(Classifier::Streets {
            arms: vec![CategoryArm {
                guard: Guard::HasKey("highway".into()),
                category: "Primary".into(),
            }],
        });

        let entities = vec![
            relation(1, &[("name", "Test"), ("admin_level", "8")], &[50]),
            way(2, &[("highway", "primary")], &[200, 201]),
            node(200, &[("crossing", "yes")]),
            node(201, &[("crossing", "yes")]),
        ];

        let mut state = ImportState::default();
        classify(&plan, &entities, &mut state);
        assert_eq!(state.boundary, Some(1));
        assert_eq!(state.streets, vec![(2, "Primary".to_string())]);

        expand_way_references(&entities, &mut state.retained);
        let (ways, nodes) = bucket(&entities, &state.retained);

        assert_eq!(ways.keys().collect::<Vec<_>>(), vec![&2]);
        assert_eq!(nodes.keys().collect::<Vec<_>>(), vec![&200, &201]);
    }

    #[test]
    fn guard_evaluation_matches_declared_semantics() {
        let present = tags(&[("highway", "primary")]);
        assert!(guard_matches(&Guard::HasKey("highway".into()), &present));
        assert!(guard_matches(
            &Guard::HasValue("highway".into(), "primary".into()),
            &present
        ));
        assert!(!guard_matches(
            &Guard::HasValue("highway".into(), "secondary".into()),
            &present
        ));
        assert!(guard_matches(&Guard::True, &present));
        assert!(!guard_matches(&Guard::False, &present));
        assert!(!guard_matches(
            &Guard::All(vec![
                Guard::HasKey("highway".into()),
                Guard::HasKey("lanes".into()),
            ]),
            &present
        ));
    }
}

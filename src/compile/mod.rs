//! Rule-family compilers: typed area descriptions into classification
//! plans.
//!
//! Families are compiled in a fixed order (boundary, transit lines,
//! transit stops, streets, nature, buildings) and append classifiers to
//! the builder for the geometry kinds they cover. Rule order within a
//! family is preserved as chain order.

use crate::ir::{CategoryArm, Classifier, Guard, PlanBuilder};
use crate::schema::{Area, Boundary, GeoKind, Rule, TagConstraint};

/// Compile an ordered constraint list into a single conjunction guard.
/// An empty list compiles to the unconditional always-true guard.
pub fn guard_for(tags: &[TagConstraint]) -> Guard {
    let tests = tags
        .iter()
        .map(|tag| {
            if tag.value.is_empty() {
                Guard::HasKey(tag.key.clone())
            } else {
                Guard::HasValue(tag.key.clone(), tag.value.clone())
            }
        })
        .collect();
    conjunction(tests)
}

fn conjunction(mut tests: Vec<Guard>) -> Guard {
    match tests.len() {
        0 => Guard::True,
        1 => tests.pop().unwrap(),
        _ => Guard::All(tests),
    }
}

pub fn compile_area(area: &Area) -> crate::ir::AreaPlan {
    let mut builder = PlanBuilder::new(&area.name, area.node_source.clone());
    compile_boundary(&area.boundary, &mut builder);
    compile_transit_lines(&area.transit_lines, &mut builder);
    compile_transit_stops(&area.transit_stops, &mut builder);
    compile_streets(&area.streets, &mut builder);
    compile_nature(&area.nature, &mut builder);
    compile_buildings(&area.buildings, &mut builder);
    builder.finish()
}

fn compile_boundary(boundary: &Boundary, builder: &mut PlanBuilder) {
    let name = boundary.effective_name();
    if name.is_empty() {
        // A nameless boundary never matches; emit nothing for it.
        return;
    }

    let mut tests = vec![Guard::HasValue("name".into(), name.to_string())];
    match guard_for(&boundary.tags) {
        Guard::True => {}
        Guard::All(inner) => tests.extend(inner),
        single => tests.push(single),
    }
    builder.push_relation(Classifier::Boundary {
        guard: conjunction(tests),
    });
}

fn category_arms(rules: &[Rule]) -> Vec<CategoryArm> {
    rules
        .iter()
        .map(|rule| CategoryArm {
            guard: guard_for(&rule.tags),
            category: rule.category.clone(),
        })
        .collect()
}

fn compile_transit_lines(rules: &[Rule], builder: &mut PlanBuilder) {
    builder.push_relation(Classifier::TransitLines {
        arms: category_arms(rules),
    });
}

fn compile_transit_stops(rules: &[Rule], builder: &mut PlanBuilder) {
    builder.push_node(Classifier::TransitStops {
        arms: rules.iter().map(|rule| guard_for(&rule.tags)).collect(),
    });
}

fn compile_streets(rules: &[Rule], builder: &mut PlanBuilder) {
    builder.push_way(Classifier::Streets {
        arms: category_arms(rules),
    });
}

fn compile_nature(rules: &[Rule], builder: &mut PlanBuilder) {
    let (relations, ways) = split_by_geo(rules);
    builder.push_relation(Classifier::NatureFeatures { arms: relations });
    builder.push_way(Classifier::NatureFeatures { arms: ways });
}

fn compile_buildings(rules: &[Rule], builder: &mut PlanBuilder) {
    let (relations, ways) = split_by_geo(rules);
    builder.push_relation(Classifier::Buildings { arms: relations });
    builder.push_way(Classifier::Buildings { arms: ways });
}

/// One arm per (rule, declared geometry kind), in rule order.
fn split_by_geo(rules: &[Rule]) -> (Vec<CategoryArm>, Vec<CategoryArm>) {
    let mut relations = Vec::new();
    let mut ways = Vec::new();
    for rule in rules {
        for kind in &rule.geo {
            let arm = CategoryArm {
                guard: guard_for(&rule.tags),
                category: rule.category.clone(),
            };
            match kind {
                GeoKind::Relation => relations.push(arm),
                GeoKind::Way => ways.push(arm),
            }
        }
    }
    (relations, ways)
}

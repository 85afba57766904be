//! Rule-file loading: YAML area descriptions into the record graph.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::{FieldValue, Record, RecordKeeper};

#[derive(Debug, Deserialize)]
struct RulesFile {
    areas: Vec<AreaDef>,
}

#[derive(Debug, Deserialize)]
struct AreaDef {
    name: String,
    #[serde(default)]
    node_file: String,
    boundary: BoundaryDef,
    #[serde(default)]
    transit_lines: Vec<RuleDef>,
    #[serde(default)]
    transit_stops: Vec<RuleDef>,
    #[serde(default)]
    streets: Vec<RuleDef>,
    #[serde(default)]
    nature: Vec<RuleDef>,
    #[serde(default)]
    buildings: Vec<RuleDef>,
}

#[derive(Debug, Deserialize)]
struct BoundaryDef {
    #[serde(default)]
    name: String,
    #[serde(default)]
    relation_name: String,
    #[serde(default)]
    tags: Vec<TagDef>,
}

#[derive(Debug, Deserialize)]
struct RuleDef {
    /// Category case name; transit stops carry none.
    #[serde(rename = "type", default)]
    category: String,
    /// Geometry kinds the rule applies to (nature and buildings only).
    #[serde(default)]
    geo: Vec<String>,
    #[serde(default)]
    tags: Vec<TagDef>,
}

#[derive(Debug, Deserialize)]
struct TagDef {
    key: String,
    #[serde(default)]
    value: String,
}

/// Load a YAML rule file into a record keeper, preserving declaration
/// order of areas and of rules within each family.
pub fn load_records(path: &Path) -> Result<RecordKeeper> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path))
        .build()
        .with_context(|| format!("CLI: Failed to read rule file {:?}", path))?;
    let file: RulesFile = settings
        .try_deserialize()
        .with_context(|| format!("CLI: Invalid rule file {:?}", path))?;

    let mut keeper = RecordKeeper::default();
    for area in file.areas {
        keeper.push(area_record(area));
    }
    Ok(keeper)
}

fn area_record(area: AreaDef) -> Record {
    Record::new(area.name, "Area")
        .with("nodeFile", FieldValue::Str(area.node_file))
        .with("boundary", FieldValue::Record(boundary_record(area.boundary)))
        .with("transitLines", rule_list(area.transit_lines, "TransitLine"))
        .with("transitStops", rule_list(area.transit_stops, "TransitStop"))
        .with("streets", rule_list(area.streets, "Street"))
        .with("nature", rule_list(area.nature, "Nature"))
        .with("buildings", rule_list(area.buildings, "Building"))
}

fn boundary_record(boundary: BoundaryDef) -> Record {
    Record::new("", "BoundaryInfo")
        .with("name", FieldValue::Str(boundary.name))
        .with("relationName", FieldValue::Str(boundary.relation_name))
        .with("tags", tag_list(boundary.tags))
}

fn rule_list(rules: Vec<RuleDef>, kind: &str) -> FieldValue {
    FieldValue::List(
        rules
            .into_iter()
            .map(|rule| FieldValue::Record(rule_record(rule, kind)))
            .collect(),
    )
}

fn rule_record(rule: RuleDef, kind: &str) -> Record {
    let mut record = Record::new("", kind);
    // An absent category surfaces later as a missing-field error for the
    // families that require one.
    if !rule.category.is_empty() {
        record = record.with("type", FieldValue::Case(rule.category));
    }
    if matches!(kind, "Nature" | "Building") {
        record = record.with(
            "geoTypes",
            FieldValue::List(rule.geo.into_iter().map(FieldValue::Case).collect()),
        );
    }
    record.with("tags", tag_list(rule.tags))
}

fn tag_list(tags: Vec<TagDef>) -> FieldValue {
    FieldValue::List(
        tags.into_iter()
            .map(|tag| {
                FieldValue::Record(
                    Record::new("", "Tag")
                        .with("key", FieldValue::Str(tag.key))
                        .with("value", FieldValue::Str(tag.value)),
                )
            })
            .collect(),
    )
}

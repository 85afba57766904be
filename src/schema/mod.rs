//! Typed views over the record graph.
//!
//! Built once before compilation; immutable afterwards. Any missing or
//! wrongly shaped field aborts with a schema error, there is no partial
//! recovery.

use anyhow::{Context, Result, bail};

use crate::record::{Record, RecordKeeper};

/// Geometry kinds a nature or building rule can apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoKind {
    Way,
    Relation,
}

impl GeoKind {
    fn parse(case: &str) -> Result<Self> {
        match case {
            "Way" => Ok(GeoKind::Way),
            "Relation" => Ok(GeoKind::Relation),
            other => bail!("Schema: unknown geometry kind '{}'", other),
        }
    }
}

/// A single tag test: empty value means "key present", otherwise the key
/// must carry exactly that value.
#[derive(Debug, Clone, PartialEq)]
pub struct TagConstraint {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Boundary {
    pub name: String,
    pub relation_name: String,
    pub tags: Vec<TagConstraint>,
}

impl Boundary {
    /// Relation name matched in the generated guard. Empty means the
    /// boundary never matches.
    pub fn effective_name(&self) -> &str {
        if self.relation_name.is_empty() {
            &self.name
        } else {
            &self.relation_name
        }
    }
}

/// One classification rule: AND-combined constraints mapped to a category,
/// optionally scoped to geometry kinds.
#[derive(Debug, Clone)]
pub struct Rule {
    pub category: String,
    pub tags: Vec<TagConstraint>,
    pub geo: Vec<GeoKind>,
}

#[derive(Debug, Clone)]
pub struct Area {
    pub name: String,
    pub node_source: Option<String>,
    pub boundary: Boundary,
    pub transit_lines: Vec<Rule>,
    pub transit_stops: Vec<Rule>,
    pub streets: Vec<Rule>,
    pub nature: Vec<Rule>,
    pub buildings: Vec<Rule>,
}

/// Pull all areas out of the keeper, in declaration order.
pub fn collect_areas(keeper: &RecordKeeper) -> Result<Vec<Area>> {
    keeper
        .all_of("Area")
        .map(|record| {
            area_from_record(record)
                .with_context(|| format!("Schema: invalid area '{}'", record.name))
        })
        .collect()
}

fn area_from_record(record: &Record) -> Result<Area> {
    let node_file = record.str_field("nodeFile")?;
    Ok(Area {
        name: record.name.clone(),
        node_source: if node_file.is_empty() {
            None
        } else {
            Some(node_file.to_string())
        },
        boundary: boundary_from_record(record.record_field("boundary")?)?,
        transit_lines: rules_from_field(record, "transitLines", true, false)?,
        transit_stops: rules_from_field(record, "transitStops", false, false)?,
        streets: rules_from_field(record, "streets", true, false)?,
        nature: rules_from_field(record, "nature", true, true)?,
        buildings: rules_from_field(record, "buildings", true, true)?,
    })
}

fn boundary_from_record(record: &Record) -> Result<Boundary> {
    Ok(Boundary {
        name: record.str_field("name")?.to_string(),
        relation_name: record.str_field("relationName")?.to_string(),
        tags: tags_from_record(record)?,
    })
}

fn rules_from_field(
    area: &Record,
    field: &str,
    with_category: bool,
    with_geo: bool,
) -> Result<Vec<Rule>> {
    area.list_field(field)?
        .iter()
        .map(|value| {
            let record = value.as_record()?;
            let category = if with_category {
                record.case_field("type")?.to_string()
            } else {
                String::new()
            };
            let geo = if with_geo {
                record
                    .list_field("geoTypes")?
                    .iter()
                    .map(|kind| GeoKind::parse(kind.as_case()?))
                    .collect::<Result<Vec<_>>>()?
            } else {
                Vec::new()
            };
            Ok(Rule {
                category,
                tags: tags_from_record(record)?,
                geo,
            })
        })
        .collect()
}

fn tags_from_record(record: &Record) -> Result<Vec<TagConstraint>> {
    record
        .list_field("tags")?
        .iter()
        .map(|value| {
            let tag = value.as_record()?;
            Ok(TagConstraint {
                key: tag.str_field("key")?.to_string(),
                value: tag.str_field("value")?.to_string(),
            })
        })
        .collect()
}

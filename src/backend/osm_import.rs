//! OSM import backend: renders area classification plans into the C#
//! import helper consumed by the game's import pipeline.
//!
//! The runtime declarations (usings, `OSMImportHelper` skeleton,
//! `AddGeoReference`, the retention epilogue) are a fixed API surface and
//! are spliced as-is. Schema strings and category names are spliced
//! verbatim too: a quote or brace inside them lands in the output
//! unchanged and will not compile there.

use std::fmt::{self, Write};

use anyhow::Result;

use super::Backend;
use crate::compile::compile_area;
use crate::ir::{AreaPlan, CategoryArm, Classifier, Guard};
use crate::record::RecordKeeper;
use crate::schema::collect_areas;

pub struct OsmImportBackend;

impl Backend for OsmImportBackend {
    fn generate(&self, keeper: &RecordKeeper) -> Result<String> {
        let areas = collect_areas(keeper)?;
        let plans: Vec<AreaPlan> = areas.iter().map(compile_area).collect();

        let mut out = String::new();
        render_unit(&mut out, &plans)?;
        Ok(out)
    }
}

/// Geometry variable name in scope inside a dispatch case.
#[derive(Debug, Clone, Copy)]
enum GeoVar {
    Rel,
    Way,
    Node,
}

impl GeoVar {
    fn name(self) -> &'static str {
        match self {
            GeoVar::Rel => "rel",
            GeoVar::Way => "way",
            GeoVar::Node => "node",
        }
    }
}

const PREAMBLE_HEAD: &str = r#"
using OsmSharp;
using OsmSharp.Streams;
using UnityEngine;
using System;
using System.Collections;
using System.Collections.Generic;
using System.Linq;
using System.IO;
using System.Xml;
using System.Xml.Schema;
using System.Xml.Serialization;

namespace Transidious
{

public class OSMImportHelper {
    public enum Area {
"#;

const PREAMBLE_BODY: &str = r#"
    }

    OSMImporterProxy importer;
    Area area = Area.Default;

    Stream input = null;
    PBFOsmStreamSource sourceStream = null;

    HashSet<long> referencedGeos;

    void AddGeoReference(OsmGeo geo)
    {
       if (geo.Type == OsmGeoType.Node)
       {
          if (geo.Id.HasValue)
            referencedGeos.Add(geo.Id.Value);
       }
       else if (geo.Type == OsmGeoType.Way)
       {
          if (geo.Id.HasValue)
            referencedGeos.Add(geo.Id.Value);
       }
       else
       {
          var rel = geo as Relation;
          foreach (var member in rel.Members)
          {
             referencedGeos.Add(member.Id);
          }
       }
    }

    public OSMImportHelper(OSMImporterProxy importer, string area, string country)
    {
         this.importer = importer;
         this.referencedGeos = new HashSet<long>();

         string fileName;
         fileName = "Resources/OSM/";
         fileName += country;
         fileName += "/";
         fileName += area;
         fileName += ".osm.pbf";

        input = File.OpenRead(fileName);
        if (input == null)
        {
            Debug.LogError("opening stream failed");
            return;
        }

        this.sourceStream = new PBFOsmStreamSource(input);
        Enum.TryParse(area, true, out this.area);

        PBFOsmStreamSource allNodes = null;
"#;

const NODE_SOURCE_OPEN: &str = r#"
               string allNodesFileName;
               allNodesFileName = "Resources/OSM/";
               allNodesFileName += ""#;

const NODE_SOURCE_CLOSE: &str = r#"";
               allNodesFileName += ".osm.pbf";

               var allNodesInput = File.OpenRead(allNodesFileName);
               if (allNodesInput == null)
               {
                     Debug.LogError("opening stream failed");
                     return;
               }

               allNodes = new PBFOsmStreamSource(allNodesInput);
"#;

const IMPORT_HEAD: &str = r#"

       this.ImportArea(allNodes);
    }

    void ImportArea(PBFOsmStreamSource allNodes)
    {
"#;

const FOREACH_HEAD: &str = r#"
         foreach (var geo in sourceStream)
         {
            var tags = geo.Tags;
            if (tags == null)
            {
                continue;
            }

            switch (geo.Type)
            {
               case OsmGeoType.Relation:
                  var rel = geo as Relation;

"#;

const WAY_CASE_HEAD: &str = r#"
               break;
               case OsmGeoType.Way:
                  var way = geo as Way;
"#;

const NODE_CASE_HEAD: &str = r#"
               break;
               case OsmGeoType.Node:
                  var node = geo as Node;
                  {
                     double lat = node.Latitude.Value;
                     double lng = node.Longitude.Value;

                     importer.minLat = System.Math.Min(lat, importer.minLat);
                     importer.minLng = System.Math.Min(lng, importer.minLng);

                     importer.maxLat = System.Math.Max(lat, importer.maxLat);
                     importer.maxLng = System.Math.Max(lng, importer.maxLng);
                  }

"#;

const FOREACH_TAIL: &str = r#"
               break;
            }
         }
"#;

const TRANSIT_MERGE_TAIL: &str = r#"
                     else
                     {
                        break;
                     }

                     AddGeoReference(rel);

                     var lineName = tags.GetValue("ref");
                     if (importer.lines.TryGetValue(lineName, out OSMImporterProxy.TransitLine pair))
                     {
                         pair.outbound = rel;
                     }
                     else
                     {
                         importer.lines.Add(lineName, new OSMImporterProxy.TransitLine {
                             inbound = rel,
                             type = type
                         });
                     }
"#;

const RETENTION_EPILOGUE: &str = r#"
      OsmGeo[] nodes = null;
      GameController.instance.RunTimer("ToArray", () =>
      {
         nodes = allNodes.ToArray();
      });

      foreach (var way in nodes.OfType<Way>())
         {
            if (!way.Id.HasValue || !referencedGeos.Contains(way.Id.Value))
            {
                  continue;
            }

            foreach (var nodeId in way.Nodes)
            {
               referencedGeos.Add(nodeId);
            }
         }

         foreach (var geo in nodes)
         {
            if (!geo.Id.HasValue || !referencedGeos.Contains(geo.Id.Value))
            {
                  continue;
            }

            switch (geo.Type)
            {
               case OsmGeoType.Relation:
                  break;
               case OsmGeoType.Way:
                  importer.ways.Add(geo.Id.Value, geo as Way);
                  break;
               case OsmGeoType.Node:
                  importer.nodes.Add(geo.Id.Value, geo as Node);
                  break;
            }
         }
   }
}
}
"#;

fn render_unit(out: &mut String, plans: &[AreaPlan]) -> fmt::Result {
    out.push_str(PREAMBLE_HEAD);
    for plan in plans {
        writeln!(out, "{},", plan.name)?;
    }
    out.push_str(PREAMBLE_BODY);

    render_area_switch(out, plans, render_node_source)?;
    out.push_str(IMPORT_HEAD);
    render_area_switch(out, plans, render_dispatch)?;
    out.push_str(RETENTION_EPILOGUE);
    Ok(())
}

/// The outer area selector: one case per area, in declaration order.
fn render_area_switch(
    out: &mut String,
    plans: &[AreaPlan],
    body: fn(&mut String, &AreaPlan) -> fmt::Result,
) -> fmt::Result {
    out.push_str("switch (this.area) {\n");
    for plan in plans {
        writeln!(out, "    case Area.{}: {{", plan.name)?;
        body(out, plan)?;
        out.push_str("        }\n        break;\n");
    }
    out.push_str("}\n");
    Ok(())
}

fn render_node_source(out: &mut String, plan: &AreaPlan) -> fmt::Result {
    match &plan.node_source {
        None => out.push_str("allNodes = this.sourceStream;\n"),
        Some(file) => {
            out.push_str(NODE_SOURCE_OPEN);
            out.push_str(file);
            out.push_str(NODE_SOURCE_CLOSE);
        }
    }
    Ok(())
}

/// One full pass over the entity stream for a single area.
fn render_dispatch(out: &mut String, plan: &AreaPlan) -> fmt::Result {
    out.push_str(FOREACH_HEAD);
    render_fragments(out, &plan.relations, GeoVar::Rel)?;
    out.push_str(WAY_CASE_HEAD);
    render_fragments(out, &plan.ways, GeoVar::Way)?;
    out.push_str(NODE_CASE_HEAD);
    render_fragments(out, &plan.nodes, GeoVar::Node)?;
    out.push_str(FOREACH_TAIL);
    Ok(())
}

/// Each classifier gets its own single-iteration wrapper, so a `break`
/// inside one fragment never skips the fragments after it.
fn render_fragments(out: &mut String, pipeline: &[Classifier], var: GeoVar) -> fmt::Result {
    for (i, classifier) in pipeline.iter().enumerate() {
        if i != 0 {
            out.push('\n');
        }
        out.push_str("while (true) {\n");
        render_classifier(out, classifier, var)?;
        out.push_str("\nbreak;\n}\n");
    }
    Ok(())
}

fn render_classifier(out: &mut String, classifier: &Classifier, var: GeoVar) -> fmt::Result {
    match classifier {
        Classifier::Boundary { guard } => {
            write!(
                out,
                "if ({}) {{\n                importer.boundary = geo as Relation; AddGeoReference(geo); break;\n}}",
                render_guard(guard)
            )
        }
        Classifier::TransitLines { arms } => {
            out.push_str("\n         TransitType type;\n");
            for (i, arm) in arms.iter().enumerate() {
                if i != 0 {
                    out.push_str(" else ");
                }
                write!(
                    out,
                    "if ({}) {{\ntype = TransitType.{};\n}}",
                    render_guard(&arm.guard),
                    arm.category
                )?;
            }
            if arms.is_empty() {
                out.push_str("                     if (false) {} ");
            }
            out.push_str(TRANSIT_MERGE_TAIL);
            Ok(())
        }
        Classifier::TransitStops { arms } => {
            for (i, guard) in arms.iter().enumerate() {
                if i != 0 {
                    out.push_str(" else ");
                }
                write!(
                    out,
                    "if ({}) {{\nDebug.Assert(geo.Id.HasValue, \"stop does not have an ID\");importer.stops.Add(geo.Id.Value, node); AddGeoReference(geo);\n}}",
                    render_guard(guard)
                )?;
            }
            Ok(())
        }
        Classifier::Streets { arms } => {
            for (i, arm) in arms.iter().enumerate() {
                if i != 0 {
                    out.push_str(" else ");
                }
                write!(
                    out,
                    "if ({}) {{\nimporter.streets.Add(new Tuple<Way, Street.Type>(way, Street.Type.{})); AddGeoReference(way);\n}}",
                    render_guard(&arm.guard),
                    arm.category
                )?;
            }
            Ok(())
        }
        Classifier::NatureFeatures { arms } => render_all_match(
            out,
            arms,
            var,
            "importer.naturalFeatures",
            "NaturalFeature.Type",
        ),
        Classifier::Buildings { arms } => {
            render_all_match(out, arms, var, "importer.buildings", "Building.Type")
        }
    }
}

/// Independent ifs: every matching arm fires.
fn render_all_match(
    out: &mut String,
    arms: &[CategoryArm],
    var: GeoVar,
    collection: &str,
    category_type: &str,
) -> fmt::Result {
    for (i, arm) in arms.iter().enumerate() {
        if i != 0 {
            out.push('\n');
        }
        write!(
            out,
            "if ({guard}) {{\n{collection}.Add(new Tuple<OsmGeo, {ty}>({var}, {ty}.{category}));\nAddGeoReference({var});\n}}",
            guard = render_guard(&arm.guard),
            collection = collection,
            ty = category_type,
            var = var.name(),
            category = arm.category
        )?;
    }
    Ok(())
}

fn render_guard(guard: &Guard) -> String {
    match guard {
        Guard::True => "true".to_string(),
        Guard::False => "false".to_string(),
        Guard::HasKey(key) => format!("tags.ContainsKey(\"{}\")", key),
        Guard::HasValue(key, value) => format!("tags.Contains(\"{}\", \"{}\")", key, value),
        Guard::All(inner) => inner
            .iter()
            .map(render_guard)
            .collect::<Vec<_>>()
            .join(" && "),
    }
}

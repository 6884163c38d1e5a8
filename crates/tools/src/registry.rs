//! Closed registry of mesh tools and their parameter schemas.

use std::fmt;
use std::str::FromStr;

use polyedit_config::EditorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};
use crate::property::{PropertyDef, PropertyKind, PropertyValue};

/// Upper bound for integer step/repeat parameters
pub const MAX_STEPS: i64 = polyedit_config::MAX_STEPS as i64;

/// Every tool the editor can run, addressed by a stable path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolId {
    #[serde(rename = "mesh.split_edge")]
    SplitEdge,
    #[serde(rename = "mesh.dissolve_vertex")]
    DissolveVertex,
    #[serde(rename = "mesh.delete")]
    Delete,
    #[serde(rename = "mesh.triangulate")]
    Triangulate,
    #[serde(rename = "mesh.extrude_vertex")]
    ExtrudeVertex,
    #[serde(rename = "mesh.make_face")]
    MakeFace,
    #[serde(rename = "mesh.fix_windings")]
    FixWindings,
    #[serde(rename = "mesh.repair")]
    Repair,
    #[serde(rename = "mesh.vertex_smooth")]
    VertexSmooth,
    #[serde(rename = "mesh.reverse_edge")]
    ReverseEdge,
    #[serde(rename = "mesh.duplicate")]
    Duplicate,
    #[serde(rename = "mesh.translate")]
    Translate,
}

impl ToolId {
    pub const ALL: [ToolId; 12] = [
        Self::SplitEdge,
        Self::DissolveVertex,
        Self::Delete,
        Self::Triangulate,
        Self::ExtrudeVertex,
        Self::MakeFace,
        Self::FixWindings,
        Self::Repair,
        Self::VertexSmooth,
        Self::ReverseEdge,
        Self::Duplicate,
        Self::Translate,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::SplitEdge => "mesh.split_edge",
            Self::DissolveVertex => "mesh.dissolve_vertex",
            Self::Delete => "mesh.delete",
            Self::Triangulate => "mesh.triangulate",
            Self::ExtrudeVertex => "mesh.extrude_vertex",
            Self::MakeFace => "mesh.make_face",
            Self::FixWindings => "mesh.fix_windings",
            Self::Repair => "mesh.repair",
            Self::VertexSmooth => "mesh.vertex_smooth",
            Self::ReverseEdge => "mesh.reverse_edge",
            Self::Duplicate => "mesh.duplicate",
            Self::Translate => "mesh.translate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SplitEdge => "Split Edge",
            Self::DissolveVertex => "Dissolve Vertex",
            Self::Delete => "Delete",
            Self::Triangulate => "Triangulate",
            Self::ExtrudeVertex => "Extrude Vertex",
            Self::MakeFace => "Make Face",
            Self::FixWindings => "Fix Windings",
            Self::Repair => "Fix Mesh",
            Self::VertexSmooth => "Vertex Smooth",
            Self::ReverseEdge => "Reverse Edge Order",
            Self::Duplicate => "Duplicate",
            Self::Translate => "Translate",
        }
    }

    /// Look a tool up by its path.
    pub fn from_path(path: &str) -> ToolResult<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.path() == path)
            .ok_or_else(|| ToolError::UnknownTool(path.to_string()))
    }

    /// Parameter schema, with initial defaults taken from `config`.
    pub fn def(self, config: &EditorConfig) -> ToolDef {
        let properties = match self {
            Self::SplitEdge => vec![
                PropertyDef::new("steps", "Number of Cuts", PropertyKind::Int { min: 1, max: MAX_STEPS })
                    .with_default(PropertyValue::Int(i64::from(config.split_steps)))
                    .remembered(),
            ],
            Self::Delete => vec![PropertyDef::new(
                "sel_mask",
                "Element Types",
                PropertyKind::Flags { all: 0b111 },
            )],
            Self::ExtrudeVertex => vec![
                PropertyDef::new("co", "Location", PropertyKind::Vec3)
                    .with_default(PropertyValue::Vec3([0.0; 3])),
            ],
            Self::VertexSmooth => vec![
                PropertyDef::new("repeat", "Repeat", PropertyKind::Int { min: 1, max: MAX_STEPS })
                    .with_default(PropertyValue::Int(i64::from(config.smooth_repeat)))
                    .remembered(),
                PropertyDef::new("factor", "Factor", PropertyKind::Float { min: 0.0, max: 1.0 })
                    .with_default(PropertyValue::Float(f64::from(config.smooth_factor)))
                    .remembered(),
            ],
            Self::Duplicate => vec![
                PropertyDef::new("do_transform", "Move Copy", PropertyKind::Bool)
                    .with_default(PropertyValue::Bool(true)),
                PropertyDef::new("offset", "Offset", PropertyKind::Vec3)
                    .with_default(PropertyValue::Vec3([0.0; 3])),
            ],
            Self::Translate => vec![
                PropertyDef::new("offset", "Offset", PropertyKind::Vec3)
                    .with_default(PropertyValue::Vec3([0.0; 3])),
            ],
            Self::DissolveVertex
            | Self::Triangulate
            | Self::MakeFace
            | Self::FixWindings
            | Self::Repair
            | Self::ReverseEdge => Vec::new(),
        };
        ToolDef {
            path: self,
            label: self.label().to_string(),
            properties,
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for ToolId {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s)
    }
}

/// Tool description consumed by an external UI to build invocation forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    pub path: ToolId,
    pub label: String,
    pub properties: Vec<PropertyDef>,
}

impl ToolDef {
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn to_json(&self) -> ToolResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Every tool definition, in registry order.
pub fn registry(config: &EditorConfig) -> Vec<ToolDef> {
    ToolId::ALL.iter().map(|id| id.def(config)).collect()
}

/// The registry as a JSON array.
pub fn registry_json(config: &EditorConfig) -> ToolResult<String> {
    Ok(serde_json::to_string(&registry(config))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_round_trip() {
        for id in ToolId::ALL {
            assert_eq!(ToolId::from_path(id.path()).unwrap(), id);
            assert_eq!(id.path().parse::<ToolId>().unwrap(), id);
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.path()));
        }
    }

    #[test]
    fn test_unknown_path() {
        assert!(matches!(
            ToolId::from_path("mesh.bevel"),
            Err(ToolError::UnknownTool(p)) if p == "mesh.bevel"
        ));
    }

    #[test]
    fn test_defaults_follow_config() {
        let config = EditorConfig {
            split_steps: 4,
            smooth_factor: 0.25,
            ..EditorConfig::default()
        };

        let split = ToolId::SplitEdge.def(&config);
        assert_eq!(split.property("steps").unwrap().default, Some(PropertyValue::Int(4)));
        let smooth = ToolId::VertexSmooth.def(&config);
        assert_eq!(
            smooth.property("factor").unwrap().default,
            Some(PropertyValue::Float(0.25))
        );
        // Filled from the context's select mask at invoke time.
        assert_eq!(ToolId::Delete.def(&config).property("sel_mask").unwrap().default, None);
    }

    #[test]
    fn test_registry_json() {
        let config = EditorConfig::default();

        let json = registry_json(&config).unwrap();
        let defs: Vec<ToolDef> = serde_json::from_str(&json).unwrap();

        assert_eq!(defs, registry(&config));
        assert_eq!(defs.len(), ToolId::ALL.len());
        let split = defs[0].to_json().unwrap();
        assert_eq!(split["path"], "mesh.split_edge");
        assert_eq!(split["properties"][0]["type"], "int");
        assert_eq!(split["properties"][0]["max"], MAX_STEPS);
    }
}

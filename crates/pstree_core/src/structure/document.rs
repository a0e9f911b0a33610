//! Product structure document types.
//!
//! These types mirror the exported JSON before it is materialized into a
//! [`ProductTree`](crate::tree::ProductTree). Only the fields the loader
//! consumes are modelled; anything else in the export is ignored.

use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Name given to nodes that carry neither an instance nor a reference name.
pub const UNNAMED_NODE: &str = "unnamed";

/// A complete exported product structure.
#[derive(Clone, Debug, Deserialize)]
pub struct StructureDocument {
    /// Export metadata, including the reference list
    #[serde(rename = "Export_Info")]
    pub export_info: ExportInfo,

    /// Root of the assembly tree
    #[serde(rename = "Root")]
    pub root: NodeDescriptor,
}

impl StructureDocument {
    /// Parse a document from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl FromStr for StructureDocument {
    type Err = serde_json::Error;

    fn from_str(json: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(json)
    }
}

/// The `Export_Info` block.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExportInfo {
    /// Every sub-assembly that nodes may reference
    #[serde(rename = "Reference List", default)]
    pub references: Vec<ReferenceDescriptor>,
}

/// One entry of the reference list: a named, versioned sub-assembly file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ReferenceDescriptor {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "V_version", deserialize_with = "string_or_number")]
    pub version: String,

    /// Asset location, relative to the document's folder
    pub url: String,
}

impl ReferenceDescriptor {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            url: url.into(),
        }
    }
}

/// The `Instance` block of a node.
#[derive(Clone, Debug, Deserialize)]
pub struct InstanceInfo {
    #[serde(rename = "instanceName")]
    pub instance_name: String,
}

/// The `Reference` block of a node: which sub-assembly it places.
#[derive(Clone, Debug, Deserialize)]
pub struct ReferencePointer {
    #[serde(rename = "referenceName")]
    pub reference_name: String,

    #[serde(rename = "V_version", default, deserialize_with = "string_or_number")]
    pub version: String,
}

/// One node of the assembly tree as exported.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodeDescriptor {
    #[serde(rename = "Instance", default)]
    pub instance: Option<InstanceInfo>,

    #[serde(rename = "Reference", default)]
    pub reference: Option<ReferencePointer>,

    /// Name used when the node is not an instance
    #[serde(rename = "referenceName", default)]
    pub reference_name: Option<String>,

    /// Row-major 3x4 affine placement
    #[serde(default)]
    pub matrix: Option<Vec<f64>>,

    #[serde(default)]
    pub children: Vec<NodeDescriptor>,
}

impl NodeDescriptor {
    /// The name the materialized node should carry.
    ///
    /// Instance name first, then the node's own `referenceName`, then the
    /// name of the reference it points at.
    pub fn display_name(&self) -> &str {
        if let Some(instance) = &self.instance {
            return &instance.instance_name;
        }
        if let Some(name) = &self.reference_name {
            return name;
        }
        if let Some(reference) = &self.reference {
            return &reference.reference_name;
        }
        UNNAMED_NODE
    }

    /// Number of descriptors in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(NodeDescriptor::subtree_len).sum::<usize>()
    }
}

/// Folder part of a document URL, including the trailing `/`.
///
/// Returns an empty string when the URL has no `/`.
pub fn document_folder(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[..=idx],
        None => "",
    }
}

/// File name of a document URL without its extension.
pub fn document_stem(url: &str) -> &str {
    let filename = match url.rfind('/') {
        Some(idx) => &url[idx + 1..],
        None => url,
    };
    match filename.rfind('.') {
        Some(idx) => &filename[..idx],
        None => filename,
    }
}

/// Resolve an asset URL from the reference list against the document folder.
pub fn resolve_asset_url(folder: &str, relative: &str) -> String {
    format!("{folder}{relative}")
}

/// Exporters write versions either as strings or as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Version::deserialize(deserializer)? {
        Version::Text(text) => text,
        Version::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Export_Info": {
            "Tool": "exporter 3.1",
            "Reference List": [
                { "Name": "Bolt", "V_version": "A.1", "url": "parts/bolt.zcad", "Type": "Part" },
                { "Name": "Plate", "V_version": 2, "url": "parts/plate.zcad" }
            ]
        },
        "Root": {
            "referenceName": "Assembly",
            "children": [
                {
                    "Instance": { "instanceName": "Bolt.1" },
                    "Reference": { "referenceName": "Bolt", "V_version": "A.1" },
                    "matrix": [1,0,0,10, 0,1,0,0, 0,0,1,0]
                },
                { "referenceName": "Group" }
            ]
        }
    }"#;

    #[test]
    fn test_parse_document() {
        let doc = StructureDocument::from_str(SAMPLE).unwrap();

        assert_eq!(doc.export_info.references.len(), 2);
        assert_eq!(
            doc.export_info.references[0],
            ReferenceDescriptor::new("Bolt", "A.1", "parts/bolt.zcad")
        );
        // numeric versions are kept as text
        assert_eq!(doc.export_info.references[1].version, "2");

        assert_eq!(doc.root.display_name(), "Assembly");
        assert_eq!(doc.root.children.len(), 2);
        assert_eq!(doc.root.subtree_len(), 3);

        let bolt = &doc.root.children[0];
        assert_eq!(bolt.display_name(), "Bolt.1");
        assert_eq!(bolt.reference.as_ref().unwrap().reference_name, "Bolt");
        assert_eq!(bolt.matrix.as_ref().unwrap().len(), 12);
        assert!(bolt.children.is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let json = r#"{ "Export_Info": { "Reference List": [] } }"#;
        assert!(StructureDocument::from_str(json).is_err());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let node = NodeDescriptor::default();
        assert_eq!(node.display_name(), UNNAMED_NODE);

        let node = NodeDescriptor {
            reference: Some(ReferencePointer {
                reference_name: "Gear".into(),
                version: "1".into(),
            }),
            ..Default::default()
        };
        assert_eq!(node.display_name(), "Gear");
    }

    #[test]
    fn test_document_folder_and_stem() {
        assert_eq!(document_folder("data/cars/car.json"), "data/cars/");
        assert_eq!(document_folder("car.json"), "");
        assert_eq!(document_stem("data/cars/car.json"), "car");
        assert_eq!(document_stem("https://host/x/structure"), "structure");
        assert_eq!(
            resolve_asset_url(document_folder("data/car.json"), "parts/a.zcad"),
            "data/parts/a.zcad"
        );
    }
}

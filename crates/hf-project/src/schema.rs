//! Parameter tree.
//!
//! A vehicle file is a nested YAML mapping. Every mapping becomes a node
//! addressed by its own key, holding that mapping's scalar entries. Nested
//! mappings are separate nodes, so `HELI: { WT: 5000, MR: { R: 18 } }`
//! yields nodes `HELI` (field `WT`) and `MR` (field `R`).

use crate::{ProjectError, ProjectResult};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParamNode {
    /// Key of the enclosing node, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, ParamValue>,
}

impl ParamNode {
    pub fn get(&self, field: &str) -> Option<&ParamValue> {
        self.fields.get(field)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParamTree {
    pub nodes: BTreeMap<String, ParamNode>,
}

impl ParamTree {
    pub fn from_yaml_str(content: &str) -> ProjectResult<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> ProjectResult<Self> {
        let Value::Mapping(root) = value else {
            return Err(ProjectError::Schema {
                what: "top level must be a mapping".to_string(),
            });
        };
        let mut tree = ParamTree::default();
        for (key, child) in root {
            let key = key_name(key)?;
            match child {
                Value::Mapping(_) => tree.collect(&key, None, child)?,
                _ => {
                    return Err(ProjectError::Schema {
                        what: format!("top-level entry '{key}' must be a mapping"),
                    });
                }
            }
        }
        Ok(tree)
    }

    fn collect(&mut self, name: &str, parent: Option<&str>, value: &Value) -> ProjectResult<()> {
        if self.nodes.contains_key(name) {
            return Err(ProjectError::Schema {
                what: format!("node '{name}' defined more than once"),
            });
        }
        let Value::Mapping(map) = value else {
            return Ok(());
        };
        self.nodes.insert(
            name.to_string(),
            ParamNode {
                parent: parent.map(str::to_string),
                fields: BTreeMap::new(),
            },
        );
        for (key, child) in map {
            let key = key_name(key)?;
            let scalar = match child {
                Value::Mapping(_) => {
                    self.collect(&key, Some(name), child)?;
                    continue;
                }
                Value::Number(n) => n.as_f64().map(ParamValue::Number),
                Value::Bool(b) => Some(ParamValue::Number(if *b { 1.0 } else { 0.0 })),
                Value::String(s) => Some(ParamValue::Text(s.clone())),
                Value::Null => None,
                Value::Sequence(_) | Value::Tagged(_) => {
                    return Err(ProjectError::Schema {
                        what: format!("unsupported value for {name}.{key}"),
                    });
                }
            };
            if let (Some(v), Some(node)) = (scalar, self.nodes.get_mut(name)) {
                node.fields.insert(key, v);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&ParamNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, node: &str, field: &str) -> bool {
        self.value(node, field).is_some()
    }

    fn value(&self, node: &str, field: &str) -> Option<&ParamValue> {
        self.nodes.get(node).and_then(|n| n.get(field))
    }

    pub fn number(&self, node: &str, field: &str) -> ProjectResult<f64> {
        match self.value(node, field) {
            Some(ParamValue::Number(v)) => Ok(*v),
            Some(ParamValue::Text(_)) => Err(ProjectError::WrongType {
                node: node.to_string(),
                field: field.to_string(),
                expected: "number",
            }),
            None => Err(not_found(node, field)),
        }
    }

    pub fn text(&self, node: &str, field: &str) -> ProjectResult<&str> {
        match self.value(node, field) {
            Some(ParamValue::Text(s)) => Ok(s),
            Some(ParamValue::Number(_)) => Err(ProjectError::WrongType {
                node: node.to_string(),
                field: field.to_string(),
                expected: "string",
            }),
            None => Err(not_found(node, field)),
        }
    }

    /// Overwrite an existing numeric field.
    pub fn set_number(&mut self, node: &str, field: &str, value: f64) -> ProjectResult<()> {
        let Some(slot) = self.nodes.get_mut(node).and_then(|n| n.fields.get_mut(field)) else {
            return Err(not_found(node, field));
        };
        match slot {
            ParamValue::Number(v) => {
                *v = value;
                Ok(())
            }
            ParamValue::Text(_) => Err(ProjectError::WrongType {
                node: node.to_string(),
                field: field.to_string(),
                expected: "number",
            }),
        }
    }

    /// Create or overwrite a numeric field, creating the node if needed.
    pub fn insert_number(&mut self, node: &str, field: &str, value: f64) {
        self.nodes
            .entry(node.to_string())
            .or_default()
            .fields
            .insert(field.to_string(), ParamValue::Number(value));
    }
}

fn key_name(key: &Value) -> ProjectResult<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ProjectError::Schema {
            what: "mapping keys must be strings".to_string(),
        }),
    }
}

fn not_found(node: &str, field: &str) -> ProjectError {
    ProjectError::NotFound {
        node: node.to_string(),
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
ENV:
  GRAV: 32.174
  HMAP_PATH: terrain/height.png
HELI:
  WT: 5000
  MR:
    R: 18.0
    B: 4
"#;

    #[test]
    fn nested_mappings_become_nodes() {
        let tree = ParamTree::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.number("HELI", "WT").unwrap(), 5000.0);
        assert_eq!(tree.number("MR", "B").unwrap(), 4.0);
        assert_eq!(tree.node("MR").unwrap().parent.as_deref(), Some("HELI"));
        assert_eq!(tree.text("ENV", "HMAP_PATH").unwrap(), "terrain/height.png");
        assert!(!tree.contains("HELI", "MR"));
    }

    #[test]
    fn type_and_lookup_errors() {
        let tree = ParamTree::from_yaml_str(SAMPLE).unwrap();
        assert!(matches!(
            tree.number("ENV", "HMAP_PATH"),
            Err(ProjectError::WrongType { .. })
        ));
        assert!(matches!(
            tree.number("TR", "R"),
            Err(ProjectError::NotFound { .. })
        ));
    }

    #[test]
    fn set_requires_existing_field() {
        let mut tree = ParamTree::from_yaml_str(SAMPLE).unwrap();
        tree.set_number("MR", "R", 20.0).unwrap();
        assert_eq!(tree.number("MR", "R").unwrap(), 20.0);
        assert!(tree.set_number("MR", "RPM", 1.0).is_err());
        assert!(tree.set_number("ENV", "HMAP_PATH", 1.0).is_err());

        tree.insert_number("MR", "OMEGA", 40.0);
        assert_eq!(tree.number("MR", "OMEGA").unwrap(), 40.0);
    }

    #[test]
    fn duplicate_node_rejected() {
        let yaml = "A:\n  X:\n    V: 1\nB:\n  X:\n    V: 2\n";
        assert!(matches!(
            ParamTree::from_yaml_str(yaml),
            Err(ProjectError::Schema { .. })
        ));
    }

    #[test]
    fn scalar_root_rejected() {
        assert!(ParamTree::from_yaml_str("42").is_err());
        assert!(ParamTree::from_yaml_str("A: 3").is_err());
    }
}

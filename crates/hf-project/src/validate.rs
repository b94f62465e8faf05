//! Required-parameter validation.

use crate::schema::{ParamTree, ParamValue};

/// Fields a node must provide.
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    pub node: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing parameters: {}", format_pairs(.missing))]
    MissingFields { missing: Vec<(String, String)> },

    #[error("Invalid value: {node}.{field} ({reason})")]
    InvalidValue {
        node: String,
        field: String,
        reason: String,
    },
}

fn format_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(n, f)| format!("{n}.{f}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check every required (node, field) pair, reporting all missing ones at once.
pub fn validate_required(tree: &ParamTree, required: &[Requirement]) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    for req in required {
        for field in req.fields {
            if !tree.contains(req.node, field) {
                missing.push((req.node.to_string(), field.to_string()));
            }
        }
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields { missing });
    }

    for (name, node) in &tree.nodes {
        for (field, value) in &node.fields {
            if let ParamValue::Number(v) = value {
                if !v.is_finite() {
                    return Err(ValidationError::InvalidValue {
                        node: name.clone(),
                        field: field.clone(),
                        reason: "must be finite".to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: &[Requirement] = &[
        Requirement {
            node: "ENV",
            fields: &["GRAV", "R"],
        },
        Requirement {
            node: "MR",
            fields: &["R", "B"],
        },
    ];

    #[test]
    fn all_missing_pairs_reported_together() {
        let tree = ParamTree::from_yaml_str("ENV:\n  GRAV: 32.2\nHELI:\n  WT: 1\n").unwrap();
        let err = validate_required(&tree, REQUIRED).unwrap_err();
        let ValidationError::MissingFields { missing } = &err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(
            missing,
            &vec![
                ("ENV".to_string(), "R".to_string()),
                ("MR".to_string(), "R".to_string()),
                ("MR".to_string(), "B".to_string()),
            ]
        );
        let msg = err.to_string();
        assert!(msg.contains("ENV.R") && msg.contains("MR.B"));
    }

    #[test]
    fn complete_tree_passes() {
        let tree =
            ParamTree::from_yaml_str("ENV:\n  GRAV: 32.2\n  R: 1716\nMR:\n  R: 18\n  B: 4\n")
                .unwrap();
        assert!(validate_required(&tree, REQUIRED).is_ok());
    }

    #[test]
    fn non_finite_numbers_rejected() {
        let tree = ParamTree::from_yaml_str(
            "ENV:\n  GRAV: .nan\n  R: 1716\nMR:\n  R: 18\n  B: 4\n",
        )
        .unwrap();
        assert!(matches!(
            validate_required(&tree, REQUIRED),
            Err(ValidationError::InvalidValue { .. })
        ));
    }
}

use hf_project::{ParamTree, ProjectError, Requirement, load_yaml, load_yaml_validated, to_json};
use std::io::Write;
use std::path::PathBuf;

const REQUIRED: &[Requirement] = &[
    Requirement {
        node: "TRIM",
        fields: &["YAW", "GR_ALT"],
    },
    Requirement {
        node: "FLG",
        fields: &["K"],
    },
];

fn write_temp(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("hf_project_{}_{name}", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn load_and_validate_from_disk() {
    let path = write_temp(
        "ok.yaml",
        "HELI:\n  WT: 5000\n  TRIM:\n    YAW: 0\n    GR_ALT: 50\n  FLG:\n    K: 12000\n",
    );
    let tree = load_yaml_validated(&path, REQUIRED).unwrap();
    assert_eq!(tree.number("TRIM", "GR_ALT").unwrap(), 50.0);

    let json = to_json(&tree).unwrap();
    let back: ParamTree = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tree);
    std::fs::remove_file(path).ok();
}

#[test]
fn missing_fields_fail_validation() {
    let path = write_temp("missing.yaml", "HELI:\n  TRIM:\n    YAW: 0\n");
    assert!(load_yaml(&path).is_ok());
    let err = load_yaml_validated(&path, REQUIRED).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));
    let msg = err.to_string();
    assert!(msg.contains("TRIM.GR_ALT"));
    assert!(msg.contains("FLG.K"));
    std::fs::remove_file(path).ok();
}

#[test]
fn unreadable_file_is_io_error() {
    let err = load_yaml(std::path::Path::new("/definitely/not/here.yaml")).unwrap_err();
    assert!(matches!(err, ProjectError::Io(_)));
}

use hf_project::ParamTree;

pub const HOVER_YAML: &str = include_str!("../tests/data/hover.yaml");

pub fn hover_tree() -> ParamTree {
    ParamTree::from_yaml_str(HOVER_YAML).unwrap()
}

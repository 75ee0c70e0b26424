use super::path::{get_nested, remove_nested, set_nested};
use super::*;

fn parse(s: &str) -> toml::Value {
    toml::from_str(s).unwrap()
}

/// Merge a workspace overlay on top of `baseline` and enforce restrictions.
fn apply_workspace(baseline: &str, workspace: &str) -> toml::Value {
    let baseline = parse(baseline);
    let workspace = parse(workspace);
    let mut merged = baseline.clone();
    deep_merge(&mut merged, &workspace);
    enforce_restrictions(&mut merged, &baseline, &workspace);
    merged
}

#[test]
fn test_deep_merge_scalars() {
    let mut base = parse(
        r#"
        [autonomy]
        default_mode = "guided"
        request_ttl_secs = 90
    "#,
    );
    let overlay = parse(
        r"
        [autonomy]
        request_ttl_secs = 30
    ",
    );

    deep_merge(&mut base, &overlay);

    let autonomy = base["autonomy"].as_table().unwrap();
    assert_eq!(autonomy["default_mode"].as_str(), Some("guided"));
    assert_eq!(autonomy["request_ttl_secs"].as_integer(), Some(30));
}

#[test]
fn test_deep_merge_arrays_replace() {
    let mut base = parse(
        r#"
        [classifier]
        extra_exfil_patterns = ["\\bftp\\b"]
    "#,
    );
    let overlay = parse(
        r#"
        [classifier]
        extra_exfil_patterns = ["\\bsftp\\b"]
    "#,
    );

    deep_merge(&mut base, &overlay);

    let arr = base["classifier"]["extra_exfil_patterns"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0].as_str(), Some("\\bsftp\\b"));
}

#[test]
fn test_deep_merge_tracking_records_layers() {
    let mut base = parse(
        r#"
        [logging]
        level = "info"
    "#,
    );
    let mut sources = FieldSources::new();
    let overlay = parse(
        r#"
        [logging]
        level = "debug"
        [storage]
        state_dir = "/var/lib/tollgate"
    "#,
    );

    deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::User, &mut sources);

    assert_eq!(sources.get("logging.level"), Some(&ConfigLayer::User));
    assert_eq!(sources.get("storage.state_dir"), Some(&ConfigLayer::User));
    assert_eq!(base["storage"]["state_dir"].as_str(), Some("/var/lib/tollgate"));
}

#[test]
fn test_workspace_can_tighten_mode() {
    let merged = apply_workspace(
        r#"
        [autonomy]
        default_mode = "guided"
    "#,
        r#"
        [autonomy]
        default_mode = "safe"
    "#,
    );
    assert_eq!(merged["autonomy"]["default_mode"].as_str(), Some("safe"));
}

#[test]
fn test_workspace_cannot_loosen_mode() {
    let merged = apply_workspace(
        r#"
        [autonomy]
        default_mode = "guided"
    "#,
        r#"
        [autonomy]
        default_mode = "unrestricted"
    "#,
    );
    assert_eq!(merged["autonomy"]["default_mode"].as_str(), Some("guided"));
}

#[test]
fn test_workspace_rule_lists_union() {
    let merged = apply_workspace(
        r#"
        [classifier]
        extra_sensitive_domains = ["intranet.corp"]
    "#,
        r#"
        [classifier]
        extra_sensitive_domains = ["payroll.corp"]
    "#,
    );
    let domains: Vec<&str> = merged["classifier"]["extra_sensitive_domains"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(toml::Value::as_str)
        .collect();
    assert_eq!(domains, vec!["payroll.corp", "intranet.corp"]);
}

#[test]
fn test_workspace_cannot_empty_rule_lists() {
    let merged = apply_workspace(
        r#"
        [classifier]
        extra_elevated_patterns = ["\\bterraform\\s+apply\\b"]
    "#,
        r"
        [classifier]
        extra_elevated_patterns = []
    ",
    );
    assert_eq!(
        merged["classifier"]["extra_elevated_patterns"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_workspace_cannot_redirect_storage() {
    let merged = apply_workspace(
        r#"
        [storage]
        state_dir = "/home/me/.tollgate/state"
    "#,
        r#"
        [storage]
        state_dir = "./fake-state"
        quarantine_dir = "./fake-quarantine"
    "#,
    );
    assert_eq!(
        merged["storage"]["state_dir"].as_str(),
        Some("/home/me/.tollgate/state")
    );
    assert!(get_nested(&merged, &["storage", "quarantine_dir"]).is_none());
}

#[test]
fn test_workspace_unrelated_fields_pass_through() {
    let merged = apply_workspace(
        r#"
        [logging]
        level = "info"
    "#,
        r#"
        [logging]
        level = "trace"
    "#,
    );
    assert_eq!(merged["logging"]["level"].as_str(), Some("trace"));
}

#[test]
fn test_set_and_remove_nested() {
    let mut val = parse("");
    set_nested(
        &mut val,
        &["storage", "state_dir"],
        toml::Value::String("/x".to_owned()),
    );
    assert_eq!(val["storage"]["state_dir"].as_str(), Some("/x"));

    remove_nested(&mut val, &["storage", "state_dir"]);
    assert!(get_nested(&val, &["storage", "state_dir"]).is_none());
    assert!(get_nested(&val, &["storage"]).is_some());
}

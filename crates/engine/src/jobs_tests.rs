// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn path(s: &str) -> DatasitePath {
    DatasitePath::new(s).unwrap()
}

#[parameterized(
    job_file = { "app_data/job/train/output.txt", true },
    job_config = { "app_data/job/train/config.yaml", true },
    job_root_only = { "app_data/job", false },
    other_app_data = { "app_data/notes/readme.md", false },
    plain = { "results/out.txt", false },
)]
fn job_path_detection(p: &str, expected: bool) {
    assert_eq!(is_job_path(&path(p)), expected);
}

#[test]
fn job_name_extraction() {
    assert_eq!(job_name(&path("app_data/job/train/output.txt")), Some("train"));
    assert_eq!(job_name(&path("results/out.txt")), None);
}

#[test]
fn job_config_key_shape() {
    assert_eq!(job_config_key("train"), "app_data/job/train/config.yaml");
}

#[test]
fn submitter_parses_yaml() {
    let config = b"submitted_by: ds@example.com\nstatus: approved\n";
    assert_eq!(submitter_from_config(config), Some("ds@example.com".to_string()));
}

#[test]
fn submitter_missing_field_is_none() {
    assert_eq!(submitter_from_config(b"status: approved\n"), None);
}

#[test]
fn submitter_unparseable_is_none() {
    assert_eq!(submitter_from_config(b"{not yaml: ["), None);
}

#[test]
fn non_job_paths_broadcast() {
    let approved = vec!["a@x.com".to_string(), "b@x.com".to_string()];
    assert_eq!(recipients_for(&path("results/out.txt"), None, &approved), approved);
}

#[test]
fn job_paths_route_to_submitter_only() {
    let approved = vec!["a@x.com".to_string(), "b@x.com".to_string()];
    assert_eq!(
        recipients_for(&path("app_data/job/train/out.txt"), Some("b@x.com"), &approved),
        vec!["b@x.com".to_string()]
    );
}

#[test]
fn unknown_submitter_is_never_broadcast() {
    let approved = vec!["a@x.com".to_string()];
    assert!(recipients_for(&path("app_data/job/train/out.txt"), None, &approved).is_empty());
    assert!(
        recipients_for(&path("app_data/job/train/out.txt"), Some("c@x.com"), &approved)
            .is_empty()
    );
}

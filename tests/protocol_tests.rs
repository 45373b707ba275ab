//! Scanner output flowing through parsing, planning and the report formats.

use std::path::PathBuf;

use dupewise::actions::DeletionPlanner;
use dupewise::duplicates::{GroupKind, GroupModel};
use dupewise::error::ExitCode;
use dupewise::output::{CsvOutput, JsonOutput, TextOutput};
use dupewise::protocol::{parse, parse_bytes, AnomalyKind};

const TWO_GROUPS: &str =
    "EXACT|1.0\n/a\n/b\n---GROUP---\nSIMILAR|0.8\n/c|0.9\n/d|0.7\n---GROUP---\n";

#[test]
fn test_two_group_output_end_to_end() {
    let report = parse(TWO_GROUPS);
    assert!(report.is_clean());
    let model = GroupModel::new(report.groups);

    assert_eq!(model.exact_group_count(), 1);
    assert_eq!(model.similar_group_count(), 1);
    assert!(!model.no_duplicates_found());

    let plan = DeletionPlanner::plan(&model);
    assert_eq!(plan.candidates(), vec![PathBuf::from("/b")]);
    assert_eq!(plan.groups()[0].keeper, PathBuf::from("/a"));

    let text = TextOutput::new(&model, &[], false).render();
    assert!(text.contains("Exact duplicates (1 groups)"));
    assert!(text.contains("    keep   /a"));
    assert!(text.contains("    delete /b"));
    assert!(text.contains("Similar files (1 groups)"));
    assert!(text.contains(" 90.0% /c"));
    assert!(text.contains(" 70.0% /d"));
}

#[test]
fn test_json_report_shape() {
    let model = GroupModel::new(parse(TWO_GROUPS).groups);
    let json = JsonOutput::new(&model, &[], ExitCode::Success)
        .to_json()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let groups = value["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["kind"], "exact");
    assert_eq!(groups[0]["files"][0]["keeper"], true);
    assert_eq!(groups[0]["files"][1]["keeper"], false);
    assert_eq!(groups[1]["kind"], "similar");
    assert_eq!(groups[1]["files"][1]["similarity"], 0.7);
    assert_eq!(value["summary"]["exact_groups"], 1);
    assert_eq!(value["summary"]["exit_code_name"], "DW000");
}

#[test]
fn test_csv_report_roles() {
    let model = GroupModel::new(parse(TWO_GROUPS).groups);
    let csv = CsvOutput::new(&model).to_string().unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert!(lines[0].starts_with("group_id,kind,role,path"));
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("1,exact,keep,/a,"));
    assert!(lines[2].starts_with("1,exact,delete,/b,"));
    assert!(lines[3].starts_with("2,similar,review,/c,"));
    assert!(lines[4].starts_with("2,similar,review,/d,"));
}

#[test]
fn test_empty_output_reports_no_duplicates() {
    let report = parse_bytes(b"").unwrap();
    let model = GroupModel::new(report.groups);

    assert!(model.no_duplicates_found());
    assert!(DeletionPlanner::plan(&model).is_empty());
    assert_eq!(
        TextOutput::new(&model, &[], false).render(),
        "No duplicates found.\n"
    );
}

#[test]
fn test_singletons_only_count_as_no_duplicates() {
    let model = GroupModel::new(parse("EXACT|1.0\n/only\n---GROUP---\nSIMILAR|0.9\n/lonely\n").groups);

    assert_eq!(model.raw_groups().len(), 2);
    assert!(model.no_duplicates_found());
    assert_eq!(model.summary().singleton_groups, 2);
    assert!(DeletionPlanner::plan(&model).is_empty());
}

#[test]
fn test_irregular_output_is_defaulted_and_reported() {
    let input = "/stray\n\
                 EXACT|abc\n\
                 /x\n\
                 /x\n\
                 SIMILAR|1.5\n\
                 /weird|name.txt\n\
                 ---GROUP---\n\
                 /after\n";
    let report = parse(input);

    let kinds: Vec<AnomalyKind> = report.anomalies.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AnomalyKind::MissingHeader,
            AnomalyKind::UnterminatedGroup,
            AnomalyKind::MalformedHeaderSimilarity,
            AnomalyKind::DuplicatePath,
            AnomalyKind::UnterminatedGroup,
            AnomalyKind::SimilarityOutOfRange,
            AnomalyKind::AmbiguousSeparator,
            AnomalyKind::HeaderlessGroup,
        ]
    );

    let groups = &report.groups;
    assert_eq!(groups.len(), 4);
    assert_eq!(groups[0].kind, GroupKind::Exact);
    assert_eq!(groups[0].members[0].path, PathBuf::from("/stray"));
    assert_eq!(groups[1].declared_similarity, 1.0);
    assert_eq!(groups[1].len(), 1);
    assert_eq!(groups[2].kind, GroupKind::Similar);
    assert_eq!(groups[2].declared_similarity, 1.0);
    assert_eq!(groups[2].members[0].path, PathBuf::from("/weird|name.txt"));
    assert_eq!(groups[3].kind, GroupKind::Similar);
    assert_eq!(groups[3].members[0].path, PathBuf::from("/after"));

    let model = GroupModel::new(report.groups.clone());
    let text = TextOutput::new(&model, &report.anomalies, false).render();
    assert!(text.contains("8 irregular line(s) in scanner output:"));
}

#[test]
fn test_invalid_utf8_is_an_error() {
    assert!(parse_bytes(b"EXACT|1.0\n/a\xff\n").is_err());
}

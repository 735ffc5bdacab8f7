//! Integration tests for returned-field projection.

use call_schema::{
    project, CheckOptions, ProjectionError, RawNode, ReturnRequest, SchemaTree, Snapshot,
};
use serde_json::{json, Value};

fn snapshot() -> Snapshot {
    let mut snapshot = Snapshot::new();
    snapshot.insert(
        "getLine",
        RawNode::complex(
            "getLine",
            vec![
                RawNode::choice(vec![
                    RawNode::leaf("uuid"),
                    RawNode::group(vec![
                        RawNode::leaf("pattern"),
                        RawNode::leaf("routePartitionName").optional(),
                    ]),
                ]),
                RawNode::complex(
                    "returnedTags",
                    vec![
                        RawNode::leaf("pattern").optional(),
                        RawNode::leaf("description").optional(),
                        RawNode::leaf("usage").optional(),
                        RawNode::choice(vec![
                            RawNode::leaf("shareLineAppearanceCssName"),
                            RawNode::group(vec![
                                RawNode::leaf("cssUuid"),
                                RawNode::leaf("cssClass").optional(),
                            ]),
                        ])
                        .optional(),
                        RawNode::complex(
                            "callForwardAll",
                            vec![
                                RawNode::leaf("forwardToVoiceMail").optional(),
                                RawNode::leaf("destination").optional(),
                            ],
                        )
                        .optional(),
                        RawNode::complex(
                            "associatedDevices",
                            vec![RawNode::leaf("device").optional()],
                        )
                        .optional(),
                    ],
                )
                .optional(),
            ],
        ),
    );
    snapshot.insert(
        "addLine",
        RawNode::complex("addLine", vec![RawNode::leaf("pattern")]),
    );
    snapshot
}

fn get_line() -> SchemaTree {
    SchemaTree::build(&snapshot(), "getLine").unwrap()
}

fn no_id() -> CheckOptions {
    CheckOptions::new().auto_include_identifier(false)
}

fn projected(tags: &[&str], options: &CheckOptions) -> Value {
    let tree = get_line();
    let request = ReturnRequest::new().tags(tags.iter().copied());
    Value::Object(project(tree.root(), &request, options).unwrap())
}

// === Default Projection ===

mod everything {
    use super::*;

    #[test]
    fn empty_request_projects_all_with_first_alternative() {
        assert_eq!(
            projected(&[], &no_id()),
            json!({
                "pattern": "",
                "description": "",
                "usage": "",
                "shareLineAppearanceCssName": "",
                "callForwardAll": { "forwardToVoiceMail": true, "destination": true },
                "associatedDevices": { "device": true }
            })
        );
    }

    #[test]
    fn identifier_leads_by_default() {
        let result = projected(&[], &CheckOptions::new());
        let keys: Vec<_> = result.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.first().map(String::as_str), Some("uuid"));
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn identifier_only_request() {
        assert_eq!(projected(&["uuid"], &no_id()), json!({ "uuid": "" }));
    }
}

// === Tag Selection ===

mod tags {
    use super::*;

    #[test]
    fn complex_tag_expands_fully() {
        assert_eq!(
            projected(&["callForwardAll"], &CheckOptions::new()),
            json!({
                "uuid": "",
                "callForwardAll": { "forwardToVoiceMail": true, "destination": true }
            })
        );
    }

    #[test]
    fn members_of_one_group_branch_together() {
        assert_eq!(
            projected(&["cssUuid", "cssClass"], &no_id()),
            json!({ "cssUuid": "", "cssClass": "" })
        );
    }

    #[test]
    fn tags_from_rival_branches_conflict() {
        let tree = get_line();
        let request = ReturnRequest::new().tags(["pattern", "shareLineAppearanceCssName", "cssClass"]);
        match project(tree.root(), &request, &no_id()) {
            Err(ProjectionError::ChoiceTagConflict { tags, path }) => {
                assert_eq!(tags, vec!["shareLineAppearanceCssName", "cssClass"]);
                assert_eq!(path, "getLine.returnedTags");
            }
            other => panic!("expected ChoiceTagConflict, got {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_lists_level() {
        let tree = get_line();
        let request = ReturnRequest::new().tags(["colour"]);
        match project(tree.root(), &request, &no_id()) {
            Err(ProjectionError::UnknownTag { tag, valid, .. }) => {
                assert_eq!(tag, "colour");
                assert!(valid.contains(&"cssUuid".to_string()));
                assert!(valid.contains(&"associatedDevices".to_string()));
            }
            other => panic!("expected UnknownTag, got {:?}", other),
        }
    }

    #[test]
    fn nested_names_are_not_top_level_tags() {
        let tree = get_line();
        let request = ReturnRequest::new().tags(["destination"]);
        assert!(matches!(
            project(tree.root(), &request, &no_id()),
            Err(ProjectionError::UnknownTag { .. })
        ));
    }
}

// === Nested Choices ===

mod nested_choices {
    use super::*;

    /// `returnedTags: { Choice{ Choice{x, y}, z }, Choice{ Group{a, Choice{p, q}}, r } }`
    fn nested() -> SchemaTree {
        SchemaTree::from_raw(
            "getNested",
            &RawNode::complex(
                "getNested",
                vec![RawNode::complex(
                    "returnedTags",
                    vec![
                        RawNode::choice(vec![
                            RawNode::choice(vec![RawNode::leaf("x"), RawNode::leaf("y")]),
                            RawNode::leaf("z"),
                        ]),
                        RawNode::choice(vec![
                            RawNode::group(vec![
                                RawNode::leaf("a"),
                                RawNode::choice(vec![RawNode::leaf("p"), RawNode::leaf("q")]),
                            ]),
                            RawNode::leaf("r"),
                        ]),
                    ],
                )],
            ),
        )
    }

    fn conflict(tags: &[&str]) -> Vec<String> {
        let tree = nested();
        let request = ReturnRequest::new().tags(tags.iter().copied());
        match project(tree.root(), &request, &no_id()) {
            Err(ProjectionError::ChoiceTagConflict { tags, path }) => {
                assert_eq!(path, "getNested.returnedTags");
                tags
            }
            other => panic!("expected ChoiceTagConflict, got {:?}", other),
        }
    }

    #[test]
    fn same_inner_choice_conflicts() {
        assert_eq!(conflict(&["x", "y"]), vec!["x", "y"]);
    }

    #[test]
    fn inner_and_outer_branch_conflict() {
        assert_eq!(conflict(&["x", "z"]), vec!["x", "z"]);
    }

    #[test]
    fn choice_inside_group_branch_conflicts() {
        assert_eq!(conflict(&["p", "q"]), vec!["p", "q"]);
        assert_eq!(conflict(&["r", "a"]), vec!["r", "a"]);
    }

    #[test]
    fn compatible_tags_across_levels() {
        let tree = nested();
        let request = ReturnRequest::new().tags(["x", "a", "p"]);
        let result = project(tree.root(), &request, &no_id()).unwrap();
        assert_eq!(
            Value::Object(result),
            json!({ "x": "", "a": "", "p": "" })
        );
    }
}

// === Drill-Down ===

mod drill_down {
    use super::*;

    #[test]
    fn drilled_tags_are_renested() {
        let tree = get_line();
        let request = ReturnRequest::new()
            .tags(["destination"])
            .drill(["callForwardAll"]);
        let result = project(tree.root(), &request, &CheckOptions::new()).unwrap();
        assert_eq!(
            Value::Object(result),
            json!({ "uuid": "", "callForwardAll": { "destination": "" } })
        );
    }

    #[test]
    fn drilled_everything() {
        let tree = get_line();
        let request = ReturnRequest::new().drill(["associatedDevices"]);
        let result = project(tree.root(), &request, &no_id()).unwrap();
        assert_eq!(
            Value::Object(result),
            json!({ "associatedDevices": { "device": "" } })
        );
    }

    #[test]
    fn missing_hop_named() {
        let tree = get_line();
        let request = ReturnRequest::new().drill(["callForwardAll", "timer"]);
        match project(tree.root(), &request, &no_id()) {
            Err(ProjectionError::DrillDownMissing { hop, path }) => {
                assert_eq!(hop, "timer");
                assert_eq!(path, "getLine.returnedTags.callForwardAll");
            }
            other => panic!("expected DrillDownMissing, got {:?}", other),
        }
    }
}

// === Configuration ===

mod configuration {
    use super::*;

    #[test]
    fn no_returnable_fields() {
        let tree = SchemaTree::build(&snapshot(), "addLine").unwrap();
        let result = project(tree.root(), &ReturnRequest::new(), &CheckOptions::new());
        assert!(matches!(
            result,
            Err(ProjectionError::NoReturnableFields { element }) if element == "addLine"
        ));
    }

    #[test]
    fn skip_return_check_keeps_drill_nesting() {
        let tree = SchemaTree::build(&snapshot(), "addLine").unwrap();
        let request = ReturnRequest::new().tags(["anything"]).drill(["deep"]);
        let options = CheckOptions::new().skip_return_check(true);
        let result = project(tree.root(), &request, &options).unwrap();
        assert_eq!(
            Value::Object(result),
            json!({ "uuid": "", "deep": { "anything": "" } })
        );
    }
}

use std::collections::BTreeMap;

use rfq_form_spec::{
    Answer, AnswerStore, Blueprint, FieldRef, FieldStatus, OptionDetail, RequiredPolicy,
    completion_percent, field_status, overall_completeness, section_completeness,
};

const TWO_QUESTIONS: &str = include_str!("fixtures/two_questions.json");
const VENDOR_PROFILE: &str = include_str!("fixtures/vendor_profile.json");

fn vendor_blueprint() -> Blueprint {
    Blueprint::from_json_str(VENDOR_PROFILE).expect("blueprint")
}

fn status(blueprint: &Blueprint, component: &str, field: &str, answer: &Answer) -> FieldStatus {
    let field = blueprint.field(component, field).expect("field");
    field_status(&field, Some(answer))
}

#[test]
fn two_question_scenario() {
    let blueprint = Blueprint::from_json_str(TWO_QUESTIONS).expect("blueprint");
    let policy = RequiredPolicy::default();
    let mut store = AnswerStore::new(blueprint.clone());

    let report = section_completeness(&blueprint, store.answers(), "s1", &policy).expect("s1");
    assert_eq!(report.percent, 0);
    assert_eq!(
        report.missing_field_ids,
        vec![FieldRef::new("c1", "q1"), FieldRef::new("c1", "q2")]
    );

    store.set("c1", "q1", Answer::text("hello")).expect("q1");
    let report = section_completeness(&blueprint, store.answers(), "s1", &policy).expect("s1");
    assert_eq!(report.percent, 50);
    assert_eq!(report.missing_field_ids, vec![FieldRef::new("c1", "q2")]);

    store.set("c1", "q2", Answer::text("")).expect("q2");
    let report = section_completeness(&blueprint, store.answers(), "s1", &policy).expect("s1");
    assert_eq!(report.percent, 50);

    store.set("c1", "q2", Answer::text("world")).expect("q2");
    let report = section_completeness(&blueprint, store.answers(), "s1", &policy).expect("s1");
    assert_eq!(report.percent, 100);
    assert!(report.is_complete());
}

#[test]
fn section_without_required_fields_is_complete() {
    let blueprint = Blueprint::from_json_str(TWO_QUESTIONS).expect("blueprint");
    let report = section_completeness(
        &blueprint,
        &Default::default(),
        "s2",
        &RequiredPolicy::default(),
    )
    .expect("s2");
    assert_eq!(report.percent, 100);
    assert_eq!(report.total, 0);
    assert!(report.missing_field_ids.is_empty());
}

#[test]
fn unknown_section_is_a_lookup_error() {
    let blueprint = Blueprint::from_json_str(TWO_QUESTIONS).expect("blueprint");
    assert!(
        section_completeness(&blueprint, &Default::default(), "s9", &RequiredPolicy::default())
            .is_err()
    );
}

#[test]
fn text_rules() {
    let blueprint = vendor_blueprint();
    assert_eq!(
        status(&blueprint, "wrap_up", "contact", &Answer::text("   ")),
        FieldStatus::Missing
    );
    assert!(status(&blueprint, "wrap_up", "contact", &Answer::text("a@b.c")).is_valid());
    let mismatch = status(&blueprint, "wrap_up", "contact", &Answer::selections(["x"]));
    assert!(matches!(mismatch, FieldStatus::Invalid { code: "type_mismatch", .. }));
}

#[test]
fn radio_rules() {
    let blueprint = vendor_blueprint();
    assert!(status(&blueprint, "offer", "pricing", &Answer::text("Per seat")).is_valid());
    assert_eq!(
        status(&blueprint, "offer", "pricing", &Answer::text("")),
        FieldStatus::Missing
    );
    assert!(matches!(
        status(&blueprint, "offer", "pricing", &Answer::text("Free")),
        FieldStatus::Invalid { code: "unknown_option", .. }
    ));
}

#[test]
fn checkbox_rules() {
    let blueprint = vendor_blueprint();
    assert!(status(&blueprint, "offer", "features", &Answer::selections(["API"])).is_valid());
    assert_eq!(
        status(&blueprint, "offer", "features", &Answer::selections(Vec::<String>::new())),
        FieldStatus::Missing
    );
    assert!(matches!(
        status(&blueprint, "offer", "features", &Answer::selections(["API", "Fax"])),
        FieldStatus::Invalid { code: "unknown_option", .. }
    ));
}

#[test]
fn checkbox_with_number_rules() {
    fn detailed(entries: &[(&str, OptionDetail)]) -> Answer {
        Answer::Detailed(
            entries
                .iter()
                .map(|(label, option)| (label.to_string(), *option))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    let blueprint = vendor_blueprint();

    assert!(
        status(
            &blueprint,
            "offer",
            "seats",
            &detailed(&[("Basic", OptionDetail::checked_with(0.0))])
        )
        .is_valid()
    );
    assert_eq!(
        status(
            &blueprint,
            "offer",
            "seats",
            &detailed(&[("Basic", OptionDetail::default())])
        ),
        FieldStatus::Missing
    );
    assert!(matches!(
        status(
            &blueprint,
            "offer",
            "seats",
            &detailed(&[(
                "Pro",
                OptionDetail {
                    checked: true,
                    detail: None
                }
            )])
        ),
        FieldStatus::Invalid { code: "missing_detail", .. }
    ));
    assert!(matches!(
        status(
            &blueprint,
            "offer",
            "seats",
            &detailed(&[("Pro", OptionDetail::checked_with(-1.0))])
        ),
        FieldStatus::Invalid { code: "invalid_detail", .. }
    ));
    assert!(matches!(
        status(
            &blueprint,
            "offer",
            "seats",
            &detailed(&[("Gold", OptionDetail::checked_with(1.0))])
        ),
        FieldStatus::Invalid { code: "unknown_option", .. }
    ));
}

#[test]
fn invalid_optional_answers_are_issues_only() {
    let blueprint = vendor_blueprint();
    let mut store = AnswerStore::new(blueprint.clone());
    store
        .set("offer", "pitch", Answer::selections(["oops"]))
        .expect("pitch");

    let report = section_completeness(
        &blueprint,
        store.answers(),
        "offer",
        &RequiredPolicy::default(),
    )
    .expect("offer");
    assert_eq!(report.total, 3);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].field, FieldRef::new("offer", "pitch"));
    assert!(!report.missing_field_ids.contains(&FieldRef::new("offer", "pitch")));
}

#[test]
fn invalid_required_answers_count_as_missing() {
    let blueprint = vendor_blueprint();
    let mut store = AnswerStore::new(blueprint.clone());
    store
        .set("offer", "pricing", Answer::text("Free"))
        .expect("pricing");
    let report = section_completeness(
        &blueprint,
        store.answers(),
        "offer",
        &RequiredPolicy::default(),
    )
    .expect("offer");
    assert!(report.missing_field_ids.contains(&FieldRef::new("offer", "pricing")));
    assert_eq!(report.issues.len(), 1);
}

#[test]
fn overall_completeness_is_field_weighted() {
    let blueprint = vendor_blueprint();
    let policy = RequiredPolicy::default();
    let mut store = AnswerStore::new(blueprint.clone());

    let report = overall_completeness(&blueprint, store.answers(), &policy);
    assert_eq!(report.total, 5);
    assert_eq!(report.percent, 0);

    store
        .set("company", "Company Name", Answer::text("Acme"))
        .expect("row");
    store
        .set("wrap_up", "contact", Answer::text("a@b.c"))
        .expect("contact");
    let report = overall_completeness(&blueprint, store.answers(), &policy);
    // Two of five required fields; sections average would be 67%.
    assert_eq!(report.completed, 2);
    assert_eq!(report.percent, 40);
    assert_eq!(report.per_section.len(), 3);
    assert_eq!(report.missing_field_ids().len(), 3);
    assert!(!report.is_complete());
}

#[test]
fn percent_rounds_half_up() {
    assert_eq!(completion_percent(0, 0), 100);
    assert_eq!(completion_percent(1, 3), 33);
    assert_eq!(completion_percent(2, 3), 67);
    assert_eq!(completion_percent(1, 8), 13);
    assert_eq!(completion_percent(3, 3), 100);
}

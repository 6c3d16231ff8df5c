//! # Descriptor Validation Integration Tests
//!
//! recfix-style schema checking through the public API: mandatory fields,
//! typed fields, allowed/prohibited sets, key and singular uniqueness,
//! size bounds, and constraint expressions.

use recq::{parse, RecordSet, SetViolation, Violation};

fn check(set: &RecordSet, rec_type: &str) -> Vec<SetViolation> {
    let descriptor = set.descriptor(rec_type).unwrap();
    descriptor.validate_set(
        set.records()
            .iter()
            .filter(|r| r.rec_type() == Some(rec_type)),
    )
}

#[test]
fn valid_database_has_no_violations() {
    let set = parse(
        "%rec: Contact\n%mandatory: Name\n\nName: John\nPhone: 123\n\nName: Jane\nPhone: 456\n",
    )
    .unwrap();
    assert!(check(&set, "Contact").is_empty());
}

#[test]
fn missing_mandatory_field_is_reported_with_the_record_index() {
    let set = parse(
        "%rec: Contact\n%mandatory: Name Email\n\nName: John\nEmail: j@x.com\n\nName: Jane\n",
    )
    .unwrap();
    let violations = check(&set, "Contact");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].record, Some(1));
    assert_eq!(
        violations[0].violation,
        Violation::MissingMandatory {
            field: "Email".to_string()
        }
    );
}

#[test]
fn typed_fields_are_checked() {
    let set = parse(
        "%rec: Item\n%type: Count int\n%type: Price real\n%type: Active bool\n\n\
         Count: 42\nPrice: 3.14\nActive: yes\n\n\
         Count: abc\nPrice: cheap\nActive: maybe\n",
    )
    .unwrap();
    let violations = check(&set, "Item");
    assert_eq!(violations.len(), 3);
    assert!(violations.iter().all(|v| v.record == Some(1)));
    assert!(violations
        .iter()
        .all(|v| matches!(v.violation, Violation::TypeMismatch { .. })));
}

#[test]
fn range_and_enum_types() {
    let set = parse(
        "%rec: Task\n%type: Priority range 1 5\n%type: Status enum pending active done\n\n\
         Priority: 3\nStatus: active\n\n\
         Priority: 10\nStatus: unknown\n",
    )
    .unwrap();
    let violations = check(&set, "Task");
    assert_eq!(violations.len(), 2);
}

#[test]
fn line_type_rejects_multiline_values() {
    let set = parse(
        "%rec: Item\n%type: Title line\n\nTitle: First line\n+ Second line\n",
    )
    .unwrap();
    let violations = check(&set, "Item");
    assert_eq!(violations.len(), 1);
    assert!(matches!(
        violations[0].violation,
        Violation::TypeMismatch { .. }
    ));
}

#[test]
fn regexp_type_checks_by_find() {
    let set = parse(
        "%rec: Host\n%type: Addr regexp /^[0-9.]+$/\n\nAddr: 10.0.0.1\n\nAddr: localhost\n",
    )
    .unwrap();
    let violations = check(&set, "Host");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].record, Some(1));
}

#[test]
fn unenforced_specs_accept_anything() {
    let set = parse(
        "%rec: Contact\n%type: Email email\n%type: Born date\n\n\
         Email: not-an-email\nBorn: whenever\n",
    )
    .unwrap();
    assert!(check(&set, "Contact").is_empty());
}

#[test]
fn prohibited_and_allowed_fields() {
    let set = parse(
        "%rec: Contact\n%prohibit: SSN\n%allowed: Name Phone SSN\n\n\
         Name: John\nSSN: 123-45-6789\nEmail: j@x.com\n",
    )
    .unwrap();
    let violations = check(&set, "Contact");
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().any(|v| matches!(
        v.violation,
        Violation::ProhibitedField { ref field } if field == "SSN"
    )));
    assert!(violations.iter().any(|v| matches!(
        v.violation,
        Violation::FieldNotAllowed { ref field } if field == "Email"
    )));
}

#[test]
fn unique_fields_may_not_repeat_within_a_record() {
    let set = parse(
        "%rec: Contact\n%unique: Email\n\nName: John\nEmail: a@x.com\nEmail: b@x.com\n",
    )
    .unwrap();
    let violations = check(&set, "Contact");
    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations[0].violation,
        Violation::DuplicateKey {
            field: "Email".to_string()
        }
    );
}

#[test]
fn key_values_must_be_unique_across_the_set() {
    let set = parse(
        "%rec: Contact\n%key: Id\n\nId: 1\nName: John\n\nId: 1\nName: Jane\n",
    )
    .unwrap();
    let violations = check(&set, "Contact");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].record, Some(1));
    assert_eq!(
        violations[0].violation,
        Violation::UniquenessViolation {
            field: "Id".to_string(),
            value: "1".to_string()
        }
    );
}

#[test]
fn singular_values_must_be_unique_across_the_set() {
    let set = parse(
        "%rec: Contact\n%singular: Email\n\nName: John\nEmail: shared@x.com\n\n\
         Name: Jane\nEmail: shared@x.com\n",
    )
    .unwrap();
    let violations = check(&set, "Contact");
    assert_eq!(violations.len(), 1);
}

#[test]
fn size_bound_on_the_record_count() {
    let set = parse(
        "%rec: Contact\n%size: < 3\n\nName: John\n\nName: Jane\n\nName: Bob\n",
    )
    .unwrap();
    let violations = check(&set, "Contact");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].record, None);
    assert!(matches!(
        violations[0].violation,
        Violation::SizeViolation { actual: 3, .. }
    ));
}

#[test]
fn constraint_expressions_run_per_record() {
    let set = parse(
        "%rec: Person\n%constraint: Age >= 0\n\nName: John\nAge: -5\n\nName: Jane\nAge: 30\n",
    )
    .unwrap();
    let violations = check(&set, "Person");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].record, Some(0));
    assert_eq!(
        violations[0].violation,
        Violation::ConstraintViolation {
            expression: "Age >= 0".to_string()
        }
    );
}

#[test]
fn typedef_aliases_resolve() {
    let set = parse(
        "%rec: Item\n%typedef: Id_t int\n%type: Id Id_t\n\nId: 42\nName: Test\n",
    )
    .unwrap();
    assert!(check(&set, "Item").is_empty());

    let set = parse(
        "%rec: Item\n%typedef: Id_t int\n%type: Id Id_t\n\nId: nope\n",
    )
    .unwrap();
    assert_eq!(check(&set, "Item").len(), 1);
}

#[test]
fn anonymous_records_have_nothing_to_violate() {
    let set = parse("Name: John\nPhone: 123\n\nName: Jane\nPhone: 456\n").unwrap();
    assert!(set.descriptors().is_empty());
    for record in set.records() {
        assert!(set.descriptor_of(record).is_none());
    }
}

#[test]
fn violations_render_readable_messages() {
    let set = parse(
        "%rec: Contact\n%mandatory: Name\n%type: Age int\n\nAge: old\n",
    )
    .unwrap();
    let messages: Vec<String> = check(&set, "Contact")
        .iter()
        .map(|v| v.violation.to_string())
        .collect();
    assert!(messages.iter().any(|m| m.contains("missing mandatory field 'Name'")));
    assert!(messages
        .iter()
        .any(|m| m.contains("'Age'") && m.contains("does not match type int")));
}

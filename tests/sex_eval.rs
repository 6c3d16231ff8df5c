//! # Selection-Expression Integration Tests
//!
//! Compile-and-evaluate scenarios through the public `sex` API, including
//! the expressions used as examples in the GNU recutils manual.

use bumpalo::Bump;
use recq::sex::{compile, evaluate, Evaluator, SexErrorKind};
use recq::types::{EvalError, Value};
use recq::{parse, Field, Record};

fn record(pairs: &[(&str, &str)]) -> Record {
    Record::new(pairs.iter().map(|(n, v)| Field::new(*n, *v)).collect())
}

fn holds(expr: &str, record: &Record) -> bool {
    let arena = Bump::new();
    let compiled = compile(expr, &arena).unwrap();
    Evaluator::new(None).matches(compiled, record).unwrap()
}

#[test]
fn manual_age_filter() {
    let bart = record(&[("Name", "Bart Simpson"), ("Age", "10")]);
    let ada = record(&[("Name", "Ada Lovelace"), ("Age", "36")]);
    assert!(holds("Age < 18", &bart));
    assert!(!holds("Age < 18", &ada));
}

#[test]
fn manual_email_regex() {
    let org = record(&[("Name", "Mr. Foo"), ("Email", "foo@foo.org")]);
    let com = record(&[("Name", "Mr. Foo"), ("Email", "foo@foo.com")]);
    assert!(holds(r"Email ~ '\.org'", &org));
    assert!(!holds(r"Email ~ '\.org'", &com));
}

#[test]
fn manual_registration_filter() {
    let expr = r"((Email ~ 'foomail\.com') || (Age <= 18)) && !#Fixed";
    assert!(holds(expr, &record(&[("Email", "u@foomail.com"), ("Age", "25")])));
    assert!(holds(expr, &record(&[("Email", "u@other.com"), ("Age", "15")])));
    assert!(!holds(
        expr,
        &record(&[("Email", "u@foomail.com"), ("Age", "25"), ("Fixed", "1")])
    ));
}

#[test]
fn manual_full_name_concat() {
    let r = record(&[("First", "John"), ("Last", "Doe")]);
    assert!(holds("First & ' ' & Last = 'John Doe'", &r));
}

#[test]
fn ternary_selects_branches() {
    let r = record(&[("Age", "25")]);
    let arena = Bump::new();
    let expr = compile("Age > 18 ? 'adult' : 'minor'", &arena).unwrap();
    assert_eq!(evaluate(expr, &r, None), Value::text("adult"));
}

#[test]
fn implies_chain_is_right_associative() {
    // A => B => C with A true, B false: B => C is true, so the whole holds.
    let r = record(&[("A", "1"), ("B", "0"), ("C", "0")]);
    assert!(holds("A => B => C", &r));
}

#[test]
fn typed_fields_compare_numerically_through_the_descriptor() {
    let set = parse(
        "%rec: Item\n%type: Available int\n\nType: Notebook\nAvailable: 77455\n",
    )
    .unwrap();
    let arena = Bump::new();
    let expr = compile("Available > 9000", &arena).unwrap();
    let d = set.descriptor("Item");
    assert_eq!(evaluate(expr, &set.records()[0], d), Value::Bool(true));
}

#[test]
fn untyped_numeric_strings_still_compare_numerically() {
    // "9" < "10" numerically even though "9" > "10" lexicographically.
    let r = record(&[("N", "9")]);
    assert!(holds("N < 10", &r));
}

#[test]
fn evaluation_is_total() {
    let r = record(&[("A", "x")]);
    let arena = Bump::new();
    for (expr, kind) in [
        ("A + 1", EvalError::TypeMismatch),
        ("1 / 0", EvalError::DivideByZero),
        ("A ~ '['", EvalError::BadRegex),
        ("Missing", EvalError::MissingField),
    ] {
        let compiled = compile(expr, &arena).unwrap();
        assert_eq!(
            evaluate(compiled, &r, None),
            Value::Error(kind),
            "expression: {}",
            expr
        );
    }
}

#[test]
fn negation_inverts_exactly_the_boolean_outcomes() {
    // For error-free expressions, !E is true iff E evaluates false.
    let r = record(&[("Age", "30"), ("Name", "Ada")]);
    let arena = Bump::new();
    for expr in ["Age > 18", "Age < 18", "Name = 'Ada'", "#Name = 2"] {
        let plain = compile(expr, &arena).unwrap();
        let negated_expr = format!("!({})", expr);
        let negated = compile(&negated_expr, &arena).unwrap();
        let plain_value = evaluate(plain, &r, None).truthy().unwrap();
        let negated_value = evaluate(negated, &r, None).truthy().unwrap();
        assert_eq!(plain_value, !negated_value, "expression: {}", expr);
    }
}

#[test]
fn count_agrees_with_get_all() {
    let set = parse("Name: X\nEmail: a@b\nEmail: c@d\nEmail: e@f\n").unwrap();
    let record = &set.records()[0];
    let arena = Bump::new();
    let expr = compile("#Email", &arena).unwrap();
    assert_eq!(
        evaluate(expr, record, None),
        Value::Int(record.get_all("Email").len() as i64)
    );
}

#[test]
fn compile_errors() {
    let arena = Bump::new();
    assert_eq!(
        compile("'unterminated", &arena).unwrap_err().kind,
        SexErrorKind::UnterminatedString
    );
    assert!(matches!(
        compile("Age > > 18", &arena).unwrap_err().kind,
        SexErrorKind::UnexpectedToken(_)
    ));
    assert!(matches!(
        compile("A @ B", &arena).unwrap_err().kind,
        SexErrorKind::UnknownOperator('@')
    ));
    assert!(matches!(
        compile("", &arena).unwrap_err().kind,
        SexErrorKind::UnexpectedToken(_)
    ));
}

#[test]
fn hex_and_octal_literals() {
    let r = record(&[("Flags", "255")]);
    assert!(holds("Flags = 0xFF", &r));
    let r = record(&[("Mode", "8")]);
    assert!(holds("Mode = 010", &r));
}

//! # Query Driver
//!
//! The recsel pipeline. Filters run in a fixed order, each narrowing the
//! candidate list:
//!
//! 1. record-type filter
//! 2. index filter (positions after the type filter)
//! 3. quick-search (substring over field values)
//! 4. selection-expression filter
//! 5. random sampling
//! 6. stable sort (explicit keys, else the descriptor's `%sort`)
//! 7. group-by merge of contiguous equal keys
//! 8. uniq (drop adjacent duplicates of the projected field set)
//! 9. projection
//! 10. count
//!
//! Selection-expression evaluation errors other than a missing field do not
//! abort the query: the record is treated as non-matching and a
//! [`Diagnostic`] is pushed onto the result's diagnostics channel, tagged
//! with the record's source line.

use bumpalo::Bump;
use eyre::{bail, Result, WrapErr};
use smallvec::SmallVec;
use std::cmp::Ordering;
use tracing::debug;

use super::spec::QuerySpec;
use crate::rec::{Descriptor, Field, Record, RecordSet};
use crate::sex::{self, Evaluator};
use crate::types::{EvalError, NumericKind, Value};

type SortKeys = SmallVec<[String; 4]>;

/// An evaluation error recorded while filtering, tagged with the source
/// line of the record that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub error: EvalError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputMode {
    Records,
    Values,
    Row,
    Count,
}

/// The outcome of a query: surviving records, the descriptor of the
/// selected type, the count, and any evaluation diagnostics.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub(crate) records: Vec<Record>,
    pub(crate) descriptor: Option<Descriptor>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) mode: OutputMode,
    pub(crate) include_descriptors: bool,
    pub(crate) collapse: bool,
}

impl QueryResult {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The descriptor for the queried record type, when one was selected.
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// True when the query asked for a bare count.
    pub fn is_count(&self) -> bool {
        self.mode == OutputMode::Count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Runs a query over a record set. Fails only on malformed query inputs
/// (index syntax, expression syntax); evaluation problems surface in the
/// result's diagnostics instead.
pub fn query(set: &RecordSet, spec: &QuerySpec) -> Result<QueryResult> {
    let mut candidates: Vec<&Record> = match spec.record_type.as_deref() {
        Some(t) => set
            .records()
            .iter()
            .filter(|r| r.rec_type() == Some(t))
            .collect(),
        None => set.records().iter().collect(),
    };
    let input_len = candidates.len();

    if let Some(index_spec) = spec.indexes.as_deref() {
        let ranges = parse_indexes(index_spec)?;
        candidates = candidates
            .into_iter()
            .enumerate()
            .filter(|(i, _)| ranges.iter().any(|&(lo, hi)| *i >= lo && *i <= hi))
            .map(|(_, r)| r)
            .collect();
    }

    if let Some(needle) = spec.quick.as_deref() {
        candidates.retain(|r| quick_match(r, needle, spec.case_insensitive));
    }

    let mut diagnostics = Vec::new();
    if let Some(src) = spec.expression.as_deref() {
        let arena = Bump::new();
        let expr = sex::compile(src, &arena)
            .wrap_err_with(|| format!("invalid selection expression '{}'", src))?;
        candidates.retain(|r| {
            let evaluator =
                Evaluator::new(set.descriptor_of(r)).case_insensitive(spec.case_insensitive);
            match evaluator.matches(expr, r) {
                Ok(keep) => keep,
                Err(error) => {
                    diagnostics.push(Diagnostic {
                        line: r.line(),
                        error,
                    });
                    false
                }
            }
        });
    }

    if spec.random_count > 0 && spec.random_count < candidates.len() {
        let mut picks = rand::seq::index::sample(
            &mut rand::thread_rng(),
            candidates.len(),
            spec.random_count,
        )
        .into_vec();
        picks.sort_unstable();
        candidates = picks.into_iter().map(|i| candidates[i]).collect();
    }

    let sort_keys: SortKeys = if !spec.sort.is_empty() {
        spec.sort.iter().cloned().collect()
    } else {
        spec.record_type
            .as_deref()
            .and_then(|t| set.descriptor(t))
            .map(|d| d.sort_fields().iter().cloned().collect())
            .unwrap_or_default()
    };
    if !sort_keys.is_empty() {
        candidates.sort_by(|a, b| compare_records(a, b, &sort_keys, set));
    }

    let mut records: Vec<Record> = candidates.into_iter().cloned().collect();

    if !spec.group_by.is_empty() {
        records = group_contiguous(records, &spec.group_by);
    }

    let projection: Option<&[String]> = if !spec.print_fields.is_empty() {
        Some(&spec.print_fields)
    } else if !spec.print_values.is_empty() {
        Some(&spec.print_values)
    } else if !spec.print_row.is_empty() {
        Some(&spec.print_row)
    } else {
        None
    };

    if spec.uniq {
        records.dedup_by(|a, b| projected_eq(a, b, projection));
    }

    if let Some(names) = projection {
        records = records.iter().map(|r| r.project(names)).collect();
    }

    let mode = if spec.count {
        OutputMode::Count
    } else if !spec.print_fields.is_empty() {
        OutputMode::Records
    } else if !spec.print_values.is_empty() {
        OutputMode::Values
    } else if !spec.print_row.is_empty() {
        OutputMode::Row
    } else {
        OutputMode::Records
    };

    debug!(
        input = input_len,
        selected = records.len(),
        diagnostics = diagnostics.len(),
        "query complete"
    );

    Ok(QueryResult {
        records,
        descriptor: spec
            .record_type
            .as_deref()
            .and_then(|t| set.descriptor(t))
            .cloned(),
        diagnostics,
        mode,
        include_descriptors: spec.include_descriptors,
        collapse: spec.collapse,
    })
}

/// Parses an index spec like `0,2-4,9` into inclusive ranges.
fn parse_indexes(spec: &str) -> Result<Vec<(usize, usize)>> {
    let mut ranges = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if let Some((lo, hi)) = part.split_once('-') {
            let (lo, hi) = match (lo.trim().parse::<usize>(), hi.trim().parse::<usize>()) {
                (Ok(lo), Ok(hi)) => (lo, hi),
                _ => bail!("invalid index range '{}' in '{}'", part, spec),
            };
            if hi < lo {
                bail!("backwards index range '{}' in '{}'", part, spec);
            }
            ranges.push((lo, hi));
        } else {
            match part.parse::<usize>() {
                Ok(k) => ranges.push((k, k)),
                Err(_) => bail!("invalid index '{}' in '{}'", part, spec),
            }
        }
    }
    Ok(ranges)
}

fn quick_match(record: &Record, needle: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        let needle = needle.to_lowercase();
        record
            .fields()
            .iter()
            .any(|f| f.value().to_lowercase().contains(&needle))
    } else {
        record.fields().iter().any(|f| f.value().contains(needle))
    }
}

/// Stable multi-key record comparison. Missing keys sort before present
/// ones; fields typed numeric by the record's descriptor compare
/// numerically.
fn compare_records(a: &Record, b: &Record, keys: &[String], set: &RecordSet) -> Ordering {
    for key in keys {
        let av = a.get(key);
        let bv = b.get(key);
        let ord = match (av, bv) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(av), Some(bv)) => compare_key_values(av, bv, key, a, set),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_key_values(av: &str, bv: &str, key: &str, record: &Record, set: &RecordSet) -> Ordering {
    let numeric = set
        .descriptor_of(record)
        .and_then(|d| d.type_of(key))
        .and_then(|t| t.numeric_kind());
    if numeric.is_some() {
        if let (Some(an), Some(bn)) = (Value::from_numeric_str(av), Value::from_numeric_str(bv)) {
            return match (an, bn, numeric) {
                (Value::Int(x), Value::Int(y), Some(NumericKind::Int)) => x.cmp(&y),
                (x, y, _) => real_of(&x)
                    .partial_cmp(&real_of(&y))
                    .unwrap_or(Ordering::Equal),
            };
        }
    }
    av.cmp(bv)
}

fn real_of(v: &Value<'_>) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Real(f) => *f,
        _ => 0.0,
    }
}

/// Merges each contiguous run of records with equal key values into one
/// record: the first member keeps everything, later members contribute
/// their non-key fields in order.
fn group_contiguous(records: Vec<Record>, keys: &[String]) -> Vec<Record> {
    let mut out: Vec<Record> = Vec::new();
    for record in records {
        let same_group = out
            .last()
            .is_some_and(|last| keys.iter().all(|k| last.get(k) == record.get(k)));
        if same_group {
            let last = out.last_mut().expect("group head exists");
            for field in record.fields() {
                if !keys.iter().any(|k| k == field.name()) {
                    last.push(Field::new(field.name(), field.value()));
                }
            }
        } else {
            out.push(record);
        }
    }
    out
}

fn projected_eq(a: &Record, b: &Record, projection: Option<&[String]>) -> bool {
    let keep = |f: &&Field| match projection {
        Some(names) => names.iter().any(|n| n == f.name()),
        None => true,
    };
    a.fields().iter().filter(keep).eq(b.fields().iter().filter(keep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rec::parse;

    const CONTACTS: &str = "Name: Granny\nPhone: +12 23456677\n\n\
                            Name: Doctor\nPhone: +12 58999222\n\n\
                            Name: Dad\nPhone: +12 88229900\n";

    fn names(result: &QueryResult) -> Vec<String> {
        result
            .records()
            .iter()
            .filter_map(|r| r.get("Name").map(String::from))
            .collect()
    }

    #[test]
    fn default_spec_keeps_everything() {
        let set = parse(CONTACTS).unwrap();
        let result = query(&set, &QuerySpec::new()).unwrap();
        assert_eq!(result.count(), 3);
        assert!(result.diagnostics().is_empty());
    }

    #[test]
    fn index_filter() {
        let set = parse(CONTACTS).unwrap();
        let result = query(&set, &QuerySpec::new().indexes("0")).unwrap();
        assert_eq!(names(&result), ["Granny"]);

        let result = query(&set, &QuerySpec::new().indexes("0,2")).unwrap();
        assert_eq!(names(&result), ["Granny", "Dad"]);

        let result = query(&set, &QuerySpec::new().indexes("0-2")).unwrap();
        assert_eq!(result.count(), 3);
    }

    #[test]
    fn out_of_range_indexes_are_silently_dropped() {
        let set = parse(CONTACTS).unwrap();
        let result = query(&set, &QuerySpec::new().indexes("0,999")).unwrap();
        assert_eq!(result.count(), 1);
    }

    #[test]
    fn index_order_does_not_reorder_output() {
        let set = parse(CONTACTS).unwrap();
        let a = query(&set, &QuerySpec::new().indexes("0,1")).unwrap();
        let b = query(&set, &QuerySpec::new().indexes("1,0")).unwrap();
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn bad_index_specs_are_rejected() {
        let set = parse(CONTACTS).unwrap();
        assert!(query(&set, &QuerySpec::new().indexes("a")).is_err());
        assert!(query(&set, &QuerySpec::new().indexes("3-1")).is_err());
        assert!(query(&set, &QuerySpec::new().indexes("")).is_err());
    }

    #[test]
    fn quick_search() {
        let set = parse(CONTACTS).unwrap();
        let result = query(&set, &QuerySpec::new().quick("234")).unwrap();
        assert_eq!(names(&result), ["Granny"]);

        let result = query(&set, &QuerySpec::new().quick("xyz123")).unwrap();
        assert_eq!(result.count(), 0);
    }

    #[test]
    fn quick_search_case_insensitive() {
        let set = parse(CONTACTS).unwrap();
        let result = query(
            &set,
            &QuerySpec::new().quick("granny").case_insensitive(true),
        )
        .unwrap();
        assert_eq!(result.count(), 1);
        let result = query(&set, &QuerySpec::new().quick("granny")).unwrap();
        assert_eq!(result.count(), 0);
    }

    #[test]
    fn expression_filter() {
        let set = parse(CONTACTS).unwrap();
        let result = query(&set, &QuerySpec::new().expression("Phone ~ '234'")).unwrap();
        assert_eq!(names(&result), ["Granny"]);
    }

    #[test]
    fn invalid_expression_is_a_query_error() {
        let set = parse(CONTACTS).unwrap();
        assert!(query(&set, &QuerySpec::new().expression("Phone >")).is_err());
    }

    #[test]
    fn evaluation_errors_land_in_diagnostics() {
        let set = parse(
            "%rec: Person\n%type: Age int\n\nName: Ada\nAge: 36\n\nName: Glitch\nAge: old\n",
        )
        .unwrap();
        let result = query(
            &set,
            &QuerySpec::new().record_type("Person").expression("Age < 50"),
        )
        .unwrap();
        assert_eq!(names(&result), ["Ada"]);
        assert_eq!(result.diagnostics().len(), 1);
        assert_eq!(result.diagnostics()[0].error, EvalError::TypeMismatch);
        assert_eq!(result.diagnostics()[0].line, 7);
    }

    #[test]
    fn missing_field_excludes_without_diagnostic() {
        let set = parse("Name: NoAge\n\nName: Aged\nAge: 44\n").unwrap();
        let result = query(&set, &QuerySpec::new().expression("Age > 18")).unwrap();
        assert_eq!(names(&result), ["Aged"]);
        assert!(result.diagnostics().is_empty());
    }

    #[test]
    fn random_zero_keeps_all_and_large_samples_keep_input_order() {
        let set = parse(CONTACTS).unwrap();
        let result = query(&set, &QuerySpec::new().random_count(0)).unwrap();
        assert_eq!(result.count(), 3);

        let result = query(&set, &QuerySpec::new().random_count(100)).unwrap();
        assert_eq!(names(&result), ["Granny", "Doctor", "Dad"]);
    }

    #[test]
    fn random_sample_size_and_uniqueness() {
        let set = parse(CONTACTS).unwrap();
        for _ in 0..10 {
            let result = query(&set, &QuerySpec::new().random_count(2)).unwrap();
            let picked = names(&result);
            assert_eq!(picked.len(), 2);
            assert_ne!(picked[0], picked[1]);
        }
    }

    #[test]
    fn sort_by_field() {
        let set = parse(
            "Name: Ada\nAge: 36\n\nName: Peter\nAge: 53\n\nName: Bart\nAge: 10\n",
        )
        .unwrap();
        let result = query(&set, &QuerySpec::new().sort("Age")).unwrap();
        // Untyped values sort as strings.
        let ages: Vec<_> = result.records().iter().map(|r| r.get("Age").unwrap()).collect();
        assert_eq!(ages, ["10", "36", "53"]);
    }

    #[test]
    fn sort_uses_descriptor_types_numerically() {
        let set = parse(
            "%rec: Item\n%type: Id int\n\nId: 10\n\nId: 2\n\nId: 1\n",
        )
        .unwrap();
        let result = query(&set, &QuerySpec::new().record_type("Item").sort("Id")).unwrap();
        let ids: Vec<_> = result.records().iter().map(|r| r.get("Id").unwrap()).collect();
        assert_eq!(ids, ["1", "2", "10"]);
    }

    #[test]
    fn sort_is_stable_and_missing_fields_sort_first() {
        let set = parse(
            "Name: Charlie\n\nPhone: 123\n\nName: Alice\n",
        )
        .unwrap();
        let result = query(&set, &QuerySpec::new().sort("Name")).unwrap();
        assert_eq!(result.records()[0].get("Name"), None);
        assert_eq!(result.records()[1].get("Name"), Some("Alice"));
        assert_eq!(result.records()[2].get("Name"), Some("Charlie"));
    }

    #[test]
    fn descriptor_sort_applies_when_query_has_none() {
        let set = parse(
            "%rec: Contact\n%sort: Name\n\nName: Charlie\n\nName: Alice\n\nName: Bob\n",
        )
        .unwrap();
        let result = query(&set, &QuerySpec::new().record_type("Contact")).unwrap();
        assert_eq!(names(&result), ["Alice", "Bob", "Charlie"]);

        // An explicit sort key overrides %sort.
        let result = query(
            &set,
            &QuerySpec::new().record_type("Contact").sort("Missing"),
        )
        .unwrap();
        assert_eq!(names(&result), ["Charlie", "Alice", "Bob"]);
    }

    #[test]
    fn group_by_merges_contiguous_groups() {
        let set = parse(
            "%rec: Item\n\nCategory: Toy\nType: Car\n\nCategory: Toy\nType: Puzzle\n\n\
             Category: Office\nType: Typex\n",
        )
        .unwrap();
        let result = query(
            &set,
            &QuerySpec::new().record_type("Item").group_by("Category"),
        )
        .unwrap();
        assert_eq!(result.count(), 2);
        let toys = &result.records()[0];
        assert_eq!(toys.get("Category"), Some("Toy"));
        assert_eq!(toys.get_all("Type"), vec!["Car", "Puzzle"]);
    }

    #[test]
    fn group_by_only_merges_adjacent_runs() {
        let set = parse(
            "Category: A\nN: 1\n\nCategory: B\nN: 2\n\nCategory: A\nN: 3\n",
        )
        .unwrap();
        let result = query(&set, &QuerySpec::new().group_by("Category")).unwrap();
        assert_eq!(result.count(), 3);
    }

    #[test]
    fn uniq_drops_adjacent_duplicates() {
        let set = parse("Name: A\n\nName: A\n\nName: B\n\nName: A\n").unwrap();
        let result = query(&set, &QuerySpec::new().uniq(true)).unwrap();
        assert_eq!(names(&result), ["A", "B", "A"]);
    }

    #[test]
    fn uniq_compares_the_projected_field_set() {
        let set = parse(
            "Name: A\nPhone: 1\n\nName: A\nPhone: 2\n",
        )
        .unwrap();
        // Full records differ...
        let result = query(&set, &QuerySpec::new().uniq(true)).unwrap();
        assert_eq!(result.count(), 2);
        // ...but their Name projections do not.
        let result = query(
            &set,
            &QuerySpec::new().uniq(true).print_fields("Name"),
        )
        .unwrap();
        assert_eq!(result.count(), 1);
    }

    #[test]
    fn projection_drops_other_fields() {
        let set = parse(CONTACTS).unwrap();
        let result = query(&set, &QuerySpec::new().print_fields("Name")).unwrap();
        for record in result.records() {
            assert!(record.has("Name"));
            assert!(!record.has("Phone"));
        }
    }

    #[test]
    fn count_mode() {
        let set = parse(CONTACTS).unwrap();
        let result = query(&set, &QuerySpec::new().count(true)).unwrap();
        assert!(result.is_count());
        assert_eq!(result.count(), 3);
    }

    #[test]
    fn type_filter_and_descriptor_in_result() {
        let set = parse(
            "%rec: Maintainer\n\nName: Jose\n\nName: Luca\n\n%rec: Package\n\nName: recutils\n",
        )
        .unwrap();
        let result = query(&set, &QuerySpec::new().record_type("Maintainer")).unwrap();
        assert_eq!(result.count(), 2);
        assert_eq!(result.descriptor().unwrap().rec_type(), "Maintainer");

        let result = query(&set, &QuerySpec::new().record_type("NoSuch")).unwrap();
        assert_eq!(result.count(), 0);
        assert!(result.descriptor().is_none());
    }

    #[test]
    fn pipeline_applies_indexes_before_expression() {
        let set = parse(
            "Name: Ada\nAge: 36\n\nName: Peter\nAge: 53\n\nName: Bart\nAge: 10\n\n\
             Name: Adrian\nAge: 13\n",
        )
        .unwrap();
        let result = query(
            &set,
            &QuerySpec::new().indexes("0,1,2,3").expression("Age > 20"),
        )
        .unwrap();
        assert_eq!(names(&result), ["Ada", "Peter"]);
    }

    #[test]
    fn idempotent_requery() {
        let set = parse(CONTACTS).unwrap();
        let spec = QuerySpec::new().expression("Phone ~ '12'").sort("Name");
        let first = query(&set, &spec).unwrap();

        // Round-trip the result through the parser and run the same query.
        let text = crate::query::format_default(&first);
        let reparsed = parse(&text).unwrap();
        let second = query(&reparsed, &spec).unwrap();
        assert_eq!(names(&first), names(&second));
    }
}

//! Query options, assembled with chained setters.

/// Options for one query over a record set. Everything is optional; the
/// default spec selects every record and prints it in rec format.
///
/// ```ignore
/// let spec = QuerySpec::new()
///     .record_type("Book")
///     .expression("Location = 'home'")
///     .count(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub(crate) record_type: Option<String>,
    pub(crate) indexes: Option<String>,
    pub(crate) expression: Option<String>,
    pub(crate) quick: Option<String>,
    pub(crate) random_count: usize,
    pub(crate) print_fields: Vec<String>,
    pub(crate) print_values: Vec<String>,
    pub(crate) print_row: Vec<String>,
    pub(crate) count: bool,
    pub(crate) include_descriptors: bool,
    pub(crate) collapse: bool,
    pub(crate) case_insensitive: bool,
    pub(crate) sort: Vec<String>,
    pub(crate) group_by: Vec<String>,
    pub(crate) uniq: bool,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only records whose descriptor type equals this name.
    pub fn record_type(mut self, rec_type: impl Into<String>) -> Self {
        self.record_type = Some(rec_type.into());
        self
    }

    /// Position filter: a comma-separated list of indexes and `a-b`
    /// inclusive ranges, applied after the type filter.
    pub fn indexes(mut self, spec: impl Into<String>) -> Self {
        self.indexes = Some(spec.into());
        self
    }

    /// Selection-expression filter.
    pub fn expression(mut self, sex: impl Into<String>) -> Self {
        self.expression = Some(sex.into());
        self
    }

    /// Substring filter over all field values.
    pub fn quick(mut self, needle: impl Into<String>) -> Self {
        self.quick = Some(needle.into());
        self
    }

    /// Uniform random sample without replacement; 0 disables sampling.
    pub fn random_count(mut self, count: usize) -> Self {
        self.random_count = count;
        self
    }

    /// Project the named fields, keeping `name: value` form.
    pub fn print_fields(mut self, list: &str) -> Self {
        self.print_fields = name_list(list);
        self
    }

    /// Project the named fields as bare values, one per line.
    pub fn print_values(mut self, list: &str) -> Self {
        self.print_values = name_list(list);
        self
    }

    /// Project the named fields as space-separated values, one record per
    /// line.
    pub fn print_row(mut self, list: &str) -> Self {
        self.print_row = name_list(list);
        self
    }

    /// Return only the number of surviving records.
    pub fn count(mut self, yes: bool) -> Self {
        self.count = yes;
        self
    }

    /// Emit the record-type descriptor ahead of the records.
    pub fn include_descriptors(mut self, yes: bool) -> Self {
        self.include_descriptors = yes;
        self
    }

    /// Suppress the blank separator line between records.
    pub fn collapse(mut self, yes: bool) -> Self {
        self.collapse = yes;
        self
    }

    /// Case-fold string equality, regex matching, and quick-search.
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Stable sort by these fields. When absent, the descriptor's `%sort`
    /// applies.
    pub fn sort(mut self, list: &str) -> Self {
        self.sort = name_list(list);
        self
    }

    /// Merge contiguous runs of records with equal values for these fields.
    pub fn group_by(mut self, list: &str) -> Self {
        self.group_by = name_list(list);
        self
    }

    /// Drop adjacent records whose projected field sets are identical.
    pub fn uniq(mut self, yes: bool) -> Self {
        self.uniq = yes;
        self
    }
}

fn name_list(list: &str) -> Vec<String> {
    list.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

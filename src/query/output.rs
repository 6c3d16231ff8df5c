//! # Output Formatting
//!
//! Renders a [`QueryResult`] back to text. The default mode emits records
//! in rec format (multi-line values folded into `+ ` continuations),
//! separated by one blank line, with the type's descriptor first when the
//! query asked for it. The value/row modes emit bare field values; count
//! mode emits just the number.

use super::driver::{OutputMode, QueryResult};

/// Renders a query result in its requested output mode.
pub fn format_default(result: &QueryResult) -> String {
    let separator = if result.collapse { "\n" } else { "\n\n" };
    match result.mode {
        OutputMode::Count => result.count().to_string(),
        OutputMode::Records => {
            let mut blocks: Vec<String> = Vec::new();
            if result.include_descriptors {
                if let Some(descriptor) = result.descriptor() {
                    blocks.push(descriptor.to_string());
                }
            }
            blocks.extend(result.records().iter().map(|r| r.to_string()));
            blocks.join(separator)
        }
        OutputMode::Values => {
            let blocks: Vec<String> = result
                .records()
                .iter()
                .map(|r| {
                    r.fields()
                        .iter()
                        .map(|f| f.value())
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .collect();
            blocks.join(separator)
        }
        OutputMode::Row => result
            .records()
            .iter()
            .map(|r| {
                r.fields()
                    .iter()
                    .map(|f| f.value())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Per-event rows of a waterfall result, if the output carries one.
pub(crate) fn waterfall_events(result: &Value) -> Option<&Vec<Value>> {
    result.get("waterfall")?.get("events")?.as_array()
}

/// Columns for one allocated event: date, gross, fee, distributable,
/// the four tiers (carry split into LP and GP), then totals to each party.
pub(crate) const EVENT_HEADERS: [&str; 11] = [
    "date",
    "gross",
    "mgmt_fee",
    "distributable",
    "return_of_capital",
    "preferred_return",
    "gp_catch_up",
    "carry_lp",
    "carry_gp",
    "to_lp",
    "to_gp",
];

pub(crate) fn event_row(event: &Value) -> Vec<String> {
    let field = |key: &str| scalar(event.get(key).unwrap_or(&Value::Null));

    let mut tiers = [String::new(), String::new(), String::new(), String::new(), String::new()];
    if let Some(Value::Array(allocs)) = event.get("tiers") {
        for alloc in allocs {
            match alloc.get("tier").and_then(Value::as_str) {
                Some("return_of_capital") => tiers[0] = scalar(&alloc["amount"]),
                Some("preferred_return") => tiers[1] = scalar(&alloc["amount"]),
                Some("gp_catch_up") => tiers[2] = scalar(&alloc["amount"]),
                Some("carried_interest") => {
                    tiers[3] = scalar(&alloc["lp_amount"]);
                    tiers[4] = scalar(&alloc["gp_amount"]);
                }
                _ => {}
            }
        }
    }

    let mut row = vec![
        field("date"),
        field("gross_amount"),
        field("management_fee"),
        field("distributable"),
    ];
    row.extend(tiers);
    row.push(field("to_lp"));
    row.push(field("to_gp"));
    row
}

pub(crate) fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

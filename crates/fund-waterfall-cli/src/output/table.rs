use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{event_row, scalar, waterfall_events, EVENT_HEADERS};

/// Headline metrics, then one row per allocated distribution.
pub fn print_table(value: &Value) {
    let Value::Object(envelope) = value else {
        println!("{}", value);
        return;
    };
    let result = envelope.get("result").unwrap_or(value);

    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map.iter().filter(|(_, v)| !v.is_object() && !v.is_array()) {
            builder.push_record([key.as_str(), &scalar(val)]);
        }
        println!("{}", Table::from(builder));
    }

    if let Some(events) = waterfall_events(result).filter(|e| !e.is_empty()) {
        let mut builder = Builder::default();
        builder.push_record(EVENT_HEADERS);
        for event in events {
            builder.push_record(event_row(event));
        }
        println!("\nDistributions:");
        println!("{}", Table::from(builder));
    }

    if let Some(totals) = result
        .get("waterfall")
        .and_then(|w| w.get("totals"))
        .and_then(Value::as_object)
    {
        let mut builder = Builder::default();
        builder.push_record(["Total", "Amount"]);
        for (key, val) in totals {
            builder.push_record([key.as_str(), &scalar(val)]);
        }
        println!("\nTotals:");
        println!("{}", Table::from(builder));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

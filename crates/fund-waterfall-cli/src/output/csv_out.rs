use serde_json::Value;
use std::io;

use super::{event_row, scalar, waterfall_events, EVENT_HEADERS};

/// Write output as CSV to stdout: one row per distribution for waterfall
/// results, `field,value` pairs otherwise.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(events) = waterfall_events(result) {
        let _ = wtr.write_record(EVENT_HEADERS);
        for event in events {
            let _ = wtr.write_record(event_row(event));
        }
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &scalar(val)]);
        }
    } else {
        let _ = wtr.write_record([scalar(result)]);
    }

    let _ = wtr.flush();
}

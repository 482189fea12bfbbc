use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// Valuation results become `field,value` rows with nested objects
/// flattened to dotted keys; schedule output becomes one row per step.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let rows = match value {
        Value::Object(map) => match (map.get("result"), map.get("results")) {
            (Some(Value::Object(result)), _) => field_rows(result),
            (_, Some(Value::Array(steps))) => table_rows(steps),
            _ => field_rows(map),
        },
        Value::Array(arr) => table_rows(arr),
        _ => vec![vec![format_csv_value(value)]],
    };

    for row in rows {
        let _ = wtr.write_record(&row);
    }
    let _ = wtr.flush();
}

fn field_rows(map: &Map<String, Value>) -> Vec<Vec<String>> {
    let mut rows = vec![vec!["field".to_string(), "value".to_string()]];
    flatten_into("", map, &mut rows);
    rows
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, rows: &mut Vec<Vec<String>>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => flatten_into(&name, inner, rows),
            _ => rows.push(vec![name, format_csv_value(val)]),
        }
    }
}

fn table_rows(arr: &[Value]) -> Vec<Vec<String>> {
    let Some(Value::Object(first)) = arr.first() else {
        return arr.iter().map(|v| vec![format_csv_value(v)]).collect();
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut rows = vec![headers.clone()];
    for item in arr {
        if let Value::Object(map) = item {
            rows.push(
                headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_csv_value).unwrap_or_default())
                    .collect(),
            );
        }
    }
    rows
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

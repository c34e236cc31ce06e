//! Structural matching of expected fragments against template values.

use crate::core::types::{Template, Value};

/// Collect every way `actual` fails to match `expected`.
///
/// Maps match as supersets (expected keys must be present, extra keys are
/// fine; an expected `Null` means the key must be absent). Lists match
/// element-wise with equal length. A `Ref`/`GetAtt` target in `expected` may
/// be the logical ID, the full construct path, or the path below the stack.
pub fn mismatches(template: &Template, expected: &Value, actual: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect(template, expected, actual, "", &mut out);
    out
}

fn collect(template: &Template, expected: &Value, actual: &Value, at: &str, out: &mut Vec<String>) {
    match (expected, actual) {
        (Value::Map(want), Value::Map(have)) => {
            for (key, want_value) in want {
                let here = join_key(at, key);
                match (want_value, have.get(key)) {
                    (Value::Null, None) => {}
                    (Value::Null, Some(v)) => {
                        out.push(format!("at {}: expected absent, got {}", here, v))
                    }
                    (_, None) => out.push(format!("at {}: missing key", here)),
                    (w, Some(h)) => collect(template, w, h, &here, out),
                }
            }
        }
        (Value::List(want), Value::List(have)) => {
            if want.len() != have.len() {
                out.push(format!(
                    "at {}: expected {} element(s), got {}",
                    display_at(at),
                    want.len(),
                    have.len()
                ));
                return;
            }
            for (i, (w, h)) in want.iter().zip(have).enumerate() {
                collect(template, w, h, &format!("{}[{}]", at, i), out);
            }
        }
        (Value::Ref(want), Value::Ref(have)) => {
            if !names_record(template, want, have) {
                push_diff(out, at, expected, actual);
            }
        }
        (Value::GetAtt(want_id, want_attr), Value::GetAtt(have_id, have_attr)) => {
            if want_attr != have_attr || !names_record(template, want_id, have_id) {
                push_diff(out, at, expected, actual);
            }
        }
        (Value::Intrinsic(want_name, want_args), Value::Intrinsic(have_name, have_args))
            if want_name == have_name =>
        {
            collect(template, want_args, have_args, &join_key(at, want_name), out)
        }
        (w, h) if w == h => {}
        _ => push_diff(out, at, expected, actual),
    }
}

/// Whether `reference` (a logical ID or construct path) names `logical_id`.
fn names_record(template: &Template, reference: &str, logical_id: &str) -> bool {
    if reference == logical_id {
        return true;
    }
    match template.resources.get(logical_id) {
        Some(record) => {
            let path = record.path();
            path == reference || path.split_once('/').is_some_and(|(_, below)| below == reference)
        }
        None => false,
    }
}

fn push_diff(out: &mut Vec<String>, at: &str, expected: &Value, actual: &Value) {
    out.push(format!(
        "at {}: expected {}, got {}",
        display_at(at),
        expected,
        actual
    ));
}

fn join_key(at: &str, key: &str) -> String {
    if at.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", at, key)
    }
}

fn display_at(at: &str) -> &str {
    if at.is_empty() {
        "<root>"
    } else {
        at
    }
}

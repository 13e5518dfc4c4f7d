//! Bulk upload file parsing (JSON array or simple CSV) into raw candidates for
//! `QuestionBank::add_many`.
//!
//! CSV support is deliberately naive: each line is split on `,` with no quoting or
//! escaping, so fields containing commas cannot be expressed. Use the JSON format for
//! those.

use serde_json::{json, Value};

/// Header a CSV upload must start with, in this order.
pub const CSV_HEADERS: [&str; 7] =
  ["question", "option1", "option2", "option3", "option4", "correctAnswer", "subject"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportFormat {
  Json,
  Csv,
}

impl ImportFormat {
  pub fn parse(s: &str) -> Option<ImportFormat> {
    match s.trim().to_ascii_lowercase().as_str() {
      "json" => Some(ImportFormat::Json),
      "csv" => Some(ImportFormat::Csv),
      _ => None,
    }
  }
}

/// Parse an uploaded file body into raw candidates. Errors are whole-file problems
/// (bad header, not JSON); per-row problems are left for validation.
pub fn parse_upload(format: ImportFormat, body: &str) -> Result<Vec<Value>, String> {
  match format {
    ImportFormat::Json => parse_json(body),
    ImportFormat::Csv => parse_csv(body),
  }
}

/// Accepts either a bare array or `{ "mcqs": [...] }`.
pub fn parse_json(body: &str) -> Result<Vec<Value>, String> {
  let v: Value = serde_json::from_str(body).map_err(|e| format!("Invalid JSON: {e}"))?;
  match v {
    Value::Array(items) => Ok(items),
    Value::Object(mut obj) => match obj.remove("mcqs") {
      Some(Value::Array(items)) => Ok(items),
      _ => Err("JSON upload must be an array of MCQs or an object with an \"mcqs\" array.".into()),
    },
    _ => Err("JSON upload must be an array of MCQs.".into()),
  }
}

pub fn parse_csv(body: &str) -> Result<Vec<Value>, String> {
  let mut lines = body.lines();
  let header: Vec<&str> = lines.next().unwrap_or_default().split(',').map(str::trim).collect();
  if header != CSV_HEADERS {
    return Err(format!("CSV headers are incorrect. Expected: {}", CSV_HEADERS.join(",")));
  }

  Ok(
    lines
      .filter(|l| !l.trim().is_empty())
      .map(|line| {
        let values: Vec<&str> = line.split(',').collect();
        // Short rows yield nulls so validation names the missing field.
        let at = |i: usize| values.get(i).map(|s| Value::from(*s)).unwrap_or(Value::Null);
        json!({
          "question": at(0),
          "options": [at(1), at(2), at(3), at(4)],
          "correctAnswer": at(5),
          "subject": at(6),
        })
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bank::validate;

  #[test]
  fn csv_rows_become_candidates() {
    let body = "question,option1,option2,option3,option4,correctAnswer,subject\r\n\
                Unit of force?,Joule,Newton,Watt,Pascal,Newton,Physics\r\n\
                \r\n\
                Atomic number of carbon?,4,6,8,12,6,Chemistry\n";
    let rows = parse_csv(body).unwrap();
    assert_eq!(rows.len(), 2);
    let first = validate(&rows[0]).unwrap();
    assert_eq!(first.correct, 1);
    assert_eq!(first.subject, "Physics");
    assert_eq!(validate(&rows[1]).unwrap().options[1], "6");
  }

  #[test]
  fn csv_wrong_header_is_rejected() {
    let err = parse_csv("q,a,b,c,d,answer,subject\nx,1,2,3,4,1,s").unwrap_err();
    assert!(err.starts_with("CSV headers are incorrect"));
    assert!(parse_csv("").is_err());
  }

  #[test]
  fn csv_short_row_fails_validation_not_parsing() {
    let rows = parse_csv("question,option1,option2,option3,option4,correctAnswer,subject\nonly,a,b").unwrap();
    assert_eq!(rows.len(), 1);
    assert!(validate(&rows[0]).is_err());
  }

  #[test]
  fn json_accepts_bare_array_and_wrapper() {
    assert_eq!(parse_json("[{}, {}]").unwrap().len(), 2);
    assert_eq!(parse_json(r#"{"mcqs": [{}]}"#).unwrap().len(), 1);
    assert!(parse_json(r#"{"questions": []}"#).is_err());
    assert!(parse_json("nope").is_err());
  }
}

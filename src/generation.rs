//! Question generation through an external text model.
//!
//! Flow:
//! 1) A `GenerateRequest` is rendered into the prompt template.
//! 2) The model is asked for a JSON array of questions (plain text completion).
//! 3) The reply is untrusted: the first complete array literal holding question
//!    objects is extracted and every element is validated/defaulted on its own.

use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{GenerationCfg, Prompts};
use crate::domain::{Difficulty, Mcq, Subject, NO_EXPLANATION};
use crate::error::{GenerationError, ValidationError};
use crate::openai::OpenAI;
use crate::util::{fill_template, preview};

/// Default question count when the request names none.
pub const DEFAULT_COUNT: usize = 10;
/// Default question count for topic-focused generation.
pub const TOPIC_DEFAULT_COUNT: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct GenerateRequest {
  pub subject: Subject,
  pub topic: Option<String>,
  pub difficulty: Difficulty,
  pub count: usize,
}

impl GenerateRequest {
  /// Build a request, checking `count` against `1..=max_count`. A blank topic is dropped.
  pub fn new(
    subject: Subject,
    topic: Option<String>,
    difficulty: Difficulty,
    count: usize,
    max_count: usize,
  ) -> Result<Self, ValidationError> {
    if count == 0 || count > max_count {
      return Err(ValidationError::new("count", format!("Count must be between 1 and {max_count}.")));
    }
    let topic = topic.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    Ok(Self { subject, topic, difficulty, count })
  }
}

pub fn build_prompt(prompts: &Prompts, req: &GenerateRequest) -> String {
  let count = req.count.to_string();
  let topic_line = req.topic.as_deref().map(|t| format!("Topic: {t}")).unwrap_or_default();
  fill_template(
    &prompts.user_template,
    &[
      ("count", &count),
      ("subject", req.subject.display_name()),
      ("topic_line", &topic_line),
      ("difficulty", req.difficulty.as_str()),
    ],
  )
}

/// Byte length of the bracketed literal starting at `s[0] == '['`, or None if it
/// never closes. Strings and escapes are skipped so brackets inside them don't count.
fn balanced_len(s: &str) -> Option<usize> {
  let mut depth: i32 = 0;
  let mut in_str = false;
  let mut escaped = false;
  for (i, c) in s.char_indices() {
    if in_str {
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == '"' {
        in_str = false;
      }
      continue;
    }
    match c {
      '"' => in_str = true,
      '[' | '{' => depth += 1,
      ']' | '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(i + c.len_utf8());
        }
        if depth < 0 {
          return None;
        }
      }
      _ => {}
    }
  }
  None
}

/// Find the first complete array literal in `text` that parses as a JSON array of
/// objects. Arrays of scalars (e.g. a "[1]" footnote in prose) are passed over.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, GenerationError> {
  let mut saw_balanced = false;
  let mut last_err: Option<String> = None;

  for (start, _) in text.match_indices('[') {
    let rest = &text[start..];
    let Some(len) = balanced_len(rest) else { continue };
    saw_balanced = true;
    match serde_json::from_str::<Vec<Value>>(&rest[..len]) {
      Ok(items) if items.iter().any(Value::is_object) => return Ok(items),
      Ok(_) => last_err = Some("array holds no question objects".into()),
      Err(e) => last_err = Some(e.to_string()),
    }
  }

  if saw_balanced {
    Err(GenerationError::Parse(last_err.unwrap_or_default()))
  } else {
    Err(GenerationError::NoArray)
  }
}

/// Interpret the model's `correctAnswer`: an index, a numeric string, a letter A-D,
/// or the text of one of the options. A string equal to an option is always that option.
fn resolve_correct(v: &Value, options: &[String; 4]) -> Option<usize> {
  match v {
    Value::Number(n) => n.as_u64().map(|i| i as usize).filter(|i| *i < 4),
    Value::String(s) => {
      let s = s.trim();
      if let Some(i) = options.iter().position(|o| o.trim() == s) {
        return Some(i);
      }
      if let Ok(i) = s.parse::<usize>() {
        if i < 4 {
          return Some(i);
        }
      }
      let letter = s.trim_end_matches([')', '.', ':']);
      if letter.len() == 1 {
        if let Some(i) = "ABCD".find(letter.to_ascii_uppercase().as_str()) {
          return Some(i);
        }
      }
      options.iter().position(|o| o.trim().eq_ignore_ascii_case(s))
    }
    _ => None,
  }
}

fn text_field(item: &Value, field: &str) -> Option<String> {
  item
    .get(field)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

fn options_field(item: &Value) -> Option<[String; 4]> {
  let arr = item.get("options")?.as_array()?;
  let opts: Vec<String> = arr
    .iter()
    .map(|o| o.as_str().map(|s| s.trim().to_string()))
    .collect::<Option<Vec<_>>>()?;
  if opts.iter().any(String::is_empty) {
    return None;
  }
  let distinct = opts.iter().enumerate().all(|(i, o)| !opts[..i].contains(o));
  if !distinct {
    return None;
  }
  opts.try_into().ok()
}

fn map_item(item: &Value, req: &GenerateRequest) -> Result<Mcq, &'static str> {
  let question = text_field(item, "question").ok_or("missing question")?;
  let options = options_field(item).ok_or("options are not 4 distinct strings")?;
  let correct = item
    .get("correctAnswer")
    .and_then(|v| resolve_correct(v, &options))
    .ok_or("correctAnswer does not identify an option")?;

  Ok(Mcq {
    id: format!("generated-{}", Uuid::new_v4()),
    question,
    options,
    correct,
    subject: req.subject.as_str().to_string(),
    topic: text_field(item, "topic")
      .or_else(|| req.topic.clone())
      .unwrap_or_else(|| "General".to_string()),
    difficulty: req.difficulty,
    explanation: text_field(item, "explanation").unwrap_or_else(|| NO_EXPLANATION.to_string()),
    created_at: None,
  })
}

/// Map untrusted items to records. Bad items are skipped; none usable is an error.
pub fn map_generated(items: &[Value], req: &GenerateRequest) -> Result<Vec<Mcq>, GenerationError> {
  let mut out = Vec::with_capacity(items.len());
  for (i, item) in items.iter().enumerate() {
    match map_item(item, req) {
      Ok(m) => out.push(m),
      Err(reason) => warn!(target: "generation", index = i, reason, "Dropping generated item"),
    }
  }
  if out.is_empty() {
    return Err(GenerationError::Empty);
  }
  Ok(out)
}

/// Parse a full model reply into records for `req`.
pub fn parse_reply(reply: &str, req: &GenerateRequest) -> Result<Vec<Mcq>, GenerationError> {
  let items = extract_json_array(reply)?;
  map_generated(&items, req)
}

/// Split a mixed-difficulty request: ⌈40%⌉ easy, ⌈40%⌉ medium, remainder hard.
pub fn split_mixed(count: usize) -> [(Difficulty, usize); 3] {
  let forty = (2 * count + 4) / 5;
  let easy = forty.min(count);
  let medium = forty.min(count - easy);
  let hard = count - easy - medium;
  [(Difficulty::Easy, easy), (Difficulty::Medium, medium), (Difficulty::Hard, hard)]
}

pub struct Generator {
  openai: Option<OpenAI>,
  prompts: Prompts,
  cfg: GenerationCfg,
}

impl Generator {
  pub fn new(openai: Option<OpenAI>, prompts: Prompts, cfg: GenerationCfg) -> Self {
    Self { openai, prompts, cfg }
  }

  pub fn is_enabled(&self) -> bool {
    self.openai.is_some()
  }

  pub fn max_count(&self) -> usize {
    self.cfg.max_count
  }

  #[instrument(
    level = "info",
    skip(self, req),
    fields(subject = %req.subject, difficulty = %req.difficulty, count = req.count, has_topic = req.topic.is_some())
  )]
  pub async fn generate(&self, req: &GenerateRequest) -> Result<Vec<Mcq>, GenerationError> {
    let oa = self.openai.as_ref().ok_or(GenerationError::Disabled)?;
    let prompt = build_prompt(&self.prompts, req);
    let reply = oa.chat_plain(&self.prompts.system, &prompt, self.cfg.temperature).await?;

    let questions = parse_reply(&reply, req).inspect_err(|e| {
      warn!(target: "generation", error = %e, reply_preview = %preview(&reply, 120), "Unusable model reply");
    })?;
    if questions.len() != req.count {
      warn!(target: "generation", requested = req.count, received = questions.len(), "Model returned a different number of questions");
    }
    info!(target: "generation", received = questions.len(), "Questions generated");
    Ok(questions)
  }

  /// Medium-difficulty questions focused on one topic.
  pub async fn generate_topic(
    &self,
    subject: Subject,
    topic: &str,
    count: Option<usize>,
  ) -> Result<Vec<Mcq>, GenerationError> {
    let req = GenerateRequest {
      subject,
      topic: Some(topic.to_string()),
      difficulty: Difficulty::Medium,
      count: count.unwrap_or(TOPIC_DEFAULT_COUNT).clamp(1, self.cfg.max_count.max(1)),
    };
    self.generate(&req).await
  }

  /// Easy, medium and hard batches requested concurrently, returned in that order.
  #[instrument(level = "info", skip(self, subject), fields(%subject))]
  pub async fn generate_mixed(&self, subject: Subject, count: usize) -> Result<Vec<Mcq>, GenerationError> {
    let [easy, medium, hard] = split_mixed(count).map(|(difficulty, count)| GenerateRequest {
      subject,
      topic: None,
      difficulty,
      count,
    });
    let (e, m, h) = tokio::join!(
      self.generate_part(&easy),
      self.generate_part(&medium),
      self.generate_part(&hard),
    );
    let mut out = e?;
    out.extend(m?);
    out.extend(h?);
    Ok(out)
  }

  async fn generate_part(&self, req: &GenerateRequest) -> Result<Vec<Mcq>, GenerationError> {
    if req.count == 0 {
      return Ok(Vec::new());
    }
    self.generate(req).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn req(count: usize) -> GenerateRequest {
    GenerateRequest::new(Subject::Physics, None, Difficulty::Hard, count, 20).unwrap()
  }

  fn item(i: usize) -> Value {
    json!({
      "question": format!("Question {i}?"),
      "options": ["Joule", "Newton", "Watt", "Pascal"],
      "correctAnswer": 1,
      "explanation": "Newton is the SI unit of force.",
      "topic": "Mechanics"
    })
  }

  #[test]
  fn reply_with_prose_and_five_items() {
    let arr = serde_json::to_string_pretty(&(0..5).map(item).collect::<Vec<_>>()).unwrap();
    let reply = format!("Sure! Here are your questions:\n```json\n{arr}\n```\nGood luck [and have fun].");
    let out = parse_reply(&reply, &req(5)).unwrap();
    assert_eq!(out.len(), 5);
    for m in &out {
      assert_eq!(m.subject, "physics");
      assert_eq!(m.difficulty, Difficulty::Hard);
      assert_eq!(m.correct, 1);
      assert_eq!(m.topic, "Mechanics");
      assert!(m.id.starts_with("generated-"));
    }
  }

  #[test]
  fn reply_without_array_fails() {
    let err = parse_reply("I cannot help with that.", &req(3)).unwrap_err();
    assert!(matches!(err, GenerationError::NoArray));
  }

  #[test]
  fn unterminated_array_is_no_array() {
    let err = extract_json_array(r#"[{"question": "cut off"#).unwrap_err();
    assert!(matches!(err, GenerationError::NoArray));
  }

  #[test]
  fn broken_array_is_parse_error() {
    let err = extract_json_array("[{question: 'single quotes'}]").unwrap_err();
    assert!(matches!(err, GenerationError::Parse(_)));
  }

  #[test]
  fn scalar_footnote_array_is_skipped() {
    let text = format!("See [1] for sources. {}", json!([item(0)]));
    let items = extract_json_array(&text).unwrap();
    assert_eq!(items.len(), 1);
  }

  #[test]
  fn brackets_inside_strings_do_not_confuse_scanner() {
    let text = r#"[{"question": "Which ] is [ odd?", "options": ["a","b","c","d"], "correctAnswer": 0}]"#;
    let items = extract_json_array(text).unwrap();
    assert_eq!(items[0]["question"], "Which ] is [ odd?");
  }

  #[test]
  fn correct_answer_forms() {
    let opts: [String; 4] = ["4".into(), "6".into(), "8".into(), "12".into()];
    assert_eq!(resolve_correct(&json!(2), &opts), Some(2));
    assert_eq!(resolve_correct(&json!("3"), &opts), Some(3));
    assert_eq!(resolve_correct(&json!("b"), &opts), Some(1));
    assert_eq!(resolve_correct(&json!("C)"), &opts), Some(2));
    assert_eq!(resolve_correct(&json!("12"), &opts), Some(3));
    assert_eq!(resolve_correct(&json!(7), &opts), None);
    assert_eq!(resolve_correct(&json!(null), &opts), None);
  }

  #[test]
  fn option_text_wins_over_index_reading() {
    let digits: [String; 4] = ["1".into(), "2".into(), "3".into(), "4".into()];
    assert_eq!(resolve_correct(&json!("3"), &digits), Some(2));
    assert_eq!(resolve_correct(&json!(3), &digits), Some(3));

    let letters: [String; 4] = ["B".into(), "C".into(), "D".into(), "A".into()];
    assert_eq!(resolve_correct(&json!("A"), &letters), Some(3));
  }

  #[test]
  fn bad_items_are_dropped_and_defaults_applied() {
    let r = GenerateRequest::new(Subject::Biology, Some("Cells".into()), Difficulty::Easy, 3, 20).unwrap();
    let items = vec![
      json!({ "question": "Three options?", "options": ["a", "b", "c"], "correctAnswer": 0 }),
      json!({ "question": "Powerhouse?", "options": ["Nucleus", "Mitochondria", "Ribosome", "Golgi"], "correctAnswer": "Mitochondria" }),
      json!("not an object"),
    ];
    let out = map_generated(&items, &r).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].correct, 1);
    assert_eq!(out[0].topic, "Cells");
    assert_eq!(out[0].explanation, NO_EXPLANATION);
    assert_eq!(out[0].subject, "biology");
  }

  #[test]
  fn nothing_usable_is_empty_error() {
    let err = map_generated(&[json!({})], &req(1)).unwrap_err();
    assert!(matches!(err, GenerationError::Empty));
  }

  #[test]
  fn request_count_bounds() {
    assert!(GenerateRequest::new(Subject::English, None, Difficulty::Easy, 0, 20).is_err());
    assert!(GenerateRequest::new(Subject::English, None, Difficulty::Easy, 21, 20).is_err());
    let r = GenerateRequest::new(Subject::English, Some("  ".into()), Difficulty::Easy, 20, 20).unwrap();
    assert_eq!(r.topic, None);
  }

  #[test]
  fn prompt_mentions_request() {
    let r = GenerateRequest::new(Subject::GeneralKnowledge, Some("History".into()), Difficulty::Medium, 7, 20).unwrap();
    let p = build_prompt(&Prompts::default(), &r);
    assert!(p.contains("Generate 7 multiple choice questions"));
    assert!(p.contains("Subject: General Knowledge"));
    assert!(p.contains("Topic: History"));
    assert!(p.contains("Difficulty: medium"));
  }

  #[test]
  fn mixed_split() {
    let counts = |n| split_mixed(n).map(|(_, c)| c);
    assert_eq!(counts(10), [4, 4, 2]);
    assert_eq!(counts(1), [1, 0, 0]);
    assert_eq!(counts(2), [1, 1, 0]);
    assert_eq!(counts(3), [2, 1, 0]);
    assert_eq!(counts(0), [0, 0, 0]);
  }

  #[tokio::test]
  async fn disabled_generator_fails_fast() {
    let g = Generator::new(None, Prompts::default(), GenerationCfg::default());
    assert!(!g.is_enabled());
    let err = g.generate(&req(2)).await.unwrap_err();
    assert!(matches!(err, GenerationError::Disabled));
  }
}

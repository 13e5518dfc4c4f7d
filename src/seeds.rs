//! Built-in sample questions. They are the default practice source, so a fresh
//! install is usable without a question bank or a model key.

use crate::domain::{Difficulty, Mcq, Subject};

fn sample(
  id: &str,
  subject: Subject,
  topic: &str,
  question: &str,
  options: [&str; 4],
  correct: usize,
  explanation: &str,
) -> Mcq {
  Mcq {
    id: id.into(),
    question: question.into(),
    options: options.map(String::from),
    correct,
    subject: subject.as_str().into(),
    topic: topic.into(),
    difficulty: Difficulty::Easy,
    explanation: explanation.into(),
    created_at: None,
  }
}

pub fn sample_questions() -> Vec<Mcq> {
  vec![
    sample(
      "sample-1",
      Subject::Biology,
      "Cell Biology",
      "Which organelle is known as the powerhouse of the cell?",
      ["Nucleus", "Mitochondria", "Ribosome", "Endoplasmic Reticulum"],
      1,
      "Mitochondria are called the powerhouse of the cell because they produce ATP through cellular respiration.",
    ),
    sample(
      "sample-2",
      Subject::Physics,
      "Mechanics",
      "What is the unit of force in the SI system?",
      ["Joule", "Newton", "Watt", "Pascal"],
      1,
      "Newton (N) is the SI unit of force, named after Sir Isaac Newton.",
    ),
    sample(
      "sample-3",
      Subject::Chemistry,
      "Periodic Table",
      "What is the atomic number of Carbon?",
      ["4", "6", "8", "12"],
      1,
      "Carbon has 6 protons in its nucleus, making its atomic number 6.",
    ),
    sample(
      "sample-4",
      Subject::Mathematics,
      "Algebra",
      "Solve: 2x + 5 = 15",
      ["x = 3", "x = 5", "x = 7", "x = 10"],
      1,
      "2x + 5 = 15, so 2x = 10, therefore x = 5.",
    ),
    sample(
      "sample-5",
      Subject::English,
      "Grammar",
      "Choose the correct form: \"He _____ to school every day.\"",
      ["go", "goes", "going", "gone"],
      1,
      "With third person singular subjects like \"he\", we use \"goes\" in present tense.",
    ),
  ]
}

/// Samples for one subject, or all of them.
pub fn samples_for(subject: Option<Subject>) -> Vec<Mcq> {
  sample_questions()
    .into_iter()
    .filter(|m| subject.map_or(true, |s| s.matches_label(&m.subject)))
    .collect()
}

//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe preview of a possibly large string, cut on a char boundary.
pub fn preview(s: &str, max_chars: usize) -> String {
  let mut it = s.chars();
  let head: String = it.by_ref().take(max_chars).collect();
  if it.next().is_some() { format!("{head}… ({} bytes total)", s.len()) } else { head }
}

//! Decoding recipe drafts from completion text
//!
//! The provider is asked for strict JSON but does not always comply, so
//! decoding runs in two stages: structured JSON first, then a plaintext
//! fallback that takes the first line as the title.

use crate::error::{Error, Result};
use crate::recipe::RecipeDraft;
use serde::Deserialize;

#[derive(Deserialize)]
struct StructuredRecipe {
    title: String,
    #[serde(default)]
    content: String,
}

/// Parse completion text into a draft
pub fn parse_recipe_content(content: &str) -> Result<RecipeDraft> {
    let text = strip_code_fence(content.trim());
    if text.is_empty() {
        return Err(Error::validation("content", "The AI returned an empty recipe."));
    }

    if let Some(draft) = parse_structured(text) {
        return Ok(draft);
    }

    tracing::debug!("completion was not structured JSON, using plaintext fallback");
    parse_plaintext(text)
}

fn parse_structured(text: &str) -> Option<RecipeDraft> {
    let recipe: StructuredRecipe = serde_json::from_str(text).ok()?;
    let title = recipe.title.trim();
    if title.is_empty() {
        return None;
    }
    Some(RecipeDraft::new(title, recipe.content.trim()))
}

fn parse_plaintext(text: &str) -> Result<RecipeDraft> {
    let mut lines = text.lines();
    let mut title = String::new();

    for line in lines.by_ref() {
        let candidate = clean_title(line);
        if !candidate.is_empty() {
            title = candidate.to_string();
            break;
        }
    }

    if title.is_empty() {
        return Err(Error::validation("title", "The AI response had no recipe title."));
    }

    let body = lines.collect::<Vec<_>>().join("\n");
    Ok(RecipeDraft::new(title, body.trim()))
}

/// Strip Markdown heading/emphasis markers and a `Title:` label
fn clean_title(line: &str) -> &str {
    let line = line.trim_start_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());
    let line = match line.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("title:") => line[6..].trim(),
        _ => line,
    };
    line.trim_end_matches(|c: char| c == '*' || c.is_whitespace())
}

/// Remove a surrounding ``` fence, with or without a language tag
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string on the opening line
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_json() {
        let draft = parse_recipe_content(r#"{"title": "X", "content": "Y"}"#).unwrap();
        assert_eq!(draft, RecipeDraft::new("X", "Y"));
    }

    #[test]
    fn test_fenced_json() {
        let text = "```json\n{\"title\": \"Tacos\", \"content\": \"Tortillas\"}\n```";
        let draft = parse_recipe_content(text).unwrap();
        assert_eq!(draft.title, "Tacos");
        assert_eq!(draft.content, "Tortillas");
    }

    #[test]
    fn test_json_without_title_falls_back() {
        let draft = parse_recipe_content(r#"{"title": "", "content": "Y"}"#).unwrap();
        assert_eq!(draft.title, r#"{"title": "", "content": "Y"}"#);
        assert_eq!(draft.content, "");
    }

    #[test]
    fn test_plaintext_heuristic() {
        let text = "\n## **Title: Lemon Pasta**\n\nIngredients:\n- pasta\n- lemon\n";
        let draft = parse_recipe_content(text).unwrap();
        assert_eq!(draft.title, "Lemon Pasta");
        assert_eq!(draft.content, "Ingredients:\n- pasta\n- lemon");
    }

    #[test]
    fn test_single_line() {
        let draft = parse_recipe_content("Toast").unwrap();
        assert_eq!(draft, RecipeDraft::new("Toast", ""));
    }

    #[test]
    fn test_empty_is_validation_error() {
        assert!(matches!(
            parse_recipe_content("   \n"),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            parse_recipe_content("```\n```"),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            parse_recipe_content("#\n**\n"),
            Err(Error::Validation { .. })
        ));
    }
}

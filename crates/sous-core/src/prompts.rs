//! Prompt construction for recipe generation and modification

use crate::recipe::{DietaryPreferences, GenerateParams, ModifyParams, PersistedRecipe, RecipeDraft};
use crate::types::Message;

const SYSTEM_PROMPT: &str = "You are Sous, a helpful cooking assistant that writes clear, \
practical recipes for home cooks. Always answer with a single JSON object of the form \
{\"title\": \"<recipe title>\", \"content\": \"<ingredients and numbered steps in Markdown>\"} \
and nothing else.";

/// System message with the output contract and the user's preferences
pub fn system_message(preferences: &DietaryPreferences) -> Message {
    let mut prompt = SYSTEM_PROMPT.to_string();

    if !preferences.is_empty() {
        prompt.push_str("\n\nRespect the user's dietary preferences:");
        push_list(&mut prompt, "Dietary restrictions", &preferences.restrictions);
        push_list(&mut prompt, "Allergies (never include)", &preferences.allergies);
        push_list(&mut prompt, "Dislikes (avoid)", &preferences.dislikes);
        if let Some(notes) = preferences.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            prompt.push_str("\n- Notes: ");
            prompt.push_str(notes);
        }
    }

    Message::system(prompt)
}

/// Messages for a generate call
pub fn generate_messages(preferences: &DietaryPreferences, params: &GenerateParams) -> Vec<Message> {
    let mut request = String::from("Create a new recipe.");

    if let Some(extra) = params
        .additional_params
        .as_deref()
        .map(str::trim)
        .filter(|extra| !extra.is_empty())
    {
        request.push_str("\nRequirements: ");
        request.push_str(extra);
    }

    if let Some(base) = &params.base_recipe {
        request.push_str("\nUse this recipe as inspiration:\n");
        push_recipe(&mut request, base);
    }

    vec![system_message(preferences), Message::user(request)]
}

/// Messages for a modify call
pub fn modify_messages(
    preferences: &DietaryPreferences,
    original: &PersistedRecipe,
    params: &ModifyParams,
) -> Vec<Message> {
    let mut request = String::from("Modify the following recipe.\n");
    push_recipe(&mut request, &original.to_draft());
    request.push_str("\nRequested changes: ");
    request.push_str(params.instructions.trim());
    request.push_str("\nKeep everything else about the recipe the same.");

    vec![system_message(preferences), Message::user(request)]
}

fn push_list(prompt: &mut String, label: &str, items: &[String]) {
    let items: Vec<&str> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();
    if !items.is_empty() {
        prompt.push_str(&format!("\n- {}: {}", label, items.join(", ")));
    }
}

fn push_recipe(prompt: &mut String, recipe: &RecipeDraft) {
    prompt.push_str(&format!("Title: {}\n{}", recipe.title, recipe.content));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::UserId;
    use crate::types::MessageRole;
    use chrono::Utc;

    #[test]
    fn test_system_prompt_without_preferences() {
        let message = system_message(&DietaryPreferences::default());
        assert_eq!(message.role, MessageRole::System);
        assert!(message.content.contains("\"title\""));
        assert!(!message.content.contains("dietary preferences"));
    }

    #[test]
    fn test_preferences_are_folded_in() {
        let preferences = DietaryPreferences {
            restrictions: vec!["vegan".to_string()],
            allergies: vec!["peanuts".to_string(), " ".to_string()],
            dislikes: Vec::new(),
            notes: Some("loves spicy food".to_string()),
        };
        let content = system_message(&preferences).content;
        assert!(content.contains("Dietary restrictions: vegan"));
        assert!(content.contains("Allergies (never include): peanuts"));
        assert!(!content.contains("Dislikes"));
        assert!(content.contains("loves spicy food"));
    }

    #[test]
    fn test_generate_messages() {
        let params = GenerateParams {
            additional_params: Some("low carb".to_string()),
            base_recipe: Some(RecipeDraft::new("Pancakes", "Flour, eggs")),
        };
        let messages = generate_messages(&DietaryPreferences::default(), &params);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::User);
        assert!(messages[1].content.contains("Requirements: low carb"));
        assert!(messages[1].content.contains("Title: Pancakes"));
    }

    #[test]
    fn test_generate_without_extras() {
        let messages = generate_messages(&DietaryPreferences::default(), &GenerateParams::default());
        assert_eq!(messages[1].content, "Create a new recipe.");
    }

    #[test]
    fn test_modify_messages() {
        let original = PersistedRecipe {
            id: 3,
            owner: UserId::new("cook"),
            title: "Chili".to_string(),
            content: "Beans, beef".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let messages = modify_messages(
            &DietaryPreferences::default(),
            &original,
            &ModifyParams::new("make it vegetarian "),
        );
        assert!(messages[1].content.contains("Title: Chili"));
        assert!(messages[1].content.contains("Requested changes: make it vegetarian\n"));
    }
}

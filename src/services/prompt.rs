//! Turns travel preferences and retrieved chunks into model input.
//!
//! Everything here is pure: the same preferences and matches always produce
//! byte-identical output.

use crate::models::{RetrievalMatch, UserPreferences};

/// Separator placed between context entries.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Shown to the traveller when no chunk cleared the similarity threshold.
pub const NO_MATCH_MESSAGE: &str = "Based on the information I have, I couldn't find a specific island that perfectly matches all your preferences right now. Perhaps try adjusting your selections?";

const SYSTEM_INSTRUCTIONS: &str = r#"You are 'Island Breeze', an enthusiastic and friendly tropical travel planner. Recommend island destinations using ONLY the island descriptions supplied in the user's message together with their stated preferences. Do not use any outside knowledge.

Rules:
- Recommend between 1 and 3 destinations, best fit first.
- Every recommendation must be supported by the supplied descriptions.
- Write each description as two or three short paragraphs explaining why the island suits this traveller, in a positive and inviting tone.
- Speak directly to the traveller. Never mention "context", "snippets", "provided information" or receiving information; never describe how you found the islands.
- Never recommend the same destination twice. Before answering, check the list for duplicates and replace any duplicate with a different destination from the descriptions, or drop it.

Output format:
Respond with a JSON array and nothing else, wrapped in a ```json fenced block. Each element must be an object with exactly these string fields:
- "country_name": the island or destination name
- "desc": the multi-paragraph explanation (separate paragraphs with \n\n)
- "country_continent_location": the continent or region the destination belongs to"#;

/// System instructions plus user content for a single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system_instructions: String,
    pub user_content: String,
}

/// What the orchestrator should do after retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPlan {
    /// Call the generator with this prompt.
    Generate(Prompt),
    /// Nothing was retrieved; skip generation and answer with the sentinel.
    NoMatch { message: &'static str },
}

/// Renders the preferences as the sentence that gets embedded for retrieval.
pub fn query_sentence(preferences: &UserPreferences) -> String {
    format!(
        "Seeking a {} destination with a {} vibe, interested in activities like {}.",
        preferences.luxury_tier(),
        preferences.vibe(),
        preferences.interests().join(", ")
    )
}

/// Renders the preferences for the generator.
pub fn preferences_summary(preferences: &UserPreferences) -> String {
    format!(
        "The traveller is looking for a {} destination (luxury {}/10) with a {} vibe, interested in: {}.",
        preferences.luxury_tier(),
        preferences.luxury_scale(),
        preferences.vibe(),
        preferences.interests().join(", ")
    )
}

/// Joins the matches, in retrieval order, into one labelled block.
pub fn context_block(matches: &[RetrievalMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(index, m)| {
            format!(
                "Description {} (from {}):\n{}",
                index + 1,
                m.destination,
                m.chunk_text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

pub fn build_prompt(matches: &[RetrievalMatch], preferences: &UserPreferences) -> PromptPlan {
    if matches.is_empty() {
        return PromptPlan::NoMatch {
            message: NO_MATCH_MESSAGE,
        };
    }

    let user_content = format!(
        "Traveller preferences: {}\n\nUsing only the island descriptions below, recommend up to three destinations that fit and explain why.\n\nIsland descriptions:\n\n{}",
        preferences_summary(preferences),
        context_block(matches)
    );

    PromptPlan::Generate(Prompt {
        system_instructions: SYSTEM_INSTRUCTIONS.to_string(),
        user_content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecommendationRequest;

    fn preferences(scale: i64, vibe: &str, interests: &[&str]) -> UserPreferences {
        RecommendationRequest {
            luxury_scale: Some(scale),
            vibe: Some(vibe.to_string()),
            interests: Some(interests.iter().map(|s| s.to_string()).collect()),
        }
        .into_preferences()
        .unwrap()
    }

    fn matches() -> Vec<RetrievalMatch> {
        vec![
            RetrievalMatch {
                destination: "Bora Bora".to_string(),
                chunk_text: "Overwater bungalows above a turquoise lagoon.".to_string(),
                similarity: 0.91,
            },
            RetrievalMatch {
                destination: "Seychelles".to_string(),
                chunk_text: "Granite boulders and quiet beaches.".to_string(),
                similarity: 0.83,
            },
        ]
    }

    #[test]
    fn test_query_sentence() {
        let prefs = preferences(9, "Beach", &["Romance", "Relaxing"]);
        assert_eq!(
            query_sentence(&prefs),
            "Seeking a luxurious destination with a Beach vibe, interested in activities like Romance, Relaxing."
        );
    }

    #[test]
    fn test_query_sentence_is_deterministic() {
        let prefs = preferences(5, "Adventure", &["Hiking", "Diving"]);
        assert_eq!(query_sentence(&prefs), query_sentence(&prefs.clone()));
        assert!(query_sentence(&prefs).contains("comfortable"));
    }

    #[test]
    fn test_query_sentence_bucket_edges() {
        assert!(query_sentence(&preferences(3, "Beach", &["Surf"])).contains("a rustic"));
        assert!(query_sentence(&preferences(4, "Beach", &["Surf"])).contains("a comfortable"));
        assert!(query_sentence(&preferences(7, "Beach", &["Surf"])).contains("a comfortable"));
        assert!(query_sentence(&preferences(8, "Beach", &["Surf"])).contains("a luxurious"));
    }

    #[test]
    fn test_empty_matches_short_circuit() {
        let plan = build_prompt(&[], &preferences(5, "Beach", &["Surf"]));
        assert_eq!(
            plan,
            PromptPlan::NoMatch {
                message: NO_MATCH_MESSAGE
            }
        );
    }

    #[test]
    fn test_context_preserves_retrieval_order() {
        let block = context_block(&matches());
        let first = block.find("Bora Bora").unwrap();
        let second = block.find("Seychelles").unwrap();

        assert!(first < second);
        assert_eq!(block.matches(CONTEXT_DELIMITER).count(), 1);
        assert!(block.starts_with("Description 1 (from Bora Bora):\n"));
    }

    #[test]
    fn test_prompt_contents() {
        let prefs = preferences(2, "Adventure", &["Hiking"]);
        let PromptPlan::Generate(prompt) = build_prompt(&matches(), &prefs) else {
            panic!("expected a prompt");
        };

        assert!(prompt.user_content.contains("rustic destination (luxury 2/10)"));
        assert!(prompt.user_content.contains("Granite boulders"));
        assert!(prompt.system_instructions.contains("\"country_name\""));
        assert!(prompt.system_instructions.contains("\"desc\""));
        assert!(prompt.system_instructions.contains("\"country_continent_location\""));
        assert!(prompt.system_instructions.contains("between 1 and 3"));
        assert!(prompt.system_instructions.contains("duplicate"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let prefs = preferences(6, "Culture", &["Food", "History"]);
        assert_eq!(
            build_prompt(&matches(), &prefs),
            build_prompt(&matches(), &prefs)
        );
    }
}

//! Instruction templates sent to the [`NarrativeRewriter`](crate::collaborators::NarrativeRewriter).
//!
//! The retrieval index was built from impressionistic, memory-like
//! descriptions, so literal queries are rewritten into that register before
//! matching. Summaries are rewritten into a short recollection on the way out.

/// Build the query-normalization prompt for a raw user query.
pub fn normalize_query_prompt(query: &str) -> String {
    format!(
        "The user has entered the following search query:\n\
         \n\
         \"{query}\"\n\
         \n\
         Your task is to rewrite this query to better align with memory-based retrieval \
         patterns, as used in systems like HyPE.\n\
         \n\
         The rewritten query should sound casual and slightly imprecise, something a user \
         might type when trying to find a moment from memory. Think in terms of vibe, scene, \
         or emotional anchor. Avoid technical or literal phrasing.\n\
         \n\
         Do not add explanations. Output only the rewritten query as a single line."
    )
}

/// Build the summary-enrichment prompt for a stored summary.
pub fn enrich_summary_prompt(summary: &str) -> String {
    format!(
        "Rewrite the following as a vivid and elegant memory, in 3 to 8 lines. \
         It should feel warm and grounded, something the user can fondly reflect on \
         without being sentimental or nostalgic. \
         The tone should be almost factual, but with poetic clarity and grace. \
         Add light context where it fits. \
         Avoid anything overly dramatic, cheesy, or emotionally indulgent. \
         Rewrite this: {summary}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prompt_quotes_query() {
        let prompt = normalize_query_prompt("eiffel tower at night");
        assert!(prompt.contains("\"eiffel tower at night\""));
        assert!(prompt.ends_with("single line."));
    }

    #[test]
    fn test_enrich_prompt_ends_with_summary() {
        let prompt = enrich_summary_prompt("We walked along the Seine.");
        assert!(prompt.contains("3 to 8 lines"));
        assert!(prompt.ends_with("Rewrite this: We walked along the Seine."));
    }
}

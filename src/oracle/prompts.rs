use crate::types::SearchHit;

pub const REPHRASE_SYSTEM: &str = "You are rephrasing search queries to be more specific and contextual.";

pub fn rephrase(topic: &str, text: &str) -> String {
    format!(
        r#"INPUT TOPIC: {topic}

ORIGINAL SEARCH TEXT: {text}

Task: Rephrase the original search text to relate it to the input topic, while preserving the original meaning and sentiment.

Rules:
1. Keep the core meaning and perspective of the original text unchanged
2. Connect it naturally to the input topic
3. Make it more specific for better search results
4. Keep it concise (under 100 words)
5. Do not add bias or change the political stance

Respond ONLY with the rephrased text, nothing else."#
    )
}

pub const RELEVANCE_SYSTEM: &str =
    "You are analyzing web search results for relevance to a specific topic and context.";

pub fn relevance(topic: &str, context: &str, query: &str, hit: &SearchHit) -> String {
    format!(
        r#"TOPIC: {topic}

CONTEXT: {context}

SEARCH QUERY: {query}

LINK TO EVALUATE:
Title: {title}
URL: {url}
Snippet: {snippet}

Task: Determine if this link contains content relevant to the given topic and context.

Evaluate based on:
1. Direct mentions or references to the topic
2. Discussion of events, people, or issues mentioned in the context
3. Related news, analysis, or commentary on the topic
4. Credible sources discussing the same subject matter

NOT relevant:
- Generic articles about completely unrelated topics
- Articles about different subjects or people
- Unrelated news or content

Respond ONLY with a JSON object in this exact format:
{{
    "relevant": true or false,
    "confidence": 0.0 to 1.0,
    "reason": "brief explanation"
}}"#,
        title = hit.title,
        url = hit.url,
        snippet = hit.snippet,
    )
}

pub const TRUST_SYSTEM: &str = "You analyze the trustworthiness and reputation of web sources.";

/// Host part of a URL, or the whole string when it has no `scheme://host`.
pub fn domain_of(url: &str) -> &str {
    url.split('/').nth(2).unwrap_or(url)
}

/// The score bands here are guidance for the model. Scores are only clamped
/// to 0..=1 afterwards, never checked against a band.
pub fn trust(hit: &SearchHit) -> String {
    format!(
        r#"Analyze the trustworthiness and reputation of this source.

URL: {url}
Domain: {domain}
Title: {title}
Snippet: {snippet}

Evaluate based on:
1. Source Type: News organization, academic, government, social media, blog, etc.
2. Reputation: Known credible source vs unknown/questionable
3. Bias/Agenda: Neutral reporting vs heavily biased
4. Verification: Likely factual vs opinion/unverified claims
5. Professional Standards: Editorial oversight vs unmoderated content

Trust Score Scale:
0.9-1.0: Highly trusted (major news, academic journals, government sites)
0.7-0.89: Trusted (established media, reputable organizations)
0.5-0.69: Moderately trusted (known sources with some bias/mixed quality)
0.3-0.49: Low trust (social media posts, blogs, user-generated content)
0.0-0.29: Very low trust (unreliable sources, known misinformation)

Respond ONLY with a JSON object:
{{
    "trust_score": 0.0 to 1.0,
    "source_type": "type of source",
    "trust_reasoning": "brief explanation of trust score"
}}"#,
        url = hit.url,
        domain = domain_of(&hit.url),
        title = hit.title,
        snippet = hit.snippet,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.bbc.co.uk/news/x"), "www.bbc.co.uk");
        assert_eq!(domain_of("example.org"), "example.org");
    }

    #[test]
    fn test_relevance_prompt_embeds_hit() {
        let hit = SearchHit {
            title: "Budget vote".into(),
            url: "https://news.example/budget".into(),
            snippet: "Lawmakers voted".into(),
        };
        let prompt = relevance("Budget", "ctx", "query", &hit);
        assert!(prompt.contains("URL: https://news.example/budget"));
        assert!(prompt.contains("\"relevant\": true or false"));
    }
}

//! Free-form recommendations generated by the agent backend

use super::{RecommendError, Recommendations, Recommender};
use crate::llm::{LlmMessage, LlmRequest, LlmService, SystemContent};
use async_trait::async_trait;
use std::sync::Arc;

const RECOMMEND_PROMPT: &str = r#"You are an expert movie and TV show recommender. Given a description of what someone wants to watch, suggest titles that fit.

For each recommendation include:
- title: exact title
- year: release year ("2019", or "2019-2023" for series)
- media_type: "movie" or "tv"
- rating: estimated rating out of 10 from critical and audience reception
- genres: array of genres
- overview: one or two sentences, no spoilers
- why_watch: why it matches the request
- providers: streaming services where it is usually available; empty if unsure

Respond with ONLY a JSON object:
{"summary": "what you looked for", "recommendations": [{"title": "...", "year": "...", "media_type": "movie", "rating": 8.1, "genres": [], "overview": "...", "why_watch": "...", "providers": []}]}"#;

/// [`Recommender`] that asks the agent backend for strict JSON
pub struct LlmRecommender {
    llm: Arc<dyn LlmService>,
}

impl LlmRecommender {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Recommender for LlmRecommender {
    async fn recommend(
        &self,
        description: &str,
        count: usize,
    ) -> Result<Recommendations, RecommendError> {
        let request = LlmRequest {
            system: vec![SystemContent::new(RECOMMEND_PROMPT)],
            messages: vec![LlmMessage::user_text(format!(
                "Please recommend {count} movies or TV shows based on this request: {description}"
            ))],
            tools: vec![],
            max_tokens: Some(2048),
        };
        let response = self.llm.complete(&request).await?;
        let mut parsed = parse_recommendations(&response.text())?;
        parsed.recommendations.truncate(count);
        Ok(parsed)
    }
}

/// Parse the model's JSON, tolerating markdown code fences around it
fn parse_recommendations(text: &str) -> Result<Recommendations, RecommendError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map_or(trimmed, |rest| rest.trim_end().trim_end_matches("```"))
        .trim();
    serde_json::from_str(body).map_err(|e| RecommendError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, LlmResponse};
    use std::sync::Mutex;

    struct CannedLlm {
        reply: String,
        seen: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait]
    impl LlmService for CannedLlm {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(LlmResponse::text_only(self.reply.clone()))
        }

        fn model_id(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_parse_plain_and_fenced_json() {
        let plain = r#"{"summary": "s", "recommendations": [{"title": "Heat"}]}"#;
        assert_eq!(parse_recommendations(plain).unwrap().recommendations.len(), 1);

        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(parse_recommendations(&fenced).unwrap().summary, "s");
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            parse_recommendations("Sure! Here are some films."),
            Err(RecommendError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_recommend_limits_count_and_sends_description() {
        let llm = Arc::new(CannedLlm {
            reply: r#"{"summary": "cozy", "recommendations": [{"title": "A"}, {"title": "B"}, {"title": "C"}]}"#.into(),
            seen: Mutex::new(Vec::new()),
        });
        let recommender = LlmRecommender::new(llm.clone());
        let recs = recommender.recommend("cozy mysteries", 2).await.unwrap();
        assert_eq!(recs.recommendations.len(), 2);

        let seen = llm.seen.lock().unwrap();
        let crate::llm::ContentBlock::Text { text } = &seen[0].messages[0].content[0] else {
            panic!("expected text block");
        };
        assert!(text.contains("recommend 2"));
        assert!(text.contains("cozy mysteries"));
    }
}

//! End-to-end extraction: page or text in, canonical recipe out.
//!
//! ```text
//! from_url:          FetchController -> LLM -> json repair -> Normalizer
//! from_text:                            LLM -> json repair -> Normalizer
//! from_model_output:                           json repair -> Normalizer
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::extraction::{extract_json_traced, JsonRepairError, Normalizer};
use crate::llm::{
    render_recipe_prompt, LlmClient, LlmError, TextGenerator,
    DEFAULT_RECIPE_PROMPT,
};
use crate::models::Recipe;
use crate::scrapers::{FetchController, FetchError};
use crate::utils::truncate_to_bytes;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Repair(#[from] JsonRepairError),
    /// The extractor was built without a fetch controller.
    #[error("no fetcher configured; cannot retrieve {0}")]
    NoFetcher(String),
}

/// Runs the extraction pipeline.
pub struct RecipeExtractor {
    fetcher: Option<Arc<FetchController>>,
    generator: Arc<dyn TextGenerator>,
    normalizer: Normalizer,
    prompt_template: String,
    max_content_bytes: usize,
}

impl RecipeExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, normalizer: Normalizer) -> Self {
        Self {
            fetcher: None,
            generator,
            normalizer,
            prompt_template: DEFAULT_RECIPE_PROMPT.to_string(),
            max_content_bytes: usize::MAX,
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<FetchController>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn with_max_content_bytes(mut self, max: usize) -> Self {
        self.max_content_bytes = max;
        self
    }

    /// Extractor wired from configuration: every fetch tier, the configured
    /// model, and the configured normalizer.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = FetchController::from_config(config)?;
        let client = LlmClient::new(config.llm.clone())?;
        Ok(Self::new(Arc::new(client), Normalizer::new(config.normalize.clone()))
            .with_fetcher(Arc::new(fetcher))
            .with_prompt_template(config.llm.get_recipe_prompt())
            .with_max_content_bytes(config.llm.max_content_bytes))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Fetch a page and extract the recipe on it.
    pub async fn from_url(&self, url: &str) -> Result<Recipe, ExtractError> {
        let fetcher = self
            .fetcher
            .as_ref()
            .ok_or_else(|| ExtractError::NoFetcher(url.to_string()))?;
        let page = fetcher.fetch(url).await?;
        info!("Fetched {} ({} bytes)", url, page.len());
        self.extract(&page, Some(url)).await
    }

    /// Extract a recipe from already-acquired text (OCR output, pasted lists).
    pub async fn from_text(&self, text: &str) -> Result<Recipe, ExtractError> {
        self.extract(text, None).await
    }

    /// Repair and normalize raw model output.
    pub fn from_model_output(&self, raw: &str, source: Option<&str>) -> Result<Recipe, ExtractError> {
        Ok(recipe_from_model_output(&self.normalizer, raw, source)?)
    }

    async fn extract(&self, text: &str, source: Option<&str>) -> Result<Recipe, ExtractError> {
        let content = truncate_to_bytes(text, self.max_content_bytes);
        let prompt = render_recipe_prompt(&self.prompt_template, content, source);
        let raw = self.generator.generate(&prompt).await?;
        self.from_model_output(&raw, source)
    }
}

/// Repair and normalize raw model output without a model or fetcher.
///
/// `source` is recorded on the recipe unless the model supplied one.
pub fn recipe_from_model_output(
    normalizer: &Normalizer,
    raw: &str,
    source: Option<&str>,
) -> Result<Recipe, JsonRepairError> {
    let repaired = extract_json_traced(raw)?;
    debug!("Model output parsed at tier {}", repaired.tier);
    let mut recipe = normalizer.normalize(&repaired.value);
    if recipe.source.is_none() {
        recipe.source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        reply: Result<String, LlmError>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(reply: Result<&str, LlmError>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_from_text_repairs_and_normalizes() {
        let llm = Canned::new(Ok("Here you go:\n```json\n{\"title\": \"Latkes\", \"ingredients\": [\"4 potatoes\",],}\n```"));
        let extractor = RecipeExtractor::new(llm.clone(), Normalizer::default())
            .with_max_content_bytes(5);
        let recipe = extractor.from_text("potatoes and onions").await.unwrap();
        assert_eq!(recipe.title.as_deref(), Some("Latkes"));
        assert_eq!(recipe.ingredients[0].raw, "4 potatoes");
        assert_eq!(recipe.source, None);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Text:\npotat\n"));
    }

    #[tokio::test]
    async fn test_content_cut_at_byte_budget_on_char_boundary() {
        let llm = Canned::new(Ok(r#"{"title": "Shakshuka"}"#));
        // Each Hebrew letter is two bytes; five bytes keep two letters.
        let extractor = RecipeExtractor::new(llm.clone(), Normalizer::default())
            .with_max_content_bytes(5);
        extractor.from_text("שקשוקה").await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Text:\nשק\n"));
        assert!(!prompts[0].contains("שקש"));
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let extractor = RecipeExtractor::new(Canned::new(Err(LlmError::Disabled)), Normalizer::default());
        let err = extractor.from_text("x").await.unwrap_err();
        assert!(matches!(err, ExtractError::Llm(LlmError::Disabled)));
    }

    #[tokio::test]
    async fn test_unrepairable_output() {
        let extractor = RecipeExtractor::new(Canned::new(Ok("I could not find a recipe.")), Normalizer::default());
        let err = extractor.from_text("x").await.unwrap_err();
        assert!(matches!(err, ExtractError::Repair(_)));
    }

    #[tokio::test]
    async fn test_from_url_without_fetcher() {
        let extractor = RecipeExtractor::new(Canned::new(Ok("{}")), Normalizer::default());
        let err = extractor.from_url("https://example.com").await.unwrap_err();
        assert!(matches!(err, ExtractError::NoFetcher(_)));
    }

    #[test]
    fn test_source_injection() {
        let extractor = RecipeExtractor::new(Canned::new(Ok("{}")), Normalizer::default());
        let recipe = extractor
            .from_model_output(r#"{"title": "Soup"}"#, Some("https://example.com/soup"))
            .unwrap();
        assert_eq!(recipe.source.as_deref(), Some("https://example.com/soup"));

        let recipe = extractor
            .from_model_output(r#"{"title": "Soup", "sourceUrl": "https://a.example"}"#, Some("https://b.example"))
            .unwrap();
        assert_eq!(recipe.source.as_deref(), Some("https://a.example"));

        let recipe = extractor
            .from_model_output(r#"{"recipe": {"title": "Soup"}}"#, Some("https://example.com/soup"))
            .unwrap();
        assert_eq!(recipe.title.as_deref(), Some("Soup"));
        assert_eq!(recipe.source.as_deref(), Some("https://example.com/soup"));
    }
}

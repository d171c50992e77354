//! Text matching engine.
//!
//! Combines two signals per stored document:
//!
//! - **Lexical**: Jaccard estimate between MinHash sketches of 3-word shingles.
//! - **Semantic**: cosine similarity between sentence embeddings, when an
//!   [`Embedder`] is configured and the stored row carries an embedding.
//!
//! The strongest value of each signal across the whole store feeds an ordered
//! decision list ([`TextThresholds::cascade`]).

pub mod embedding;
pub mod extract;
pub mod minhash;
pub mod normalize;

pub use embedding::{Embedder, Embedding};
#[cfg(feature = "semantic")]
pub use embedding::FastEmbedEmbedder;
pub use extract::{extract_text, SourceFormat};
pub use minhash::{MinHashSignature, MinHasher, NUM_PERMUTATIONS};
pub use normalize::{normalize, shingles};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{OriginalityError, Result};
use crate::store::{FingerprintRecord, FingerprintStore, Medium, NewFingerprint};

/// Verdict of a text check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextClassification {
    DuplicateExact,
    SemanticDuplicate,
    NearDuplicate,
    PotentialSemanticMatch,
    Original,
    Error,
}

impl TextClassification {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DuplicateExact => "DUPLICATE (Exact)",
            Self::SemanticDuplicate => "SEMANTIC DUPLICATE (AI/Paraphrased)",
            Self::NearDuplicate => "NEAR DUPLICATE (Edited)",
            Self::PotentialSemanticMatch => "POTENTIAL SEMANTIC MATCH",
            Self::Original => "ORIGINAL",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for TextClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which maximum a cascade rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Lexical,
    Semantic,
}

/// Classification thresholds. Every comparison is strict (`>`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextThresholds {
    pub exact: f64,
    pub semantic: f64,
    pub near: f64,
    pub potential: f64,
    /// While the lexical maximum is below this, a new semantic maximum takes
    /// over the reported closest match. Only a lexical maximum above `exact`
    /// claims it back.
    pub semantic_override_below: f64,
}

impl Default for TextThresholds {
    fn default() -> Self {
        Self {
            exact: 0.95,
            semantic: 0.85,
            near: 0.60,
            potential: 0.75,
            semantic_override_below: 0.90,
        }
    }
}

impl TextThresholds {
    /// Decision list in priority order; the first rule whose signal exceeds
    /// its threshold wins.
    pub fn cascade(&self) -> [(Signal, f64, TextClassification); 4] {
        [
            (Signal::Lexical, self.exact, TextClassification::DuplicateExact),
            (Signal::Semantic, self.semantic, TextClassification::SemanticDuplicate),
            (Signal::Lexical, self.near, TextClassification::NearDuplicate),
            (Signal::Semantic, self.potential, TextClassification::PotentialSemanticMatch),
        ]
    }
}

/// Outcome of [`TextEngine::check`].
#[derive(Debug, Clone, Serialize)]
pub struct TextMatch {
    pub classification: TextClassification,
    pub closest_asset_id: Option<String>,
    /// Similarity in `[0, 1]` of the signal that decided the classification.
    pub score: f64,
    pub lexical_score: f64,
    pub semantic_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TextMatch {
    fn error(reason: impl Into<String>) -> Self {
        Self {
            classification: TextClassification::Error,
            closest_asset_id: None,
            score: 0.0,
            lexical_score: 0.0,
            semantic_score: 0.0,
            error: Some(reason.into()),
        }
    }

    pub fn label(&self) -> &'static str {
        self.classification.label()
    }

    pub fn is_duplicate(&self) -> bool {
        !matches!(
            self.classification,
            TextClassification::Original | TextClassification::Error
        )
    }
}

/// Outcome of [`TextEngine::register`].
#[derive(Debug, Clone, Serialize)]
pub struct TextRegistration {
    pub asset_id: String,
    pub has_embedding: bool,
}

/// Running maxima of a store scan.
///
/// `best_id` is only claimed by an exact-level lexical row or by a new
/// semantic maximum. `lexical_id` follows the lexical maximum and names the
/// match when nothing claimed `best_id`.
#[derive(Debug, Default)]
struct ScanState {
    lexical: f64,
    semantic: f64,
    best_id: Option<String>,
    lexical_id: Option<String>,
}

impl ScanState {
    fn closest(self) -> Option<String> {
        self.best_id.or(self.lexical_id)
    }
}

/// Query fingerprint of one document.
struct Query {
    signature: MinHashSignature,
    embedding: Option<Embedding>,
}

/// Lexical + semantic text matcher over a [`FingerprintStore`].
#[derive(Clone)]
pub struct TextEngine {
    store: Arc<dyn FingerprintStore>,
    embedder: Option<Arc<dyn Embedder>>,
    minhasher: MinHasher,
    thresholds: TextThresholds,
}

impl TextEngine {
    /// Engine without a semantic model.
    pub fn new(store: Arc<dyn FingerprintStore>) -> Self {
        Self {
            store,
            embedder: None,
            minhasher: MinHasher::default(),
            thresholds: TextThresholds::default(),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_thresholds(mut self, thresholds: TextThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &TextThresholds {
        &self.thresholds
    }

    /// Whether semantic comparison is available.
    pub fn has_semantic(&self) -> bool {
        self.embedder.is_some()
    }

    /// Register a document read from `data` in `format`.
    ///
    /// Fails when extraction fails or yields only whitespace. An embedder
    /// failure only drops the embedding.
    pub async fn register(
        &self,
        data: &[u8],
        format: SourceFormat,
        asset_id: &str,
    ) -> Result<TextRegistration> {
        let text = extract_text(data, format)?;
        if text.trim().is_empty() {
            return Err(OriginalityError::InputError("extracted text is empty".into()));
        }
        self.register_text(&text, asset_id).await
    }

    /// Register already-extracted text.
    pub async fn register_text(&self, text: &str, asset_id: &str) -> Result<TextRegistration> {
        if text.trim().is_empty() {
            return Err(OriginalityError::InputError("text is empty".into()));
        }

        let query = self.fingerprint(text);
        let embedding = query
            .embedding
            .as_ref()
            .map(Embedding::to_blob)
            .transpose()?;
        let has_embedding = embedding.is_some();

        self.store
            .put(NewFingerprint::text(asset_id, query.signature.to_blob()?, embedding))
            .await?;

        tracing::info!(%asset_id, semantic = has_embedding, "Text registered");

        Ok(TextRegistration {
            asset_id: asset_id.to_string(),
            has_embedding,
        })
    }

    /// Check a document read from `data` in `format`.
    ///
    /// Unreadable or empty documents yield an `Error` classification; only
    /// store failures are returned as `Err`.
    pub async fn check(&self, data: &[u8], format: SourceFormat) -> Result<TextMatch> {
        match extract_text(data, format) {
            Ok(text) => self.check_text(&text).await,
            Err(e) => Ok(TextMatch::error(e.to_string())),
        }
    }

    /// Check already-extracted text.
    pub async fn check_text(&self, text: &str) -> Result<TextMatch> {
        if text.trim().is_empty() {
            return Ok(TextMatch::error("empty text"));
        }

        let query = self.fingerprint(text);
        let records = self.store.scan_all(Medium::Text).await?;
        let state = records
            .iter()
            .fold(ScanState::default(), |state, record| self.scan_row(state, &query, record));

        let result = self.classify(state);
        tracing::info!(
            status = result.label(),
            score = result.score,
            lexical = result.lexical_score,
            semantic = result.semantic_score,
            closest = ?result.closest_asset_id,
            rows = records.len(),
            "Text checked"
        );
        Ok(result)
    }

    fn fingerprint(&self, text: &str) -> Query {
        let signature = self.minhasher.signature(shingles(&normalize(text)));
        let embedding = self.embedder.as_ref().and_then(|embedder| {
            embedding::embed(embedder.as_ref(), text)
                .inspect_err(|e| tracing::warn!(error = %e, "Embedding failed, continuing lexically"))
                .ok()
        });
        Query { signature, embedding }
    }

    /// Fold one stored row into the running maxima.
    ///
    /// Lexical and semantic parts are decoded independently; a corrupt part
    /// is skipped without affecting the other.
    fn scan_row(&self, mut state: ScanState, query: &Query, record: &FingerprintRecord) -> ScanState {
        match MinHashSignature::from_blob(&record.signature)
            .and_then(|stored| query.signature.jaccard(&stored))
        {
            Ok(lexical) if lexical > state.lexical => {
                state.lexical = lexical;
                state.lexical_id = Some(record.asset_id.clone());
                if lexical > self.thresholds.exact {
                    state.best_id = Some(record.asset_id.clone());
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(asset_id = %record.asset_id, error = %e, "Skipping lexical signature");
            }
        }

        if let (Some(query_embedding), Some(blob)) = (&query.embedding, &record.embedding) {
            match Embedding::from_blob(blob).and_then(|stored| query_embedding.cosine(&stored)) {
                Ok(semantic) if semantic > state.semantic => {
                    state.semantic = semantic;
                    if state.lexical < self.thresholds.semantic_override_below {
                        state.best_id = Some(record.asset_id.clone());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(asset_id = %record.asset_id, error = %e, "Skipping embedding");
                }
            }
        }

        state
    }

    fn classify(&self, state: ScanState) -> TextMatch {
        let decided = self.thresholds.cascade().into_iter().find_map(|(signal, threshold, class)| {
            let value = match signal {
                Signal::Lexical => state.lexical,
                Signal::Semantic => state.semantic,
            };
            (value > threshold).then_some((class, value))
        });

        let (lexical_score, semantic_score) = (state.lexical, state.semantic);
        let (classification, closest_asset_id, score) = match decided {
            Some((class, value)) => (class, state.closest(), value),
            None => (
                TextClassification::Original,
                None,
                lexical_score.max(semantic_score),
            ),
        };

        TextMatch {
            classification,
            closest_asset_id,
            score,
            lexical_score,
            semantic_score,
            error: None,
        }
    }
}

impl std::fmt::Debug for TextEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEngine")
            .field("semantic", &self.has_semantic())
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryFingerprintStore;

    const ESSAY: &str = "The committee reviewed the proposal in detail and agreed that the \
        new library wing should open next spring, pending final approval of the budget \
        by the city council and the completion of the accessibility survey.";

    /// Embeds by looking up a fixed vector per exact text.
    struct TableEmbedder(Vec<(&'static str, Vec<f32>)>);

    impl Embedder for TableEmbedder {
        fn encode(&self, text: &str) -> Result<Vec<f32>> {
            self.0
                .iter()
                .find(|(key, _)| *key == text)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| OriginalityError::EmbeddingError("unknown text".into()))
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn engine() -> TextEngine {
        TextEngine::new(Arc::new(MemoryFingerprintStore::new()))
    }

    fn state(lexical: f64, semantic: f64) -> ScanState {
        ScanState {
            lexical,
            semantic,
            best_id: Some("best".into()),
            lexical_id: Some("lexical".into()),
        }
    }

    #[test]
    fn test_cascade_priority() {
        let engine = engine();
        let cases = [
            (0.96, 0.99, TextClassification::DuplicateExact, 0.96),
            (0.90, 0.86, TextClassification::SemanticDuplicate, 0.86),
            (0.61, 0.80, TextClassification::NearDuplicate, 0.61),
            (0.50, 0.76, TextClassification::PotentialSemanticMatch, 0.76),
            (0.95, 0.85, TextClassification::NearDuplicate, 0.95),
        ];
        for (lexical, semantic, expected, score) in cases {
            let result = engine.classify(state(lexical, semantic));
            assert_eq!(result.classification, expected, "lexical {lexical} semantic {semantic}");
            assert_eq!(result.score, score);
            assert_eq!(result.closest_asset_id.as_deref(), Some("best"));
        }
    }

    #[test]
    fn test_original_drops_id_and_reports_max() {
        let result = engine().classify(state(0.4, 0.7));
        assert_eq!(result.classification, TextClassification::Original);
        assert_eq!(result.closest_asset_id, None);
        assert_eq!(result.score, 0.7);
    }

    #[test]
    fn test_labels() {
        assert_eq!(TextClassification::SemanticDuplicate.label(), "SEMANTIC DUPLICATE (AI/Paraphrased)");
        assert_eq!(TextClassification::NearDuplicate.to_string(), "NEAR DUPLICATE (Edited)");
    }

    #[tokio::test]
    async fn test_self_check_is_exact() {
        let engine = engine();
        engine.register_text(ESSAY, "essay-1").await.unwrap();
        let result = engine.check_text(ESSAY).await.unwrap();
        assert_eq!(result.classification, TextClassification::DuplicateExact);
        assert!(result.score > 0.95);
        assert_eq!(result.closest_asset_id.as_deref(), Some("essay-1"));
    }

    #[tokio::test]
    async fn test_punctuation_and_case_do_not_matter() {
        let engine = engine();
        engine.register_text(ESSAY, "essay-1").await.unwrap();
        let shouted = ESSAY.to_uppercase().replace(',', "");
        let result = engine.check_text(&shouted).await.unwrap();
        assert_eq!(result.classification, TextClassification::DuplicateExact);
    }

    #[tokio::test]
    async fn test_empty_store_is_original_zero() {
        let result = engine().check_text(ESSAY).await.unwrap();
        assert_eq!(result.classification, TextClassification::Original);
        assert_eq!(result.score, 0.0);
        assert!(result.closest_asset_id.is_none());
    }

    #[tokio::test]
    async fn test_empty_text() {
        let engine = engine();
        assert!(matches!(
            engine.register_text("   \n", "blank").await,
            Err(OriginalityError::InputError(_))
        ));
        let result = engine.check(b"  ", SourceFormat::Txt).await.unwrap();
        assert_eq!(result.classification, TextClassification::Error);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_short_document_matches_itself() {
        let engine = engine();
        engine.register_text("Hello there", "short").await.unwrap();
        let result = engine.check_text("hello there!").await.unwrap();
        assert_eq!(result.classification, TextClassification::DuplicateExact);
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_skipped() {
        let store = Arc::new(MemoryFingerprintStore::new());
        store
            .put(NewFingerprint::text("junk", vec![0xFF, 0xFE], Some(vec![0x00])))
            .await
            .unwrap();
        let engine = TextEngine::new(store);
        engine.register_text(ESSAY, "essay-1").await.unwrap();
        let result = engine.check_text(ESSAY).await.unwrap();
        assert_eq!(result.closest_asset_id.as_deref(), Some("essay-1"));
    }

    #[tokio::test]
    async fn test_semantic_override_switches_candidate() {
        let lexical_twin = "alpha beta gamma delta epsilon zeta eta theta";
        let paraphrase = "completely different words expressing the same idea here";
        let query = "alpha beta gamma delta epsilon zeta iota kappa";
        let embedder = Arc::new(TableEmbedder(vec![
            (lexical_twin, vec![1.0, 0.0]),
            (paraphrase, vec![0.8, 0.6]),
            (query, vec![0.8, 0.6]),
        ]));
        let engine = engine().with_embedder(embedder);

        engine.register_text(lexical_twin, "lexical").await.unwrap();
        engine.register_text(paraphrase, "semantic").await.unwrap();

        let result = engine.check_text(query).await.unwrap();
        // The lexical leader is below the override bound, so the later
        // semantic maximum takes the candidate.
        assert!(result.lexical_score < 0.9);
        assert_eq!(result.closest_asset_id.as_deref(), Some("semantic"));
        assert_eq!(result.classification, TextClassification::SemanticDuplicate);
    }

    #[tokio::test]
    async fn test_weak_lexical_overlap_does_not_steal_semantic_candidate() {
        let paraphrase = "a completely different wording of one shared idea";
        let weak = "alpha beta gamma delta unrelated filler words appear here today";
        let query = "alpha beta gamma delta and then something else entirely new";
        let embedder = Arc::new(TableEmbedder(vec![
            (paraphrase, vec![1.0, 0.0]),
            (weak, vec![0.0, 1.0]),
            (query, vec![1.0, 0.0]),
        ]));
        let engine = engine().with_embedder(embedder);

        engine.register_text(paraphrase, "paraphrase").await.unwrap();
        engine.register_text(weak, "weak").await.unwrap();

        let result = engine.check_text(query).await.unwrap();
        assert!(result.lexical_score > 0.0 && result.lexical_score < 0.6);
        assert_eq!(result.classification, TextClassification::SemanticDuplicate);
        assert_eq!(result.closest_asset_id.as_deref(), Some("paraphrase"));
    }

    #[test]
    fn test_lexical_leader_names_match_without_candidate() {
        let result = engine().classify(ScanState {
            lexical: 0.7,
            semantic: 0.0,
            best_id: None,
            lexical_id: Some("edited".into()),
        });
        assert_eq!(result.classification, TextClassification::NearDuplicate);
        assert_eq!(result.closest_asset_id.as_deref(), Some("edited"));
    }

    #[tokio::test]
    async fn test_wrong_dimension_embedding_is_dropped() {
        let embedder = Arc::new(TableEmbedder(vec![(ESSAY, vec![0.1, 0.2, 0.3])]));
        let engine = engine().with_embedder(embedder);

        let registration = engine.register_text(ESSAY, "essay-1").await.unwrap();
        assert!(!registration.has_embedding);
        let result = engine.check_text(ESSAY).await.unwrap();
        assert_eq!(result.classification, TextClassification::DuplicateExact);
        assert_eq!(result.semantic_score, 0.0);
    }

    #[tokio::test]
    async fn test_embedder_failure_registers_lexically() {
        let engine = engine().with_embedder(Arc::new(TableEmbedder(Vec::new())));
        let registration = engine.register_text(ESSAY, "essay-1").await.unwrap();
        assert!(!registration.has_embedding);
        let result = engine.check_text(ESSAY).await.unwrap();
        assert_eq!(result.classification, TextClassification::DuplicateExact);
        assert_eq!(result.semantic_score, 0.0);
    }
}

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Coarse three-way label derived from thresholding the raw sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    DissatisfiedHighRisk,
    Satisfied,
    Neutral,
}

impl Classification {
    fn from_raw(raw: f64) -> Self {
        if raw < TH.dissatisfied_below {
            Classification::DissatisfiedHighRisk
        } else if raw > TH.satisfied_above {
            Classification::Satisfied
        } else {
            Classification::Neutral
        }
    }

    /// Display string shown to agents (Portuguese, fixed locale).
    pub fn label(&self) -> &'static str {
        match self {
            Classification::DissatisfiedHighRisk => {
                "Cliente insatisfeito com alto risco de atrito"
            }
            Classification::Satisfied => "Cliente satisfeito",
            Classification::Neutral => "Neutro",
        }
    }
}

/// Label for a stored per-category mean, using the same thresholds as
/// message classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Negative,
    Positive,
    Neutral,
}

impl SentimentLabel {
    fn from_mean(mean: f64) -> Self {
        if mean < TH.dissatisfied_below {
            SentimentLabel::Negative
        } else if mean > TH.satisfied_above {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "Negativo",
            SentimentLabel::Positive => "Positivo",
            SentimentLabel::Neutral => "Neutro",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub classification: Classification,
    pub churn_score: u8,
    pub category: String,
    pub response: String,
    pub justification: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub count: u64,
    pub sentiment_label: SentimentLabel,
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The scorer produced NaN or an infinity. Churn score and
    /// classification are undefined for such inputs, so the message is
    /// rejected without touching the insight state.
    #[error("sentiment scorer returned a non-finite score: {0}")]
    NonFiniteScore(f64),
}

// ---------------------------------------------------------------------------
// Thresholds and fixed response templates
// ---------------------------------------------------------------------------

struct Thresholds {
    dissatisfied_below: f64,
    satisfied_above: f64,
    churn_scale: f64,
}

static TH: Thresholds = Thresholds {
    dissatisfied_below: -0.3,
    satisfied_above: 0.3,
    churn_scale: 100.0,
};

const OTHER_CATEGORY: &str = "Outros";

const BASE_NOTE: &str = "Análise baseada no tom geral da mensagem.";
const NEGATIVE_NOTE_PREFIX: &str = "Palavras-chave negativas detectadas: ";
const POSITIVE_NOTE_PREFIX: &str = "Palavras-chave positivas detectadas: ";

const RESPONSE_APOLOGY: &str = "Olá, sentimos muito pela experiência relatada. \
    Já estamos atuando para resolver seu problema o mais rápido possível. \
    Você se importa de nos dar mais detalhes para que possamos garantir que \
    isso não se repita?";
const RESPONSE_THANKS: &str = "Olá, ficamos felizes em saber que você está \
    satisfeito! Estamos à disposição para qualquer necessidade.";
const RESPONSE_GENERIC: &str = "Olá, agradecemos pelo seu contato.";

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

/// Keyword configuration for one topic category. Categories live in a Vec,
/// not a map: declaration order is the first-match tie-break contract.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryKeywords {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Static keyword configuration: sentiment justification lists plus the
/// ordered topic-category table. Loadable from JSON so the lexicon/language
/// choice stays a configuration input rather than a hardcoded constant.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTables {
    pub negative: Vec<String>,
    pub positive: Vec<String>,
    pub categories: Vec<CategoryKeywords>,
}

static PORTUGUESE_TABLES: Lazy<KeywordTables> = Lazy::new(|| {
    let negative = [
        "cancelar",
        "reclamar",
        "problema",
        "erro",
        "frustração",
        "atraso",
        "não funciona",
    ];
    let positive = ["satisfeito", "ótimo", "excelente", "resolveu", "rápido"];
    let categories: [(&str, &[&str]); 3] = [
        (
            "erro tributário",
            &["imposto", "declaração", "tributário", "irpf"],
        ),
        ("dificuldade no app", &["app", "aplicativo", "travou", "lento"]),
        ("prazo de restituição", &["restituição", "prazo", "demora"]),
    ];

    KeywordTables {
        negative: negative.iter().map(|w| w.to_string()).collect(),
        positive: positive.iter().map(|w| w.to_string()).collect(),
        categories: categories
            .iter()
            .map(|(name, words)| CategoryKeywords {
                name: name.to_string(),
                keywords: words.iter().map(|w| w.to_string()).collect(),
            })
            .collect(),
    }
});

impl KeywordTables {
    /// Built-in tables for Brazilian Portuguese tax-support messages.
    pub fn portuguese() -> KeywordTables {
        PORTUGUESE_TABLES.clone()
    }
}

// ---------------------------------------------------------------------------
// Sentiment scorer
// ---------------------------------------------------------------------------

/// Black-box sentiment scorer over lowercase word tokens.
///
/// The only contract is direction: more negative output means more negative
/// sentiment. Output is nominally near [-1, 1]; the analyzer clamps after
/// its affine transform, so scorers are free to exceed that range.
pub trait SentimentScorer {
    fn score(&self, tokens: &[&str]) -> f64;
}

// Valences are pre-scaled to [-1, 1] so the per-token mean stays bounded.
static VALENCES_PT: &[(&str, f64)] = &[
    // Dissatisfaction
    ("cancelar", -0.7),
    ("cancelamento", -0.7),
    ("reclamar", -0.7),
    ("reclamação", -0.7),
    ("problema", -0.6),
    ("erro", -0.7),
    ("falha", -0.7),
    ("frustração", -0.9),
    ("frustrado", -0.8),
    ("frustrada", -0.8),
    ("atraso", -0.6),
    ("atrasado", -0.6),
    ("demora", -0.5),
    ("demorado", -0.6),
    ("travou", -0.8),
    ("travando", -0.8),
    ("lento", -0.5),
    ("ruim", -0.7),
    ("péssimo", -1.0),
    ("péssima", -1.0),
    ("horrível", -1.0),
    ("terrível", -1.0),
    ("absurdo", -0.8),
    ("insatisfeito", -0.8),
    ("insatisfeita", -0.8),
    ("decepcionado", -0.8),
    ("decepcionada", -0.8),
    ("decepção", -0.8),
    ("raiva", -0.9),
    ("quebrado", -0.7),
    ("difícil", -0.4),
    ("confuso", -0.4),
    ("perdi", -0.6),
    ("indevida", -0.7),
    ("indevido", -0.7),
    // Satisfaction
    ("satisfeito", 0.8),
    ("satisfeita", 0.8),
    ("ótimo", 0.9),
    ("ótima", 0.9),
    ("excelente", 1.0),
    ("resolveu", 0.7),
    ("resolvido", 0.7),
    ("rápido", 0.6),
    ("rápida", 0.6),
    ("bom", 0.6),
    ("boa", 0.6),
    ("obrigado", 0.5),
    ("obrigada", 0.5),
    ("agradeço", 0.5),
    ("parabéns", 0.8),
    ("perfeito", 1.0),
    ("perfeita", 1.0),
    ("maravilhoso", 1.0),
    ("maravilhosa", 1.0),
    ("adorei", 0.9),
    ("gostei", 0.7),
    ("ajudou", 0.6),
    ("funcionou", 0.6),
    ("fácil", 0.5),
    ("prático", 0.5),
    ("eficiente", 0.7),
    ("feliz", 0.8),
    ("incrível", 0.9),
    ("sensacional", 0.9),
    ("melhorou", 0.6),
];

/// Default scorer: mean valence over all tokens. Tokens outside the lexicon
/// contribute zero, so long messages dilute toward neutral.
pub struct LexiconScorer {
    valences: HashMap<&'static str, f64>,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            valences: VALENCES_PT.iter().copied().collect(),
        }
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, tokens: &[&str]) -> f64 {
        if tokens.is_empty() {
            return 0.0;
        }
        let sum: f64 = tokens
            .iter()
            .map(|t| self.valences.get(*t).copied().unwrap_or(0.0))
            .sum();
        sum / tokens.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Insight state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CategoryInsight {
    name: String,
    count: u64,
    sentiment: f64,
}

/// Running per-category message count and mean raw sentiment. Owned by an
/// `Analyzer`; the category key set is fixed at construction.
#[derive(Debug, Clone)]
pub struct InsightState {
    entries: Vec<CategoryInsight>,
}

impl InsightState {
    fn new(tables: &KeywordTables) -> Self {
        Self {
            entries: tables
                .categories
                .iter()
                .map(|c| CategoryInsight {
                    name: c.name.clone(),
                    count: 0,
                    sentiment: 0.0,
                })
                .collect(),
        }
    }

    // Incremental mean: multiply back by the pre-increment count, then
    // divide by the post-increment count.
    fn record(&mut self, category: &str, raw: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == category) {
            let old_count = entry.count;
            entry.count += 1;
            entry.sentiment =
                (entry.sentiment * old_count as f64 + raw) / entry.count as f64;
        }
    }

    /// Categories that have received at least one message, in table order.
    pub fn summarize(&self) -> Vec<CategorySummary> {
        self.entries
            .iter()
            .filter(|e| e.count > 0)
            .map(|e| CategorySummary {
                category: e.name.clone(),
                count: e.count,
                sentiment_label: SentimentLabel::from_mean(e.sentiment),
            })
            .collect()
    }

    /// Raw (count, mean sentiment) for one category, if it exists.
    pub fn category_stats(&self, category: &str) -> Option<(u64, f64)> {
        self.entries
            .iter()
            .find(|e| e.name == category)
            .map(|e| (e.count, e.sentiment))
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

fn tokenize(message: &str) -> Vec<String> {
    message
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

fn matching_keywords<'a>(tokens: &[&'a str], keywords: &[String]) -> Vec<&'a str> {
    tokens
        .iter()
        .filter(|t| keywords.iter().any(|k| k == **t))
        .copied()
        .collect()
}

/// Message analyzer: tokenizes, scores, classifies, categorizes, picks a
/// canned reply, and keeps the per-category running sentiment mean.
pub struct Analyzer<S = LexiconScorer> {
    scorer: S,
    tables: KeywordTables,
    insights: InsightState,
}

impl Analyzer<LexiconScorer> {
    /// Analyzer with the built-in Portuguese lexicon and keyword tables.
    pub fn new() -> Self {
        Self::with_scorer(LexiconScorer::new(), KeywordTables::portuguese())
    }
}

impl Default for Analyzer<LexiconScorer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SentimentScorer> Analyzer<S> {
    pub fn with_scorer(scorer: S, tables: KeywordTables) -> Self {
        let insights = InsightState::new(&tables);
        Self {
            scorer,
            tables,
            insights,
        }
    }

    /// Analyze one message. Returns `Ok(None)` for empty or whitespace-only
    /// input (nothing to display, no state change). A category match is the
    /// only path that mutates the insight state, once per message.
    pub fn analyze(&mut self, message: &str) -> Result<Option<AnalysisResult>, AnalyzeError> {
        if message.trim().is_empty() {
            return Ok(None);
        }

        let owned_tokens = tokenize(message);
        let tokens: Vec<&str> = owned_tokens.iter().map(|t| t.as_str()).collect();

        let raw = self.scorer.score(&tokens);
        if !raw.is_finite() {
            return Err(AnalyzeError::NonFiniteScore(raw));
        }

        let normalized = ((raw + 1.0) / 2.0).clamp(0.0, 1.0);
        let churn_score = ((1.0 - normalized) * TH.churn_scale).round() as u8;
        let classification = Classification::from_raw(raw);

        let mut justification = vec![BASE_NOTE.to_string()];
        match classification {
            Classification::DissatisfiedHighRisk => {
                let hits = matching_keywords(&tokens, &self.tables.negative);
                if !hits.is_empty() {
                    justification
                        .push(format!("{NEGATIVE_NOTE_PREFIX}{}", hits.join(", ")));
                }
            }
            Classification::Satisfied => {
                let hits = matching_keywords(&tokens, &self.tables.positive);
                if !hits.is_empty() {
                    justification
                        .push(format!("{POSITIVE_NOTE_PREFIX}{}", hits.join(", ")));
                }
            }
            Classification::Neutral => {}
        }

        // First category in table order whose keyword set intersects the
        // tokens wins; scanning stops there.
        let mut category = OTHER_CATEGORY.to_string();
        for cat in &self.tables.categories {
            if tokens.iter().any(|t| cat.keywords.iter().any(|k| k == t)) {
                category = cat.name.clone();
                justification.push(format!("Categoria identificada: {}", cat.name));
                self.insights.record(&cat.name, raw);
                break;
            }
        }

        let response = match classification {
            Classification::DissatisfiedHighRisk => RESPONSE_APOLOGY,
            Classification::Satisfied => RESPONSE_THANKS,
            Classification::Neutral => RESPONSE_GENERIC,
        }
        .to_string();

        Ok(Some(AnalysisResult {
            classification,
            churn_score,
            category,
            response,
            justification: justification.join(" "),
        }))
    }

    /// Read-only projection over the insight state.
    pub fn summarize(&self) -> Vec<CategorySummary> {
        self.insights.summarize()
    }

    pub fn insights(&self) -> &InsightState {
        &self.insights
    }
}

//! # Configuração do motor
//!
//! Parâmetros da extração de palavras-chave e do TextRank. Tudo tem valor
//! padrão; o servidor web pode carregar um JSON parcial por cima dos padrões.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use fenci_core::config::EngineConfig;
//!
//! let config = EngineConfig::default()
//!     .with_min_keyword_length(3)
//!     .with_window(4);
//! assert_eq!(config.keywords.min_keyword_length, 3);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// Stop words em inglês usadas por padrão.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "of", "is", "and", "to", "in", "that", "we", "for", "an", "are", "by", "be", "as", "on",
    "with", "can", "if", "from", "which", "you", "it", "this", "then", "at", "have", "all", "not",
    "one", "has", "or",
];

/// Filtros aplicados aos candidatos a palavra-chave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Comparadas sem diferenciar maiúsculas; guardadas em minúsculas.
    #[serde(deserialize_with = "lowercase_set")]
    pub stop_words: BTreeSet<String>,
    /// Tags descartadas antes da pontuação (ex: `"x"`, pontuação).
    pub excluded_tags: BTreeSet<String>,
    /// Tamanho mínimo do termo, em caracteres.
    pub min_keyword_length: usize,
    /// Segmentação com HMM durante a extração.
    pub use_hmm: bool,
}

fn lowercase_set<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let words = Vec::<String>::deserialize(deserializer)?;
    Ok(words.into_iter().map(|w| w.to_lowercase()).collect())
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            excluded_tags: ["x".to_string()].into_iter().collect(),
            min_keyword_length: 2,
            use_hmm: false,
        }
    }
}

/// Parâmetros do ranqueamento iterativo do TextRank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRankConfig {
    /// Janela de coocorrência, em segmentos.
    pub window: usize,
    /// Fator de amortecimento `d`.
    pub damping: f64,
    /// Para quando a maior variação de score fica abaixo deste valor.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for TextRankConfig {
    fn default() -> Self {
        Self {
            window: 5,
            damping: 0.85,
            tolerance: 1e-4,
            max_iterations: 10,
        }
    }
}

/// Configuração completa do [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub keywords: KeywordConfig,
    pub textrank: TextRankConfig,
}

impl EngineConfig {
    /// Lê uma configuração JSON; campos omitidos ficam com o padrão.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.stop_words = words.into_iter().map(|w| w.into().to_lowercase()).collect();
        self
    }

    pub fn with_excluded_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.excluded_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_keyword_length(mut self, len: usize) -> Self {
        self.keywords.min_keyword_length = len;
        self
    }

    pub fn with_keyword_hmm(mut self, enabled: bool) -> Self {
        self.keywords.use_hmm = enabled;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.textrank.window = window;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.textrank.damping = damping;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.textrank.max_iterations = max_iterations;
        self
    }
}

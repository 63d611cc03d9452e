//! # Extração de Palavras-Chave
//!
//! Dois algoritmos com o mesmo contrato `(segmentos, top_k, tags permitidas)
//! → termos ranqueados`, escolhidos por [`KeywordMethod`]:
//!
//! - [`tfidf`]: frequência no texto × IDF de uma tabela pré-computada.
//! - [`textrank`]: grafo de coocorrência + pontuação iterativa estilo PageRank.
//!
//! Ambos recebem a segmentação etiquetada do texto e descartam, antes de
//! pontuar, os candidatos reprovados por [`CandidateFilter`]:
//!
//! ```text
//! tag fora das permitidas? → tag excluída? → curto demais? → stop word? → descarta
//! ```
//!
//! Empates de score mantêm a ordem da primeira ocorrência.

pub mod textrank;
pub mod tfidf;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::{KeywordConfig, TextRankConfig};
use crate::segmenter::Segment;

pub use tfidf::IdfTable;

/// Termo ranqueado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub weight: f64,
}

/// Algoritmo de ranqueamento.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMethod {
    #[default]
    TfIdf,
    TextRank,
}

/// Recursos compartilhados pelos dois algoritmos durante uma extração.
#[derive(Debug, Clone, Copy)]
pub struct RankContext<'a> {
    pub keywords: &'a KeywordConfig,
    pub textrank: &'a TextRankConfig,
    pub idf: &'a IdfTable,
}

impl KeywordMethod {
    /// Ranqueia `segments` (já etiquetados) e devolve até `top_k` termos.
    pub fn rank(self, segments: &[Segment], top_k: usize, allowed_tags: &[String], ctx: &RankContext<'_>) -> Vec<Keyword> {
        let filter = CandidateFilter::new(ctx.keywords, allowed_tags);
        match self {
            KeywordMethod::TfIdf => tfidf::rank(segments, top_k, &filter, ctx.idf),
            KeywordMethod::TextRank => textrank::rank(segments, top_k, &filter, ctx.textrank),
        }
    }
}

/// Decide quais segmentos podem virar palavra-chave.
#[derive(Debug)]
pub struct CandidateFilter<'a> {
    config: &'a KeywordConfig,
    allowed: HashSet<&'a str>,
}

impl<'a> CandidateFilter<'a> {
    pub fn new(config: &'a KeywordConfig, allowed_tags: &'a [String]) -> Self {
        Self {
            config,
            allowed: allowed_tags.iter().map(String::as_str).collect(),
        }
    }

    pub fn accepts(&self, segment: &Segment) -> bool {
        let tag = segment.tag.as_deref().unwrap_or("");
        if !self.allowed.is_empty() && !self.allowed.contains(tag) {
            return false;
        }
        if self.config.excluded_tags.contains(tag) {
            return false;
        }
        let term = segment.text.trim();
        if term.chars().count() < self.config.min_keyword_length {
            return false;
        }
        !self.config.stop_words.contains(&term.to_lowercase())
    }
}

/// Ordena por peso decrescente (estável) e corta em `top_k`.
pub(crate) fn top_k(mut keywords: Vec<Keyword>, top_k: usize) -> Vec<Keyword> {
    keywords.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    keywords.truncate(top_k);
    keywords
}

#[cfg(test)]
pub(crate) fn tagged(pairs: &[(&str, &str)]) -> Vec<Segment> {
    let mut start = 0;
    pairs
        .iter()
        .map(|(text, tag)| {
            let len = text.chars().count();
            let segment = Segment {
                text: text.to_string(),
                start,
                end: start + len,
                tag: Some(tag.to_string()),
                known: true,
            };
            start += len;
            segment
        })
        .collect()
}

//! # TF-IDF
//!
//! ```text
//! score(t) = (ocorrências de t / total de candidatos) × idf(t)
//! ```
//!
//! Termos ausentes da tabela usam o IDF de um termo visto em um único
//! documento, `ln(N / 1)`, que é o maior valor da tabela.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, info};

use super::{top_k, CandidateFilter, Keyword};
use crate::error::Result;
use crate::segmenter::Segment;

static IDF_DATA: &str = include_str!("../../data/idf.txt");

static BASE_IDF: Lazy<Arc<IdfTable>> = Lazy::new(|| {
    let table = IdfTable::parse(IDF_DATA);
    info!(termos = table.len(), fallback = table.fallback(), "Tabela IDF carregada");
    Arc::new(table)
});

/// Tabela termo → IDF.
///
/// Igual ao léxico, a tabela embutida é compartilhada e cargas extras vão
/// para um overlay.
#[derive(Debug, Clone)]
pub struct IdfTable {
    base: Arc<HashMap<String, f64>>,
    overlay: HashMap<String, f64>,
    fallback: f64,
}

impl IdfTable {
    /// Tabela embutida.
    pub fn embedded() -> Arc<IdfTable> {
        Arc::clone(&BASE_IDF)
    }

    /// Lê linhas `termo idf`; linhas malformadas são ignoradas.
    pub fn parse(text: &str) -> Self {
        let (values, _) = parse_lines(text);
        let fallback = values.values().copied().fold(0.0, f64::max);
        Self {
            base: Arc::new(values),
            overlay: HashMap::new(),
            fallback,
        }
    }

    pub fn idf(&self, term: &str) -> f64 {
        self.overlay
            .get(term)
            .or_else(|| self.base.get(term))
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.overlay.contains_key(term) || self.base.contains_key(term)
    }

    /// IDF usado para termos desconhecidos.
    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.base.len() + self.overlay.keys().filter(|k| !self.base.contains_key(*k)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nova tabela com as linhas de `bytes` aplicadas por cima desta.
    ///
    /// Devolve a tabela e o número de linhas aplicadas.
    pub fn merged(&self, bytes: &[u8]) -> Result<(IdfTable, usize)> {
        let text = std::str::from_utf8(bytes)?;
        let (values, skipped) = parse_lines(text);
        let applied = values.len();
        let mut next = self.clone();
        for (term, idf) in values {
            next.fallback = next.fallback.max(idf);
            next.overlay.insert(term, idf);
        }
        debug!(aplicadas = applied, ignoradas = skipped, "Tabela IDF mesclada");
        Ok((next, applied))
    }
}

impl Default for IdfTable {
    fn default() -> Self {
        Self {
            base: Arc::new(HashMap::new()),
            overlay: HashMap::new(),
            fallback: 0.0,
        }
    }
}

fn parse_lines(text: &str) -> (HashMap<String, f64>, usize) {
    let mut values = HashMap::new();
    let mut skipped = 0;
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next().map(str::parse::<f64>)) {
            (None, _) => {}
            (Some(term), Some(Ok(idf))) if idf.is_finite() => {
                values.insert(term.to_string(), idf);
            }
            _ => skipped += 1,
        }
    }
    (values, skipped)
}

/// Ranqueia os candidatos por TF-IDF.
pub fn rank(segments: &[Segment], k: usize, filter: &CandidateFilter<'_>, idf: &IdfTable) -> Vec<Keyword> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for segment in segments.iter().filter(|s| filter.accepts(s)) {
        let count = counts.entry(segment.text.as_str()).or_insert_with(|| {
            order.push(segment.text.as_str());
            0
        });
        *count += 1;
    }

    let total: usize = counts.values().sum();
    if total == 0 {
        return vec![];
    }

    let scored = order
        .into_iter()
        .map(|term| Keyword {
            term: term.to_string(),
            weight: counts[term] as f64 / total as f64 * idf.idf(term),
        })
        .collect();
    top_k(scored, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordConfig;
    use crate::keywords::tagged;

    fn table() -> IdfTable {
        IdfTable::parse("北京 2.0\n天气 1.0\n坏行\n烤鸭 abc\n")
    }

    #[test]
    fn test_parse_and_fallback() {
        let idf = table();
        assert_eq!(idf.len(), 2);
        assert_eq!(idf.idf("北京"), 2.0);
        assert_eq!(idf.idf("火星"), 2.0);
        assert!(!idf.contains("烤鸭"));
    }

    #[test]
    fn test_merged_overlay() {
        let idf = table();
        let (merged, applied) = idf.merged("烤鸭 5.5\n天气 0.5\n".as_bytes()).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(merged.idf("烤鸭"), 5.5);
        assert_eq!(merged.idf("天气"), 0.5);
        assert_eq!(merged.fallback(), 5.5);
        assert_eq!(merged.len(), 3);
        assert_eq!(idf.idf("天气"), 1.0);
    }

    #[test]
    fn test_merged_rejects_invalid_utf8() {
        assert!(table().merged(&[0xff, 0x00]).is_err());
    }

    #[test]
    fn test_rank() {
        let config = KeywordConfig::default();
        let allowed = vec![];
        let filter = CandidateFilter::new(&config, &allowed);
        let segments = tagged(&[("北京", "ns"), ("天气", "n"), ("北京", "ns"), ("，", "x"), ("火星", "n")]);
        let ranked = rank(&segments, 10, &filter, &table());
        let terms: Vec<&str> = ranked.iter().map(|k| k.term.as_str()).collect();
        assert_eq!(terms, vec!["北京", "火星", "天气"]);
        assert!((ranked[0].weight - 0.5 * 2.0).abs() < 1e-12);
        assert!((ranked[2].weight - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rank_no_candidates() {
        let config = KeywordConfig::default();
        let allowed = vec![];
        let filter = CandidateFilter::new(&config, &allowed);
        assert!(rank(&tagged(&[("，", "x")]), 5, &filter, &table()).is_empty());
    }
}

//! # TextRank
//!
//! ## Algoritmo
//!
//! ```text
//! 1. Grafo: cada par de candidatos distintos a menos de `window` posições um
//!    do outro na sequência de segmentos soma 1 ao peso da aresta (não dirigida).
//!
//! 2. Iteração (todos começam com score 1, atualização síncrona):
//!    score(v) = (1 - d) + d × Σ_{u ~ v} [ w(u,v) / Σ_{x ~ u} w(u,x) ] × score(u)
//!
//! 3. Para quando a maior variação < tolerância ou após `max_iterations`.
//! ```
//!
//! A janela conta posições na sequência completa, inclusive segmentos
//! descartados pelo filtro; só os dois extremos do par precisam passar.

use std::collections::{BTreeMap, HashMap};

use super::{top_k, CandidateFilter, Keyword};
use crate::config::TextRankConfig;
use crate::segmenter::Segment;

/// Grafo de coocorrência entre termos, indexados pela primeira ocorrência.
#[derive(Debug, Default)]
struct CooccurrenceGraph<'s> {
    terms: Vec<&'s str>,
    /// Vizinhos e pesos por nó; `BTreeMap` mantém a soma em ordem fixa.
    edges: Vec<BTreeMap<usize, f64>>,
}

impl<'s> CooccurrenceGraph<'s> {
    fn build(segments: &'s [Segment], filter: &CandidateFilter<'_>, window: usize) -> Self {
        let mut graph = CooccurrenceGraph::default();
        let mut index: HashMap<&str, usize> = HashMap::new();

        let nodes: Vec<Option<usize>> = segments
            .iter()
            .map(|s| {
                if !filter.accepts(s) {
                    return None;
                }
                let id = *index.entry(s.text.as_str()).or_insert_with(|| {
                    graph.terms.push(s.text.as_str());
                    graph.edges.push(BTreeMap::new());
                    graph.terms.len() - 1
                });
                Some(id)
            })
            .collect();

        for (i, a) in nodes.iter().enumerate() {
            let Some(a) = *a else { continue };
            for b in nodes.iter().take(i + window).skip(i + 1).flatten().copied() {
                if a == b {
                    continue;
                }
                *graph.edges[a].entry(b).or_insert(0.0) += 1.0;
                *graph.edges[b].entry(a).or_insert(0.0) += 1.0;
            }
        }
        graph
    }

    fn rank(&self, config: &TextRankConfig) -> Vec<f64> {
        let n = self.terms.len();
        let d = config.damping;
        let out_weight: Vec<f64> = self.edges.iter().map(|e| e.values().sum()).collect();
        let mut scores = vec![1.0; n];

        for _ in 0..config.max_iterations {
            let next: Vec<f64> = (0..n)
                .map(|v| {
                    let inflow: f64 = self.edges[v]
                        .iter()
                        .map(|(&u, &w)| w / out_weight[u] * scores[u])
                        .sum();
                    (1.0 - d) + d * inflow
                })
                .collect();
            let delta = next
                .iter()
                .zip(&scores)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            scores = next;
            if delta < config.tolerance {
                break;
            }
        }
        scores
    }
}

/// Ranqueia os candidatos por TextRank.
pub fn rank(segments: &[Segment], k: usize, filter: &CandidateFilter<'_>, config: &TextRankConfig) -> Vec<Keyword> {
    let graph = CooccurrenceGraph::build(segments, filter, config.window);
    let scores = graph.rank(config);
    let keywords = graph
        .terms
        .iter()
        .zip(scores)
        .map(|(term, weight)| Keyword {
            term: term.to_string(),
            weight,
        })
        .collect();
    top_k(keywords, k)
}

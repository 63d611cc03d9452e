//! # DAG de Segmentação — Grafo de Candidatos e Caminho Ótimo
//!
//! Para uma frase de `n` caracteres, o DAG liga cada posição `i` a todas as
//! posições `j > i` tais que `frase[i..j)` é uma palavra do léxico. Se nenhuma
//! palavra começa em `i`, a aresta `i → i+1` (o próprio caractere) é incluída
//! como fallback.
//!
//! ## Algoritmo
//!
//! ```text
//! Construção:  para cada i, estende j enquanto frase[i..j) for palavra ou prefixo
//!
//! Programação dinâmica (de trás para frente):
//!   best[n] = 0
//!   best[i] = max_{i→j} [ ln(freq(frase[i..j)) ou 1) - ln(total) + best[j] ]
//!
//! Reconstrução: segue route[i] = j vencedor, da esquerda para a direita
//! ```
//!
//! Em empate de score vence o maior `j` (menos segmentos, mais longos).
//!
//! ## Exemplo
//!
//! ```text
//! "北京大学"  arestas: 0→{2,4}  1→{2}  2→{4}  3→{4}
//! ```

use crate::lexicon::LexiconSnapshot;

/// Grafo de candidatos sobre uma frase. Índices são de caractere.
#[derive(Debug, Clone)]
pub struct Dag<'s> {
    sentence: &'s str,
    /// Offset em bytes de cada caractere, mais `sentence.len()` ao final.
    bounds: Vec<usize>,
    /// Fins de aresta por posição inicial, em ordem crescente.
    edges: Vec<Vec<usize>>,
}

impl<'s> Dag<'s> {
    pub fn build(snapshot: &LexiconSnapshot, sentence: &'s str) -> Self {
        let mut bounds: Vec<usize> = sentence.char_indices().map(|(b, _)| b).collect();
        bounds.push(sentence.len());
        let n = bounds.len() - 1;

        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let mut ends = Vec::new();
            for j in (i + 1)..=n {
                let fragment = &sentence[bounds[i]..bounds[j]];
                if !snapshot.is_word_or_prefix(fragment) {
                    break;
                }
                if snapshot.contains(fragment) {
                    ends.push(j);
                }
            }
            if ends.is_empty() {
                ends.push(i + 1);
            }
            edges.push(ends);
        }

        Self {
            sentence,
            bounds,
            edges,
        }
    }

    /// Número de caracteres.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self, start: usize) -> &[usize] {
        &self.edges[start]
    }

    pub fn fragment(&self, start: usize, end: usize) -> &'s str {
        &self.sentence[self.bounds[start]..self.bounds[end]]
    }

    pub fn byte_offset(&self, index: usize) -> usize {
        self.bounds[index]
    }

    /// Melhor fim de segmento para cada posição (`route[i] = j`).
    pub fn best_route(&self, snapshot: &LexiconSnapshot) -> Vec<usize> {
        let n = self.len();
        let log_total = (snapshot.total_frequency().max(1) as f64).ln();
        let mut best = vec![0.0f64; n + 1];
        let mut route = vec![0usize; n];

        for i in (0..n).rev() {
            let mut best_score = f64::NEG_INFINITY;
            let mut best_end = i + 1;
            for &j in &self.edges[i] {
                let freq = snapshot.frequency(self.fragment(i, j)).unwrap_or(1);
                let score = (freq as f64).ln() - log_total + best[j];
                if score >= best_score {
                    best_score = score;
                    best_end = j;
                }
            }
            best[i] = best_score;
            route[i] = best_end;
        }
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    fn lexicon() -> Lexicon {
        Lexicon::from_text("北京 100 ns\n大学 80 n\n北京大学 30 nt\n北 5\n京 5\n大 5\n学 5\n")
    }

    #[test]
    fn test_edges() {
        let lexicon = lexicon();
        let snap = lexicon.snapshot();
        let dag = Dag::build(&snap, "北京大学");
        assert_eq!(dag.len(), 4);
        assert_eq!(dag.edges(0), &[1, 2, 4]);
        assert_eq!(dag.edges(1), &[2]);
        assert_eq!(dag.edges(2), &[3, 4]);
        assert_eq!(dag.edges(3), &[4]);
    }

    #[test]
    fn test_fallback_edge_for_unknown_char() {
        let lexicon = lexicon();
        let snap = lexicon.snapshot();
        let dag = Dag::build(&snap, "我北京");
        assert_eq!(dag.edges(0), &[1]);
        assert_eq!(dag.fragment(1, 3), "北京");
        assert_eq!(dag.byte_offset(1), 3);
    }

    #[test]
    fn test_route_prefers_two_words() {
        let lexicon = lexicon();
        let snap = lexicon.snapshot();
        let dag = Dag::build(&snap, "北京大学");
        // 100 * 80 / 230 ≈ 34.8 > 30
        let route = dag.best_route(&snap);
        assert_eq!(route[0], 2);
        assert_eq!(route[2], 4);
    }

    #[test]
    fn test_route_after_boost() {
        let lexicon = lexicon();
        lexicon.insert_or_update("北京大学", Some(1000), None).unwrap();
        let snap = lexicon.snapshot();
        let dag = Dag::build(&snap, "北京大学");
        assert_eq!(dag.best_route(&snap)[0], 4);
    }

    #[test]
    fn test_empty() {
        let lexicon = lexicon();
        let snap = lexicon.snapshot();
        let dag = Dag::build(&snap, "");
        assert!(dag.is_empty());
        assert!(dag.best_route(&snap).is_empty());
    }
}

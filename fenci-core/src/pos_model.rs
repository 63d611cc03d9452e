//! # HMM Morfossintático para Palavras Desconhecidas
//!
//! Estados ocultos combinam a posição do caractere na palavra com a tag da
//! palavra: `estado = tag × 4 + posição`, onde posição ∈ {B, E, M, S}. Com as
//! ~55 tags do dicionário são ~220 estados.
//!
//! ## Estimação
//!
//! O modelo é estimado uma única vez a partir do dicionário base, com cada
//! palavra pesando a sua frequência:
//!
//! 1. **Inicial**: distribuição dos estados que abrem palavras (B ou S).
//! 2. **Transição dentro da palavra**: B→M, B→E, M→M, M→E da mesma tag, por contagem.
//! 3. **Transição entre palavras**: de E/S de qualquer tag para B/S, igual à
//!    distribuição inicial (prior da tag).
//! 4. **Emissão**: add-1 smoothing sobre o vocabulário de caracteres.
//!
//! Cada caractere só pode assumir os estados em que foi observado no
//! dicionário; caracteres nunca vistos aceitam qualquer estado.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use once_cell::sync::Lazy;
use tracing::info;

use crate::hmm::{spans_from_states, BmesState};
use crate::lexicon::{self, LexiconEntry};
use crate::viterbi::{viterbi_decode, HmmParams, MIN_FLOAT};

static POS_MODEL: Lazy<PosModel> = Lazy::new(|| {
    let base = lexicon::base_snapshot();
    let model = PosModel::train(base.entries());
    info!(
        tags = model.tags.len(),
        estados = model.params.n_states(),
        caracteres = model.char_states.len(),
        "Modelo HMM morfossintático estimado"
    );
    model
});

const POSITIONS: usize = 4;

/// HMM de posição × tag.
#[derive(Debug, Clone)]
pub struct PosModel {
    params: HmmParams,
    tags: Vec<String>,
    /// Estados observados para cada caractere.
    char_states: HashMap<char, Vec<usize>>,
    all_states: Vec<usize>,
}

impl PosModel {
    /// Modelo estimado do dicionário embutido (na primeira chamada).
    pub fn embedded() -> &'static PosModel {
        &POS_MODEL
    }

    /// Estima o modelo a partir de `(palavra, entrada)`. Entradas sem tag são ignoradas.
    pub fn train<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a LexiconEntry)>,
    {
        let entries: Vec<(&str, u64, &str)> = entries
            .into_iter()
            .filter_map(|(w, e)| e.tag.as_deref().map(|t| (w, e.frequency, t)))
            .filter(|(w, _, _)| !w.is_empty())
            .collect();

        let tags: Vec<String> = entries
            .iter()
            .map(|(_, _, t)| t.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let tag_index: HashMap<&str, usize> = tags.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
        let n = tags.len() * POSITIONS;

        let mut start_counts = vec![0f64; n];
        let mut transition_counts = vec![vec![0f64; n]; n];
        let mut emission_counts: Vec<HashMap<char, f64>> = vec![HashMap::new(); n];
        let mut state_totals = vec![0f64; n];
        let mut char_sets: HashMap<char, BTreeSet<usize>> = HashMap::new();

        // 1. Contagem ponderada pela frequência
        for (word, freq, tag) in &entries {
            let base = tag_index[tag] * POSITIONS;
            let weight = *freq as f64;
            let chars: Vec<char> = word.chars().collect();
            let states: Vec<usize> = positions(chars.len()).map(|p| base + p.index()).collect();

            start_counts[states[0]] += weight;
            for pair in states.windows(2) {
                transition_counts[pair[0]][pair[1]] += weight;
            }
            for (ch, &state) in chars.iter().zip(&states) {
                *emission_counts[state].entry(*ch).or_insert(0.0) += weight;
                state_totals[state] += weight;
                char_sets.entry(*ch).or_default().insert(state);
            }
        }

        // 2. Log-probabilidades
        let start_total: f64 = start_counts.iter().sum();
        let start: Vec<f64> = start_counts
            .iter()
            .map(|&c| if c > 0.0 { (c / start_total).ln() } else { MIN_FLOAT })
            .collect();

        let mut transition = vec![vec![MIN_FLOAT; n]; n];
        for p in 0..n {
            if closes_word(p) {
                transition[p].copy_from_slice(&start);
            } else {
                let row_total: f64 = transition_counts[p].iter().sum();
                for s in 0..n {
                    let count = transition_counts[p][s];
                    if count > 0.0 {
                        transition[p][s] = (count / row_total).ln();
                    }
                }
            }
        }

        let vocabulary = char_sets.len() as f64;
        let emission_floor: Vec<f64> = state_totals
            .iter()
            .map(|&t| (1.0 / (t + vocabulary.max(1.0))).ln())
            .collect();
        let emission: Vec<HashMap<char, f64>> = emission_counts
            .into_iter()
            .zip(&state_totals)
            .map(|(counts, &total)| {
                counts
                    .into_iter()
                    .map(|(ch, c)| (ch, ((c + 1.0) / (total + vocabulary)).ln()))
                    .collect()
            })
            .collect();

        let all_states: Vec<usize> = (0..n).collect();
        let final_states = all_states.iter().copied().filter(|&s| closes_word(s)).collect();

        Self {
            params: HmmParams {
                start,
                transition,
                predecessors: vec![all_states.clone(); n],
                emission,
                emission_floor,
                final_states,
            },
            tags,
            char_states: char_sets
                .into_iter()
                .map(|(ch, set)| (ch, set.into_iter().collect()))
                .collect(),
            all_states,
        }
    }

    /// Subdivide `chars` em palavras etiquetadas. Intervalos em caracteres.
    ///
    /// A tag de cada palavra é a do estado que a fecha.
    pub fn tag(&self, chars: &[char]) -> Vec<(Range<usize>, String)> {
        if chars.is_empty() || self.tags.is_empty() {
            return vec![];
        }
        let allowed: Vec<&[usize]> = chars
            .iter()
            .map(|ch| {
                self.char_states
                    .get(ch)
                    .map(Vec::as_slice)
                    .unwrap_or(self.all_states.as_slice())
            })
            .collect();
        let path = viterbi_decode(&self.params, chars, &allowed).best_path;
        if path.len() != chars.len() {
            return vec![];
        }

        let states: Vec<BmesState> = path
            .iter()
            .filter_map(|&s| BmesState::from_index(s % POSITIONS))
            .collect();
        spans_from_states(&states)
            .into_iter()
            .map(|span| {
                let tag = self.tags[path[span.end - 1] / POSITIONS].clone();
                (span, tag)
            })
            .collect()
    }
}

/// Posições B/M/E ou S de uma palavra com `len` caracteres.
fn positions(len: usize) -> impl Iterator<Item = BmesState> {
    (0..len).map(move |i| match (len, i) {
        (1, _) => BmesState::Single,
        (_, 0) => BmesState::Begin,
        (_, i) if i + 1 == len => BmesState::End,
        _ => BmesState::Middle,
    })
}

fn closes_word(state: usize) -> bool {
    BmesState::from_index(state % POSITIONS).is_some_and(BmesState::closes_word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    fn toy_model() -> PosModel {
        let lexicon = Lexicon::from_text("张三 50 nr\n李四 50 nr\n张 5 nr\n跑 80 v\n走 60 v\n北京 100 ns\n天 10\n");
        let snap = lexicon.snapshot();
        PosModel::train(snap.entries())
    }

    #[test]
    fn test_positions() {
        let p: Vec<BmesState> = positions(4).collect();
        assert_eq!(p, vec![BmesState::Begin, BmesState::Middle, BmesState::Middle, BmesState::End]);
        assert_eq!(positions(1).collect::<Vec<_>>(), vec![BmesState::Single]);
    }

    #[test]
    fn test_train_collects_tags() {
        let model = toy_model();
        assert_eq!(model.tags, vec!["nr".to_string(), "ns".to_string(), "v".to_string()]);
        assert_eq!(model.params.n_states(), 12);
        // 张 aparece como B-nr e S-nr
        assert_eq!(model.char_states[&'张'].len(), 2);
    }

    #[test]
    fn test_tag_unknown_name() {
        let model = toy_model();
        let chars: Vec<char> = "张四".chars().collect();
        let tagged = model.tag(&chars);
        assert_eq!(tagged, vec![(0..2, "nr".to_string())]);
    }

    #[test]
    fn test_tag_splits_sequence() {
        let model = toy_model();
        let chars: Vec<char> = "李四跑".chars().collect();
        let tagged = model.tag(&chars);
        assert_eq!(tagged, vec![(0..2, "nr".to_string()), (2..3, "v".to_string())]);
    }

    #[test]
    fn test_tag_empty() {
        assert!(toy_model().tag(&[]).is_empty());
    }

    #[test]
    fn test_embedded_covers_input() {
        let model = PosModel::embedded();
        assert!(model.tags.len() > 40);
        let chars: Vec<char> = "张尧".chars().collect();
        let tagged = model.tag(&chars);
        assert!(!tagged.is_empty());
        assert_eq!(tagged.first().map(|(r, _)| r.start), Some(0));
        assert_eq!(tagged.last().map(|(r, _)| r.end), Some(2));
    }
}

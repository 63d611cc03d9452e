//! # Algoritmo de Viterbi — Decodificador Genérico
//!
//! Uma única rotina de Viterbi serve aos dois HMMs do motor: o segmentador de
//! quatro estados (B/E/M/S) e o etiquetador morfossintático (posição × tag).
//! Cada modelo entra apenas como [`HmmParams`]: número de estados, tabelas de
//! transição/emissão e distribuição inicial, todas em log-space.
//!
//! ## Algoritmo
//!
//! ```text
//! Inicialização: v[0][s] = start(s) + emit(s, x_0)
//!
//! Recursão:      v[t][s] = max_{p ∈ pred(s)} [v[t-1][p] + trans(p, s)] + emit(s, x_t)
//!
//! Término:       melhor estado final entre `final_states`
//!
//! Backtracking:  reconstrói o caminho de trás para frente
//! ```
//!
//! Cada posição pode restringir os estados candidatos (`allowed[t]`); estados
//! fora da lista ficam com `-∞` naquela posição. Em empate, vence o último
//! candidato examinado.

use std::collections::HashMap;

/// Log-probabilidade usada como "impossível" nos modelos embutidos.
pub const MIN_FLOAT: f64 = -3.14e100;

/// Parâmetros de um HMM em log-space.
#[derive(Debug, Clone)]
pub struct HmmParams {
    /// $\log P(y_0 = s)$
    pub start: Vec<f64>,
    /// $\log P(y_t = s | y_{t-1} = p)$, indexado `[p][s]`.
    pub transition: Vec<Vec<f64>>,
    /// Estados predecessores examinados para cada estado, na ordem de desempate.
    pub predecessors: Vec<Vec<usize>>,
    /// $\log P(x | y = s)$ por estado.
    pub emission: Vec<HashMap<char, f64>>,
    /// Emissão de um caractere ausente da tabela, por estado.
    pub emission_floor: Vec<f64>,
    /// Estados em que a sequência pode terminar. Vazio: qualquer estado.
    pub final_states: Vec<usize>,
}

impl HmmParams {
    pub fn n_states(&self) -> usize {
        self.start.len()
    }

    pub fn emit(&self, state: usize, ch: char) -> f64 {
        self.emission[state]
            .get(&ch)
            .copied()
            .unwrap_or(self.emission_floor[state])
    }
}

/// Resultado da decodificação.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiResult {
    /// Estado mais provável para cada observação.
    pub best_path: Vec<usize>,
    /// Log-probabilidade do melhor caminho.
    pub best_score: f64,
}

/// Decodifica `observations`, restringindo a posição `t` aos estados `allowed[t]`.
///
/// `allowed` precisa ter o mesmo tamanho de `observations`.
pub fn viterbi_decode(
    params: &HmmParams,
    observations: &[char],
    allowed: &[&[usize]],
) -> ViterbiResult {
    if observations.is_empty() {
        return ViterbiResult {
            best_path: vec![],
            best_score: 0.0,
        };
    }
    debug_assert_eq!(observations.len(), allowed.len());

    let n = params.n_states();
    let len = observations.len();
    let mut v = vec![vec![f64::NEG_INFINITY; n]; len];
    let mut back: Vec<Vec<Option<usize>>> = vec![vec![None; n]; len];

    // 1. Inicialização (t=0)
    for &s in allowed[0] {
        v[0][s] = params.start[s] + params.emit(s, observations[0]);
    }

    // 2. Recursão
    for t in 1..len {
        let ch = observations[t];
        for &s in allowed[t] {
            let emission = params.emit(s, ch);
            let mut best: Option<(f64, usize)> = None;
            for &p in &params.predecessors[s] {
                if v[t - 1][p] == f64::NEG_INFINITY {
                    continue;
                }
                let score = v[t - 1][p] + params.transition[p][s] + emission;
                if best.map_or(true, |(b, _)| score >= b) {
                    best = Some((score, p));
                }
            }
            if let Some((score, p)) = best {
                v[t][s] = score;
                back[t][s] = Some(p);
            }
        }
    }

    // 3. Término: estados finais permitidos; sem nenhum alcançável, qualquer estado
    let last = &v[len - 1];
    let reachable = |states: &mut dyn Iterator<Item = usize>| {
        let mut best: Option<(f64, usize)> = None;
        for s in states {
            if last[s] == f64::NEG_INFINITY {
                continue;
            }
            if best.map_or(true, |(b, _)| last[s] >= b) {
                best = Some((last[s], s));
            }
        }
        best
    };
    let terminal = reachable(&mut params.final_states.iter().copied())
        .or_else(|| reachable(&mut (0..n)));

    let Some((best_score, mut state)) = terminal else {
        // Nenhum caminho viável: todos os candidatos sem predecessor
        return ViterbiResult {
            best_path: vec![],
            best_score: f64::NEG_INFINITY,
        };
    };

    // 4. Backtracking
    let mut best_path = vec![0; len];
    best_path[len - 1] = state;
    for t in (1..len).rev() {
        match back[t][state] {
            Some(prev) => {
                best_path[t - 1] = prev;
                state = prev;
            }
            None => break,
        }
    }

    ViterbiResult {
        best_path,
        best_score,
    }
}

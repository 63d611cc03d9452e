//! # Hidden Markov Model (HMM) de Segmentação
//!
//! Detecta palavras fora do léxico rotulando cada caractere com sua posição
//! na palavra:
//! - **B** (Begin): início de palavra com dois ou mais caracteres
//! - **M** (Middle): meio de palavra
//! - **E** (End): fim de palavra
//! - **S** (Single): palavra de um caractere
//!
//! Os parâmetros vêm do arquivo `hmm.model` embutido (log-probabilidades
//! iniciais, matriz 4×4 de transição e emissão por caractere). Um caractere
//! ausente da tabela de emissão recebe [`MIN_FLOAT`]. A sequência só pode
//! terminar em E ou S.
//!
//! ## Exemplo
//!
//! ```text
//! 小 明 硕 士 毕 业 于
//! B  E  B  E  B  M  E   →  小明 / 硕士 / 毕业于
//! ```

use std::collections::HashMap;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::error::{FenciError, Result};
use crate::viterbi::{viterbi_decode, HmmParams, MIN_FLOAT};

static HMM_MODEL: &str = include_str!("../data/hmm.model");

static SEGMENT_MODEL: Lazy<BmesModel> = Lazy::new(|| {
    let model = BmesModel::parse(HMM_MODEL).expect("hmm.model embutido válido");
    info!(
        caracteres = model.params.emission.iter().map(HashMap::len).sum::<usize>(),
        "Modelo HMM de segmentação carregado"
    );
    model
});

/// Ideogramas que passam pelo Viterbi.
static RE_HAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4E00}-\u{9FD5}]+").expect("regex válida"));
/// Números e palavras latinas, emitidos inteiros (`3.14`, `50%`, `abc`).
static RE_SKIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9]+(?:.\d+)?%?").expect("regex válida"));

/// Posição de um caractere dentro da palavra.
///
/// Os índices seguem a ordem das linhas do `hmm.model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BmesState {
    Begin = 0,
    End = 1,
    Middle = 2,
    Single = 3,
}

impl BmesState {
    pub const ALL: [BmesState; 4] = [Self::Begin, Self::End, Self::Middle, Self::Single];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// `true` para os estados que fecham uma palavra.
    pub fn closes_word(self) -> bool {
        matches!(self, Self::End | Self::Single)
    }
}

/// Estados que podem preceder cada estado, na ordem de desempate.
const ALLOWED_PREVIOUS: [[BmesState; 2]; 4] = [
    [BmesState::End, BmesState::Single],
    [BmesState::Begin, BmesState::Middle],
    [BmesState::Middle, BmesState::Begin],
    [BmesState::Single, BmesState::End],
];

const ALL_STATES: [usize; 4] = [0, 1, 2, 3];

/// Modelo B/E/M/S de quatro estados.
#[derive(Debug, Clone)]
pub struct BmesModel {
    params: HmmParams,
}

impl BmesModel {
    /// Modelo embutido, carregado uma vez por processo.
    pub fn embedded() -> &'static BmesModel {
        &SEGMENT_MODEL
    }

    /// Lê o formato `hmm.model`: linhas `#` são comentários; depois vêm uma
    /// linha de probabilidades iniciais, quatro linhas da matriz de transição
    /// e quatro linhas de emissão `char:logprob,char:logprob,...`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let mut next_line = |what: &str| {
            lines
                .next()
                .ok_or_else(|| FenciError::Model(format!("hmm.model sem {what}")))
        };

        let start = parse_row(next_line("probabilidades iniciais")?)?;
        let mut transition = Vec::with_capacity(4);
        for _ in 0..4 {
            transition.push(parse_row(next_line("matriz de transição")?)?);
        }
        let mut emission = Vec::with_capacity(4);
        for _ in 0..4 {
            emission.push(parse_emission(next_line("emissões")?)?);
        }
        if start.len() != 4 || transition.iter().any(|row| row.len() != 4) {
            return Err(FenciError::Model("hmm.model espera 4 estados".to_string()));
        }

        let predecessors = ALLOWED_PREVIOUS
            .iter()
            .map(|prev| prev.iter().map(|s| s.index()).collect())
            .collect();

        Ok(Self {
            params: HmmParams {
                start,
                transition,
                predecessors,
                emission,
                emission_floor: vec![MIN_FLOAT; 4],
                final_states: vec![BmesState::End.index(), BmesState::Single.index()],
            },
        })
    }

    /// Melhor sequência de estados para `chars`.
    pub fn decode(&self, chars: &[char]) -> Vec<BmesState> {
        let allowed = vec![&ALL_STATES[..]; chars.len()];
        viterbi_decode(&self.params, chars, &allowed)
            .best_path
            .into_iter()
            .filter_map(BmesState::from_index)
            .collect()
    }

    /// Segmenta uma sequência de ideogramas. Devolve intervalos de caractere.
    pub fn cut_chars(&self, chars: &[char]) -> Vec<Range<usize>> {
        if chars.len() < 2 {
            return (0..chars.len()).map(|i| i..i + 1).collect();
        }
        spans_from_states(&self.decode(chars))
    }
}

fn parse_row(line: &str) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| FenciError::Model(format!("probabilidade inválida `{v}`")))
        })
        .collect()
}

fn parse_emission(line: &str) -> Result<HashMap<char, f64>> {
    let mut table = HashMap::new();
    for pair in line.split(',') {
        let (ch, prob) = pair
            .split_once(':')
            .ok_or_else(|| FenciError::Model(format!("emissão inválida `{pair}`")))?;
        let mut chars = ch.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(FenciError::Model(format!("emissão com símbolo `{ch}`")));
        };
        let prob = prob
            .parse::<f64>()
            .map_err(|_| FenciError::Model(format!("probabilidade inválida `{prob}`")))?;
        table.insert(c, prob);
    }
    Ok(table)
}

/// Agrupa estados B…E e S em intervalos contíguos.
///
/// Sequências incompletas (um B sem E, M órfão) nunca perdem caracteres: o
/// trecho pendente vira um intervalo próprio antes do próximo B ou S, ou no fim.
pub fn spans_from_states(states: &[BmesState]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut begin = 0;
    let mut next = 0;
    for (i, state) in states.iter().enumerate() {
        match state {
            BmesState::Begin => {
                if next < i {
                    spans.push(next..i);
                }
                begin = i;
                next = i;
            }
            BmesState::End => {
                spans.push(begin.max(next)..i + 1);
                next = i + 1;
            }
            BmesState::Single => {
                if next < i {
                    spans.push(next..i);
                }
                spans.push(i..i + 1);
                next = i + 1;
            }
            BmesState::Middle => {}
        }
    }
    if next < states.len() {
        spans.push(next..states.len());
    }
    spans
}

/// Segmenta uma sequência que o DAG não resolveu. Devolve intervalos em bytes.
///
/// Só trechos de ideogramas passam pelo Viterbi; números e palavras latinas
/// saem inteiros e o restante sai como veio.
pub fn cut_run(text: &str) -> Vec<Range<usize>> {
    let model = BmesModel::embedded();
    let mut out = Vec::new();

    for (block, is_han) in split_matches(&RE_HAN, text) {
        if is_han {
            let piece = &text[block.clone()];
            let mut bounds: Vec<usize> = piece.char_indices().map(|(b, _)| b).collect();
            bounds.push(piece.len());
            let chars: Vec<char> = piece.chars().collect();
            for span in model.cut_chars(&chars) {
                out.push(block.start + bounds[span.start]..block.start + bounds[span.end]);
            }
        } else {
            let piece = &text[block.clone()];
            for (sub, _) in split_matches(&RE_SKIP, piece) {
                out.push(block.start + sub.start..block.start + sub.end);
            }
        }
    }
    out
}

/// Divide `text` em trechos que casam (`true`) ou não (`false`) com `re`.
pub(crate) fn split_matches(re: &Regex, text: &str) -> Vec<(Range<usize>, bool)> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            out.push((last..m.start(), false));
        }
        if m.end() > m.start() {
            out.push((m.range(), true));
        }
        last = m.end();
    }
    if last < text.len() {
        out.push((last..text.len(), false));
    }
    out
}

//! # Segmentador — Do Texto Bruto aos Segmentos
//!
//! Orquestra o corte de uma frase:
//!
//! ```text
//! texto ─► blocos (regex) ─┬─ bloco "han" ─► DAG + rota ótima ─┬─ palavras conhecidas
//!                          │                                   └─ sequências de 1 caractere ─► HMM
//!                          └─ resto ─► espaços inteiros, demais caracteres um a um
//! ```
//!
//! ## Modos
//!
//! | Modo      | Comportamento                                                |
//! |-----------|--------------------------------------------------------------|
//! | `Default` | rota ótima do DAG, sem HMM                                   |
//! | `Hmm`     | rota ótima; sequências não resolvidas passam pelo HMM B/E/M/S |
//! | `All`     | todas as arestas do DAG, sobrepostas, sem programação dinâmica |
//!
//! O modo busca ([`cut_for_search`]) acrescenta, antes de cada segmento longo,
//! os bigramas e trigramas internos que também são palavras do léxico.
//!
//! Offsets de [`Segment`] são contados em caracteres, com fim exclusivo.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dag::Dag;
use crate::hmm::{self, split_matches};
use crate::lexicon::LexiconSnapshot;

/// Ideogramas CJK (todas as extensões) mais letras, dígitos e `+#&._%-`.
static RE_HAN_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\u{3400}-\u{4DBF}\u{4E00}-\u{9FFF}\u{F900}-\u{FAFF}\u{20000}-\u{2A6DF}\u{2A700}-\u{2B73F}\u{2B740}-\u{2B81F}\u{2B820}-\u{2CEAF}\u{2CEB0}-\u{2EBEF}\u{2F800}-\u{2FA1F}a-zA-Z0-9+#&\._%\-]+",
    )
    .expect("regex válida")
});
static RE_SKIP_DEFAULT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\s").expect("regex válida"));
/// No modo `All` só ideogramas formam blocos.
static RE_HAN_CUT_ALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\u{3400}-\u{4DBF}\u{4E00}-\u{9FFF}\u{F900}-\u{FAFF}\u{20000}-\u{2A6DF}\u{2A700}-\u{2B73F}\u{2B740}-\u{2B81F}\u{2B820}-\u{2CEAF}\u{2CEB0}-\u{2EBEF}\u{2F800}-\u{2FA1F}]+",
    )
    .expect("regex válida")
});
static RE_SKIP_CUT_ALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9+#\n]").expect("regex válida"));

/// Um segmento da frase.
///
/// # Exemplo
/// ```text
/// "我来到北京"  →  Segment { text: "北京", start: 3, end: 5, tag: None, known: true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// Offset do primeiro caractere.
    pub start: usize,
    /// Offset logo após o último caractere.
    pub end: usize,
    /// Tag morfossintática, preenchida pelo etiquetador.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// `true` se o texto é uma entrada do léxico.
    pub known: bool,
}

/// Modo de corte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutMode {
    /// Rota ótima do DAG, sem HMM.
    #[default]
    Default,
    /// Rota ótima com HMM para palavras desconhecidas.
    Hmm,
    /// Todas as palavras do léxico contidas na frase.
    All,
}

/// Corta `sentence` no modo indicado.
pub fn cut_with_mode(snapshot: &LexiconSnapshot, sentence: &str, mode: CutMode) -> Vec<Segment> {
    match mode {
        CutMode::Default => cut(snapshot, sentence, false),
        CutMode::Hmm => cut(snapshot, sentence, true),
        CutMode::All => cut_all(snapshot, sentence),
    }
}

/// Segmentação não sobreposta que cobre a frase inteira.
pub fn cut(snapshot: &LexiconSnapshot, sentence: &str, hmm: bool) -> Vec<Segment> {
    let spans = cut_spans(snapshot, sentence, hmm);
    to_segments(snapshot, sentence, spans)
}

/// Todas as arestas do DAG de cada bloco, em ordem de início e depois de fim.
pub fn cut_all(snapshot: &LexiconSnapshot, sentence: &str) -> Vec<Segment> {
    let mut spans = Vec::new();
    for (block, is_han) in split_matches(&RE_HAN_CUT_ALL, sentence) {
        if is_han {
            let dag = Dag::build(snapshot, &sentence[block.clone()]);
            for i in 0..dag.len() {
                for &j in dag.edges(i) {
                    spans.push(block.start + dag.byte_offset(i)..block.start + dag.byte_offset(j));
                }
            }
        } else {
            for (piece, _) in split_matches(&RE_SKIP_CUT_ALL, &sentence[block.clone()]) {
                spans.push(block.start + piece.start..block.start + piece.end);
            }
        }
    }
    to_segments(snapshot, sentence, spans)
}

/// Modo busca: para cada segmento com mais de 2 caracteres, emite antes os
/// bigramas internos que são palavras; com mais de 3, também os trigramas.
///
/// # Exemplo
/// ```text
/// 南京市长江大桥 → 南京 京市 南京市 长江 大桥 长江大桥
/// ```
pub fn cut_for_search(snapshot: &LexiconSnapshot, sentence: &str, hmm: bool) -> Vec<Segment> {
    let mut out = Vec::new();
    for segment in cut(snapshot, sentence, hmm) {
        let chars: Vec<char> = segment.text.chars().collect();
        for n in [2usize, 3] {
            if chars.len() <= n {
                continue;
            }
            for i in 0..=chars.len() - n {
                let gram: String = chars[i..i + n].iter().collect();
                if snapshot.contains(&gram) {
                    out.push(Segment {
                        text: gram,
                        start: segment.start + i,
                        end: segment.start + i + n,
                        tag: None,
                        known: true,
                    });
                }
            }
        }
        out.push(segment);
    }
    out
}

/// Intervalos em bytes da segmentação padrão.
pub(crate) fn cut_spans(snapshot: &LexiconSnapshot, sentence: &str, hmm: bool) -> Vec<Range<usize>> {
    let mut spans = Vec::with_capacity(sentence.len() / 2);
    for (block, is_han) in split_matches(&RE_HAN_DEFAULT, sentence) {
        let text = &sentence[block.clone()];
        if is_han {
            let local = if hmm {
                cut_block_hmm(snapshot, text)
            } else {
                cut_block(snapshot, text)
            };
            spans.extend(local.into_iter().map(|r| block.start + r.start..block.start + r.end));
        } else {
            for (piece, is_space) in split_matches(&RE_SKIP_DEFAULT, text) {
                let offset = block.start + piece.start;
                if is_space {
                    spans.push(offset..block.start + piece.end);
                } else {
                    for (b, ch) in text[piece].char_indices() {
                        spans.push(offset + b..offset + b + ch.len_utf8());
                    }
                }
            }
        }
    }
    spans
}

/// Rota ótima sem HMM; letras e dígitos soltos consecutivos viram um segmento.
fn cut_block(snapshot: &LexiconSnapshot, block: &str) -> Vec<Range<usize>> {
    let dag = Dag::build(snapshot, block);
    let route = dag.best_route(snapshot);
    let mut spans = Vec::new();
    let mut pending: Option<usize> = None;
    let mut x = 0;

    while x < dag.len() {
        let y = route[x];
        let word = dag.fragment(x, y);
        let single_ascii = y == x + 1 && word.chars().all(|c| c.is_ascii_alphanumeric());
        if single_ascii {
            pending.get_or_insert(x);
        } else {
            if let Some(start) = pending.take() {
                spans.push(dag.byte_offset(start)..dag.byte_offset(x));
            }
            spans.push(dag.byte_offset(x)..dag.byte_offset(y));
        }
        x = y;
    }
    if let Some(start) = pending {
        spans.push(dag.byte_offset(start)..block.len());
    }
    spans
}

/// Rota ótima com HMM nas sequências de caracteres soltos.
fn cut_block_hmm(snapshot: &LexiconSnapshot, block: &str) -> Vec<Range<usize>> {
    let dag = Dag::build(snapshot, block);
    let route = dag.best_route(snapshot);
    let mut spans = Vec::new();
    let mut pending: Option<usize> = None;
    let mut x = 0;

    while x < dag.len() {
        let y = route[x];
        if y == x + 1 {
            pending.get_or_insert(x);
        } else {
            if let Some(start) = pending.take() {
                cut_single_run(snapshot, block, dag.byte_offset(start)..dag.byte_offset(x), &mut spans);
            }
            spans.push(dag.byte_offset(x)..dag.byte_offset(y));
        }
        x = y;
    }
    if let Some(start) = pending {
        cut_single_run(snapshot, block, dag.byte_offset(start)..block.len(), &mut spans);
    }
    spans
}

/// Uma sequência de escolhas de um caractere: sai como está se tiver um só
/// caractere ou se for ela mesma uma palavra (caractere a caractere); senão, HMM.
fn cut_single_run(snapshot: &LexiconSnapshot, block: &str, run: Range<usize>, spans: &mut Vec<Range<usize>>) {
    let text = &block[run.clone()];
    let mut chars = text.char_indices();
    let single = chars.next().is_some() && chars.next().is_none();

    if single {
        spans.push(run);
    } else if snapshot.contains(text) {
        for (b, ch) in text.char_indices() {
            spans.push(run.start + b..run.start + b + ch.len_utf8());
        }
    } else {
        spans.extend(
            hmm::cut_run(text)
                .into_iter()
                .map(|r| run.start + r.start..run.start + r.end),
        );
    }
}

/// Converte intervalos em bytes para [`Segment`]s com offsets de caractere.
pub(crate) fn to_segments(snapshot: &LexiconSnapshot, sentence: &str, spans: Vec<Range<usize>>) -> Vec<Segment> {
    let positions = char_positions(sentence);
    spans
        .into_iter()
        .map(|r| {
            let text = &sentence[r.clone()];
            Segment {
                text: text.to_string(),
                start: positions[r.start],
                end: positions[r.end],
                tag: None,
                known: snapshot.contains(text),
            }
        })
        .collect()
}

/// Índice de caractere para cada fronteira em bytes (posições internas a um
/// caractere nunca são consultadas).
pub(crate) fn char_positions(sentence: &str) -> Vec<usize> {
    let mut positions = vec![0; sentence.len() + 1];
    let mut count = 0;
    for (b, _) in sentence.char_indices() {
        positions[b] = count;
        count += 1;
    }
    positions[sentence.len()] = count;
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    fn words(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_cut_default() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let segments = cut(&snap, "我来到北京清华大学", false);
        assert_eq!(words(&segments), vec!["我", "来到", "北京", "清华大学"]);
        assert_eq!((segments[3].start, segments[3].end), (5, 9));
        assert!(segments.iter().all(|s| s.known));
    }

    #[test]
    fn test_cut_merges_ascii_without_hmm() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let segments = cut(&snap, "abc网球拍卖会def", false);
        assert_eq!(words(&segments), vec!["abc", "网球", "拍卖会", "def"]);
    }

    #[test]
    fn test_cut_hmm_finds_unknown_word() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let segments = cut(&snap, "今天纽约的天气真好啊，京华大酒店的张尧经理吃了一只北京烤鸭。", true);
        assert_eq!(
            words(&segments),
            vec![
                "今天", "纽约", "的", "天气", "真好", "啊", "，", "京华", "大酒店", "的", "张尧", "经理", "吃", "了",
                "一只", "北京烤鸭", "。"
            ]
        );
        let unknown = &segments[10];
        assert!(!unknown.known);
        assert_eq!((unknown.start, unknown.end), (17, 19));
    }

    #[test]
    fn test_cut_whitespace_and_punctuation() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let segments = cut(&snap, "北京\r\n  上海！", false);
        assert_eq!(words(&segments), vec!["北京", "\r\n", " ", " ", "上海", "！"]);
        assert_eq!(segments.last().map(|s| (s.start, s.end)), Some((8, 9)));
    }

    #[test]
    fn test_default_spans_tile_input() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let text = "2013年，实现营业收入0万元，净利润-139.13万元 (hello world)";
        for hmm in [false, true] {
            let segments = cut(&snap, text, hmm);
            let mut cursor = 0;
            for segment in &segments {
                assert_eq!(segment.start, cursor);
                cursor = segment.end;
            }
            assert_eq!(cursor, text.chars().count());
            let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
            assert_eq!(joined, text);
        }
    }

    #[test]
    fn test_cut_all() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let segments = cut_all(&snap, "我来到北京清华大学");
        assert_eq!(
            words(&segments),
            vec!["我", "来", "来到", "到", "北", "北京", "京", "清", "清华", "清华大学", "华", "华大", "大", "大学", "学"]
        );
        assert_eq!((segments[9].start, segments[9].end), (5, 9));
    }

    #[test]
    fn test_cut_for_search() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let segments = cut_for_search(&snap, "小明硕士毕业于中国科学院计算所，后在日本京都大学深造", true);
        assert_eq!(
            words(&segments),
            vec![
                "小明", "硕士", "毕业", "于", "中国", "科学", "学院", "科学院", "中国科学院", "计算", "计算所", "，", "后",
                "在", "日本", "京都", "大学", "日本京都大学", "深造"
            ]
        );
    }

    #[test]
    fn test_cut_with_mode() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        assert_eq!(
            cut_with_mode(&snap, "我们中出了一个叛徒", CutMode::Default).len(),
            6
        );
        assert_eq!(
            words(&cut_with_mode(&snap, "我们中出了一个叛徒", CutMode::Hmm)),
            vec!["我们", "中出", "了", "一个", "叛徒"]
        );
        assert!(cut_with_mode(&snap, "", CutMode::All).is_empty());
    }

    #[test]
    fn test_char_positions() {
        let positions = char_positions("a北b");
        assert_eq!(positions[0], 0);
        assert_eq!(positions[1], 1);
        assert_eq!(positions[4], 2);
        assert_eq!(positions[5], 3);
    }
}

//! # Etiquetador Morfossintático
//!
//! Atribui uma tag a cada segmento, nesta ordem de decisão:
//!
//! 1. **Léxico**: palavra conhecida usa a tag do dicionário (`"x"` se não tiver).
//! 2. **Classe de caractere** (segmentos sem ideogramas):
//!    - nenhuma letra/dígito ASCII → `"x"` (pontuação, espaço)
//!    - só dígitos → `"m"`
//!    - letras (com ou sem dígitos) → `"eng"`
//! 3. **HMM morfossintático** (só com HMM ligado): decodifica os caracteres e
//!    pode subdividir o segmento em palavras menores, cada uma com sua tag.
//! 4. Caso contrário → `"x"`.
//!
//! ## Exemplo
//!
//! ```text
//! "升职加薪，当上CEO"  →  升职/v 加薪/nr ，/x 当上/t CEO/eng
//! ```

use serde::{Deserialize, Serialize};

use crate::lexicon::LexiconSnapshot;
use crate::pos_model::PosModel;
use crate::segmenter::{self, Segment};

/// Tag para segmentos sem classificação.
pub const UNKNOWN_TAG: &str = "x";

/// Palavra com sua tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedWord {
    pub word: String,
    pub tag: String,
}

impl From<Segment> for TaggedWord {
    fn from(segment: Segment) -> Self {
        Self {
            tag: segment.tag.unwrap_or_else(|| UNKNOWN_TAG.to_string()),
            word: segment.text,
        }
    }
}

/// Segmenta e etiqueta; devolve os segmentos com `tag` preenchida.
///
/// Os offsets continuam exatos mesmo quando o HMM subdivide um segmento.
pub fn tag_segments(snapshot: &LexiconSnapshot, sentence: &str, hmm: bool) -> Vec<Segment> {
    let mut out = Vec::new();
    for mut segment in segmenter::cut(snapshot, sentence, hmm) {
        if let Some(entry) = snapshot.lookup(&segment.text) {
            segment.tag = Some(entry.tag.as_deref().unwrap_or(UNKNOWN_TAG).to_string());
            out.push(segment);
        } else if !segment.text.chars().any(is_ideograph) {
            segment.tag = Some(char_class_tag(&segment.text).to_string());
            out.push(segment);
        } else if hmm {
            out.extend(tag_unknown(snapshot, segment));
        } else {
            segment.tag = Some(UNKNOWN_TAG.to_string());
            out.push(segment);
        }
    }
    out
}

/// Pares (palavra, tag) da frase.
pub fn tag(snapshot: &LexiconSnapshot, sentence: &str, hmm: bool) -> Vec<TaggedWord> {
    tag_segments(snapshot, sentence, hmm)
        .into_iter()
        .map(TaggedWord::from)
        .collect()
}

/// Tag por classe de caractere para texto sem ideogramas.
pub fn char_class_tag(word: &str) -> &'static str {
    let mut eng = 0;
    let mut digits = 0;
    for ch in word.chars() {
        if ch.is_ascii_alphanumeric() {
            eng += 1;
            if ch.is_ascii_digit() {
                digits += 1;
            }
        }
    }
    if eng == 0 {
        UNKNOWN_TAG
    } else if eng == digits {
        "m"
    } else {
        "eng"
    }
}

fn tag_unknown(snapshot: &LexiconSnapshot, segment: Segment) -> Vec<Segment> {
    let chars: Vec<char> = segment.text.chars().collect();
    let decoded = PosModel::embedded().tag(&chars);
    if decoded.is_empty() {
        return vec![Segment {
            tag: Some(UNKNOWN_TAG.to_string()),
            ..segment
        }];
    }

    decoded
        .into_iter()
        .map(|(span, tag)| {
            let text: String = chars[span.clone()].iter().collect();
            Segment {
                known: snapshot.contains(&text),
                text,
                start: segment.start + span.start,
                end: segment.start + span.end,
                tag: Some(tag),
            }
        })
        .collect()
}

/// Ideogramas CJK: bloco unificado, extensões e compatibilidade.
fn is_ideograph(ch: char) -> bool {
    matches!(
        ch as u32,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2EBEF | 0x2F800..=0x2FA1F
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    fn pairs(tagged: &[TaggedWord]) -> Vec<(&str, &str)> {
        tagged.iter().map(|t| (t.word.as_str(), t.tag.as_str())).collect()
    }

    #[test]
    fn test_char_class_tag() {
        assert_eq!(char_class_tag("CEO"), "eng");
        assert_eq!(char_class_tag("2013"), "m");
        assert_eq!(char_class_tag("mp3"), "eng");
        assert_eq!(char_class_tag("，"), "x");
        assert_eq!(char_class_tag(" "), "x");
    }

    #[test]
    fn test_tag_with_hmm() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let tagged = tag(
            &snap,
            "我是拖拉机学院手扶拖拉机专业的。不用多久，我就会升职加薪，当上CEO，走上人生巅峰。",
            true,
        );
        assert_eq!(
            pairs(&tagged),
            vec![
                ("我", "r"),
                ("是", "v"),
                ("拖拉机", "n"),
                ("学院", "n"),
                ("手扶拖拉机", "n"),
                ("专业", "n"),
                ("的", "uj"),
                ("。", "x"),
                ("不用", "v"),
                ("多久", "m"),
                ("，", "x"),
                ("我", "r"),
                ("就", "d"),
                ("会", "v"),
                ("升职", "v"),
                ("加薪", "nr"),
                ("，", "x"),
                ("当上", "t"),
                ("CEO", "eng"),
                ("，", "x"),
                ("走上", "v"),
                ("人生", "n"),
                ("巅峰", "n"),
                ("。", "x"),
            ]
        );
    }

    #[test]
    fn test_tag_without_hmm_splits_run() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let tagged = tag(&snap, "当上CEO", false);
        assert_eq!(pairs(&tagged), vec![("当", "t"), ("上", "f"), ("CEO", "eng")]);
    }

    #[test]
    fn test_unknown_word_keeps_offsets() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let sentence = "京华大酒店的张尧经理";
        let segments = tag_segments(&snap, sentence, true);
        let mut cursor = 0;
        for segment in &segments {
            assert_eq!(segment.start, cursor);
            assert!(segment.tag.is_some());
            cursor = segment.end;
        }
        assert_eq!(cursor, sentence.chars().count());
        assert_eq!(segments.last().map(|s| s.text.as_str()), Some("经理"));
    }

    #[test]
    fn test_untagged_lexicon_word() {
        let lexicon = Lexicon::from_text("云计算 10\n");
        let snap = lexicon.snapshot();
        assert_eq!(pairs(&tag(&snap, "云计算", false)), vec![("云计算", "x")]);
    }

    #[test]
    fn test_empty_input() {
        let lexicon = Lexicon::new();
        assert!(tag(&lexicon.snapshot(), "", true).is_empty());
    }
}

//! # Tokenizador — Spans `(palavra, início, fim)`
//!
//! Projeta a segmentação em spans com offsets de caractere.
//!
//! ## Modos
//!
//! - **Default**: exatamente os segmentos, sem lacunas nem sobreposição.
//! - **Search**: antes de cada segmento longo, os bigramas e trigramas
//!   internos que são palavras do léxico (indexação orientada a recall).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use fenci_core::lexicon::Lexicon;
//! use fenci_core::tokenizer::{tokenize, TokenizeMode};
//!
//! let lexicon = Lexicon::new();
//! let tokens = tokenize(&lexicon.snapshot(), "南京市长江大桥", TokenizeMode::Default, false);
//! assert_eq!(tokens[0].word, "南京市");
//! assert_eq!((tokens[1].start, tokens[1].end), (3, 7));
//! ```

use serde::{Deserialize, Serialize};

use crate::lexicon::LexiconSnapshot;
use crate::segmenter::{self, Segment};

/// Um span da frase original.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub word: String,
    /// Offset de caractere inicial (inclusive).
    pub start: usize,
    /// Offset de caractere final (exclusivo).
    pub end: usize,
}

impl From<Segment> for Token {
    fn from(segment: Segment) -> Self {
        Self {
            word: segment.text,
            start: segment.start,
            end: segment.end,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizeMode {
    /// Cobertura mínima, sem sobreposição.
    #[default]
    Default,
    /// Acrescenta sub-spans do léxico.
    Search,
}

pub fn tokenize(snapshot: &LexiconSnapshot, sentence: &str, mode: TokenizeMode, hmm: bool) -> Vec<Token> {
    let segments = match mode {
        TokenizeMode::Default => segmenter::cut(snapshot, sentence, hmm),
        TokenizeMode::Search => segmenter::cut_for_search(snapshot, sentence, hmm),
    };
    segments.into_iter().map(Token::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    fn spans(tokens: &[Token]) -> Vec<(&str, usize, usize)> {
        tokens.iter().map(|t| (t.word.as_str(), t.start, t.end)).collect()
    }

    #[test]
    fn test_tokenize_default() {
        let lexicon = Lexicon::new();
        let tokens = tokenize(&lexicon.snapshot(), "南京市长江大桥", TokenizeMode::Default, false);
        assert_eq!(spans(&tokens), vec![("南京市", 0, 3), ("长江大桥", 3, 7)]);
    }

    #[test]
    fn test_tokenize_search() {
        let lexicon = Lexicon::new();
        let tokens = tokenize(&lexicon.snapshot(), "南京市长江大桥", TokenizeMode::Search, false);
        assert_eq!(
            spans(&tokens),
            vec![
                ("南京", 0, 2),
                ("京市", 1, 3),
                ("南京市", 0, 3),
                ("长江", 3, 5),
                ("大桥", 5, 7),
                ("长江大桥", 3, 7)
            ]
        );
    }

    #[test]
    fn test_search_is_superset_of_default() {
        let lexicon = Lexicon::new();
        let snap = lexicon.snapshot();
        let text = "小明硕士毕业于中国科学院计算所，后在日本京都大学深造";
        let default = tokenize(&snap, text, TokenizeMode::Default, true);
        let search = tokenize(&snap, text, TokenizeMode::Search, true);
        assert!(search.len() > default.len());
        for token in &default {
            assert!(search.contains(token));
        }
    }

    #[test]
    fn test_tokenize_hmm_unknown_word() {
        let lexicon = Lexicon::new();
        let tokens = tokenize(&lexicon.snapshot(), "我们中出了一个叛徒", TokenizeMode::Default, true);
        assert_eq!(
            spans(&tokens),
            vec![("我们", 0, 2), ("中出", 2, 4), ("了", 4, 5), ("一个", 5, 7), ("叛徒", 7, 9)]
        );
    }

    #[test]
    fn test_mode_serde() {
        let mode: TokenizeMode = serde_json::from_str("\"search\"").unwrap();
        assert_eq!(mode, TokenizeMode::Search);
    }
}

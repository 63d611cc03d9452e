//! # fenci-core — Segmentação de Texto Chinês, Etiquetagem e Palavras-Chave
//!
//! Texto chinês não separa palavras com espaços. Este crate reconstrói as
//! fronteiras de palavra a partir de um léxico ponderado e de modelos
//! ocultos de Markov, e sobre a segmentação oferece etiquetagem
//! morfossintática, spans com offsets e extração de palavras-chave.
//!
//! ## Arquitetura
//!
//! ```text
//! texto ──► pré-segmentação (regex) ──► blocos
//!                                         │
//!            léxico (snapshot) ──► DAG ──► rota de máxima probabilidade
//!                                         │
//!                       HMM BMES ──► palavras fora do léxico (opcional)
//!                                         │
//!                                   [Segment]
//!                    ┌────────────────────┼───────────────────┐
//!                 tagger               tokenizer           keywords
//!           (léxico / classe /      (spans default      (TF-IDF, TextRank)
//!            HMM de tags)             ou search)
//! ```
//!
//! 1. **Léxico** ([`lexicon`]): palavras, frequências e tags, com snapshots imutáveis.
//! 2. **DAG** ([`dag`]): todas as palavras candidatas e a rota de máxima probabilidade.
//! 3. **HMM** ([`hmm`], [`viterbi`]): descoberta de palavras novas pelo esquema BMES.
//! 4. **Segmentação** ([`segmenter`]): modos default, HMM, todas as palavras e busca.
//! 5. **Etiquetagem** ([`tagger`], [`pos_model`]): uma tag por segmento.
//! 6. **Palavras-chave** ([`keywords`]): TF-IDF e TextRank.
//!
//! A fachada [`Engine`] junta tudo e é o ponto de entrada recomendado.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use fenci_core::{Engine, KeywordMethod};
//!
//! let engine = Engine::new();
//!
//! for tagged in engine.tag("我来到北京清华大学", true) {
//!     println!("{}/{}", tagged.word, tagged.tag);
//! }
//!
//! let keywords = engine.extract_keywords("北京烤鸭真好吃，北京的天气也不错", 3, &[], KeywordMethod::TfIdf);
//! assert!(!keywords.is_empty());
//! ```

pub mod config;
pub mod dag;
pub mod engine;
pub mod error;
pub mod hmm;
pub mod keywords;
pub mod lexicon;
pub mod pos_model;
pub mod segmenter;
pub mod tagger;
pub mod tokenizer;
pub mod viterbi;

pub use config::{EngineConfig, KeywordConfig, TextRankConfig};
pub use engine::Engine;
pub use error::{FenciError, Result};
pub use keywords::{IdfTable, Keyword, KeywordMethod};
pub use lexicon::{Lexicon, LexiconEntry, LexiconSnapshot, MergeReport};
pub use segmenter::{CutMode, Segment};
pub use tagger::TaggedWord;
pub use tokenizer::{Token, TokenizeMode};

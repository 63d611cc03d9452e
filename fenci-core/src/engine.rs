//! # Engine — Fachada do Motor
//!
//! Junta léxico, tabela IDF e configuração e expõe todas as operações:
//!
//! | Grupo          | Operações                                                        |
//! |----------------|------------------------------------------------------------------|
//! | Léxico         | `reset_lexicon`, `add_word`, `merge_dictionary`, `suggest_frequency`, `has_word` |
//! | Segmentação    | `segment`, `segment_all`, `segment_for_search`, `segment_batch`  |
//! | Etiquetagem    | `tag`, `tag_segments`, `tokenize`                                |
//! | Palavras-chave | `extract_tfidf`, `extract_textrank`, `load_idf`, stop words      |
//!
//! Cada chamada de leitura captura um único snapshot do léxico e trabalha
//! sobre ele até o fim, então escritas concorrentes nunca aparecem pela metade.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use fenci_core::Engine;
//!
//! let engine = Engine::new();
//! let words: Vec<String> = engine
//!     .segment("我来到北京清华大学", true)
//!     .into_iter()
//!     .map(|s| s.text)
//!     .collect();
//! assert_eq!(words, ["我", "来到", "北京", "清华大学"]);
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::keywords::{IdfTable, Keyword, KeywordMethod, RankContext};
use crate::lexicon::{Lexicon, MergeReport};
use crate::segmenter::{self, CutMode, Segment};
use crate::tagger::{self, TaggedWord};
use crate::tokenizer::{self, Token, TokenizeMode};

static GLOBAL: Lazy<Engine> = Lazy::new(Engine::new);

/// Motor de análise léxica.
#[derive(Debug)]
pub struct Engine {
    lexicon: Lexicon,
    idf: RwLock<Arc<IdfTable>>,
    config: RwLock<EngineConfig>,
}

impl Engine {
    /// Motor com dicionário, IDF e configuração padrão.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_parts(Lexicon::new(), IdfTable::embedded(), config)
    }

    /// Motor sobre um léxico e uma tabela IDF próprios.
    pub fn with_parts(lexicon: Lexicon, idf: Arc<IdfTable>, config: EngineConfig) -> Self {
        Self {
            lexicon,
            idf: RwLock::new(idf),
            config: RwLock::new(config),
        }
    }

    /// Instância única do processo, criada no primeiro uso.
    pub fn global() -> &'static Engine {
        &GLOBAL
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn config(&self) -> EngineConfig {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: EngineConfig) {
        *self.config.write() = config;
    }

    // === Léxico ===

    /// Descarta todas as mutações do léxico de uma só vez.
    pub fn reset_lexicon(&self) {
        self.lexicon.reset();
        info!("Léxico restaurado");
    }

    /// Insere ou atualiza uma palavra; sem frequência, usa a sugerida.
    ///
    /// Frequências acima de [`MAX_FREQUENCY`](crate::lexicon::MAX_FREQUENCY) são recusadas.
    pub fn add_word(&self, word: &str, frequency: Option<u64>, tag: Option<&str>) -> Result<u64> {
        self.lexicon.insert_or_update(word, frequency, tag)
    }

    /// Mescla um dicionário `palavra freq [tag]` vindo do chamador.
    ///
    /// Linhas malformadas são puladas; só bytes fora de UTF-8 falham.
    pub fn merge_dictionary(&self, bytes: &[u8]) -> Result<MergeReport> {
        let text = std::str::from_utf8(bytes)?;
        let report = self.lexicon.merge_from(text);
        info!(aplicadas = report.applied, ignoradas = report.skipped, "Dicionário do usuário mesclado");
        Ok(report)
    }

    pub fn suggest_frequency(&self, word: &str) -> u64 {
        self.lexicon.suggest_frequency(word)
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.lexicon.contains(word)
    }

    // === Segmentação ===

    pub fn segment(&self, sentence: &str, hmm: bool) -> Vec<Segment> {
        segmenter::cut(&self.lexicon.snapshot(), sentence, hmm)
    }

    pub fn segment_with_mode(&self, sentence: &str, mode: CutMode) -> Vec<Segment> {
        segmenter::cut_with_mode(&self.lexicon.snapshot(), sentence, mode)
    }

    /// Todas as palavras do léxico contidas na frase (sobrepostas).
    pub fn segment_all(&self, sentence: &str) -> Vec<Segment> {
        segmenter::cut_all(&self.lexicon.snapshot(), sentence)
    }

    pub fn segment_for_search(&self, sentence: &str, hmm: bool) -> Vec<Segment> {
        segmenter::cut_for_search(&self.lexicon.snapshot(), sentence, hmm)
    }

    /// Segmenta várias frases em paralelo, todas sobre o mesmo snapshot.
    pub fn segment_batch<S>(&self, sentences: &[S], hmm: bool) -> Vec<Vec<Segment>>
    where
        S: AsRef<str> + Sync,
    {
        let snapshot = self.lexicon.snapshot();
        debug!(frases = sentences.len(), "Segmentação em lote");
        sentences
            .par_iter()
            .map(|s| segmenter::cut(&snapshot, s.as_ref(), hmm))
            .collect()
    }

    // === Etiquetagem e spans ===

    pub fn tag(&self, sentence: &str, hmm: bool) -> Vec<TaggedWord> {
        tagger::tag(&self.lexicon.snapshot(), sentence, hmm)
    }

    /// Como [`Engine::tag`], preservando offsets e a marca `known`.
    pub fn tag_segments(&self, sentence: &str, hmm: bool) -> Vec<Segment> {
        tagger::tag_segments(&self.lexicon.snapshot(), sentence, hmm)
    }

    pub fn tokenize(&self, sentence: &str, mode: TokenizeMode, hmm: bool) -> Vec<Token> {
        tokenizer::tokenize(&self.lexicon.snapshot(), sentence, mode, hmm)
    }

    // === Palavras-chave ===

    /// Extrai até `top_k` palavras-chave com o algoritmo escolhido.
    ///
    /// `allowed_tags` vazio aceita qualquer tag (exceto as excluídas na configuração).
    pub fn extract_keywords(
        &self,
        sentence: &str,
        top_k: usize,
        allowed_tags: &[String],
        method: KeywordMethod,
    ) -> Vec<Keyword> {
        let config = self.config();
        let idf = Arc::clone(&self.idf.read());
        let segments = tagger::tag_segments(&self.lexicon.snapshot(), sentence, config.keywords.use_hmm);
        let ctx = RankContext {
            keywords: &config.keywords,
            textrank: &config.textrank,
            idf: &idf,
        };
        method.rank(&segments, top_k, allowed_tags, &ctx)
    }

    pub fn extract_tfidf(&self, sentence: &str, top_k: usize, allowed_tags: &[String]) -> Vec<Keyword> {
        self.extract_keywords(sentence, top_k, allowed_tags, KeywordMethod::TfIdf)
    }

    pub fn extract_textrank(&self, sentence: &str, top_k: usize, allowed_tags: &[String]) -> Vec<Keyword> {
        self.extract_keywords(sentence, top_k, allowed_tags, KeywordMethod::TextRank)
    }

    /// Mescla linhas `termo idf` na tabela IDF. Devolve quantas foram aplicadas.
    pub fn load_idf(&self, bytes: &[u8]) -> Result<usize> {
        let mut idf = self.idf.write();
        let (next, applied) = idf.merged(bytes)?;
        *idf = Arc::new(next);
        info!(aplicadas = applied, "Tabela IDF atualizada");
        Ok(applied)
    }

    pub fn stop_words(&self) -> BTreeSet<String> {
        self.config.read().keywords.stop_words.clone()
    }

    /// Devolve `true` se a palavra ainda não era stop word.
    pub fn add_stop_word(&self, word: &str) -> bool {
        self.config.write().keywords.stop_words.insert(word.to_lowercase())
    }

    /// Devolve `true` se a palavra era stop word.
    pub fn remove_stop_word(&self, word: &str) -> bool {
        self.config.write().keywords.stop_words.remove(&word.to_lowercase())
    }

    pub fn set_stop_words<I, S>(&self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        self.config.write().keywords.stop_words = words;
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S1: &str = "今天纽约的天气真好啊，京华大酒店的张尧经理吃了一只北京烤鸭。后天纽约的天气不好，昨天纽约的天气也不好，北京烤鸭真好吃";
    const S2: &str = "此外，公司拟对全资子公司吉林欧亚置业有限公司增资4.3亿元，增资后，吉林欧亚置业注册资本由7000万元增加到5亿元。吉林欧亚置业主要经营范围为房地产开发及百货零售等业务。目前在建吉林欧亚城市商业综合体项目。2013年，实现营业收入0万元，实现净利润-139.13万元。";

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    fn terms(keywords: &[Keyword]) -> Vec<&str> {
        keywords.iter().map(|k| k.term.as_str()).collect()
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_segment_default() {
        let engine = Engine::new();
        assert_eq!(texts(&engine.segment("我来到北京清华大学", true)), vec!["我", "来到", "北京", "清华大学"]);
        assert_eq!(texts(&engine.segment("我来到北京清华大学", false)), vec!["我", "来到", "北京", "清华大学"]);
        assert!(engine.segment("", true).is_empty());
    }

    #[test]
    fn test_suggest_add_reset_cycle() {
        let engine = Engine::new();
        assert_eq!(engine.suggest_frequency("中出"), 348);
        assert_eq!(
            texts(&engine.segment("我们中出了一个叛徒", false)),
            vec!["我们", "中", "出", "了", "一个", "叛徒"]
        );

        assert_eq!(engine.add_word("中出", Some(10000), Some("v")).unwrap(), 10000);
        assert_eq!(engine.suggest_frequency("中出"), 10001);
        assert_eq!(
            texts(&engine.segment("我们中出了一个叛徒", false)),
            vec!["我们", "中出", "了", "一个", "叛徒"]
        );

        engine.reset_lexicon();
        assert_eq!(engine.suggest_frequency("中出"), 348);
        assert_eq!(engine.lexicon().total_frequency(), 60_101_964);
    }

    #[test]
    fn test_suggested_frequency_tips_segmentation() {
        let engine = Engine::new();
        let suggested = engine.suggest_frequency("出了");
        assert_eq!(suggested, 1263);
        assert_eq!(engine.add_word("出了", None, None).unwrap(), 1263);
        assert!(texts(&engine.segment("我们中出了一个叛徒", false)).contains(&"出了"));
    }

    #[test]
    fn test_merge_dictionary() {
        let engine = Engine::new();
        let report = engine.merge_dictionary("中出 10000\n坏行\n\n".as_bytes()).unwrap();
        assert_eq!(report, MergeReport { applied: 1, skipped: 1 });
        assert!(texts(&engine.segment("我们中出了一个叛徒", false)).contains(&"中出"));
        assert_eq!(engine.lexicon().lookup("中出").and_then(|e| e.tag).as_deref(), Some("vn"));
        assert_eq!(engine.suggest_frequency("中出"), 10001);
        assert!(engine.merge_dictionary(&[0xff, 0xfe]).is_err());

        engine.reset_lexicon();
        assert_eq!(engine.suggest_frequency("中出"), 348);
    }

    #[test]
    fn test_suggested_frequency_tips_word_alone() {
        let engine = Engine::new();
        let suggested = engine.suggest_frequency("京华");
        assert_eq!(engine.add_word("京华", None, None).unwrap(), suggested);
        assert_eq!(texts(&engine.segment("京华", false)), vec!["京华"]);
        // em contexto o vizinho mais forte ainda vence
        assert_eq!(texts(&engine.segment("北京华人", false)), vec!["北京", "华人"]);
    }

    #[test]
    fn test_huge_frequency_is_rejected() {
        let engine = Engine::new();
        assert!(engine.add_word("中出", Some(u64::MAX), None).is_err());
        let line = format!("中出 {}\n", u64::MAX);
        let report = engine.merge_dictionary(line.as_bytes()).unwrap();
        assert_eq!(report, MergeReport { applied: 0, skipped: 1 });
        assert_eq!(engine.lexicon().total_frequency(), 60_101_964);
        assert_eq!(engine.suggest_frequency("中出"), 348);
    }

    #[test]
    fn test_has_word() {
        let engine = Engine::new();
        assert!(engine.has_word("中国"));
        assert!(engine.has_word("开源"));
        assert!(!engine.has_word("不存在的词"));
    }

    #[test]
    fn test_segment_batch_matches_single() {
        let engine = Engine::new();
        let sentences = ["我来到北京清华大学", "南京市长江大桥", ""];
        let batch = engine.segment_batch(&sentences, true);
        assert_eq!(batch.len(), 3);
        for (sentence, segments) in sentences.iter().zip(&batch) {
            assert_eq!(segments, &engine.segment(sentence, true));
        }
    }

    #[test]
    fn test_determinism() {
        let engine = Engine::new();
        assert_eq!(engine.tag(S1, true), engine.tag(S1, true));
        assert_eq!(engine.extract_textrank(S2, 5, &[]), engine.extract_textrank(S2, 5, &[]));
    }

    #[test]
    fn test_extract_tfidf() {
        let engine = Engine::new();
        let top = engine.extract_tfidf(S1, 3, &[]);
        assert_eq!(terms(&top), vec!["北京烤鸭", "纽约", "天气"]);
        assert!((top[0].weight - 1.390487).abs() < 1e-6);
        assert!((top[1].weight - 1.121760).abs() < 1e-6);
        assert!((top[2].weight - 1.076657).abs() < 1e-6);

        let top = engine.extract_tfidf(S2, 5, &[]);
        assert_eq!(terms(&top), vec!["欧亚", "吉林", "置业", "万元", "增资"]);
        assert!((top[0].weight - 0.730014).abs() < 1e-6);
    }

    #[test]
    fn test_extract_tfidf_allowed_tags() {
        let engine = Engine::new();
        let top = engine.extract_tfidf(S2, 5, &tags(&["ns", "n", "vn", "v"]));
        assert_eq!(terms(&top), vec!["欧亚", "吉林", "置业", "增资", "实现"]);
        assert!((top[0].weight - 1.009137).abs() < 1e-6);
        assert!((top[4].weight - 0.275102).abs() < 1e-6);
    }

    #[test]
    fn test_extract_textrank() {
        let engine = Engine::new();
        let top = engine.extract_textrank(S1, 3, &[]);
        assert_eq!(terms(&top), vec!["纽约", "天气", "不好"]);
        assert!((top[0].weight - 1.940534).abs() < 1e-6);
        assert!((top[1].weight - 1.770875).abs() < 1e-6);

        let top = engine.extract_textrank(S2, 6, &tags(&["ns", "n", "vn", "v"]));
        assert_eq!(terms(&top), vec!["吉林", "欧亚", "置业", "实现", "收入", "子公司"]);
        assert!((top[0].weight - 2.688507).abs() < 1e-6);
        assert!((top[1].weight - 2.657997).abs() < 1e-6);
    }

    #[test]
    fn test_stop_words_management() {
        let engine = Engine::new();
        assert!(engine.add_stop_word("纽约"));
        assert!(!engine.add_stop_word("纽约"));
        let top = engine.extract_tfidf(S1, 3, &[]);
        assert!(!terms(&top).contains(&"纽约"));

        assert!(engine.remove_stop_word("纽约"));
        assert!(!engine.remove_stop_word("纽约"));

        engine.set_stop_words(["北京烤鸭", "天气"]);
        assert_eq!(engine.stop_words().len(), 2);
        let top = engine.extract_tfidf(S1, 1, &[]);
        assert_eq!(terms(&top), vec!["纽约"]);
    }

    #[test]
    fn test_configured_stop_words_ignore_case() {
        let text = "我是CEO，CEO很忙";
        assert!(terms(&Engine::new().extract_tfidf(text, 5, &[])).contains(&"CEO"));

        let config = EngineConfig::from_json(r#"{"keywords": {"stop_words": ["CEO"]}}"#).unwrap();
        let engine = Engine::with_config(config);
        assert!(!terms(&engine.extract_tfidf(text, 5, &[])).contains(&"CEO"));
    }

    #[test]
    fn test_load_idf_changes_ranking() {
        let engine = Engine::new();
        assert_eq!(engine.load_idf("天气 100.0\n无效\n".as_bytes()).unwrap(), 1);
        let top = engine.extract_tfidf(S1, 1, &[]);
        assert_eq!(terms(&top), vec!["天气"]);
        assert!(engine.load_idf(&[0xc3]).is_err());
    }

    #[test]
    fn test_tokenize_and_segment_all() {
        let engine = Engine::new();
        let tokens = engine.tokenize("南京市长江大桥", TokenizeMode::Default, false);
        assert_eq!(tokens.len(), 2);
        assert_eq!(engine.segment_all("我来到北京清华大学").len(), 15);
        assert_eq!(
            texts(&engine.segment_for_search("南京市长江大桥", false)),
            vec!["南京", "京市", "南京市", "长江", "大桥", "长江大桥"]
        );
        assert_eq!(engine.segment_with_mode("南京市长江大桥", CutMode::All), engine.segment_all("南京市长江大桥"));
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(Engine::global(), Engine::global()));
    }
}

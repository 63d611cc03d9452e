//! # Léxico — Palavras, Frequências e Tags
//!
//! O léxico associa cada palavra a uma frequência (≥ 1) e a uma tag
//! morfossintática opcional. A soma das frequências (`total_frequency`) é o
//! normalizador das probabilidades usadas pelo DAG: `P(w) = freq(w) / total`.
//!
//! ## Snapshots
//!
//! Leitores nunca veem um léxico pela metade. O estado vigente é um
//! [`LexiconSnapshot`] imutável atrás de um `Arc`:
//!
//! ```text
//! Lexicon
//!  ├── base:    Arc<LexiconSnapshot>         (dicionário embutido, nunca muda)
//!  └── current: RwLock<Arc<LexiconSnapshot>> (trocado inteiro a cada escrita)
//!
//! LexiconSnapshot
//!  ├── base:    Arc<WordTable>  (~350 mil palavras, compartilhado)
//!  ├── overlay: WordTable       (mutações em tempo de execução)
//!  └── total:   u64
//! ```
//!
//! Uma escrita (`insert_or_update`, `merge_from`) clona apenas o overlay,
//! aplica as mudanças e publica o novo snapshot com uma única troca de
//! ponteiro. `reset()` publica de volta o snapshot base.
//!
//! ## Formato do Dicionário
//!
//! Uma entrada por linha: `palavra frequência [tag]`, separados por espaços.
//!
//! ```text
//! 清华大学 922 nt
//! 中出 3 vn
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FenciError, Result};
use crate::segmenter;

static BASE_DICTIONARY: &str = include_str!("../data/dict.txt");

/// Maior frequência aceita para uma palavra.
pub const MAX_FREQUENCY: u64 = u32::MAX as u64;

/// Snapshot do dicionário embutido, interpretado uma vez por processo.
static BASE_SNAPSHOT: Lazy<Arc<LexiconSnapshot>> = Lazy::new(|| {
    let (table, report) = WordTable::parse(BASE_DICTIONARY);
    let snapshot = LexiconSnapshot::from_table(table);
    info!(
        palavras = snapshot.len(),
        total = snapshot.total_frequency(),
        ignoradas = report.skipped,
        "Dicionário base carregado"
    );
    Arc::new(snapshot)
});

/// Snapshot do dicionário embutido, sem mutações.
pub(crate) fn base_snapshot() -> Arc<LexiconSnapshot> {
    Arc::clone(&BASE_SNAPSHOT)
}

/// Entrada do léxico: frequência e tag opcional.
///
/// As tags do dicionário base são compartilhadas (`Arc<str>`): são apenas
/// algumas dezenas de valores distintos para centenas de milhares de palavras.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    pub frequency: u64,
    pub tag: Option<Arc<str>>,
}

/// Linha de dicionário já interpretada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryLine<'a> {
    pub word: &'a str,
    pub frequency: u64,
    pub tag: Option<&'a str>,
}

/// Resultado de um [`Lexicon::merge_from`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Linhas aplicadas ao léxico.
    pub applied: usize,
    /// Linhas malformadas que foram puladas.
    pub skipped: usize,
}

/// Interpreta uma linha `palavra frequência [tag]`.
///
/// Linhas em branco devolvem `Ok(None)`. Frequência ausente, não numérica,
/// zero ou acima de [`MAX_FREQUENCY`] torna a linha malformada.
pub fn parse_dictionary_line(line_no: usize, line: &str) -> Result<Option<DictionaryLine<'_>>> {
    let mut fields = line.split_whitespace();
    let Some(word) = fields.next() else {
        return Ok(None);
    };
    let malformed = |reason: String| FenciError::MalformedDictionaryLine { line: line_no, reason };

    let raw = fields
        .next()
        .ok_or_else(|| malformed(format!("`{word}` sem frequência")))?;
    let frequency: u64 = raw
        .parse()
        .map_err(|_| malformed(format!("frequência `{raw}` não é um inteiro")))?;
    if frequency == 0 {
        return Err(malformed(format!("`{word}` com frequência zero")));
    }
    if frequency > MAX_FREQUENCY {
        return Err(malformed(format!("`{word}` com frequência acima de {MAX_FREQUENCY}")));
    }

    Ok(Some(DictionaryLine {
        word,
        frequency,
        tag: fields.next(),
    }))
}

/// Tabela palavra → entrada, com o conjunto de prefixos próprios de cada palavra.
///
/// Os prefixos permitem ao construtor do DAG parar a varredura assim que um
/// fragmento não é nem palavra nem começo de palavra.
#[derive(Debug, Clone, Default)]
struct WordTable {
    words: HashMap<String, LexiconEntry>,
    prefixes: HashSet<String>,
}

impl WordTable {
    fn parse(text: &str) -> (Self, MergeReport) {
        let mut table = WordTable::default();
        let mut report = MergeReport::default();
        let mut tags: HashMap<&str, Arc<str>> = HashMap::new();

        for (idx, line) in text.lines().enumerate() {
            match parse_dictionary_line(idx + 1, line) {
                Ok(Some(entry)) => {
                    let tag = entry
                        .tag
                        .map(|t| tags.entry(t).or_insert_with(|| Arc::from(t)).clone());
                    table.insert(
                        entry.word,
                        LexiconEntry {
                            frequency: entry.frequency,
                            tag,
                        },
                    );
                    report.applied += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(%err, "Linha de dicionário ignorada");
                    report.skipped += 1;
                }
            }
        }
        (table, report)
    }

    fn insert(&mut self, word: &str, entry: LexiconEntry) {
        for (pos, _) in word.char_indices().skip(1) {
            if !self.prefixes.contains(&word[..pos]) {
                self.prefixes.insert(word[..pos].to_string());
            }
        }
        self.words.insert(word.to_string(), entry);
    }
}

/// Visão imutável e completa do léxico em um instante.
#[derive(Debug, Clone)]
pub struct LexiconSnapshot {
    base: Arc<WordTable>,
    overlay: WordTable,
    total: u64,
    /// Palavras do overlay que não existem na base.
    added: usize,
}

impl LexiconSnapshot {
    fn from_table(table: WordTable) -> Self {
        let total = table.words.values().map(|e| e.frequency).sum();
        Self {
            base: Arc::new(table),
            overlay: WordTable::default(),
            total,
            added: 0,
        }
    }

    pub fn lookup(&self, word: &str) -> Option<&LexiconEntry> {
        self.overlay
            .words
            .get(word)
            .or_else(|| self.base.words.get(word))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lookup(word).is_some()
    }

    pub fn frequency(&self, word: &str) -> Option<u64> {
        self.lookup(word).map(|e| e.frequency)
    }

    /// `true` se `fragment` é palavra ou prefixo próprio de alguma palavra.
    pub fn is_word_or_prefix(&self, fragment: &str) -> bool {
        self.contains(fragment)
            || self.overlay.prefixes.contains(fragment)
            || self.base.prefixes.contains(fragment)
    }

    pub fn total_frequency(&self) -> u64 {
        self.total
    }

    /// Todas as entradas vigentes, overlay primeiro.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &LexiconEntry)> + '_ {
        let overlay = self.overlay.words.iter().map(|(w, e)| (w.as_str(), e));
        let base = self
            .base
            .words
            .iter()
            .filter(|(w, _)| !self.overlay.words.contains_key(w.as_str()))
            .map(|(w, e)| (w.as_str(), e));
        overlay.chain(base)
    }

    pub fn len(&self) -> usize {
        self.base.words.len() + self.added
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frequência mínima para que `word` vença sua melhor segmentação atual.
    ///
    /// Segmenta `word` sem HMM, soma `ln(freq) - ln(total)` das peças (peças
    /// desconhecidas valem frequência 1) e devolve
    /// `floor(exp(soma + ln(total))) + 1`, limitado a [`MAX_FREQUENCY`] e nunca
    /// abaixo da frequência atual.
    ///
    /// A garantia vale para `word` isolada: gravada com essa frequência, ela
    /// vira um único segmento quando cortada sozinha. Dentro de uma frase os
    /// vizinhos podem formar uma rota melhor (`北京华人` continua
    /// `北京 / 华人` mesmo com `京华` sugerida).
    ///
    /// # Exemplo
    /// ```text
    /// "中出" → 中 (243191) + 出 (85847), total 60101964
    /// exp(ln 243191 + ln 85847 - ln 60101964) ≈ 347.4 → 348
    /// ```
    pub fn suggest_frequency(&self, word: &str) -> u64 {
        let log_total = (self.total.max(1) as f64).ln();
        let log_prob: f64 = segmenter::cut(self, word, false)
            .iter()
            .map(|seg| (self.frequency(&seg.text).unwrap_or(1) as f64).ln() - log_total)
            .sum();
        let suggested = ((log_prob + log_total).exp() as u64)
            .saturating_add(1)
            .min(MAX_FREQUENCY);
        suggested.max(self.frequency(word).unwrap_or(1))
    }

    /// Insere ou atualiza; sem tag nova, mantém a tag anterior.
    ///
    /// Falha sem alterar nada se o total estouraria `u64`.
    fn upsert(&mut self, word: &str, frequency: u64, tag: Option<Arc<str>>) -> Result<()> {
        let previous = self.lookup(word).cloned();
        let old_frequency = previous.as_ref().map_or(0, |e| e.frequency);
        let total = (self.total - old_frequency)
            .checked_add(frequency)
            .ok_or_else(|| FenciError::FrequencyOverflow {
                word: word.to_string(),
                frequency,
            })?;

        let tag = tag.or_else(|| previous.as_ref().and_then(|e| e.tag.clone()));
        if previous.is_none() {
            self.added += 1;
        }
        self.total = total;
        self.overlay.insert(word, LexiconEntry { frequency, tag });
        Ok(())
    }
}

/// Léxico compartilhado do processo: muitos leitores, um escritor por vez.
///
/// # Exemplo
/// ```rust
/// use fenci_core::lexicon::Lexicon;
///
/// let lexicon = Lexicon::from_text("北京 100 ns\n大学 80 n\n");
/// lexicon.insert_or_update("清华", Some(50), Some("nt")).unwrap();
/// assert_eq!(lexicon.total_frequency(), 230);
///
/// lexicon.reset();
/// assert!(!lexicon.contains("清华"));
/// ```
#[derive(Debug)]
pub struct Lexicon {
    base: Arc<LexiconSnapshot>,
    current: RwLock<Arc<LexiconSnapshot>>,
    writer: Mutex<()>,
}

impl Lexicon {
    /// Léxico sobre o dicionário embutido.
    pub fn new() -> Self {
        Self::from_snapshot(base_snapshot())
    }

    /// Léxico sobre um dicionário próprio (mesmo formato de linha).
    pub fn from_text(text: &str) -> Self {
        let (table, report) = WordTable::parse(text);
        if report.skipped > 0 {
            warn!(ignoradas = report.skipped, "Linhas malformadas no dicionário base");
        }
        Self::from_snapshot(Arc::new(LexiconSnapshot::from_table(table)))
    }

    fn from_snapshot(base: Arc<LexiconSnapshot>) -> Self {
        Self {
            current: RwLock::new(Arc::clone(&base)),
            base,
            writer: Mutex::new(()),
        }
    }

    /// Snapshot vigente. Uma chamada de segmentação usa um único snapshot do início ao fim.
    pub fn snapshot(&self) -> Arc<LexiconSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn lookup(&self, word: &str) -> Option<LexiconEntry> {
        self.snapshot().lookup(word).cloned()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.snapshot().contains(word)
    }

    pub fn total_frequency(&self) -> u64 {
        self.snapshot().total_frequency()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn suggest_frequency(&self, word: &str) -> u64 {
        self.snapshot().suggest_frequency(word)
    }

    /// Insere ou atualiza `word` e devolve a frequência gravada.
    ///
    /// Sem frequência (ou com zero) usa [`LexiconSnapshot::suggest_frequency`].
    /// Palavra vazia não altera nada e devolve 0. Frequência acima de
    /// [`MAX_FREQUENCY`] é recusada e o léxico fica como estava.
    pub fn insert_or_update(&self, word: &str, frequency: Option<u64>, tag: Option<&str>) -> Result<u64> {
        if word.is_empty() {
            return Ok(0);
        }
        let overflow = |frequency| FenciError::FrequencyOverflow {
            word: word.to_string(),
            frequency,
        };
        if let Some(f) = frequency.filter(|f| *f > MAX_FREQUENCY) {
            return Err(overflow(f));
        }

        let _guard = self.writer.lock();
        let current = self.snapshot();
        let frequency = frequency
            .filter(|f| *f > 0)
            .unwrap_or_else(|| current.suggest_frequency(word));

        let mut next = (*current).clone();
        next.upsert(word, frequency, tag.map(Arc::from))?;
        debug!(word, frequency, total = next.total, "Palavra gravada no léxico");
        self.publish(next);
        Ok(frequency)
    }

    /// Aplica um dicionário inteiro e publica um único snapshot ao final.
    ///
    /// Entradas existentes que não aparecem em `text` continuam intactas.
    pub fn merge_from(&self, text: &str) -> MergeReport {
        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        let mut report = MergeReport::default();

        for (idx, line) in text.lines().enumerate() {
            match parse_dictionary_line(idx + 1, line) {
                Ok(Some(entry)) => match next.upsert(entry.word, entry.frequency, entry.tag.map(Arc::from)) {
                    Ok(()) => report.applied += 1,
                    Err(err) => {
                        debug!(%err, "Linha de dicionário ignorada");
                        report.skipped += 1;
                    }
                },
                Ok(None) => {}
                Err(err) => {
                    debug!(%err, "Linha de dicionário ignorada");
                    report.skipped += 1;
                }
            }
        }

        if report.skipped > 0 {
            warn!(aplicadas = report.applied, ignoradas = report.skipped, "Merge com linhas malformadas");
        }
        debug!(aplicadas = report.applied, total = next.total, "Dicionário mesclado");
        self.publish(next);
        report
    }

    /// Volta ao snapshot base, descartando todas as mutações de uma só vez.
    pub fn reset(&self) {
        let _guard = self.writer.lock();
        *self.current.write() = Arc::clone(&self.base);
        debug!("Léxico restaurado ao dicionário base");
    }

    fn publish(&self, snapshot: LexiconSnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

//! # Erros do motor
//!
//! O motor quase nunca falha: texto vazio devolve resultado vazio e caracteres
//! desconhecidos caem no caminho do HMM ou viram segmentos de um caractere.
//! Os casos abaixo são os únicos que chegam ao chamador.

use thiserror::Error;

/// Erros produzidos pelo `fenci-core`.
#[derive(Debug, Error)]
pub enum FenciError {
    /// Linha de dicionário que não pôde ser interpretada.
    ///
    /// Durante um merge a linha é apenas pulada e contada em
    /// [`MergeReport::skipped`](crate::lexicon::MergeReport); este erro só
    /// aparece quando uma linha isolada é validada diretamente.
    #[error("linha {line} do dicionário inválida: {reason}")]
    MalformedDictionaryLine { line: usize, reason: String },

    /// Bytes de dicionário ou tabela IDF que não são UTF-8.
    #[error("fonte de dicionário não é UTF-8 válido: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Configuração JSON que não desserializa.
    #[error("configuração inválida: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// Frequência que não cabe no léxico (acima do limite ou estourando o total).
    #[error("frequência {frequency} de `{word}` excede o limite do léxico")]
    FrequencyOverflow { word: String, frequency: u64 },

    /// Recurso embutido (modelo HMM) corrompido.
    #[error("modelo embutido inválido: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, FenciError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_error_converts() {
        let bytes = [0xffu8, 0xfe];
        let err: FenciError = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(matches!(err, FenciError::InvalidUtf8(_)));
    }

    #[test]
    fn test_malformed_line_message() {
        let err = FenciError::MalformedDictionaryLine {
            line: 7,
            reason: "frequência ausente".to_string(),
        };
        assert_eq!(err.to_string(), "linha 7 do dicionário inválida: frequência ausente");
    }
}

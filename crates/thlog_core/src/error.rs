//! Erros do sistema thlog.
//!
//! Três famílias, espelhando a taxonomia de falhas do bridge:
//! - [`ParseError`] – linha descartada, o loop continua
//! - [`LogError`] – falha no arquivo CSV de saída
//! - [`BridgeError`] – falhas fatais (processo sai com status 1)

use std::io;
use std::path::PathBuf;

/// Erro de dados: a linha não produz uma leitura completa.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Linha vazia")]
    Empty,

    #[error("Linha muito longa ({0} bytes)")]
    TooLong(usize),

    #[error("Linha não é UTF-8 válido")]
    InvalidUtf8,

    #[error("JSON inválido: {0}")]
    InvalidJson(String),

    #[error("Campo ausente: {0}")]
    MissingField(&'static str),

    #[error("Campo {0} contém quebra de linha")]
    UnsafeField(&'static str),
}

/// Falha de I/O no log CSV.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Falha ao abrir {path} para append: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Falha ao escrever em {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Erros que encerram o processo.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Output(#[from] LogError),

    #[error("Falha ao abrir FIFO {path}: {source}")]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Falha ao criar FIFO {path}: {source}")]
    CreateFifo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuração inválida: {0}")]
    Config(String),
}

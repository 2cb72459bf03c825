//! # thlog Core
//!
//! Crate compartilhada do thlog: leituras de temperatura/umidade que chegam
//! como JSON por linha num named pipe e são guardadas num CSV append-only.
//!
//! ## Módulos
//! - [`types`] – `Reading`, `CsvRow` e o cabeçalho do CSV
//! - [`protocol`] – Decode/encode de linhas (`serde_json` ou varredura)
//! - [`extract`] – Extrator de campos por substring (modo `scan`)
//! - [`csv_log`] – Arquivo CSV de saída
//! - [`config`] – Configuração unificada via TOML
//! - [`fifo`] – Criação do named pipe
//! - [`error`] – Erros de dados, de I/O e fatais

pub mod config;
pub mod csv_log;
pub mod error;
pub mod extract;
pub mod fifo;
pub mod protocol;
pub mod types;

// Re-exports convenientes
pub use config::{AppConfig, BridgeConfig, EmitterConfig};
pub use csv_log::{CsvLog, Durability};
pub use error::{BridgeError, LogError, ParseError};
pub use protocol::{ParserMode, decode_line, encode_line, validate_for_csv};
pub use types::{CSV_HEADER, CsvRow, Reading};

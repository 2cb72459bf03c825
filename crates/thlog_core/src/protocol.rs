//! Protocolo de linha: um objeto JSON por linha, sem framing de tamanho.
//!
//! ```text
//! {"deviceId":"jetson01","ts":"2026-01-12T00:00:00Z","temperatureC":21.5,"humidityPct":40.2}\n
//! ```
//!
//! Dois modos de decodificação ([`ParserMode`]):
//! - `json` – decoder `serde_json` tipado (padrão)
//! - `scan` – extrator por substring de [`crate::extract`]

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::extract::{self, KEY_DEVICE_ID, KEY_HUMIDITY, KEY_TEMPERATURE, KEY_TS};
use crate::types::Reading;

/// Estratégia de decodificação das linhas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserMode {
    #[default]
    Json,
    Scan,
}

impl std::fmt::Display for ParserMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserMode::Json => f.write_str("json"),
            ParserMode::Scan => f.write_str("scan"),
        }
    }
}

/// Decodifica uma linha recebida em [`Reading`].
///
/// O terminador `\n`/`\r\n` é ignorado. Campos string são truncados em
/// [`crate::types::MAX_FIELD_BYTES`] nos dois modos.
pub fn decode_line(line: &str, mode: ParserMode) -> Result<Reading, ParseError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut reading = match mode {
        ParserMode::Json => decode_json(line)?,
        ParserMode::Scan => extract::scan_line(line)?,
    };
    reading.truncate_fields();
    Ok(reading)
}

fn decode_json(line: &str) -> Result<Reading, ParseError> {
    serde_json::from_str::<Reading>(line).map_err(|e| {
        if e.is_data() {
            if let Some(key) = missing_field(&e.to_string()) {
                return ParseError::MissingField(key);
            }
        }
        ParseError::InvalidJson(e.to_string())
    })
}

/// Mapeia `missing field `x`` do serde para a chave estática correspondente.
fn missing_field(msg: &str) -> Option<&'static str> {
    let rest = msg.strip_prefix("missing field `")?;
    let name = &rest[..rest.find('`')?];
    [KEY_DEVICE_ID, KEY_TS, KEY_TEMPERATURE, KEY_HUMIDITY]
        .into_iter()
        .find(|k| *k == name)
}

/// Rejeita campos com quebra de linha, que partiriam a linha do CSV.
///
/// Vírgulas passam sem escape: o CSV não usa aspas.
pub fn validate_for_csv(reading: &Reading) -> Result<(), ParseError> {
    let unsafe_text = |s: &str| s.contains(['\r', '\n']);
    if unsafe_text(&reading.device_id) {
        return Err(ParseError::UnsafeField(KEY_DEVICE_ID));
    }
    if unsafe_text(&reading.ts) {
        return Err(ParseError::UnsafeField(KEY_TS));
    }
    Ok(())
}

/// Codifica uma leitura como linha JSON terminada em `\n`.
pub fn encode_line(reading: &Reading) -> Result<String, ParseError> {
    let mut line =
        serde_json::to_string(reading).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

//! Tipos de dados das leituras de temperatura/umidade.
//!
//! Uma [`Reading`] vive só durante o processamento de uma linha; o que fica
//! persistido é a projeção [`CsvRow`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::extract::parse_float_prefix;

/// Cabeçalho do CSV, escrito uma única vez quando o arquivo é criado.
pub const CSV_HEADER: &str = "epoch,iso_ts,deviceId,temperatureC,humidityPct";

/// Capacidade máxima (bytes) dos campos string `deviceId` e `ts`.
pub const MAX_FIELD_BYTES: usize = 63;

// ──────────────────────────────────────────────
// Reading
// ──────────────────────────────────────────────

/// Leitura de um sensor, como enviada pelo produtor.
///
/// Formato da linha:
/// `{"deviceId":"jetson01","ts":"2026-01-12T00:00:00Z","temperatureC":21.5,"humidityPct":40.2}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Identificador do dispositivo (ex: "jetson01")
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// Timestamp ISO-8601 do produtor, mantido literal
    pub ts: String,
    /// Temperatura (°C)
    #[serde(rename = "temperatureC", deserialize_with = "lenient_f64")]
    pub temperature_c: f64,
    /// Umidade relativa (%)
    #[serde(rename = "humidityPct", deserialize_with = "lenient_f64")]
    pub humidity_pct: f64,
}

impl Reading {
    /// Monta uma leitura a partir dos registradores Modbus brutos (décimos).
    pub fn from_registers(
        device_id: impl Into<String>,
        ts: impl Into<String>,
        raw_temp: u16,
        raw_humi: u16,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            ts: ts.into(),
            temperature_c: round2(f64::from(raw_temp) / 10.0),
            humidity_pct: round2(f64::from(raw_humi) / 10.0),
        }
    }

    /// Trunca `deviceId` e `ts` para [`MAX_FIELD_BYTES`].
    pub(crate) fn truncate_fields(&mut self) {
        truncate_utf8(&mut self.device_id, MAX_FIELD_BYTES);
        truncate_utf8(&mut self.ts, MAX_FIELD_BYTES);
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Trunca `s` em no máximo `max` bytes sem cortar um caractere ao meio.
pub(crate) fn truncate_utf8(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

/// Aceita número JSON ou string numérica (parse permissivo, 0.0 se inválida).
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrText {
        Num(f64),
        Text(String),
    }

    Ok(match NumOrText::deserialize(deserializer)? {
        NumOrText::Num(v) => v,
        NumOrText::Text(s) => parse_float_prefix(&s),
    })
}

// ──────────────────────────────────────────────
// CsvRow
// ──────────────────────────────────────────────

/// Linha persistida: leitura carimbada com o horário de recebimento.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// Horário de recebimento (Unix, segundos)
    pub epoch: i64,
    pub reading: Reading,
}

impl CsvRow {
    pub fn new(epoch: i64, reading: Reading) -> Self {
        Self { epoch, reading }
    }

    /// Renderiza `epoch,iso_ts,deviceId,temperatureC,humidityPct\n`.
    pub fn format(&self) -> String {
        format!(
            "{},{},{},{},{}\n",
            self.epoch,
            self.reading.ts,
            self.reading.device_id,
            fmt_2dp(self.reading.temperature_c),
            fmt_2dp(self.reading.humidity_pct)
        )
    }
}

/// Duas casas decimais; não-finitos como `nan`, `inf`, `-inf`.
fn fmt_2dp(v: f64) -> String {
    if v.is_nan() {
        "nan".into()
    } else {
        format!("{v:.2}")
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

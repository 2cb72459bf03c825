//! Extrator de campos por varredura de substring (modo `scan`).
//!
//! Não é um parser JSON: procura a primeira ocorrência da chave entre aspas,
//! o `:` seguinte e lê o valor logo depois. Não valida estrutura nem trata
//! escapes. Se o texto da chave aparecer dentro de outro valor, o resultado
//! fica errado. O modo padrão é o decoder `serde_json` em [`crate::protocol`];
//! este modo existe para produtores que emitem linhas "quase JSON".

use crate::error::ParseError;
use crate::types::{MAX_FIELD_BYTES, Reading, truncate_utf8};

/// Chaves exigidas em toda linha.
pub const KEY_DEVICE_ID: &str = "deviceId";
pub const KEY_TS: &str = "ts";
pub const KEY_TEMPERATURE: &str = "temperatureC";
pub const KEY_HUMIDITY: &str = "humidityPct";

/// Posiciona no valor de `key`: após o `:` e espaços/tabs.
fn value_after_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let quoted = format!("\"{key}\"");
    let kpos = line.find(&quoted)?;
    let after_key = &line[kpos..];
    let colon = after_key.find(':')?;
    Some(after_key[colon + 1..].trim_start_matches([' ', '\t']))
}

/// Extrai um campo string (`"key":"valor"`), truncado em [`MAX_FIELD_BYTES`].
pub fn extract_string_field(line: &str, key: &str) -> Option<String> {
    let value = value_after_key(line, key)?.strip_prefix('"')?;
    let end = value.find('"')?;
    let mut out = value[..end].to_string();
    truncate_utf8(&mut out, MAX_FIELD_BYTES);
    Some(out)
}

/// Extrai um campo numérico. Texto não numérico vale 0.0.
pub fn extract_float_field(line: &str, key: &str) -> Option<f64> {
    value_after_key(line, key).map(parse_float_prefix)
}

/// Lê o maior prefixo que forma um float (semântica de `strtod`).
///
/// Aceita sinal, parte inteira, fração e expoente; `inf`, `infinity` e `nan`
/// sem diferenciar maiúsculas. Sem prefixo numérico retorna 0.0.
pub fn parse_float_prefix(s: &str) -> f64 {
    let t = s.trim_start();
    let b = t.as_bytes();
    let mut i = 0;

    let negative = matches!(b.first(), Some(b'-'));
    if matches!(b.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let rest = &t[i..];
    if starts_with_ignore_case(rest, "inf") {
        return if negative { f64::NEG_INFINITY } else { f64::INFINITY };
    }
    if starts_with_ignore_case(rest, "nan") {
        return f64::NAN;
    }

    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < b.len() && b[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }

    if digits == 0 {
        return 0.0;
    }

    // Expoente só conta se vier seguido de dígitos
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    t[..i].parse().unwrap_or(0.0)
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Extrai os quatro campos. Qualquer campo ausente descarta a linha inteira.
pub fn scan_line(line: &str) -> Result<Reading, ParseError> {
    let device_id =
        extract_string_field(line, KEY_DEVICE_ID).ok_or(ParseError::MissingField(KEY_DEVICE_ID))?;
    let ts = extract_string_field(line, KEY_TS).ok_or(ParseError::MissingField(KEY_TS))?;
    let temperature_c = extract_float_field(line, KEY_TEMPERATURE)
        .ok_or(ParseError::MissingField(KEY_TEMPERATURE))?;
    let humidity_pct = extract_float_field(line, KEY_HUMIDITY)
        .ok_or(ParseError::MissingField(KEY_HUMIDITY))?;

    Ok(Reading {
        device_id,
        ts,
        temperature_c,
        humidity_pct,
    })
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

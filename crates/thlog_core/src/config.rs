//! Configuração unificada via TOML.
//!
//! Sem arquivo de configuração o bridge roda com os valores fixos de fábrica
//! (`/tmp/th_fifo` → `th_buffer.csv`); o `config.toml` só sobrescreve.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::csv_log::Durability;
use crate::protocol::ParserMode;

/// Variável de ambiente que aponta para um config.toml alternativo.
pub const CONFIG_ENV: &str = "THLOG_CONFIG";

/// Caminho padrão do FIFO compartilhado entre produtor e bridge.
pub const DEFAULT_FIFO_PATH: &str = "/tmp/th_fifo";

/// Configuração do Bridge (FIFO → CSV).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Caminho do FIFO de entrada
    pub fifo_path: PathBuf,
    /// CSV de saída (relativo ao diretório de trabalho)
    pub output_csv: PathBuf,
    /// Decoder das linhas: "json" ou "scan"
    pub parser: ParserMode,
    /// Pausa após erro transitório de leitura (segundos)
    pub retry_delay_secs: f64,
    /// Tamanho máximo de uma linha (bytes)
    pub max_line_bytes: usize,
    /// "flush" ou "fsync" após cada linha
    pub durability: Durability,
    /// Cria o FIFO se não existir
    pub create_fifo: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
            output_csv: PathBuf::from("th_buffer.csv"),
            parser: ParserMode::Json,
            retry_delay_secs: 1.0,
            max_line_bytes: 4096,
            durability: Durability::Flush,
            create_fifo: false,
        }
    }
}

impl BridgeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_secs)
    }
}

/// Configuração do Emitter (sensor simulado → FIFO).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Caminho do FIFO de saída
    pub fifo_path: PathBuf,
    /// `deviceId` enviado em cada leitura
    pub device_id: String,
    /// Intervalo entre leituras (segundos)
    pub interval_secs: f64,
    /// Cria o FIFO (modo 0666) se não existir
    pub create_fifo: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
            device_id: "jetson01".into(),
            interval_secs: 2.0,
            create_fifo: true,
        }
    }
}

/// Configuração raiz (bridge + emitter).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bridge: BridgeConfig,
    pub emitter: EmitterConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho do config.toml: `$THLOG_CONFIG` ou ao lado do executável.
    pub fn default_path() -> PathBuf {
        if let Some(p) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let b = &self.bridge;
        let e = &self.emitter;

        if b.fifo_path.as_os_str().is_empty() {
            errors.push("bridge.fifo_path vazio".into());
        }
        if b.output_csv.as_os_str().is_empty() {
            errors.push("bridge.output_csv vazio".into());
        }
        if !(0.0..=60.0).contains(&b.retry_delay_secs) {
            errors.push(format!(
                "bridge.retry_delay_secs inválido: {} (0.0–60.0)",
                b.retry_delay_secs
            ));
        }
        if b.max_line_bytes < 64 {
            errors.push(format!(
                "bridge.max_line_bytes muito pequeno: {} (mínimo 64)",
                b.max_line_bytes
            ));
        }
        if e.fifo_path.as_os_str().is_empty() {
            errors.push("emitter.fifo_path vazio".into());
        }
        if e.device_id.is_empty() {
            errors.push("emitter.device_id vazio".into());
        }
        if !(0.1..=3600.0).contains(&e.interval_secs) {
            errors.push(format!(
                "emitter.interval_secs inválido: {} (0.1–3600.0)",
                e.interval_secs
            ));
        }

        errors
    }
}

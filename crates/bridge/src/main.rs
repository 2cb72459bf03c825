//! # thlog Bridge
//!
//! Lê leituras JSON (uma por linha) de um named pipe e grava cada uma como
//! linha de um CSV append-only, carimbada com o horário de recebimento.
//!
//! Quando o produtor desconecta, o FIFO é reaberto e o processo volta a
//! esperar por um novo writer. Só termina (status 1) se não conseguir abrir
//! o CSV ou o FIFO.
//!
//! ## Uso
//! ```bash
//! thlog_bridge                                 # /tmp/th_fifo → ./th_buffer.csv
//! THLOG_CONFIG=./config.toml thlog_bridge      # config alternativo
//! RUST_LOG=debug thlog_bridge
//! ```

mod session;
mod source;

use session::{BridgeSession, SystemClock};
use source::FifoSource;
use std::convert::Infallible;
use std::process::ExitCode;
use thlog_core::config::AppConfig;
use thlog_core::fifo::ensure_fifo;
use thlog_core::{BridgeError, CsvLog};
use tracing::{error, info};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Config ──
    let config = AppConfig::load(&AppConfig::default_path());

    match run(&config) {
        Ok(never) => match never {},
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig) -> Result<Infallible, BridgeError> {
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config: {e}");
        }
        return Err(BridgeError::Config(errors.join("; ")));
    }

    let cfg = &config.bridge;

    // ── CSV de saída ──
    let log = CsvLog::open(&cfg.output_csv, cfg.durability)?;

    // ── FIFO de entrada ──
    if cfg.create_fifo {
        ensure_fifo(&cfg.fifo_path).map_err(|source| BridgeError::CreateFifo {
            path: cfg.fifo_path.clone(),
            source,
        })?;
    }

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌡️  THLOG BRIDGE – FIFO → CSV");
    println!("══════════════════════════════════════════════");
    println!("  FIFO:      {}", cfg.fifo_path.display());
    let novo = if log.created() { " (novo)" } else { "" };
    println!("  CSV:       {}{novo}", cfg.output_csv.display());
    println!("  Parser:    {}", cfg.parser);
    println!("══════════════════════════════════════════════");
    println!();

    info!("Abrindo FIFO para leitura: {}", cfg.fifo_path.display());
    info!("Aguardando writer...");
    let source = FifoSource::open(&cfg.fifo_path)?;
    info!("Writer conectado");

    BridgeSession::new(source, log, SystemClock, cfg).run()
}

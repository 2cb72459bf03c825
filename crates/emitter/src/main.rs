//! # thlog Emitter
//!
//! Produtor de bancada: gera leituras de um sensor simulado e as escreve
//! como JSON (uma por linha) no FIFO lido pelo bridge.
//!
//! A abertura do FIFO bloqueia até o bridge estar lendo. Se o bridge sair,
//! a escrita falha com `BrokenPipe` e o emitter volta a esperar.
//!
//! ## Uso
//! ```bash
//! thlog_emitter                   # Normal
//! thlog_emitter --write-config    # Salva config.toml padrão e sai
//! ```

mod sensor;

use chrono::{SecondsFormat, Utc};
use sensor::SimulatedSensor;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use thlog_core::config::{AppConfig, EmitterConfig};
use thlog_core::encode_line;
use thlog_core::fifo::ensure_fifo;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path);

    if std::env::args().any(|a| a == "--write-config") {
        return match config.save(&config_path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Não foi possível salvar config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config: {e}");
        }
        return ExitCode::FAILURE;
    }

    let cfg = &config.emitter;

    if cfg.create_fifo {
        if let Err(e) = ensure_fifo(&cfg.fifo_path) {
            error!("Falha ao criar FIFO {}: {e}", cfg.fifo_path.display());
            return ExitCode::FAILURE;
        }
    }

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌡️  THLOG EMITTER – SENSOR SIMULADO");
    println!("══════════════════════════════════════════════");
    println!("  FIFO:      {}", cfg.fifo_path.display());
    println!("  Device:    {}", cfg.device_id);
    println!("  Intervalo: {:.1}s", cfg.interval_secs);
    println!("══════════════════════════════════════════════");
    println!();

    let mut sensor = SimulatedSensor::new();

    // ── Loop principal ──
    loop {
        info!(
            "Aguardando FIFO: {} (inicie o bridge primeiro)",
            cfg.fifo_path.display()
        );
        let mut fifo = match OpenOptions::new().write(true).open(&cfg.fifo_path) {
            Ok(f) => f,
            Err(e) => {
                error!("Falha ao abrir FIFO {}: {e}", cfg.fifo_path.display());
                return ExitCode::FAILURE;
            }
        };
        info!("FIFO conectado (emitter → bridge)");

        let e = emit_until_broken(&mut fifo, &mut sensor, cfg);
        warn!("Bridge desconectou ({e}). Reabrindo FIFO...");
    }
}

/// Escreve leituras até o leitor fechar o FIFO; retorna o erro de pipe.
fn emit_until_broken(
    fifo: &mut File,
    sensor: &mut SimulatedSensor,
    cfg: &EmitterConfig,
) -> io::Error {
    let interval = Duration::from_secs_f64(cfg.interval_secs);

    loop {
        let cycle_start = Instant::now();

        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let reading = sensor.collect(&cfg.device_id, ts);

        match encode_line(&reading) {
            Ok(line) => match fifo.write_all(line.as_bytes()).and_then(|()| fifo.flush()) {
                Ok(()) => info!(
                    "→ [{}] {} | 🌡️ {:.1}°C | 💧 {:.1}%",
                    reading.ts, reading.device_id, reading.temperature_c, reading.humidity_pct
                ),
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return e,
                Err(e) => error!("Erro ao escrever no FIFO: {e}"),
            },
            Err(e) => error!("Erro ao serializar leitura: {e}"),
        }

        // Dormir pelo tempo restante do intervalo
        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }
}

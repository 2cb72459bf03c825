//! Sessão de ingestão: FIFO → parse → CSV.
//!
//! Máquina de estados de uma volta do loop:
//!
//! ```text
//! AWAITING_LINE ──linha──▶ PARSING ──ok──▶ APPENDING ──▶ AWAITING_LINE
//!       │                     └──falha──▶ (log, descarta) ──▶ AWAITING_LINE
//!       └──EOF──▶ REOPENING (bloqueia até novo writer) ──▶ AWAITING_LINE
//! ```

use std::borrow::Cow;
use std::time::Duration;
use thlog_core::types::CsvRow;
use thlog_core::{BridgeConfig, CsvLog, ParseError, ParserMode, decode_line, validate_for_csv};
use tracing::{debug, error, info, warn};

use crate::source::LineSource;

/// Fonte do horário de recebimento.
pub trait Clock {
    /// Segundos Unix (UTC).
    fn now_epoch(&self) -> i64;
}

/// Relógio de parede do sistema.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Contadores da sessão.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub accepted: u64,
    pub rejected: u64,
    pub reopens: u64,
    pub read_errors: u64,
}

/// Resultado de uma volta do loop.
#[derive(Debug)]
pub enum Step {
    /// Linha gravada no CSV
    Appended(CsvRow),
    /// Linha descartada (erro de dados)
    Rejected(ParseError),
    /// Restante de uma linha longa demais, descartado
    Discarded,
    /// Leitura válida, mas a escrita no CSV falhou
    WriteFailed,
    /// EOF: FIFO reaberto com novo writer
    Reopened,
    /// EOF: reabertura falhou, nova tentativa na próxima volta
    ReopenFailed,
    /// Leitura interrompida por sinal
    Interrupted,
    /// Erro transitório de leitura
    ReadError,
}

/// Dona dos dois handles de longa duração (FIFO e CSV).
pub struct BridgeSession<S: LineSource, C: Clock> {
    source: S,
    log: CsvLog,
    clock: C,
    parser: ParserMode,
    retry_delay: Duration,
    max_line_bytes: usize,
    stats: BridgeStats,
    /// Descartando o restante de uma linha que passou do limite
    skipping: bool,
    buf: Vec<u8>,
}

impl<S: LineSource, C: Clock> BridgeSession<S, C> {
    pub fn new(source: S, log: CsvLog, clock: C, config: &BridgeConfig) -> Self {
        Self {
            source,
            log,
            clock,
            parser: config.parser,
            retry_delay: config.retry_delay(),
            max_line_bytes: config.max_line_bytes,
            stats: BridgeStats::default(),
            skipping: false,
            buf: Vec::with_capacity(config.max_line_bytes),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Loop principal. Não retorna.
    pub fn run(mut self) -> ! {
        loop {
            match self.step() {
                Step::Appended(row) => {
                    let r = &row.reading;
                    info!(
                        "buffered(csv): epoch={} iso={} dev={} temp={:.2} hum={:.2}",
                        row.epoch, r.ts, r.device_id, r.temperature_c, r.humidity_pct
                    );
                }
                Step::Rejected(e) => {
                    debug!("{} linhas rejeitadas até agora (última: {e})", self.stats.rejected);
                }
                _ => {}
            }
        }
    }

    /// Executa uma volta do loop.
    pub fn step(&mut self) -> Step {
        self.buf.clear();
        match self.source.read_line(&mut self.buf, self.max_line_bytes) {
            Ok(0) => self.reopen(),
            Ok(n) => self.handle_chunk(n),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Step::Interrupted,
            Err(e) => {
                warn!("Erro de leitura no FIFO: {e}. Tentando novamente em {:?}", self.retry_delay);
                self.stats.read_errors += 1;
                std::thread::sleep(self.retry_delay);
                Step::ReadError
            }
        }
    }

    fn reopen(&mut self) -> Step {
        // Um resto de linha longa não sobrevive ao fim do writer
        self.skipping = false;
        let s = self.stats();
        warn!(
            "FIFO EOF (writer fechou). Reabrindo... \
             [aceitas={} rejeitadas={} erros={} reaberturas={}]",
            s.accepted, s.rejected, s.read_errors, s.reopens
        );

        match self.source.reopen() {
            Ok(()) => {
                self.stats.reopens += 1;
                info!("FIFO reaberto, writer conectado");
                Step::Reopened
            }
            Err(e) => {
                error!("Falha ao reabrir FIFO: {e}");
                std::thread::sleep(self.retry_delay);
                Step::ReopenFailed
            }
        }
    }

    fn handle_chunk(&mut self, n: usize) -> Step {
        let complete = self.buf.ends_with(b"\n");

        if self.skipping {
            if complete {
                self.skipping = false;
            }
            debug!("Descartando {n} bytes de linha longa");
            return Step::Discarded;
        }

        if !complete && n >= self.max_line_bytes {
            self.skipping = true;
            return self.reject(ParseError::TooLong(n));
        }

        // No modo scan, bytes inválidos fora dos quatro campos não impedem a extração
        let line = String::from_utf8_lossy(&self.buf);
        if matches!(line, Cow::Owned(_)) && self.parser == ParserMode::Json {
            warn!("Linha descartada: {}", ParseError::InvalidUtf8);
            self.stats.rejected += 1;
            return Step::Rejected(ParseError::InvalidUtf8);
        }

        let reading = match decode_line(&line, self.parser)
            .and_then(|r| validate_for_csv(&r).map(|()| r))
        {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Parse falhou ({e}): {}", line.trim_end());
                self.stats.rejected += 1;
                return Step::Rejected(e);
            }
        };

        let row = CsvRow::new(self.clock.now_epoch(), reading);
        if let Err(e) = self.log.append(&row) {
            error!("{e}. Leitura descartada");
            return Step::WriteFailed;
        }

        self.stats.accepted += 1;
        Step::Appended(row)
    }

    fn reject(&mut self, e: ParseError) -> Step {
        warn!("Linha descartada: {e}");
        self.stats.rejected += 1;
        Step::Rejected(e)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::path::Path;
    use thlog_core::{CSV_HEADER, Durability};

    const EXAMPLE: &str = "{\"deviceId\":\"jetson01\",\"ts\":\"2026-01-12T00:00:00Z\",\"temperatureC\":21.5,\"humidityPct\":40.2}\n";

    enum Event {
        Data(Vec<u8>),
        Eof,
        Fail(io::ErrorKind),
    }

    /// Fonte roteirizada: cada `Eof` representa um writer que desconectou.
    #[derive(Default)]
    struct ScriptedSource {
        events: VecDeque<Event>,
        reopens: usize,
        fail_reopen: bool,
    }

    impl ScriptedSource {
        fn line(mut self, s: &str) -> Self {
            self.events.push_back(Event::Data(s.as_bytes().to_vec()));
            self
        }

        fn bytes(mut self, b: &[u8]) -> Self {
            self.events.push_back(Event::Data(b.to_vec()));
            self
        }

        fn eof(mut self) -> Self {
            self.events.push_back(Event::Eof);
            self
        }

        fn fail(mut self, kind: io::ErrorKind) -> Self {
            self.events.push_back(Event::Fail(kind));
            self
        }
    }

    impl LineSource for ScriptedSource {
        fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize> {
            match self.events.pop_front() {
                None | Some(Event::Eof) => Ok(0),
                Some(Event::Fail(kind)) => Err(io::Error::from(kind)),
                Some(Event::Data(mut data)) => {
                    if data.len() > limit {
                        let rest = data.split_off(limit);
                        self.events.push_front(Event::Data(rest));
                    }
                    buf.extend_from_slice(&data);
                    Ok(data.len())
                }
            }
        }

        fn reopen(&mut self) -> io::Result<()> {
            if self.fail_reopen {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            self.reopens += 1;
            Ok(())
        }
    }

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_epoch(&self) -> i64 {
            self.0
        }
    }

    fn config(parser: ParserMode) -> BridgeConfig {
        BridgeConfig {
            parser,
            retry_delay_secs: 0.0,
            max_line_bytes: 256,
            ..Default::default()
        }
    }

    fn session(
        source: ScriptedSource,
        csv: &Path,
        parser: ParserMode,
    ) -> BridgeSession<ScriptedSource, FixedClock> {
        let log = CsvLog::open(csv, Durability::Flush).unwrap();
        BridgeSession::new(source, log, FixedClock(1_768_262_400), &config(parser))
    }

    fn csv_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn documented_example_produces_documented_row() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("th_buffer.csv");

        for parser in [ParserMode::Json, ParserMode::Scan] {
            let _ = std::fs::remove_file(&csv);
            let mut s = session(ScriptedSource::default().line(EXAMPLE), &csv, parser);
            assert!(matches!(s.step(), Step::Appended(_)));
            drop(s);

            assert_eq!(
                csv_lines(&csv),
                vec![
                    CSV_HEADER.to_string(),
                    "1768262400,2026-01-12T00:00:00Z,jetson01,21.50,40.20".to_string(),
                ]
            );
        }
    }

    #[test]
    fn partial_reading_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let source =
            ScriptedSource::default().line("{\"deviceId\":\"jetson01\",\"temperatureC\":21.5}\n");
        let mut s = session(source, &csv, ParserMode::Json);

        assert!(matches!(s.step(), Step::Rejected(ParseError::MissingField(_))));
        assert_eq!(s.stats().rejected, 1);
        drop(s);
        assert_eq!(csv_lines(&csv), vec![CSV_HEADER.to_string()]);
    }

    #[test]
    fn row_count_equals_accepted_readings() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let source = ScriptedSource::default()
            .line(EXAMPLE)
            .line("garbage\n")
            .line(EXAMPLE)
            .line("\n")
            .line(EXAMPLE);
        let mut s = session(source, &csv, ParserMode::Json);

        for _ in 0..5 {
            s.step();
        }
        assert_eq!(s.stats().accepted, 3);
        assert_eq!(s.stats().rejected, 2);
        drop(s);
        assert_eq!(csv_lines(&csv).len(), 3 + 1);
    }

    #[test]
    fn eof_reopens_and_keeps_delivering() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let source = ScriptedSource::default().line(EXAMPLE).eof().line(EXAMPLE);
        let mut s = session(source, &csv, ParserMode::Json);

        assert!(matches!(s.step(), Step::Appended(_)));
        assert!(matches!(s.step(), Step::Reopened));
        assert!(matches!(s.step(), Step::Appended(_)));
        assert_eq!(s.stats().reopens, 1);
        assert_eq!(s.source.reopens, 1);
    }

    #[test]
    fn failed_reopen_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let mut source = ScriptedSource::default().eof();
        source.fail_reopen = true;
        let mut s = session(source, &csv, ParserMode::Json);

        assert!(matches!(s.step(), Step::ReopenFailed));
        assert!(matches!(s.step(), Step::ReopenFailed));
        s.source.fail_reopen = false;
        assert!(matches!(s.step(), Step::Reopened));
    }

    #[test]
    fn transient_read_error_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let source = ScriptedSource::default()
            .fail(io::ErrorKind::Interrupted)
            .fail(io::ErrorKind::Other)
            .line(EXAMPLE);
        let mut s = session(source, &csv, ParserMode::Json);

        assert!(matches!(s.step(), Step::Interrupted));
        assert!(matches!(s.step(), Step::ReadError));
        assert!(matches!(s.step(), Step::Appended(_)));
        assert_eq!(s.stats().read_errors, 1);
        assert_eq!(s.source.reopens, 0);
    }

    #[test]
    fn overlong_line_is_dropped_whole() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let long = format!("{}\n", "x".repeat(600));
        let source = ScriptedSource::default().line(&long).line(EXAMPLE);
        let mut s = session(source, &csv, ParserMode::Json);

        assert!(matches!(s.step(), Step::Rejected(ParseError::TooLong(256))));
        assert!(matches!(s.step(), Step::Discarded));
        assert!(matches!(s.step(), Step::Discarded));
        assert!(matches!(s.step(), Step::Appended(_)));
    }

    #[test]
    fn invalid_utf8_is_rejected_in_json_mode() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let line = b"{\"note\":\"\xff\",\"deviceId\":\"d\",\"ts\":\"t\",\"temperatureC\":1,\"humidityPct\":2}\n";
        let mut s = session(ScriptedSource::default().bytes(line), &csv, ParserMode::Json);

        assert!(matches!(s.step(), Step::Rejected(ParseError::InvalidUtf8)));
    }

    #[test]
    fn scan_mode_tolerates_invalid_utf8_in_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let line = b"{\"note\":\"\xff\",\"deviceId\":\"d\",\"ts\":\"t\",\"temperatureC\":1,\"humidityPct\":2}\n";
        let mut s = session(ScriptedSource::default().bytes(line), &csv, ParserMode::Scan);

        assert!(matches!(s.step(), Step::Appended(_)));
        drop(s);
        assert_eq!(csv_lines(&csv)[1], "1768262400,t,d,1.00,2.00");
    }

    #[test]
    fn comma_in_device_id_is_written_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let line = "{\"deviceId\":\"lab,2\",\"ts\":\"t\",\"temperatureC\":1,\"humidityPct\":2}\n";

        for parser in [ParserMode::Json, ParserMode::Scan] {
            let _ = std::fs::remove_file(&csv);
            let mut s = session(ScriptedSource::default().line(line), &csv, parser);
            assert!(matches!(s.step(), Step::Appended(_)));
            drop(s);
            assert_eq!(csv_lines(&csv)[1], "1768262400,t,lab,2,1.00,2.00");
        }
    }

    #[test]
    fn line_break_in_device_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let line = "{\"deviceId\":\"a\\nb\",\"ts\":\"t\",\"temperatureC\":1,\"humidityPct\":2}\n";
        let mut s = session(ScriptedSource::default().line(line), &csv, ParserMode::Json);

        assert!(matches!(s.step(), Step::Rejected(ParseError::UnsafeField("deviceId"))));
        drop(s);
        assert_eq!(csv_lines(&csv).len(), 1);
    }

    #[test]
    fn restart_on_existing_csv_appends_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("out.csv");

        for _ in 0..2 {
            let mut s = session(ScriptedSource::default().line(EXAMPLE), &csv, ParserMode::Json);
            assert!(matches!(s.step(), Step::Appended(_)));
        }

        let lines = csv_lines(&csv);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines.iter().filter(|l| l.as_str() == CSV_HEADER).count(), 1);
    }
}

//! Endpoint de entrada: linhas lidas de um named pipe.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thlog_core::BridgeError;

/// Fonte de linhas que pode ser reaberta após fim de stream.
pub trait LineSource {
    /// Lê até `\n` (inclusive) ou no máximo `limit` bytes.
    /// `Ok(0)` significa fim de stream (produtor desconectou).
    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize>;

    /// Fecha e reabre a entrada. Pode bloquear até um produtor conectar.
    fn reopen(&mut self) -> io::Result<()>;
}

/// Leitor do FIFO, em modo bloqueante.
pub struct FifoSource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
}

impl FifoSource {
    /// Abre o FIFO. Bloqueia até um writer conectar (comportamento normal).
    pub fn open(path: &Path) -> Result<Self, BridgeError> {
        let file = File::open(path).map_err(|source| BridgeError::OpenInput {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(BufReader::new(file)),
        })
    }
}

impl LineSource for FifoSource {
    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.by_ref().take(limit as u64).read_until(b'\n', buf),
            // Reabertura anterior falhou: sinaliza EOF para tentar de novo
            None => Ok(0),
        }
    }

    fn reopen(&mut self) -> io::Result<()> {
        self.reader = None;
        let file = File::open(&self.path)?;
        self.reader = Some(BufReader::new(file));
        Ok(())
    }
}

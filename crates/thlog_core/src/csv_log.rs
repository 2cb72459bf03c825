//! Log CSV append-only.
//!
//! O arquivo é criado uma vez (com cabeçalho) e depois só recebe appends.
//! Cada linha é montada inteira antes de um único `write_all`, seguido de
//! flush, então nunca há linha parcial vinda de uma formatação incompleta.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::LogError;
use crate::types::{CSV_HEADER, CsvRow};

/// Quanto garantir após cada linha.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Flush para o kernel a cada linha
    #[default]
    Flush,
    /// Flush + `fsync` a cada linha (sobrevive a queda de energia)
    Fsync,
}

/// Handle do CSV de saída, mantido aberto durante toda a sessão.
#[derive(Debug)]
pub struct CsvLog {
    file: File,
    path: PathBuf,
    durability: Durability,
    created: bool,
    rows_written: u64,
}

impl CsvLog {
    /// Abre (ou cria) o CSV para append.
    ///
    /// O cabeçalho é escrito se, e somente se, o arquivo não existia antes.
    pub fn open(path: &Path, durability: Durability) -> Result<Self, LogError> {
        let created = !path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LogError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut log = Self {
            file,
            path: path.to_path_buf(),
            durability,
            created,
            rows_written: 0,
        };

        if created {
            log.write_line(&format!("{CSV_HEADER}\n"))?;
            info!("CSV criado com cabeçalho: {}", path.display());
        } else {
            debug!("CSV existente, sem novo cabeçalho: {}", path.display());
        }

        Ok(log)
    }

    /// Acrescenta uma linha e faz flush imediatamente.
    pub fn append(&mut self, row: &CsvRow) -> Result<(), LogError> {
        self.write_line(&row.format())?;
        self.rows_written += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), LogError> {
        let write_err = |source: std::io::Error| LogError::Write {
            path: self.path.clone(),
            source,
        };
        self.file.write_all(line.as_bytes()).map_err(write_err)?;
        self.file.flush().map_err(write_err)?;
        if self.durability == Durability::Fsync {
            self.file.sync_data().map_err(write_err)?;
        }
        Ok(())
    }

    /// `true` se esta abertura criou o arquivo (e escreveu o cabeçalho).
    pub fn created(&self) -> bool {
        self.created
    }

    /// Linhas de dados escritas por este handle.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl Drop for CsvLog {
    fn drop(&mut self) {
        let _ = self.file.flush();
        debug!(
            "CSV fechado: {} ({} linhas nesta sessão)",
            self.path.display(),
            self.rows_written
        );
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

//! Criação do named pipe compartilhado entre produtor e bridge.

use std::io;
use std::path::Path;
use tracing::info;

/// Garante que `path` é um FIFO. Retorna `true` se foi criado agora.
///
/// Um caminho existente que não é FIFO é erro (`AlreadyExists`).
#[cfg(unix)]
pub fn ensure_fifo(path: &Path) -> io::Result<bool> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};

    match std::fs::metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => return Ok(false),
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} existe e não é um FIFO", path.display()),
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: c_path é uma string C válida e terminada em NUL.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        // Outro processo criou entre o metadata() e o mkfifo()
        if err.raw_os_error() == Some(libc::EEXIST) {
            return Ok(false);
        }
        return Err(err);
    }

    // mkfifo respeita a umask; o leitor e o escritor podem ser usuários diferentes
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666))?;
    info!("FIFO criado: {}", path.display());
    Ok(true)
}

#[cfg(not(unix))]
pub fn ensure_fifo(path: &Path) -> io::Result<bool> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("named pipes não suportados nesta plataforma: {}", path.display()),
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::FileTypeExt;

    #[test]
    fn creates_fifo_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("th_fifo");

        assert!(ensure_fifo(&path).unwrap());
        assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());
        assert!(!ensure_fifo(&path).unwrap());
    }

    #[test]
    fn regular_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_fifo");
        std::fs::write(&path, "x").unwrap();

        let err = ensure_fifo(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }
}

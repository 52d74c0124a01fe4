//! Configuration: reads the `[configuration]` section of an INI file per
//! §4.7. Validation happens eagerly at startup so every other component
//! can treat `Config` as already-correct.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_unpack_directory: PathBuf,
    pub temporary_directory: Option<PathBuf>,
    /// Resolved worker count: `threads` clamped to the CPU count, with 0
    /// or an absent key meaning "use every CPU".
    pub threads: usize,
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let ini = ini::Ini::load_from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let section = ini
        .section(Some("configuration"))
        .ok_or(ConfigError::MissingSection)?;

    let base_unpack_directory = section
        .get("baseunpackdirectory")
        .ok_or(ConfigError::MissingBaseUnpackDirectory)?;
    let base_unpack_directory = PathBuf::from(base_unpack_directory);
    validate_base_unpack_directory(&base_unpack_directory)?;

    let temporary_directory = section
        .get("temporarydirectory")
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty());

    let threads = match section.get("threads") {
        None => 0,
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidThreads(raw.to_string()))?,
    };
    let threads = clamp_threads(threads);

    Ok(Config {
        base_unpack_directory,
        temporary_directory,
        threads,
    })
}

fn validate_base_unpack_directory(path: &Path) -> Result<(), ConfigError> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| ConfigError::BaseUnpackDirectoryMissing(path.display().to_string()))?;
    if !metadata.is_dir() {
        return Err(ConfigError::BaseUnpackDirectoryNotADirectory(
            path.display().to_string(),
        ));
    }
    let probe = path.join(format!(".bang-write-probe-{}", std::process::id()));
    std::fs::write(&probe, b"")
        .map_err(|err| ConfigError::BaseUnpackDirectoryNotWritable(path.display().to_string(), err))?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}

/// `0` (or absent) means "every CPU"; any other value is clamped to the
/// CPU count, never raised above it.
fn clamp_threads(requested: u64) -> usize {
    let cpus = num_cpus::get();
    if requested == 0 {
        cpus
    } else {
        (requested as usize).min(cpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_ini(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("bang.ini");
        std::fs::File::create(&path).unwrap().write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_minimal_config() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path().join("base");
        std::fs::create_dir(&base).unwrap();
        let ini_path = write_ini(
            dir.path(),
            &format!("[configuration]\nbaseunpackdirectory = {}\n", base.display()),
        );

        let cfg = load_config(&ini_path).expect("config");
        assert_eq!(cfg.base_unpack_directory, base);
        assert_eq!(cfg.threads, num_cpus::get());
        assert!(cfg.temporary_directory.is_none());
    }

    #[test]
    fn clamps_threads_to_cpu_count() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path().join("base");
        std::fs::create_dir(&base).unwrap();
        let ini_path = write_ini(
            dir.path(),
            &format!(
                "[configuration]\nbaseunpackdirectory = {}\nthreads = 999999\n",
                base.display()
            ),
        );

        let cfg = load_config(&ini_path).expect("config");
        assert_eq!(cfg.threads, num_cpus::get());
    }

    #[test]
    fn rejects_missing_base_unpack_directory_key() {
        let dir = tempdir().expect("tempdir");
        let ini_path = write_ini(dir.path(), "[configuration]\nthreads = 2\n");

        let err = load_config(&ini_path).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingBaseUnpackDirectory));
    }

    #[test]
    fn rejects_nonexistent_base_unpack_directory() {
        let dir = tempdir().expect("tempdir");
        let ini_path = write_ini(
            dir.path(),
            "[configuration]\nbaseunpackdirectory = /does/not/exist/anywhere\n",
        );

        let err = load_config(&ini_path).expect_err("should fail");
        assert!(matches!(err, ConfigError::BaseUnpackDirectoryMissing(_)));
    }

    #[test]
    fn rejects_non_numeric_threads() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path().join("base");
        std::fs::create_dir(&base).unwrap();
        let ini_path = write_ini(
            dir.path(),
            &format!(
                "[configuration]\nbaseunpackdirectory = {}\nthreads = lots\n",
                base.display()
            ),
        );

        let err = load_config(&ini_path).expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidThreads(_)));
    }
}

//! High-level RWX loading.
//!
//! Opening the source is the only fatal step: once a file is open, every
//! line is interpreted and whatever was built is returned, together with the
//! lines that failed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rwx::interpreter::{Interpreter, RwxImport};

/// Root name used when neither the options nor a path provide one.
pub const DEFAULT_NAME: &str = "rwx";

/// Errors that stop an import before any line is processed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No .rwx files found in {0}")]
    NoRwxFiles(PathBuf),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Import settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Root node name; the file stem is used when unset
    pub name: Option<String>,

    /// UV for vertices that carry none
    pub default_uv: [f64; 2],
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            name: None,
            default_uv: [0.5, 0.5],
        }
    }
}

/// Load an RWX file with default options.
///
/// # Example
///
/// ```ignore
/// use rwx_core::rwx::load_rwx;
///
/// let import = load_rwx("chair.rwx")?;
/// println!("{} nodes, {} errors",
///     import.scene.visible_nodes().len(),
///     import.errors.len());
/// ```
pub fn load_rwx<P: AsRef<Path>>(path: P) -> LoadResult<RwxImport> {
    load_rwx_with_options(path, &ImportOptions::default())
}

/// Load an RWX file.
pub fn load_rwx_with_options<P: AsRef<Path>>(path: P, options: &ImportOptions) -> LoadResult<RwxImport> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(DEFAULT_NAME);
    let name = options.name.as_deref().unwrap_or(stem);

    log::info!("Loading RWX file: {}", path.display());
    Ok(load_rwx_from_reader(BufReader::new(file), name, options))
}

/// Interpret every line of `reader`.
///
/// Bytes that are not UTF-8 are replaced rather than rejected. A read error
/// part way through ends the input early; lines already read are kept.
pub fn load_rwx_from_reader<R: BufRead>(reader: R, name: &str, options: &ImportOptions) -> RwxImport {
    let start = Instant::now();
    let mut interpreter = Interpreter::new(name, options);

    for (i, line) in reader.split(b'\n').enumerate() {
        match line {
            Ok(bytes) => interpreter.process_line(i + 1, &String::from_utf8_lossy(&bytes)),
            Err(e) => {
                log::error!("Read error after line {}: {}", i, e);
                break;
            }
        }
    }

    let import = interpreter.finish();
    log::info!("Imported '{}' in {:.2?}", name, start.elapsed());
    import
}

/// Load RWX from a string (useful for testing).
pub fn load_rwx_from_string(content: &str, options: &ImportOptions) -> RwxImport {
    let name = options.name.as_deref().unwrap_or(DEFAULT_NAME);
    load_rwx_from_reader(content.as_bytes(), name, options)
}

/// Import every `.rwx` file in `dir`, each with fresh interpreter state.
///
/// Files are visited in path order. Each file is named after its own stem;
/// `options.name` is ignored here.
pub fn load_rwx_dir<P: AsRef<Path>>(
    dir: P,
    options: &ImportOptions,
) -> LoadResult<Vec<(PathBuf, LoadResult<RwxImport>)>> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_rwx_path(&path) {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(LoadError::NoRwxFiles(dir.to_path_buf()));
    }
    paths.sort();

    let start = Instant::now();
    let per_file = ImportOptions {
        name: None,
        ..options.clone()
    };
    let results: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let result = load_rwx_with_options(&path, &per_file);
            if let Err(e) = &result {
                log::warn!("Failed to load {}: {}", path.display(), e);
            }
            (path, result)
        })
        .collect();

    log::info!("Loaded {} RWX files from {} in {:.2?}", results.len(), dir.display(), start.elapsed());
    Ok(results)
}

/// Returns true for paths with an `.rwx` extension in any case.
pub fn is_rwx_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("rwx"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Read};

    const TRIANGLE: &str = "modelbegin\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ntriangle 1 2 3\nmodelend\n";

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rwx_core_{}_{}", test, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_from_string() {
        let _ = env_logger::builder().is_test(true).try_init();
        let import = load_rwx_from_string(TRIANGLE, &ImportOptions::default());

        assert_eq!(import.scene.name, DEFAULT_NAME);
        assert_eq!(import.scene.vertex_count(), 3);
        assert_eq!(import.scene.face_count(), 1);
        assert_eq!(import.line_count, 6);
        assert!(!import.has_errors());
    }

    #[test]
    fn test_crlf_and_comments() {
        let source = "ModelBegin\r\n# a comment\r\nVertex 0 0 0 # origin\r\nModelEnd\r\n";
        let import = load_rwx_from_string(source, &ImportOptions::default());

        assert!(import.errors.is_empty());
        assert_eq!(import.scene.vertex_count(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut bytes = b"vertex 0 0 0\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(b"vertex 1 0 0\n");

        let import = load_rwx_from_reader(bytes.as_slice(), "bytes", &ImportOptions::default());

        assert_eq!(import.scene.vertex_count(), 2);
        assert_eq!(import.unrecognized.len(), 1);
        assert_eq!(import.unrecognized[0].line, 2);
    }

    struct FailingReader {
        data: &'static [u8],
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "device lost"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_read_error_keeps_partial_result() {
        let reader = BufReader::new(FailingReader {
            data: b"vertex 0 0 0\nvertex 1 0 0\n",
        });
        let import = load_rwx_from_reader(reader, "partial", &ImportOptions::default());

        assert_eq!(import.scene.vertex_count(), 2);
    }

    #[test]
    fn test_custom_default_uv() {
        let options = ImportOptions {
            name: Some("custom".to_string()),
            default_uv: [0.0, 1.0],
        };
        let import = load_rwx_from_string("vertex 0 0 0", &options);
        let root = import.scene.root();

        assert_eq!(import.scene.name, "custom");
        assert_eq!(import.scene.mesh(root).vertices[0].uv, rwx_math::DVec2::new(0.0, 1.0));
    }

    #[test]
    fn test_options_from_json() {
        let options: ImportOptions = serde_json::from_str(r#"{ "name": "tree" }"#).unwrap();
        assert_eq!(options.name.as_deref(), Some("tree"));
        assert_eq!(options.default_uv, [0.5, 0.5]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = load_rwx("/nonexistent/path/model.rwx");
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn test_load_file_uses_stem() {
        let dir = scratch_dir("stem");
        let path = dir.join("chair.rwx");
        std::fs::write(&path, TRIANGLE).unwrap();

        let import = load_rwx(&path).unwrap();
        assert_eq!(import.scene.name, "chair");
        assert_eq!(import.scene.node(import.scene.root()).name, "chair");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_dir() {
        let dir = scratch_dir("dir");
        std::fs::write(dir.join("b.RWX"), TRIANGLE).unwrap();
        std::fs::write(dir.join("a.rwx"), "vertex 0 0 0\nbogus").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a model").unwrap();

        let results = load_rwx_dir(&dir, &ImportOptions::default()).unwrap();
        let names: Vec<_> = results
            .iter()
            .map(|(_, r)| r.as_ref().unwrap().scene.name.clone())
            .collect();

        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(results[0].1.as_ref().unwrap().unrecognized.len(), 1);
        assert_eq!(results[1].1.as_ref().unwrap().scene.face_count(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_dir_without_models() {
        let dir = scratch_dir("empty");
        std::fs::write(dir.join("readme.md"), "nothing").unwrap();

        assert!(matches!(
            load_rwx_dir(&dir, &ImportOptions::default()),
            Err(LoadError::NoRwxFiles(_))
        ));
        assert!(matches!(
            load_rwx_dir(dir.join("missing"), &ImportOptions::default()),
            Err(LoadError::Io(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_is_rwx_path() {
        assert!(is_rwx_path(Path::new("a/b/house.rwx")));
        assert!(is_rwx_path(Path::new("HOUSE.RWX")));
        assert!(!is_rwx_path(Path::new("house.rwx.bak")));
        assert!(!is_rwx_path(Path::new("rwx")));
    }
}

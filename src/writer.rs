use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::constants::PATH_SEPARATOR;
use crate::error::{Error, Result};
use crate::template::{FileSet, GeneratedFile};

/// Materializes a [`FileSet`] under an output directory.
pub struct FileWriter {
    output_root: PathBuf,
    dry_run: bool,
}

impl FileWriter {
    /// Ensures the output directory is safe to write to.
    pub fn new<P: AsRef<Path>>(output_root: P, force: bool, dry_run: bool) -> Result<Self> {
        let output_root = output_root.as_ref();
        if output_root.exists() && !force {
            return Err(Error::OutputDirectoryExists {
                output_dir: output_root.display().to_string(),
            });
        }
        Ok(Self { output_root: output_root.to_path_buf(), dry_run })
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Host path of a logical, forward-slash file path. The path must stay below
    /// the output root.
    pub fn target_of(&self, file: &GeneratedFile) -> Result<PathBuf> {
        let escapes = file.path.starts_with(PATH_SEPARATOR)
            || file
                .path
                .split(PATH_SEPARATOR)
                .any(|segment| matches!(segment, "" | "." | ".."));
        if escapes {
            return Err(Error::UnresolvedPathVariable {
                template: file.template.clone(),
                pattern: file.path.clone(),
                reason: "path must be relative and stay inside the output directory"
                    .to_string(),
            });
        }

        Ok(file
            .path
            .split(PATH_SEPARATOR)
            .fold(self.output_root.clone(), |target, segment| target.join(segment)))
    }

    /// Writes every file of `files`, returning the number written.
    pub fn write_all(&self, files: &FileSet) -> Result<usize> {
        let files: Vec<&GeneratedFile> = files.iter().collect();
        files.par_iter().try_for_each(|file| self.write_file(file))?;
        Ok(files.len())
    }

    fn write_file(&self, file: &GeneratedFile) -> Result<()> {
        let target = self.target_of(file)?;
        if self.dry_run {
            log::info!("[DRY RUN] Would write '{}'", target.display());
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &file.content)?;
        log::debug!("Wrote '{}' ({})", target.display(), file.template);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(path: &str, content: &str) -> GeneratedFile {
        GeneratedFile {
            path: path.to_string(),
            content: content.to_string(),
            module_id: "stytch".to_string(),
            provider: "react".to_string(),
            template: "stytch/react/x".to_string(),
        }
    }

    fn file_set() -> FileSet {
        let mut files = FileSet::new();
        files.insert(file("frontend/src/App.tsx", "app\n"));
        files.insert(file("frontend/.env", "VITE_TOKEN=\n"));
        files
    }

    #[test]
    fn refuses_existing_directory_without_force() {
        let tmp = TempDir::new().unwrap();
        let err = FileWriter::new(tmp.path(), false, false).err().unwrap();
        assert!(matches!(err, Error::OutputDirectoryExists { .. }));
        assert!(FileWriter::new(tmp.path(), true, false).is_ok());
    }

    #[test]
    fn writes_nested_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("out");
        let writer = FileWriter::new(&root, false, false).unwrap();

        assert_eq!(writer.write_all(&file_set()).unwrap(), 2);
        let app = std::fs::read_to_string(root.join("frontend").join("src").join("App.tsx"));
        assert_eq!(app.unwrap(), "app\n");
        assert!(root.join("frontend").join(".env").is_file());
    }

    #[test]
    fn rejects_paths_escaping_the_root() {
        let tmp = TempDir::new().unwrap();
        let writer = FileWriter::new(tmp.path().join("out"), false, false).unwrap();
        for path in ["../evil.txt", "/etc/passwd", "a//b", "a/./b"] {
            let err = writer.target_of(&file(path, "")).unwrap_err();
            assert!(matches!(err, Error::UnresolvedPathVariable { .. }), "{path}");
        }
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("out");
        let writer = FileWriter::new(&root, false, true).unwrap();

        assert_eq!(writer.write_all(&file_set()).unwrap(), 2);
        assert!(!root.exists());
    }
}

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Highest numbered variant tried before giving up on a filename.
const MAX_VARIANTS: u32 = 1000;

/// Writes generated artifacts (decks, narration audio) below one output directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    output_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Stores `content` as `<relative_directory>/<filename>.<extension>`.
    ///
    /// Never overwrites: an existing name gets a `_2`, `_3`, ... suffix.
    /// Returns the path actually written.
    pub fn store(
        &self,
        content: &[u8],
        relative_directory: &str,
        filename: &str,
        extension: &str,
    ) -> Result<PathBuf, StorageError> {
        let dir_path = self.output_directory.join(relative_directory);
        self.ensure_directory(&dir_path)?;

        for counter in 1..=MAX_VARIANTS {
            let try_filename = if counter == 1 {
                format!("{}.{}", filename, extension)
            } else {
                format!("{}_{}.{}", filename, counter, extension)
            };
            let try_path = dir_path.join(&try_filename);

            // create_new is an atomic check-and-create (O_CREAT | O_EXCL)
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(
            dir_path.join(format!("{}.{}", filename, extension)),
        ))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let content = b"# Deck";
        let path = storage.store(content, "decks", "Solar_1234abcd", "md").unwrap();

        assert!(path.exists());
        assert!(path.starts_with(temp_dir.path().join("decks")));
        assert_eq!(std::fs::read(&path).unwrap(), content);
    }

    #[test]
    fn test_store_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let path1 = storage.store(b"First", "", "deck", "md").unwrap();
        assert!(path1.ends_with("deck.md"));

        let path2 = storage.store(b"Second", "", "deck", "md").unwrap();
        assert!(path2.ends_with("deck_2.md"));

        assert_eq!(std::fs::read(&path1).unwrap(), b"First");
    }

    #[test]
    fn test_store_into_unwritable_parent_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let storage = FileStorage::new(&blocker);
        let result = storage.store(b"x", "sub", "deck", "md");
        assert!(matches!(result, Err(StorageError::CreateDirectory { .. })));
    }
}

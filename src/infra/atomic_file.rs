use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Replace `path` with `contents` so readers only ever observe the old or
/// the new file.
///
/// The data goes to a sibling temp file that is fsynced, the current file is
/// copied to `<name>.bak`, and the temp file is renamed over the target. A
/// failed rename restores the backup. The parent directory is created if
/// missing and fsynced after the rename.
pub async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let parent_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(parent_dir)
        .await
        .with_context(|| format!("Failed to create directory: {}", parent_dir.display()))?;

    let file_name = path
        .file_name()
        .and_then(|v| v.to_str())
        .context("Target path must name a file")?;
    let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));
    let backup_path = parent_dir.join(format!("{file_name}.bak"));

    let mut temp_file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)
        .await
        .with_context(|| format!("Failed to create temporary file: {}", temp_path.display()))?;
    if let Err(e) = write_and_sync(&mut temp_file, contents).await {
        drop(temp_file);
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    drop(temp_file);

    let had_existing = fs::try_exists(path).await.unwrap_or(false);
    if had_existing {
        if let Err(e) = fs::copy(path, &backup_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| {
                format!(
                    "Failed to create backup before atomic replace: {}",
                    backup_path.display()
                )
            });
        }
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        if had_existing && backup_path.exists() {
            fs::copy(&backup_path, path)
                .await
                .context("Failed to restore backup")?;
        }
        anyhow::bail!("Failed to atomically replace {}: {e}", path.display());
    }

    sync_directory(parent_dir).await?;

    if had_existing {
        let _ = fs::remove_file(&backup_path).await;
    }

    Ok(())
}

async fn write_and_sync(file: &mut File, contents: &[u8]) -> Result<()> {
    file.write_all(contents)
        .await
        .context("Failed to write temporary file contents")?;
    file.sync_all()
        .await
        .context("Failed to fsync temporary file")
}

pub async fn sync_directory(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path)
            .await
            .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
        dir.sync_all()
            .await
            .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".tmp-") || name.ends_with(".bak"))
            .collect()
    }

    #[tokio::test]
    async fn creates_parent_directories_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("data.json");

        write_atomically(&path, b"[]").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(leftover_temp_files(path.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn replaces_existing_contents_without_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data.json");
        std::fs::write(&path, "old").unwrap();

        write_atomically(&path, b"new").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn directory_target_fails_without_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("inner"), "keep").unwrap();

        let err = write_atomically(&path, b"data").await;

        assert!(err.is_err());
        assert_eq!(std::fs::read_to_string(path.join("inner")).unwrap(), "keep");
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }
}

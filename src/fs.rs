use std::{
    io,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tokio::{
    fs::{copy, create_dir_all, read_dir, OpenOptions},
    io::AsyncWriteExt,
};

/// Every file below `path`, with its modification time. A missing `path`
/// yields an empty list, and entries removed while listing are skipped.
pub async fn get_files_deep(path: &Path) -> io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut files = Vec::new();
    let mut dirs = vec![path.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let mut entries = match read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            if metadata.is_dir() {
                dirs.push(path);
            } else {
                files.push((path, metadata.modified()?));
            }
        }
    }
    Ok(files)
}

pub async fn write_file(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(prefix) = path.parent() {
        create_dir_all(prefix).await?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .await?;
    file.write_all(content).await?;
    file.flush().await?;
    Ok(())
}

/// Copies the tree under `src` into `dst`, creating directories as needed.
pub async fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    let mut dirs = vec![(src.to_path_buf(), dst.to_path_buf())];
    while let Some((from, to)) = dirs.pop() {
        create_dir_all(&to).await?;
        let mut entries = read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                dirs.push((entry.path(), target));
            } else {
                copy(entry.path(), &target).await?;
            }
        }
    }
    Ok(())
}

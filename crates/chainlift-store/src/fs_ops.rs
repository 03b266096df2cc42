use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CaptureStats {
    pub file_count: u64,
    pub size_bytes: u64,
}

pub(crate) fn copy_tree_filtered(
    source_root: &Path,
    destination_root: &Path,
    excluded_names: &[&str],
) -> Result<CaptureStats> {
    if !source_root.is_dir() {
        anyhow::bail!("capture source is not a directory: {}", source_root.display());
    }

    fs::create_dir_all(destination_root).with_context(|| {
        format!(
            "failed creating capture directory {}",
            destination_root.display()
        )
    })?;

    let mut stats = CaptureStats::default();
    let mut queue: VecDeque<(PathBuf, PathBuf)> = VecDeque::new();
    queue.push_back((source_root.to_path_buf(), destination_root.to_path_buf()));

    while let Some((from_dir, to_dir)) = queue.pop_front() {
        for entry in fs::read_dir(&from_dir)
            .with_context(|| format!("failed reading directory {}", from_dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name();
            if is_excluded_name(&name.to_string_lossy(), excluded_names) {
                continue;
            }

            let from_path = entry.path();
            let to_path = to_dir.join(&name);
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                fs::create_dir_all(&to_path)
                    .with_context(|| format!("failed creating directory {}", to_path.display()))?;
                queue.push_back((from_path, to_path));
            } else if file_type.is_file() {
                let copied = fs::copy(&from_path, &to_path).with_context(|| {
                    format!(
                        "failed copying file from {} to {}",
                        from_path.display(),
                        to_path.display()
                    )
                })?;
                stats.file_count += 1;
                stats.size_bytes += copied;
            }
        }
    }

    Ok(stats)
}

pub(crate) fn copy_dir_merge(source_root: &Path, destination_root: &Path) -> Result<()> {
    if !source_root.is_dir() {
        anyhow::bail!(
            "restore source is not a directory: {}",
            source_root.display()
        );
    }

    fs::create_dir_all(destination_root).with_context(|| {
        format!("failed creating directory {}", destination_root.display())
    })?;

    let mut queue: VecDeque<(PathBuf, PathBuf)> = VecDeque::new();
    queue.push_back((source_root.to_path_buf(), destination_root.to_path_buf()));

    while let Some((from_dir, to_dir)) = queue.pop_front() {
        for entry in fs::read_dir(&from_dir)
            .with_context(|| format!("failed reading directory {}", from_dir.display()))?
        {
            let entry = entry?;
            let from_path = entry.path();
            let to_path = to_dir.join(entry.file_name());
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                fs::create_dir_all(&to_path)
                    .with_context(|| format!("failed creating directory {}", to_path.display()))?;
                queue.push_back((from_path, to_path));
            } else if file_type.is_file() {
                fs::copy(&from_path, &to_path).with_context(|| {
                    format!(
                        "failed copying file from {} to {}",
                        from_path.display(),
                        to_path.display()
                    )
                })?;
            }
        }
    }

    Ok(())
}

// Removes everything under root except excluded names. Directories that end up
// holding only excluded content are kept in place.
pub(crate) fn remove_tree_except(root: &Path, excluded_names: &[&str]) -> Result<()> {
    for entry in
        fs::read_dir(root).with_context(|| format!("failed reading directory {}", root.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        if is_excluded_name(&name.to_string_lossy(), excluded_names) {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            remove_tree_except(&path, excluded_names)?;
            // Non-empty means an excluded subtree survived below.
            let _ = fs::remove_dir(&path);
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("failed removing file {}", path.display()))?;
        }
    }
    Ok(())
}

pub(crate) fn collect_relative_file_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());

    while let Some(dir) = queue.pop_front() {
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed reading directory {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                queue.push_back(path);
            } else if file_type.is_file() {
                let relative_path = path.strip_prefix(root).with_context(|| {
                    format!(
                        "failed deriving relative path {} from {}",
                        path.display(),
                        root.display()
                    )
                })?;
                paths.push(relative_path.to_path_buf());
            }
        }
    }

    Ok(paths)
}

pub(crate) fn compute_tree_digest(root: &Path) -> Result<String> {
    let mut file_paths = collect_relative_file_paths(root)?;
    file_paths.sort();

    let mut digest_input = Vec::new();
    for relative_path in file_paths {
        let normalized_path = normalize_path_for_digest(&relative_path);
        let file_bytes = fs::read(root.join(&relative_path)).with_context(|| {
            format!(
                "failed reading captured file for digest {}",
                root.join(&relative_path).display()
            )
        })?;
        let file_digest = sha256_hex(&file_bytes);

        digest_input.extend_from_slice(normalized_path.as_bytes());
        digest_input.push(0);
        digest_input.extend_from_slice(file_digest.as_bytes());
        digest_input.push(0);
    }

    Ok(format!("fs:{}", sha256_hex(&digest_input)))
}

pub(crate) fn normalize_path_for_digest(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn is_excluded_name(name: &str, excluded_names: &[&str]) -> bool {
    excluded_names.iter().any(|excluded| *excluded == name)
}

pub(crate) fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

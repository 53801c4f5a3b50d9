use std::os::unix::fs::MetadataExt;
use std::os::unix::fs::PermissionsExt;

use anyhow::{Context, anyhow};
use async_recursion::async_recursion;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

/// Permission bits carried over to copies; setuid, setgid and sticky bits are dropped to mimic "cp"
pub const MODE_MASK: u32 = 0o777;

/// Error type for copy operations that preserves operation summary even on failure.
///
/// # Logging Convention
/// The Display implementation automatically shows the full error chain, so you can log it
/// with any format specifier:
/// ```ignore
/// tracing::error!("operation failed: {}", &error);   // ✅ Shows full chain
/// tracing::error!("operation failed: {:#}", &error); // ✅ Shows full chain
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{source:#}")]
pub struct Error {
    #[source]
    pub source: anyhow::Error,
    pub summary: Summary,
}

impl Error {
    #[must_use]
    pub fn new(source: anyhow::Error, summary: Summary) -> Self {
        Error { source, summary }
    }

    /// Adds a higher level message in front of the error chain, keeping the summary.
    #[must_use]
    pub fn wrap<C>(self, context: C) -> Self
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        Error {
            source: self.source.context(context),
            summary: self.summary,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes_copied: u64,
    pub files_copied: usize,
    pub directories_created: usize,
    pub directories_unchanged: usize,
    /// Directory sources left out because recursion was not requested
    pub directories_omitted: usize,
    pub symlinks_created: usize,
    /// Sources that failed to copy
    pub sources_skipped: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            bytes_copied: self.bytes_copied + other.bytes_copied,
            files_copied: self.files_copied + other.files_copied,
            directories_created: self.directories_created + other.directories_created,
            directories_unchanged: self.directories_unchanged + other.directories_unchanged,
            directories_omitted: self.directories_omitted + other.directories_omitted,
            symlinks_created: self.symlinks_created + other.symlinks_created,
            sources_skipped: self.sources_skipped + other.sources_skipped,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "bytes copied: {}\n\
            files copied: {}\n\
            directories created: {}\n\
            directories unchanged: {}\n\
            directories omitted: {}\n\
            symlinks created: {}\n\
            sources skipped: {}",
            bytesize::ByteSize(self.bytes_copied),
            self.files_copied,
            self.directories_created,
            self.directories_unchanged,
            self.directories_omitted,
            self.symlinks_created,
            self.sources_skipped,
        )
    }
}

/// Last component of `path`, resolving paths like "." or "foo/.." through the file system.
pub async fn base_name(path: &std::path::Path) -> anyhow::Result<std::ffi::OsString> {
    if let Some(name) = path.file_name() {
        return Ok(name.to_owned());
    }
    let canonical = tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("cannot stat '{}'", path.display()))?;
    canonical
        .file_name()
        .map(ToOwned::to_owned)
        .ok_or_else(|| anyhow!("'{}' does not have a base name", path.display()))
}

fn is_same_file(md1: &std::fs::Metadata, md2: &std::fs::Metadata) -> bool {
    md1.dev() == md2.dev() && md1.ino() == md2.ino()
}

#[instrument]
pub async fn copy_file(
    src: &std::path::Path,
    dst: &std::path::Path,
) -> Result<Summary, Error> {
    tracing::debug!("opening 'src' for reading and 'dst' for writing");
    let mut reader = tokio::fs::File::open(src)
        .await
        .with_context(|| format!("cannot open '{}' for reading", src.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    let src_metadata = reader
        .metadata()
        .await
        .with_context(|| format!("failed reading metadata from '{}'", src.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    // truncating the destination would destroy the source
    if tokio::fs::metadata(dst)
        .await
        .is_ok_and(|dst_metadata| is_same_file(&src_metadata, &dst_metadata))
    {
        return Err(Error::new(
            anyhow!(
                "'{}' and '{}' are the same file",
                src.display(),
                dst.display()
            ),
            Default::default(),
        ));
    }
    let mut writer = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(src_metadata.mode() & MODE_MASK)
        .open(dst)
        .await
        .with_context(|| format!("cannot create regular file '{}'", dst.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    tracing::debug!("copying data");
    let bytes_copied = tokio::io::copy(&mut reader, &mut writer)
        .await
        .with_context(|| format!("failed copying '{}' to '{}'", src.display(), dst.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    writer
        .flush()
        .await
        .with_context(|| format!("failed closing '{}'", dst.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    Ok(Summary {
        bytes_copied,
        files_copied: 1,
        ..Default::default()
    })
}

/// Copies `src` to `dir/<base name of src>`.
pub async fn copy_file_into_dir(
    src: &std::path::Path,
    dir: &std::path::Path,
) -> Result<Summary, Error> {
    let name = base_name(src)
        .await
        .map_err(|err| Error::new(err, Default::default()))?;
    copy_file(src, &dir.join(name)).await
}

/// Fails if `target`, which is to be created inside `dst_dir`, would end up inside the `src` tree.
pub async fn ensure_outside(
    src: &std::path::Path,
    dst_dir: &std::path::Path,
    target: &std::path::Path,
) -> Result<(), Error> {
    let src_canonical = tokio::fs::canonicalize(src)
        .await
        .with_context(|| format!("cannot stat '{}'", src.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    let dst_canonical = tokio::fs::canonicalize(dst_dir)
        .await
        .with_context(|| format!("cannot stat '{}'", dst_dir.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    if dst_canonical.starts_with(&src_canonical) {
        return Err(Error::new(
            anyhow!(
                "cannot copy a directory, '{}', into itself, '{}'",
                src.display(),
                target.display()
            ),
            Default::default(),
        ));
    }
    Ok(())
}

/// Copies directory `src` into `dst_parent`, creating `dst_parent/<base name of src>`.
#[instrument]
pub async fn copy_dir(
    src: &std::path::Path,
    dst_parent: &std::path::Path,
) -> Result<Summary, Error> {
    let name = base_name(src)
        .await
        .map_err(|err| Error::new(err, Default::default()))?;
    let dst = dst_parent.join(name);
    ensure_outside(src, dst_parent, &dst).await?;
    copy_tree(src, &dst).await
}

async fn create_dir(dst: &std::path::Path) -> Result<Summary, Error> {
    match tokio::fs::create_dir(dst).await {
        Ok(()) => Ok(Summary {
            directories_created: 1,
            ..Default::default()
        }),
        Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
            let dst_metadata = tokio::fs::metadata(dst)
                .await
                .with_context(|| format!("failed reading metadata from '{}'", dst.display()))
                .map_err(|err| Error::new(err, Default::default()))?;
            if !dst_metadata.is_dir() {
                return Err(Error::new(
                    anyhow!(
                        "cannot overwrite non-directory '{}' with directory",
                        dst.display()
                    ),
                    Default::default(),
                ));
            }
            tracing::debug!("'dst' is a directory, leaving it as is");
            Ok(Summary {
                directories_unchanged: 1,
                ..Default::default()
            })
        }
        Err(error) => Err(Error::new(
            anyhow::Error::new(error)
                .context(format!("cannot create directory '{}'", dst.display())),
            Default::default(),
        )),
    }
}

/// Recreates the symbolic link `src` at `dst`, pointing at the same target.
async fn copy_link(src: &std::path::Path, dst: &std::path::Path) -> Result<Summary, Error> {
    let target = tokio::fs::read_link(src)
        .await
        .with_context(|| format!("cannot read symbolic link '{}'", src.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    tokio::fs::symlink(&target, dst)
        .await
        .with_context(|| format!("cannot create symbolic link '{}'", dst.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    Ok(Summary {
        symlinks_created: 1,
        ..Default::default()
    })
}

async fn sorted_entries(dir: &std::path::Path) -> anyhow::Result<Vec<tokio::fs::DirEntry>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("cannot open directory '{}' for reading", dir.display()))?;
    let mut sorted = vec![];
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed traversing directory '{}'", dir.display()))?
    {
        sorted.push(entry);
    }
    sorted.sort_by_key(tokio::fs::DirEntry::file_name);
    Ok(sorted)
}

/// Mirrors directory `src` at `dst`: `dst` is created (or reused if it already is a directory),
/// every entry is copied in file name order, and newly created directories get the mode of their
/// source. Symbolic links to files are copied as regular files, links to directories are
/// recreated as links and not descended into. Stops at the first failure.
#[instrument]
#[async_recursion]
pub async fn copy_tree(src: &std::path::Path, dst: &std::path::Path) -> Result<Summary, Error> {
    tracing::debug!("reading source metadata");
    let src_metadata = tokio::fs::metadata(src)
        .await
        .with_context(|| format!("cannot stat '{}'", src.display()))
        .map_err(|err| Error::new(err, Default::default()))?;
    if !src_metadata.is_dir() {
        return Err(Error::new(
            anyhow!("'{}' is not a directory", src.display()),
            Default::default(),
        ));
    }
    let mut copy_summary = create_dir(dst).await?;
    let is_fresh = copy_summary.directories_created > 0;
    tracing::debug!("process contents of 'src' directory");
    let entries = sorted_entries(src)
        .await
        .map_err(|err| Error::new(err, copy_summary))?;
    for entry in entries {
        let entry_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let entry_metadata = tokio::fs::metadata(&entry_path)
            .await
            .with_context(|| format!("cannot stat '{}'", entry_path.display()))
            .map_err(|err| Error::new(err, copy_summary))?;
        let is_symlink = entry
            .file_type()
            .await
            .with_context(|| format!("cannot stat '{}'", entry_path.display()))
            .map_err(|err| Error::new(err, copy_summary))?
            .is_symlink();
        let result = if entry_metadata.is_dir() && is_symlink {
            copy_link(&entry_path, &dst_path).await
        } else if entry_metadata.is_dir() {
            copy_tree(&entry_path, &dst_path).await
        } else {
            copy_file(&entry_path, &dst_path).await
        };
        match result {
            Ok(summary) => copy_summary = copy_summary + summary,
            Err(error) => {
                return Err(Error::new(error.source, copy_summary + error.summary));
            }
        }
    }
    if is_fresh {
        tracing::debug!("set 'dst' directory permissions");
        let permissions = std::fs::Permissions::from_mode(src_metadata.mode() & MODE_MASK);
        tokio::fs::set_permissions(dst, permissions)
            .await
            .with_context(|| format!("cannot set permissions of '{}'", dst.display()))
            .map_err(|err| Error::new(err, copy_summary))?;
    }
    Ok(copy_summary)
}

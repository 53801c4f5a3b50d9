//! Copy dispatcher behind the `cp` binary
//!
//! Looks at what exists at the source and destination paths and picks one of a few copy
//! behaviors:
//!
//! - `cp FILE FILE`: create or truncate the destination and copy the bytes
//! - `cp FILE DIR`: copy the file into the directory under its own name
//! - `cp -r DIR DIR`: mirror the source tree at `DIR/<name of source>`
//! - `cp -r DIR NEW`: mirror the source tree at `NEW`
//! - `cp DIR FILE`: always an error
//! - `cp SOURCE... DIR`: copy each source into the directory; a source that fails is reported
//!   and skipped while the others are still copied
//!
//! Directory sources require [`Settings::recursive`]. With exactly one source every failure is
//! fatal.
//!
//! # Examples
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), unix_tools_cp::Error> {
//! let sources = vec![std::path::PathBuf::from("notes.txt"), std::path::PathBuf::from("photos")];
//! let summary = unix_tools_cp::cp(
//!     &sources,
//!     std::path::Path::new("/backup"),
//!     &unix_tools_cp::Settings { recursive: true },
//! )
//! .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, anyhow};

pub use common::copy::{Error, Summary};

#[derive(Debug, Clone, Copy, Default)]
pub struct Settings {
    /// Copy directories recursively
    pub recursive: bool,
}

/// What copying a single source to a destination path amounts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Directory into an existing directory, under the source's name
    DirIntoDir,
    /// Directory to a path that does not exist yet
    DirToNew,
    /// Directory onto an existing non-directory, never allowed
    DirToFile,
    /// File into an existing directory, under the source's name
    FileIntoDir,
    /// File to a file path, existing or not
    FileToFile,
}

impl Plan {
    /// Classifies a copy from the source and (when it exists) the destination metadata.
    pub fn new(src_metadata: &std::fs::Metadata, dst_metadata: Option<&std::fs::Metadata>) -> Self {
        match (
            src_metadata.is_dir(),
            dst_metadata.map(std::fs::Metadata::is_dir),
        ) {
            (true, Some(true)) => Plan::DirIntoDir,
            (true, Some(false)) => Plan::DirToFile,
            (true, None) => Plan::DirToNew,
            (false, Some(true)) => Plan::FileIntoDir,
            (false, _) => Plan::FileToFile,
        }
    }
}

fn fatal(err: anyhow::Error) -> Error {
    Error::new(err, Summary::default())
}

/// Splits the positional arguments into sources and the destination (the last argument).
pub fn split_operands(
    paths: &[std::path::PathBuf],
) -> anyhow::Result<(&[std::path::PathBuf], &std::path::Path)> {
    match paths.split_last() {
        None => Err(anyhow!("missing file operand")),
        Some((dst, [])) => Err(anyhow!(
            "missing destination file operand after '{}'",
            dst.display()
        )),
        Some((dst, sources)) => Ok((sources, dst)),
    }
}

async fn stat(path: &std::path::Path) -> Result<std::fs::Metadata, Error> {
    tokio::fs::metadata(path)
        .await
        .with_context(|| format!("cannot stat '{}'", path.display()))
        .map_err(fatal)
}

fn check_recursive(src: &std::path::Path, settings: &Settings) -> Result<(), Error> {
    if !settings.recursive {
        return Err(fatal(anyhow!(
            "-r not specified; omitting directory '{}'",
            src.display()
        )));
    }
    Ok(())
}

/// Copies `src` into the existing directory `dst_dir`, keeping its base name.
async fn copy_into(
    src: &std::path::Path,
    src_metadata: &std::fs::Metadata,
    dst_dir: &std::path::Path,
    settings: &Settings,
) -> Result<Summary, Error> {
    if src_metadata.is_dir() {
        check_recursive(src, settings)?;
        common::copy_dir(src, dst_dir).await.map_err(|err| {
            err.wrap(format!(
                "cannot copy directory '{}' to directory '{}'",
                src.display(),
                dst_dir.display()
            ))
        })
    } else {
        common::copy_file_into_dir(src, dst_dir)
            .await
            .map_err(|err| {
                err.wrap(format!(
                    "cannot copy file '{}' to directory '{}'",
                    src.display(),
                    dst_dir.display()
                ))
            })
    }
}

/// Two argument form: every failure is fatal.
pub async fn copy_one(
    src: &std::path::Path,
    dst: &std::path::Path,
    settings: &Settings,
) -> Result<Summary, Error> {
    let src_metadata = stat(src).await?;
    let dst_metadata = tokio::fs::metadata(dst).await.ok();
    let plan = Plan::new(&src_metadata, dst_metadata.as_ref());
    tracing::debug!("copy {:?} -> {:?}: {:?}", src, dst, plan);
    match plan {
        Plan::DirToFile => Err(fatal(anyhow!(
            "cannot copy directory '{}' to file '{}'",
            src.display(),
            dst.display()
        ))),
        Plan::DirIntoDir | Plan::FileIntoDir => copy_into(src, &src_metadata, dst, settings).await,
        Plan::DirToNew => {
            check_recursive(src, settings)?;
            let dst_parent = match dst.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => std::path::Path::new("."),
            };
            common::copy::ensure_outside(src, dst_parent, dst).await?;
            common::copy_tree(src, dst).await.map_err(|err| {
                err.wrap(format!(
                    "cannot copy directory '{}' to '{}'",
                    src.display(),
                    dst.display()
                ))
            })
        }
        Plan::FileToFile => common::copy_file(src, dst).await.map_err(|err| {
            err.wrap(format!(
                "cannot copy file '{}' to file '{}'",
                src.display(),
                dst.display()
            ))
        }),
    }
}

/// Multiple sources form: `dst_dir` must be an existing directory, otherwise the whole operation
/// fails. A directory source without [`Settings::recursive`] is reported and counted in
/// [`Summary::directories_omitted`]. Any other source that cannot be copied is reported, counted
/// in [`Summary::sources_skipped`] and skipped.
pub async fn copy_many(
    sources: &[std::path::PathBuf],
    dst_dir: &std::path::Path,
    settings: &Settings,
) -> Result<Summary, Error> {
    let dst_metadata = stat(dst_dir).await?;
    if !dst_metadata.is_dir() {
        return Err(fatal(anyhow!(
            "target '{}' is not a directory",
            dst_dir.display()
        )));
    }
    let mut copy_summary = Summary::default();
    for src in sources {
        let res = match stat(src).await {
            Ok(src_metadata) if src_metadata.is_dir() && !settings.recursive => {
                // not a failure, the directory is only left out
                tracing::error!("cp: -r not specified; omitting directory '{}'", src.display());
                copy_summary = copy_summary
                    + Summary {
                        directories_omitted: 1,
                        ..Default::default()
                    };
                continue;
            }
            Ok(src_metadata) => copy_into(src, &src_metadata, dst_dir, settings).await,
            Err(error) => Err(error),
        };
        match res {
            Ok(summary) => copy_summary = copy_summary + summary,
            Err(error) => {
                tracing::error!("cp: {}", &error);
                copy_summary = copy_summary
                    + error.summary
                    + Summary {
                        sources_skipped: 1,
                        ..Default::default()
                    };
            }
        }
    }
    Ok(copy_summary)
}

/// Copies `sources` to `dst` following the rules described in the crate documentation.
pub async fn cp(
    sources: &[std::path::PathBuf],
    dst: &std::path::Path,
    settings: &Settings,
) -> Result<Summary, Error> {
    match sources {
        [] => Err(fatal(anyhow!("missing file operand"))),
        [src] => copy_one(src, dst, settings).await,
        _ => copy_many(sources, dst, settings).await,
    }
}

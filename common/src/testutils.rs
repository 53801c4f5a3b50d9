use anyhow::Context;
use async_recursion::async_recursion;
use std::os::unix::fs::PermissionsExt;

#[cfg(test)]
async fn create_temp_dir() -> anyhow::Result<std::path::PathBuf> {
    let mut idx = 0;
    loop {
        let tmp_dir = std::env::temp_dir().join(format!("unix_tools_test{}", &idx));
        if let Err(error) = tokio::fs::create_dir(&tmp_dir).await {
            match error.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    idx += 1;
                }
                _ => return Err(error.into()),
            }
        } else {
            return Ok(tmp_dir);
        }
    }
}

/// Files of the test tree, relative to the temp dir, each holding its own stem as contents
const TEST_TREE: [&str; 6] = [
    "foo/0.txt",
    "foo/bar/1.txt",
    "foo/bar/2.txt",
    "foo/bar/3.txt",
    "foo/baz/4.txt",
    "foo/baz/qux/5.txt",
];

/// Creates a fresh temp dir holding the `foo` tree: 4 directories, 6 one byte files.
#[cfg(test)]
pub async fn setup_test_dir() -> anyhow::Result<std::path::PathBuf> {
    let tmp_dir = create_temp_dir().await?;
    for file in TEST_TREE {
        let path = tmp_dir.join(file);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("cannot create test file {:?}", &path))?;
    }
    Ok(tmp_dir)
}

/// Checks that every entry of `src` exists in `dst` with the same type, permission bits and
/// contents.
#[cfg(test)]
#[async_recursion]
pub async fn check_dirs_identical(
    src: &std::path::Path,
    dst: &std::path::Path,
) -> anyhow::Result<()> {
    let mut src_entries = tokio::fs::read_dir(src).await?;
    while let Some(src_entry) = src_entries.next_entry().await? {
        let src_entry_path = src_entry.path();
        let dst_entry_path = dst.join(src_entry.file_name());
        let src_md = tokio::fs::metadata(&src_entry_path)
            .await
            .context(format!("Source file {:?} is missing!", &src_entry_path))?;
        let dst_md = tokio::fs::metadata(&dst_entry_path).await.context(format!(
            "Destination file {:?} is missing!",
            &dst_entry_path
        ))?;
        assert_eq!(src_md.is_file(), dst_md.is_file());
        assert_eq!(
            src_md.permissions().mode() & 0o777,
            dst_md.permissions().mode() & 0o777,
            "mode mismatch for {:?}",
            &dst_entry_path
        );
        if src_md.is_file() {
            let src_contents = tokio::fs::read(&src_entry_path).await?;
            let dst_contents = tokio::fs::read(&dst_entry_path).await?;
            assert_eq!(src_contents, dst_contents);
        } else {
            check_dirs_identical(&src_entry_path, &dst_entry_path).await?;
        }
    }
    Ok(())
}

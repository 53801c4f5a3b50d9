//! Duplicate an input stream into standard output and any number of files
//!
//! Input is consumed in chunks of at most [`CHUNK_SIZE`] bytes. Each chunk is written and flushed
//! to every output file, in the order the files were given, and then to standard output before the
//! next chunk is read. Any failure (open, read, short or failed write, close) ends the operation.

use anyhow::{Context, anyhow};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::instrument;

/// Size of the buffer used to read the input
pub const CHUNK_SIZE: usize = 1024;

/// Mode of newly created output files (before umask)
const OUTPUT_FILE_MODE: u32 = 0o666;

#[derive(Debug, Clone, Copy, Default)]
pub struct Settings {
    /// Append to output files instead of truncating them
    pub append: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes_read: u64,
    pub chunks: u64,
    pub outputs: usize,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "bytes read: {}\n\
            chunks: {}\n\
            output files: {}",
            bytesize::ByteSize(self.bytes_read),
            self.chunks,
            self.outputs,
        )
    }
}

struct Output {
    name: String,
    file: tokio::fs::File,
}

impl Output {
    async fn close(mut self) -> anyhow::Result<()> {
        self.file
            .flush()
            .await
            .with_context(|| format!("cannot close {}", &self.name))
    }
}

#[instrument(skip(settings))]
async fn open_outputs(
    paths: &[std::path::PathBuf],
    settings: &Settings,
) -> anyhow::Result<Vec<Output>> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).mode(OUTPUT_FILE_MODE);
    if settings.append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let mut outputs = Vec::with_capacity(paths.len());
    for path in paths {
        tracing::debug!("opening {:?}", path);
        let file = options
            .open(path)
            .await
            .with_context(|| format!("cannot open '{}' for writing", path.display()))?;
        outputs.push(Output {
            name: format!("'{}'", path.display()),
            file,
        });
    }
    Ok(outputs)
}

async fn write_chunk<W>(writer: &mut W, chunk: &[u8], name: &str) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let written = writer
        .write(chunk)
        .await
        .with_context(|| format!("cannot write to {name}"))?;
    if written != chunk.len() {
        return Err(anyhow!(
            "short write to {name}: wrote {written} of {} bytes",
            chunk.len()
        ));
    }
    // file writes complete in the background, flushing surfaces their result
    writer
        .flush()
        .await
        .with_context(|| format!("cannot write to {name}"))
}

/// Copies `input` to `stdout` and to every file in `paths`.
///
/// All files are opened (created if missing) before anything is read. Files opened so far are
/// closed when an error ends the operation early.
pub async fn tee<R, W>(
    input: &mut R,
    stdout: &mut W,
    paths: &[std::path::PathBuf],
    settings: &Settings,
) -> anyhow::Result<Summary>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut outputs = open_outputs(paths, settings).await?;
    let mut summary = Summary {
        outputs: outputs.len(),
        ..Default::default()
    };
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let count = match input.read(&mut buffer).await {
            Ok(count) => count,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(anyhow::Error::new(error).context("cannot read standard input"));
            }
        };
        if count == 0 {
            tracing::debug!("end of input after {} bytes", summary.bytes_read);
            break;
        }
        let chunk = &buffer[..count];
        for output in &mut outputs {
            write_chunk(&mut output.file, chunk, &output.name).await?;
        }
        write_chunk(stdout, chunk, "standard output").await?;
        summary.bytes_read += count as u64;
        summary.chunks += 1;
    }
    for output in outputs {
        output.close().await?;
    }
    Ok(summary)
}

use anyhow::anyhow;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cp",
    version,
    about = "Copy SOURCE to DEST, or multiple SOURCE(s) to DIRECTORY",
    long_about = "`cp` copies a file to a file, a file into a directory, or - with --recursive - a \
directory tree into a directory.

When more than one SOURCE is given, DEST must be an existing directory. A directory SOURCE \
without --recursive is reported and left out. A SOURCE that cannot be copied is reported and \
skipped, the remaining ones are still copied and the exit status is 1.

EXAMPLES:
    # Copy a file
    cp notes.txt notes.bak

    # Copy files into a directory
    cp a.txt b.txt backup/

    # Copy a directory tree into a directory
    cp -r photos backup/ --summary"
)]
struct Args {
    // Copy options
    /// Copy directories recursively
    #[arg(short, short_alias = 'R', long, help_heading = "Copy options")]
    recursive: bool,

    // Progress & output
    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // ARGUMENTS
    /// Source path(s) followed by the destination path
    #[arg(value_name = "PATH")]
    paths: Vec<std::path::PathBuf>,
}

async fn async_main(args: Args) -> anyhow::Result<common::copy::Summary> {
    let (sources, dst) = unix_tools_cp::split_operands(&args.paths)?;
    let settings = unix_tools_cp::Settings {
        recursive: args.recursive,
    };
    tracing::debug!("copy settings: {:?}", &settings);
    match unix_tools_cp::cp(sources, dst, &settings).await {
        Ok(summary) => Ok(summary),
        Err(error) => {
            if args.summary {
                return Err(anyhow!("{}\n\n{}", error, &error.summary));
            }
            Err(anyhow!("{}", error))
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
        error_prefix: "cp: ",
    };
    match common::run(output, func) {
        // skipped sources were already reported
        Some(summary) if summary.sources_skipped == 0 => Ok(()),
        _ => std::process::exit(1),
    }
}

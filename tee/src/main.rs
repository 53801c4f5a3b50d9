use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tee",
    version,
    about = "Copy standard input to each FILE, and also to standard output",
    long_about = "`tee` reads standard input and writes everything it reads to standard output and to \
every FILE given on the command line.

Files are created if missing and truncated unless --append is given. Any I/O error stops `tee` \
with exit status 1.

EXAMPLES:
    # Keep a copy of a build log while watching it
    make 2>&1 | tee build.log

    # Add to existing logs
    echo done | tee -a a.log b.log"
)]
struct Args {
    // Tee options
    /// Append the output to the files rather than overwriting them
    #[arg(short, long, help_heading = "Tee options")]
    append: bool,

    // Progress & output
    /// Print summary at the end (to stderr)
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // ARGUMENTS
    /// File(s) to copy standard input to
    #[arg(value_name = "FILE")]
    files: Vec<std::path::PathBuf>,
}

async fn async_main(args: Args) -> anyhow::Result<common::tee::Summary> {
    let settings = common::tee::Settings {
        append: args.append,
    };
    tracing::debug!("tee settings: {:?}", &settings);
    common::tee(
        &mut tokio::io::stdin(),
        &mut tokio::io::stdout(),
        &args.files,
        &settings,
    )
    .await
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
        error_prefix: "Error: ",
    };
    if common::run(output, func).is_none() {
        std::process::exit(1);
    }
    Ok(())
}

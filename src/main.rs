use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io;
use std::process;

use anyhow::Context;
use portsweep::{
    config::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_MS},
    utils::{self, Logger},
    OutputFormat, Reporter, ScanConfig, ScanEngine, ScanTarget,
};

fn build_cli() -> Command {
    Command::new("portsweep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scans a specified range of TCP ports on a given host")
        .arg(
            Arg::new("host")
                .value_name("HOST")
                .help("The hostname or IP address to scan")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("start_port")
                .value_name("START_PORT")
                .help("The starting port number")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64))
                .index(2),
        )
        .arg(
            Arg::new("end_port")
                .value_name("END_PORT")
                .help("The ending port number")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64))
                .index(3),
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_name("N")
                .help("Maximum number of ports probed at once")
                .default_value("100")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Connect timeout per port in milliseconds")
                .default_value("1000")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("deadline")
                .long("deadline")
                .value_name("MS")
                .help("Give up on the whole scan after this many milliseconds; unfinished ports report an error")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .help("Output format: text or json")
                .default_value("text")
                .value_parser(|s: &str| s.parse::<OutputFormat>()),
        )
        .arg(
            Arg::new("ulimit")
                .short('u')
                .long("ulimit")
                .value_name("LIMIT")
                .help("Automatically increase ulimit to this value")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every connection failure")
                .action(ArgAction::SetTrue),
        )
}

#[tokio::main]
async fn main() {
    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            // --help and --version land here too and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let level = if matches.get_flag("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    Logger::init(level);

    if let Err(e) = run(&matches).await {
        log::error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let host = matches
        .get_one::<String>("host")
        .context("missing host argument")?;
    let start_port = *matches
        .get_one::<i64>("start_port")
        .context("missing start port argument")?;
    let end_port = *matches
        .get_one::<i64>("end_port")
        .context("missing end port argument")?;

    // Range errors must surface before any network activity
    let target = ScanTarget::new(host.clone(), start_port, end_port)?;

    let config = ScanConfig::new()
        .with_concurrency(matches.get_one::<usize>("concurrency").copied().unwrap_or(DEFAULT_CONCURRENCY))
        .with_timeout(matches.get_one::<u64>("timeout").copied().unwrap_or(DEFAULT_TIMEOUT_MS))
        .with_deadline(matches.get_one::<u64>("deadline").copied());
    let format = matches
        .get_one::<OutputFormat>("output")
        .copied()
        .unwrap_or_default();

    let fd_limit = utils::adjust_ulimit_size(matches.get_one::<u64>("ulimit").copied());
    utils::check_concurrency_against_limit(config.concurrency, fd_limit);

    let engine = ScanEngine::new(config)?;
    let handle = engine.start(&target).await?;
    let address = handle.address();

    let cancel = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling remaining probes");
            cancel.cancel();
        }
    });

    let mut reporter = Reporter::new(io::stdout(), format);
    let stats = reporter
        .report(handle)
        .await
        .context("failed to write scan results")?;
    interrupt.abort();

    Logger::log_scan_complete(&target, address, &stats);
    Ok(())
}

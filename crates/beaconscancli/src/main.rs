//! beaconscan - print the address and RSSI of every BLE advertisement heard
//!
//! Note: opening raw HCI sockets requires root privileges or CAP_NET_RAW.

use beaconscan::{scan, CancelToken, HciSocket, LineSink, ScanConfig};
use clap::{ArgAction, Parser};
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "beaconscan", version)]
#[command(about = "Passive Bluetooth LE beacon scanner")]
struct Cli {
    /// Bluetooth adapter to use (hciX), defaults to the first one present
    #[arg(short, long)]
    device: Option<String>,

    /// How many seconds to scan
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    time: Option<u64>,

    /// Write scan results to this file instead of stdout
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Stop after this many advertisements
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Block on every read; --time then only fires once traffic arrives
    #[arg(long)]
    blocking: bool,

    /// Timeout of each configuration command, in milliseconds
    #[arg(long, default_value_t = 1000)]
    command_timeout: u64,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig::default()
            .with_command_timeout(Duration::from_millis(self.command_timeout));
        if let Some(seconds) = self.time {
            config = config.with_deadline(Duration::from_secs(seconds));
        }
        if let Some(limit) = self.limit {
            config = config.with_limit(limit);
        }
        if self.blocking {
            config = config.with_idle_poll(None);
        }
        config
    }

    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

static CANCEL: OnceLock<CancelToken> = OnceLock::new();

extern "C" fn on_sigint(_signal: libc::c_int) {
    if let Some(token) = CANCEL.get() {
        token.cancel();
    }
}

/// Route SIGINT to `token`
///
/// The handler is installed without `SA_RESTART` so a blocked read returns
/// `EINTR` and the scan loop sees the request right away. Only one token
/// can be routed per process.
fn install_sigint_handler(token: CancelToken) -> io::Result<()> {
    CANCEL.set(token).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "SIGINT handler already installed",
        )
    })?;

    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);

        if libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut()) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn open_output(file: Option<&PathBuf>) -> io::Result<Box<dyn Write>> {
    Ok(match file {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    })
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut socket = match &cli.device {
        Some(name) => HciSocket::open_named(name)?,
        None => HciSocket::open_first()?,
    };
    socket.set_le_meta_filter()?;

    let cancel = CancelToken::new();
    install_sigint_handler(cancel.clone())?;

    let mut sink = LineSink::new(open_output(cli.file.as_ref())?);

    info!("scanning on hci{}", socket.dev_id());
    let summary = scan(&mut socket, cli.scan_config(), cancel, &mut sink)?;
    info!("{} advertisements ({:?})", summary.records, summary.reason);

    if sink.failed_writes() > 0 {
        error!("{} records could not be written", sink.failed_writes());
    }
    sink.finish()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = TermLogger::init(
        cli.log_level(),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Could not set up logging: {}", e);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

use clap::Parser;
use clap::error::ErrorKind;
use std::process;

use sonar::SonarLogger;
use sonar::error::SonarError;
use sonar::ping;
use sonar::ping_once;

/// A minimal ICMP echo (ping) utility.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Domain name or address to ping
    host: String,

    /// Number of echo requests to send; omit for a single pass/fail ping
    num_requests: Option<usize>,

    /// Enable debug diagnostics on stderr
    #[arg(long)]
    debug: bool,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{}", e);
                process::exit(0);
            }
            _ => {
                println!("{}", e);
                process::exit(1);
            }
        },
    };

    let logger = if args.debug {
        SonarLogger::Debug
    } else {
        SonarLogger::Warn
    };
    if let Err(e) = logger.init() {
        eprintln!("logger init failed: {}", e);
    }

    let ret = match args.num_requests {
        Some(num_requests) => ping(&args.host, num_requests, true, None).map(|_| ()),
        None => ping_once(&args.host, true, None).map(|_| ()),
    };

    if let Err(e) = ret {
        match e {
            SonarError::ResolveHostFailed { .. } => println!("{}", e),
            SonarError::RawSocketPermission { .. } => {
                println!("{}", e);
                process::exit(1);
            }
            other => {
                println!("Error occurred: {}", other);
                process::exit(1);
            }
        }
    }
}

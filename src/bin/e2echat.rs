//! e2echat CLI - password-based message encryption
//!
//! Encrypts text into `[E2E:...]` tokens that can be pasted into any chat,
//! and decrypts tokens found in text (for example a saved chat log).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use e2echat::file_ops;
use e2echat::password::{PasswordReader, StreamPasswordReader, TerminalPasswordReader};

#[derive(Parser)]
#[command(name = "e2echat")]
#[command(version)]
#[command(about = "Password-based message encryption into [E2E:...] tokens.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    password_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a text file into a token
    #[command(alias = "e")]
    Encrypt {
        /// Path to the UTF-8 text to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the token to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Decrypt the first token found in a text file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the text containing a token
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the decrypted text to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// List the payload of every token found in a text file
    #[command(alias = "s")]
    Scan {
        /// Path to the text to scan
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encrypt { input, output } => {
            let mut reader = get_password_reader(cli.password_stdin);
            file_ops::encrypt_file(&input, &output, &mut *reader)
        }
        Commands::Decrypt { input, output } => {
            let mut reader = get_password_reader(cli.password_stdin);
            file_ops::decrypt_file(&input, &output, &mut *reader)
        }
        Commands::Scan { input } => file_ops::scan_file(&input).and_then(|payloads| {
            if payloads.is_empty() {
                return Err(e2echat::E2eChatError::with_kind(
                    e2echat::ErrorCategory::User,
                    e2echat::ErrorKind::MalformedToken,
                    format!("no tokens found in {}", input.display()),
                ));
            }
            for payload in payloads {
                println!("{}", payload);
            }
            Ok(())
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn get_password_reader(use_stdin: bool) -> Box<dyn PasswordReader> {
    if use_stdin {
        Box::new(StreamPasswordReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPasswordReader)
    }
}

#![forbid(unsafe_code)]
use std::path::PathBuf;
use std::{env, ffi, fs, io};

use adalzw::{decode::Decoder, encode::Encoder, Mode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> CodingResult {
    CodingResult::catch_panic(|| {
        let flags = Flags::from_args(env::args_os());
        init_logging();
        run_coding(flags)
    })
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adalzw=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn run_coding(flags: Flags) -> Result<(), io::Error> {
    let out = io::stdout();
    let out = io::BufWriter::new(out.lock());

    let input: Box<dyn io::BufRead> = match flags.input {
        Input::File(file) => {
            let data = fs::File::open(file)?;
            Box::new(io::BufReader::with_capacity(1 << 20, data))
        }
        Input::Stdin => Box::new(io::BufReader::with_capacity(1 << 20, io::stdin())),
    };

    let result = match flags.operation {
        Operation::Encode => {
            let mut encoder = Encoder::new(flags.mode);
            encoder.into_stream(out).encode_all(input)
        }
        Operation::Decode => {
            let mut decoder = Decoder::new();
            decoder.into_stream(out).decode_all(input)
        }
    };

    tracing::debug!(
        bytes_read = result.bytes_read,
        bytes_written = result.bytes_written,
        "done"
    );
    result.status.map_err(io::Error::from)
}

struct Flags {
    input: Input,
    operation: Operation,
    mode: Mode,
}

#[derive(Debug)]
enum Input {
    File(PathBuf),
    Stdin,
}

#[derive(Debug)]
enum Operation {
    Encode,
    Decode,
}

fn command() -> clap::Command {
    clap::Command::new("lzw")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compress and decompress with adaptive LZW")
        .after_help("Log output on stderr is controlled through RUST_LOG.")
        .arg(
            clap::Arg::new("decode")
                .short('d')
                .long("decode")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("encode")
                .short('e')
                .long("encode")
                .action(clap::ArgAction::SetTrue),
        )
        .group(
            clap::ArgGroup::new("operation")
                .args(["decode", "encode"])
                .multiple(false)
                .required(true),
        )
        .arg(
            clap::Arg::new("mode")
                .short('m')
                .long("mode")
                .help("Dictionary policy when encoding: n (fixed), r (reset) or m (monitor)")
                .default_value("n")
                .value_parser(|s: &str| s.parse::<Mode>()),
        )
        .arg(
            clap::Arg::new("file")
                .help("File path or '-' for stdin")
                .default_value("-")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

impl Flags {
    fn from_args(args: impl IntoIterator<Item = ffi::OsString>) -> Self {
        let matches = command().get_matches_from(args);

        let operation = if matches.get_flag("decode") {
            Operation::Decode
        } else {
            Operation::Encode
        };

        let mode = matches
            .get_one::<Mode>("mode")
            .copied()
            .unwrap_or(Mode::Fixed);

        let input = match matches.get_one::<PathBuf>("file") {
            None => Input::Stdin,
            Some(p) if p.as_os_str() == "-" => Input::Stdin,
            Some(p) => Input::File(p.clone()),
        };

        Flags {
            input,
            operation,
            mode,
        }
    }
}

enum CodingResult {
    Ok,
    Err(io::Error),
    Panic,
}

impl CodingResult {
    fn catch_panic(op: fn() -> Result<(), io::Error>) -> Self {
        std::panic::catch_unwind(|| match op() {
            Ok(()) => CodingResult::Ok,
            Err(err) => CodingResult::Err(err),
        })
        .unwrap_or(CodingResult::Panic)
    }
}

impl std::process::Termination for CodingResult {
    fn report(self) -> std::process::ExitCode {
        match self {
            CodingResult::Ok => std::process::ExitCode::SUCCESS,
            CodingResult::Err(err) => {
                eprintln!("lzw: {}", err);
                std::process::ExitCode::FAILURE
            }
            CodingResult::Panic => {
                eprintln!(
                    "The process failed irrecoverably! This should never happen and is a bug."
                );
                std::process::ExitCode::from(128)
            }
        }
    }
}

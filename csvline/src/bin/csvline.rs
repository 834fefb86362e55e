// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use csvline::{
    CsvParser, LineParser, NullFieldIndicator, ParserConfig, RecordReader, Rfc4180Parser,
};

#[derive(Parser)]
#[command(name = "csvline", version, about = "Tokenize a CSV file line by line")]
struct Cli {
    /// CSV file to read.
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Use the RFC 4180 parser instead of the escape-aware one.
    #[arg(long)]
    rfc4180: bool,

    #[arg(long, default_value_t = ',')]
    separator: char,

    #[arg(long, default_value_t = '"')]
    quote: char,

    /// Escape character (ignored with --rfc4180).
    #[arg(long, default_value_t = '\\', conflicts_with = "no_escape")]
    escape: char,

    /// Disable the escape character.
    #[arg(long)]
    no_escape: bool,

    /// Drop characters outside of quotes.
    #[arg(long)]
    strict_quotes: bool,

    /// Which empty fields are reported as null.
    #[arg(long, value_enum, default_value = "neither")]
    null_fields: NullFieldsArg,

    /// Maximum physical lines per record, 0 for unlimited.
    #[arg(long, default_value_t = 0)]
    multiline_limit: usize,

    #[arg(long, default_value_t = 0)]
    skip_lines: usize,

    /// Print records re-rendered as CSV instead of as lists.
    #[arg(long)]
    render: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum NullFieldsArg {
    Neither,
    EmptySeparators,
    EmptyQuotes,
    Both,
}

impl From<NullFieldsArg> for NullFieldIndicator {
    fn from(arg: NullFieldsArg) -> Self {
        match arg {
            NullFieldsArg::Neither => NullFieldIndicator::Neither,
            NullFieldsArg::EmptySeparators => NullFieldIndicator::EmptySeparators,
            NullFieldsArg::EmptyQuotes => NullFieldIndicator::EmptyQuotes,
            NullFieldsArg::Both => NullFieldIndicator::Both,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = ParserConfig::new()
        .with_separator(cli.separator)
        .with_quote_char(cli.quote)
        .with_escape((!cli.no_escape).then_some(cli.escape))
        .with_strict_quotes(cli.strict_quotes)
        .with_null_field_indicator(cli.null_fields.into());

    let result: Result<(), Box<dyn std::error::Error>> = if cli.rfc4180 {
        Rfc4180Parser::new(config)
            .map_err(Into::into)
            .and_then(|parser| run(&cli, parser))
    } else {
        CsvParser::new(config)
            .map_err(Into::into)
            .and_then(|parser| run(&cli, parser))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run<P: LineParser>(cli: &Cli, parser: P) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(&cli.path)
        .map_err(|e| format!("unable to open file '{}': {}", cli.path.display(), e))?;
    let mut reader = RecordReader::from_buf_read(BufReader::new(file), parser)
        .skip_lines(cli.skip_lines)
        .multiline_limit(cli.multiline_limit);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    while let Some(record) = reader.read_record()? {
        if cli.render {
            writeln!(out, "{}", reader.parser().render(&record))?;
        } else {
            writeln!(out, "{:?}", record)?;
        }
    }
    log::debug!(
        "{} records from {} lines",
        reader.records_read(),
        reader.lines_read()
    );
    Ok(())
}

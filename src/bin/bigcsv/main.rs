//! bigcsv CLI: index, page through, export and generate large CSV files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bigcsv::dsv::{build_index_with, DsvConfig, ExportScope, DEFAULT_CHUNK_SIZE};
use bigcsv::{CancelToken, Chunk, ChunkRequest, FileIndex, Session, SessionUpdate};
use clap::{Args, Parser, Subcommand, ValueEnum};

mod generators;
mod logging;

use generators::{generate_csv, CsvPattern};

/// How long to wait for a background job before giving up.
const JOB_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, Parser)]
#[command(name = "bigcsv")]
#[command(about = "Browse and export very large CSV files chunk by chunk", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a file and print its header, row count and chunk layout
    Index(IndexArgs),
    /// Print one chunk of rows
    Show(ShowArgs),
    /// Export a chunk, or the whole file, re-escaped
    Export(ExportArgs),
    /// Generate synthetic CSV files for benchmarking and testing
    Generate(GenerateArgs),
}

/// Options shared by commands that read a CSV file.
#[derive(Debug, Args)]
struct InputArgs {
    /// Input CSV file
    file: PathBuf,

    /// Rows per chunk
    #[arg(short = 'k', long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Field delimiter (single ASCII character, `\t` for tab)
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,
}

impl InputArgs {
    fn config(&self) -> DsvConfig {
        DsvConfig::default()
            .with_delimiter(self.delimiter)
            .with_chunk_size(self.chunk_size)
    }
}

#[derive(Debug, Args)]
struct IndexArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Print the index as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Chunk number to show
    #[arg(short, long, conflicts_with = "at")]
    chunk: Option<usize>,

    /// Scroll position between 0.0 and 1.0
    #[arg(short, long)]
    at: Option<f64>,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Chunk to export (default: 0)
    #[arg(short, long, conflicts_with = "all")]
    chunk: Option<usize>,

    /// Export every row instead of a single chunk
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Number of data rows to generate
    rows: u64,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// CSV pattern to generate
    #[arg(short, long, default_value = "tabular")]
    pattern: PatternArg,

    /// Random seed for reproducible generation
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, ValueEnum)]
enum PatternArg {
    /// Standard tabular data with mixed types
    Tabular,
    /// User/person records
    Users,
    /// Numeric-heavy data
    Numeric,
    /// Quoted fields containing delimiters
    Quoted,
    /// Rows whose field count differs from the header
    Ragged,
}

impl From<PatternArg> for CsvPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Tabular => CsvPattern::Tabular,
            PatternArg::Users => CsvPattern::Users,
            PatternArg::Numeric => CsvPattern::Numeric,
            PatternArg::Quoted => CsvPattern::Quoted,
            PatternArg::Ragged => CsvPattern::Ragged,
        }
    }
}

/// Parse a delimiter argument like ",", ";", "|" or "\t".
fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!(
            "Invalid delimiter: '{}'. Use a single ASCII character or '\\t'",
            s
        )),
    }
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Index(args) => run_index(args),
        Command::Show(args) => run_show(args),
        Command::Export(args) => run_export(args),
        Command::Generate(args) => run_generate(args),
    }
}

fn run_index(args: IndexArgs) -> Result<()> {
    let index = index_file(&args.input)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&index)?)?;
    } else {
        print_index(&mut out, &args.input.file, &index)?;
    }
    out.flush()?;
    Ok(())
}

/// Build the index in the foreground with the delimiter and chunk size
/// given on the command line.
fn index_file(input: &InputArgs) -> Result<FileIndex> {
    let path = &input.file;
    build_index_with(path, &input.config(), &mut |_| {}, &CancelToken::new())
        .with_context(|| format!("Failed to index {}", path.display()))
}

fn print_index<W: Write>(out: &mut W, path: &Path, index: &FileIndex) -> io::Result<()> {
    writeln!(out, "file:       {}", path.display())?;
    writeln!(out, "size:       {} bytes", index.file_len())?;
    writeln!(out, "columns:    {}", index.header().join(" | "))?;
    writeln!(out, "rows:       {}", index.total_rows())?;
    writeln!(
        out,
        "chunks:     {} x {} rows",
        index.chunk_count(),
        index.chunk_size()
    )?;
    if let (Some(first), Some(last)) = (index.offsets().first(), index.offsets().last()) {
        writeln!(out, "offsets:    {} .. {}", first, last)?;
    }
    Ok(())
}

/// Open `input` in a session and block until it is indexed.
fn open_session(input: &InputArgs) -> Result<Session> {
    let mut session = Session::new(input.config())?;
    session.open(&input.file)?;
    loop {
        match session.wait_update(JOB_TIMEOUT)? {
            Some(SessionUpdate::Indexed { total_rows, .. }) => {
                tracing::info!(total_rows, "indexed {}", input.file.display());
                return Ok(session);
            }
            Some(SessionUpdate::IndexFailed(e)) => {
                let context = format!("Failed to index {}", input.file.display());
                return Err(anyhow!(e).context(context));
            }
            Some(_) => {}
            None => bail!("Timed out indexing {}", input.file.display()),
        }
    }
}

/// Wait for the chunk requested last to arrive.
fn wait_for_chunk(session: &mut Session) -> Result<Arc<Chunk>> {
    loop {
        match session.wait_update(JOB_TIMEOUT)? {
            Some(SessionUpdate::ChunkLoaded(chunk)) => return Ok(chunk),
            Some(SessionUpdate::ChunkFailed { index, error }) => {
                let context = format!("Failed to load chunk {}", index);
                return Err(anyhow!(error).context(context));
            }
            Some(_) => {}
            None => bail!("Timed out loading chunk"),
        }
    }
}

fn run_show(args: ShowArgs) -> Result<()> {
    let mut session = open_session(&args.input)?;
    let request = match (args.chunk, args.at) {
        (_, Some(fraction)) => session.scroll_to(fraction)?,
        (chunk, None) => session.request_chunk(chunk.unwrap_or(0))?,
    };
    let chunk = match request {
        ChunkRequest::Ready(chunk) => chunk,
        _ => wait_for_chunk(&mut session)?,
    };

    let index = session
        .index()
        .ok_or_else(|| anyhow!("Session lost its index"))?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    print_table(&mut out, index.header(), &chunk)?;
    writeln!(
        out,
        "-- chunk {} of {}, rows {}..{} of {}",
        chunk.index(),
        index.chunk_count(),
        chunk.row_range().start,
        chunk.row_range().end,
        index.total_rows()
    )?;
    out.flush()?;
    Ok(())
}

/// Print rows as an aligned table. Missing cells are left blank.
fn print_table<W: Write>(out: &mut W, header: &[String], chunk: &Chunk) -> io::Result<()> {
    let columns = chunk
        .rows()
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let mut widths = vec![0usize; columns];
    let body = chunk.rows().iter().map(Vec::as_slice);
    for row in std::iter::once(header).chain(body) {
        for (width, field) in widths.iter_mut().zip(row) {
            *width = (*width).max(field.chars().count());
        }
    }

    let write_row = |out: &mut W, row: &[String]| -> io::Result<()> {
        let cells = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let field = row.get(i).map(String::as_str).unwrap_or("");
                format!("{:<w$}", field)
            })
            .collect::<Vec<_>>();
        writeln!(out, "{}", cells.join(" | ").trim_end())
    };

    write_row(out, header)?;
    let rule = widths.iter().map(|&w| "-".repeat(w)).collect::<Vec<_>>();
    writeln!(out, "{}", rule.join("-+-"))?;
    for row in chunk.rows() {
        write_row(out, row)?;
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    let mut session = open_session(&args.input)?;

    let scope = if args.all {
        ExportScope::WholeFile
    } else {
        let chunk = args.chunk.unwrap_or(0);
        if !matches!(session.request_chunk(chunk)?, ChunkRequest::Ready(_)) {
            wait_for_chunk(&mut session)?;
        }
        ExportScope::CurrentChunk
    };

    session.export(&args.output, scope)?;
    loop {
        match session.wait_update(JOB_TIMEOUT)? {
            Some(SessionUpdate::Exported { path, rows }) => {
                eprintln!("✓ Wrote {} rows to {}", rows, path.display());
                return Ok(());
            }
            Some(SessionUpdate::ExportFailed { path, error }) => {
                let context = format!("Failed to write {}", path.display());
                return Err(anyhow!(error).context(context));
            }
            Some(_) => {}
            None => bail!("Timed out exporting to {}", args.output.display()),
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let pattern = args.pattern.into();
    match args.output {
        Some(path) => {
            write_generated(&path, args.rows, pattern, args.seed)?;
            eprintln!("✓ Wrote {} rows to {}", args.rows, path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            generate_csv(&mut out, args.rows, pattern, args.seed)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn write_generated(path: &Path, rows: u64, pattern: CsvPattern, seed: Option<u64>) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    generate_csv(&mut out, rows, pattern, seed)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');

        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(",,").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn test_print_table() {
        let header = vec!["id".to_string(), "name".to_string()];
        let chunk = Chunk::new(
            0,
            0,
            vec![
                vec!["1".to_string(), "Alice".to_string()],
                vec!["22".to_string()],
            ],
        );
        let mut out = Vec::new();
        print_table(&mut out, &header, &chunk).unwrap();

        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r###"
        id | name
        ---+------
        1  | Alice
        22 |
        "###);
    }

    #[test]
    fn test_cli_parses() {
        let args = ["bigcsv", "show", "data.csv", "-k", "50", "--at", "0.5"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Show(args) => {
                assert_eq!(args.input.chunk_size, 50);
                assert_eq!(args.at, Some(0.5));
                assert_eq!(args.input.delimiter, b',');
            }
            other => panic!("unexpected command {:?}", other),
        }

        let conflicting = [
            "bigcsv", "export", "a.csv", "-o", "b.csv", "--all", "-c", "1",
        ];
        assert!(Cli::try_parse_from(conflicting).is_err());
    }

    #[test]
    fn test_index_uses_delimiter() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a;b;c\n1;2;3\n4;5;6\n").unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap();
        let args = ["bigcsv", "index", path, "-d", ";", "-k", "1"];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Index(args) = cli.command else {
            panic!("expected index command");
        };
        let index = index_file(&args.input).unwrap();
        assert_eq!(index.header(), ["a", "b", "c"]);
        assert_eq!(index.total_rows(), 2);
        assert_eq!(index.chunk_count(), 2);

        let mut out = Vec::new();
        print_index(&mut out, Path::new("f.csv"), &index).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("columns:    a | b | c"), "{}", text);
        assert!(text.contains("chunks:     2 x 1 rows"), "{}", text);
    }
}

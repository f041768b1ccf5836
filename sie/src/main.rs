use clap::{Parser, Subcommand, ValueEnum};
use sielib::{
    compare,
    encoding::Encoding,
    error::{Result, SieError},
    formats::{
        csv::CsvJournal,
        sie::{self, Sie, WriteOptions},
    },
    model::Document,
    read_document,
    traits::WriteFormat,
};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Fmt {
    Sie,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "sie", version, about = "Чтение, проверка и конвертация файлов SIE")]
struct Cli {
    /// Уровень логирования (error, warn, info, debug, trace); без флага — RUST_LOG или warn
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Перечитать файл и записать в каноническом виде или в CSV
    Convert {
        /// Входной файл (по умолчанию stdin)
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,

        /// Выходной файл (по умолчанию stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Формат выхода
        #[arg(long = "to", value_enum, default_value = "sie")]
        to: Fmt,

        /// Писать SIE в UTF-8 вместо PC-8
        #[arg(long)]
        utf8: bool,
    },
    /// Прочитать, записать, перечитать и сравнить; каталоги обходятся рекурсивно
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Краткая сводка по файлу
    Summary { file: PathBuf },
}

fn init_logger(level: Option<&str>) {
    let mut builder = pretty_env_logger::formatted_builder();
    let filters = level
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok());
    match filters {
        Some(f) => {
            builder.parse_filters(&f);
        }
        None => {
            builder.filter_level(log::LevelFilter::Warn);
        }
    }
    builder.init();
}

fn load(path: &Path) -> Result<Document> {
    read_document(BufReader::new(File::open(path)?))
}

fn write_options() -> WriteOptions {
    WriteOptions {
        program_name: "sie".into(),
        program_version: env!("CARGO_PKG_VERSION").into(),
        generated: None,
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logger(cli.log_level.as_deref());

    match cli.command {
        Command::Convert {
            input,
            output,
            to,
            utf8,
        } => convert(input, output, to, utf8).map(|_| ExitCode::SUCCESS),
        Command::Check { paths } => check(&paths),
        Command::Summary { file } => summary(&file).map(|_| ExitCode::SUCCESS),
    }
}

fn convert(input: Option<PathBuf>, output: Option<PathBuf>, to: Fmt, utf8: bool) -> Result<()> {
    // reader
    let reader: Box<dyn io::Read> = match &input {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    };
    let doc = read_document(BufReader::new(reader))?;
    for e in &doc.errors {
        log::warn!("{e}");
    }

    // writer
    let mut writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };

    match to {
        Fmt::Sie => {
            let enc = if utf8 { Encoding::Utf8 } else { Encoding::Pc8 };
            Sie::write_with(&mut writer, &doc, &write_options(), enc)
        }
        Fmt::Csv => CsvJournal::write(&mut writer, &doc),
    }?;
    log::info!(
        "converted {} accounts and {} vouchers",
        doc.accounts.len(),
        doc.vouchers.len()
    );

    writer.flush().map_err(SieError::from)
}

fn is_sie_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "se" | "si" | "sie"))
        .unwrap_or(false)
}

fn collect_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if !path.is_dir() {
        out.push(path.to_path_buf());
        return Ok(());
    }
    let mut entries = std::fs::read_dir(path)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    for p in entries {
        if p.is_dir() {
            collect_files(&p, out)?;
        } else if is_sie_file(&p) {
            out.push(p);
        }
    }
    Ok(())
}

/// Round-trip: прочитать → записать → перечитать → сравнить.
fn check_file(path: &Path) -> Result<bool> {
    let doc = load(path)?;
    for e in &doc.errors {
        println!("  {e}");
    }
    let text = sie::to_string(&doc, &write_options());
    let reread = sie::parse_str(&text);
    let diffs = compare(&doc, &reread);
    for d in &diffs {
        println!("  {d}");
    }
    Ok(doc.errors.is_empty() && reread.errors.is_empty() && diffs.is_empty())
}

fn check(paths: &[PathBuf]) -> Result<ExitCode> {
    let mut files = Vec::new();
    for p in paths {
        collect_files(p, &mut files)?;
    }

    let mut failed = 0;
    for f in &files {
        println!("{}", f.display());
        let ok = match check_file(f) {
            Ok(ok) => ok,
            Err(e) => {
                println!("  {e}");
                false
            }
        };
        println!("  {}", if ok { "OK" } else { "FAILED" });
        if !ok {
            failed += 1;
        }
    }
    log::info!("checked {} files, {} failed", files.len(), failed);

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn summary(path: &Path) -> Result<()> {
    let doc = load(path)?;
    let or_dash = |s: &Option<String>| s.clone().unwrap_or_else(|| "-".into());

    println!("Company:      {}", or_dash(&doc.company_name));
    println!("Org. number:  {}", or_dash(&doc.registration_number));
    println!("Format:       {}", or_dash(&doc.format));
    println!(
        "Program:      {} {}",
        or_dash(&doc.program_name),
        doc.program_version.as_deref().unwrap_or("")
    );
    for y in &doc.booking_years {
        println!("Year {:>3}:     {} .. {}", y.id, y.start, y.end);
    }
    println!("Accounts:     {}", doc.accounts.len());
    println!("Dimensions:   {}", doc.dimensions.len());
    println!("Vouchers:     {}", doc.vouchers.len());
    println!("Errors:       {}", doc.errors.len());
    for e in &doc.errors {
        println!("  {e}");
    }
    Ok(())
}

use sielib::{formats::csv::CsvJournal, read_document, traits::WriteFormat};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Пример: журнал SIE -> CSV (stdin -> stdout)
    let doc = read_document(std::io::BufReader::new(std::io::stdin()))?;
    for e in &doc.errors {
        eprintln!("{e}");
    }
    CsvJournal::write(std::io::stdout(), &doc)?;
    Ok(())
}

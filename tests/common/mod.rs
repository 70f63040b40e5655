use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub const HEADER: &str = "action,actor,order,context,amount,text";

/// Writes `rows` under the action header into a fresh temp file.
pub fn actions_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// Generates `orders` submit/accept/settle/pay sequences, one order each.
pub fn generate_csv(path: &Path, orders: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER.split(','))?;

    for i in 1..=orders {
        let id = format!("bulk-{i}");
        let requester = (1000 + i).to_string();
        wtr.write_record(["submit", &requester, &id, "1", "", "Generated order body"])?;
        wtr.write_record(["accept", "1", &id, "", "10.50", ""])?;
        wtr.write_record(["settle", "", &id, "", "", ""])?;
        wtr.write_record(["pay", &requester, &id, "", "", ""])?;
    }

    wtr.flush()?;
    Ok(())
}

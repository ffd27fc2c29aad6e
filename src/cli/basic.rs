//! Table loading and inspection commands.

use std::path::Path;

use crate::{reader::read_parquet, Table, TextTableReader};

/// Returns true if the path names a Parquet file.
pub(crate) fn is_parquet(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("parquet")
}

/// Load a table from a file path based on extension.
pub(crate) fn load_table(path: &Path, reader: &TextTableReader) -> crate::Result<Table> {
    if is_parquet(path) {
        read_parquet(path)
    } else {
        reader.read_path(path)
    }
}

/// Display a table's header and record counts.
pub(crate) fn cmd_inspect(path: &Path, separator: Option<char>) -> crate::Result<()> {
    let mut reader = TextTableReader::new();
    if let Some(separator) = separator {
        reader = reader.with_separator(separator);
    }
    let table = load_table(path, &reader)?;

    let width = table.header().len();
    let records = table.records().iter().flatten();
    let ragged = records.clone().filter(|r| r.len() != width).count();

    println!("File: {}", path.display());
    println!("Fields: {}", width);
    for (i, name) in table.header().iter().enumerate() {
        println!("  {:>3}  {}", i, name);
    }
    println!("Records: {}", records.count());
    println!("Ragged records: {}", ragged);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_table_by_extension() {
        let temp_dir = tempfile::tempdir()
            .ok()
            .unwrap_or_else(|| panic!("Should create temp dir"));
        let path = temp_dir.path().join("cells.csv");
        std::fs::write(&path, "a,b\n1,2\n")
            .ok()
            .unwrap_or_else(|| panic!("Should write file"));

        let table = load_table(&path, &TextTableReader::new().with_separator(','))
            .ok()
            .unwrap_or_else(|| panic!("Should load"));
        assert_eq!(table.header(), ["a", "b"]);
        assert!(!is_parquet(&path));
        assert!(is_parquet(Path::new("x.parquet")));
    }

    #[test]
    fn test_inspect_missing_file() {
        assert!(cmd_inspect(Path::new("/nonexistent/table.tsv"), None).is_err());
    }
}

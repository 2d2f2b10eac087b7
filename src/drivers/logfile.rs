use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, Trim};

use crate::drivers::AcquisitionError;

/// Parsed contents of a comma-separated log, rows kept in file order.
///
/// Column 0 holds the timestamp/index; channel `c` lives in column `c + 1`.
#[derive(Clone, Debug, Default)]
pub struct LogTable {
    rows: Vec<ByteRecord>,
}

impl LogTable {
    pub fn read(path: &Path) -> Result<Self, AcquisitionError> {
        let file = File::open(path).map_err(|e| AcquisitionError::file_unavailable(path, e))?;
        Self::from_reader(file).map_err(|e| match e {
            AcquisitionError::FileUnavailable { reason, .. } => {
                AcquisitionError::file_unavailable(path, reason)
            }
            other => other,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AcquisitionError> {
        let mut csv = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();
        for record in csv.byte_records() {
            let record = record.map_err(|e| AcquisitionError::file_unavailable("<stream>", e))?;
            rows.push(record);
        }
        Ok(Self { rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Last `n` values of `channel`, after the first parsed row is dropped.
    ///
    /// Cells that are missing or not numeric read as `0.0`.
    pub fn tail_column(&self, channel: usize, n: usize) -> Vec<f64> {
        let body = self.rows.get(1..).unwrap_or_default();
        let start = body.len().saturating_sub(n);
        body[start..]
            .iter()
            .map(|row| parse_cell(row.get(channel + 1)))
            .collect()
    }
}

fn parse_cell(cell: Option<&[u8]>) -> f64 {
    cell.and_then(|raw| std::str::from_utf8(raw).ok())
        .and_then(|text| text.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// One-shot read of `path`, returning up to `n` display values for `channel`.
pub fn read_tail(path: &Path, channel: usize, n: usize) -> Result<Vec<f64>, AcquisitionError> {
    Ok(LogTable::read(path)?.tail_column(channel, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_log(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn tail_skips_first_row_and_keeps_last_n() {
        let file = write_log(
            "time,p1,p2\n\
             1,0.1,1.1\n\
             2,0.2,1.2\n\
             3,0.3,1.3\n\
             4,0.4,1.4\n",
        );
        assert_eq!(read_tail(file.path(), 0, 3).unwrap(), vec![0.2, 0.3, 0.4]);
        assert_eq!(read_tail(file.path(), 1, 2).unwrap(), vec![1.3, 1.4]);
    }

    #[test]
    fn short_file_returns_fewer_values() {
        let file = write_log("time,p1\n1,5.0\n2,6.0\n");
        assert_eq!(read_tail(file.path(), 0, 10).unwrap(), vec![5.0, 6.0]);
    }

    #[test]
    fn empty_body_is_not_an_error() {
        let header_only = write_log("time,p1\n");
        assert!(read_tail(header_only.path(), 0, 5).unwrap().is_empty());
        let empty = write_log("");
        assert!(read_tail(empty.path(), 0, 5).unwrap().is_empty());
    }

    #[test]
    fn malformed_and_missing_cells_read_as_zero() {
        let file = write_log("time,p1,p2\n1,abc,2.0\n2,3.5\n3,4.5,x\n");
        assert_eq!(read_tail(file.path(), 0, 3).unwrap(), vec![0.0, 3.5, 4.5]);
        assert_eq!(read_tail(file.path(), 1, 3).unwrap(), vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_file_is_file_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope-log-dynamic.dat");
        match read_tail(&path, 0, 3) {
            Err(AcquisitionError::FileUnavailable { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn table_counts_every_parsed_row() {
        let table = LogTable::from_reader("a,b\n1,2\n\n3,4\n".as_bytes()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.tail_column(0, 5), vec![2.0, 4.0]);
    }
}

//! Delimited-text I/O for dense `nalgebra` matrices.

use crate::common_io::{open_buf_reader, write_lines};
use nalgebra::DMatrix;
use std::io::BufRead;

/// Read and write a dense matrix as delimited text, one row per line
pub trait DelimOps {
    type Mat;

    /// Read a matrix from a delimited text file (gzipped or not).
    /// Lines starting with `#` or `%` are skipped.
    fn read_delim(file: &str, delim: char) -> anyhow::Result<Self::Mat>;

    /// Write the matrix to a delimited text file (gzipped or not)
    fn write_delim(&self, file: &str, delim: &str) -> anyhow::Result<()>;
}

impl DelimOps for DMatrix<f64> {
    type Mat = Self;

    fn read_delim(file: &str, delim: char) -> anyhow::Result<Self::Mat> {
        let buf: Box<dyn BufRead> = open_buf_reader(file)?;

        let mut data: Vec<f64> = vec![];
        let mut nrows = 0;
        let mut ncols = None;

        for line in buf.lines() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
                continue;
            }
            let row: Vec<f64> = line
                .split(delim)
                .map(|w| w.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|e| anyhow::anyhow!("row {}: {}", nrows + 1, e))?;

            match ncols {
                None => ncols = Some(row.len()),
                Some(d) if d != row.len() => {
                    anyhow::bail!("row {} has {} fields, expected {}", nrows + 1, row.len(), d);
                }
                _ => {}
            }
            data.extend(row);
            nrows += 1;
        }

        let ncols = ncols.ok_or(anyhow::anyhow!("no data in {}", file))?;
        Ok(DMatrix::from_row_iterator(nrows, ncols, data))
    }

    fn write_delim(&self, file: &str, delim: &str) -> anyhow::Result<()> {
        let lines = self
            .row_iter()
            .map(|row| {
                row.iter()
                    .map(|x| format!("{}", *x))
                    .collect::<Vec<String>>()
                    .join(delim)
            })
            .collect::<Vec<_>>();

        write_lines(&lines, file)
    }
}

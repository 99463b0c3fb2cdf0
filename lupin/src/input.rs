//! Dataset loading.
//!
//! The interface contract is a serialized object exposing `xn`, an
//! N x D array of coordinates: JSON `{"xn": [[..], ..]}` (gzipped or
//! not), or a plain delimited text matrix with one point per row.
//! Anything malformed is a configuration error raised before any
//! computation starts.

use crate::common::*;
use mixture_util::common_io::{extension, open_buf_reader};
use mixture_util::dmatrix_io::DelimOps;
use serde::Deserialize;

#[derive(Deserialize)]
struct DatasetFile {
    xn: Vec<Vec<f64>>,
}

/// Read a dataset into an N x D matrix. The format is picked from the
/// file extension: `.json` / `.json.gz` parse the `xn` field, `.csv`
/// is comma-delimited, anything else is treated as tab-delimited.
pub fn read_dataset(path: &str) -> Result<Mat> {
    if !std::path::Path::new(path).is_file() {
        return Err(MixtureError::config(format!(
            "dataset file not found: {}",
            path
        )));
    }

    let ext = extension(path).unwrap_or_else(|| "tsv".into());
    match ext.as_ref() {
        "json" => read_json(path),
        "gz" if path.ends_with(".json.gz") => read_json(path),
        "csv" => Mat::read_delim(path, ',')
            .map_err(|e| MixtureError::config(format!("{}: {}", path, e))),
        _ => Mat::read_delim(path, '\t')
            .map_err(|e| MixtureError::config(format!("{}: {}", path, e))),
    }
}

fn read_json(path: &str) -> Result<Mat> {
    let buf =
        open_buf_reader(path).map_err(|e| MixtureError::config(format!("{}: {}", path, e)))?;
    let parsed: DatasetFile = serde_json::from_reader(buf)
        .map_err(|e| MixtureError::config(format!("malformed dataset {}: {}", path, e)))?;

    let n = parsed.xn.len();
    if n == 0 {
        return Err(MixtureError::config(format!("dataset {} is empty", path)));
    }
    let d = parsed.xn[0].len();
    if d == 0 {
        return Err(MixtureError::config(format!(
            "dataset {} has zero-dimensional points",
            path
        )));
    }
    for (i, row) in parsed.xn.iter().enumerate() {
        if row.len() != d {
            return Err(MixtureError::config(format!(
                "dataset {}: point {} has {} coordinates, expected {}",
                path,
                i,
                row.len(),
                d
            )));
        }
    }

    Ok(Mat::from_row_iterator(
        n,
        d,
        parsed.xn.iter().flatten().copied(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_config_error() {
        let err = read_dataset("/no/such/dataset.json").unwrap_err();
        assert!(matches!(err, MixtureError::Config(_)));
    }

    #[test]
    fn test_json_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"xn": [[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]}}"#).unwrap();

        let mat = read_dataset(path.to_str().unwrap()).unwrap();
        assert_eq!(mat.nrows(), 3);
        assert_eq!(mat.ncols(), 2);
        assert_eq!(mat[(1, 1)], 3.0);
    }

    #[test]
    fn test_ragged_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"xn": [[0.0, 1.0], [2.0]]}}"#).unwrap();

        let err = read_dataset(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, MixtureError::Config(_)));
    }

    #[test]
    fn test_missing_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nofield.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"points": [[0.0, 1.0]]}}"#).unwrap();

        assert!(read_dataset(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_tsv_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "0.0\t1.0").unwrap();
        writeln!(f, "2.0\t3.0").unwrap();

        let mat = read_dataset(path.to_str().unwrap()).unwrap();
        assert_eq!(mat.nrows(), 2);
        assert_eq!(mat[(1, 0)], 2.0);
    }
}

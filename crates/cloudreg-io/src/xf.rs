use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use cloudreg_geometry::linalg::{self, Mat4};

/// Error types for `.xf` transform files.
#[derive(Debug, thiserror::Error)]
pub enum XfError {
    /// Error reading or writing the file.
    #[error("error reading or writing file")]
    Io(#[from] std::io::Error),

    /// A file that does not hold exactly four rows.
    #[error("expected 4 matrix rows, found {0}")]
    MalformedMatrix(usize),

    /// A row with the wrong number of fields.
    #[error("malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        /// 1-based line number of the row.
        line: usize,
        /// Expected field count.
        expected: usize,
        /// Field count actually found.
        found: usize,
    },

    /// A field that does not parse as a float.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number of the row.
        line: usize,
        /// Description of the offending field.
        message: String,
    },
}

/// Read a 4x4 homogeneous transform from a `.xf` file: four lines of four
/// whitespace-separated floats, row-major. Empty lines are skipped.
pub fn read_xf(path: impl AsRef<Path>) -> Result<Mat4, XfError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    // collect non-empty rows first so the row count can be validated whole
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if !line.trim().is_empty() {
            rows.push((idx + 1, line));
        }
    }
    if rows.len() != 4 {
        return Err(XfError::MalformedMatrix(rows.len()));
    }

    let mut m = [[0.0; 4]; 4];
    for (out, (line_no, line)) in m.iter_mut().zip(rows.iter()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(XfError::MalformedRecord {
                line: *line_no,
                expected: 4,
                found: fields.len(),
            });
        }
        for (v, s) in out.iter_mut().zip(fields.iter()) {
            *v = s.parse::<f64>().map_err(|e| XfError::Parse {
                line: *line_no,
                message: format!("{}: {}", s, e),
            })?;
        }
    }
    Ok(m)
}

/// Read a transform, falling back to identity when the file is missing.
///
/// The fallback is logged as a warning; any other failure still surfaces as
/// an error.
pub fn read_xf_or_identity(path: impl AsRef<Path>) -> Result<Mat4, XfError> {
    match read_xf(path.as_ref()) {
        Ok(m) => Ok(m),
        Err(XfError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!(
                "transform file {} not found, defaulting to identity",
                path.as_ref().display()
            );
            Ok(linalg::identity())
        }
        Err(e) => Err(e),
    }
}

fn write_rows(path: impl AsRef<Path>, m: &Mat4) -> Result<(), XfError> {
    if let Some(dir) = path.as_ref().parent() {
        std::fs::create_dir_all(dir)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for row in m {
        let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", fields.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a 4x4 transform to a `.xf` file, row-major, one row per line.
///
/// Parent directories are created as needed.
pub fn write_xf(path: impl AsRef<Path>, m: &Mat4) -> Result<(), XfError> {
    write_rows(path, m)
}

/// Write the same 4x4 matrix as a `.txt` mirror for third-party point cloud
/// viewers. Write-only: this system never reads the `.txt` form back.
pub fn write_txt(path: impl AsRef<Path>, m: &Mat4) -> Result<(), XfError> {
    write_rows(path, m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_read_xf() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pose.xf");
        std::fs::write(
            &path,
            "1 0 0 0.5\n0 1 0 -2\n0 0 1 0\n0 0 0 1\n",
        )?;

        let m = read_xf(&path)?;
        assert_relative_eq!(m[0][3], 0.5);
        assert_relative_eq!(m[1][3], -2.0);
        assert_relative_eq!(m[3][3], 1.0);
        Ok(())
    }

    #[test]
    fn test_read_xf_wrong_row_count() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("short.xf");
        std::fs::write(&path, "1 0 0 0\n0 1 0 0\n0 0 1 0\n")?;
        assert!(matches!(read_xf(&path), Err(XfError::MalformedMatrix(3))));
        Ok(())
    }

    #[test]
    fn test_read_xf_wrong_column_count() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("wide.xf");
        std::fs::write(&path, "1 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n")?;
        assert!(matches!(
            read_xf(&path),
            Err(XfError::MalformedRecord {
                line: 1,
                expected: 4,
                found: 3,
            })
        ));
        Ok(())
    }

    #[test]
    fn test_missing_file_defaults_to_identity() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let m = read_xf_or_identity(dir.path().join("absent.xf"))?;
        assert_eq!(m, linalg::identity());
        Ok(())
    }

    #[test]
    fn test_write_read_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out/pose.xf");

        let mut m = linalg::identity();
        m[0][3] = 1.25;
        m[2][1] = -0.5;
        write_xf(&path, &m)?;
        let loaded = read_xf(&path)?;
        assert_eq!(loaded, m);
        Ok(())
    }
}

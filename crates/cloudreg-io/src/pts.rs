use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use cloudreg_geometry::{GeometryError, Point};

/// Error types for `.pts` files.
#[derive(Debug, thiserror::Error)]
pub enum PtsError {
    /// Error reading or writing the file.
    #[error("error reading or writing file")]
    Io(#[from] std::io::Error),

    /// A record with the wrong number of fields.
    #[error("malformed record at line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        /// 1-based line number of the record.
        line: usize,
        /// Expected field count.
        expected: usize,
        /// Field count actually found.
        found: usize,
    },

    /// A field that does not parse as a float.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number of the record.
        line: usize,
        /// Description of the offending field.
        message: String,
    },

    /// Invalid point geometry.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

fn parse_field(s: &str, line: usize) -> Result<f64, PtsError> {
    s.parse::<f64>().map_err(|e| PtsError::Parse {
        line,
        message: format!("{}: {}", s, e),
    })
}

/// Read a `.pts` file: one point per line, six whitespace-separated floats
/// `x y z nx ny nz` (position then normal). Empty lines are skipped; any
/// other field count is a malformed record.
pub fn read_pts(path: impl AsRef<Path>) -> Result<Vec<Point>, PtsError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut points = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 6 {
            return Err(PtsError::MalformedRecord {
                line: idx + 1,
                expected: 6,
                found: fields.len(),
            });
        }

        let mut values = [0.0; 6];
        for (v, s) in values.iter_mut().zip(fields.iter()) {
            *v = parse_field(s, idx + 1)?;
        }
        points.push(Point::with_normal(
            values[..3].to_vec(),
            values[3..].to_vec(),
        )?);
    }

    Ok(points)
}

/// Write a point set to a `.pts` file, one `x y z nx ny nz` line per point.
///
/// Parent directories are created as needed.
pub fn write_pts(path: impl AsRef<Path>, points: &[Point]) -> Result<(), PtsError> {
    if let Some(dir) = path.as_ref().parent() {
        std::fs::create_dir_all(dir)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for p in points {
        let fields: Vec<String> = p
            .position()
            .iter()
            .chain(p.normal().iter())
            .map(|v| v.to_string())
            .collect();
        writeln!(writer, "{}", fields.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

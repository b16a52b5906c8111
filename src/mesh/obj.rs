//! Plain-text OBJ output and input.
//!
//! Only `v` and `f` records are written. Positions are converted from the
//! Z-up sky frame to Y-up on output, exactly once, by [`write_obj`].

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::util::{zup_to_yup, DVec3, Error, Result};
use super::Mesh;

/// Write one line per row: `tag c0 c1 ...`.
pub fn write_records<W, T, R>(w: &mut W, tag: &str, rows: impl IntoIterator<Item = R>) -> io::Result<()>
where
    W: Write,
    T: Display,
    R: AsRef<[T]>,
{
    for row in rows {
        w.write_all(tag.as_bytes())?;
        for c in row.as_ref() {
            write!(w, " {}", c)?;
        }
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Serialize a mesh: all `v` records (Y-up) followed by all `f` records.
pub fn write_obj<W: Write>(w: &mut W, mesh: &Mesh) -> Result<()> {
    let vertices = mesh.positions().iter().map(|&p| {
        let q = zup_to_yup(p);
        [q.x, q.y, q.z]
    });
    write_records(w, "v", vertices)?;
    write_records(w, "f", mesh.faces())?;
    Ok(())
}

/// Write a mesh to an OBJ file.
pub fn save_obj(path: impl AsRef<Path>, mesh: &Mesh) -> Result<()> {
    let path = path.as_ref();
    let mut w = BufWriter::new(File::create(path)?);
    write_obj(&mut w, mesh)?;
    w.flush()?;
    info!(
        path = %path.display(),
        vertices = mesh.num_vertices(),
        faces = mesh.num_faces(),
        "wrote OBJ"
    );
    Ok(())
}

/// Parse `v` and `f` records.
///
/// Positions are returned as stored in the file (Y-up). Blank lines,
/// comments and other record types are skipped. Face entries may use
/// `v/vt/vn` syntax and negative (relative) indices; every face must have
/// the same number of vertices.
pub fn read_obj<R: BufRead>(reader: R) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let mut arity = 0usize;

    for (n, line) in reader.lines().enumerate() {
        let line_no = n + 1;
        let line = line?;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords = tokens
                    .take(3)
                    .map(|t| t.parse::<f64>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| Error::parse(line_no, format!("bad vertex: {e}")))?;
                if coords.len() < 3 {
                    return Err(Error::parse(line_no, "vertex needs 3 coordinates"));
                }
                positions.push(DVec3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let start = indices.len();
                for t in tokens {
                    let index = resolve_index(t, positions.len())
                        .ok_or_else(|| Error::parse(line_no, format!("bad face index {t:?}")))?;
                    indices.push(index);
                }
                let count = indices.len() - start;
                if arity == 0 {
                    arity = count;
                }
                if count == 0 || count != arity {
                    return Err(Error::parse(
                        line_no,
                        format!("face has {count} vertices, expected {arity}"),
                    ));
                }
            }
            _ => {}
        }
    }
    debug!(vertices = positions.len(), faces = indices.len() / arity.max(1), "parsed OBJ");

    Mesh::new(positions, indices, arity)
}

/// 1-based absolute index of a face entry (`7`, `7/1/2`, `-1`).
fn resolve_index(token: &str, num_vertices: usize) -> Option<u32> {
    let raw: i64 = token.split('/').next()?.parse().ok()?;
    let index = if raw < 0 { num_vertices as i64 + raw + 1 } else { raw };
    (index >= 1 && index <= u32::MAX as i64).then_some(index as u32)
}

/// Read an OBJ file.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    read_obj(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_records() {
        let mut out = Vec::new();
        write_records(&mut out, "f", [[1u32, 2, 3, 4], [5, 6, 7, 8]]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "f 1 2 3 4\nf 5 6 7 8\n");

        let mut out = Vec::new();
        write_records(&mut out, "v", [[0.5f64, -1.0, 2.25]]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "v 0.5 -1 2.25\n");
    }

    #[test]
    fn test_write_obj_permutes_axes() {
        let mesh = Mesh::new(
            vec![DVec3::new(1.0, 2.0, 3.0), DVec3::ZERO, DVec3::X],
            vec![1, 2, 3],
            3,
        )
        .unwrap();
        let mut out = Vec::new();
        write_obj(&mut out, &mesh).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().next(), Some("v 1 3 -2"));
        assert_eq!(text.lines().last(), Some("f 1 2 3"));
    }

    #[test]
    fn test_read_obj_variants() {
        let src = "# comment\no sky\nv 0 0 0\nv 1 0 0 1.0\nv 0 1 0\n\nvn 0 0 1\nf 1/1/1 2//1 -1\n";
        let mesh = read_obj(src.as_bytes()).unwrap();
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.indices(), &[1, 2, 3]);
        assert_eq!(mesh.arity(), 3);
    }

    #[test]
    fn test_read_obj_errors() {
        let err = read_obj("v 0 0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));

        let err = read_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nf 1 2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 5, .. }));

        let err = read_obj("v 0 0 0\nf 1 x 1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));

        assert!(matches!(
            read_obj("v 0 0 0\nf 1 2 3\n".as_bytes()),
            Err(Error::InvalidMesh(_))
        ));
    }
}

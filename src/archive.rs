//! ZIP packing of named outputs.
//!
//! Members are written in the order given, with names reduced to a bare file
//! name and made unique (case-insensitively) before packing.

use crate::imaging::NamedOutput;
use crate::naming;
use std::io::{Cursor, Write};
use thiserror::Error;
use tracing::debug;
use zip::CompressionMethod;
use zip::result::ZipError;
use zip::write::{FileOptions, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("nothing to archive")]
    Empty,
    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Archive member names for `outputs`: sanitized, then disambiguated.
pub fn member_names(outputs: &[NamedOutput]) -> Vec<String> {
    let mut names: Vec<String> = outputs
        .iter()
        .enumerate()
        .map(|(i, output)| naming::sanitize(&output.file_name, &format!("output_{}", i + 1)))
        .collect();
    naming::disambiguate(&mut names);
    names
}

/// Pack outputs into an in-memory ZIP.
pub fn pack_zip(outputs: &[NamedOutput]) -> Result<Vec<u8>, ArchiveError> {
    if outputs.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, output) in member_names(outputs).iter().zip(outputs) {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&output.bytes)?;
        }
        zip.finish()?;
    }
    debug!(members = outputs.len(), bytes = buffer.len(), "packed archive");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Dimensions, OutputFormat};
    use std::io::Read;
    use zip::ZipArchive;

    fn output(name: &str, bytes: &[u8]) -> NamedOutput {
        NamedOutput {
            file_name: name.to_string(),
            bytes: bytes.to_vec(),
            format: OutputFormat::Png,
            dimensions: Dimensions::new(1, 1).unwrap(),
        }
    }

    fn read_members(zip: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(zip)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn packs_members_in_order() {
        let zip = pack_zip(&[output("b.png", b"second"), output("a.png", b"first")]).unwrap();
        let members = read_members(&zip);
        assert_eq!(
            members,
            vec![
                ("b.png".to_string(), b"second".to_vec()),
                ("a.png".to_string(), b"first".to_vec())
            ]
        );
    }

    #[test]
    fn member_names_are_flat_and_unique() {
        let names = member_names(&[
            output("../up/x.png", b""),
            output("X.PNG", b""),
            output("..", b""),
        ]);
        assert_eq!(names, vec!["x.png", "X_1.PNG", "output_3"]);
    }

    #[test]
    fn empty_archive_is_an_error() {
        assert!(matches!(pack_zip(&[]), Err(ArchiveError::Empty)));
    }
}

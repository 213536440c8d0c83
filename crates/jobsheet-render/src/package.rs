//! XLSX package container
//!
//! An XLSX file is a zip archive of XML parts. `Package` holds every part in
//! memory in archive order so that a patched copy can be written back with
//! the untouched parts carried over as they were.

use jobsheet_core::ReportError;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// One archive entry
#[derive(Clone, Debug)]
struct Part {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// In-memory XLSX package
#[derive(Clone, Debug, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Decode a package from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReportError> {
        let unreadable = |e: zip::result::ZipError| ReportError::TemplateUnreadable(e.to_string());
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(unreadable)?;

        let mut parts = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx).map_err(unreadable)?;
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data).map_err(|e| {
                ReportError::TemplateUnreadable(format!("{}: {e}", entry.name()))
            })?;
            parts.push(Part {
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
                data,
            });
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| !p.is_dir && p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// A part that must exist for the package to be usable
    pub fn required_part(&self, name: &str) -> Result<&[u8], ReportError> {
        self.part(name)
            .ok_or_else(|| ReportError::TemplateUnreadable(format!("missing part {name}")))
    }

    /// Replace a part, or append it when absent
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
                is_dir: false,
            }),
        }
    }

    /// Encode the package as a deflated zip archive
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReportError> {
        let format = |e: zip::result::ZipError| ReportError::Format(e.to_string());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for part in &self.parts {
            if part.is_dir {
                zip.add_directory(part.name.as_str(), options).map_err(format)?;
            } else {
                zip.start_file(part.name.as_str(), options).map_err(format)?;
                zip.write_all(&part.data)?;
            }
        }
        Ok(zip.finish().map_err(format)?.into_inner())
    }
}

/// Pack named files into a zip archive
pub fn write_archive<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> Result<Vec<u8>, ReportError> {
    let format = |e: zip::result::ZipError| ReportError::Format(e.to_string());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(name, options).map_err(format)?;
        zip.write_all(data)?;
    }
    Ok(zip.finish().map_err(format)?.into_inner())
}

/// Names and contents of every file in a zip archive
pub fn read_archive(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>, ReportError> {
    Package::from_bytes(bytes).map(|package| {
        package
            .parts
            .into_iter()
            .filter(|p| !p.is_dir)
            .map(|p| (p.name, p.data))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parts_survive_a_round_trip() {
        let bytes = write_archive([
            ("[Content_Types].xml", b"<Types/>".as_slice()),
            ("xl/workbook.xml", b"<workbook/>".as_slice()),
        ])
        .unwrap();

        let mut package = Package::from_bytes(&bytes).unwrap();
        assert_eq!(package.part("xl/workbook.xml"), Some(b"<workbook/>".as_slice()));
        package.set_part("xl/workbook.xml", b"<workbook a=\"1\"/>".to_vec());

        let entries = read_archive(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(
            entries,
            vec![
                ("[Content_Types].xml".to_string(), b"<Types/>".to_vec()),
                ("xl/workbook.xml".to_string(), b"<workbook a=\"1\"/>".to_vec()),
            ]
        );
    }

    #[test]
    fn garbage_is_unreadable() {
        let err = Package::from_bytes(b"not a zip").unwrap_err();
        assert!(matches!(err, ReportError::TemplateUnreadable(_)));
    }

    #[test]
    fn missing_part_is_reported() {
        let bytes = write_archive([("a.xml", b"<a/>".as_slice())]).unwrap();
        let package = Package::from_bytes(&bytes).unwrap();
        let err = package.required_part("xl/workbook.xml").unwrap_err();
        assert!(err.to_string().contains("xl/workbook.xml"));
    }
}

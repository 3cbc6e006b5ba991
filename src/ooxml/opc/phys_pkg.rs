//! Physical package access: the ZIP container underneath a spreadsheet package.
//!
//! The reader and writer are scoped resources; the archive is released when
//! they are dropped, on success and on every error path.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PackURI};

/// Physical package reader over an in-memory ZIP archive.
pub struct PhysPkgReader {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl PhysPkgReader {
    /// Open a package file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Open a package from owned bytes. Fails if the bytes are not a ZIP archive.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        Ok(Self { archive })
    }

    /// Read a part, failing with [`OpcError::PartNotFound`] when it is absent.
    pub fn blob_for(&mut self, pack_uri: &PackURI) -> Result<Vec<u8>> {
        self.try_blob_for(pack_uri)?
            .ok_or_else(|| OpcError::PartNotFound(pack_uri.to_string()))
    }

    /// Read a part if it exists.
    pub fn try_blob_for(&mut self, pack_uri: &PackURI) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(pack_uri.membername()) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut blob = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut blob)?;
        Ok(Some(blob))
    }

    /// The [Content_Types].xml part.
    pub fn content_types_xml(&mut self) -> Result<Vec<u8>> {
        let uri = PackURI::new(CONTENT_TYPES_URI)?;
        self.blob_for(&uri)
    }

    /// Relationships of `source_uri`, or `None` if it has no `.rels` part.
    pub fn rels_xml_for(&mut self, source_uri: &PackURI) -> Result<Option<Vec<u8>>> {
        let rels_uri = source_uri.rels_uri()?;
        self.try_blob_for(&rels_uri)
    }

    /// Check if a member exists without decompressing it.
    pub fn contains(&self, pack_uri: &PackURI) -> bool {
        self.archive.index_for_name(pack_uri.membername()).is_some()
    }

    /// All member names, in archive order.
    pub fn member_names(&self) -> Vec<String> {
        self.archive.file_names().map(String::from).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }
}

/// Physical package writer producing an in-memory ZIP archive.
pub struct PhysPkgWriter {
    archive: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl PhysPkgWriter {
    /// Writer using Deflate for every entry.
    pub fn new() -> Self {
        Self::with_compression(true)
    }

    /// Writer using Deflate, or storing entries uncompressed.
    pub fn with_compression(deflate: bool) -> Self {
        let method = if deflate {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        Self {
            archive: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(method),
        }
    }

    /// Write a part.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        self.archive.start_file(pack_uri.membername(), self.options)?;
        self.archive.write_all(blob)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.archive.finish()?.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut writer = PhysPkgWriter::new();
        let pack_uri = PackURI::new("/xl/workbook.xml").unwrap();
        writer.write(&pack_uri, b"<workbook/>").unwrap();
        let zip_data = writer.finish().unwrap();

        let mut reader = PhysPkgReader::from_bytes(zip_data).unwrap();
        assert!(reader.contains(&pack_uri));
        assert_eq!(reader.blob_for(&pack_uri).unwrap(), b"<workbook/>");
    }

    #[test]
    fn test_missing_part_and_rels() {
        let mut writer = PhysPkgWriter::with_compression(false);
        let content_types = PackURI::new(CONTENT_TYPES_URI).unwrap();
        writer.write(&content_types, b"<Types/>").unwrap();
        let mut reader = PhysPkgReader::from_bytes(writer.finish().unwrap()).unwrap();

        let styles = PackURI::new("/xl/styles.xml").unwrap();
        assert!(matches!(reader.blob_for(&styles), Err(OpcError::PartNotFound(_))));
        assert_eq!(reader.try_blob_for(&styles).unwrap(), None);
        assert_eq!(reader.rels_xml_for(&styles).unwrap(), None);
        assert_eq!(reader.content_types_xml().unwrap(), b"<Types/>");
        assert_eq!(reader.member_names(), ["[Content_Types].xml"]);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(PhysPkgReader::from_bytes(b"definitely not a zip".to_vec()).is_err());
    }
}

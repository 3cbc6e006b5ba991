//! End-to-end tests: write a workbook, inspect or damage the package, read it back.

mod round_trip;

use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::phys_pkg::{PhysPkgReader, PhysPkgWriter};

/// Text of one archive entry.
fn entry_text(bytes: &[u8], path: &str) -> String {
    let mut reader = PhysPkgReader::from_bytes(bytes.to_vec()).expect("open package");
    let uri = PackURI::new(path).expect("valid part name");
    String::from_utf8(reader.blob_for(&uri).expect("entry exists")).expect("utf-8 entry")
}

/// Copy a package, letting `edit` replace or (with `None`) drop each entry.
fn rewrite_package(bytes: &[u8], mut edit: impl FnMut(&str, Vec<u8>) -> Option<Vec<u8>>) -> Vec<u8> {
    let mut reader = PhysPkgReader::from_bytes(bytes.to_vec()).expect("open package");
    let mut writer = PhysPkgWriter::new();
    for name in reader.member_names() {
        let uri = PackURI::from_member(&name).expect("valid member name");
        let blob = reader.blob_for(&uri).expect("read entry");
        if let Some(blob) = edit(&name, blob) {
            writer.write(&uri, &blob).expect("write entry");
        }
    }
    writer.finish().expect("finish package")
}

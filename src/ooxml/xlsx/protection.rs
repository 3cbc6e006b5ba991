//! Worksheet and workbook protection.
//!
//! Passwords are never stored in the file, only hashes. Writing uses a
//! [`PasswordHasher`]; the built-in [`LegacyPasswordHasher`] produces the
//! 16-bit legacy hash and [`Sha512PasswordHasher`] the salted, iterated one.
//! Reading preserves hashes it recognizes so they are written back unchanged.

use std::collections::HashMap;
use std::fmt::{self, Write as FmtWrite};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use bitflags::bitflags;
use sha2::{Digest, Sha512};

use crate::common::xml::escape_attribute;
use crate::ooxml::error::{OoxmlError, Result};

bitflags! {
    /// Actions still allowed on a protected sheet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SheetPermissions: u32 {
        const SELECT_LOCKED_CELLS = 1 << 0;
        const SELECT_UNLOCKED_CELLS = 1 << 1;
        const FORMAT_CELLS = 1 << 2;
        const FORMAT_COLUMNS = 1 << 3;
        const FORMAT_ROWS = 1 << 4;
        const INSERT_COLUMNS = 1 << 5;
        const INSERT_ROWS = 1 << 6;
        const INSERT_HYPERLINKS = 1 << 7;
        const DELETE_COLUMNS = 1 << 8;
        const DELETE_ROWS = 1 << 9;
        const SORT = 1 << 10;
        const AUTO_FILTER = 1 << 11;
        const PIVOT_TABLES = 1 << 12;
        const EDIT_OBJECTS = 1 << 13;
        const EDIT_SCENARIOS = 1 << 14;
    }
}

impl Default for SheetPermissions {
    fn default() -> Self {
        SheetPermissions::SELECT_LOCKED_CELLS | SheetPermissions::SELECT_UNLOCKED_CELLS
    }
}

/// Permission flag, attribute name, and whether the attribute defaults to locked.
const PERMISSION_ATTRIBUTES: [(SheetPermissions, &str, bool); 15] = [
    (SheetPermissions::EDIT_OBJECTS, "objects", false),
    (SheetPermissions::EDIT_SCENARIOS, "scenarios", false),
    (SheetPermissions::FORMAT_CELLS, "formatCells", true),
    (SheetPermissions::FORMAT_COLUMNS, "formatColumns", true),
    (SheetPermissions::FORMAT_ROWS, "formatRows", true),
    (SheetPermissions::INSERT_COLUMNS, "insertColumns", true),
    (SheetPermissions::INSERT_ROWS, "insertRows", true),
    (SheetPermissions::INSERT_HYPERLINKS, "insertHyperlinks", true),
    (SheetPermissions::DELETE_COLUMNS, "deleteColumns", true),
    (SheetPermissions::DELETE_ROWS, "deleteRows", true),
    (SheetPermissions::SELECT_LOCKED_CELLS, "selectLockedCells", false),
    (SheetPermissions::SORT, "sort", true),
    (SheetPermissions::AUTO_FILTER, "autoFilter", true),
    (SheetPermissions::PIVOT_TABLES, "pivotTables", true),
    (SheetPermissions::SELECT_UNLOCKED_CELLS, "selectUnlockedCells", false),
];

/// Hash algorithms whose results are preserved on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SHA-1" | "SHA1" => Some(Self::Sha1),
            "SHA-256" | "SHA256" => Some(Self::Sha256),
            "SHA-384" | "SHA384" => Some(Self::Sha384),
            "SHA-512" | "SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

/// A stored password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordHash {
    /// Four hex digits of the legacy 16-bit hash
    Legacy(String),
    /// Salted, iterated hash; values are base64 as found in the file
    Modern {
        algorithm: HashAlgorithm,
        hash_value: String,
        salt_value: String,
        spin_count: u32,
    },
}

/// Turns a plain password into a stored hash.
pub trait PasswordHasher: Send + Sync + fmt::Debug {
    fn hash(&self, password: &str) -> Result<PasswordHash>;
}

/// The 16-bit legacy password hash.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyPasswordHasher;

impl PasswordHasher for LegacyPasswordHasher {
    fn hash(&self, password: &str) -> Result<PasswordHash> {
        let units: Vec<u16> = password.encode_utf16().collect();
        let mut hash: u16 = 0;
        for &unit in units.iter().rev() {
            hash = ((hash >> 14) & 0x01) | ((hash << 1) & 0x7FFF);
            hash ^= unit;
        }
        hash = ((hash >> 14) & 0x01) | ((hash << 1) & 0x7FFF);
        hash ^= units.len() as u16;
        hash ^= 0xCE4B;
        Ok(PasswordHash::Legacy(format!("{:04X}", hash)))
    }
}

/// Salted SHA-512 hash iterated `spin_count` times.
#[derive(Debug, Clone, Copy)]
pub struct Sha512PasswordHasher {
    pub spin_count: u32,
}

impl Default for Sha512PasswordHasher {
    fn default() -> Self {
        Self { spin_count: 100_000 }
    }
}

impl Sha512PasswordHasher {
    pub fn with_spin_count(spin_count: u32) -> Self {
        Self { spin_count }
    }

    /// Hash with a caller-chosen salt.
    pub fn hash_with_salt(&self, password: &str, salt: &[u8]) -> PasswordHash {
        let mut pw_bytes = Vec::with_capacity(password.len() * 2);
        for unit in password.encode_utf16() {
            pw_bytes.extend_from_slice(&unit.to_le_bytes());
        }

        // H0 = H(salt || password), Hn = H(Hn-1 || n as u32 LE)
        let mut hasher = Sha512::new();
        hasher.update(salt);
        hasher.update(&pw_bytes);
        let mut hash = hasher.finalize().to_vec();
        for i in 0..self.spin_count {
            let mut hasher = Sha512::new();
            hasher.update(&hash);
            hasher.update(i.to_le_bytes());
            hash = hasher.finalize().to_vec();
        }

        PasswordHash::Modern {
            algorithm: HashAlgorithm::Sha512,
            hash_value: BASE64_ENGINE.encode(&hash),
            salt_value: BASE64_ENGINE.encode(salt),
            spin_count: self.spin_count,
        }
    }
}

impl PasswordHasher for Sha512PasswordHasher {
    fn hash(&self, password: &str) -> Result<PasswordHash> {
        let salt: [u8; 16] = rand::random();
        Ok(self.hash_with_salt(password, &salt))
    }
}

/// Protection of a single worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetProtection {
    pub permissions: SheetPermissions,
    /// Plain password, hashed on write
    pub password: Option<String>,
    /// Hash read from a file or computed elsewhere; takes precedence over `password`
    pub hash: Option<PasswordHash>,
}

impl SheetProtection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_permissions(mut self, permissions: SheetPermissions) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Protection of the workbook structure and windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookProtection {
    pub lock_structure: bool,
    pub lock_windows: bool,
    pub password: Option<String>,
    pub hash: Option<PasswordHash>,
}

impl WorkbookProtection {
    /// Protection locking the sheet structure.
    pub fn structure() -> Self {
        Self {
            lock_structure: true,
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Attribute names carrying a hash on one protection element.
struct HashAttributes {
    legacy: &'static str,
    algorithm: &'static str,
    hash_value: &'static str,
    salt_value: &'static str,
    spin_count: &'static str,
}

const SHEET_HASH: HashAttributes = HashAttributes {
    legacy: "password",
    algorithm: "algorithmName",
    hash_value: "hashValue",
    salt_value: "saltValue",
    spin_count: "spinCount",
};

const WORKBOOK_HASH: HashAttributes = HashAttributes {
    legacy: "workbookPassword",
    algorithm: "workbookAlgorithmName",
    hash_value: "workbookHashValue",
    salt_value: "workbookSaltValue",
    spin_count: "workbookSpinCount",
};

fn effective_hash(
    hash: &Option<PasswordHash>,
    password: &Option<String>,
    hasher: &dyn PasswordHasher,
) -> Result<Option<PasswordHash>> {
    match (hash, password) {
        (Some(hash), _) => Ok(Some(hash.clone())),
        (None, Some(password)) => hasher.hash(password).map(Some),
        (None, None) => Ok(None),
    }
}

fn write_hash(xml: &mut String, hash: &PasswordHash, names: &HashAttributes) -> Result<()> {
    match hash {
        PasswordHash::Legacy(value) => {
            write!(xml, r#" {}="{}""#, names.legacy, escape_attribute(value))?;
        },
        PasswordHash::Modern {
            algorithm,
            hash_value,
            salt_value,
            spin_count,
        } => {
            write!(
                xml,
                r#" {}="{}" {}="{}" {}="{}" {}="{}""#,
                names.algorithm,
                algorithm.as_str(),
                names.hash_value,
                escape_attribute(hash_value),
                names.salt_value,
                escape_attribute(salt_value),
                names.spin_count,
                spin_count
            )?;
        },
    }
    Ok(())
}

/// Write a `<sheetProtection>` element.
pub(crate) fn write_sheet_protection(
    xml: &mut String,
    protection: &SheetProtection,
    hasher: &dyn PasswordHasher,
) -> Result<()> {
    xml.push_str("<sheetProtection");
    if let Some(hash) = effective_hash(&protection.hash, &protection.password, hasher)? {
        write_hash(xml, &hash, &SHEET_HASH)?;
    }
    xml.push_str(r#" sheet="1""#);
    for (flag, name, locked_by_default) in PERMISSION_ATTRIBUTES {
        let locked = !protection.permissions.contains(flag);
        if locked != locked_by_default {
            write!(xml, r#" {}="{}""#, name, if locked { 1 } else { 0 })?;
        }
    }
    xml.push_str("/>");
    Ok(())
}

/// Write a `<workbookProtection>` element.
pub(crate) fn write_workbook_protection(
    xml: &mut String,
    protection: &WorkbookProtection,
    hasher: &dyn PasswordHasher,
) -> Result<()> {
    xml.push_str("<workbookProtection");
    if let Some(hash) = effective_hash(&protection.hash, &protection.password, hasher)? {
        write_hash(xml, &hash, &WORKBOOK_HASH)?;
    }
    if protection.lock_structure {
        xml.push_str(r#" lockStructure="1""#);
    }
    if protection.lock_windows {
        xml.push_str(r#" lockWindows="1""#);
    }
    xml.push_str("/>");
    Ok(())
}

#[inline]
fn is_true(value: &str) -> bool {
    value == "1" || value == "true"
}

fn read_hash(
    attrs: &HashMap<String, String>,
    names: &HashAttributes,
    ignore_unsupported: bool,
) -> Result<Option<PasswordHash>> {
    if let Some(name) = attrs.get(names.algorithm) {
        let Some(algorithm) = HashAlgorithm::from_name(name) else {
            if ignore_unsupported {
                log::warn!("dropping password hash with unsupported algorithm '{}'", name);
                return Ok(None);
            }
            return Err(OoxmlError::NotSupportedContent(format!(
                "password hash algorithm '{}'",
                name
            )));
        };
        return Ok(Some(PasswordHash::Modern {
            algorithm,
            hash_value: attrs.get(names.hash_value).cloned().unwrap_or_default(),
            salt_value: attrs.get(names.salt_value).cloned().unwrap_or_default(),
            spin_count: attrs
                .get(names.spin_count)
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }));
    }
    Ok(attrs.get(names.legacy).cloned().map(PasswordHash::Legacy))
}

/// Decode the attributes of a `<sheetProtection>` element.
///
/// Returns `None` when the element does not actually protect the sheet.
pub(crate) fn read_sheet_protection(
    attrs: &HashMap<String, String>,
    ignore_unsupported: bool,
) -> Result<Option<SheetProtection>> {
    if !attrs.get("sheet").is_some_and(|v| is_true(v)) {
        return Ok(None);
    }

    let mut permissions = SheetPermissions::empty();
    for (flag, name, locked_by_default) in PERMISSION_ATTRIBUTES {
        let locked = attrs.get(name).map_or(locked_by_default, |v| is_true(v));
        permissions.set(flag, !locked);
    }

    Ok(Some(SheetProtection {
        permissions,
        password: None,
        hash: read_hash(attrs, &SHEET_HASH, ignore_unsupported)?,
    }))
}

/// Decode the attributes of a `<workbookProtection>` element.
pub(crate) fn read_workbook_protection(
    attrs: &HashMap<String, String>,
    ignore_unsupported: bool,
) -> Result<WorkbookProtection> {
    Ok(WorkbookProtection {
        lock_structure: attrs.get("lockStructure").is_some_and(|v| is_true(v)),
        lock_windows: attrs.get("lockWindows").is_some_and(|v| is_true(v)),
        password: None,
        hash: read_hash(attrs, &WORKBOOK_HASH, ignore_unsupported)?,
    })
}

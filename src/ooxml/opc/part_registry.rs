//! Registry of the parts emitted by one write pass.
//!
//! Every part carries an order number taken from one of four disjoint bands.
//! After all parts are registered, [`PartRegistry::finalize`] sorts them by
//! order number and assigns relationship IDs equal to the 1-based sorted
//! position. Because each band is large enough for any realistic document,
//! adding sheets or plugin parts never shifts the IDs of the root parts.
//!
//! | Band | Order numbers | Parts |
//! |------|---------------|-------|
//! | workbook | `0` | `xl/workbook.xml` |
//! | root/metadata | `1_000..10_000` | properties, theme, styles, shared strings |
//! | sheet | `10_000..2_000_000` | one per worksheet, `order - 10_000` is the sheet index |
//! | post-sheet | `2_000_000..` | plugin-contributed parts |

use std::collections::HashSet;

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::packuri::PackURI;

/// Order number of the workbook part.
pub const WORKBOOK_ORDER: u32 = 0;

/// First order number of the root/metadata band.
pub const ROOT_BAND_START: u32 = 1_000;

/// First order number of the sheet band.
pub const SHEET_BAND_START: u32 = 10_000;

/// First order number of the post-sheet (plugin) band.
pub const POST_SHEET_BAND_START: u32 = 2_000_000;

/// Where a part's relationship lives and how its order number is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    /// Related from the package itself (`_rels/.rels`)
    Root,
    /// A worksheet, related from the workbook
    Sheet,
    /// Any other part, related from the workbook
    Other,
}

/// The band an order number falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Workbook,
    Root,
    Sheet,
    PostSheet,
}

impl Band {
    /// Classify an order number. Numbers between the workbook and the root band
    /// belong to no band.
    pub fn of(order: u32) -> Option<Band> {
        match order {
            WORKBOOK_ORDER => Some(Band::Workbook),
            o if o < ROOT_BAND_START => None,
            o if o < SHEET_BAND_START => Some(Band::Root),
            o if o < POST_SHEET_BAND_START => Some(Band::Sheet),
            _ => Some(Band::PostSheet),
        }
    }
}

impl PartKind {
    /// Whether a part of this kind may take an order number in `band`.
    pub fn accepts(self, band: Band) -> bool {
        match self {
            PartKind::Sheet => band == Band::Sheet,
            PartKind::Root => matches!(band, Band::Workbook | Band::Root),
            PartKind::Other => matches!(band, Band::Root | Band::PostSheet),
        }
    }
}

/// Description of one package part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    pub path: PackURI,
    pub kind: PartKind,
    pub order: u32,
    pub content_type: String,
    pub relationship_type: String,
}

impl PartDescriptor {
    pub fn new(
        path: PackURI,
        kind: PartKind,
        order: u32,
        content_type: impl Into<String>,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            path,
            kind,
            order,
            content_type: content_type.into(),
            relationship_type: relationship_type.into(),
        }
    }

    /// Order number of the worksheet at `index` (zero-based).
    ///
    /// Fails once the index runs past the end of the sheet band.
    pub fn sheet_order(index: usize) -> Result<u32> {
        u32::try_from(index)
            .ok()
            .filter(|&i| i < POST_SHEET_BAND_START - SHEET_BAND_START)
            .map(|i| SHEET_BAND_START + i)
            .ok_or_else(|| {
                OoxmlError::Registry(format!("worksheet {} does not fit in the sheet band", index))
            })
    }

    /// Zero-based worksheet index encoded in the order number.
    ///
    /// Only meaningful for [`PartKind::Sheet`]; calling it on any other part is a
    /// contract violation and the returned value is unspecified.
    #[inline]
    pub fn sheet_index(&self) -> usize {
        debug_assert_eq!(self.kind, PartKind::Sheet, "sheet_index on a non-sheet part");
        self.order.wrapping_sub(SHEET_BAND_START) as usize
    }
}

/// A part after finalization, carrying its relationship ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedPart {
    pub descriptor: PartDescriptor,
    /// 1-based position in the sorted part list
    pub relationship_id: u32,
}

impl FinalizedPart {
    /// Relationship ID as written in `.rels` files (`rId3`).
    pub fn r_id(&self) -> String {
        format!("rId{}", self.relationship_id)
    }
}

/// Parts registered during one assembly pass.
#[derive(Debug, Default)]
pub struct PartRegistry {
    parts: Vec<PartDescriptor>,
    orders: HashSet<u32>,
    paths: HashSet<PackURI>,
}

impl PartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a part.
    ///
    /// Fails when the order number or path is already taken, or when the order
    /// number does not belong to the band implied by the part kind.
    pub fn register(&mut self, descriptor: PartDescriptor) -> Result<()> {
        let band = Band::of(descriptor.order).ok_or_else(|| {
            OoxmlError::Registry(format!(
                "order number {} of '{}' lies outside every band",
                descriptor.order, descriptor.path
            ))
        })?;

        if !descriptor.kind.accepts(band) {
            return Err(OoxmlError::Registry(format!(
                "{:?} part '{}' cannot use order number {} ({:?} band)",
                descriptor.kind, descriptor.path, descriptor.order, band
            )));
        }

        if self.orders.contains(&descriptor.order) {
            return Err(OoxmlError::Registry(format!(
                "order number {} is already registered",
                descriptor.order
            )));
        }
        if self.paths.contains(&descriptor.path) {
            return Err(OoxmlError::Registry(format!(
                "part '{}' is already registered",
                descriptor.path
            )));
        }

        log::debug!(
            "registered part {} (order {}, {:?})",
            descriptor.path,
            descriptor.order,
            descriptor.kind
        );
        self.orders.insert(descriptor.order);
        self.paths.insert(descriptor.path.clone());
        self.parts.push(descriptor);
        Ok(())
    }

    /// Next free order number in the post-sheet band.
    pub fn next_post_sheet_order(&self) -> Result<u32> {
        match self.orders.iter().copied().filter(|&o| o >= POST_SHEET_BAND_START).max() {
            None => Ok(POST_SHEET_BAND_START),
            Some(last) => last.checked_add(1).ok_or_else(|| {
                OoxmlError::Registry("the post-sheet band is exhausted".to_string())
            }),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Sort by order number and assign relationship IDs by position.
    pub fn finalize(mut self) -> Vec<FinalizedPart> {
        self.parts.sort_unstable_by_key(|p| p.order);
        self.parts
            .into_iter()
            .enumerate()
            .map(|(i, descriptor)| FinalizedPart {
                descriptor,
                relationship_id: i as u32 + 1,
            })
            .collect()
    }
}

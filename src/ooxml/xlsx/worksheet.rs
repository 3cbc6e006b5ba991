//! In-memory worksheet.

use std::collections::BTreeMap;

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::xlsx::cell::{Cell, CellAddress, CellValue};
use crate::ooxml::xlsx::format::Style;
use crate::ooxml::xlsx::protection::SheetProtection;

/// Visibility of a sheet tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::VeryHidden => "veryHidden",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "hidden" => Self::Hidden,
            "veryHidden" => Self::VeryHidden,
            _ => Self::Visible,
        }
    }
}

/// A worksheet: a name and a sparse grid of cells kept in row-major order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<CellAddress, Cell>,
    state: SheetState,
    protection: Option<SheetProtection>,
}

impl Worksheet {
    /// Create an empty worksheet. Names are validated when added to a workbook.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Set the value of the cell at a zero-based position, keeping its style.
    pub fn set_value(&mut self, row: u32, col: u32, value: impl Into<CellValue>) -> Result<()> {
        let address = CellAddress::new(row, col)?;
        self.cells.entry(address).or_default().value = value.into();
        Ok(())
    }

    /// Set the style of the cell at a zero-based position, keeping its value.
    pub fn set_style(&mut self, row: u32, col: u32, style: Style) -> Result<()> {
        let address = CellAddress::new(row, col)?;
        self.cells.entry(address).or_default().style = Some(style);
        Ok(())
    }

    /// Replace the cell at a zero-based position.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) -> Result<()> {
        let address = CellAddress::new(row, col)?;
        self.cells.insert(address, cell);
        Ok(())
    }

    /// Set a value by A1 reference.
    pub fn set_value_at(&mut self, reference: &str, value: impl Into<CellValue>) -> Result<()> {
        let address = CellAddress::parse(reference)?;
        self.set_value(address.row, address.col, value)
    }

    #[inline]
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&CellAddress { row, col })
    }

    #[inline]
    pub fn cell_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        self.cells.get_mut(&CellAddress { row, col })
    }

    /// Value at a zero-based position; `None` for cells never set.
    #[inline]
    pub fn value(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cell(row, col).map(|c| &c.value)
    }

    /// Value by A1 reference.
    pub fn value_at(&self, reference: &str) -> Result<Option<&CellValue>> {
        let address = CellAddress::parse(reference)?;
        Ok(self.value(address.row, address.col))
    }

    pub fn remove(&mut self, row: u32, col: u32) -> Option<Cell> {
        self.cells.remove(&CellAddress { row, col })
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &Cell)> {
        self.cells.iter().map(|(address, cell)| (*address, cell))
    }

    /// All cells in row-major order, mutably.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = (CellAddress, &mut Cell)> {
        self.cells.iter_mut().map(|(address, cell)| (*address, cell))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Smallest range covering every stored cell.
    pub fn dimension(&self) -> Option<(CellAddress, CellAddress)> {
        let first_row = self.cells.keys().next()?.row;
        let last_row = self.cells.keys().next_back()?.row;
        let (min_col, max_col) = self
            .cells
            .keys()
            .fold((u32::MAX, 0), |(lo, hi), a| (lo.min(a.col), hi.max(a.col)));
        Some((
            CellAddress { row: first_row, col: min_col },
            CellAddress { row: last_row, col: max_col },
        ))
    }

    #[inline]
    pub fn state(&self) -> SheetState {
        self.state
    }

    pub fn set_state(&mut self, state: SheetState) {
        self.state = state;
    }

    #[inline]
    pub fn protection(&self) -> Option<&SheetProtection> {
        self.protection.as_ref()
    }

    pub fn protect(&mut self, protection: SheetProtection) {
        self.protection = Some(protection);
    }

    pub fn unprotect(&mut self) {
        self.protection = None;
    }
}

/// Check a sheet name against the rules of the file format.
pub(crate) fn validate_sheet_name(name: &str) -> Result<()> {
    const FORBIDDEN: [char; 7] = ['\\', '/', '?', '*', '[', ']', ':'];

    if name.trim().is_empty() {
        return Err(OoxmlError::Format("sheet name must not be blank".to_string()));
    }
    if name.chars().count() > 31 {
        return Err(OoxmlError::Format(format!(
            "sheet name '{}' is longer than 31 characters",
            name
        )));
    }
    if name.contains(FORBIDDEN) || name.starts_with('\'') || name.ends_with('\'') {
        return Err(OoxmlError::Format(format!(
            "sheet name '{}' contains a forbidden character",
            name
        )));
    }
    Ok(())
}

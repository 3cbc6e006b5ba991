//! Package reader: relationship traversal, part decoders and cell typing.

mod options;
mod package;
mod shared_strings;
mod worksheet;

pub use options::{
    ColumnType, DEFAULT_DATE_TIME_FORMAT, DEFAULT_TIME_SPAN_FORMAT, GlobalEnforcingType, RawValue,
    ReaderOptions,
};
pub use package::ReadContext;
pub(crate) use package::read_package;

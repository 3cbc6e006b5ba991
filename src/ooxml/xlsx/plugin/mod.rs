//! Plugins: the extension point for package parts and read post-processing.
//!
//! Every part of a written package comes from a plugin in the
//! [`QueueId::WriterPackagePart`] queue, including the built-in workbook,
//! metadata, theme, styles, shared-string and worksheet parts. A plugin is
//! identified by its unique ID; registering another plugin under the same ID
//! with a higher priority replaces it. At equal priority the plugin registered
//! first stays in place.
//!
//! ```
//! use std::sync::Arc;
//! use kumquat::ooxml::opc::PartKind;
//! use kumquat::ooxml::xlsx::plugin::{PackagePartWriter, PartSpec, PluginDescriptor, PluginRegistry};
//! use kumquat::ooxml::xlsx::writer::WriteContext;
//!
//! struct Notes;
//!
//! impl PackagePartWriter for Notes {
//!     fn execute(&mut self, _ctx: &mut WriteContext<'_>) -> kumquat::ooxml::Result<Vec<u8>> {
//!         Ok(b"<notes/>".to_vec())
//!     }
//! }
//!
//! let mut registry = PluginRegistry::with_builtins();
//! registry
//!     .register(PluginDescriptor::package_part(
//!         "example.notes",
//!         PartSpec::new("/custom/notes.xml", PartKind::Other, "application/xml", "urn:example:notes"),
//!         Arc::new(|| Box::new(Notes)),
//!     ))
//!     .unwrap();
//! ```

pub mod builtin;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::{Band, PartKind};
use crate::ooxml::xlsx::reader::ReadContext;
use crate::ooxml::xlsx::workbook::Workbook;
use crate::ooxml::xlsx::worksheet::Worksheet;
use crate::ooxml::xlsx::writer::{AssembledPackage, WriteContext};

/// Placeholder in a per-sheet part path replaced by the 1-based sheet number.
pub const SHEET_NUMBER_PLACEHOLDER: &str = "{n}";

/// Execution queue of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueId {
    /// Renders one package part (or one per worksheet)
    WriterPackagePart,
    /// Runs on the assembled archive entries before they are zipped
    WriterAppend,
    /// Runs once per parsed worksheet
    ReaderInline,
    /// Runs after the whole workbook has been read
    ReaderAppend,
}

/// Where and how a plugin's part is stored in the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    /// Absolute part name; sheet parts contain `{n}`
    pub path: String,
    pub kind: PartKind,
    /// Fixed order number; `None` takes the next free post-sheet slot.
    /// Sheet parts are numbered by their worksheet and must leave this empty.
    pub order: Option<u32>,
    pub content_type: String,
    pub relationship_type: String,
}

impl PartSpec {
    pub fn new(
        path: impl Into<String>,
        kind: PartKind,
        content_type: impl Into<String>,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            order: None,
            content_type: content_type.into(),
            relationship_type: relationship_type.into(),
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    /// Path of the part for the worksheet at `index`.
    pub fn sheet_path(&self, index: usize) -> String {
        self.path
            .replace(SHEET_NUMBER_PLACEHOLDER, &(index + 1).to_string())
    }

    fn validate(&self, unique_id: &str) -> Result<()> {
        let invalid = |msg: &str| {
            OoxmlError::Registry(format!("plugin '{}': {}", unique_id, msg))
        };
        if !self.path.starts_with('/') {
            return Err(invalid("part path must begin with '/'"));
        }
        let per_sheet = self.path.contains(SHEET_NUMBER_PLACEHOLDER);
        match self.kind {
            PartKind::Sheet if !per_sheet => Err(invalid("sheet part path needs a {n} placeholder")),
            PartKind::Sheet if self.order.is_some() => {
                Err(invalid("sheet parts are ordered by their worksheet"))
            },
            PartKind::Root | PartKind::Other if per_sheet => {
                Err(invalid("only sheet parts may use the {n} placeholder"))
            },
            PartKind::Root if self.order.is_none() => {
                Err(invalid("root parts need an order in the workbook or root band"))
            },
            PartKind::Root | PartKind::Other => match self.order {
                Some(order) if !Band::of(order).is_some_and(|band| self.kind.accepts(band)) => {
                    Err(invalid(&format!("order {} is outside the bands of a {:?} part", order, self.kind)))
                },
                _ => Ok(()),
            },
            PartKind::Sheet => Ok(()),
        }
    }
}

/// Renders one package part.
pub trait PackagePartWriter {
    /// Called once before any part is rendered; `sheet_index` is set for sheet parts.
    fn init(&mut self, _workbook: &Workbook, _sheet_index: Option<usize>) -> Result<()> {
        Ok(())
    }

    /// Produce the part content.
    fn execute(&mut self, ctx: &mut WriteContext<'_>) -> Result<Vec<u8>>;
}

/// Rewrites or extends the assembled archive entries.
pub trait AppendPlugin {
    fn execute(&mut self, package: &mut AssembledPackage) -> Result<()>;
}

/// Post-processes each worksheet after it has been parsed.
pub trait InlineReaderPlugin {
    fn init(&mut self, _sheet_index: usize) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self, worksheet: &mut Worksheet) -> Result<()>;
}

/// Runs once the whole workbook has been read.
pub trait AppendReaderPlugin {
    fn execute(&mut self, ctx: &mut ReadContext<'_>) -> Result<()>;
}

pub type PackagePartFactory = Arc<dyn Fn() -> Box<dyn PackagePartWriter> + Send + Sync>;
pub type AppendFactory = Arc<dyn Fn() -> Box<dyn AppendPlugin> + Send + Sync>;
pub type InlineReaderFactory = Arc<dyn Fn() -> Box<dyn InlineReaderPlugin> + Send + Sync>;
pub type AppendReaderFactory = Arc<dyn Fn() -> Box<dyn AppendReaderPlugin> + Send + Sync>;

/// Constructor of plugin instances; the variant fixes the queue.
#[derive(Clone)]
pub enum PluginFactory {
    PackagePart(PackagePartFactory),
    Append(AppendFactory),
    ReaderInline(InlineReaderFactory),
    ReaderAppend(AppendReaderFactory),
}

impl PluginFactory {
    #[inline]
    pub fn queue(&self) -> QueueId {
        match self {
            Self::PackagePart(_) => QueueId::WriterPackagePart,
            Self::Append(_) => QueueId::WriterAppend,
            Self::ReaderInline(_) => QueueId::ReaderInline,
            Self::ReaderAppend(_) => QueueId::ReaderAppend,
        }
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginFactory::{:?}", self.queue())
    }
}

/// A registered plugin.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub unique_id: String,
    /// Higher wins; defaults to 0
    pub priority: i32,
    /// Target part, required for package-part plugins
    pub part: Option<PartSpec>,
    pub factory: PluginFactory,
}

impl PluginDescriptor {
    pub fn package_part(
        unique_id: impl Into<String>,
        part: PartSpec,
        factory: PackagePartFactory,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            priority: 0,
            part: Some(part),
            factory: PluginFactory::PackagePart(factory),
        }
    }

    pub fn append(unique_id: impl Into<String>, factory: AppendFactory) -> Self {
        Self::without_part(unique_id, PluginFactory::Append(factory))
    }

    pub fn reader_inline(unique_id: impl Into<String>, factory: InlineReaderFactory) -> Self {
        Self::without_part(unique_id, PluginFactory::ReaderInline(factory))
    }

    pub fn reader_append(unique_id: impl Into<String>, factory: AppendReaderFactory) -> Self {
        Self::without_part(unique_id, PluginFactory::ReaderAppend(factory))
    }

    fn without_part(unique_id: impl Into<String>, factory: PluginFactory) -> Self {
        Self {
            unique_id: unique_id.into(),
            priority: 0,
            part: None,
            factory,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[inline]
    pub fn queue(&self) -> QueueId {
        self.factory.queue()
    }
}

/// Plugin descriptors grouped by queue and unique ID, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    entries: IndexMap<(QueueId, String), Vec<PluginDescriptor>>,
}

impl PluginRegistry {
    /// A registry without any plugin. Writing with it produces no parts.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the built-in part writers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for descriptor in builtin::descriptors() {
            registry.push(descriptor);
        }
        registry
    }

    /// Add a plugin.
    pub fn register(&mut self, descriptor: PluginDescriptor) -> Result<()> {
        if descriptor.unique_id.is_empty() {
            return Err(OoxmlError::Registry("plugin ID must not be empty".to_string()));
        }
        match (&descriptor.factory, &descriptor.part) {
            (PluginFactory::PackagePart(_), Some(part)) => part.validate(&descriptor.unique_id)?,
            (PluginFactory::PackagePart(_), None) => {
                return Err(OoxmlError::Registry(format!(
                    "package-part plugin '{}' has no part",
                    descriptor.unique_id
                )));
            },
            (_, Some(_)) => {
                return Err(OoxmlError::Registry(format!(
                    "plugin '{}' in queue {:?} cannot own a part",
                    descriptor.unique_id,
                    descriptor.queue()
                )));
            },
            (_, None) => {},
        }
        self.push(descriptor);
        Ok(())
    }

    fn push(&mut self, descriptor: PluginDescriptor) {
        log::debug!(
            "registering plugin '{}' in {:?} with priority {}",
            descriptor.unique_id,
            descriptor.queue(),
            descriptor.priority
        );
        self.entries
            .entry((descriptor.queue(), descriptor.unique_id.clone()))
            .or_default()
            .push(descriptor);
    }

    /// Winning plugin per unique ID of `queue`, in order of first registration.
    pub fn resolve(&self, queue: QueueId) -> Vec<PluginDescriptor> {
        self.entries
            .iter()
            .filter(|((q, _), _)| *q == queue)
            .filter_map(|((_, id), candidates)| {
                let winner = candidates.iter().reduce(|best, c| {
                    if c.priority > best.priority { c } else { best }
                })?;
                if candidates.len() > 1 {
                    log::debug!(
                        "plugin '{}': {} candidates, priority {} wins",
                        id,
                        candidates.len(),
                        winner.priority
                    );
                }
                Some(winner.clone())
            })
            .collect()
    }

    /// Number of distinct plugins in `queue`.
    pub fn len(&self, queue: QueueId) -> usize {
        self.entries.keys().filter(|(q, _)| *q == queue).count()
    }
}

static DEFAULT_REGISTRY: Lazy<RwLock<Arc<PluginRegistry>>> =
    Lazy::new(|| RwLock::new(Arc::new(PluginRegistry::with_builtins())));

/// Snapshot of the process-wide registry used when no registry is configured.
pub fn default_registry() -> Arc<PluginRegistry> {
    DEFAULT_REGISTRY.read().clone()
}

/// Register a plugin in the process-wide registry.
///
/// Writes and reads already running keep the snapshot they started with.
pub fn register_plugin(descriptor: PluginDescriptor) -> Result<()> {
    let mut guard = DEFAULT_REGISTRY.write();
    Arc::make_mut(&mut guard).register(descriptor)
}

/// Rebuild the process-wide registry with the built-in plugins only.
pub fn reset_default_registry() {
    *DEFAULT_REGISTRY.write() = Arc::new(PluginRegistry::with_builtins());
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static [u8]);

    impl PackagePartWriter for Fixed {
        fn execute(&mut self, _ctx: &mut WriteContext<'_>) -> Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }
    }

    fn fixed(id: &str, body: &'static [u8], priority: i32) -> PluginDescriptor {
        PluginDescriptor::package_part(
            id,
            PartSpec::new("/custom/part.xml", PartKind::Other, "application/xml", "urn:test"),
            Arc::new(move || Box::new(Fixed(body))),
        )
        .with_priority(priority)
    }

    fn winner_priority(registry: &PluginRegistry, id: &str) -> i32 {
        registry
            .resolve(QueueId::WriterPackagePart)
            .into_iter()
            .find(|d| d.unique_id == id)
            .map(|d| d.priority)
            .unwrap()
    }

    #[test]
    fn test_higher_priority_wins_in_either_order() {
        let mut registry = PluginRegistry::empty();
        registry.register(fixed("x", b"low", 0)).unwrap();
        registry.register(fixed("x", b"high", 5)).unwrap();
        assert_eq!(winner_priority(&registry, "x"), 5);

        let mut registry = PluginRegistry::empty();
        registry.register(fixed("x", b"high", 5)).unwrap();
        registry.register(fixed("x", b"low", 0)).unwrap();
        assert_eq!(winner_priority(&registry, "x"), 5);
    }

    #[test]
    fn test_tie_keeps_first_registered() {
        let mut registry = PluginRegistry::empty();
        registry.register(fixed("x", b"first", 1)).unwrap();
        let mut second = fixed("x", b"second", 1);
        second.part = Some(PartSpec::new(
            "/custom/second.xml",
            PartKind::Other,
            "application/xml",
            "urn:test",
        ));
        registry.register(second).unwrap();

        let resolved = registry.resolve(QueueId::WriterPackagePart);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].part.as_ref().unwrap().path, "/custom/part.xml");
    }

    #[test]
    fn test_resolution_keeps_first_appearance_order() {
        let mut registry = PluginRegistry::empty();
        registry.register(fixed("b", b"", 0)).unwrap();
        registry.register(fixed("a", b"", 0)).unwrap();
        registry.register(fixed("b", b"", 3)).unwrap();

        let ids: Vec<String> = registry
            .resolve(QueueId::WriterPackagePart)
            .into_iter()
            .map(|d| d.unique_id)
            .collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_queues_are_separate() {
        let mut registry = PluginRegistry::with_builtins();
        assert_eq!(registry.len(QueueId::WriterAppend), 0);
        registry
            .register(PluginDescriptor::reader_inline(
                "kumquat.writer.styles",
                Arc::new(|| {
                    struct Noop;
                    impl InlineReaderPlugin for Noop {
                        fn execute(&mut self, _ws: &mut Worksheet) -> Result<()> {
                            Ok(())
                        }
                    }
                    Box::new(Noop)
                }),
            ))
            .unwrap();
        assert_eq!(registry.len(QueueId::ReaderInline), 1);
        assert_eq!(registry.len(QueueId::WriterPackagePart), builtin::descriptors().len());
    }

    #[test]
    fn test_invalid_registrations() {
        let mut registry = PluginRegistry::empty();
        assert!(matches!(registry.register(fixed("", b"", 0)), Err(OoxmlError::Registry(_))));

        let mut no_part = fixed("x", b"", 0);
        no_part.part = None;
        assert!(registry.register(no_part).is_err());

        let mut sheet_without_placeholder = fixed("x", b"", 0);
        sheet_without_placeholder.part.as_mut().unwrap().kind = PartKind::Sheet;
        assert!(registry.register(sheet_without_placeholder).is_err());

        let mut other_with_placeholder = fixed("x", b"", 0);
        other_with_placeholder.part.as_mut().unwrap().path = "/custom/{n}.xml".to_string();
        assert!(registry.register(other_with_placeholder).is_err());

        assert_eq!(registry.len(QueueId::WriterPackagePart), 0);
    }

    #[test]
    fn test_part_orders_must_fit_their_kind() {
        let with_spec = |kind: PartKind, order: Option<u32>| {
            let mut descriptor = fixed("x", b"", 0);
            let part = descriptor.part.as_mut().unwrap();
            part.kind = kind;
            part.order = order;
            descriptor
        };
        let mut registry = PluginRegistry::empty();

        // root parts cannot fall back to the post-sheet band
        assert!(matches!(
            registry.register(with_spec(PartKind::Root, None)),
            Err(OoxmlError::Registry(_))
        ));
        assert!(registry.register(with_spec(PartKind::Root, Some(2_000_000))).is_err());
        assert!(registry.register(with_spec(PartKind::Root, Some(500))).is_err());
        assert!(registry.register(with_spec(PartKind::Other, Some(10_000))).is_err());
        assert_eq!(registry.len(QueueId::WriterPackagePart), 0);

        registry.register(with_spec(PartKind::Root, Some(1_005))).unwrap();
        registry.register(with_spec(PartKind::Other, Some(1_006))).unwrap();
        registry.register(with_spec(PartKind::Other, Some(2_000_010))).unwrap();
        registry.register(with_spec(PartKind::Other, None)).unwrap();
    }

    #[test]
    fn test_default_registry_snapshot() {
        struct Noop;
        impl AppendReaderPlugin for Noop {
            fn execute(&mut self, _ctx: &mut ReadContext<'_>) -> Result<()> {
                Ok(())
            }
        }

        let before = default_registry();
        register_plugin(PluginDescriptor::reader_append(
            "tests.default-registry-snapshot",
            Arc::new(|| Box::new(Noop)),
        ))
        .unwrap();

        let after = default_registry();
        assert!(
            after
                .resolve(QueueId::ReaderAppend)
                .iter()
                .any(|d| d.unique_id == "tests.default-registry-snapshot")
        );
        assert!(
            !before
                .resolve(QueueId::ReaderAppend)
                .iter()
                .any(|d| d.unique_id == "tests.default-registry-snapshot")
        );
    }

    #[test]
    fn test_sheet_path() {
        let spec = PartSpec::new(
            "/xl/worksheets/sheet{n}.xml",
            PartKind::Sheet,
            "application/xml",
            "urn:test",
        );
        assert_eq!(spec.sheet_path(0), "/xl/worksheets/sheet1.xml");
        assert_eq!(spec.sheet_path(11), "/xl/worksheets/sheet12.xml");
    }
}

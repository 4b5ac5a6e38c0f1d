//! FILENAME: core/pivot-engine/src/record.rs
//! Record access.
//!
//! The engine is generic over the host's record type. All it needs is a way
//! to read a field by name; records are never mutated or copied into the
//! pipeline (groups and orderings hold indices into the host's data).

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use cells::CellValue;

/// Default record type: an ordered map from field name to value.
pub type Record = BTreeMap<String, CellValue>;

/// Read access to a record's fields.
pub trait PivotRecord {
    /// Returns the value of `name`, or `None` when the record has no such field.
    fn field(&self, name: &str) -> Option<Cow<'_, CellValue>>;

    /// Names of the fields this record carries, in display order.
    /// Used to derive raw-view columns; may be empty for opaque records.
    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

impl PivotRecord for BTreeMap<String, CellValue> {
    fn field(&self, name: &str) -> Option<Cow<'_, CellValue>> {
        self.get(name).map(Cow::Borrowed)
    }

    fn field_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl<S: BuildHasher> PivotRecord for HashMap<String, CellValue, S> {
    fn field(&self, name: &str) -> Option<Cow<'_, CellValue>> {
        self.get(name).map(Cow::Borrowed)
    }

    fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys().cloned().collect();
        names.sort();
        names
    }
}

impl<R: PivotRecord + ?Sized> PivotRecord for &R {
    fn field(&self, name: &str) -> Option<Cow<'_, CellValue>> {
        (**self).field(name)
    }

    fn field_names(&self) -> Vec<String> {
        (**self).field_names()
    }
}

/// Builds a [`Record`] from `field => value` pairs.
///
/// ```
/// use pivot_engine::record;
/// let r = record! { "product" => "A", "sales" => 100 };
/// assert_eq!(r.len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    ($($field:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::Record::new();
        $( map.insert(::std::string::String::from($field), $crate::CellValue::from($value)); )*
        map
    }};
}

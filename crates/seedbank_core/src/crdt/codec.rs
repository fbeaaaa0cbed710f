//! Record <-> document conversion.
//!
//! # Responsibility
//! - Mirror a typed record into document containers with minimal edits.
//! - Decode and validate a document's plain-data form into a typed record.
//!
//! # Invariants
//! - Each top-level record field lives in a root map of the same name.
//! - Fields listed in `TEXT_FIELDS` are text containers.
//! - Lists listed in `ENTRY_LISTS` are movable lists of maps; other lists are
//!   plain lists of scalars.
//! - Unchanged fields produce no operations.
//! - Child containers are mergeable, so peers that create the same key
//!   concurrently edit one container instead of shadowing each other.
//! - Text and scalar lists are edited by range, never cleared and refilled.

use super::{CrdtDocument, CrdtError, CrdtResult, LoroDocument};
use crate::model::record::{Record, RecordValidationError};
use loro::{
    Container, LoroList, LoroMap, LoroMovableList, LoroValue, ToJson, UpdateOptions,
    ValueOrContainer,
};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Container layout hints for a record stored in a document.
pub trait MirroredRecord: Record {
    /// Keys whose string values are stored as collaborative text.
    const TEXT_FIELDS: &'static [&'static str];
    /// Keys whose list items are maps that keep their identity when moved.
    const ENTRY_LISTS: &'static [&'static str];
}

/// Failure turning a document into a trusted record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordDecodeError {
    Crdt(CrdtError),
    /// Plain data does not have the record's shape.
    Shape(String),
    /// Shape is fine but a record invariant is violated.
    Invalid(RecordValidationError),
}

impl Display for RecordDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crdt(err) => write!(f, "{err}"),
            Self::Shape(message) => write!(f, "document does not match record shape: {message}"),
            Self::Invalid(err) => write!(f, "record validation failed: {err}"),
        }
    }
}

impl Error for RecordDecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Crdt(err) => Some(err),
            Self::Shape(_) => None,
            Self::Invalid(err) => Some(err),
        }
    }
}

impl From<CrdtError> for RecordDecodeError {
    fn from(value: CrdtError) -> Self {
        Self::Crdt(value)
    }
}

/// Decodes the document's plain-data form and validates it.
pub fn read_record<R: Record, D: CrdtDocument>(doc: &D) -> Result<R, RecordDecodeError> {
    let value = doc.to_json()?;
    let record: R =
        serde_json::from_value(value).map_err(|err| RecordDecodeError::Shape(err.to_string()))?;
    record.validate().map_err(RecordDecodeError::Invalid)?;
    Ok(record)
}

/// Brings `doc` to the state of `record`, touching only what differs.
///
/// Operations are left uncommitted; callers decide how to commit them.
pub fn write_record<R: MirroredRecord>(doc: &LoroDocument, record: &R) -> CrdtResult<()> {
    let target = serde_json::to_value(record).map_err(|err| CrdtError::Encode(err.to_string()))?;
    let Value::Object(target) = target else {
        return Err(CrdtError::Encode("record must serialize to an object".to_string()));
    };
    let current = doc.to_json()?;
    let current = current.as_object();
    let layout = Layout {
        text_fields: R::TEXT_FIELDS,
        entry_lists: R::ENTRY_LISTS,
    };

    for (key, value) in &target {
        let Value::Object(fields) = value else {
            return Err(CrdtError::Encode(format!(
                "top-level field `{key}` must be an object"
            )));
        };
        let existing = current.and_then(|root| root.get(key)).and_then(Value::as_object);
        layout.mirror_map(&doc.inner().get_map(key.as_str()), fields, existing)?;
    }

    let empty = Map::new();
    for (key, value) in current.into_iter().flatten() {
        if !target.contains_key(key) {
            layout.mirror_map(&doc.inner().get_map(key.as_str()), &empty, value.as_object())?;
        }
    }
    Ok(())
}

/// Applies an in-place change to the record stored in `doc`.
pub fn update_record<R, F>(doc: &LoroDocument, change: F) -> Result<(), RecordDecodeError>
where
    R: MirroredRecord,
    F: FnOnce(&mut R),
{
    let value = doc.to_json()?;
    let mut record: R =
        serde_json::from_value(value).map_err(|err| RecordDecodeError::Shape(err.to_string()))?;
    change(&mut record);
    write_record(doc, &record)?;
    Ok(())
}

struct Layout {
    text_fields: &'static [&'static str],
    entry_lists: &'static [&'static str],
}

impl Layout {
    fn mirror_map(
        &self,
        map: &LoroMap,
        target: &Map<String, Value>,
        current: Option<&Map<String, Value>>,
    ) -> CrdtResult<()> {
        for (key, value) in target {
            let existing = current.and_then(|fields| fields.get(key));
            if value.is_null() {
                if existing.is_some() {
                    map.delete(key)?;
                }
                continue;
            }
            if existing == Some(value) {
                continue;
            }

            match value {
                Value::Object(fields) => {
                    let child = map.ensure_mergeable_map(key)?;
                    let state = child.get_deep_value().to_json_value();
                    self.mirror_map(&child, fields, state.as_object())?;
                }
                Value::Array(items) if self.entry_lists.contains(&key.as_str()) => {
                    let list = map.ensure_mergeable_movable_list(key)?;
                    let state = list.get_deep_value().to_json_value();
                    self.mirror_entries(&list, items, state.as_array().map(Vec::as_slice))?;
                }
                Value::Array(items) => {
                    let list = map.ensure_mergeable_list(key)?;
                    mirror_scalars(key, &list, items)?;
                }
                Value::String(text) if self.text_fields.contains(&key.as_str()) => {
                    map.ensure_mergeable_text(key)?
                        .update(text, UpdateOptions::default())
                        .map_err(|err| CrdtError::Edit(format!("text `{key}`: {err}")))?;
                }
                other => {
                    map.insert(key, scalar(key, other)?)?;
                }
            }
        }

        for key in current.into_iter().flat_map(Map::keys) {
            if !target.contains_key(key) {
                map.delete(key)?;
            }
        }
        Ok(())
    }

    fn mirror_entries(
        &self,
        list: &LoroMovableList,
        target: &[Value],
        current: Option<&[Value]>,
    ) -> CrdtResult<()> {
        let current = current.unwrap_or(&[]);
        for (index, item) in target.iter().enumerate() {
            let Value::Object(fields) = item else {
                return Err(CrdtError::Encode(format!("list entry {index} must be an object")));
            };
            match current.get(index) {
                Some(existing) if existing == item => {}
                Some(existing) => {
                    let child = entry_at(list, index)?;
                    self.mirror_map(&child, fields, existing.as_object())?;
                }
                None => {
                    let child = list.push_container(LoroMap::new())?;
                    self.mirror_map(&child, fields, None)?;
                }
            }
        }
        if current.len() > target.len() {
            list.delete(target.len(), current.len() - target.len())?;
        }
        Ok(())
    }
}

/// Replaces only the differing middle run of a scalar list, so concurrent
/// edits elsewhere in the list survive a merge.
fn mirror_scalars(key: &str, list: &LoroList, target: &[Value]) -> CrdtResult<()> {
    let state = list.get_deep_value().to_json_value();
    let current = state.as_array().map(Vec::as_slice).unwrap_or(&[]);

    let prefix = current
        .iter()
        .zip(target)
        .take_while(|(old, new)| old == new)
        .count();
    let suffix = current[prefix..]
        .iter()
        .rev()
        .zip(target[prefix..].iter().rev())
        .take_while(|(old, new)| old == new)
        .count();

    let removed = current.len() - prefix - suffix;
    if removed > 0 {
        list.delete(prefix, removed)?;
    }
    for (offset, item) in target[prefix..target.len() - suffix].iter().enumerate() {
        list.insert(prefix + offset, scalar(key, item)?)?;
    }
    Ok(())
}

fn entry_at(list: &LoroMovableList, index: usize) -> CrdtResult<LoroMap> {
    match list.get(index) {
        Some(ValueOrContainer::Container(Container::Map(map))) => Ok(map),
        _ => Err(CrdtError::Encode(format!(
            "list entry {index} is not a map container"
        ))),
    }
}

fn scalar(key: &str, value: &Value) -> CrdtResult<LoroValue> {
    match value {
        Value::Null => Ok(LoroValue::Null),
        Value::Bool(flag) => Ok(LoroValue::from(*flag)),
        Value::Number(number) => number
            .as_i64()
            .map(LoroValue::from)
            .or_else(|| number.as_f64().map(LoroValue::from))
            .ok_or_else(|| CrdtError::Encode(format!("`{key}` holds an unsupported number"))),
        Value::String(text) => Ok(LoroValue::from(text.as_str())),
        Value::Array(_) | Value::Object(_) => Err(CrdtError::Encode(format!(
            "`{key}` must hold a scalar value"
        ))),
    }
}

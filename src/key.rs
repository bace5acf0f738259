//! Composite keys - `field:type_tag[:item_id]`, the address of one stored entry.

use std::fmt;

use crate::error::CacheError;

pub const SEPARATOR: char = ':';

/// Parsed form of a store hash field key.
///
/// Scalar fields use the two-segment form `field:type_tag`; list and map
/// entries append the record's `unique_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    field: String,
    type_tag: String,
    item_id: Option<String>,
}

impl CompositeKey {
    pub fn scalar(field: impl Into<String>, type_tag: impl Into<String>) -> Self {
        CompositeKey {
            field: field.into(),
            type_tag: type_tag.into(),
            item_id: None,
        }
    }

    pub fn item(
        field: impl Into<String>,
        type_tag: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        CompositeKey {
            field: field.into(),
            type_tag: type_tag.into(),
            item_id: Some(item_id.into()),
        }
    }

    /// Parse a stored key. Anything but two or three non-empty segments is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let segments: Vec<&str> = raw.split(SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        match segments.as_slice() {
            [field, type_tag] => Some(CompositeKey::scalar(*field, *type_tag)),
            [field, type_tag, item_id] => Some(CompositeKey::item(*field, *type_tag, *item_id)),
            _ => None,
        }
    }

    /// Reject keys that would not parse back to themselves.
    pub fn validate(&self) -> Result<(), CacheError> {
        let segments = [Some(&self.field), Some(&self.type_tag), self.item_id.as_ref()];
        for segment in segments.into_iter().flatten() {
            if segment.is_empty() || segment.contains(SEPARATOR) {
                return Err(CacheError::InvalidKeySegment {
                    key: self.to_string(),
                    segment: segment.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, SEPARATOR, self.type_tag)?;
        if let Some(item_id) = &self.item_id {
            write!(f, "{}{}", SEPARATOR, item_id)?;
        }
        Ok(())
    }
}

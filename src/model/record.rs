use std::any::Any;
use std::fmt;

use crate::error::CacheError;

/// Object-safe view of a dirty-tracked record.
///
/// This is what the cache engine walks during `save` and what the type
/// registry hands back during `load`. Typed payloads get it through
/// [`Tracked`](crate::Tracked); schema-less payloads through
/// [`DynamicRecord`](crate::DynamicRecord).
pub trait Record: Any + fmt::Debug + Send + Sync {
    /// Stable tag of the concrete record type, used in composite keys.
    fn type_tag(&self) -> &str;

    /// Identity of this record within its container.
    fn unique_id(&self) -> String;

    /// True until [`clear_dirty`](Record::clear_dirty) is called, and again
    /// after any payload mutation.
    fn is_dirty(&self) -> bool;

    /// Mark the current payload as the persisted baseline. Idempotent.
    fn clear_dirty(&mut self);

    /// Force the next save to write this record even if nothing changed.
    fn mark_dirty(&mut self);

    fn encode(&self) -> Result<Vec<u8>, CacheError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Record {
    pub fn is<R: Record>(&self) -> bool {
        self.as_any().is::<R>()
    }

    pub fn downcast_ref<R: Record>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }

    pub fn downcast_mut<R: Record>(&mut self) -> Option<&mut R> {
        self.as_any_mut().downcast_mut::<R>()
    }

    /// Recover the concrete record, handing the box back untouched on mismatch.
    pub fn downcast<R: Record>(self: Box<Self>) -> Result<Box<R>, Box<dyn Record>> {
        if !self.is::<R>() {
            return Err(self);
        }
        match self.into_any().downcast::<R>() {
            Ok(record) => Ok(record),
            Err(_) => unreachable!("type checked above"),
        }
    }
}

use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A provider-private history item.
///
/// Some providers need the exact assistant message they produced (for
/// example, the tool call list with provider-assigned ids) to be replayed
/// in the next request. The agent doesn't understand that structure, so
/// it stores it as an `OpaqueMessage` and hands it back untouched. The
/// provider later recovers the concrete value with [`OpaqueMessage::downcast`].
#[derive(Clone)]
pub struct OpaqueMessage(Arc<dyn ErasedPayload>);

impl OpaqueMessage {
    /// Wraps `payload` under the given id.
    ///
    /// Ids should be unique across a conversation, two opaque messages
    /// are equal iff their ids are equal.
    #[inline]
    pub fn new<ID: Into<String>, T: Send + Sync + 'static>(
        id: ID,
        payload: T,
    ) -> Self {
        Self(Arc::new(Payload {
            id: id.into(),
            payload,
        }))
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        self.0.id()
    }

    /// Returns the payload if it has type `T`.
    #[inline]
    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id()).finish()
    }
}

impl PartialEq for OpaqueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

trait ErasedPayload: Send + Sync {
    fn id(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

struct Payload<T> {
    id: String,
    payload: T,
}

impl<T: Send + Sync + 'static> ErasedPayload for Payload<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        &self.payload
    }
}

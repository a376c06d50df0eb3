//! Handler construction by id.
//!
//! Persisted settings name handlers by a string id. Instead of resolving that
//! id at runtime through reflection, the set of constructible handlers is an
//! explicit table of [`HandlerKind`]s built at compile time: each kind pairs an
//! id and its default tag with a constructor function.
//!
//! Constructors receive the [`Collaborators`] map and pull whatever shared
//! services they need from it. A missing collaborator is a construction error,
//! never a panic.
//!
//! ```rust,ignore
//! let factory = HandlerFactory::new()
//!     .with_collaborator(Arc::new(PollBook::default()))
//!     .with_kind(HandlerKind::new("poll", "poll", |c| {
//!         let polls = c.require::<PollBook>("poll")?;
//!         Ok(Arc::new(StrawPoll::new(polls)))
//!     }));
//!
//! let handler = factory.construct("poll")?;
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::HandlerConstructionError;
use crate::handler::BoxedCommandHandler;

/// Type-erased collaborator stored in [`Collaborators`].
type CollaboratorArc = Arc<dyn Any + Send + Sync>;

/// Shared services handed to handler constructors, keyed by type.
#[derive(Clone, Default)]
pub struct Collaborators {
    entries: HashMap<TypeId, CollaboratorArc>,
}

impl Collaborators {
    /// Creates an empty collaborator map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a collaborator, replacing any previous one of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.entries.insert(TypeId::of::<T>(), value);
    }

    /// Returns the collaborator of type `T`, if present.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|arc| arc.downcast::<T>().ok())
    }

    /// Returns the collaborator of type `T` or a construction error naming
    /// `handler`.
    pub fn require<T: Send + Sync + 'static>(
        &self,
        handler: &str,
    ) -> Result<Arc<T>, HandlerConstructionError> {
        self.get::<T>()
            .ok_or_else(|| HandlerConstructionError::MissingCollaborator {
                handler: handler.to_string(),
                collaborator: type_name::<T>(),
            })
    }

    /// Returns the number of collaborators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no collaborator was provided.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// Constructor function for one handler kind.
pub type HandlerConstructor =
    Arc<dyn Fn(&Collaborators) -> Result<BoxedCommandHandler, HandlerConstructionError> + Send + Sync>;

/// One constructible handler kind.
#[derive(Clone)]
pub struct HandlerKind {
    id: &'static str,
    default_tag: &'static str,
    enabled_by_default: bool,
    construct: HandlerConstructor,
}

impl HandlerKind {
    /// Creates a kind that is enabled by default.
    pub fn new<F>(id: &'static str, default_tag: &'static str, construct: F) -> Self
    where
        F: Fn(&Collaborators) -> Result<BoxedCommandHandler, HandlerConstructionError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id,
            default_tag,
            enabled_by_default: true,
            construct: Arc::new(construct),
        }
    }

    /// Sets whether freshly seeded settings for this kind start enabled.
    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }

    /// Returns the handler id.
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Returns the tag used when seeding a setting.
    pub fn default_tag(&self) -> &'static str {
        self.default_tag
    }

    /// Returns whether seeded settings start enabled.
    pub fn is_enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }
}

impl fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerKind")
            .field("id", &self.id)
            .field("default_tag", &self.default_tag)
            .field("enabled_by_default", &self.enabled_by_default)
            .finish_non_exhaustive()
    }
}

/// The table of constructible handlers plus their collaborators.
#[derive(Clone, Default, Debug)]
pub struct HandlerFactory {
    kinds: BTreeMap<&'static str, HandlerKind>,
    collaborators: Collaborators,
}

impl HandlerFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind. A kind with the same id is replaced.
    pub fn register(&mut self, kind: HandlerKind) {
        self.kinds.insert(kind.id, kind);
    }

    /// Registers a kind (builder pattern).
    pub fn with_kind(mut self, kind: HandlerKind) -> Self {
        self.register(kind);
        self
    }

    /// Adds a collaborator (builder pattern).
    pub fn with_collaborator<T: Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
        self.collaborators.insert(value);
        self
    }

    /// Returns the collaborator map.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Returns a mutable reference to the collaborator map.
    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collaborators
    }

    /// Returns `true` if `id` names a known kind.
    pub fn contains(&self, id: &str) -> bool {
        self.kinds.contains_key(id)
    }

    /// Returns the kind registered under `id`.
    pub fn kind(&self, id: &str) -> Option<&HandlerKind> {
        self.kinds.get(id)
    }

    /// Iterates over all kinds, sorted by id.
    pub fn kinds(&self) -> impl Iterator<Item = &HandlerKind> {
        self.kinds.values()
    }

    /// Returns the number of kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Builds a fresh handler for `id`.
    pub fn construct(&self, id: &str) -> Result<BoxedCommandHandler, HandlerConstructionError> {
        let kind = self
            .kinds
            .get(id)
            .ok_or_else(|| HandlerConstructionError::UnknownHandler(id.to_string()))?;
        (kind.construct)(&self.collaborators)
    }
}

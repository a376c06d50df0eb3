//! The live tag → handler registry.
//!
//! [`CommandRegistry`] is the single owner of the command map. Every mutation
//! and every lookup goes through one mutex, so the read-modify-write involved in
//! collision detection can never interleave with another reconcile.
//!
//! # Reconciliation
//!
//! Each tag is either `Unregistered` or `Registered(handler_id)`:
//!
//! ```text
//!                    enable(t, h)
//!   Unregistered ─────────────────▶ Registered(h)
//!        ▲                              │  enable(t, h)  → no-op
//!        │          disable(t)          │  enable(t, h') → TagConflict, unchanged
//!        └──────────────────────────────┘
//! ```
//!
//! [`reconcile`](CommandRegistry::reconcile) applies one persisted
//! [`CommandSetting`] to that state machine. A rejected setting is forced to
//! `enabled = false` so the caller can write the correction back.
//!
//! Conflicts resolve to "whoever reconciles first wins", so replaying the same
//! settings in different orders may bind different handlers. Startup replay
//! sorts by handler id to keep that stable across restarts.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use cogwheel_core::CommandSetting;

use crate::error::ReconcileError;
use crate::factory::HandlerFactory;
use crate::handler::{BoxedCommandHandler, CommandDescription};

/// A live binding.
#[derive(Clone)]
struct Binding {
    handler_id: String,
    handler: BoxedCommandHandler,
}

/// A handler looked up from the registry.
#[derive(Clone)]
pub struct RegisteredHandler {
    /// Id of the kind the handler was built from.
    pub handler_id: String,
    /// The handler itself.
    pub handler: BoxedCommandHandler,
}

impl std::fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("handler_id", &self.handler_id)
            .finish_non_exhaustive()
    }
}

/// Listing entry returned by [`CommandRegistry::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// The bound tag.
    pub tag: String,
    /// Id of the bound handler kind.
    pub handler_id: String,
    /// The handler's self-description.
    pub description: CommandDescription,
}

/// What a successful reconcile did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A new handler was constructed and bound.
    Registered,
    /// The tag was already bound to the same handler kind.
    AlreadyRegistered,
    /// The setting's binding was removed.
    Unregistered,
    /// The setting is disabled and had no binding to remove.
    NotRegistered,
}

/// Returns `true` if `tag` can be produced by the parser.
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && !tag.chars().any(char::is_whitespace)
}

/// The authoritative tag → handler map.
///
/// # Thread Safety
///
/// `CommandRegistry` is `Send + Sync`; share it as `Arc<CommandRegistry>`.
/// Handlers are cloned out of the map, so the lock is never held while a
/// handler runs.
pub struct CommandRegistry {
    factory: HandlerFactory,
    bindings: Mutex<HashMap<String, Binding>>,
}

impl CommandRegistry {
    /// Creates an empty registry backed by `factory`.
    pub fn new(factory: HandlerFactory) -> Self {
        Self {
            factory,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an empty registry wrapped in an `Arc`.
    pub fn shared(factory: HandlerFactory) -> Arc<Self> {
        Arc::new(Self::new(factory))
    }

    /// Returns the handler factory.
    pub fn factory(&self) -> &HandlerFactory {
        &self.factory
    }

    /// Binds `handler` to `tag` unconditionally.
    ///
    /// Returns the displaced handler, if any. Releasing whatever resources it
    /// holds is the caller's responsibility.
    pub fn register(
        &self,
        tag: impl Into<String>,
        handler_id: impl Into<String>,
        handler: BoxedCommandHandler,
    ) -> Option<BoxedCommandHandler> {
        let tag = tag.into();
        let handler_id = handler_id.into();
        debug!(tag = %tag, handler = %handler_id, "Registering command");

        self.bindings
            .lock()
            .insert(
                tag,
                Binding {
                    handler_id,
                    handler,
                },
            )
            .map(|previous| previous.handler)
    }

    /// Removes the binding for `tag`, if present.
    pub fn unregister(&self, tag: &str) -> Option<BoxedCommandHandler> {
        let removed = self.bindings.lock().remove(tag);
        if let Some(binding) = &removed {
            debug!(tag = %tag, handler = %binding.handler_id, "Unregistered command");
        }
        removed.map(|binding| binding.handler)
    }

    /// Brings the registry into agreement with one persisted setting.
    ///
    /// On error, `setting.enabled` has been forced to `false` and the registry
    /// is unchanged.
    pub fn reconcile(
        &self,
        setting: &mut CommandSetting,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut bindings = self.bindings.lock();

        if !setting.enabled {
            return Ok(match bindings.get(&setting.tag) {
                Some(binding) if binding.handler_id == setting.handler_id => {
                    bindings.remove(&setting.tag);
                    info!(tag = %setting.tag, handler = %setting.handler_id, "Command disabled");
                    ReconcileOutcome::Unregistered
                }
                Some(binding) => {
                    debug!(
                        tag = %setting.tag,
                        handler = %setting.handler_id,
                        bound = %binding.handler_id,
                        "Disabled setting shares a tag with another handler, leaving it bound"
                    );
                    ReconcileOutcome::NotRegistered
                }
                None => ReconcileOutcome::NotRegistered,
            });
        }

        if !is_valid_tag(&setting.tag) {
            setting.enabled = false;
            warn!(tag = %setting.tag, handler = %setting.handler_id, "Rejecting invalid tag");
            return Err(ReconcileError::InvalidTag {
                tag: setting.tag.clone(),
                handler: setting.handler_id.clone(),
            });
        }

        if let Some(binding) = bindings.get(&setting.tag) {
            if binding.handler_id == setting.handler_id {
                return Ok(ReconcileOutcome::AlreadyRegistered);
            }

            setting.enabled = false;
            warn!(
                tag = %setting.tag,
                bound = %binding.handler_id,
                requested = %setting.handler_id,
                "Tag conflict, disabling setting"
            );
            return Err(ReconcileError::TagConflict {
                tag: setting.tag.clone(),
                bound: binding.handler_id.clone(),
                requested: setting.handler_id.clone(),
            });
        }

        let handler = match self.factory.construct(&setting.handler_id) {
            Ok(handler) => handler,
            Err(e) => {
                setting.enabled = false;
                warn!(
                    tag = %setting.tag,
                    handler = %setting.handler_id,
                    error = %e,
                    "Failed to construct handler, setting stays disabled"
                );
                return Err(e.into());
            }
        };

        bindings.insert(
            setting.tag.clone(),
            Binding {
                handler_id: setting.handler_id.clone(),
                handler,
            },
        );
        info!(tag = %setting.tag, handler = %setting.handler_id, "Command enabled");
        Ok(ReconcileOutcome::Registered)
    }

    /// Binds `handler_id` under `tag` unless the tag is taken by another kind.
    pub fn enable(
        &self,
        tag: &str,
        handler_id: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.reconcile(&mut CommandSetting::enabled(handler_id, tag))
    }

    /// Removes whatever is bound to `tag`. Returns whether a binding existed.
    pub fn disable(&self, tag: &str) -> bool {
        self.unregister(tag).is_some()
    }

    /// Returns `true` if `tag` is bound.
    pub fn is_registered(&self, tag: &str) -> bool {
        self.bindings.lock().contains_key(tag)
    }

    /// Returns the handler bound to `tag`.
    pub fn lookup(&self, tag: &str) -> Option<RegisteredHandler> {
        self.bindings
            .lock()
            .get(tag)
            .map(|binding| RegisteredHandler {
                handler_id: binding.handler_id.clone(),
                handler: Arc::clone(&binding.handler),
            })
    }

    /// Returns the id of the handler kind bound to `tag`.
    pub fn bound_handler_id(&self, tag: &str) -> Option<String> {
        self.bindings
            .lock()
            .get(tag)
            .map(|binding| binding.handler_id.clone())
    }

    /// Returns the tags currently bound to `handler_id`, sorted.
    pub fn tags_of(&self, handler_id: &str) -> Vec<String> {
        let mut tags: Vec<String> = self
            .bindings
            .lock()
            .iter()
            .filter(|(_, binding)| binding.handler_id == handler_id)
            .map(|(tag, _)| tag.clone())
            .collect();
        tags.sort();
        tags
    }

    /// Lists all bindings, sorted by tag.
    pub fn snapshot(&self) -> Vec<CommandInfo> {
        let bindings: Vec<(String, Binding)> = self
            .bindings
            .lock()
            .iter()
            .map(|(tag, binding)| (tag.clone(), binding.clone()))
            .collect();

        // describe() runs outside the lock
        let mut infos: Vec<CommandInfo> = bindings
            .into_iter()
            .map(|(tag, binding)| CommandInfo {
                tag,
                description: binding.handler.describe(),
                handler_id: binding.handler_id,
            })
            .collect();
        infos.sort_by(|a, b| a.tag.cmp(&b.tag));
        infos
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }

    /// Removes every binding.
    pub fn clear(&self) {
        self.bindings.lock().clear();
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("kinds", &self.factory.len())
            .field("bindings", &self.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{HandlerConstructionError, HandlerResult};
    use crate::factory::{Collaborators, HandlerKind};
    use crate::handler::{CommandContext, CommandHandler};
    use async_trait::async_trait;

    pub(crate) struct Named(&'static str);

    #[async_trait]
    impl CommandHandler for Named {
        fn describe(&self) -> CommandDescription {
            CommandDescription::new(self.0)
        }

        async fn on_command_received(&self, _ctx: CommandContext) -> HandlerResult {
            Ok(())
        }
    }

    fn kind(id: &'static str) -> HandlerKind {
        HandlerKind::new(id, id, move |_: &Collaborators| {
            Ok(Arc::new(Named(id)) as BoxedCommandHandler)
        })
    }

    pub(crate) fn test_factory() -> HandlerFactory {
        HandlerFactory::new()
            .with_kind(kind("roll"))
            .with_kind(kind("dice"))
            .with_kind(kind("kick"))
            .with_kind(HandlerKind::new("broken", "broken", |c| {
                c.require::<String>("broken")?;
                unreachable!("no String collaborator is ever provided")
            }))
    }

    #[test]
    fn test_enable_then_lookup() {
        let registry = CommandRegistry::new(test_factory());
        assert_eq!(
            registry.enable("roll", "roll"),
            Ok(ReconcileOutcome::Registered)
        );
        assert!(registry.is_registered("roll"));
        assert_eq!(registry.lookup("roll").unwrap().handler_id, "roll");
    }

    #[test]
    fn test_conflict_keeps_first_binding() {
        let registry = CommandRegistry::new(test_factory());
        let mut first = CommandSetting::enabled("roll", "r");
        let mut second = CommandSetting::enabled("dice", "r");

        assert_eq!(
            registry.reconcile(&mut first),
            Ok(ReconcileOutcome::Registered)
        );
        let err = registry.reconcile(&mut second).unwrap_err();

        assert_eq!(
            err,
            ReconcileError::TagConflict {
                tag: "r".into(),
                bound: "roll".into(),
                requested: "dice".into(),
            }
        );
        assert!(first.enabled);
        assert!(!second.enabled);
        assert_eq!(registry.bound_handler_id("r").as_deref(), Some("roll"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disable_always_unregisters() {
        let registry = CommandRegistry::new(test_factory());
        assert!(!registry.disable("roll"));
        assert!(!registry.is_registered("roll"));

        registry.enable("roll", "roll").unwrap();
        assert!(registry.disable("roll"));
        assert!(!registry.is_registered("roll"));
    }

    #[test]
    fn test_enable_is_idempotent() {
        let registry = CommandRegistry::new(test_factory());
        registry.enable("roll", "roll").unwrap();
        let before = registry.snapshot();

        assert_eq!(
            registry.enable("roll", "roll"),
            Ok(ReconcileOutcome::AlreadyRegistered)
        );
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn test_idempotent_enable_keeps_instance() {
        let registry = CommandRegistry::new(test_factory());
        registry.enable("roll", "roll").unwrap();
        let first = registry.lookup("roll").unwrap().handler;
        registry.enable("roll", "roll").unwrap();
        let second = registry.lookup("roll").unwrap().handler;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reconcile_disabled_setting() {
        let registry = CommandRegistry::new(test_factory());
        registry.enable("roll", "roll").unwrap();

        let mut setting = CommandSetting::disabled("roll", "roll");
        assert_eq!(
            registry.reconcile(&mut setting),
            Ok(ReconcileOutcome::Unregistered)
        );
        assert!(!registry.is_registered("roll"));
        assert_eq!(
            registry.reconcile(&mut setting),
            Ok(ReconcileOutcome::NotRegistered)
        );
    }

    #[test]
    fn test_disabled_loser_does_not_unbind_winner() {
        let registry = CommandRegistry::new(test_factory());
        registry.enable("r", "roll").unwrap();

        let mut loser = CommandSetting::disabled("dice", "r");
        assert_eq!(
            registry.reconcile(&mut loser),
            Ok(ReconcileOutcome::NotRegistered)
        );
        assert_eq!(registry.bound_handler_id("r").as_deref(), Some("roll"));
    }

    #[test]
    fn test_construction_failure_disables_setting() {
        let registry = CommandRegistry::new(test_factory());

        let mut unknown = CommandSetting::enabled("ghost", "ghost");
        let err = registry.reconcile(&mut unknown).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::Construction(HandlerConstructionError::UnknownHandler(
                "ghost".into()
            ))
        );
        assert!(!unknown.enabled);

        let mut broken = CommandSetting::enabled("broken", "broken");
        assert!(matches!(
            registry.reconcile(&mut broken),
            Err(ReconcileError::Construction(
                HandlerConstructionError::MissingCollaborator { .. }
            ))
        ));
        assert!(!broken.enabled);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_tag_rejected() {
        let registry = CommandRegistry::new(test_factory());
        for tag in ["", "two words", "tab\tbed"] {
            let mut setting = CommandSetting::enabled("roll", tag);
            assert!(matches!(
                registry.reconcile(&mut setting),
                Err(ReconcileError::InvalidTag { .. })
            ));
            assert!(!setting.enabled);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replay_order_decides_winner() {
        let settings = vec![
            CommandSetting::enabled("roll", "r"),
            CommandSetting::enabled("dice", "r"),
        ];

        let forward = CommandRegistry::new(test_factory());
        for mut s in settings.clone() {
            let _ = forward.reconcile(&mut s);
        }

        let backward = CommandRegistry::new(test_factory());
        for mut s in settings.into_iter().rev() {
            let _ = backward.reconcile(&mut s);
        }

        // Expected: first reconciled wins, so the two orders disagree.
        assert_eq!(forward.bound_handler_id("r").as_deref(), Some("roll"));
        assert_eq!(backward.bound_handler_id("r").as_deref(), Some("dice"));
    }

    #[test]
    fn test_register_overwrites_and_returns_previous() {
        let registry = CommandRegistry::new(test_factory());
        assert!(
            registry
                .register("x", "roll", Arc::new(Named("one")))
                .is_none()
        );
        let previous = registry.register("x", "dice", Arc::new(Named("two")));
        assert_eq!(previous.unwrap().describe().summary, "one");
        assert_eq!(registry.bound_handler_id("x").as_deref(), Some("dice"));
    }

    #[test]
    fn test_snapshot_sorted_with_descriptions() {
        let registry = CommandRegistry::new(test_factory());
        registry.enable("roll", "roll").unwrap();
        registry.enable("boot", "kick").unwrap();

        let snapshot = registry.snapshot();
        let tags: Vec<_> = snapshot.iter().map(|i| i.tag.as_str()).collect();
        assert_eq!(tags, vec!["boot", "roll"]);
        assert_eq!(snapshot[0].handler_id, "kick");
        assert_eq!(snapshot[0].description.summary, "kick");
        assert_eq!(registry.tags_of("kick"), vec!["boot".to_string()]);
    }

    #[test]
    fn test_concurrent_enable_single_winner() {
        let registry = Arc::new(CommandRegistry::new(test_factory()));
        let ids = ["roll", "dice", "kick"];

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..24)
                .map(|i| {
                    let registry = Arc::clone(&registry);
                    let id = ids[i % ids.len()];
                    scope.spawn(move || (id, registry.enable("contested", id)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winner = registry.bound_handler_id("contested").unwrap();
        let registered = results
            .iter()
            .filter(|(_, r)| *r == Ok(ReconcileOutcome::Registered))
            .count();
        assert_eq!(registered, 1);

        for (id, result) in results {
            if id == winner {
                assert!(result.is_ok());
            } else {
                assert!(matches!(result, Err(ReconcileError::TagConflict { .. })));
            }
        }
    }
}

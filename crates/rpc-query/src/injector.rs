//! Minimal injection container
//!
//! Values are registered against typed [`InjectionToken`]s and resolved
//! lazily. Every provider is a singleton within the injector it is
//! registered in: the factory runs at most once per winning resolution and
//! every later [`Injector::get`] returns the same `Arc`.
//!
//! ```rust,ignore
//! static CONFIG: LazyLock<InjectionToken<AppConfig>> =
//!     LazyLock::new(|| InjectionToken::new("AppConfig"));
//!
//! let injector = Injector::new(Providers::new().value(&CONFIG, AppConfig::default()));
//! let config = injector.get(&CONFIG)?;
//! ```

use crate::logging::log_provider_resolved;
use crate::{ClientError, ClientResult};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Injector) -> ClientResult<Instance> + Send + Sync>;

/// Typed identity of an injectable value.
pub struct InjectionToken<T: ?Sized> {
    id: Uuid,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized> InjectionToken<T> {
    /// A new, unique token. Two tokens never collide, even with equal names.
    pub fn new(name: &'static str) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            _marker: PhantomData,
        }
    }

    /// Token identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: ?Sized> Clone for InjectionToken<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for InjectionToken<T> {}

impl<T: ?Sized> PartialEq for InjectionToken<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ?Sized> Eq for InjectionToken<T> {}

impl<T: ?Sized> fmt::Debug for InjectionToken<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InjectionToken({}, {})", self.name, self.id)
    }
}

#[derive(Clone)]
struct ProviderEntry {
    name: &'static str,
    factory: Factory,
}

/// Provider registrations, collected before an [`Injector`] is created.
#[derive(Clone, Default)]
pub struct Providers {
    entries: Vec<(Uuid, ProviderEntry)>,
}

impl Providers {
    /// No registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ready value.
    pub fn value<T: Send + Sync + 'static>(self, token: &InjectionToken<T>, value: T) -> Self {
        let instance: Instance = Arc::new(value);
        self.register(token, move |_| Ok(instance.clone()))
    }

    /// Register a lazily-run factory. It receives the injector that owns the
    /// registration, so it can resolve its own dependencies.
    pub fn factory<T, F>(self, token: &InjectionToken<T>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector) -> ClientResult<Arc<T>> + Send + Sync + 'static,
    {
        self.register(token, move |injector| {
            factory(injector).map(|value| value as Instance)
        })
    }

    /// Append every registration of `other`. Later registrations of the same
    /// token replace earlier ones.
    pub fn extend(mut self, other: Providers) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register<T: ?Sized, F>(mut self, token: &InjectionToken<T>, factory: F) -> Self
    where
        F: Fn(&Injector) -> ClientResult<Instance> + Send + Sync + 'static,
    {
        self.entries.push((
            token.id,
            ProviderEntry {
                name: token.name,
                factory: Arc::new(factory),
            },
        ));
        self
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(_, entry)| entry.name))
            .finish()
    }
}

struct Slot {
    entry: ProviderEntry,
    instance: OnceLock<Instance>,
}

/// A scope holding provider registrations and their singleton instances.
pub struct Injector {
    slots: HashMap<Uuid, Slot>,
    parent: Option<Arc<Injector>>,
}

impl Injector {
    /// A root injector.
    pub fn new(providers: Providers) -> Self {
        Self {
            slots: Self::slots(providers),
            parent: None,
        }
    }

    /// A child scope. Tokens it does not provide resolve in `parent`.
    pub fn child(parent: &Arc<Injector>, providers: Providers) -> Self {
        Self {
            slots: Self::slots(providers),
            parent: Some(parent.clone()),
        }
    }

    fn slots(providers: Providers) -> HashMap<Uuid, Slot> {
        providers
            .entries
            .into_iter()
            .map(|(id, entry)| {
                let slot = Slot {
                    entry,
                    instance: OnceLock::new(),
                };
                (id, slot)
            })
            .collect()
    }

    /// Resolve `token`, running its factory on first use.
    pub fn get<T: Send + Sync + 'static>(&self, token: &InjectionToken<T>) -> ClientResult<Arc<T>> {
        let Some(slot) = self.slots.get(&token.id) else {
            return match &self.parent {
                Some(parent) => parent.get(token),
                None => Err(ClientError::MissingProvider {
                    token: token.name.to_string(),
                }),
            };
        };

        let instance = match slot.instance.get() {
            Some(instance) => instance.clone(),
            None => {
                let _guard = Resolving::enter(self, token.id).ok_or_else(|| {
                    ClientError::CircularDependency {
                        token: token.name.to_string(),
                    }
                })?;
                let created = (slot.entry.factory)(self)?;
                // A concurrent resolution may have won; keep its instance.
                let instance = slot.instance.get_or_init(|| created).clone();
                log_provider_resolved(slot.entry.name);
                instance
            }
        };

        instance
            .downcast::<T>()
            .map_err(|_| ClientError::ProviderType {
                token: token.name.to_string(),
            })
    }

    /// True when `token` resolves in this scope or a parent.
    pub fn provides<T: ?Sized>(&self, token: &InjectionToken<T>) -> bool {
        self.slots.contains_key(&token.id)
            || self.parent.as_ref().is_some_and(|p| p.provides(token))
    }

    /// Drop every instance this scope created. Parent scopes are untouched.
    pub fn destroy(self) {
        let created = self
            .slots
            .values()
            .filter(|slot| slot.instance.get().is_some())
            .count();
        tracing::debug!(instances = created, "Injector destroyed");
    }
}

thread_local! {
    // Slots whose factory is running on this thread, as (injector, token).
    static RESOLVING: RefCell<Vec<(usize, Uuid)>> = const { RefCell::new(Vec::new()) };
}

// Marks a slot as being resolved on this thread until dropped.
struct Resolving {
    key: (usize, Uuid),
}

impl Resolving {
    fn enter(injector: &Injector, id: Uuid) -> Option<Self> {
        let key = (injector as *const Injector as usize, id);
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                return None;
            }
            stack.push(key);
            Some(Self { key })
        })
    }
}

impl Drop for Resolving {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|key| *key == self.key) {
                stack.remove(pos);
            }
        });
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.slots.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

//! Per-application service container and per-request scopes.
//!
//! # Responsibilities
//! - Hold an application's singleton services
//! - Build scoped services once per dispatched request
//! - Release a scope's resources when the scope is dropped
//!
//! # Design Decisions
//! - Scoped services are built eagerly so factory failures surface before
//!   the pipeline runs
//! - Release is tied to `Drop`: success, error, cancellation and unwinding
//!   all release exactly once
//! - Scopes are threaded explicitly through each call, never stored in an
//!   ambient global

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use uuid::Uuid;

use crate::hosting::pipeline::{BoxError, ScopeFactory};
use crate::observability::metrics;

type AnyService = Arc<dyn Any + Send + Sync>;
type ScopedFactoryFn = Box<dyn Fn(&ServiceProvider) -> Result<AnyService, BoxError> + Send + Sync>;
type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Scope creation failures.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("scoped service `{service}` failed to build: {source}")]
    Factory {
        service: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("application `{0}` is stopped")]
    ProviderClosed(String),
}

struct ScopedRegistration {
    type_id: TypeId,
    type_name: &'static str,
    factory: ScopedFactoryFn,
}

/// Service registrations for one application, before it is built.
#[derive(Default)]
pub struct ServiceCollection {
    singletons: HashMap<TypeId, AnyService>,
    scoped: Vec<ScopedRegistration>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service shared by every request of the application.
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, service: T) -> &mut Self {
        self.singletons.insert(TypeId::of::<T>(), Arc::new(service));
        self
    }

    /// Register a service built fresh for every scope.
    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.scoped.retain(|r| r.type_id != TypeId::of::<T>());
        self.scoped.push(ScopedRegistration {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            factory: Box::new(move |provider| {
                factory(provider).map(|service| Arc::new(service) as AnyService)
            }),
        });
        self
    }

    /// Freeze the registrations.
    pub fn build_provider(self, name: impl Into<String>) -> ServiceProvider {
        ServiceProvider {
            inner: Arc::new(ProviderInner {
                name: name.into(),
                singletons: self.singletons,
                scoped: self.scoped,
                created: AtomicU64::new(0),
                released: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }
}

struct ProviderInner {
    name: String,
    singletons: HashMap<TypeId, AnyService>,
    scoped: Vec<ScopedRegistration>,
    created: AtomicU64,
    released: AtomicU64,
    closed: AtomicBool,
}

/// Counts of scopes created and released by one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeStats {
    pub created: u64,
    pub released: u64,
}

impl ScopeStats {
    pub fn active(&self) -> u64 {
        self.created.saturating_sub(self.released)
    }
}

/// Frozen service container of one application. Cheap to clone.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Resolve a singleton.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner
            .singletons
            .get(&TypeId::of::<T>())
            .and_then(|s| s.clone().downcast::<T>().ok())
    }

    pub fn stats(&self) -> ScopeStats {
        ScopeStats {
            created: self.inner.created.load(Ordering::Acquire),
            released: self.inner.released.load(Ordering::Acquire),
        }
    }

    /// Refuse new scopes. Scopes already handed out are unaffected.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl ScopeFactory for ServiceProvider {
    fn create_scope(&self) -> Result<Scope, ScopeError> {
        if self.is_closed() {
            return Err(ScopeError::ProviderClosed(self.inner.name.clone()));
        }

        let mut instances = HashMap::with_capacity(self.inner.scoped.len());
        for registration in &self.inner.scoped {
            let instance =
                (registration.factory)(self).map_err(|source| ScopeError::Factory {
                    service: registration.type_name,
                    source,
                })?;
            instances.insert(registration.type_id, instance);
        }

        let id = Uuid::new_v4();
        self.inner.created.fetch_add(1, Ordering::AcqRel);
        metrics::scope_opened(&self.inner.name);
        tracing::trace!(app = %self.inner.name, scope_id = %id, "Scope created");

        Ok(Scope {
            services: ScopedServices {
                scope_id: id,
                instances: Arc::new(instances),
                provider: self.clone(),
            },
            release_hooks: Mutex::new(Vec::new()),
        })
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("name", &self.inner.name)
            .field("singletons", &self.inner.singletons.len())
            .field("scoped", &self.inner.scoped.len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Service view of one scope, handed to request handlers.
#[derive(Clone)]
pub struct ScopedServices {
    scope_id: Uuid,
    instances: Arc<HashMap<TypeId, AnyService>>,
    provider: ServiceProvider,
}

impl ScopedServices {
    pub fn scope_id(&self) -> Uuid {
        self.scope_id
    }

    /// Resolve a scoped service, falling back to the application's singletons.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instances
            .get(&TypeId::of::<T>())
            .and_then(|s| s.clone().downcast::<T>().ok())
            .or_else(|| self.provider.get::<T>())
    }
}

/// Isolated resources for one dispatched request.
pub struct Scope {
    services: ScopedServices,
    release_hooks: Mutex<Vec<ReleaseHook>>,
}

impl Scope {
    pub fn id(&self) -> Uuid {
        self.services.scope_id
    }

    pub fn services(&self) -> &ScopedServices {
        &self.services
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    /// Run `hook` when the scope is released. Hooks run in reverse order.
    pub fn on_release(&self, hook: impl FnOnce() + Send + 'static) {
        self.release_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let hooks = std::mem::take(
            self.release_hooks
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for hook in hooks.into_iter().rev() {
            hook();
        }

        let provider = &self.services.provider.inner;
        provider.released.fetch_add(1, Ordering::AcqRel);
        metrics::scope_released(&provider.name);
        tracing::trace!(app = %provider.name, scope_id = %self.services.scope_id, "Scope released");
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.services.scope_id)
            .field("app", &self.services.provider.name())
            .finish()
    }
}

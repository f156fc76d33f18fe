//! Behavior overrides for component kinds.
//!
//! The registry stores every component behind the [`Delegate`] trait. By
//! default that is a thin wrapper around the component itself; an embedder
//! may register an override per kind that carries extra server-side state
//! (a table's contents, for example). Wire projections always read the base
//! component, so override state never reaches clients.

use std::any::Any;
use std::collections::HashMap;

use fusilli_types::{Component, ComponentKind};

/// A stored component, possibly wrapped in user-defined behavior.
pub trait Delegate: Any + Send {
    /// The base component; all wire projections and reference scans read
    /// this, never the override's extra state.
    fn component(&self) -> &Component;

    fn component_mut(&mut self) -> &mut Component;

    /// Downcasting access to override state.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The default delegate: the bare component, nothing else.
pub struct BaseDelegate(pub Component);

impl Delegate for BaseDelegate {
    fn component(&self) -> &Component {
        &self.0
    }

    fn component_mut(&mut self) -> &mut Component {
        &mut self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Constructor producing an override instance from a validated component.
pub type DelegateCtor = Box<dyn Fn(Component) -> Box<dyn Delegate> + Send>;

/// Per-kind override constructors.
#[derive(Default)]
pub struct DelegateRegistry {
    ctors: HashMap<ComponentKind, DelegateCtor>,
}

impl DelegateRegistry {
    /// Register an override for a kind, replacing any previous one.
    pub fn register<D, F>(&mut self, kind: ComponentKind, ctor: F)
    where
        D: Delegate,
        F: Fn(Component) -> D + Send + 'static,
    {
        self.ctors
            .insert(kind, Box::new(move |component| Box::new(ctor(component))));
    }

    /// Wrap a freshly created component: the registered override if there is
    /// one, otherwise a [`BaseDelegate`].
    #[must_use]
    pub fn construct(&self, component: Component) -> Box<dyn Delegate> {
        match self.ctors.get(&component.kind()) {
            Some(ctor) => ctor(component),
            None => Box::new(BaseDelegate(component)),
        }
    }
}

//! The scene-state engine.
//!
//! One `Scene` is the single source of truth for a NOODLES session. It owns
//! the identifier allocator, the component registry, the reverse reference
//! index, the deferred-delete queue, and the set of connected clients, and it
//! is the only code that produces outbound frames. All mutations run on one
//! logical task: connection handlers and embedding applications reach the
//! scene through a mutex, and method handlers run synchronously inside it.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

use ciborium::Value;
use indexmap::IndexMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fusilli_net::messages::DocumentUpdate;
use fusilli_net::{Frame, Invoke, NetError, codec, projection, tags};
use fusilli_types::{
    AnyId, Component, ComponentKind, ComponentType, EntityId, InvocationContext, Method, MethodId,
    PlotId, SignalId, TableId, VisitRefs,
};

use crate::allocator::IdAllocator;
use crate::delegate::{Delegate, DelegateRegistry};
use crate::dispatch::MethodHandler;
use crate::error::SceneError;
use crate::refs::ReferenceTracker;

/// What a client last saw of one component: the component value itself (for
/// reference rescans) and its projected wire map (for delta computation).
struct Snapshot {
    component: Component,
    wire: Value,
}

struct ClientHandle {
    name: String,
    sender: UnboundedSender<Vec<u8>>,
}

/// Optional JSON log of every outbound logical message, one line per frame.
struct MessageLog {
    file: std::fs::File,
}

impl MessageLog {
    fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            file: std::fs::File::create(path)?,
        })
    }

    fn append(&mut self, frame: &Frame) -> Result<(), SceneError> {
        let mut entries = Vec::with_capacity(frame.pairs().len() * 2);
        for (tag, content) in frame.pairs() {
            entries.push(serde_json::to_value(tag)?);
            entries.push(serde_json::to_value(content)?);
        }
        writeln!(self.file, "{}", serde_json::Value::Array(entries))?;
        Ok(())
    }
}

/// The authoritative scene state and its broadcast machinery.
#[derive(Default)]
pub struct Scene {
    allocator: IdAllocator,
    pub(crate) registry: IndexMap<AnyId, Box<dyn Delegate>>,
    client_state: HashMap<AnyId, Snapshot>,
    refs: ReferenceTracker,
    delete_queue: HashSet<AnyId>,
    overrides: DelegateRegistry,
    pub(crate) handlers: HashMap<String, MethodHandler>,
    clients: HashMap<Uuid, ClientHandle>,
    message_log: Option<MessageLog>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene that appends every outbound logical message to a JSON-lines
    /// file at `path` (truncating any previous contents).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Io`] if the file cannot be created.
    pub fn with_message_log(path: &Path) -> Result<Self, SceneError> {
        Ok(Self {
            message_log: Some(MessageLog::create(path)?),
            ..Self::default()
        })
    }

    /// Register a behavior override for a component kind. Every subsequent
    /// `create` of that kind stores the override instance instead of the
    /// bare component.
    pub fn register_override<D, F>(&mut self, kind: ComponentKind, ctor: F)
    where
        D: Delegate,
        F: Fn(Component) -> D + Send + 'static,
    {
        self.overrides.register(kind, ctor);
    }

    // ── Creation ────────────────────────────────────────────────────────────

    /// Create a component: validate, allocate an identifier, track its
    /// references, snapshot it for delta computation, and broadcast the
    /// create message. Returns the typed identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidAttributes`] if validation rejects the
    /// component; no state is mutated and nothing is broadcast.
    pub fn create<C: ComponentType>(&mut self, component: C) -> Result<C::Id, SceneError> {
        let mut component: Component = component.into();
        component.validate()?;

        let id = self.allocator.allocate(C::KIND);
        component.set_id(id);
        let any = component.id();

        let wire = match projection::component_value(&component) {
            Ok(wire) => wire,
            Err(error) => {
                self.allocator.release(C::KIND, id);
                return Err(error.into());
            }
        };

        // References are tracked before the create is observable.
        self.refs.add(any, &component);
        self.client_state.insert(
            any,
            Snapshot {
                component: component.clone(),
                wire: wire.clone(),
            },
        );
        self.registry.insert(any, self.overrides.construct(component));

        self.broadcast(&Frame::single(tags::create(C::KIND), wire))?;
        self.drain_delete_queue()?;
        Ok(C::typed_id(id))
    }

    /// Create a method component and bind `handler` under its name. The
    /// handler runs synchronously on the scene task whenever a client
    /// invokes the method.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidAttributes`] if the method is rejected.
    pub fn register_method<F>(&mut self, method: Method, handler: F) -> Result<MethodId, SceneError>
    where
        F: Fn(&mut Scene, Option<InvocationContext>, Vec<Value>) -> crate::dispatch::MethodResult
            + Send
            + Sync
            + 'static,
    {
        let name = method.name.clone();
        let id = self.create(method)?;
        self.handlers.insert(name, std::sync::Arc::new(handler));
        Ok(id)
    }

    // ── Lookup ──────────────────────────────────────────────────────────────

    /// Typed read access to a stored component.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the identifier is not live.
    pub fn get<C: ComponentType>(&self, id: C::Id) -> Result<&C, SceneError> {
        let any: AnyId = id.into();
        let delegate = self.registry.get(&any).ok_or(SceneError::NotFound(any))?;
        C::from_component(delegate.component()).ok_or(SceneError::NotFound(any))
    }

    /// Typed mutable access to a stored component. Changes stay server-local
    /// until [`update`](Self::update) is called.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the identifier is not live.
    pub fn get_mut<C: ComponentType>(&mut self, id: C::Id) -> Result<&mut C, SceneError> {
        let any: AnyId = id.into();
        let delegate = self
            .registry
            .get_mut(&any)
            .ok_or(SceneError::NotFound(any))?;
        C::from_component_mut(delegate.component_mut()).ok_or(SceneError::NotFound(any))
    }

    /// Kind-erased read access.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the identifier is not live.
    pub fn component(&self, id: AnyId) -> Result<&Component, SceneError> {
        Ok(self
            .registry
            .get(&id)
            .ok_or(SceneError::NotFound(id))?
            .component())
    }

    /// The stored delegate, for downcasting to a behavior override.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the identifier is not live.
    pub fn delegate(&self, id: AnyId) -> Result<&dyn Delegate, SceneError> {
        Ok(self
            .registry
            .get(&id)
            .ok_or(SceneError::NotFound(id))?
            .as_ref())
    }

    /// Mutable delegate access, for downcasting to a behavior override.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the identifier is not live.
    pub fn delegate_mut(&mut self, id: AnyId) -> Result<&mut dyn Delegate, SceneError> {
        Ok(self
            .registry
            .get_mut(&id)
            .ok_or(SceneError::NotFound(id))?
            .as_mut())
    }

    /// First component of `kind` with exactly this name. Names are
    /// informational and need not be unique.
    #[must_use]
    pub fn by_name(&self, kind: ComponentKind, name: &str) -> Option<AnyId> {
        self.registry
            .iter()
            .find(|(id, delegate)| id.kind == kind && delegate.component().name() == Some(name))
            .map(|(id, _)| *id)
    }

    /// All live identifiers of a kind, in insertion order.
    #[must_use]
    pub fn ids_by_kind(&self, kind: ComponentKind) -> Vec<AnyId> {
        self.registry
            .keys()
            .filter(|id| id.kind == kind)
            .copied()
            .collect()
    }

    /// Resolve an invocation context to the component it targets.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the target is not live.
    pub fn resolve_context(&self, context: &InvocationContext) -> Result<AnyId, SceneError> {
        let target = context.target();
        if self.registry.contains_key(&target) {
            Ok(target)
        } else {
            Err(SceneError::NotFound(target))
        }
    }

    // ── Update ──────────────────────────────────────────────────────────────

    /// Publish server-local changes to a component. Computes the field-level
    /// delta against what clients last saw, rescans references, and
    /// broadcasts the update — or nothing at all if no field changed.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Unupdatable`] if the kind has no update
    /// message, [`SceneError::NotFound`] if the identifier is not live, and
    /// [`SceneError::InvalidAttributes`] if the changed component no longer
    /// validates.
    pub fn update(&mut self, id: impl Into<AnyId>) -> Result<(), SceneError> {
        let any = id.into();
        let update_tag = tags::update(any.kind).ok_or(SceneError::Unupdatable(any.kind))?;

        let component = self
            .registry
            .get(&any)
            .ok_or(SceneError::NotFound(any))?
            .component()
            .clone();
        component.validate()?;

        let wire = projection::component_value(&component)?;
        let previous = self
            .client_state
            .get(&any)
            .ok_or(SceneError::NotFound(any))?;
        let delta = projection::map_delta(&previous.wire, &wire)?;

        // Full symmetric rescan: drop the previous snapshot's references,
        // then track the current value's.
        let previous_component = previous.component.clone();
        self.refs.remove(any, &previous_component);
        self.refs.add(any, &component);
        self.client_state.insert(any, Snapshot { component, wire });

        if delta.is_empty() {
            debug!(id = %any, "update carried no changes; skipping broadcast");
        } else {
            let content = projection::update_content(any, delta)?;
            self.broadcast(&Frame::single(update_tag, content))?;
        }

        // Dropped references may have freed deferred deletions.
        self.drain_delete_queue()
    }

    // ── Deletion ────────────────────────────────────────────────────────────

    /// Delete a component, or defer the deletion until nothing references it.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the identifier is not live.
    pub fn delete(&mut self, id: impl Into<AnyId>) -> Result<(), SceneError> {
        let any = id.into();
        if !self.registry.contains_key(&any) {
            return Err(SceneError::NotFound(any));
        }
        if self.refs.is_referenced(any) {
            if self.delete_queue.insert(any) {
                warn!(
                    id = %any,
                    referrers = ?self.refs.incoming(any),
                    "deletion deferred; component still referenced"
                );
            }
            return Ok(());
        }
        self.remove_now(any)?;
        self.drain_delete_queue()
    }

    fn remove_now(&mut self, any: AnyId) -> Result<(), SceneError> {
        let Some(delegate) = self.registry.shift_remove(&any) else {
            return Ok(());
        };
        self.delete_queue.remove(&any);
        self.broadcast(&Frame::single(
            tags::delete(any.kind),
            projection::id_content(any)?,
        ))?;
        self.refs.remove(any, delegate.component());
        self.client_state.remove(&any);
        self.allocator.release(any.kind, any.id);
        debug!(id = %any, "component removed");
        Ok(())
    }

    /// Remove every queued component whose incoming set has emptied,
    /// cascading until none remain eligible.
    fn drain_delete_queue(&mut self) -> Result<(), SceneError> {
        loop {
            let Some(next) = self
                .delete_queue
                .iter()
                .copied()
                .find(|id| !self.refs.is_referenced(*id))
            else {
                return Ok(());
            };
            self.remove_now(next)?;
        }
    }

    // ── Signals ─────────────────────────────────────────────────────────────

    /// Broadcast a signal invocation scoped to an entity, table, or plot.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidTarget`] for any other kind and
    /// [`SceneError::NotFound`] if the target is not live.
    pub fn invoke_signal(
        &mut self,
        signal: SignalId,
        target: impl Into<AnyId>,
        signal_data: Vec<Value>,
    ) -> Result<(), SceneError> {
        let target = target.into();
        if !self.registry.contains_key(&target) {
            return Err(SceneError::NotFound(target));
        }
        let context = match target.kind {
            ComponentKind::Entity => InvocationContext::Entity(EntityId(target.id)),
            ComponentKind::Table => InvocationContext::Table(TableId(target.id)),
            ComponentKind::Plot => InvocationContext::Plot(PlotId(target.id)),
            other => return Err(SceneError::InvalidTarget(other)),
        };
        let invoke = Invoke {
            id: signal,
            context: Some(context),
            signal_data,
        };
        self.broadcast(&Frame::single(
            tags::SIGNAL_INVOKE,
            codec::to_value(&invoke)?,
        ))
    }

    // ── Introduction ────────────────────────────────────────────────────────

    /// The frame a newly connected client receives: every component's create
    /// message in topological order (referents before referrers, ties by
    /// insertion order), then the document update, then `initialized`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Net`] if projection fails.
    pub fn introduce(&self) -> Result<Frame, SceneError> {
        let mut frame = Frame::new();
        for id in self.ordered_ids() {
            if let Some(delegate) = self.registry.get(&id) {
                frame.push(
                    tags::create(id.kind),
                    projection::component_value(delegate.component())?,
                );
            }
        }
        frame.push(tags::DOCUMENT_UPDATE, self.document_update()?);
        frame.push(tags::DOCUMENT_INITIALIZED, Value::Map(Vec::new()));
        Ok(frame)
    }

    /// Depth-first post-order over outgoing references: every component is
    /// emitted after everything it refers to.
    fn ordered_ids(&self) -> Vec<AnyId> {
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(self.registry.len());
        for id in self.registry.keys() {
            self.visit_ordered(*id, &mut visited, &mut order);
        }
        order
    }

    fn visit_ordered(&self, id: AnyId, visited: &mut HashSet<AnyId>, order: &mut Vec<AnyId>) {
        if !visited.insert(id) {
            return;
        }
        let Some(delegate) = self.registry.get(&id) else {
            return;
        };
        let mut targets = Vec::new();
        delegate
            .component()
            .visit_refs(&mut |target| targets.push(target));
        for target in targets {
            self.visit_ordered(target, visited, order);
        }
        order.push(id);
    }

    fn document_update(&self) -> Result<Value, NetError> {
        let update = DocumentUpdate {
            methods_list: self
                .ids_by_kind(ComponentKind::Method)
                .into_iter()
                .map(|id| id.id.into())
                .collect(),
            signals_list: self
                .ids_by_kind(ComponentKind::Signal)
                .into_iter()
                .map(|id| id.id.into())
                .collect(),
        };
        codec::to_value(&update)
    }

    // ── Clients and broadcast ───────────────────────────────────────────────

    /// Attach a client: send it the introduction frame, then include it in
    /// every subsequent broadcast. Returns the connection's identity.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Net`] if the introduction cannot be encoded.
    pub fn attach_client(
        &mut self,
        name: impl Into<String>,
        sender: UnboundedSender<Vec<u8>>,
    ) -> Result<Uuid, SceneError> {
        let name = name.into();
        let intro = self.introduce()?;
        self.log_frame(&intro)?;
        let _ = sender.send(intro.encode()?);

        let id = Uuid::new_v4();
        info!(client = %name, %id, "client attached");
        self.clients.insert(id, ClientHandle { name, sender });
        Ok(id)
    }

    /// Detach a client; it receives no further messages.
    pub fn detach_client(&mut self, id: Uuid) {
        if let Some(client) = self.clients.remove(&id) {
            info!(client = %client.name, %id, "client detached");
        }
    }

    /// Number of attached clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Send a frame to every attached client, best-effort: a client whose
    /// channel has closed is dropped without disturbing the rest.
    fn broadcast(&mut self, frame: &Frame) -> Result<(), SceneError> {
        self.log_frame(frame)?;
        debug!(tags = ?frame.tags(), "broadcasting");
        let bytes = frame.encode()?;
        self.clients.retain(|id, client| {
            if client.sender.send(bytes.clone()).is_ok() {
                true
            } else {
                warn!(client = %client.name, %id, "dropping client with closed channel");
                false
            }
        });
        Ok(())
    }

    /// Send a frame to one client only (method replies).
    pub(crate) fn send_to(&mut self, id: Uuid, frame: &Frame) -> Result<(), SceneError> {
        self.log_frame(frame)?;
        if let Some(client) = self.clients.get(&id) {
            let _ = client.sender.send(frame.encode()?);
        }
        Ok(())
    }

    fn log_frame(&mut self, frame: &Frame) -> Result<(), SceneError> {
        if let Some(log) = &mut self.message_log {
            log.append(frame)?;
        }
        Ok(())
    }
}

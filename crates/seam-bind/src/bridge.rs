//! The reference-bridging protocol.
//!
//! Converts between live object references and integer handles so that
//! neither side of the boundary ever holds raw pointers into the
//! other's memory model. Handle storage is delegated to an injected
//! [`RefRegistry`]; the bridge owns only the lookup/register/release
//! contract and the ownership-tag semantics that decide, on decode,
//! between returning a stored native reference and constructing a
//! reverse proxy for a foreign-owned object.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use seam_core::package::InterfaceDef;
use seam_core::types::{TypeDesc, TypeName};
use seam_core::value::{obj_id, BoundObject, CallError, ObjRef, Value};
use seam_core::wire::{RefHandle, RefOwner, Wire};

use crate::error::MarshalError;
use crate::marshal::{free_bufs, Marshaler, Mode};

/// The process-wide handle table contract.
///
/// Implementations must be safe for concurrent register/lookup/release
/// from any number of native threads and from boundary re-entrant
/// calls. Slot 0 is reserved for the null handle and must never be
/// allocated. Entries are released only by explicit action from the
/// side that created them; the bridge never frees entries on the
/// table's behalf.
pub trait RefRegistry: Send + Sync {
    /// Register `obj`, or bump the reference count of its existing
    /// entry. The same live object always yields the same slot.
    fn register(&self, obj: &ObjRef) -> u32;

    /// Fetch the object stored at `slot`.
    fn lookup(&self, slot: u32) -> Option<ObjRef>;

    /// Drop one reference to `slot`, removing the entry when the count
    /// reaches zero.
    fn release(&self, slot: u32);
}

struct TableEntry {
    obj: ObjRef,
    refs: usize,
}

struct TableInner {
    next_slot: u32,
    entries: HashMap<u32, TableEntry>,
    by_identity: HashMap<usize, u32>,
}

/// The provided thread-safe registry: a reference-counted slot map
/// with an identity index for handle stability.
pub struct HandleTable {
    inner: RwLock<TableInner>,
}

impl HandleTable {
    pub fn new() -> Self {
        HandleTable {
            inner: RwLock::new(TableInner {
                next_slot: 1, // slot 0 is the null handle
                entries: HashMap::new(),
                by_identity: HashMap::new(),
            }),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.read().expect("handle table poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        HandleTable::new()
    }
}

impl RefRegistry for HandleTable {
    fn register(&self, obj: &ObjRef) -> u32 {
        let id = obj_id(obj);
        let mut table = self.inner.write().expect("handle table poisoned");
        if let Some(&slot) = table.by_identity.get(&id) {
            if let Some(entry) = table.entries.get_mut(&slot) {
                entry.refs += 1;
            }
            return slot;
        }
        let slot = table.next_slot;
        table.next_slot += 1;
        table.entries.insert(slot, TableEntry { obj: obj.clone(), refs: 1 });
        table.by_identity.insert(id, slot);
        slot
    }

    fn lookup(&self, slot: u32) -> Option<ObjRef> {
        self.inner
            .read()
            .expect("handle table poisoned")
            .entries
            .get(&slot)
            .map(|e| e.obj.clone())
    }

    fn release(&self, slot: u32) {
        let mut table = self.inner.write().expect("handle table poisoned");
        let remove = match table.entries.get_mut(&slot) {
            Some(entry) => {
                entry.refs -= 1;
                entry.refs == 0
            }
            None => false,
        };
        if remove {
            if let Some(entry) = table.entries.remove(&slot) {
                table.by_identity.remove(&obj_id(&entry.obj));
            }
        }
    }
}

/// How a reverse proxy re-enters the boundary: the foreign side's
/// dispatch surface, keyed by entry point name.
pub trait ForeignInvoker: Send + Sync {
    fn invoke(
        &self,
        entry: &str,
        receiver: RefHandle,
        args: &[Wire],
    ) -> Result<Vec<Wire>, CallError>;
}

/// A stand-in for an absent foreign side: every reverse call fails.
pub struct NoForeignSide;

impl ForeignInvoker for NoForeignSide {
    fn invoke(&self, entry: &str, _receiver: RefHandle, _args: &[Wire]) -> Result<Vec<Wire>, CallError> {
        Err(CallError::Foreign {
            message: format!("no foreign side attached for entry {entry}"),
        })
    }
}

/// The reverse-proxy recipe for one implementable interface.
pub struct ProxySpec {
    pub iface: InterfaceDef,
    pub prefix: String,
    qualified: String,
}

/// Converts native references to handles and back.
pub struct ReferenceBridge {
    registry: Arc<dyn RefRegistry>,
    foreign: Arc<dyn ForeignInvoker>,
    proxies: RwLock<HashMap<String, Arc<ProxySpec>>>,
    me: Weak<ReferenceBridge>,
}

impl ReferenceBridge {
    pub fn new(registry: Arc<dyn RefRegistry>, foreign: Arc<dyn ForeignInvoker>) -> Arc<Self> {
        Arc::new_cyclic(|me| ReferenceBridge {
            registry,
            foreign,
            proxies: RwLock::new(HashMap::new()),
            me: me.clone(),
        })
    }

    /// Convenience constructor over a fresh [`HandleTable`].
    pub fn with_table(foreign: Arc<dyn ForeignInvoker>) -> Arc<Self> {
        ReferenceBridge::new(Arc::new(HandleTable::new()), foreign)
    }

    /// Install the reverse-proxy recipe for an implementable
    /// interface. Called by the proxy emitter; decode uses it to
    /// materialize foreign-owned handles of that type.
    pub fn register_proxy(&self, name: &TypeName, iface: InterfaceDef, prefix: &str) {
        let spec = ProxySpec {
            iface,
            prefix: prefix.to_string(),
            qualified: name.qualified(),
        };
        self.proxies
            .write()
            .expect("proxy map poisoned")
            .insert(name.qualified(), Arc::new(spec));
    }

    /// Whether a reverse proxy exists for the named type.
    pub fn has_proxy(&self, name: &TypeName) -> bool {
        self.proxies
            .read()
            .expect("proxy map poisoned")
            .contains_key(&name.qualified())
    }

    /// Encode a reference as a handle. Nil becomes the null handle; a
    /// reverse proxy yields back the foreign handle it carries; any
    /// other object is registered (or found) in the table.
    pub fn to_handle(&self, obj: Option<&ObjRef>) -> RefHandle {
        match obj {
            None => RefHandle::NULL,
            Some(o) => match o.foreign_handle() {
                Some(h) => h,
                None => RefHandle::native(self.registry.register(o)),
            },
        }
    }

    /// Decode a handle expected to carry a value of type `ty`.
    ///
    /// Native-owned handles return the stored reference directly.
    /// Foreign-owned handles construct a reverse proxy from the
    /// registered recipe; a foreign handle of a type with no recipe
    /// (a non-implementable interface) decodes to nil.
    pub fn from_handle(
        &self,
        handle: RefHandle,
        ty: &TypeDesc,
    ) -> Result<Option<ObjRef>, MarshalError> {
        if handle.is_null() {
            return Ok(None);
        }
        match handle.owner() {
            Some(RefOwner::Native) => match self.registry.lookup(handle.slot) {
                Some(obj) => Ok(Some(obj)),
                None => Err(MarshalError::Dangling { slot: handle.slot }),
            },
            Some(RefOwner::Foreign) => {
                let spec = ty.named_ref().and_then(|name| {
                    self.proxies
                        .read()
                        .expect("proxy map poisoned")
                        .get(&name.qualified())
                        .cloned()
                });
                match spec {
                    Some(spec) => {
                        let bridge = self.me.upgrade().expect("bridge dropped mid-decode");
                        Ok(Some(Arc::new(ReverseProxy { handle, spec, bridge })))
                    }
                    None => Ok(None),
                }
            }
            None => Err(MarshalError::UnknownOwner { tag: handle.owner }),
        }
    }

    /// Release one reference to a native-owned handle.
    pub fn release(&self, handle: RefHandle) {
        if handle.owner() == Some(RefOwner::Native) {
            self.registry.release(handle.slot);
        }
    }
}

/// A foreign-owned object seen from the native side.
///
/// Implements the original interface by re-entering the boundary for
/// every method: arguments are encoded Transient (this side keeps the
/// buffers and frees them after the call), results decode Retained.
pub struct ReverseProxy {
    handle: RefHandle,
    spec: Arc<ProxySpec>,
    bridge: Arc<ReferenceBridge>,
}

impl ReverseProxy {
    pub fn handle(&self) -> RefHandle {
        self.handle
    }
}

impl BoundObject for ReverseProxy {
    fn type_name(&self) -> &str {
        &self.spec.qualified
    }

    fn foreign_handle(&self) -> Option<RefHandle> {
        Some(self.handle)
    }

    fn call(&self, method: &str, args: &[Value]) -> Result<Vec<Value>, CallError> {
        let m = self
            .spec
            .iface
            .methods
            .iter()
            .find(|m| m.name == method)
            .ok_or_else(|| CallError::NoSuchMember {
                type_name: self.spec.qualified.clone(),
                member: method.to_string(),
            })?;
        if args.len() != m.sig.params.len() {
            return Err(CallError::ArityMismatch {
                expected: m.sig.params.len(),
                got: args.len(),
            });
        }

        let marshaler = Marshaler::new(self.bridge.clone());
        let mut wires = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&m.sig.params) {
            match marshaler.encode(arg, &param.ty, Mode::Transient) {
                Ok(wire) => wires.push(wire),
                Err(err) => {
                    free_bufs(&wires);
                    return Err(err.into());
                }
            }
        }

        let entry = format!("cproxy{}_{}_{}", self.spec.prefix, self.spec.iface.name, method);
        let outcome = self.bridge.foreign.invoke(&entry, self.handle, &wires);

        // Transient arguments: ownership stayed on this side, so the
        // boundary copies are freed once the call returns.
        free_bufs(&wires);

        let rets = outcome?;
        if rets.len() != m.sig.results.len() {
            free_bufs(&rets);
            return Err(CallError::ArityMismatch {
                expected: m.sig.results.len(),
                got: rets.len(),
            });
        }
        let mut values = Vec::with_capacity(rets.len());
        for (idx, (wire, ty)) in rets.iter().zip(&m.sig.results).enumerate() {
            match marshaler.decode(*wire, ty, Mode::Retained) {
                Ok(value) => values.push(value),
                // A failed retained decode has not consumed its buffer;
                // it and the undecoded remainder are still ours.
                Err(err) => {
                    free_bufs(&rets[idx..]);
                    return Err(err.into());
                }
            }
        }
        Ok(values)
    }
}

//! The proxy emitter: one generation pass over a bound package.
//!
//! Declarations are visited in input order and each yields forward
//! entry points, skip annotations, or a fatal error. Unsupported
//! constructs skip the member and annotate the output; fatal errors
//! abandon the rest of the offending declaration while siblings keep
//! emitting. The preamble is assembled last, once the body has told us
//! which packages it references.

use std::sync::Arc;

use seam_core::package::{is_exported, BoundPackage, FuncDef, InterfaceDef, Method, StructDef, VarDef};
use seam_core::types::{Signature, TypeDesc, TypeName};
use seam_core::value::{CallError, ObjRef, Value};
use seam_core::wire::{Wire, WireType};

use crate::bindings::Bindings;
use crate::bridge::ReferenceBridge;
use crate::description;
use crate::error::BindError;
use crate::imports::ImportCollector;
use crate::marshal::{free_bufs, Marshaler, Mode};
use crate::output::{BindOutput, BoundModule, EntryPoint, Item, Preamble};
use crate::support::{has_valid_arity, is_sig_supported, is_supported, sig_uses_exported_types};

/// Entry symbol prefix for a package path: separators become `_`.
fn path_prefix(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Decode the leading receiver handle into a live object.
fn receiver(marshaler: &Marshaler, wire: Wire, ty: &TypeDesc) -> Result<ObjRef, CallError> {
    match marshaler.decode(wire, ty, Mode::Transient)? {
        Value::Ref(Some(obj)) => Ok(obj),
        Value::Ref(None) => Err(CallError::NullReceiver),
        _ => Err(CallError::Marshal("receiver is not a reference".to_string())),
    }
}

/// Binds one package description to its native implementations,
/// producing the structured module.
pub struct Binder<'a> {
    pkg: &'a BoundPackage,
    bindings: Bindings,
    marshaler: Marshaler,
    bridge: Arc<ReferenceBridge>,
    imports: ImportCollector,
    items: Vec<Item>,
    errors: Vec<BindError>,
    prefix: String,
}

impl<'a> Binder<'a> {
    /// `bound` lists every package path the batch exposes, the bound
    /// package's own path included.
    pub fn new(
        pkg: &'a BoundPackage,
        bindings: Bindings,
        bridge: Arc<ReferenceBridge>,
        bound: impl IntoIterator<Item = String>,
    ) -> Self {
        Binder {
            pkg,
            bindings,
            marshaler: Marshaler::new(bridge.clone()),
            bridge,
            imports: ImportCollector::new(pkg.path.clone(), bound),
            items: Vec::new(),
            errors: Vec::new(),
            prefix: path_prefix(&pkg.path),
        }
    }

    /// Run the pass: structs, then interfaces, vars, and functions,
    /// each kind in declaration order.
    pub fn bind(mut self) -> BindOutput {
        let pkg = self.pkg;
        for s in &pkg.structs {
            self.bind_struct(s);
        }
        for i in &pkg.interfaces {
            self.bind_interface(i);
        }
        for v in &pkg.vars {
            self.bind_var(v);
        }
        for f in &pkg.funcs {
            self.bind_func(f);
        }
        let preamble = Preamble {
            package: pkg.name.clone(),
            path: pkg.path.clone(),
            digest: description::digest(pkg),
            imports: self.imports.render(),
        };
        BindOutput {
            module: BoundModule { preamble, items: self.items },
            errors: self.errors,
        }
    }

    fn entry_name(&self, owner: &str, member: &str) -> String {
        format!("proxy{}_{}_{}", self.prefix, owner, member)
    }

    /// Wire-level signature of `sig`, with an optional leading
    /// receiver handle.
    fn wire_sig(
        &self,
        decl: &str,
        sig: &Signature,
        with_receiver: bool,
    ) -> Result<(Vec<WireType>, Vec<WireType>), BindError> {
        let mut params = Vec::with_capacity(sig.params.len() + 1);
        if with_receiver {
            params.push(WireType::Handle);
        }
        for p in &sig.params {
            params.push(p.ty.wire_type().ok_or_else(|| BindError::UnsupportedReached {
                decl: decl.to_string(),
                ty: p.ty.to_string(),
            })?);
        }
        let mut results = Vec::with_capacity(sig.results.len());
        for r in &sig.results {
            results.push(r.wire_type().ok_or_else(|| BindError::UnsupportedReached {
                decl: decl.to_string(),
                ty: r.to_string(),
            })?);
        }
        Ok((params, results))
    }

    /// Emit a forward entry: decode arguments Transient, run `call`,
    /// encode results Retained. `receiver_ty` adds a leading handle
    /// parameter that resolves to the live object handed to `call`.
    fn forward_entry(
        &mut self,
        decl: &str,
        name: String,
        sig: &Signature,
        receiver_ty: Option<TypeDesc>,
        call: impl Fn(Option<&ObjRef>, &[Value]) -> Result<Vec<Value>, CallError> + Send + Sync + 'static,
    ) -> Result<(), BindError> {
        let (wire_params, wire_results) = self.wire_sig(decl, sig, receiver_ty.is_some())?;
        let marshaler = self.marshaler.clone();
        let sig = sig.clone();
        let invoke = Box::new(move |args: &[Wire]| -> Result<Vec<Wire>, CallError> {
            let lead = usize::from(receiver_ty.is_some());
            if args.len() != sig.params.len() + lead {
                return Err(CallError::ArityMismatch {
                    expected: sig.params.len() + lead,
                    got: args.len(),
                });
            }
            let recv = match &receiver_ty {
                Some(ty) => Some(receiver(&marshaler, args[0], ty)?),
                None => None,
            };
            let mut values = Vec::with_capacity(sig.params.len());
            for (wire, p) in args[lead..].iter().zip(&sig.params) {
                values.push(marshaler.decode(*wire, &p.ty, Mode::Transient)?);
            }
            let results = call(recv.as_ref(), &values)?;
            if results.len() != sig.results.len() {
                return Err(CallError::ArityMismatch {
                    expected: sig.results.len(),
                    got: results.len(),
                });
            }
            let mut out = Vec::with_capacity(results.len());
            for (value, ty) in results.iter().zip(&sig.results) {
                match marshaler.encode(value, ty, Mode::Retained) {
                    Ok(wire) => out.push(wire),
                    // Results already encoded are boundary allocations
                    // nobody will receive; release them.
                    Err(err) => {
                        free_bufs(&out);
                        return Err(err.into());
                    }
                }
            }
            Ok(out)
        });
        self.items.push(Item::Entry(EntryPoint {
            name,
            params: wire_params,
            results: wire_results,
            invoke,
        }));
        Ok(())
    }

    /// Emit the forward entry for one method of `owner`. Returns false
    /// when a fatal error was recorded and the declaration must be
    /// abandoned.
    fn bind_method(&mut self, owner: &str, owner_ty: &TypeDesc, m: &Method) -> bool {
        let decl = format!("method {}.{}", owner, m.name);
        if !has_valid_arity(&m.sig) {
            self.errors.push(BindError::BadResultArity { decl });
            return false;
        }
        if !is_sig_supported(&m.sig) {
            self.items.push(Item::Annotation(format!(
                "skipped method {}.{} with unsupported parameter or result types",
                owner, m.name
            )));
            return true;
        }
        if let Err(err) = self.imports.touch_sig(&m.sig) {
            self.errors.push(err);
            return false;
        }
        let method = m.name.clone();
        let emitted = self.forward_entry(
            &decl,
            self.entry_name(owner, &m.name),
            &m.sig,
            Some(owner_ty.clone()),
            move |recv, args| {
                let obj = recv.ok_or(CallError::NullReceiver)?;
                obj.call(&method, args)
            },
        );
        match emitted {
            Ok(()) => true,
            Err(err) => {
                self.errors.push(err);
                false
            }
        }
    }

    fn bind_struct(&mut self, s: &StructDef) {
        let owner_ty = TypeDesc::Ptr(TypeName::new(self.pkg.path.clone(), s.name.clone()));
        for field in &s.fields {
            if !is_exported(&field.name) {
                continue;
            }
            if !is_supported(&field.ty) {
                self.items.push(Item::Annotation(format!(
                    "skipped field {}.{} with unsupported type {}",
                    s.name, field.name, field.ty
                )));
                continue;
            }
            if let Err(err) = self.imports.touch_type(&field.ty) {
                self.errors.push(err);
                return;
            }
            if !self.bind_field(s, &owner_ty, field) {
                return;
            }
        }
        for m in &s.methods {
            if !is_exported(&m.name) {
                continue;
            }
            if !self.bind_method(&s.name, &owner_ty, m) {
                return;
            }
        }
    }

    /// Emit the `_Get`/`_Set` accessor pair for one exported field.
    /// Both directions move the payload Retained: the crossing hands
    /// the allocation over with the value.
    fn bind_field(
        &mut self,
        s: &StructDef,
        owner_ty: &TypeDesc,
        field: &seam_core::package::Field,
    ) -> bool {
        let decl = format!("field {}.{}", s.name, field.name);
        let wire_ty = match field.ty.wire_type() {
            Some(w) => w,
            None => {
                self.errors.push(BindError::UnsupportedReached {
                    decl,
                    ty: field.ty.to_string(),
                });
                return false;
            }
        };

        let marshaler = self.marshaler.clone();
        let getter_owner = owner_ty.clone();
        let getter_ty = field.ty.clone();
        let type_name = s.name.clone();
        let field_name = field.name.clone();
        self.items.push(Item::Entry(EntryPoint {
            name: self.entry_name(&s.name, &format!("{}_Get", field.name)),
            params: vec![WireType::Handle],
            results: vec![wire_ty],
            invoke: Box::new(move |args: &[Wire]| {
                if args.len() != 1 {
                    return Err(CallError::ArityMismatch { expected: 1, got: args.len() });
                }
                let obj = receiver(&marshaler, args[0], &getter_owner)?;
                let value = obj.get_field(&field_name).ok_or_else(|| CallError::NoSuchMember {
                    type_name: type_name.clone(),
                    member: field_name.clone(),
                })?;
                Ok(vec![marshaler.encode(&value, &getter_ty, Mode::Retained)?])
            }),
        }));

        let marshaler = self.marshaler.clone();
        let setter_owner = owner_ty.clone();
        let setter_ty = field.ty.clone();
        let type_name = s.name.clone();
        let field_name = field.name.clone();
        self.items.push(Item::Entry(EntryPoint {
            name: self.entry_name(&s.name, &format!("{}_Set", field.name)),
            params: vec![WireType::Handle, wire_ty],
            results: vec![],
            invoke: Box::new(move |args: &[Wire]| {
                if args.len() != 2 {
                    return Err(CallError::ArityMismatch { expected: 2, got: args.len() });
                }
                let obj = receiver(&marshaler, args[0], &setter_owner)?;
                let value = marshaler.decode(args[1], &setter_ty, Mode::Retained)?;
                if !obj.set_field(&field_name, value) {
                    return Err(CallError::NoSuchMember {
                        type_name: type_name.clone(),
                        member: field_name.clone(),
                    });
                }
                Ok(vec![])
            }),
        }));
        true
    }

    fn bind_interface(&mut self, i: &InterfaceDef) {
        let name = TypeName::new(self.pkg.path.clone(), i.name.clone());
        let owner_ty = TypeDesc::Named { name: name.clone(), underlying: seam_core::types::NamedForm::Interface };
        // Implementable from the foreign side only if every method is
        // exported, fully representable, and built from exported types.
        let mut implementable = true;
        for m in &i.methods {
            if !is_exported(&m.name) {
                implementable = false;
                continue;
            }
            if !sig_uses_exported_types(&m.sig) {
                implementable = false;
                self.items.push(Item::Annotation(format!(
                    "skipped method {}.{} using an unexported type",
                    i.name, m.name
                )));
                continue;
            }
            if !is_sig_supported(&m.sig) {
                implementable = false;
            }
            if !self.bind_method(&i.name, &owner_ty, m) {
                return;
            }
        }
        if implementable {
            self.bridge.register_proxy(&name, i.clone(), &self.prefix);
        } else {
            self.items.push(Item::Annotation(format!(
                "skipped reverse proxy for {} with unexported or unsupported methods",
                i.name
            )));
        }
    }

    fn bind_var(&mut self, v: &VarDef) {
        if !is_supported(&v.ty) {
            self.items.push(Item::Annotation(format!(
                "skipped variable {} with unsupported type {}",
                v.name, v.ty
            )));
            return;
        }
        if let Err(err) = self.imports.touch_type(&v.ty) {
            self.errors.push(err);
            return;
        }
        let Some(var) = self.bindings.var(&v.name).cloned() else {
            self.items.push(Item::Annotation(format!(
                "skipped variable {} with no native binding",
                v.name
            )));
            return;
        };
        let decl = format!("variable {}", v.name);
        let wire_ty = match v.ty.wire_type() {
            Some(w) => w,
            None => {
                self.errors.push(BindError::UnsupportedReached {
                    decl,
                    ty: v.ty.to_string(),
                });
                return;
            }
        };

        let marshaler = self.marshaler.clone();
        let get_ty = v.ty.clone();
        let get = var.get.clone();
        self.items.push(Item::Entry(EntryPoint {
            name: self.entry_name("", &format!("{}_Get", v.name)),
            params: vec![],
            results: vec![wire_ty],
            invoke: Box::new(move |args: &[Wire]| {
                if !args.is_empty() {
                    return Err(CallError::ArityMismatch { expected: 0, got: args.len() });
                }
                Ok(vec![marshaler.encode(&get(), &get_ty, Mode::Retained)?])
            }),
        }));

        let marshaler = self.marshaler.clone();
        let set_ty = v.ty.clone();
        let set = var.set;
        self.items.push(Item::Entry(EntryPoint {
            name: self.entry_name("", &format!("{}_Set", v.name)),
            params: vec![wire_ty],
            results: vec![],
            invoke: Box::new(move |args: &[Wire]| {
                if args.len() != 1 {
                    return Err(CallError::ArityMismatch { expected: 1, got: args.len() });
                }
                set(marshaler.decode(args[0], &set_ty, Mode::Retained)?);
                Ok(vec![])
            }),
        }));
    }

    fn bind_func(&mut self, f: &FuncDef) {
        let decl = format!("function {}", f.name);
        if !has_valid_arity(&f.sig) {
            self.errors.push(BindError::BadResultArity { decl });
            return;
        }
        if !is_sig_supported(&f.sig) {
            self.items.push(Item::Annotation(format!(
                "skipped function {} with unsupported parameter or result types",
                f.name
            )));
            return;
        }
        if let Err(err) = self.imports.touch_sig(&f.sig) {
            self.errors.push(err);
            return;
        }
        let Some(native) = self.bindings.func(&f.name).cloned() else {
            self.items.push(Item::Annotation(format!(
                "skipped function {} with no native binding",
                f.name
            )));
            return;
        };
        let emitted = self.forward_entry(
            &decl,
            self.entry_name("", &f.name),
            &f.sig,
            None,
            move |_, args| native(args),
        );
        if let Err(err) = emitted {
            self.errors.push(err);
        }
    }
}

//! End-to-end binding of a small package: a free function, a struct
//! with a field and a method, and an interface implemented on the
//! foreign side and invoked through its reverse proxy.

use std::sync::{Arc, Mutex};

use seam_bind::{Binder, Bindings, BoundModule, ForeignInvoker, Marshaler, Mode, ReferenceBridge};
use seam_core::package::{Field, FuncDef, InterfaceDef, Method, StructDef};
use seam_core::types::{Param, Signature, TypeDesc};
use seam_core::value::{BoundObject, CallError, Value};
use seam_core::wire::{RefHandle, Wire, WireBuf};

fn hello_package() -> seam_core::package::BoundPackage {
    let mut pkg = seam_core::package::BoundPackage::new("hello", "example/hello");
    pkg.funcs.push(FuncDef {
        name: "Greet".to_string(),
        sig: Signature::new(vec![Param::new("name", TypeDesc::Str)], vec![TypeDesc::Str]),
    });
    pkg.funcs.push(FuncDef {
        name: "Announce".to_string(),
        sig: Signature::new(
            vec![
                Param::new("g", TypeDesc::interface("example/hello", "Greeter")),
                Param::new("name", TypeDesc::Str),
            ],
            vec![TypeDesc::Str],
        ),
    });
    pkg.structs.push(StructDef {
        name: "Person".to_string(),
        fields: vec![Field::new("Name", TypeDesc::Str)],
        methods: vec![Method::new("Greeting", Signature::new(vec![], vec![TypeDesc::Str]))],
    });
    pkg.interfaces.push(InterfaceDef {
        name: "Greeter".to_string(),
        methods: vec![Method::new(
            "Greet",
            Signature::new(vec![Param::new("name", TypeDesc::Str)], vec![TypeDesc::Str]),
        )],
    });
    pkg
}

struct Person {
    name: Mutex<String>,
}

impl Person {
    fn new(name: &str) -> Self {
        Person { name: Mutex::new(name.to_string()) }
    }
}

impl BoundObject for Person {
    fn type_name(&self) -> &str {
        "example/hello.Person"
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        (name == "Name").then(|| Value::string(self.name.lock().unwrap().clone()))
    }

    fn set_field(&self, name: &str, value: Value) -> bool {
        if name == "Name" {
            if let Value::Str(s) = value {
                *self.name.lock().unwrap() = s;
                return true;
            }
        }
        false
    }

    fn call(&self, method: &str, _args: &[Value]) -> Result<Vec<Value>, CallError> {
        match method {
            "Greeting" => Ok(vec![Value::string(format!(
                "I am {}.",
                self.name.lock().unwrap()
            ))]),
            _ => Err(CallError::NoSuchMember {
                type_name: self.type_name().to_string(),
                member: method.to_string(),
            }),
        }
    }
}

fn hello_bindings() -> Bindings {
    let mut bindings = Bindings::new();
    bindings.bind_func("Greet", |args| {
        let Value::Str(name) = &args[0] else {
            return Err(CallError::Marshal("Greet expects a string".to_string()));
        };
        Ok(vec![Value::string(format!("Hello, {name}!"))])
    });
    bindings.bind_func("Announce", |args| {
        let Value::Ref(Some(greeter)) = &args[0] else {
            return Err(CallError::NullReceiver);
        };
        let mut rets = greeter.call("Greet", &args[1..])?;
        let Value::Str(greeting) = rets.remove(0) else {
            return Err(CallError::Marshal("Greet returned a non-string".to_string()));
        };
        Ok(vec![Value::string(format!("Announcing: {greeting}"))])
    });
    bindings
}

/// Foreign side holding one Greeter implementation behind handle 1.
struct SpanishSide;

impl ForeignInvoker for SpanishSide {
    fn invoke(
        &self,
        entry: &str,
        receiver: RefHandle,
        args: &[Wire],
    ) -> Result<Vec<Wire>, CallError> {
        assert_eq!(entry, "cproxyexample_hello_Greeter_Greet");
        assert_eq!(receiver, RefHandle::foreign(1));
        let Wire::Buf(buf) = args[0] else { panic!("expected a buffer argument") };
        let name = String::from_utf8(unsafe { buf.as_slice() }.to_vec()).unwrap();
        Ok(vec![Wire::Buf(WireBuf::from_slice(
            format!("Hola, {name}!").as_bytes(),
        ))])
    }
}

fn bind_hello() -> (BoundModule, Arc<ReferenceBridge>) {
    let pkg = hello_package();
    let bridge = ReferenceBridge::with_table(Arc::new(SpanishSide));
    let binder = Binder::new(
        &pkg,
        hello_bindings(),
        bridge.clone(),
        ["example/hello".to_string()],
    );
    let module = binder.bind().into_result().unwrap();
    (module, bridge)
}

/// Call `entry` with transient string arguments prepended by `lead`
/// wires, freeing the argument buffers afterwards, and decode the
/// single retained string result.
fn call_for_string(module: &BoundModule, entry: &str, lead: &[Wire], strings: &[&str]) -> String {
    let e = module.entry(entry).unwrap();
    let mut args: Vec<Wire> = lead.to_vec();
    let bufs: Vec<WireBuf> = strings.iter().map(|s| WireBuf::from_slice(s.as_bytes())).collect();
    args.extend(bufs.iter().map(|b| Wire::Buf(*b)));

    let rets = e.call(&args).unwrap();

    // Transient arguments stay with the caller; dispose of them now.
    for buf in bufs {
        unsafe { buf.free() };
    }

    let Wire::Buf(out) = rets[0] else { panic!("expected a buffer result") };
    String::from_utf8(unsafe { out.take_vec() }).unwrap()
}

#[test]
fn greet_round_trips_across_the_boundary() {
    let (module, _) = bind_hello();
    assert_eq!(
        call_for_string(&module, "proxyexample_hello__Greet", &[], &["Ada"]),
        "Hello, Ada!"
    );
}

#[test]
fn struct_field_and_method_work_through_handles() {
    let (module, bridge) = bind_hello();
    let marshaler = Marshaler::new(bridge);
    let person_ty = TypeDesc::ptr_to("example/hello", "Person");

    let person = Value::object(Arc::new(Person::new("Grace")));
    let handle = marshaler.encode(&person, &person_ty, Mode::Transient).unwrap();

    assert_eq!(
        call_for_string(&module, "proxyexample_hello_Person_Greeting", &[handle], &[]),
        "I am Grace."
    );

    // Mutate the field through the setter, observe through the getter.
    let setter = module.entry("proxyexample_hello_Person_Name_Set").unwrap();
    setter
        .call(&[handle, Wire::Buf(WireBuf::from_slice(b"Hopper"))])
        .unwrap();

    assert_eq!(
        call_for_string(&module, "proxyexample_hello_Person_Name_Get", &[handle], &[]),
        "Hopper"
    );
    assert_eq!(
        call_for_string(&module, "proxyexample_hello_Person_Greeting", &[handle], &[]),
        "I am Hopper."
    );
}

#[test]
fn null_receiver_is_a_call_fault() {
    let (module, _) = bind_hello();
    let entry = module.entry("proxyexample_hello_Person_Greeting").unwrap();
    let err = entry.call(&[Wire::Handle(RefHandle::NULL)]).unwrap_err();
    assert!(matches!(err, CallError::NullReceiver));
}

#[test]
fn foreign_greeter_is_called_through_its_reverse_proxy() {
    let (module, _) = bind_hello();
    // The foreign side passes its own Greeter (handle 1) to Announce;
    // the native body calls back out through the reverse proxy.
    assert_eq!(
        call_for_string(
            &module,
            "proxyexample_hello__Announce",
            &[Wire::Handle(RefHandle::foreign(1))],
            &["Ada"],
        ),
        "Announcing: Hola, Ada!"
    );
}

#[test]
fn native_greeter_survives_a_boundary_round_trip() {
    // A native object passed out and back in again dispatches directly,
    // without a proxy in between.
    let (module, bridge) = bind_hello();
    let marshaler = Marshaler::new(bridge);
    let greeter_ty = TypeDesc::interface("example/hello", "Greeter");

    struct Plain;
    impl BoundObject for Plain {
        fn type_name(&self) -> &str {
            "example/hello.Greeter"
        }
        fn call(&self, method: &str, args: &[Value]) -> Result<Vec<Value>, CallError> {
            assert_eq!(method, "Greet");
            let Value::Str(name) = &args[0] else { panic!("expected a string") };
            Ok(vec![Value::string(format!("Hi {name}"))])
        }
    }

    let greeter = Value::object(Arc::new(Plain));
    let handle = marshaler.encode(&greeter, &greeter_ty, Mode::Transient).unwrap();
    assert_eq!(
        call_for_string(&module, "proxyexample_hello__Announce", &[handle], &["Ada"]),
        "Announcing: Hi Ada"
    );
}

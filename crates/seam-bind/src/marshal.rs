//! Type-directed marshaling between native values and wire form.
//!
//! Conversions are directed entirely by the type descriptor, never by
//! inspecting the value: a mismatch between the two is a fault, not a
//! coercion. Buffer conversions carry a mode that tags which side owns
//! the boundary allocation after the crossing.

use std::sync::Arc;

use seam_core::types::{FloatPrecision, IntWidth, NamedForm, Signedness, TypeDesc};
use seam_core::value::Value;
use seam_core::wire::{Wire, WireBuf};

use crate::bridge::ReferenceBridge;
use crate::error::MarshalError;

/// Ownership of a buffer after it crosses the boundary.
///
/// Transient: the sending side keeps ownership and frees the buffer
/// after the call completes. Retained: the receiving side takes
/// ownership and the allocation survives the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Transient,
    Retained,
}

/// The value <-> wire codec for one bound package batch.
#[derive(Clone)]
pub struct Marshaler {
    bridge: Arc<ReferenceBridge>,
}

impl Marshaler {
    pub fn new(bridge: Arc<ReferenceBridge>) -> Self {
        Marshaler { bridge }
    }

    pub fn bridge(&self) -> &Arc<ReferenceBridge> {
        &self.bridge
    }

    /// Encode `value` as directed by `ty`.
    ///
    /// Buffer payloads are always copied into a fresh boundary
    /// allocation; `_mode` tags who disposes of it, which the caller
    /// enforces (Transient encodes are freed after the call returns,
    /// Retained encodes are handed over).
    pub fn encode(&self, value: &Value, ty: &TypeDesc, _mode: Mode) -> Result<Wire, MarshalError> {
        match ty {
            TypeDesc::Bool => match value {
                Value::Bool(b) => Ok(Wire::I8(*b as i8)),
                _ => Err(mismatch(ty)),
            },
            TypeDesc::Int { width, signedness } => encode_int(value, ty, *width, *signedness),
            TypeDesc::Float { precision } => match (precision, value) {
                (FloatPrecision::F32, Value::F32(v)) => Ok(Wire::F32(*v)),
                (FloatPrecision::F64, Value::F64(v)) => Ok(Wire::F64(*v)),
                _ => Err(mismatch(ty)),
            },
            TypeDesc::Str => match value {
                Value::Str(s) => Ok(Wire::Buf(WireBuf::from_slice(s.as_bytes()))),
                _ => Err(mismatch(ty)),
            },
            TypeDesc::Bytes => match value {
                Value::Bytes(b) => Ok(Wire::Buf(WireBuf::from_slice(b))),
                _ => Err(mismatch(ty)),
            },
            TypeDesc::Error => match value {
                Value::Err(Some(msg)) => Ok(Wire::Buf(WireBuf::from_slice(msg.as_bytes()))),
                Value::Err(None) => Ok(Wire::Buf(WireBuf::NULL)),
                _ => Err(mismatch(ty)),
            },
            TypeDesc::Ptr(_)
            | TypeDesc::Named {
                underlying: NamedForm::Interface | NamedForm::Pointer,
                ..
            } => match value {
                Value::Ref(obj) => Ok(Wire::Handle(self.bridge.to_handle(obj.as_ref()))),
                _ => Err(mismatch(ty)),
            },
            TypeDesc::Named { .. }
            | TypeDesc::Slice(_)
            | TypeDesc::Map { .. }
            | TypeDesc::Chan(_)
            | TypeDesc::Func(_)
            | TypeDesc::Struct(_) => Err(MarshalError::Unsupported { ty: ty.to_string() }),
        }
    }

    /// Decode `wire` as directed by `ty`.
    ///
    /// A Retained decode consumes the buffer allocation; a Transient
    /// decode copies the payload out and leaves the buffer with its
    /// owner.
    pub fn decode(&self, wire: Wire, ty: &TypeDesc, mode: Mode) -> Result<Value, MarshalError> {
        match ty {
            TypeDesc::Bool => match wire {
                Wire::I8(v) => Ok(Value::Bool(v != 0)),
                _ => Err(wire_mismatch(ty)),
            },
            TypeDesc::Int { width, signedness } => decode_int(wire, ty, *width, *signedness),
            TypeDesc::Float { precision } => match (precision, wire) {
                (FloatPrecision::F32, Wire::F32(v)) => Ok(Value::F32(v)),
                (FloatPrecision::F64, Wire::F64(v)) => Ok(Value::F64(v)),
                _ => Err(wire_mismatch(ty)),
            },
            TypeDesc::Str => {
                let bytes = take_buf(wire, ty, mode)?;
                Ok(Value::Str(String::from_utf8_lossy(&bytes).into_owned()))
            }
            TypeDesc::Bytes => Ok(Value::Bytes(take_buf(wire, ty, mode)?)),
            TypeDesc::Error => {
                let bytes = take_buf(wire, ty, mode)?;
                if bytes.is_empty() {
                    Ok(Value::Err(None))
                } else {
                    Ok(Value::Err(Some(String::from_utf8_lossy(&bytes).into_owned())))
                }
            }
            TypeDesc::Ptr(_)
            | TypeDesc::Named {
                underlying: NamedForm::Interface | NamedForm::Pointer,
                ..
            } => match wire {
                Wire::Handle(h) => self.bridge.from_handle(h, ty).map(Value::Ref),
                _ => Err(wire_mismatch(ty)),
            },
            TypeDesc::Named { .. }
            | TypeDesc::Slice(_)
            | TypeDesc::Map { .. }
            | TypeDesc::Chan(_)
            | TypeDesc::Func(_)
            | TypeDesc::Struct(_) => Err(MarshalError::Unsupported { ty: ty.to_string() }),
        }
    }
}

/// Free every buffer in `wires`.
///
/// For error paths that abandon a half-encoded argument or result
/// list: `WireBuf` has no destructor, so the caller that allocated the
/// buffers must dispose of them before propagating. The wires must be
/// owned by the caller and not used again.
pub fn free_bufs(wires: &[Wire]) {
    for wire in wires {
        if let Wire::Buf(buf) = wire {
            unsafe { buf.free() };
        }
    }
}

fn mismatch(ty: &TypeDesc) -> MarshalError {
    MarshalError::ValueMismatch { ty: ty.to_string() }
}

fn wire_mismatch(ty: &TypeDesc) -> MarshalError {
    MarshalError::WireMismatch { ty: ty.to_string() }
}

fn encode_int(
    value: &Value,
    ty: &TypeDesc,
    width: IntWidth,
    signedness: Signedness,
) -> Result<Wire, MarshalError> {
    use Signedness::{Signed, Unsigned};
    match (width, signedness, value) {
        (IntWidth::W8, Signed, Value::I8(v)) => Ok(Wire::I8(*v)),
        (IntWidth::W16, Signed, Value::I16(v)) => Ok(Wire::I16(*v)),
        (IntWidth::W32, Signed, Value::I32(v)) => Ok(Wire::I32(*v)),
        (IntWidth::W64, Signed, Value::I64(v)) => Ok(Wire::I64(*v)),
        (IntWidth::W8, Unsigned, Value::U8(v)) => Ok(Wire::U8(*v)),
        (IntWidth::W16, Unsigned, Value::U16(v)) => Ok(Wire::U16(*v)),
        (IntWidth::W32, Unsigned, Value::U32(v)) => Ok(Wire::U32(*v)),
        (IntWidth::W64, Unsigned, Value::U64(v)) => Ok(Wire::U64(*v)),
        _ => Err(mismatch(ty)),
    }
}

fn decode_int(
    wire: Wire,
    ty: &TypeDesc,
    width: IntWidth,
    signedness: Signedness,
) -> Result<Value, MarshalError> {
    use Signedness::{Signed, Unsigned};
    match (width, signedness, wire) {
        (IntWidth::W8, Signed, Wire::I8(v)) => Ok(Value::I8(v)),
        (IntWidth::W16, Signed, Wire::I16(v)) => Ok(Value::I16(v)),
        (IntWidth::W32, Signed, Wire::I32(v)) => Ok(Value::I32(v)),
        (IntWidth::W64, Signed, Wire::I64(v)) => Ok(Value::I64(v)),
        (IntWidth::W8, Unsigned, Wire::U8(v)) => Ok(Value::U8(v)),
        (IntWidth::W16, Unsigned, Wire::U16(v)) => Ok(Value::U16(v)),
        (IntWidth::W32, Unsigned, Wire::U32(v)) => Ok(Value::U32(v)),
        (IntWidth::W64, Unsigned, Wire::U64(v)) => Ok(Value::U64(v)),
        _ => Err(wire_mismatch(ty)),
    }
}

fn take_buf(wire: Wire, ty: &TypeDesc, mode: Mode) -> Result<Vec<u8>, MarshalError> {
    let Wire::Buf(buf) = wire else {
        return Err(wire_mismatch(ty));
    };
    match mode {
        // The crossing hands over the allocation; consume it.
        Mode::Retained => Ok(unsafe { buf.take_vec() }),
        // The buffer stays with the sender; copy the payload out.
        Mode::Transient => Ok(unsafe { buf.as_slice() }.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::NoForeignSide;
    use seam_core::value::{BoundObject, ObjRef};
    use seam_core::wire::RefHandle;

    fn marshaler() -> Marshaler {
        Marshaler::new(ReferenceBridge::with_table(Arc::new(NoForeignSide)))
    }

    fn round_trip(m: &Marshaler, value: Value, ty: &TypeDesc, mode: Mode) -> Value {
        let wire = m.encode(&value, ty, mode).unwrap();
        m.decode(wire, ty, Mode::Retained).unwrap()
    }

    #[test]
    fn scalar_round_trips_preserve_value() {
        let m = marshaler();
        let cases = vec![
            (Value::Bool(true), TypeDesc::Bool),
            (Value::Bool(false), TypeDesc::Bool),
            (Value::I8(-5), TypeDesc::i8()),
            (Value::I16(-300), TypeDesc::i16()),
            (Value::I32(i32::MIN), TypeDesc::i32()),
            (Value::I64(i64::MAX), TypeDesc::i64()),
            (Value::U8(255), TypeDesc::u8()),
            (Value::U16(65535), TypeDesc::u16()),
            (Value::U32(u32::MAX), TypeDesc::u32()),
            (Value::U64(u64::MAX), TypeDesc::u64()),
            (Value::F32(1.5), TypeDesc::f32()),
            (Value::F64(-2.25), TypeDesc::f64()),
        ];
        for (value, ty) in cases {
            assert_eq!(round_trip(&m, value.clone(), &ty, Mode::Transient), value);
            assert_eq!(round_trip(&m, value.clone(), &ty, Mode::Retained), value);
        }
    }

    #[test]
    fn retained_string_preserves_length_and_content() {
        let m = marshaler();
        let s = Value::string("Hello, Ada! \u{2603}");
        assert_eq!(round_trip(&m, s.clone(), &TypeDesc::Str, Mode::Retained), s);
    }

    #[test]
    fn retained_bytes_preserve_length_and_content() {
        let m = marshaler();
        let b = Value::Bytes(vec![0, 1, 2, 254, 255]);
        assert_eq!(round_trip(&m, b.clone(), &TypeDesc::Bytes, Mode::Retained), b);
    }

    #[test]
    fn transient_decode_leaves_the_buffer_with_its_owner() {
        let m = marshaler();
        let wire = m
            .encode(&Value::string("keep"), &TypeDesc::Str, Mode::Transient)
            .unwrap();
        let first = m.decode(wire, &TypeDesc::Str, Mode::Transient).unwrap();
        // The buffer is still live; the owner can read it again and
        // must free it explicitly.
        let second = m.decode(wire, &TypeDesc::Str, Mode::Transient).unwrap();
        assert_eq!(first, Value::string("keep"));
        assert_eq!(first, second);
        if let Wire::Buf(buf) = wire {
            unsafe { buf.free() };
        }
    }

    #[test]
    fn empty_string_crosses_as_null_buffer() {
        let m = marshaler();
        let wire = m
            .encode(&Value::string(""), &TypeDesc::Str, Mode::Retained)
            .unwrap();
        let Wire::Buf(buf) = wire else { panic!("expected buffer") };
        assert!(buf.is_null());
        assert_eq!(
            m.decode(wire, &TypeDesc::Str, Mode::Retained).unwrap(),
            Value::string("")
        );
    }

    #[test]
    fn error_values_round_trip() {
        let m = marshaler();
        let some = Value::Err(Some("boom".to_string()));
        assert_eq!(round_trip(&m, some.clone(), &TypeDesc::Error, Mode::Retained), some);
        // The nil error is the null buffer both ways.
        let wire = m.encode(&Value::nil_err(), &TypeDesc::Error, Mode::Retained).unwrap();
        let Wire::Buf(buf) = wire else { panic!("expected buffer") };
        assert!(buf.is_null());
        assert_eq!(
            m.decode(wire, &TypeDesc::Error, Mode::Retained).unwrap(),
            Value::nil_err()
        );
    }

    struct Plain;

    impl BoundObject for Plain {
        fn type_name(&self) -> &str {
            "p.Plain"
        }
    }

    #[test]
    fn nil_reference_crosses_as_null_handle() {
        let m = marshaler();
        let ty = TypeDesc::ptr_to("p", "Plain");
        let wire = m.encode(&Value::nil_ref(), &ty, Mode::Transient).unwrap();
        let Wire::Handle(h) = wire else { panic!("expected handle") };
        assert!(h.is_null());
        assert_eq!(m.decode(wire, &ty, Mode::Transient).unwrap(), Value::nil_ref());
    }

    #[test]
    fn reference_round_trip_is_identity_stable() {
        let m = marshaler();
        let ty = TypeDesc::ptr_to("p", "Plain");
        let obj: ObjRef = Arc::new(Plain);
        let v = Value::object(obj);
        let w1 = m.encode(&v, &ty, Mode::Transient).unwrap();
        let w2 = m.encode(&v, &ty, Mode::Transient).unwrap();
        let (Wire::Handle(h1), Wire::Handle(h2)) = (w1, w2) else {
            panic!("expected handles")
        };
        assert_eq!(h1, h2);
        assert_eq!(m.decode(w1, &ty, Mode::Transient).unwrap(), v);
    }

    #[test]
    fn type_directs_the_conversion() {
        let m = marshaler();
        // Value disagreeing with the directing type.
        assert!(matches!(
            m.encode(&Value::I32(1), &TypeDesc::i64(), Mode::Transient),
            Err(MarshalError::ValueMismatch { .. })
        ));
        assert!(matches!(
            m.encode(&Value::string("x"), &TypeDesc::Bytes, Mode::Transient),
            Err(MarshalError::ValueMismatch { .. })
        ));
        // Wire form disagreeing with the directing type.
        assert!(matches!(
            m.decode(Wire::I32(1), &TypeDesc::Str, Mode::Transient),
            Err(MarshalError::WireMismatch { .. })
        ));
        assert!(matches!(
            m.decode(Wire::Handle(RefHandle::NULL), &TypeDesc::Bool, Mode::Transient),
            Err(MarshalError::WireMismatch { .. })
        ));
    }

    #[test]
    fn unsupported_types_never_marshal() {
        let m = marshaler();
        let slice = TypeDesc::Slice(Box::new(TypeDesc::i32()));
        assert!(matches!(
            m.encode(&Value::I32(1), &slice, Mode::Transient),
            Err(MarshalError::Unsupported { .. })
        ));
        assert!(matches!(
            m.decode(Wire::I32(1), &slice, Mode::Transient),
            Err(MarshalError::Unsupported { .. })
        ));
    }

    #[test]
    fn named_types_marshal_only_with_reference_underlyings() {
        let m = marshaler();
        for underlying in [NamedForm::Basic, NamedForm::Struct] {
            let ty = TypeDesc::Named {
                name: seam_core::types::TypeName::new("p", "Weekday"),
                underlying,
            };
            assert!(matches!(
                m.encode(&Value::nil_ref(), &ty, Mode::Transient),
                Err(MarshalError::Unsupported { .. })
            ));
            assert!(matches!(
                m.decode(Wire::Handle(RefHandle::NULL), &ty, Mode::Transient),
                Err(MarshalError::Unsupported { .. })
            ));
        }
        let named_ptr = TypeDesc::Named {
            name: seam_core::types::TypeName::new("p", "Handle"),
            underlying: NamedForm::Pointer,
        };
        assert!(m.encode(&Value::nil_ref(), &named_ptr, Mode::Transient).is_ok());
    }

    #[test]
    fn free_bufs_skips_non_buffers() {
        let wires = vec![
            Wire::I32(1),
            Wire::Buf(WireBuf::from_slice(b"gone")),
            Wire::Handle(RefHandle::NULL),
            Wire::Buf(WireBuf::NULL),
        ];
        // Releases the one live allocation; everything else is a no-op.
        free_bufs(&wires);
    }
}

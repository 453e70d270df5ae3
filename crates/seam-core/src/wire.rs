//! Wire representations for boundary crossings.
//!
//! Everything that crosses the boundary is one of: a fixed-width
//! integer or float, a (pointer, length) buffer, or a reference
//! handle. Buffers carry no destructor; allocation and disposal are
//! explicit, exactly as they would be on a C boundary, so ownership
//! transfer is visible at every call site.

use serde::{Deserialize, Serialize};

/// The wire-level type of an entry point parameter or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// (pointer, length) buffer carrying string or byte payloads.
    Buf,
    /// Reference handle standing in for a live object.
    Handle,
}

/// An explicit boundary allocation: a (pointer, length) pair.
///
/// Created by [`WireBuf::from_slice`], read by [`WireBuf::as_slice`],
/// consumed by [`WireBuf::take_vec`], or discarded by [`WireBuf::free`].
/// There is no `Drop`; whichever side owns the buffer must dispose of
/// it exactly once.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WireBuf {
    pub ptr: *mut u8,
    pub len: i64,
}

impl WireBuf {
    /// The null buffer, denoting an absent or empty payload.
    pub const NULL: WireBuf = WireBuf {
        ptr: std::ptr::null_mut(),
        len: 0,
    };

    /// Allocate a boundary copy of `data`. Empty input yields the
    /// null buffer, which needs no disposal.
    pub fn from_slice(data: &[u8]) -> Self {
        if data.is_empty() {
            return WireBuf::NULL;
        }
        let boxed: Box<[u8]> = data.into();
        let len = boxed.len() as i64;
        let ptr = Box::into_raw(boxed) as *mut u8;
        WireBuf { ptr, len }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null() || self.len <= 0
    }

    /// View the buffer contents.
    ///
    /// # Safety
    /// The buffer must still be live: not yet freed or taken, and if
    /// it aliases foreign memory, that memory must outlive the view.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.is_null() {
            &[]
        } else {
            std::slice::from_raw_parts(self.ptr, self.len as usize)
        }
    }

    /// Take ownership of the allocation, ending the buffer's life.
    ///
    /// # Safety
    /// The buffer must have been produced by [`WireBuf::from_slice`]
    /// and not yet freed or taken; no copies of it may be used again.
    pub unsafe fn take_vec(self) -> Vec<u8> {
        if self.is_null() {
            return Vec::new();
        }
        let raw = std::ptr::slice_from_raw_parts_mut(self.ptr, self.len as usize);
        Box::from_raw(raw).into_vec()
    }

    /// Release the allocation without reading it.
    ///
    /// # Safety
    /// Same contract as [`WireBuf::take_vec`].
    pub unsafe fn free(self) {
        if !self.is_null() {
            let raw = std::ptr::slice_from_raw_parts_mut(self.ptr, self.len as usize);
            drop(Box::from_raw(raw));
        }
    }
}

/// Which side of the boundary owns the object behind a handle.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefOwner {
    Native = 1,
    Foreign = 2,
}

impl RefOwner {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(RefOwner::Native),
            2 => Some(RefOwner::Foreign),
            _ => None,
        }
    }
}

/// A reference handle: an explicit {ownership tag, slot index} pair.
///
/// Slot 0 is never allocated; the all-zero handle denotes absence and
/// decodes to nil in both directions. The ownership tag is carried
/// explicitly rather than packed into a sign convention.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefHandle {
    pub owner: u32,
    pub slot: u32,
}

impl RefHandle {
    /// The null handle.
    pub const NULL: RefHandle = RefHandle { owner: 0, slot: 0 };

    pub fn native(slot: u32) -> Self {
        RefHandle { owner: RefOwner::Native as u32, slot }
    }

    pub fn foreign(slot: u32) -> Self {
        RefHandle { owner: RefOwner::Foreign as u32, slot }
    }

    pub fn is_null(&self) -> bool {
        self.slot == 0
    }

    pub fn owner(&self) -> Option<RefOwner> {
        RefOwner::from_tag(self.owner)
    }
}

/// A value in wire form.
#[derive(Debug, Clone, Copy)]
pub enum Wire {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Buf(WireBuf),
    Handle(RefHandle),
}

impl Wire {
    pub fn wire_type(&self) -> WireType {
        match self {
            Wire::I8(_) => WireType::I8,
            Wire::I16(_) => WireType::I16,
            Wire::I32(_) => WireType::I32,
            Wire::I64(_) => WireType::I64,
            Wire::U8(_) => WireType::U8,
            Wire::U16(_) => WireType::U16,
            Wire::U32(_) => WireType::U32,
            Wire::U64(_) => WireType::U64,
            Wire::F32(_) => WireType::F32,
            Wire::F64(_) => WireType::F64,
            Wire::Buf(_) => WireType::Buf,
            Wire::Handle(_) => WireType::Handle,
        }
    }
}

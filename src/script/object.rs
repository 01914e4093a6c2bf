//! Opaque handles to bound native structs.

use std::{any::Any, fmt, rc::Rc};

use crate::script::binding::BindingRegistry;

struct NativeInner {
    type_name: &'static str,
    data: Rc<dyn Any>,
    owned: bool,
}

impl Drop for NativeInner {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        if let Some(deinit) = BindingRegistry::global().deinit_of(self.type_name) {
            deinit(self.data.as_ref());
        }
    }
}

/// Reference-counted handle to a native struct exposed through the binding
/// registry.
///
/// Cloning shares the same underlying struct. An *owned* handle runs the
/// type's deinit hook (if its binding declares one) when the last clone
/// drops; a *borrowed* handle wraps data owned elsewhere and never runs it.
#[derive(Clone)]
pub struct NativeObject {
    inner: Rc<NativeInner>,
}

impl NativeObject {
    /// Wraps `data` as an owned object of the named bound type.
    pub fn owned<T: 'static>(type_name: &'static str, data: T) -> Self {
        Self {
            inner: Rc::new(NativeInner {
                type_name,
                data: Rc::new(data),
                owned: true,
            }),
        }
    }

    /// Wraps shared `data` as a borrowed object of the named bound type.
    ///
    /// The data must outlive every observer; no deinit hook runs on release.
    pub fn borrowed<T: 'static>(type_name: &'static str, data: Rc<T>) -> Self {
        Self {
            inner: Rc::new(NativeInner {
                type_name,
                data,
                owned: false,
            }),
        }
    }

    /// Name of the bound type this handle was created as.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    /// Downcasts the underlying struct.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.data.downcast_ref::<T>()
    }

    /// Returns `true` when both handles refer to the same underlying struct.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeObject({})", self.inner.type_name)
    }
}

impl PartialEq for NativeObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

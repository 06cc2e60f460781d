//! Sequentially consistent atomic wrappers.
//!
//! Every type here exposes the same small contract: `read`, `exchange`, and
//! `compare_exchange(expected, new)` returning the previous value, with
//! integer types adding `add`/`and`/`or`. All operations use `SeqCst`;
//! mutations are immediately visible to every thread.
//!
//! ## Retry loops
//!
//! `and`/`or` and the float `add` are read–compute–CAS retry loops rather
//! than single hardware instructions. No native atomic bitwise or float
//! operation is assumed for any width. The loops never allocate and never
//! block; under contention they spin until the CAS lands.

use std::ptr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicPtr, AtomicU32, AtomicU64, Ordering};

const ORDER: Ordering = Ordering::SeqCst;

macro_rules! atomic_integer {
    ($(#[$meta:meta])* $name:ident, $int:ty, $std:ty) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $name {
            inner: $std,
        }

        impl $name {
            pub const fn new(value: $int) -> Self {
                Self { inner: <$std>::new(value) }
            }

            pub fn read(&self) -> $int {
                self.inner.load(ORDER)
            }

            /// Stores `value` and returns the previous value.
            pub fn exchange(&self, value: $int) -> $int {
                self.inner.swap(value, ORDER)
            }

            /// Stores `new` iff the current value equals `expected`.
            /// Returns the previous value either way.
            pub fn compare_exchange(&self, expected: $int, new: $int) -> $int {
                match self.inner.compare_exchange(expected, new, ORDER, ORDER) {
                    Ok(prev) => prev,
                    Err(prev) => prev,
                }
            }

            /// Adds `delta` (wrapping) and returns the previous value.
            pub fn add(&self, delta: $int) -> $int {
                self.inner.fetch_add(delta, ORDER)
            }

            /// Bitwise-ands `mask` into the value via a CAS retry loop.
            /// Returns the previous value.
            pub fn and(&self, mask: $int) -> $int {
                loop {
                    let current = self.inner.load(ORDER);
                    let candidate = current & mask;
                    if self
                        .inner
                        .compare_exchange(current, candidate, ORDER, ORDER)
                        .is_ok()
                    {
                        return current;
                    }
                }
            }

            /// Bitwise-ors `mask` into the value via a CAS retry loop.
            /// Returns the previous value.
            pub fn or(&self, mask: $int) -> $int {
                loop {
                    let current = self.inner.load(ORDER);
                    let candidate = current | mask;
                    if self
                        .inner
                        .compare_exchange(current, candidate, ORDER, ORDER)
                        .is_ok()
                    {
                        return current;
                    }
                }
            }
        }
    };
}

atomic_integer!(
    /// 32-bit signed integer with sequentially consistent operations.
    AtomicInteger, i32, AtomicI32
);
atomic_integer!(
    /// 64-bit signed integer with sequentially consistent operations.
    AtomicLong, i64, AtomicI64
);

macro_rules! atomic_float {
    ($(#[$meta:meta])* $name:ident, $float:ty, $bits:ty, $std:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            bits: $std,
        }

        impl $name {
            pub fn new(value: $float) -> Self {
                Self { bits: <$std>::new(value.to_bits()) }
            }

            pub fn read(&self) -> $float {
                <$float>::from_bits(self.bits.load(ORDER))
            }

            /// Stores `value` and returns the previous value.
            pub fn exchange(&self, value: $float) -> $float {
                <$float>::from_bits(self.bits.swap(value.to_bits(), ORDER))
            }

            /// Stores `new` iff the current *bit pattern* equals
            /// `expected.to_bits()`. Returns the previous value either way.
            /// Comparison is bit identity, not float equality: NaN payloads
            /// and signed zeroes are distinguished.
            pub fn compare_exchange(&self, expected: $float, new: $float) -> $float {
                let prev = match self.bits.compare_exchange(
                    expected.to_bits(),
                    new.to_bits(),
                    ORDER,
                    ORDER,
                ) {
                    Ok(prev) => prev,
                    Err(prev) => prev,
                };
                <$float>::from_bits(prev)
            }

            /// Adds `delta` via a CAS retry loop over the integer bit
            /// pattern and returns the previous value.
            ///
            /// This is NOT an atomic float addition at the hardware level:
            /// each attempt reads the bits, computes the sum, and publishes
            /// it with an integer CAS, retrying on interference.
            pub fn add(&self, delta: $float) -> $float {
                loop {
                    let current_bits = self.bits.load(ORDER);
                    let current = <$float>::from_bits(current_bits);
                    let candidate = (current + delta).to_bits();
                    if self
                        .bits
                        .compare_exchange(current_bits, candidate, ORDER, ORDER)
                        .is_ok()
                    {
                        return current;
                    }
                }
            }
        }
    };
}

atomic_float!(
    /// 32-bit float; delegates to a `u32` CAS on the bit pattern.
    AtomicFloat, f32, u32, AtomicU32
);
atomic_float!(
    /// 64-bit float; delegates to a `u64` CAS on the bit pattern.
    AtomicDouble, f64, u64, AtomicU64
);

/// Boolean with sequentially consistent operations.
#[derive(Debug, Default)]
pub struct AtomicBoolean {
    inner: AtomicBool,
}

impl AtomicBoolean {
    pub const fn new(value: bool) -> Self {
        Self { inner: AtomicBool::new(value) }
    }

    pub fn read(&self) -> bool {
        self.inner.load(ORDER)
    }

    /// Stores `value` and returns the previous value.
    pub fn exchange(&self, value: bool) -> bool {
        self.inner.swap(value, ORDER)
    }

    /// Stores `new` iff the current value equals `expected`.
    /// Returns the previous value either way.
    pub fn compare_exchange(&self, expected: bool, new: bool) -> bool {
        match self.inner.compare_exchange(expected, new, ORDER, ORDER) {
            Ok(prev) => prev,
            Err(prev) => prev,
        }
    }
}

/// Lock-free swappable reference.
///
/// `read`/`exchange`/`compare_exchange` are single pointer-width atomic
/// operations; `compare_exchange` compares by address identity, like a
/// reference CAS in a garbage-collected runtime.
///
/// Replaced values are retired rather than freed so that `read` may hand out
/// plain `&T` borrows without hazard tracking: every value ever stored stays
/// alive until the wrapper itself drops. Memory therefore grows with the
/// number of exchanges, which is acceptable for slots whose referent changes
/// rarely (wiring, configuration). The retirement list uses a `Mutex`, but
/// only on the write path after the atomic swap has already published.
pub struct AtomicReference<T> {
    ptr: AtomicPtr<T>,
    retired: Mutex<Vec<*mut T>>,
}

unsafe impl<T: Send + Sync> Send for AtomicReference<T> {}
unsafe impl<T: Send + Sync> Sync for AtomicReference<T> {}

impl<T> AtomicReference<T> {
    pub fn new(value: Option<T>) -> Self {
        let ptr = match value {
            Some(value) => Box::into_raw(Box::new(value)),
            None => ptr::null_mut(),
        };
        Self { ptr: AtomicPtr::new(ptr), retired: Mutex::new(Vec::new()) }
    }

    pub fn read(&self) -> Option<&T> {
        let ptr = self.ptr.load(ORDER);
        // Retired pointers outlive every borrow of `self`, so dereferencing
        // a previously-published pointer is sound until Drop.
        unsafe { ptr.as_ref() }
    }

    /// Stores `value` and returns the previous referent.
    pub fn exchange(&self, value: Option<T>) -> Option<&T> {
        let new = Self::into_ptr(value);
        let prev = self.ptr.swap(new, ORDER);
        self.retire(prev)
    }

    /// Stores `value` iff the current referent is the same allocation as
    /// `expected` (address identity). Returns `Ok(previous)` on success and
    /// `Err(current)` on failure.
    pub fn compare_exchange(
        &self,
        expected: Option<&T>,
        value: Option<T>,
    ) -> Result<Option<&T>, Option<&T>> {
        let expected_ptr = expected
            .map(|r| r as *const T as *mut T)
            .unwrap_or(ptr::null_mut());
        let new = Self::into_ptr(value);
        match self.ptr.compare_exchange(expected_ptr, new, ORDER, ORDER) {
            Ok(prev) => Ok(self.retire(prev)),
            Err(current) => {
                // `new` was never published; reclaim it immediately.
                if !new.is_null() {
                    drop(unsafe { Box::from_raw(new) });
                }
                Err(unsafe { current.as_ref() })
            }
        }
    }

    fn into_ptr(value: Option<T>) -> *mut T {
        match value {
            Some(value) => Box::into_raw(Box::new(value)),
            None => ptr::null_mut(),
        }
    }

    fn retire(&self, prev: *mut T) -> Option<&T> {
        if prev.is_null() {
            return None;
        }
        self.retired.lock().expect("retired list poisoned").push(prev);
        Some(unsafe { &*prev })
    }
}

impl<T> Drop for AtomicReference<T> {
    fn drop(&mut self) {
        let current = *self.ptr.get_mut();
        if !current.is_null() {
            drop(unsafe { Box::from_raw(current) });
        }
        for ptr in self.retired.get_mut().expect("retired list poisoned").drain(..) {
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for AtomicReference<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AtomicReference").field(&self.read()).finish()
    }
}

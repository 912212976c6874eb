//! C ABI over `RngArray`, for hosts that need the same random stream as the
//! instance generator.

use crate::read_seeds;
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    ptr,
};
use tig_challenges::RngArray;

/// # Safety
///
/// `seeds` must point to 8 readable `u64`s. The returned handle must be freed
/// with `rng_array_native_free`.
#[no_mangle]
pub unsafe extern "C" fn rng_array_native_new(seeds: *const u64) -> *mut RngArray {
    match read_seeds(seeds) {
        Some(seeds) => Box::into_raw(Box::new(RngArray::new(seeds))),
        None => ptr::null_mut(),
    }
}

/// Samples from `[low, high)`. Returns 0.0 for a null handle and `low` for an
/// empty range.
///
/// # Safety
///
/// `rng` must be null or a live handle from `rng_array_native_new`.
#[no_mangle]
pub unsafe extern "C" fn rng_array_native_sample_uniform32(
    rng: *mut RngArray,
    low: f32,
    high: f32,
) -> f32 {
    let Some(rng) = rng.as_mut() else {
        return 0.0;
    };
    if !(low < high) {
        return low;
    }
    catch_unwind(AssertUnwindSafe(|| rng.sample_uniform(low, high))).unwrap_or(low)
}

/// `f64` counterpart of `rng_array_native_sample_uniform32`.
///
/// # Safety
///
/// `rng` must be null or a live handle from `rng_array_native_new`.
#[no_mangle]
pub unsafe extern "C" fn rng_array_native_sample_uniform64(
    rng: *mut RngArray,
    low: f64,
    high: f64,
) -> f64 {
    let Some(rng) = rng.as_mut() else {
        return 0.0;
    };
    if !(low < high) {
        return low;
    }
    catch_unwind(AssertUnwindSafe(|| rng.sample_uniform(low, high))).unwrap_or(low)
}

/// # Safety
///
/// `rng` must be null or a handle from `rng_array_native_new` that has not
/// been freed.
#[no_mangle]
pub unsafe extern "C" fn rng_array_native_free(rng: *mut RngArray) {
    if !rng.is_null() {
        drop(Box::from_raw(rng));
    }
}

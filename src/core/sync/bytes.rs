/*!
 * Raw Value Comparison
 *
 * Reads the watched bytes with atomic loads so that concurrent atomic writers
 * never race a plain read. Naturally aligned 1/2/4/8-byte values are loaded in
 * one access; anything else is read byte by byte followed by an acquire fence.
 */

use std::sync::atomic::{fence, AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

#[inline]
fn is_aligned(addr: *const (), align: usize) -> bool {
    (addr as usize) & (align - 1) == 0
}

/// Whether the bytes at `addr` currently equal `comparand`
///
/// # Safety
///
/// `addr` must be valid for reads of `comparand.len()` bytes for the duration
/// of the call, and concurrent writers must use atomic stores.
#[inline]
pub unsafe fn equals(addr: *const (), comparand: &[u8]) -> bool {
    let size = comparand.len();
    debug_assert!(size > 0, "waiting on a zero-sized value");

    match size {
        1 => (*(addr as *const AtomicU8)).load(Ordering::Acquire) == comparand[0],
        2 if is_aligned(addr, 2) => {
            let expected = u16::from_ne_bytes([comparand[0], comparand[1]]);
            (*(addr as *const AtomicU16)).load(Ordering::Acquire) == expected
        }
        4 if is_aligned(addr, 4) => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(comparand);
            (*(addr as *const AtomicU32)).load(Ordering::Acquire) == u32::from_ne_bytes(raw)
        }
        8 if is_aligned(addr, 8) => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(comparand);
            (*(addr as *const AtomicU64)).load(Ordering::Acquire) == u64::from_ne_bytes(raw)
        }
        _ => equals_bytewise(addr as *const AtomicU8, comparand),
    }
}

unsafe fn equals_bytewise(base: *const AtomicU8, comparand: &[u8]) -> bool {
    let equal = comparand
        .iter()
        .enumerate()
        .all(|(i, &expected)| (*base.add(i)).load(Ordering::Relaxed) == expected);
    fence(Ordering::Acquire);
    equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_widths() {
        let word = AtomicU32::new(0xdead_beef);
        let addr = &word as *const AtomicU32 as *const ();
        unsafe {
            assert!(equals(addr, &0xdead_beef_u32.to_ne_bytes()));
            assert!(!equals(addr, &0u32.to_ne_bytes()));
        }

        let wide = AtomicU64::new(7);
        let addr = &wide as *const AtomicU64 as *const ();
        unsafe {
            assert!(equals(addr, &7u64.to_ne_bytes()));
            assert!(!equals(addr, &8u64.to_ne_bytes()));
        }
    }

    #[test]
    fn test_odd_sized_region() {
        let region: [AtomicU8; 3] = [AtomicU8::new(1), AtomicU8::new(2), AtomicU8::new(3)];
        let addr = region.as_ptr() as *const ();
        unsafe {
            assert!(equals(addr, &[1, 2, 3]));
            assert!(!equals(addr, &[1, 2, 4]));
        }
        region[0].store(9, Ordering::Release);
        unsafe {
            assert!(equals(addr, &[9, 2, 3]));
        }
    }

    #[test]
    fn test_unaligned_word_falls_back_to_bytes() {
        let region: [AtomicU8; 8] = Default::default();
        for (i, byte) in 5u32.to_ne_bytes().iter().enumerate() {
            region[i + 1].store(*byte, Ordering::Relaxed);
        }
        let addr = unsafe { region.as_ptr().add(1) } as *const ();
        unsafe {
            assert!(equals(addr, &5u32.to_ne_bytes()));
        }
    }
}

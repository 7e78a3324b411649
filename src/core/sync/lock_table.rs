/*!
 * Striped Lock Table
 *
 * A fixed set of cache-line-aligned mutexes selected by address. Gives
 * lock-based emulation of wide atomics a lock per object without storing one
 * in the object.
 */

use crate::core::limits::LOCK_TABLE_STRIPES;
use parking_lot::Mutex;

#[repr(C, align(64))]
struct Stripe(Mutex<()>);

#[allow(clippy::declare_interior_mutable_const)]
const UNLOCKED: Stripe = Stripe(Mutex::new(()));

static STRIPES: [Stripe; LOCK_TABLE_STRIPES] = [UNLOCKED; LOCK_TABLE_STRIPES];

#[inline]
fn stripe_index(addr: usize) -> usize {
    // Drop the low bits shared by neighbouring objects, then fold the rest in
    let folded = (addr >> 4) ^ (addr >> 12) ^ (addr >> 20);
    folded & (LOCK_TABLE_STRIPES - 1)
}

/// Mutex guarding the object at `addr`
///
/// The same address always maps to the same mutex. Distinct addresses may
/// share one, so holders must not take a second stripe while holding one.
#[inline]
pub fn striped_lock(addr: *const ()) -> &'static Mutex<()> {
    &STRIPES[stripe_index(addr as usize)].0
}

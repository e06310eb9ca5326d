/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains common functions and macros to implement wait routines.

--*/

/// Number of status polls before an engine is declared stuck
pub const MAX_SPIN_COUNT: u32 = 1_000_000;

/// Busy-wait until `predicate` holds.
///
/// # Returns
///
/// * `false` if the predicate did not hold within [`MAX_SPIN_COUNT`] polls
pub fn until<F>(mut predicate: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..MAX_SPIN_COUNT {
        if predicate() {
            return true;
        }
        core::hint::spin_loop();
    }
    false
}

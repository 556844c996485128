//! Stack growth for the recursive parser and executor.
//!
//! Every step of the tree walk (`evaluate`, `execute`) and every nested call
//! argument in the parser runs through `ensure_sufficient_stack`. `stacker`
//! grows the stack on demand so the interpreter's own depth and nesting
//! limits are what stop a program, never the host stack.

/// Minimum stack space to keep available (128KB red zone).
const RED_ZONE: usize = 128 * 1024;

/// Stack space to allocate when growing (2MB).
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

//! Stack safety for the recursive passes.
//!
//! Resolution and evaluation recurse on the host stack once per AST level,
//! and evaluation several more times per Lox call.  [`ensure_sufficient_stack`] grows the stack on demand
//! so that the interpreter's own call-depth limit, not the host stack size,
//! decides when a deep recursion fails.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

//! Collision-free name allocation
//!
//! Produces `<base><int>` names that are unused in a containing directory.
//! Allocation is not atomic on its own; stores hold the containing directory's
//! lock across allocation and creation.

use crate::path::ContentRoot;
use std::path::Path;

/// Allocate the first `<base><i>` (i = 0, 1, ...) with no entry at its location.
pub fn allocate<F>(root: &ContentRoot, base: &str, containing_path: &str, occupied: F) -> String
where
    F: Fn(&Path) -> bool,
{
    allocate_with_suffix(root, base, "", containing_path, occupied)
}

/// Allocate the first `<base><i><suffix>` with no entry at its location.
///
/// Terminates as long as the containing directory holds finitely many entries.
pub fn allocate_with_suffix<F>(
    root: &ContentRoot,
    base: &str,
    suffix: &str,
    containing_path: &str,
    occupied: F,
) -> String
where
    F: Fn(&Path) -> bool,
{
    let mut index: u64 = 0;
    loop {
        let candidate = format!("{}{}{}", base, index, suffix);
        if !occupied(&root.resolve(Some(&candidate), containing_path)) {
            return candidate;
        }
        index += 1;
    }
}

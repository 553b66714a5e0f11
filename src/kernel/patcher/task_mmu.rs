//! `CONFIG_KSU_SUSFS_SUS_MAP` guard for `pagemap_read()` in `fs/proc/task_mmu.c`.
//!
//! The stock SUSFS hunk anchors on the old `up_read(&mm->mmap_sem)` API and
//! silently skips on 5.10+ kernels that use `mmap_read_unlock(mm)`, leaving
//! `BIT_SUS_MAPS` unguarded. The block is injected between the unlock and the
//! `start_vaddr = end;` of the walk loop.

use super::{Fix, FixAction};
use crate::models::FixOutcome;

pub const GUARD_BLOCK: &str = concat!(
    "#ifdef CONFIG_KSU_SUSFS_SUS_MAP\n",
    "\t\tvma = find_vma(mm, start_vaddr);\n",
    "\t\tif (vma && vma->vm_file) {\n",
    "\t\t\tstruct inode *inode = file_inode(vma->vm_file);\n",
    "\t\t\tif (unlikely(inode->i_state & BIT_SUS_MAPS) && susfs_is_current_proc_umounted()) {\n",
    "\t\t\t\tpm.show_pfn = false;\n",
    "\t\t\t\tpm.buffer->pme = 0;\n",
    "\t\t\t}\n",
    "\t\t}\n",
    "#endif\n",
);

/// Walk-loop tail on kernels with `mmap_read_lock_killable()`.
pub const ANCHOR_MODERN: &str = "\t\tmmap_read_unlock(mm);\n\t\tstart_vaddr = end;";
/// Walk-loop tail on kernels still using `mmap_sem`.
pub const ANCHOR_LEGACY: &str = "\t\tup_read(&mm->mmap_sem);\n\t\tstart_vaddr = end;";

const PAGEMAP_READ_DEF: &str = "static ssize_t pagemap_read(";
const GUARD_SIGNATURE: &str = "find_vma(mm, start_vaddr)";
const GUARD_FLAG: &str = "BIT_SUS_MAPS";

pub fn fixes() -> Vec<Fix> {
    vec![Fix::required(
        "inject BIT_SUS_MAPS guard block into pagemap_read()",
        FixAction::Custom(inject_pagemap_guard),
    )]
}

/// Offset and text of the `pagemap_read()` body, which runs up to the next
/// top-level static definition.
fn pagemap_read_body(src: &str) -> Option<(usize, &str)> {
    let func_start = src.find(PAGEMAP_READ_DEF)?;
    let func_end = src[func_start + 1..]
        .find("\nstatic ")
        .map_or(src.len(), |off| func_start + 1 + off);
    Some((func_start, &src[func_start..func_end]))
}

/// Whether `pagemap_read()` already carries the guard.
fn guard_present(src: &str) -> bool {
    pagemap_read_body(src)
        .map_or(false, |(_, body)| body.contains(GUARD_SIGNATURE) && body.contains(GUARD_FLAG))
}

/// Byte offset and text of the anchor to split.
fn select_anchor(src: &str) -> Result<(usize, &'static str), &'static str> {
    for anchor in [ANCHOR_MODERN, ANCHOR_LEGACY] {
        if src.matches(anchor).count() == 1 {
            if let Some(pos) = src.find(anchor) {
                return Ok((pos, anchor));
            }
        }
    }

    // Ambiguous or absent at file scope: look inside the function body only.
    let (func_start, body) =
        pagemap_read_body(src).ok_or("pagemap_read() not found, manual fix needed")?;

    [ANCHOR_MODERN, ANCHOR_LEGACY]
        .into_iter()
        .find_map(|anchor| body.find(anchor).map(|off| (func_start + off, anchor)))
        .ok_or("no known anchor found in pagemap_read(), manual fix needed")
}

/// Insert [`GUARD_BLOCK`] into the `pagemap_read()` walk loop.
pub fn inject_pagemap_guard(src: &str) -> (FixOutcome, Option<String>) {
    if guard_present(src) {
        return (
            FixOutcome::skipped("BIT_SUS_MAPS block already present in pagemap_read()"),
            None,
        );
    }

    let (pos, anchor) = match select_anchor(src) {
        Ok(found) => found,
        Err(reason) => return (FixOutcome::failed(reason), None),
    };

    // Split after the unlock line, keep `start_vaddr = end;` below the block.
    let split = pos + anchor.find('\n').map_or(anchor.len(), |nl| nl + 1);
    let mut patched = String::with_capacity(src.len() + GUARD_BLOCK.len());
    patched.push_str(&src[..split]);
    patched.push_str(GUARD_BLOCK);
    patched.push_str(&src[split..]);

    let api = if anchor == ANCHOR_MODERN {
        "mmap_read_unlock"
    } else {
        "mmap_sem"
    };
    (
        FixOutcome::applied(format!(
            "BIT_SUS_MAPS guard block injected into pagemap_read() ({} API)",
            api
        )),
        Some(patched),
    )
}

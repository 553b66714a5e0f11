//! Hunks from the SUSFS patch that were rejected and are genuinely missing.
//!
//! All other rejects of that pass are "reversed / already applied" because the
//! KernelSU-Next legacy SUSFS branch already patched those files. The hunks
//! below are the ones whose absence breaks the build. Each anchor is the
//! exact text found in the target tree, tabs included.

use super::{Fix, FixAction};

/// `include/linux/mount.h`: `vfsmount` lacks `susfs_mnt_id_backup`, which
/// `namespace.c` already uses.
///
/// This kernel reserves ABI slots with `ANDROID_KABI_RESERVE`; slot 4 is
/// repurposed when `CONFIG_KSU_SUSFS` is set.
pub fn mount_fixes() -> Vec<Fix> {
    vec![Fix::required(
        "repurpose ANDROID_KABI_RESERVE(4) as susfs_mnt_id_backup",
        FixAction::Replace {
            anchor: "\tANDROID_KABI_RESERVE(4);\n} __randomize_layout;",
            replacement: concat!(
                "#ifdef CONFIG_KSU_SUSFS\n",
                "\tANDROID_KABI_USE(4, u64 susfs_mnt_id_backup);\n",
                "#else\n",
                "\tANDROID_KABI_RESERVE(4);\n",
                "#endif\n",
                "} __randomize_layout;",
            ),
            marker: None,
        },
    )]
}

/// `fs/proc_namespace.c`: missing `susfs_def.h` (for `DEFAULT_KSU_MNT_ID`),
/// missing extern declarations, and no sus-mount filter in
/// `show_mountinfo()` (`show_vfsmnt`/`show_vfsstat` already have one).
pub fn proc_namespace_fixes() -> Vec<Fix> {
    vec![
        Fix::required(
            "add susfs_def.h include + extern declarations",
            FixAction::Replace {
                anchor: "#include \"internal.h\"\n\nstatic __poll_t mounts_poll",
                replacement: concat!(
                    "#include \"internal.h\"\n",
                    "\n",
                    "#ifdef CONFIG_KSU_SUSFS_SUS_MOUNT\n",
                    "#include <linux/susfs_def.h>\n",
                    "extern bool susfs_hide_sus_mnts_for_non_su_procs;\n",
                    "extern bool susfs_is_current_ksu_domain(void);\n",
                    "#endif\n",
                    "\n",
                    "static __poll_t mounts_poll",
                ),
                marker: None,
            },
        ),
        // Inserted right before the first seq_printf of show_mountinfo().
        Fix::required(
            "add sus-mount filter block inside show_mountinfo()",
            FixAction::Replace {
                anchor: concat!(
                    "static int show_mountinfo(struct seq_file *m, struct vfsmount *mnt)\n",
                    "{\n",
                    "\tstruct proc_mounts *p = m->private;\n",
                    "\tstruct mount *r = real_mount(mnt);\n",
                    "\tstruct super_block *sb = mnt->mnt_sb;\n",
                    "\tstruct path mnt_path = { .dentry = mnt->mnt_root, .mnt = mnt };\n",
                    "\tint err;\n",
                    "\n",
                    "\tseq_printf(m, \"%i %i %u:%u \",",
                ),
                replacement: concat!(
                    "static int show_mountinfo(struct seq_file *m, struct vfsmount *mnt)\n",
                    "{\n",
                    "\tstruct proc_mounts *p = m->private;\n",
                    "\tstruct mount *r = real_mount(mnt);\n",
                    "\tstruct super_block *sb = mnt->mnt_sb;\n",
                    "\tstruct path mnt_path = { .dentry = mnt->mnt_root, .mnt = mnt };\n",
                    "\tint err;\n",
                    "\n",
                    "#ifdef CONFIG_KSU_SUSFS_SUS_MOUNT\n",
                    "\tif (susfs_hide_sus_mnts_for_non_su_procs &&\n",
                    "\t\t\tr->mnt_id >= DEFAULT_KSU_MNT_ID &&\n",
                    "\t\t\t!susfs_is_current_ksu_domain())\n",
                    "\t{\n",
                    "\t\treturn 0;\n",
                    "\t}\n",
                    "#endif\n",
                    "\n",
                    "\tseq_printf(m, \"%i %i %u:%u \",",
                ),
                marker: None,
            },
        ),
    ]
}

/// `fs/proc/cmdline.c`: the spoof hook, written against the
/// `seq_puts` + `seq_putc` API of this kernel rather than the old
/// `seq_printf` form the patch expects.
pub fn cmdline_fixes() -> Vec<Fix> {
    vec![Fix::required(
        "add SPOOF_CMDLINE_OR_BOOTCONFIG hook (seq_puts API variant)",
        FixAction::Replace {
            anchor: concat!(
                "#include <linux/seq_file.h>\n",
                "\n",
                "static int cmdline_proc_show(struct seq_file *m, void *v)\n",
                "{\n",
                "\tseq_puts(m, saved_command_line);\n",
                "\tseq_putc(m, '\\n');\n",
                "\treturn 0;\n",
                "}",
            ),
            replacement: concat!(
                "#include <linux/seq_file.h>\n",
                "\n",
                "#ifdef CONFIG_KSU_SUSFS_SPOOF_CMDLINE_OR_BOOTCONFIG\n",
                "extern int susfs_spoof_cmdline_or_bootconfig(struct seq_file *m);\n",
                "#endif\n",
                "\n",
                "static int cmdline_proc_show(struct seq_file *m, void *v)\n",
                "{\n",
                "#ifdef CONFIG_KSU_SUSFS_SPOOF_CMDLINE_OR_BOOTCONFIG\n",
                "\tif (!susfs_spoof_cmdline_or_bootconfig(m)) {\n",
                "\t\tseq_putc(m, '\\n');\n",
                "\t\treturn 0;\n",
                "\t}\n",
                "#endif\n",
                "\tseq_puts(m, saved_command_line);\n",
                "\tseq_putc(m, '\\n');\n",
                "\treturn 0;\n",
                "}",
            ),
            marker: None,
        },
    )]
}

/// `fs/namei.c`: the `CONFIG_KSU_SUSFS_OPEN_REDIRECT` path of
/// `do_filp_open()`.
pub fn namei_fixes() -> Vec<Fix> {
    vec![
        Fix::required(
            "add fake_pathname variable declaration",
            FixAction::Replace {
                anchor: concat!(
                    "struct file *do_filp_open(int dfd, struct filename *pathname,\n",
                    "\t\tconst struct open_flags *op)\n",
                    "{\n",
                    "\tstruct nameidata nd;\n",
                    "\tint flags = op->lookup_flags;\n",
                    "\tstruct file *filp;\n",
                ),
                replacement: concat!(
                    "struct file *do_filp_open(int dfd, struct filename *pathname,\n",
                    "\t\tconst struct open_flags *op)\n",
                    "{\n",
                    "\tstruct nameidata nd;\n",
                    "\tint flags = op->lookup_flags;\n",
                    "\tstruct file *filp;\n",
                    "#ifdef CONFIG_KSU_SUSFS_OPEN_REDIRECT\n",
                    "\tstruct filename *fake_pathname;\n",
                    "#endif\n",
                ),
                marker: None,
            },
        ),
        Fix::required(
            "add susfs_get_redirected_path extern before do_filp_open",
            FixAction::Replace {
                anchor: "struct file *do_filp_open(int dfd, struct filename *pathname,",
                replacement: concat!(
                    "#ifdef CONFIG_KSU_SUSFS_OPEN_REDIRECT\n",
                    "extern struct filename *susfs_get_redirected_path(unsigned long ino);\n",
                    "#endif\n",
                    "\n",
                    "struct file *do_filp_open(int dfd, struct filename *pathname,",
                ),
                marker: None,
            },
        ),
        // Older runs injected this block with `i_state`; the marker matches
        // both forms and namei::fixes() corrects the field.
        Fix::required(
            "add OPEN_REDIRECT redirect block before restore_nameidata()",
            FixAction::Replace {
                anchor: concat!(
                    "\tif (unlikely(filp == ERR_PTR(-ESTALE)))\n",
                    "\t\tfilp = path_openat(&nd, op, flags | LOOKUP_REVAL);\n",
                    "\trestore_nameidata();\n",
                    "\treturn filp;\n",
                    "}\n",
                    "\n",
                    "struct file *do_file_open_root(",
                ),
                replacement: concat!(
                    "\tif (unlikely(filp == ERR_PTR(-ESTALE)))\n",
                    "\t\tfilp = path_openat(&nd, op, flags | LOOKUP_REVAL);\n",
                    "#ifdef CONFIG_KSU_SUSFS_OPEN_REDIRECT\n",
                    "\tif (!IS_ERR(filp) && unlikely(filp->f_inode->i_mapping->flags & BIT_OPEN_REDIRECT) &&\n",
                    "\t\t\tcurrent_uid().val < 11000) {\n",
                    "\t\tfake_pathname = susfs_get_redirected_path(filp->f_inode->i_ino);\n",
                    "\t\tif (!IS_ERR(fake_pathname)) {\n",
                    "\t\t\trestore_nameidata();\n",
                    "\t\t\tfilp_close(filp, NULL);\n",
                    "\t\t\t/* no need to putname(pathname) here, done by calling process */\n",
                    "\t\t\tset_nameidata(&nd, dfd, fake_pathname);\n",
                    "\t\t\tfilp = path_openat(&nd, op, flags | LOOKUP_RCU);\n",
                    "\t\t\tif (unlikely(filp == ERR_PTR(-ECHILD)))\n",
                    "\t\t\t\tfilp = path_openat(&nd, op, flags);\n",
                    "\t\t\tif (unlikely(filp == ERR_PTR(-ESTALE)))\n",
                    "\t\t\t\tfilp = path_openat(&nd, op, flags | LOOKUP_REVAL);\n",
                    "\t\t\trestore_nameidata();\n",
                    "\t\t\tputname(fake_pathname);\n",
                    "\t\t\treturn filp;\n",
                    "\t\t}\n",
                    "\t}\n",
                    "#endif\n",
                    "\trestore_nameidata();\n",
                    "\treturn filp;\n",
                    "}\n",
                    "\n",
                    "struct file *do_file_open_root(",
                ),
                marker: Some("fake_pathname = susfs_get_redirected_path("),
            },
        ),
    ]
}

/// `kernel/kallsyms.c`: hunk #1 (extern) applied, hunk #2 (the `s_show()`
/// body) did not.
pub fn kallsyms_fixes() -> Vec<Fix> {
    vec![Fix::required(
        "add HIDE_KSU_SUSFS_SYMBOLS conditional in s_show()",
        FixAction::Replace {
            anchor: concat!(
                "\t} else\n",
                "\t\tseq_printf(m, \"%px %c %s\\n\", value,\n",
                "\t\t\t   iter->type, iter->name);\n",
                "\treturn 0;\n",
                "}",
            ),
            replacement: concat!(
                "\t} else {\n",
                "#ifndef CONFIG_KSU_SUSFS_HIDE_KSU_SUSFS_SYMBOLS\n",
                "\t\tseq_printf(m, \"%px %c %s\\n\", value,\n",
                "\t\t\t   iter->type, iter->name);\n",
                "#else\n",
                "\t\tif (susfs_starts_with(iter->name, \"ksu_\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"__ksu_\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"susfs_\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"ksud\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"is_ksu_\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"is_manager_\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"escape_to_\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"setup_selinux\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"track_throne\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"on_post_fs_data\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"try_umount\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"kernelsu\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"__initcall__kmod_kernelsu\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"apply_kernelsu\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"handle_sepolicy\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"getenforce\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"setenforce\") ||\n",
                "\t\t\tsusfs_starts_with(iter->name, \"is_zygote\"))\n",
                "\t\t{\n",
                "\t\t\treturn 0;\n",
                "\t\t}\n",
                "\t\tseq_printf(m, \"%px %c %s\\n\", value,\n",
                "\t\t\t   iter->type, iter->name);\n",
                "#endif\n",
                "\t}\n",
                "\treturn 0;\n",
                "}",
            ),
            marker: None,
        },
    )]
}

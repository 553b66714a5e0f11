//! Repairs of misapplied SUSFS hunks in `fs/namei.c`.
//!
//! - the `susfs_def.h` include hunk was rejected, so `ND_STATE_*` and
//!   `BIT_OPEN_REDIRECT` are undeclared although the code using them is in;
//! - an earlier injection tested `i_state` instead of `i_mapping->flags`;
//! - the `lookup_slow` SUS_PATH hunk landed inside `do_mknod()`;
//! - an `ND_STATE_LAST_SDCARD_SUS_PATH` hunk landed inside `vfs_unlink2()`.

use super::{Anchor, Fix, FixAction, Placement};

pub const SUSFS_DEF_INCLUDE: &str = concat!(
    "#if defined(CONFIG_KSU_SUSFS_SUS_PATH) || defined(CONFIG_KSU_SUSFS_OPEN_REDIRECT)\n",
    "#include <linux/susfs_def.h>\n",
    "#endif",
);

pub const WRONG_REDIRECT_CHECK: &str = "filp->f_inode->i_state & BIT_OPEN_REDIRECT";
pub const CORRECT_REDIRECT_CHECK: &str = "filp->f_inode->i_mapping->flags & BIT_OPEN_REDIRECT";

/// Opening of the `lookup_slow` fragment stranded in `do_mknod()`.
pub const MISPLACED_LOOKUP_SLOW: &str =
    "#ifdef CONFIG_KSU_SUSFS_SUS_PATH\n\tif (is_nd_flags_lookup_last && !found_sus_path)";

/// Opening of the `nd->state` block stranded in `vfs_unlink2()`.
pub const MISPLACED_SDCARD_STATE: &str =
    "#ifdef CONFIG_KSU_SUSFS_SUS_PATH\n\t\t\tif (nd->state & ND_STATE_LAST_SDCARD_SUS_PATH)";

pub fn fixes() -> Vec<Fix> {
    vec![
        Fix::optional(
            "add susfs_def.h include",
            FixAction::Insert {
                marker: "susfs_def.h",
                block: SUSFS_DEF_INCLUDE,
                anchors: vec![
                    Anchor {
                        text: "#include <linux/uaccess.h>",
                        placement: Placement::After,
                    },
                    Anchor {
                        text: "#include \"mount.h\"",
                        placement: Placement::Before,
                    },
                ],
            },
        ),
        Fix::optional(
            "fix BIT_OPEN_REDIRECT: i_state -> i_mapping->flags",
            FixAction::Correct {
                wrong: WRONG_REDIRECT_CHECK,
                correct: CORRECT_REDIRECT_CHECK,
            },
        ),
        Fix::optional(
            "remove misplaced lookup_slow fragment from do_mknod()",
            FixAction::Excise {
                signature: MISPLACED_LOOKUP_SLOW,
            },
        ),
        Fix::optional(
            "remove misplaced ND_STATE_LAST_SDCARD_SUS_PATH block from vfs_unlink2()",
            FixAction::Excise {
                signature: MISPLACED_SDCARD_STATE,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FixOutcome;

    #[test]
    fn test_include_after_uaccess() {
        let mut text = "#include <linux/fs.h>\n#include <linux/uaccess.h>\n\n#include \"internal.h\"\n".to_string();
        let outcome = fixes()[0].apply(&mut text);
        assert!(outcome.is_applied());
        assert!(text.starts_with(&format!(
            "#include <linux/fs.h>\n#include <linux/uaccess.h>\n{}\n",
            SUSFS_DEF_INCLUDE
        )));
    }

    #[test]
    fn test_include_before_mount_h_fallback() {
        let mut text = "#include <linux/fs.h>\n#include \"mount.h\"\n".to_string();
        assert!(fixes()[0].apply(&mut text).is_applied());
        assert_eq!(
            text,
            format!("#include <linux/fs.h>\n{}\n#include \"mount.h\"\n", SUSFS_DEF_INCLUDE)
        );
    }

    #[test]
    fn test_include_without_anchor_fails_softly() {
        let mut text = "#include <linux/fs.h>\n".to_string();
        let fixes = fixes();
        let fix = &fixes[0];
        assert!(fix.apply(&mut text).is_failed());
        assert_eq!(fix.requirement, crate::models::Requirement::Optional);
        assert_eq!(text, "#include <linux/fs.h>\n");
    }

    #[test]
    fn test_include_already_present() {
        let mut text = "#include <linux/susfs_def.h>\n#include <linux/uaccess.h>\n".to_string();
        assert_eq!(fixes()[0].apply(&mut text), FixOutcome::skipped("already present"));
    }

    #[test]
    fn test_redirect_field_corrected() {
        let mut text = format!("\tif (!IS_ERR(filp) && unlikely({}) &&\n", WRONG_REDIRECT_CHECK);
        assert!(fixes()[1].apply(&mut text).is_applied());
        assert!(text.contains(CORRECT_REDIRECT_CHECK));
        assert!(!text.contains("i_state"));
        assert_eq!(fixes()[1].apply(&mut text), FixOutcome::skipped("already correct"));
    }

    #[test]
    fn test_misplaced_blocks_removed() {
        let mut text = concat!(
            "static long do_mknod(int dfd)\n",
            "{\n",
            "#ifdef CONFIG_KSU_SUSFS_SUS_PATH\n",
            "\tif (is_nd_flags_lookup_last && !found_sus_path) {\n",
            "#ifdef CONFIG_KSU_SUSFS_SUS_MOUNT\n",
            "\t\tsus_wq = 1;\n",
            "#endif\n",
            "\t\tdput(dir);\n",
            "\t}\n",
            "#endif\n",
            "\treturn 0;\n",
            "}\n",
        )
        .to_string();

        assert!(fixes()[2].apply(&mut text).is_applied());
        assert_eq!(text, "static long do_mknod(int dfd)\n{\n\treturn 0;\n}\n");
        assert_eq!(fixes()[2].apply(&mut text), FixOutcome::skipped("not present"));
        assert_eq!(fixes()[3].apply(&mut text), FixOutcome::skipped("not present"));
    }

    #[test]
    fn test_unbalanced_block_reported_and_kept() {
        let original = format!("{}\n\t\t\t\treturn -ENOENT;\n", MISPLACED_SDCARD_STATE);
        let mut text = original.clone();
        let outcome = fixes()[3].apply(&mut text);
        assert_eq!(
            outcome,
            FixOutcome::failed("found signature but could not remove block")
        );
        assert_eq!(text, original);
    }
}

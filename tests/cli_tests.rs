//! Exit status and reporting of the `susfs_fixup` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use susfs_fixup::kernel::patcher::namei::SUSFS_DEF_INCLUDE;
use susfs_fixup::FixTarget;

fn fixup(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_susfs_fixup"))
        .args(args)
        .output()
        .expect("Failed to run susfs_fixup")
}

fn write_target(root: &Path, target: FixTarget, content: &str) {
    let path = root.join(target.rel_path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn root_arg(root: &Path) -> &str {
    root.to_str().expect("temp path is UTF-8")
}

#[test]
fn test_empty_tree_succeeds() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output = fixup(&[root_arg(temp_dir.path())]);
    assert!(output.status.success());
}

#[test]
fn test_missing_root_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("android-kernel");
    let output = fixup(&[root_arg(&missing)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("does not exist or is not a directory"));
}

#[test]
fn test_missing_argument_is_usage_error() {
    let output = fixup(&[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_required_anchor_missing_exits_nonzero() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_target(
        temp_dir.path(),
        FixTarget::Mount,
        "struct vfsmount {\n\tint mnt_flags;\n} __randomize_layout;\n",
    );

    let output = fixup(&[root_arg(temp_dir.path())]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[FAIL] include/linux/mount.h"));
    assert!(stderr.contains("ANDROID_KABI_RESERVE(4);"));
}

#[test]
fn test_status_lines_carry_a_single_tag() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    write_target(root, FixTarget::Mount, "struct vfsmount {\n};\n");
    write_target(root, FixTarget::Cmdline, include_str!("fixtures/cmdline.c"));

    let output = fixup(&[root_arg(root)]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let fail = stderr.lines().find(|l| l.contains("[FAIL]")).unwrap();
    assert!(fail.starts_with("  [FAIL] include/linux/mount.h"), "{}", fail);
    let ok = stderr.lines().find(|l| l.contains("[OK]")).unwrap();
    assert!(ok.starts_with("  [OK]   fs/proc/cmdline.c"), "{}", ok);
    assert!(stderr
        .lines()
        .all(|l| !l.starts_with("[ERROR]") && !l.starts_with("[INFO]") && !l.starts_with("[WARN]")));
}

#[test]
fn test_unreadable_file_still_gets_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("kernel");
    write_target(&root, FixTarget::Cmdline, include_str!("fixtures/cmdline.c"));
    let kallsyms = root.join(FixTarget::Kallsyms.rel_path());
    fs::create_dir_all(kallsyms.parent().unwrap()).unwrap();
    fs::write(&kallsyms, b"\xff\xfe\xfd").unwrap();
    let report_path = temp_dir.path().join("report.json");

    let output = fixup(&[root_arg(&root), "--report", report_path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 6);
    let kallsyms = files.iter().find(|f| f["target"] == "kallsyms").unwrap();
    assert_eq!(kallsyms["status"], "error");
    assert!(kallsyms["error"].as_str().unwrap().contains("kernel/kallsyms.c"));
    let cmdline = files.iter().find(|f| f["target"] == "cmdline").unwrap();
    assert_eq!(cmdline["status"], "written");
}

#[test]
fn test_optional_anchor_missing_warns_but_succeeds() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    write_target(root, FixTarget::Namei, include_str!("fixtures/namei.c"));

    // Repair once, then drop the include together with both include anchors.
    assert!(fixup(&[root_arg(root), "--only", "namei"]).status.success());
    let repaired = fs::read_to_string(root.join("fs/namei.c")).unwrap();
    let stripped = repaired
        .replace(&format!("{}\n", SUSFS_DEF_INCLUDE), "")
        .replace("#include <linux/uaccess.h>\n", "")
        .replace("#include \"mount.h\"\n", "");
    write_target(root, FixTarget::Namei, &stripped);

    let output = fixup(&[root_arg(root), "--only", "namei"]);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[WARN] fs/namei.c: add susfs_def.h include"));
    assert_eq!(fs::read_to_string(root.join("fs/namei.c")).unwrap(), stripped);
}

#[test]
fn test_report_and_backup() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("kernel");
    write_target(&root, FixTarget::Cmdline, include_str!("fixtures/cmdline.c"));
    let report_path = temp_dir.path().join("report.json");

    let output = fixup(&[
        root_arg(&root),
        "--backup",
        "--report",
        report_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let backup = root.join(".susfs_fixup_backup").join("fs_proc_cmdline.c.bak");
    assert_eq!(
        fs::read_to_string(backup).unwrap(),
        include_str!("fixtures/cmdline.c")
    );

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 6);
    let cmdline = files.iter().find(|f| f["target"] == "cmdline").unwrap();
    assert_eq!(cmdline["status"], "written");
    assert_eq!(cmdline["fixes"][0]["outcome"]["kind"], "applied");
}

#[test]
fn test_log_file_written() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("kernel");
    fs::create_dir_all(&root).unwrap();
    let log_path = temp_dir.path().join("logs").join("fixup.log");

    let output = fixup(&[root_arg(&root), "--log-file", log_path.to_str().unwrap()]);

    assert!(output.status.success());
    let log = fs::read_to_string(log_path).unwrap();
    assert!(log.contains("[INFO] Done: 0 fix(es) applied"));
}

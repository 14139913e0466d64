//! Launcher script generation.
//!
//! Renders a fixed-template POSIX shell script that execs the runtime with
//! an embedded classpath and options, honoring `JAVA_OPTS` from the
//! environment at run time.

use std::fs;
use std::path::{Path, PathBuf};

use jvmkit_core::observability;
use jvmkit_core::Classpath;

use crate::error::ArchiveError;
use crate::writer::add_execute_bits;

/// Fixed output name inside the destination directory.
pub const LAUNCHER_FILE_NAME: &str = "run";

/// Write `dest_dir/run`: a single-`exec` shell launcher for `main_class`
/// with execute bits set.
pub fn build_launcher(
    dest_dir: &Path,
    main_class: &str,
    classpath: &Classpath,
    jvm_args: &[String],
) -> Result<PathBuf, ArchiveError> {
    fs::create_dir_all(dest_dir)?;
    let out = dest_dir.join(LAUNCHER_FILE_NAME);
    if out.exists() {
        fs::remove_file(&out)?;
    }

    fs::write(&out, render_script(main_class, classpath, jvm_args))?;
    add_execute_bits(&out)?;

    observability::audit_artifact_written("launcher", &out.display().to_string(), 1, 0);
    Ok(out)
}

fn render_script(main_class: &str, classpath: &Classpath, jvm_args: &[String]) -> String {
    let embedded_args = if jvm_args.is_empty() {
        String::new()
    } else {
        format!(" {}", jvm_args.join(" "))
    };
    format!(
        "#!/usr/bin/env sh\nexec java $JAVA_OPTS{embedded_args} -cp \"{classpath}\" {main_class} \"$@\"\n",
        classpath = classpath.join(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classpath() -> Classpath {
        vec![PathBuf::from("lib/a.jar"), PathBuf::from("lib/b.jar")]
            .into_iter()
            .collect()
    }

    #[test]
    fn script_has_shebang_and_single_exec_line() {
        let dest = tempfile::tempdir().unwrap();
        let out = build_launcher(
            dest.path(),
            "com.example.Main",
            &classpath(),
            &["-Xmx512m".to_string()],
        )
        .unwrap();

        let script = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "#!/usr/bin/env sh");
        assert!(lines[1].starts_with("exec java $JAVA_OPTS -Xmx512m -cp "));
        assert!(lines[1].contains(&classpath().join()));
        assert!(lines[1].contains("com.example.Main \"$@\""));
    }

    #[test]
    fn no_jvm_args_leaves_only_java_opts() {
        let script = render_script("Main", &classpath(), &[]);
        assert!(script.contains("exec java $JAVA_OPTS -cp "));
    }

    #[cfg(unix)]
    #[test]
    fn launcher_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dest = tempfile::tempdir().unwrap();
        let out = build_launcher(dest.path(), "Main", &Classpath::default(), &[]).unwrap();
        let mode = fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}

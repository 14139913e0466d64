//! JVM runtime discovery and command-line construction.
//!
//! `resolve_java` finds the `java` binary (`JVMKIT_JAVA_HOME/bin/java` first,
//! then PATH). `JavaCommand` assembles the token list
//! `java <jvm_args>... -cp <classpath> <main_class> <args>...` consumed by the
//! process runner and the launcher generator.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::classpath::Classpath;
use crate::config::{self, env_keys};

fn java_binary_name() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// Resolve the `java` binary. `JVMKIT_JAVA_HOME` wins over PATH; a set but
/// broken home is an error rather than a silent fallback.
pub fn resolve_java() -> Result<PathBuf> {
    if let Some(home) = config::env_optional(env_keys::JVMKIT_JAVA_HOME) {
        let bin = Path::new(&home).join("bin").join(java_binary_name());
        if bin.is_file() {
            return Ok(bin);
        }
        anyhow::bail!(
            "{} is set but `{}` does not exist",
            env_keys::JVMKIT_JAVA_HOME,
            bin.display()
        );
    }
    which::which(java_binary_name()).with_context(|| {
        format!(
            "no `java` on PATH (set {} to a JVM installation)",
            env_keys::JVMKIT_JAVA_HOME
        )
    })
}

/// A JVM invocation: runtime binary, JVM options, classpath, main class,
/// program arguments.
#[derive(Debug, Clone)]
pub struct JavaCommand {
    pub java: PathBuf,
    pub jvm_args: Vec<String>,
    pub classpath: Classpath,
    pub main_class: String,
    pub args: Vec<String>,
}

impl JavaCommand {
    pub fn new(java: PathBuf, main_class: impl Into<String>) -> Self {
        Self {
            java,
            jvm_args: Vec::new(),
            classpath: Classpath::default(),
            main_class: main_class.into(),
            args: Vec::new(),
        }
    }

    pub fn jvm_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.jvm_args.extend(args);
        self
    }

    pub fn classpath(mut self, classpath: Classpath) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Full command-line token list, ready for a process runner.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(4 + self.jvm_args.len() + self.args.len());
        tokens.push(self.java.to_string_lossy().into_owned());
        tokens.extend(self.jvm_args.iter().cloned());
        if !self.classpath.is_empty() {
            tokens.push("-cp".to_string());
            tokens.push(self.classpath.join());
        }
        tokens.push(self.main_class.clone());
        tokens.extend(self.args.iter().cloned());
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_order_is_jvm_args_then_cp_then_main_then_args() {
        let cp: Classpath = vec![PathBuf::from("a.jar")].into_iter().collect();
        let cmd = JavaCommand::new(PathBuf::from("java"), "com.example.Main")
            .jvm_args(["-Xmx256m".to_string()])
            .classpath(cp)
            .args(["--verbose".to_string()]);
        assert_eq!(
            cmd.tokens(),
            vec!["java", "-Xmx256m", "-cp", "a.jar", "com.example.Main", "--verbose"]
        );
    }

    #[test]
    fn empty_classpath_omits_cp_flag() {
        let cmd = JavaCommand::new(PathBuf::from("java"), "Main");
        assert_eq!(cmd.tokens(), vec!["java", "Main"]);
    }

    #[test]
    fn java_home_pointing_nowhere_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(env_keys::JVMKIT_JAVA_HOME, dir.path());
        let err = resolve_java().unwrap_err();
        assert!(err.to_string().contains("JVMKIT_JAVA_HOME"));
        std::env::remove_var(env_keys::JVMKIT_JAVA_HOME);
    }
}

//! CollectorCommandRunner trait and CollectorExecutor (sync subprocess
//! wrapper). The daemon calls the executor from `spawn_blocking`, so
//! blocking on the child here is fine.

use crate::error::CollectorError;

/// Trait for invoking the collector command. Enables mock injection for
/// testing.
pub trait CollectorCommandRunner: Send + Sync {
    fn run(&self, args: &[String]) -> Result<(), CollectorError>;
}

impl<T: CollectorCommandRunner + ?Sized> CollectorCommandRunner for &T {
    fn run(&self, args: &[String]) -> Result<(), CollectorError> {
        (**self).run(args)
    }
}

/// Real collector executor using `std::process::Command`.
pub struct CollectorExecutor {
    collector_bin: String,
}

impl CollectorExecutor {
    pub fn new(collector_bin: impl Into<String>) -> Self {
        Self {
            collector_bin: collector_bin.into(),
        }
    }
}

impl Default for CollectorExecutor {
    fn default() -> Self {
        Self::new("codetrail-cli")
    }
}

impl CollectorCommandRunner for CollectorExecutor {
    fn run(&self, args: &[String]) -> Result<(), CollectorError> {
        let output = std::process::Command::new(&self.collector_bin)
            .args(args)
            .output()
            .map_err(CollectorError::Io)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CollectorError::CommandFailed(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_executor() {
        let exec = CollectorExecutor::default();
        assert_eq!(exec.collector_bin, "codetrail-cli");
    }

    #[test]
    fn custom_binary() {
        let exec = CollectorExecutor::new("/opt/collector/bin/collect");
        assert_eq!(exec.collector_bin, "/opt/collector/bin/collect");
    }

    #[test]
    fn blanket_ref_impl() {
        struct Mock;
        impl CollectorCommandRunner for Mock {
            fn run(&self, _args: &[String]) -> Result<(), CollectorError> {
                Ok(())
            }
        }
        let mock = Mock;
        let r: &Mock = &mock;
        assert!(r.run(&[]).is_ok());
    }
}

//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use ctilink_config::{Config, SwitchEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that keeps the command store under a temporary directory.
pub struct TestConfigLoader {
    store_dir: Arc<TempDir>,
    password: Option<String>,
    port: u16,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for store");
        Self {
            store_dir: Arc::new(dir),
            password: None,
            port: 1,
        }
    }

    /// Points the loader at a switch on the loopback interface.
    #[must_use]
    pub fn with_switch(mut self, port: u16, password: &str) -> Self {
        self.port = port;
        self.password = Some(password.to_owned());
        self
    }

    /// Location the command store is expected at.
    #[must_use]
    pub fn store_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.store_dir.path().join("spool/commands.json"))
            .expect("temporary store path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            switch_endpoint: SwitchEndpoint::tcp("127.0.0.1", self.port),
            switch_password: self.password.clone(),
            command_store: self.store_path(),
            poll_interval_secs: 1,
            connect_timeout_secs: 2,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an invalid endpoint flag.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("ctilinkd"),
            OsString::from("--switch-endpoint"),
            OsString::from("invalid://switch"),
        ];
        Config::load_from_iter(args)
    }
}

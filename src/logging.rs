use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
};
use tracing_subscriber::layer::SubscriberExt;

pub const DEFAULT_LOG_DIR: &str = "classifier_logs";

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: tracing::Level,
    pub logging_enabled: bool,
    pub log_to_file: bool,
    pub logger_name: String,
    pub log_dir: PathBuf,
    pub _tracing_guard: Option<std::sync::Arc<tracing::subscriber::DefaultGuard>>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            logging_enabled: true,
            log_to_file: true,
            logger_name: "abstract_classifier".to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            _tracing_guard: None,
        }
    }
}

impl LoggingConfig {
    /// Installs the subscriber for the current thread. The guard lives in the config,
    /// so keep the config alive for as long as logs should be written.
    pub fn load_logger(&mut self) -> crate::Result<()> {
        self._tracing_guard = if self.logging_enabled {
            Some(std::sync::Arc::new(self.create_logger()?))
        } else {
            None
        };
        Ok(())
    }

    fn create_logger(&self) -> crate::Result<tracing::subscriber::DefaultGuard> {
        let filter = tracing_subscriber::EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env_lossy();

        let terminal_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(true)
            .with_writer(std::io::stdout);

        let file_layer = if self.log_to_file {
            if !Path::new(&self.log_dir).exists() {
                create_dir_all(&self.log_dir)?;
            }
            let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::HOURLY)
                .max_log_files(6)
                .filename_prefix(&self.logger_name)
                .filename_suffix("log")
                .build(&self.log_dir)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false) // Disable ANSI codes for file output
                    .with_writer(file_appender),
            )
        } else {
            None
        };

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(terminal_layer);

        Ok(tracing::subscriber::set_default(subscriber))
    }
}

#[allow(dead_code)]
pub trait LoggingConfigTrait {
    fn logging_config_mut(&mut self) -> &mut LoggingConfig;

    fn logging_enabled(mut self, enabled: bool) -> Self
    where
        Self: Sized,
    {
        self.logging_config_mut().logging_enabled = enabled;
        self
    }

    /// Terminal only when false.
    fn log_to_file(mut self, enabled: bool) -> Self
    where
        Self: Sized,
    {
        self.logging_config_mut().log_to_file = enabled;
        self
    }

    fn logger_name<S: Into<String>>(mut self, logger_name: S) -> Self
    where
        Self: Sized,
    {
        self.logging_config_mut().logger_name = logger_name.into();
        self
    }

    fn log_dir<P: Into<PathBuf>>(mut self, log_dir: P) -> Self
    where
        Self: Sized,
    {
        self.logging_config_mut().log_dir = log_dir.into();
        self
    }

    /// Sets the log level.
    ///
    /// TRACE is request flow, DEBUG is every attempt and run, INFO is group
    /// verdicts, record completions and checkpoints. WARN and ERROR carry the
    /// recovered and unrecovered failures.
    fn log_level(mut self, level: tracing::Level) -> Self
    where
        Self: Sized,
    {
        self.logging_config_mut().level = level;
        self
    }
}

impl LoggingConfigTrait for LoggingConfig {
    fn logging_config_mut(&mut self) -> &mut LoggingConfig {
        self
    }
}

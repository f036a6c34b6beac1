use log4rs::append::console::ConsoleAppender;
use log4rs::config::runtime::ConfigBuilder;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::log::{LogConfiguration, ModuleLogConfiguration};

// Timestamp, highlighted level, target module, message.
const STDERR_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

impl From<&ModuleLogConfiguration> for Logger {
    fn from(module_config: &ModuleLogConfiguration) -> Self {
        Logger::builder().build(module_config.module.clone(), module_config.level)
    }
}

impl LogConfiguration {
    /// Rebuilds the log4rs configuration from the current levels and installs it, initializing
    /// log4rs on first use.
    pub(in crate::log) fn set_config(&mut self) {
        let encoder = Box::new(PatternEncoder::new(STDERR_PATTERN));
        let stderr: ConsoleAppender = ConsoleAppender::builder()
            .target(log4rs::append::console::Target::Stderr)
            .encoder(encoder)
            .build();
        let mut config: ConfigBuilder =
            Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));

        for module_config in self.module_configurations.values() {
            config = config.logger(module_config.into());
        }

        let root = Root::builder()
            .appender("stderr")
            .build(self.global_log_level);
        // A rejected configuration leaves only the max level in force.
        let Ok(new_config) = config.build(root) else {
            log::set_max_level(self.global_log_level);
            return;
        };

        if let Some(handle) = &self.root_handle {
            handle.set_config(new_config);
        } else if let Ok(handle) = log4rs::init_config(new_config) {
            self.root_handle = Some(handle);
        } else {
            // Some other logger is installed.
            log::set_max_level(self.global_log_level);
        }
    }
}

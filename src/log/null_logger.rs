//! Backend used when the `logging` feature is off. Messages are dropped, but the level still
//! reaches the `log` facade so that filtered-out macros cost nothing.

use crate::log::LogConfiguration;

impl LogConfiguration {
    pub(in crate::log) fn set_config(&mut self) {
        log::set_max_level(self.global_log_level);
    }
}

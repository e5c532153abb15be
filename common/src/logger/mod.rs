mod init;

pub use init::{init_logger, warn_if_slow};

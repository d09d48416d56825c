pub mod event;
pub mod severity;
pub mod http;
pub mod record;
pub mod layout;
pub mod entry;
pub mod enhancer;
pub mod sink;
pub mod layer;

#[cfg(feature = "cloud-logging")]
pub mod cloud_logging;

pub mod backend;
pub mod env;
pub mod init;
pub mod noop_sink;
pub mod stdout;

pub mod local_sink;
pub mod rest;

pub use local_sink::LocalSink;
pub use rest::RestSyncAdapter;

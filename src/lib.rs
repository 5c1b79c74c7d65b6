pub mod address;
pub mod bounce;
pub mod classify;
pub mod datetime;
pub mod formats;
pub mod reason;
pub mod record;
pub mod rfc5322;
pub mod rhost;
pub mod smtp;
pub mod text;

pub use address::Address;
pub use bounce::{BounceRecord, DumpFormat, FlatRecord, SoftBounce};
pub use classify::{ClassificationEngine, ClassifyOptions, EngineConfig};
pub use formats::{default_modules, scan_any, FormatModule};
pub use record::{MailHeaders, RawRecord, ScanResult};

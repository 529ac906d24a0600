pub mod archive;
pub mod crawler;
pub mod domain;
pub mod driver;
pub mod error;
pub mod http;
pub mod links;
pub mod policy;
pub mod result;
pub mod sentinel;

pub use archive::{PageArchiver, PageCapture};
pub use crawler::{Crawler, MappingInputs, PageCallback, ProgressCallback};
pub use driver::{AnonymousSession, Authenticator, Credentials, LoginOutcome, PageDriver};
pub use error::{DriverError, ScanError};
pub use http::HttpDriver;
pub use policy::CrawlPolicy;
pub use result::{MAPPING_FILE, MappingResult, MappingStatus, PageRecord};

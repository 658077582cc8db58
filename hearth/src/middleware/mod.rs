pub mod logging;
pub mod request_params;

pub use self::logging::{Clock, LogWriter, RequestLogger, SystemClock};
pub use self::request_params::RequestParams;

mod app;
pub mod testing;

pub use self::app::App;

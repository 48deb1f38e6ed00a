pub mod analysis;
#[cfg(feature = "live")]
pub mod capture;
pub mod decode;
pub mod features;
pub mod frame;
pub mod monitor;
pub mod note;
pub mod peaks;
pub mod spectrum;

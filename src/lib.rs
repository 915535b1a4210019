pub mod configuration;
pub mod controller;
pub mod data_capture;
pub mod error_handling;
pub mod network;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

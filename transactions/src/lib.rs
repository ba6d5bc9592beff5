pub mod codec;
pub mod error;
pub mod executable_utils;
pub mod exporter;
pub mod importer;
pub mod model;
pub mod queries;
pub mod storage;
pub mod timezone;
pub mod validator;

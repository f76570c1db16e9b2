pub mod error;
pub mod manual;
pub mod roster;
pub mod scan;
pub mod status;
pub mod summary;
pub mod token;

mod records;

pub use error::ServiceError;

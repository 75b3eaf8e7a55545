pub mod error;
pub mod row;
pub mod value;

pub use error::{MockError, Result};
pub use row::{Row, rows_from_json};
pub use value::Value;

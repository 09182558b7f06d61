pub mod model;
pub mod time;

pub use model::{CharacterRecord, DataFile, RawEntry, TimestampTable};
pub use time::Time;

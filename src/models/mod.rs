pub mod account;
pub mod contract;
pub mod hold;
pub mod match_record;
pub mod order;

pub use account::*;
pub use contract::*;
pub use hold::*;
pub use match_record::*;
pub use order::*;

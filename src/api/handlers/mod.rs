pub mod balances;
pub mod books;
pub mod contracts;
pub mod control;
pub mod diagnostics;
pub mod orders;

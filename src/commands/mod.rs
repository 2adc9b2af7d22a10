//! CLI command implementations
//!
//! Every command runs on an already initialised [`ConfigFlash`] session:
//! pins idle, clock set, flash woken and reset.
//!
//! [`ConfigFlash`]: trionprog_core::flash::ConfigFlash

mod erase;
mod info;
mod list;
mod program;

pub use erase::{run_erase_all, run_reconfigure};
pub use info::run_info;
pub use list::list_programmers;
pub use program::{run_verify, run_write};

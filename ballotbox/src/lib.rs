#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

mod api;
mod audit;
mod authority;
mod blinding;
mod election;
mod error;
mod keys;
mod ledger;
mod notary;
mod receipt;
mod results;
mod serde_hex;
mod signature;
mod tally;
mod vote;

pub use api::*;
pub use audit::*;
pub use authority::*;
pub use blinding::*;
pub use election::*;
pub use error::*;
pub use keys::*;
pub use ledger::*;
pub use notary::*;
pub use receipt::*;
pub use results::*;
pub use serde_hex::*;
pub use signature::*;
pub use tally::*;
pub use vote::*;

#[cfg(test)]
mod test_util;

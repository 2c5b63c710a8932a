//! Transaction wire types.

pub mod transactions;
pub mod txin;
pub mod txout;

pub use transactions::{Transaction, TxError, TxResult, Witness};
pub use txin::{Outpoint, TxIn};
pub use txout::TxOut;

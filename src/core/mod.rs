//! Pure attendance domain logic. Nothing in here touches the database;
//! handlers and the reconciliation job feed it snapshots and persist the
//! outcomes transactionally.

pub mod geo;
pub mod ledger;
pub mod qr;
pub mod state;

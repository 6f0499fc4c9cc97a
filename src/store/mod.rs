//! Storage helpers shared by the services.
//!
//! Every function is generic over [`sea_orm::ConnectionTrait`] so it can run
//! on the pooled connection or inside a `DatabaseTransaction`.

pub mod orders;
pub mod products;
pub mod promocodes;

//! Router Module Index
//!
//! Splits the routing table by access level. Authentication is applied as a
//! layer on the whole authenticated router, so a route cannot be exposed by
//! forgetting a check in its handler.

/// Routes reachable without a token: liveness and login.
pub mod public;

/// Routes behind the token middleware. Role and area checks happen in the
/// lifecycle layer through the authorization policy.
pub mod authenticated;

/// Router Module Index
///
/// Splits the routing table by access level. Authentication is attached to a
/// whole router with a route layer, so an endpoint is protected by where it is
/// registered rather than by each handler remembering to check.

/// Routes accessible to anyone (health, account entry points, read-only listings).
pub mod public;

/// Routes behind the `authenticate` middleware. Requires a valid access token.
pub mod authenticated;

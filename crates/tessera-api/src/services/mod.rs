// Business logic services
//
// Routes stay thin; row conversion and store access live here.

pub mod membership;

pub use membership::MembershipService;

pub mod identity;
pub mod profile;

pub use identity::IdentityService;
pub use profile::ProfileApiService;

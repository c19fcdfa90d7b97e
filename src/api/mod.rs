// REST backend access: the trait the core depends on and its HTTP client.

pub mod client;
pub mod traits;

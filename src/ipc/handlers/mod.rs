pub mod core;
pub mod drafts;
pub mod resources;
pub mod results;
pub mod session;

pub mod errors;
pub mod state;

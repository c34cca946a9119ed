pub mod card;
pub mod error;
pub mod server;

pub use card::SoftwareCard;
pub use error::CardError;
pub use server::{AppState, router, run, serve};

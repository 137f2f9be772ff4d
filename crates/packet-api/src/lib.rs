pub mod collection;
pub mod error;
pub mod routes;
pub mod signup;
pub mod state;

pub use routes::router;
pub use state::{AppState, AppStateInner};

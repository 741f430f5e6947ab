pub mod chat;
pub mod config;
pub mod discounts;
pub mod documents;
pub mod errors;
pub mod llm_client;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::build_router;
pub use state::AppState;

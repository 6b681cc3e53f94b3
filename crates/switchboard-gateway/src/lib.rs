mod clean;
mod routes;
mod server;
mod state;

pub use clean::clean_response;
pub use server::GatewayServer;

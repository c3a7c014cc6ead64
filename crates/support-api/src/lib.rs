pub mod events;
pub mod messages;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use support_gateway::dispatcher::Dispatcher;
use support_gateway::handlers::Relay;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub relay: Relay,
    /// Sockets held open by this process.
    pub dispatcher: Dispatcher,
}

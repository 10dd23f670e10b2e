use crate::use_cases::CommandGateway;

#[derive(Clone)]
pub struct AppState {
    // Every socket and HTTP route reaches rooms through the gateway.
    pub gateway: CommandGateway,
}

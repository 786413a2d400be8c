use std::sync::Arc;

use crate::auth::TokenDecoder;
use crate::config::Settings;
use crate::events;
use crate::hub::SocketServer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub token_decoder: Arc<TokenDecoder>,
    pub socket_server: Arc<SocketServer>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let token_decoder = Arc::new(TokenDecoder::new(&settings.jwt));
        let socket_server = Arc::new(SocketServer::new());

        // Namespace setup must precede any connection on that path.
        events::register_chat(&socket_server, token_decoder.clone());

        Self {
            settings: Arc::new(settings),
            token_decoder,
            socket_server,
        }
    }
}

mod settings;

pub use settings::{JwtConfig, ServerConfig, Settings};

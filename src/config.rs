//! Connection configuration: the parameters `Connection::init` needs,
//! assembled before the handshake (ambient, generalizing the teacher's
//! `ConnectionOptBuilder`/`AuthenticationMethod` in `conn.rs` to this
//! protocol's INIT fields). No file or URL loading — the caller already
//! has these values in hand (spec §1).

/// Scheme under which `principal`/`credentials` are interpreted during
/// INIT. Only `Basic` is meaningful to protocol v1's `{scheme, principal,
/// credentials}` auth map; kept as an enum so a future scheme doesn't
/// require a signature change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    None,
}

impl AuthScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthScheme::Basic => "basic",
            AuthScheme::None => "none",
        }
    }
}

/// Everything `Connection::init` needs to build the `INIT` message.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub user_agent: String,
    pub scheme: AuthScheme,
    pub principal: String,
    pub credentials: String,
}

impl ConnectionConfig {
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new()
    }
}

/// Builds a [`ConnectionConfig`]. `user_agent` is required; auth fields
/// default to [`AuthScheme::None`] with empty principal/credentials for
/// servers that allow anonymous connections.
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    user_agent: Option<String>,
    scheme: Option<AuthScheme>,
    principal: Option<String>,
    credentials: Option<String>,
}

impl ConnectionConfigBuilder {
    pub fn new() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> ConnectionConfigBuilder {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn basic_auth(mut self, principal: impl Into<String>, credentials: impl Into<String>) -> ConnectionConfigBuilder {
        self.scheme = Some(AuthScheme::Basic);
        self.principal = Some(principal.into());
        self.credentials = Some(credentials.into());
        self
    }

    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            user_agent: self.user_agent.unwrap_or_else(|| "bolt-core".to_string()),
            scheme: self.scheme.unwrap_or(AuthScheme::None),
            principal: self.principal.unwrap_or_default(),
            credentials: self.credentials.unwrap_or_default(),
        }
    }
}

use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared by the connect handler, the relay path and the REST
/// middleware. Issued by the user service; this workspace only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Support staff may attach to any user's thread.
    #[serde(alias = "SupportUser")]
    SupportAgent,
    RegisteredUser,
    Administrator,
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SupportAgent => "SupportAgent",
            Role::RegisteredUser => "RegisteredUser",
            Role::Administrator => "Administrator",
            Role::Other => "Other",
        }
    }

    /// Lenient parse used when reading stored rows.
    pub fn parse(s: &str) -> Self {
        match s {
            "SupportAgent" | "SupportUser" => Role::SupportAgent,
            "RegisteredUser" => Role::RegisteredUser,
            "Administrator" => Role::Administrator,
            _ => Role::Other,
        }
    }
}

impl Claims {
    /// Whether these claims may act on the support thread owned by `owner`.
    ///
    /// Support agents may act on every thread; registered users only on
    /// their own. Every other role is refused.
    pub fn may_access_thread(&self, owner: &str) -> bool {
        match self.role {
            Role::SupportAgent => true,
            Role::RegisteredUser => self.email == owner,
            Role::Administrator | Role::Other => false,
        }
    }
}

// -- WebSocket payloads --

/// Body of an inbound chat frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocketMessage {
    #[serde(default)]
    pub token: String,
    pub message: String,
}

/// Query parameters of a connect request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    pub token: Option<String>,
    pub user_email: Option<String>,
}

/// Sent back to the originating socket when its frame could not be relayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketError {
    pub error: String,
}

use std::fmt;

/// A credential for the remote media store.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
}

impl Credential {
    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        match self {
            Credential::Bearer(token) => format!("Bearer {}", token),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Credential::Bearer(<redacted>)"),
        }
    }
}

//! Admin-token check that decides whether a request's viewer is privileged.

use subtle::ConstantTimeEq;

#[derive(Clone, Default)]
pub struct PrivilegeGuard {
    admin_token: Option<Vec<u8>>,
}

impl PrivilegeGuard {
    /// `None` disables privilege entirely.
    pub fn new(admin_token: Option<String>) -> Self {
        Self {
            admin_token: admin_token.map(String::into_bytes),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.admin_token.is_some()
    }

    pub fn verify(&self, presented: &str) -> bool {
        match self.admin_token.as_deref() {
            Some(expected) => expected.ct_eq(presented.as_bytes()).unwrap_u8() == 1,
            None => false,
        }
    }
}

impl std::fmt::Debug for PrivilegeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivilegeGuard")
            .field("configured", &self.is_configured())
            .finish()
    }
}

//! Process-wide kill switch for snippet dispatch and embedding.

use crate::application::request::RequestContext;

pub const DEFAULT_SAFE_MODE_PARAM: &str = "safe_mode";

/// Markup shown to privileged viewers while safe mode suppresses every snippet.
pub const SAFE_MODE_BANNER: &str = "<div id=\"sniphook-safe-mode\" style=\"position:fixed;bottom:10px;right:10px;background:#dc3232;color:white;padding:15px 20px;z-index:999999;border-radius:4px;box-shadow:0 2px 8px rgba(0,0,0,0.3);font-weight:bold;\">Safe Mode Active</div>";

/// Reads the safe-mode signal from the request it is asked about.
///
/// Stateless: every call looks at the request again, so checks made at different
/// points of the same request agree with the request, not with an earlier answer.
#[derive(Debug, Clone)]
pub struct SafeModeGate {
    param: String,
}

impl SafeModeGate {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }

    /// Active only when the parameter is exactly `"1"`.
    pub fn is_active(&self, request: &RequestContext) -> bool {
        request.param(&self.param) == Some("1")
    }
}

impl Default for SafeModeGate {
    fn default() -> Self {
        Self::new(DEFAULT_SAFE_MODE_PARAM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::request::Viewer;

    #[test]
    fn only_literal_one_activates() {
        let gate = SafeModeGate::default();
        let base = RequestContext::new("req", Viewer::anonymous());

        assert!(!gate.is_active(&base));
        assert!(gate.is_active(&base.clone().with_param("safe_mode", "1")));
        assert!(!gate.is_active(&base.clone().with_param("safe_mode", "true")));
        assert!(!gate.is_active(&base.clone().with_param("safe_mode", " 1")));
        assert!(!gate.is_active(&base.with_param("other", "1")));
    }

    #[test]
    fn custom_parameter_name() {
        let gate = SafeModeGate::new("ccs_safe_mode");
        let request =
            RequestContext::new("req", Viewer::privileged()).with_param("ccs_safe_mode", "1");
        assert!(gate.is_active(&request));
        assert!(!SafeModeGate::default().is_active(&request));
    }
}

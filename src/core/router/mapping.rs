//! Logical capability to physical model mapping
//!
//! Every logical name the surrounding application may ask for resolves here.
//! Only the dual-homed DeepSeek chat capability involves a routing decision;
//! everything else is a fixed assignment known at compile time.

use crate::core::types::Provider;

/// The one logical capability served by two physical backends.
pub const DUAL_HOMED_CAPABILITY: &str = "deepseek-v3";

/// The reasoner capability. Dashscope's rate limit on this path is
/// permanently too small for production traffic, so it must never resolve
/// there, whatever the mapping table or strategy would pick.
pub const REASONER_CAPABILITY: &str = "deepseek-r1";

/// A resolved (provider, physical model) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedModel {
    /// The provider that should serve the call.
    pub provider: Provider,
    /// The backend-specific model identifier.
    pub model: &'static str,
}

/// Physical id of the dual-homed capability on each provider.
pub(super) fn dual_homed_model(provider: Provider) -> &'static str {
    match provider {
        Provider::Dashscope => "deepseek-v3",
        Provider::Volcengine => "deepseek-v3-250324",
    }
}

/// Fixed assignments for every capability that is not dual-homed.
pub(super) fn fixed_mapping(logical: &str) -> Option<ResolvedModel> {
    let (provider, model) = match logical {
        REASONER_CAPABILITY => (Provider::Dashscope, "deepseek-r1"),
        "qwen-plus" => (Provider::Dashscope, "qwen-plus"),
        "qwen-turbo" => (Provider::Dashscope, "qwen-turbo"),
        "qwen-max" => (Provider::Dashscope, "qwen-max"),
        "text-embedding" => (Provider::Dashscope, "text-embedding-v3"),
        _ => return None,
    };
    Some(ResolvedModel { provider, model })
}

/// The standing safety rule: if resolution produced the banned
/// (capability, provider) combination, substitute the other provider.
pub(super) fn forced_substitution(logical: &str, provider: Provider) -> Option<ResolvedModel> {
    if logical == REASONER_CAPABILITY && provider == Provider::Dashscope {
        return Some(ResolvedModel {
            provider: Provider::Volcengine,
            model: "deepseek-r1-250120",
        });
    }
    None
}

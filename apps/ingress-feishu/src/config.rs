use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use feishu_core::ReplyOptions;

pub const DEFAULT_BIND: &str = "0.0.0.0:8003";

/// Settings for the callback receiver, read from `FEISHU_*` variables.
#[derive(Clone, Debug)]
pub struct IngressConfig {
    pub bind: SocketAddr,
    pub app_id: String,
    pub app_secret: String,
    pub encrypt_key: String,
    pub verification_token: String,
    pub tenant_access_token: String,
    pub api_base: Option<String>,
}

impl IngressConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let bind = lookup("BIND").unwrap_or_else(|| DEFAULT_BIND.into());
        let bind = bind
            .parse()
            .with_context(|| format!("invalid BIND address {bind}"))?;

        Ok(Self {
            bind,
            app_id: get("FEISHU_APP_ID"),
            app_secret: get("FEISHU_APP_SECRET"),
            encrypt_key: get("FEISHU_ENCRYPT_KEY"),
            verification_token: get("FEISHU_VERIFICATION_TOKEN"),
            tenant_access_token: get("FEISHU_TENANT_ACCESS_TOKEN"),
            api_base: lookup("FEISHU_API_BASE").filter(|v| !v.trim().is_empty()),
        })
    }

    /// Replies need either a ready token or app credentials to fetch one.
    pub fn replies_enabled(&self) -> bool {
        !self.tenant_access_token.is_empty()
            || (!self.app_id.is_empty() && !self.app_secret.is_empty())
    }

    pub fn reply_options(&self) -> ReplyOptions {
        ReplyOptions {
            app_id: self.app_id.clone(),
            app_secret: self.app_secret.clone(),
            tenant_access_token: self.tenant_access_token.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

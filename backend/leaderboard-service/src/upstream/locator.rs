use super::Resource;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBase { url: String, reason: String },

    #[error("Cannot resolve {path}: {reason}")]
    Unresolvable { path: String, reason: String },
}

/// Root of one upstream API version, validated once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiLocator {
    base: Url,
}

impl ApiLocator {
    pub fn new(base_url: &str, version: &str) -> Result<Self, LocatorError> {
        let invalid = |reason: &str| LocatorError::InvalidBase {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };

        let version = version.trim_matches('/');
        let root = if version.is_empty() {
            format!("{}/", base_url.trim_end_matches('/'))
        } else {
            format!("{}/{}/", base_url.trim_end_matches('/'), version)
        };

        let base = Url::parse(&root).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed"));
        }

        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn resolve(&self, resource: &Resource) -> Result<Url, LocatorError> {
        if resource.path.starts_with('/') || resource.path.contains("://") {
            return Err(LocatorError::Unresolvable {
                path: resource.path.clone(),
                reason: "path must be relative to the API root".to_string(),
            });
        }

        let mut url = self
            .base
            .join(&resource.path)
            .map_err(|e| LocatorError::Unresolvable {
                path: resource.path.clone(),
                reason: e.to_string(),
            })?;

        if !resource.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&resource.query);
        }
        Ok(url)
    }
}

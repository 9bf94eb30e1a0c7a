//! URL utilities for media server addresses

use url::Url;

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Validate a media server base URL and return it without trailing slashes
    ///
    /// Only `http` and `https` are accepted, and a host is required.
    ///
    /// ```rust
    /// use flussonic_manager::utils::url::UrlUtils;
    ///
    /// assert_eq!(
    ///     UrlUtils::normalize_base_url("http://edge.example.com:8080/").unwrap(),
    ///     "http://edge.example.com:8080"
    /// );
    /// assert!(UrlUtils::normalize_base_url("edge.example.com").is_err());
    /// ```
    pub fn normalize_base_url(url: &str) -> Result<String, String> {
        let trimmed = url.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(format!(
                "Server URL must start with http:// or https://: '{}'",
                Self::obfuscate_credentials(trimmed)
            ));
        }

        let parsed = Url::parse(trimmed).map_err(|e| format!("Invalid server URL: {e}"))?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err("Server URL must include a host".to_string());
        }

        Ok(trimmed.trim_end_matches('/').to_string())
    }

    /// Replace userinfo credentials with `****` so URLs are safe to log
    pub fn obfuscate_credentials(url: &str) -> String {
        match Url::parse(url) {
            Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
                let _ = parsed.set_username("****");
                let _ = parsed.set_password(Some("****"));
                parsed.to_string()
            }
            _ => url.to_string(),
        }
    }
}

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    pub site: SiteConfig,
    pub mail: MailConfig,
}

/// Public identity of the blog, used for absolute links, the feed and the sitemap.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SiteConfig {
    pub base_url: String,
    pub title: String,
    pub description: String,
}

impl SiteConfig {
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            title: "My blog".into(),
            description: "New posts of my blog.".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MailConfig {
    pub from_address: String,
    /// HTTP relay that delivers messages; when absent mail is only logged.
    pub relay_url: Option<String>,
    pub relay_token: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: "blog@localhost".into(),
            relay_url: None,
            relay_token: None,
        }
    }
}

/// Origin value that opens the API to every site.
pub const ANY_ORIGIN: &str = "*";

/// Comma separated `CORS_ORIGINS`; unset means any origin.
pub fn parse_cors_origins(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or(ANY_ORIGIN)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid PORT: {}", e))?;
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let cors_origins = parse_cors_origins(std::env::var("CORS_ORIGINS").ok().as_deref());

        let site_defaults = SiteConfig::default();
        let site = SiteConfig {
            base_url: optional_var("SITE_URL").unwrap_or_else(|| format!("http://{}:{}", host, port)),
            title: optional_var("BLOG_TITLE").unwrap_or(site_defaults.title),
            description: optional_var("BLOG_DESCRIPTION").unwrap_or(site_defaults.description),
        };

        let mail = MailConfig {
            from_address: optional_var("MAIL_FROM")
                .unwrap_or_else(|| MailConfig::default().from_address),
            relay_url: optional_var("MAIL_RELAY_URL"),
            relay_token: optional_var("MAIL_RELAY_TOKEN"),
        };

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            cors_origins,
            site,
            mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_url_joins_without_double_slash() {
        let site = SiteConfig {
            base_url: "https://blog.example.com/".into(),
            ..SiteConfig::default()
        };
        assert_eq!(
            site.absolute_url("/api/posts/2024/1/2/hello"),
            "https://blog.example.com/api/posts/2024/1/2/hello"
        );
    }

    #[test]
    fn cors_origins_default_to_any() {
        assert_eq!(parse_cors_origins(None), vec![ANY_ORIGIN.to_string()]);
        assert_eq!(
            parse_cors_origins(Some(" https://a.example , ,https://b.example")),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}

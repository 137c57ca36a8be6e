//! RSS feed and sitemap rendering over published posts.

use serde::Serialize;
use tera::{Context, Tera};
use tracing::error;

use crate::domain::error::DomainError;
use crate::domain::post::Post;
use crate::infrastructure::config::SiteConfig;

pub const FEED_ITEMS: usize = 5;
const FEED_DESCRIPTION_CHARS: usize = 30;

const FEED_TEMPLATE: &str = include_str!("../../templates/feed.xml");
const SITEMAP_TEMPLATE: &str = include_str!("../../templates/sitemap.xml");

#[derive(Debug, Serialize)]
struct FeedItem {
    title: String,
    link: String,
    description: String,
    pub_date: String,
}

#[derive(Debug, Serialize)]
struct SitemapUrl {
    loc: String,
    lastmod: String,
}

/// Shortens `text` to at most `max` characters, ending in an ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

// Text nodes only need `&`, `<` and `>` escaped; links stay readable.
fn escape_text(input: &str) -> String {
    html_escape::encode_text(input).into_owned()
}

/// Feed and sitemap templates bound to the site they describe.
pub struct Syndication {
    tera: Tera,
    site: SiteConfig,
}

impl Syndication {
    pub fn new(site: SiteConfig) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".xml"]);
        tera.set_escape_fn(escape_text);
        tera.add_raw_templates(vec![
            ("feed.xml", FEED_TEMPLATE),
            ("sitemap.xml", SITEMAP_TEMPLATE),
        ])?;
        Ok(Self { tera, site })
    }

    fn render(&self, template: &str, context: &Context) -> Result<String, DomainError> {
        self.tera.render(template, context).map_err(|e| {
            error!("failed to render {}: {}", template, e);
            DomainError::Internal(e.to_string())
        })
    }

    pub fn render_feed(&self, posts: &[Post]) -> Result<String, DomainError> {
        let items: Vec<FeedItem> = posts
            .iter()
            .filter(|p| p.is_published())
            .take(FEED_ITEMS)
            .map(|post| FeedItem {
                title: post.title.clone(),
                link: self.site.absolute_url(&post.canonical_path()),
                description: truncate_chars(&post.body, FEED_DESCRIPTION_CHARS),
                pub_date: post.publish.to_rfc2822(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("title", &self.site.title);
        context.insert("link", &self.site.absolute_url("/api/posts"));
        context.insert("description", &self.site.description);
        context.insert("items", &items);
        self.render("feed.xml", &context)
    }

    pub fn render_sitemap(&self, posts: &[Post]) -> Result<String, DomainError> {
        let urls: Vec<SitemapUrl> = posts
            .iter()
            .filter(|p| p.is_published())
            .map(|post| SitemapUrl {
                loc: self.site.absolute_url(&post.canonical_path()),
                lastmod: post.updated_at.format("%Y-%m-%d").to_string(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("urls", &urls);
        self.render("sitemap.xml", &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::PostStatus;
    use uuid::Uuid;

    fn post(title: &str, body: &str, status: PostStatus) -> Post {
        Post::new(Uuid::new_v4(), title.into(), None, body.into(), status, None, vec![])
    }

    fn syndication() -> Syndication {
        Syndication::new(SiteConfig::default()).unwrap()
    }

    #[test]
    fn truncation_matches_char_budget() {
        assert_eq!(truncate_chars("short", 30), "short");
        let long = "a".repeat(40);
        let cut = truncate_chars(&long, 30);
        assert_eq!(cut.chars().count(), 30);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate_chars("привет мир", 7), "привет…");
    }

    #[test]
    fn feed_is_capped_and_escaped() {
        let mut posts: Vec<Post> = (0..7)
            .map(|i| post(&format!("Post {i}"), "body", PostStatus::Published))
            .collect();
        posts.insert(0, post("Tom & Jerry <3", &"x".repeat(100), PostStatus::Published));

        let xml = syndication().render_feed(&posts).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(xml.matches("<item>").count(), FEED_ITEMS);
        assert!(xml.contains("<title>Tom &amp; Jerry &lt;3</title>"));
        assert!(xml.contains(&format!("<description>{}…</description>", "x".repeat(29))));
        assert!(xml.contains("<title>My blog</title>"));
        assert!(xml.contains("<link>http://127.0.0.1:8080/api/posts</link>"));
    }

    #[test]
    fn feed_skips_drafts() {
        let posts = vec![
            post("Draft", "body", PostStatus::Draft),
            post("Live", "body", PostStatus::Published),
        ];
        let xml = syndication().render_feed(&posts).unwrap();
        assert_eq!(xml.matches("<item>").count(), 1);
        assert!(!xml.contains("Draft"));
    }

    #[test]
    fn sitemap_lists_only_published_posts() {
        let posts = vec![
            post("Live", "body", PostStatus::Published),
            post("Hidden", "body", PostStatus::Draft),
        ];
        let xml = syndication().render_sitemap(&posts).unwrap();
        assert_eq!(xml.matches("<url>").count(), 1);
        assert!(xml.contains("/live</loc>"));
        assert!(xml.contains("<changefreq>weekly</changefreq><priority>0.9</priority>"));
    }

    #[test]
    fn empty_sitemap_is_still_a_urlset() {
        let xml = syndication().render_sitemap(&[]).unwrap();
        assert!(xml.contains("<urlset"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }
}

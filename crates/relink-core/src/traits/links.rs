//! Link construction.

use crate::types::BaseUrl;

/// Builds the URLs placed in `links` objects.
pub trait UrlBuilder: Send + Sync {
    /// Build `<base>/<type_plural>[/<id>[/<relation>]]`.
    fn build(&self, type_plural: &str, id: Option<&str>, relation: Option<&str>) -> String;

    /// Build the relationship-endpoint URL
    /// `<base>/<type_plural>/<id>/relationships/<relation>`.
    fn relationship(&self, type_plural: &str, id: &str, relation: &str) -> String {
        let path = format!("relationships/{}", relation);
        self.build(type_plural, Some(id), Some(&path))
    }
}

/// Default [`UrlBuilder`]: host plus base path.
///
/// Without a host the links are root-relative (`/api/posts/1`).
#[derive(Debug, Clone, Default)]
pub struct LinkBuilder {
    host: Option<BaseUrl>,
    base_path: String,
}

impl LinkBuilder {
    /// Create a link builder for an absolute host and base path.
    pub fn new(host: BaseUrl, base_path: impl AsRef<str>) -> Self {
        Self {
            host: Some(host),
            base_path: normalize_path(base_path.as_ref()),
        }
    }

    /// Create a link builder producing root-relative links.
    pub fn relative(base_path: impl AsRef<str>) -> Self {
        Self {
            host: None,
            base_path: normalize_path(base_path.as_ref()),
        }
    }

    /// The configured host, if any.
    pub fn host(&self) -> Option<&BaseUrl> {
        self.host.as_ref()
    }

    /// The normalized base path (`""` or `/segment...`).
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl UrlBuilder for LinkBuilder {
    fn build(&self, type_plural: &str, id: Option<&str>, relation: Option<&str>) -> String {
        let mut url = String::new();
        if let Some(host) = &self.host {
            url.push_str(host.as_str());
        }
        url.push_str(&self.base_path);
        url.push('/');
        url.push_str(type_plural);
        if let Some(id) = id {
            url.push('/');
            url.push_str(id);
            if let Some(relation) = relation {
                url.push('/');
                url.push_str(relation);
            }
        }
        url
    }
}

// "api/" -> "/api", "/" -> ""
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_related_link() {
        let links = LinkBuilder::new(BaseUrl::new("http://localhost:3000").unwrap(), "/api");
        assert_eq!(
            links.build("posts", Some("1"), Some("author")),
            "http://localhost:3000/api/posts/1/author"
        );
    }

    #[test]
    fn builds_collection_and_resource_links() {
        let links = LinkBuilder::new(BaseUrl::new("https://example.com/").unwrap(), "api/");
        assert_eq!(links.build("posts", None, None), "https://example.com/api/posts");
        assert_eq!(
            links.build("posts", Some("7"), None),
            "https://example.com/api/posts/7"
        );
    }

    #[test]
    fn relationship_link_has_relationships_segment() {
        let links = LinkBuilder::relative("/");
        assert_eq!(
            links.relationship("movies", "1", "categories"),
            "/movies/1/relationships/categories"
        );
    }
}

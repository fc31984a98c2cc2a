//! # Request Router
//!
//! Decides whether the worker intercepts a request and, if it does, which
//! strategy and partition serve it.

use serde::Serialize;

use crate::cache::PartitionKind;
use crate::config::RoutingConfig;
use crate::fetch::{Destination, Request};

/// How a routed request is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    StaleWhileRevalidate,
    NetworkFirst,
}

/// Strategy plus the partition responses are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub strategy: Strategy,
    pub partition: PartitionKind,
}

impl Route {
    const fn new(strategy: Strategy, partition: PartitionKind) -> Self {
        Self {
            strategy,
            partition,
        }
    }
}

/// Classifies requests using the first matching rule:
///
/// 1. fonts → cache-first, fonts
/// 2. images and icons → stale-while-revalidate, images
/// 3. stylesheets, scripts and the CDN libraries → cache-first, static
/// 4. documents and the root page → cache-first, static
/// 5. the manifest → cache-first, static
/// 6. anything else → network-first, dynamic
///
/// The rules overlap (an `/assets/` URL ending in `.css` is an image here);
/// the order above is the tie-break.
#[derive(Debug, Clone, Default)]
pub struct Router {
    rules: RoutingConfig,
}

impl Router {
    pub fn new(rules: RoutingConfig) -> Self {
        Self { rules }
    }

    /// Only GET over http(s) is intercepted; everything else passes through
    pub fn intercepts(&self, request: &Request) -> bool {
        request.is_http() && request.is_get()
    }

    pub fn classify(&self, request: &Request) -> Route {
        let url = request.url.as_str();
        let contains_any = |markers: &[String]| markers.iter().any(|m| url.contains(m.as_str()));

        if contains_any(&self.rules.font_markers) {
            return Route::new(Strategy::CacheFirst, PartitionKind::Fonts);
        }

        if request.destination == Destination::Image || contains_any(&self.rules.image_markers) {
            return Route::new(Strategy::StaleWhileRevalidate, PartitionKind::Images);
        }

        if self
            .rules
            .asset_suffixes
            .iter()
            .any(|suffix| url.ends_with(suffix.as_str()))
            || contains_any(&self.rules.library_markers)
        {
            return Route::new(Strategy::CacheFirst, PartitionKind::Static);
        }

        let path = request.url.path();
        if request.destination == Destination::Document
            || url.ends_with(self.rules.document_suffix.as_str())
            || self.rules.root_paths.iter().any(|root| path == root)
        {
            return Route::new(Strategy::CacheFirst, PartitionKind::Static);
        }

        if url.contains(self.rules.manifest_marker.as_str()) {
            return Route::new(Strategy::CacheFirst, PartitionKind::Static);
        }

        Route::new(Strategy::NetworkFirst, PartitionKind::Dynamic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use url::Url;

    fn request(url: &str, destination: Destination) -> Request {
        Request::new(Method::GET, Url::parse(url).unwrap(), destination)
    }

    fn route(url: &str, destination: Destination) -> Route {
        Router::default().classify(&request(url, destination))
    }

    #[test]
    fn fonts_are_cache_first() {
        let expected = Route::new(Strategy::CacheFirst, PartitionKind::Fonts);
        assert_eq!(route("https://shop.example/fonts/poppins-400.woff2", Destination::Font), expected);
        assert_eq!(route("https://cdn.example/x.woff2", Destination::Empty), expected);
        // Font markers win over image destination
        assert_eq!(route("https://shop.example/fonts/glyphs.svg", Destination::Image), expected);
    }

    #[test]
    fn images_are_stale_while_revalidate() {
        let expected = Route::new(Strategy::StaleWhileRevalidate, PartitionKind::Images);
        assert_eq!(route("https://shop.example/photo.webp", Destination::Image), expected);
        assert_eq!(route("https://shop.example/icons/icon-72x72.svg", Destination::Empty), expected);
        // Overlap: an /assets/ stylesheet is routed as an image
        assert_eq!(route("https://shop.example/assets/main-abc123.css", Destination::Style), expected);
    }

    #[test]
    fn scripts_styles_and_libraries_are_static() {
        let expected = Route::new(Strategy::CacheFirst, PartitionKind::Static);
        assert_eq!(route("https://shop.example/styles.css", Destination::Style), expected);
        assert_eq!(route("https://shop.example/main-abc.js", Destination::Script), expected);
        assert_eq!(
            route("https://cdn.jsdelivr.net/npm/lodash@4.17.21/lodash.min.js", Destination::Script),
            expected
        );
        assert_eq!(route("https://unpkg.com/mithril", Destination::Script), expected);
    }

    #[test]
    fn documents_and_manifest_are_static() {
        let expected = Route::new(Strategy::CacheFirst, PartitionKind::Static);
        assert_eq!(route("https://shop.example/", Destination::Empty), expected);
        assert_eq!(route("https://shop.example/index.html", Destination::Empty), expected);
        assert_eq!(route("https://shop.example/medios-de-pago.html", Destination::Empty), expected);
        assert_eq!(route("https://shop.example/catalog?q=1", Destination::Document), expected);
        assert_eq!(route("https://shop.example/manifest.json", Destination::Manifest), expected);
    }

    #[test]
    fn everything_else_is_network_first() {
        assert_eq!(
            route("https://shop.example/api/products.json", Destination::Empty),
            Route::new(Strategy::NetworkFirst, PartitionKind::Dynamic)
        );
        // A query string defeats the suffix test
        assert_eq!(
            route("https://shop.example/data.js?v=2", Destination::Empty),
            Route::new(Strategy::NetworkFirst, PartitionKind::Dynamic)
        );
    }

    #[test]
    fn only_http_get_is_intercepted() {
        let router = Router::default();
        let url = Url::parse("https://shop.example/api/order").unwrap();

        assert!(router.intercepts(&Request::get(url.clone())));
        assert!(!router.intercepts(&Request::new(Method::POST, url.clone(), Destination::Empty)));
        assert!(!router.intercepts(&Request::new(Method::PUT, url, Destination::Empty)));
        assert!(!router.intercepts(&Request::get(
            Url::parse("chrome-extension://abc/script.js").unwrap()
        )));
        assert!(!router.intercepts(&Request::get(Url::parse("data:text/plain,hi").unwrap())));
    }

    #[test]
    fn custom_library_markers() {
        let router = Router::new(RoutingConfig {
            library_markers: vec!["htmx".into()],
            ..Default::default()
        });
        let route = router.classify(&request("https://unpkg.com/htmx.org", Destination::Empty));
        assert_eq!(route, Route::new(Strategy::CacheFirst, PartitionKind::Static));
    }
}

//! Offline network interceptor with versioned, atomic precaching

use crate::error::{GreenroomError, GreenroomResult};
use crate::offline::fetch::{Method, NetworkFetcher, Request, Response};
use crate::offline::storage::CacheStorage;
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix for versioned precache namespaces
pub const CACHE_PREFIX: &str = "greenroom-static";

/// Fixed ordered list of resources to precache, versioned by the
/// deploy it belongs to.
///
/// The version must change whenever the resource list (or its content)
/// changes, so a stale precache from a previous deploy can be discarded
/// by the cleanup collaborator on the next install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheManifest {
    version: String,
    resources: Vec<String>,
}

impl PrecacheManifest {
    /// Create a manifest for `version` covering `resources`
    pub fn new(
        version: impl Into<String>,
        resources: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            version: version.into(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// The deploy version this manifest belongs to
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resource paths, in install order
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// The namespace this version's precache lives under
    pub fn cache_name(&self) -> String {
        format!("{CACHE_PREFIX}-{}", self.version)
    }
}

/// Intercepts every outbound request at the network boundary.
///
/// Cache-first: an exact precache match is served without touching the
/// network; everything else is forwarded and returned as-is, with no
/// write-back on miss. The precache is populated only by
/// [`install`](OfflineInterceptor::install).
pub struct OfflineInterceptor<S: CacheStorage> {
    storage: Arc<S>,
    manifest: PrecacheManifest,
}

impl<S: CacheStorage> OfflineInterceptor<S> {
    /// Create an interceptor serving `manifest`'s version from `storage`
    pub fn new(storage: Arc<S>, manifest: PrecacheManifest) -> Self {
        Self { storage, manifest }
    }

    /// The manifest this interceptor serves
    pub fn manifest(&self) -> &PrecacheManifest {
        &self.manifest
    }

    /// Populate the versioned precache, all-or-nothing.
    ///
    /// Every manifest resource is fetched and staged; any fetch error or
    /// non-2xx response fails the whole install and nothing is retained.
    /// On success the staged set is committed in a single step.
    pub async fn install<F>(&self, fetcher: &F) -> GreenroomResult<()>
    where
        F: NetworkFetcher + ?Sized,
    {
        let cache_name = self.manifest.cache_name();
        let mut staged = Vec::with_capacity(self.manifest.resources().len());

        for path in self.manifest.resources() {
            let request = Request::get(path.clone());
            let response = fetcher
                .fetch(&request)
                .await
                .map_err(|e| GreenroomError::precache(path, e.to_string()))?;
            if !response.ok() {
                return Err(GreenroomError::precache(
                    path,
                    format!("status {}", response.status),
                ));
            }
            staged.push((path.clone(), response));
        }

        let count = staged.len();
        self.storage.put_all(&cache_name, staged);
        info!(cache = %cache_name, resources = count, "precache installed");
        Ok(())
    }

    /// Handle an intercepted request.
    ///
    /// GET requests with an exact precache match are served from cache;
    /// everything else goes to the network, surfacing whatever it yields.
    pub async fn handle<F>(&self, fetcher: &F, request: &Request) -> GreenroomResult<Response>
    where
        F: NetworkFetcher + ?Sized,
    {
        if request.method == Method::Get {
            if let Some(cached) = self.storage.get(&self.manifest.cache_name(), &request.url) {
                debug!(url = %request.url, "serving precached response");
                return Ok(cached);
            }
        }
        fetcher.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted network: url -> response, everything else fails
    struct FakeNetwork {
        routes: HashMap<String, Response>,
        fetches: AtomicUsize,
    }

    impl FakeNetwork {
        fn new(routes: impl IntoIterator<Item = (&'static str, Response)>) -> Self {
            Self {
                routes: routes
                    .into_iter()
                    .map(|(url, response)| (url.to_string(), response))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NetworkFetcher for FakeNetwork {
        async fn fetch(&self, request: &Request) -> GreenroomResult<Response> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.routes
                .get(&request.url)
                .cloned()
                .ok_or_else(|| GreenroomError::fetch(&request.url, "unreachable"))
        }
    }

    fn booking_manifest() -> PrecacheManifest {
        PrecacheManifest::new(
            "v3",
            ["/", "/venues", "/assets/app.js", "/assets/app.css", "/manifest.json"],
        )
    }

    fn full_routes() -> Vec<(&'static str, Response)> {
        vec![
            ("/", Response::new(200, "<html>").with_content_type("text/html")),
            ("/venues", Response::new(200, "<html>")),
            ("/assets/app.js", Response::new(200, "js")),
            ("/assets/app.css", Response::new(200, "css")),
            ("/manifest.json", Response::new(200, "{}")),
        ]
    }

    #[test]
    fn cache_name_is_versioned() {
        assert_eq!(booking_manifest().cache_name(), "greenroom-static-v3");
        let next = PrecacheManifest::new("v4", ["/"]);
        assert_ne!(next.cache_name(), booking_manifest().cache_name());
    }

    #[tokio::test]
    async fn install_then_serve_without_network() {
        let storage = Arc::new(MemoryStorage::new());
        let interceptor = OfflineInterceptor::new(Arc::clone(&storage), booking_manifest());
        let network = FakeNetwork::new(full_routes());

        interceptor.install(&network).await.unwrap();
        assert_eq!(network.fetch_count(), 5);

        let response = interceptor
            .handle(&network, &Request::get("/venues"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        // Served from cache: no additional network traffic
        assert_eq!(network.fetch_count(), 5);
    }

    #[tokio::test]
    async fn failed_install_retains_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let interceptor = OfflineInterceptor::new(Arc::clone(&storage), booking_manifest());
        // Stylesheet missing: fourth fetch fails
        let mut routes = full_routes();
        routes.retain(|(url, _)| *url != "/assets/app.css");
        let network = FakeNetwork::new(routes);

        let err = interceptor.install(&network).await.unwrap_err();
        assert!(matches!(err, GreenroomError::PrecacheInstall { .. }));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn non_2xx_fails_install() {
        let storage = Arc::new(MemoryStorage::new());
        let interceptor = OfflineInterceptor::new(Arc::clone(&storage), booking_manifest());
        let mut routes = full_routes();
        routes.push(("/assets/app.js", Response::new(503, "down")));
        let network = FakeNetwork::new(routes);

        assert!(interceptor.install(&network).await.is_err());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn miss_forwards_to_network() {
        let storage = Arc::new(MemoryStorage::new());
        let interceptor = OfflineInterceptor::new(Arc::clone(&storage), booking_manifest());
        let network = FakeNetwork::new([("/api/slots", Response::new(200, "[]"))]);

        let response = interceptor
            .handle(&network, &Request::get("/api/slots"))
            .await
            .unwrap();
        assert_eq!(response.body, b"[]");
        assert_eq!(network.fetch_count(), 1);

        // No write-back on miss: a second hit goes to the network again
        interceptor
            .handle(&network, &Request::get("/api/slots"))
            .await
            .unwrap();
        assert_eq!(network.fetch_count(), 2);
    }

    #[tokio::test]
    async fn offline_miss_surfaces_network_error() {
        let storage = Arc::new(MemoryStorage::new());
        let interceptor = OfflineInterceptor::new(Arc::clone(&storage), booking_manifest());
        let network = FakeNetwork::new([]);

        let err = interceptor
            .handle(&network, &Request::get("/api/slots"))
            .await
            .unwrap_err();
        assert!(matches!(err, GreenroomError::Fetch { .. }));
    }

    #[tokio::test]
    async fn writes_always_reach_the_network() {
        let storage = Arc::new(MemoryStorage::new());
        let interceptor = OfflineInterceptor::new(Arc::clone(&storage), booking_manifest());
        let network = FakeNetwork::new(full_routes());
        interceptor.install(&network).await.unwrap();

        // Same url as a precached GET, but a POST must not match
        interceptor
            .handle(&network, &Request::new(Method::Post, "/venues"))
            .await
            .unwrap();
        assert_eq!(network.fetch_count(), 6);
    }
}

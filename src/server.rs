use std::io::ErrorKind;
use std::sync::Arc;
use std::{fs, io};

use chrono::Utc;
use ntex::http::{Method, StatusCode};
use ntex::util::Bytes;
use ntex::web;
use ntex::web::HttpRequest;
use ntex_files::NamedFile;
use serde::Deserialize;
use serde_json::json;
use spdlog::{debug, error, info, warn};

use crate::config::Config;
use crate::content::resolver::{NewPost, PostResolver};
use crate::content_cache::{ContentCache, Expire};
use crate::error::BlogError;
use crate::language::{Language, DEFAULT_LANGUAGE};
use crate::query_string::QueryString;
use crate::routing::lang_path::{build_localized_path, normalize_path};
use crate::routing::route_match::{classify, repair_malformed_path, RouteMatch};
use crate::seo::head::{head_tags, inject_head, render_head_tags};
use crate::seo::sitemap::{append_post, sitemap_file_name};
use crate::seo::translations::TranslationIndex;

const INDEX_CACHE_KEY: &str = "translations";

pub struct AppState {
    resolver: PostResolver,
    index_cache: ContentCache<TranslationIndex>,
    index_expire: Option<Expire>,
    config: Config,
}

impl AppState {
    pub fn new(config: Config, resolver: PostResolver) -> Self {
        let index_expire = Expire::from_secs(config.cache.index_ttl_secs);
        let index_cache = match index_expire {
            Some(_) => ContentCache::new(),
            None => ContentCache::non_caching(),
        };

        AppState {
            resolver,
            index_cache,
            index_expire,
            config,
        }
    }

    pub fn from_config(config: Config) -> crate::error::Result<Self> {
        let resolver = PostResolver::from_config(config.paths.content_dir.clone(), &config.storage)?;
        Ok(Self::new(config, resolver))
    }

    async fn translation_index(&self) -> Arc<TranslationIndex> {
        let Some(expire) = self.index_expire else {
            return Arc::new(self.resolver.translation_index().await);
        };

        if let Some(index) = self.index_cache.get(INDEX_CACHE_KEY) {
            return index;
        }
        let index = self.resolver.translation_index().await;
        self.index_cache.add(INDEX_CACHE_KEY, index, expire)
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PostFields {
    title: Option<String>,
    date: Option<String>,
    category: Option<String>,
    excerpt: Option<String>,
    cover_image: Option<String>,
    author: Option<String>,
}

/// Body of `POST /api/blog`. Metadata may come nested under `meta` or as
/// top-level fields; the nested value wins.
#[derive(Deserialize)]
struct CreatePostBody {
    slug: Option<String>,
    content: Option<String>,
    language: Option<String>,
    meta: Option<PostFields>,
    #[serde(flatten)]
    flat: PostFields,
}

impl CreatePostBody {
    fn into_new_post(self) -> Result<NewPost, BlogError> {
        let language = match self.language.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => DEFAULT_LANGUAGE,
            Some(code) => code.parse::<Language>().map_err(BlogError::Validation)?,
        };

        let meta = self.meta.unwrap_or_default();
        let flat = self.flat;
        let pick = |nested: Option<String>, top: Option<String>| nested.or(top).unwrap_or_default();

        Ok(NewPost {
            slug: self.slug.unwrap_or_default().trim().to_string(),
            language,
            title: pick(meta.title, flat.title),
            date: pick(meta.date, flat.date),
            category: pick(meta.category, flat.category),
            excerpt: pick(meta.excerpt, flat.excerpt),
            cover_image: pick(meta.cover_image, flat.cover_image),
            author: pick(meta.author, flat.author),
            content: self.content.unwrap_or_default(),
        })
    }
}

fn error_response(err: &BlogError) -> web::HttpResponse {
    match err {
        BlogError::NotFound => debug!("{}", err),
        BlogError::Validation(_) | BlogError::Conflict => info!("Rejected request: {}", err),
        _ => error!("Blog API failure: {}", err),
    }

    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    web::HttpResponse::build(status)
        .json(&json!({ "success": false, "message": err.client_message() }))
}

async fn blog_read(req: HttpRequest, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let qs = QueryString::from(req.uri().query().unwrap_or(""));
    let language = match qs.get_lang() {
        Ok(language) => language,
        Err(e) => return error_response(&BlogError::Validation(e)),
    };

    match qs.get_slug() {
        None => {
            let posts = state.resolver.list(language).await;
            web::HttpResponse::Ok().json(&json!({ "success": true, "data": posts }))
        }
        Some(slug) => match state.resolver.get(slug, language).await {
            Ok(post) => web::HttpResponse::Ok().json(&json!({ "success": true, "data": post })),
            Err(e) => error_response(&e),
        },
    }
}

async fn blog_create(body: Bytes, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let request: CreatePostBody = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return error_response(&BlogError::Validation(format!("Invalid JSON body: {}", e))),
    };

    let new_post = match request.into_new_post() {
        Ok(new_post) => new_post,
        Err(e) => return error_response(&e),
    };

    let created = match state.resolver.create(new_post).await {
        Ok(created) => created,
        Err(e) => return error_response(&e),
    };

    state.index_cache.invalidate(INDEX_CACHE_KEY);

    let sitemap = state.config.paths.public_dir.join(sitemap_file_name(Some(created.language)));
    let loc = format!(
        "{}{}",
        state.config.site.base_url,
        build_localized_path(&format!("/blog/{}", created.slug), created.language)
    );
    let today = Utc::now().format("%Y-%m-%d").to_string();
    if let Err(e) = append_post(&sitemap, &loc, &today) {
        warn!("Could not update {}: {}", sitemap.display(), e);
    }

    web::HttpResponse::Created().json(&json!({ "success": true, "url": created.url }))
}

#[web::get("/public/{file_name}")]
async fn public_files(path: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> Result<NamedFile, web::Error> {
    if path.contains("..") {
        return Err(web::error::ErrorUnauthorized("Access forbidden").into());
    }

    let file_path = state.config.paths.public_dir.join(path.into_inner());

    Ok(NamedFile::open(file_path)?)
}

/// `Some(None)` for the master sitemap, `Some(Some(lang))` for a language one.
fn sitemap_request(path: &str) -> Option<Option<Language>> {
    let name = path.strip_prefix('/')?;
    if name == sitemap_file_name(None) {
        return Some(None);
    }
    let code = name.strip_prefix("sitemap-")?.strip_suffix(".xml")?;
    let language = Language::from_code(code).filter(|lang| lang.code() == code)?;
    Some(Some(language))
}

fn serve_sitemap(state: &AppState, language: Option<Language>) -> web::HttpResponse {
    let path = state.config.paths.public_dir.join(sitemap_file_name(language));
    match fs::read_to_string(&path) {
        Ok(xml) => web::HttpResponse::Ok()
            .content_type("application/xml; charset=utf-8")
            .body(xml),
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                error!("Error reading {}: {}", path.display(), e);
            }
            web::HttpResponse::NotFound().finish()
        }
    }
}

fn redirect(location: &str) -> web::HttpResponse {
    web::HttpResponse::MovedPermanently()
        .header("Location", location)
        .finish()
}

fn render_shell(state: &AppState, path: &str, index: &TranslationIndex) -> io::Result<String> {
    let shell = fs::read_to_string(&state.config.paths.shell_file)?;
    let tags = head_tags(&state.config.site.base_url, path, index);
    let rendered = render_head_tags(&tags)?;
    Ok(inject_head(&shell, &rendered))
}

/// Every request no other service claims: the application shell, with the
/// status code and head tags derived from the path.
pub async fn spa_shell(req: HttpRequest, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return web::HttpResponse::MethodNotAllowed().finish();
    }

    if let Some(target) = repair_malformed_path(req.path()) {
        info!("Redirecting malformed path {} to {}", req.path(), target);
        return redirect(&target);
    }

    if let Some(language) = sitemap_request(req.path()) {
        return serve_sitemap(&state, language);
    }

    let path = normalize_path(req.path());
    let index = state.translation_index().await;
    let route = classify(&path, index.as_ref());

    let status = match route {
        RouteMatch::LegacyBlog { ref redirect_to, .. } => {
            info!("Redirecting legacy path {} to {}", path, redirect_to);
            return redirect(redirect_to);
        }
        RouteMatch::NotFound => {
            info!("404 for {}", path);
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::OK,
    };

    match render_shell(&state, &path, &index) {
        Ok(html) => web::HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(e) => {
            error!("Error rendering shell {}: {}", state.config.paths.shell_file.display(), e);
            web::HttpResponse::InternalServerError()
                .body("Error loading page")
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/blog")
            .route(web::get().to(blog_read))
            .route(web::post().to(blog_create)),
    )
    .service(public_files);
}

pub async fn server_run(config: Config) -> io::Result<()> {
    let app_state = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(e) => return Err(io::Error::new(ErrorKind::Other, format!("Error creating post resolver: {}", e))),
    };

    let bind_addr = app_state.config.server.address.clone();
    let bind_port = app_state.config.server.port;
    info!("Serving content from {}", app_state.config.paths.content_dir.display());

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .configure(configure)
            .default_service(web::route().to(spa_shell))
    })
        .bind((bind_addr, bind_port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use ntex::web::test;
    use ntex::web::App;
    use tempfile::TempDir;

    use crate::config::parse_config;
    use crate::content::local_store::LocalStore;
    use crate::content::remote_store::tests::MemoryBlobStore;
    use crate::content::remote_store::RemoteStore;
    use crate::seo::sitemap::write_all_sitemaps;
    use crate::test_data::*;

    use super::*;

    const SHELL: &str = r#"<html><head><title>Site</title><link rel="canonical" href="https://old.example.com/" /></head><body><div id="root"></div></body></html>"#;

    struct TestSite {
        _content: TempDir,
        public: TempDir,
        state: Arc<AppState>,
    }

    fn site(remote: Option<MemoryBlobStore>) -> TestSite {
        let content = content_dir(&[
            ("hello.mdx", POST_HELLO_IT),
            ("hello.en.mdx", POST_HELLO_EN),
            ("promo.mdx", POST_PROMO_IT),
            ("promo.en.mdx", POST_PROMO_EN),
        ]);
        let public = tempfile::tempdir().unwrap();
        fs::write(public.path().join("index.html"), SHELL).unwrap();
        fs::write(public.path().join("robots.txt"), "User-agent: *").unwrap();

        let config = parse_config(&format!(
            "[site]\nbase_url = \"https://example.com\"\n\n[paths]\ncontent_dir = \"{}\"\npublic_dir = \"{}\"\nshell_file = \"{}\"\n\n[server]\naddress = \"127.0.0.1\"\nport = 0\n",
            content.path().display(),
            public.path().display(),
            public.path().join("index.html").display(),
        )).unwrap();

        let resolver = PostResolver::new(
            LocalStore::new(content.path().to_path_buf()),
            remote.map(|m| RemoteStore::new(Arc::new(m), "blog/")),
            true,
        );

        TestSite {
            _content: content,
            public,
            state: Arc::new(AppState::new(config, resolver)),
        }
    }

    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .state($state)
                    .configure(configure)
                    .default_service(web::route().to(spa_shell)),
            )
            .await
        };
    }

    fn body_json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    fn location(resp: &web::WebResponse) -> &str {
        resp.headers().get("Location").unwrap().to_str().unwrap()
    }

    #[ntex::test]
    async fn test_list_api() {
        let site = site(None);
        let app = init_app!(site.state.clone());

        let req = test::TestRequest::get().uri("/api/blog?lang=en").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(&test::read_body(resp).await);
        assert_eq!(json["success"], true);
        let titles: Vec<&str> = json["data"].as_array().unwrap().iter().map(|p| p["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Special promo", "Hi"]);
        assert_eq!(json["data"][0]["slug"], "special-promo");
    }

    #[ntex::test]
    async fn test_get_api() {
        let site = site(None);
        let app = init_app!(site.state.clone());

        let req = test::TestRequest::get().uri("/api/blog?slug=hello").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(&test::read_body(resp).await);
        assert_eq!(json["data"]["meta"]["title"], "Hello");
        assert_eq!(json["data"]["meta"]["date"], "2024-01-01T00:00:00.000Z");
        assert!(json["data"]["content"].as_str().unwrap().starts_with("Ciao mondo."));

        let req = test::TestRequest::get().uri("/api/blog?slug=missing&lang=en").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(&test::read_body(resp).await);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Post not found");
    }

    #[ntex::test]
    async fn test_invalid_language() {
        let site = site(None);
        let app = init_app!(site.state.clone());

        let req = test::TestRequest::get().uri("/api/blog?lang=pt").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[ntex::test]
    async fn test_create_api() {
        let site = site(Some(MemoryBlobStore::default()));
        write_all_sitemaps(site.public.path(), "https://example.com", &TranslationIndex::default(), Utc::now().date_naive()).unwrap();
        let app = init_app!(site.state.clone());

        let body = json!({
            "slug": "nuovo-post",
            "language": "fr",
            "content": "Bonjour",
            "meta": { "title": "Nouveau", "date": "2024-06-01", "coverImage": "/img/x.webp" }
        });
        let req = test::TestRequest::post().uri("/api/blog").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(&test::read_body(resp).await);
        assert_eq!(json["url"], "https://blob.test/blog/nuovo-post.fr.mdx");

        let sitemap = fs::read_to_string(site.public.path().join("sitemap-fr.xml")).unwrap();
        assert!(sitemap.contains("<loc>https://example.com/fr/blog/nuovo-post</loc>"));
    }

    #[ntex::test]
    async fn test_created_post_page_is_served() {
        let site = site(Some(MemoryBlobStore::default()));
        write_all_sitemaps(site.public.path(), "https://example.com", &TranslationIndex::default(), Utc::now().date_naive()).unwrap();
        let app = init_app!(site.state.clone());

        let req = test::TestRequest::get().uri("/fr/blog/nuovo-post").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let body = json!({ "slug": "nuovo-post", "language": "fr", "content": "Bonjour", "title": "Nouveau", "date": "2024-06-01" });
        let req = test::TestRequest::post().uri("/api/blog").set_json(&body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let sitemap = fs::read_to_string(site.public.path().join("sitemap-fr.xml")).unwrap();
        assert!(sitemap.contains("<loc>https://example.com/fr/blog/nuovo-post</loc>"));

        let req = test::TestRequest::get().uri("/api/blog?slug=nuovo-post&lang=fr").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/fr/blog/nuovo-post").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains(r#"<link rel="canonical" href="https://example.com/fr/blog/nuovo-post" />"#));
    }

    #[ntex::test]
    async fn test_create_api_errors() {
        let site = site(Some(MemoryBlobStore::default()));
        let app = init_app!(site.state.clone());

        let conflict = json!({ "slug": "hello", "content": "x", "title": "T", "date": "2024-01-01" });
        let req = test::TestRequest::post().uri("/api/blog").set_json(&conflict).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let missing = json!({ "slug": "x", "content": "x" });
        let req = test::TestRequest::post().uri("/api/blog").set_json(&missing).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post().uri("/api/blog").set_payload("not json").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[ntex::test]
    async fn test_create_without_token() {
        let site = site(None);
        let app = init_app!(site.state.clone());

        let body = json!({ "slug": "x", "content": "x", "title": "T", "date": "2024-01-01" });
        let req = test::TestRequest::post().uri("/api/blog").set_json(&body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[ntex::test]
    async fn test_shell_status_codes() {
        let site = site(None);
        let app = init_app!(site.state.clone());

        let req = test::TestRequest::get().uri("/en/blog/special-promo").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains(r#"<link rel="alternate" hreflang="it" href="https://example.com/blog/promo" />"#));
        assert!(!html.contains("old.example.com"));

        let req = test::TestRequest::get().uri("/en/blog/does-not-exist").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/fr/services/").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[ntex::test]
    async fn test_shell_redirects() {
        let site = site(None);
        let app = init_app!(site.state.clone());

        let req = test::TestRequest::get().uri("/en/blog/hello.en-en").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&resp), "/en/blog/hello");

        let req = test::TestRequest::get().uri("/special-promo").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&resp), "/en/blog/special-promo");
    }

    #[ntex::test]
    async fn test_sitemap_and_public_files() {
        let site = site(None);
        let app = init_app!(site.state.clone());

        let req = test::TestRequest::get().uri("/sitemap-de.xml").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        write_all_sitemaps(site.public.path(), "https://example.com", &TranslationIndex::default(), Utc::now().date_naive()).unwrap();
        let req = test::TestRequest::get().uri("/sitemap-de.xml").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let xml = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(xml.contains("<loc>https://example.com/de/services</loc>"));

        let req = test::TestRequest::get().uri("/public/robots.txt").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[test]
    fn test_sitemap_request() {
        assert_eq!(sitemap_request("/sitemap.xml"), Some(None));
        assert_eq!(sitemap_request("/sitemap-en.xml"), Some(Some(Language::En)));
        assert_eq!(sitemap_request("/sitemap-pt.xml"), None);
        assert_eq!(sitemap_request("/blog/sitemap.xml"), None);
    }

    #[test]
    fn test_create_body_prefers_nested_meta() {
        let body: CreatePostBody = serde_json::from_value(json!({
            "slug": " x ",
            "title": "Flat",
            "author": "Flat author",
            "meta": { "title": "Nested" }
        })).unwrap();
        let post = body.into_new_post().unwrap();
        assert_eq!(post.slug, "x");
        assert_eq!(post.title, "Nested");
        assert_eq!(post.author, "Flat author");
        assert_eq!(post.language, Language::It);

        let body: CreatePostBody = serde_json::from_value(json!({ "language": "xx" })).unwrap();
        assert!(matches!(body.into_new_post(), Err(BlogError::Validation(_))));
    }
}

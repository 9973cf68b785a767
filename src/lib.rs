/*!
# Trillium handler for rendertron prerendering

Single-page applications render most of their content with client-side
javascript, which many crawlers and link-preview bots never execute. This
handler sits early in a trillium pipeline and watches for requests from such
bots. When one arrives, the handler asks a [rendertron
service](https://github.com/GoogleChrome/rendertron) for a fully rendered html
snapshot of the requested url and replies with that snapshot instead of
running the rest of the pipeline. Every other request passes through
untouched.

```
use trillium_prerender::Prerender;
use trillium_smol::ClientConfig;

let handler = (
    Prerender::new(ClientConfig::default(), "https://render.example/render/")
        .with_extra_bot_user_agents(["googlebot"]),
    |conn: trillium::Conn| async move { conn.ok("hello from the origin") },
);

use trillium_testing::prelude::*;

// ordinary browsers never touch the render service
assert_ok!(
    get("/")
        .with_request_header("user-agent", "Mozilla/5.0 Firefox/121.0")
        .on(&handler),
    "hello from the origin"
);
```

Detection is driven by two patterns compiled once at setup: a crawler
user-agent alternation seeded from [`BOT_USER_AGENTS`] and a path exclusion
for static assets seeded from [`STATIC_FILE_EXTENSIONS`]. The snapshot is
relayed verbatim with status 200 and content-type `text/html` regardless of
what status the render service replied with, reproducing the behavior of the
original rendertron middleware: crawlers frequently mishandle non-200
responses, so even an upstream error page is better served as a success.
*/
#![forbid(unsafe_code)]
#![deny(
    missing_copy_implementations,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    unused_qualifications
)]

mod defaults;
pub use defaults::{BOT_USER_AGENTS, STATIC_FILE_EXTENSIONS};

mod detector;
use detector::BotDetector;

mod render_url;

use async_io::Timer;
use futures_lite::future;
use std::{collections::BTreeSet, io, time::Duration};
use trillium::{async_trait, Conn, Handler, HeaderName, KnownHeaderName, Status};
use trillium_client::{Client, Connector, Error};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(11_000);

/**
Trillium handler that proxies crawler requests through a rendertron service.

A `Prerender` is configured once, before the server starts, and is immutable
afterwards; all of its fields are shared read-only across concurrent request
handling. Construct one with [`Prerender::new`] and adjust it with the
chainable `with_*` methods.

```
use trillium_prerender::Prerender;
use trillium_smol::ClientConfig;
use std::time::Duration;

let prerender = Prerender::new(ClientConfig::default(), "https://render.example/render/")
    .with_timeout(Duration::from_secs(5))
    .with_allowed_forwarded_hosts(["example.com"]);
```
*/
#[derive(Debug)]
pub struct Prerender {
    client: Client,
    proxy_url: Url,
    detector: BotDetector,
    extra_bot_user_agents: Vec<String>,
    extra_excluded_extensions: Vec<String>,
    inject_shady_dom: bool,
    timeout: Duration,
    allowed_forwarded_hosts: BTreeSet<String>,
    forwarded_host_header: Option<HeaderName<'static>>,
}

impl Prerender {
    /**
    Constructs a new `Prerender` from a client connector and the base url of
    the rendertron service.

    The connector determines how outbound requests to the render service are
    made, exactly as with [`trillium_client::Client`]; use
    `trillium_smol::ClientConfig` (or the equivalent for your chosen runtime)
    in applications, or `trillium_testing::ServerConnector` in tests. The
    base url is normalized to end with a path separator.

    # Panics

    Panics when the provided url is empty, unparseable, or cannot be a base
    url. A missing render service is a configuration error, so setup fails
    immediately instead of every request failing later.
    */
    pub fn new(connector: impl Connector, proxy_url: impl TryInto<Url>) -> Self {
        let mut proxy_url = match proxy_url.try_into() {
            Ok(url) => url,
            Err(_) => panic!("could not convert the render service proxy url into a url"),
        };

        assert!(!proxy_url.cannot_be_a_base(), "{proxy_url} cannot be a base");

        if !proxy_url.path().ends_with('/') {
            let path = format!("{}/", proxy_url.path());
            proxy_url.set_path(&path);
        }

        Self {
            client: Client::new(connector).with_default_pool(),
            proxy_url,
            detector: BotDetector::new(),
            extra_bot_user_agents: Vec::new(),
            extra_excluded_extensions: Vec::new(),
            inject_shady_dom: false,
            timeout: DEFAULT_TIMEOUT,
            allowed_forwarded_hosts: BTreeSet::new(),
            forwarded_host_header: None,
        }
    }

    /**
    Replaces the crawler detection pattern with a caller-supplied regex,
    discarding the built-in [`BOT_USER_AGENTS`] signatures. The pattern is
    compiled case-insensitively, once.

    # Panics

    Panics when the pattern does not compile.
    */
    pub fn with_user_agent_pattern(mut self, pattern: impl AsRef<str>) -> Self {
        self.detector.set_user_agent_pattern(pattern.as_ref());
        self
    }

    /**
    Adds crawler user-agent signatures on top of the built-in
    [`BOT_USER_AGENTS`]. Signatures are matched literally (regex
    metacharacters are escaped) and case-insensitively. Repeated calls
    accumulate.

    ```
    # use trillium_prerender::Prerender;
    # use trillium_smol::ClientConfig;
    let prerender = Prerender::new(ClientConfig::default(), "https://render.example/render/")
        .with_extra_bot_user_agents(["googlebot", "bingpreview"]);
    ```
    */
    pub fn with_extra_bot_user_agents<I>(mut self, extras: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.extra_bot_user_agents
            .extend(extras.into_iter().map(|extra| extra.as_ref().to_string()));
        self.detector
            .set_user_agents(BotDetector::bot_user_agents(&self.extra_bot_user_agents));
        self
    }

    /**
    Replaces the path exclusion pattern with a caller-supplied regex,
    discarding the built-in [`STATIC_FILE_EXTENSIONS`] suffixes. The pattern
    is compiled case-insensitively, once; any request path matching it is
    passed through without prerendering.

    # Panics

    Panics when the pattern does not compile.
    */
    pub fn with_exclude_url_pattern(mut self, pattern: impl AsRef<str>) -> Self {
        self.detector.set_exclude_url_pattern(pattern.as_ref());
        self
    }

    /// Adds static-asset file extensions on top of the built-in
    /// [`STATIC_FILE_EXTENSIONS`]. Extensions are matched literally as
    /// path suffixes. Repeated calls accumulate.
    pub fn with_extra_excluded_extensions<I>(mut self, extras: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.extra_excluded_extensions
            .extend(extras.into_iter().map(|extra| extra.as_ref().to_string()));
        self.detector.set_excluded_urls(BotDetector::excluded_extensions(
            &self.extra_excluded_extensions,
        ));
        self
    }

    /// Appends the `wc-inject-shadydom=true` marker to every render request,
    /// instructing rendertron to force-load the web components polyfills.
    pub fn with_shady_dom_polyfill(mut self) -> Self {
        self.inject_shady_dom = true;
        self
    }

    /// Sets the time budget for the outbound render request, covering both
    /// the request itself and reading the body. Defaults to eleven seconds,
    /// matching rendertron's own render deadline plus a margin.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /**
    Allow-lists hostnames that may be supplied by a forwarded-host header.

    When this handler runs behind another proxy, the host the server observes
    directly is not the one crawlers requested. If the forwarded-host header
    names a host on this list, that host is used when building the url
    submitted to the render service; any other value falls back to the
    observed host. Configuring a non-empty list enables reading the
    `x-forwarded-host` header unless [`Prerender::with_forwarded_host_header`]
    chose a different one.
    */
    pub fn with_allowed_forwarded_hosts<I>(mut self, hosts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.allowed_forwarded_hosts = hosts.into_iter().map(Into::into).collect();
        if !self.allowed_forwarded_hosts.is_empty() {
            self.forwarded_host_header
                .get_or_insert(KnownHeaderName::XforwardedHost.into());
        }
        self
    }

    /// Names the header consulted for the forwarded host. Only meaningful in
    /// combination with [`Prerender::with_allowed_forwarded_hosts`]; defaults
    /// to `x-forwarded-host`.
    pub fn with_forwarded_host_header(mut self, header: impl Into<HeaderName<'static>>) -> Self {
        self.forwarded_host_header = Some(header.into());
        self
    }

    async fn fetch(&self, render_url: Url) -> Result<Vec<u8>, Error> {
        let request = async {
            let mut upstream = self.client.get(render_url).await?;
            let status = upstream.status();
            let body = upstream.response_body().read_bytes().await?;
            log::debug!(
                "render service replied with {status:?} and a {} byte body",
                body.len()
            );
            Ok(body)
        };

        let deadline = async {
            Timer::after(self.timeout).await;
            Err(io::Error::new(io::ErrorKind::TimedOut, "render request timed out").into())
        };

        future::or(request, deadline).await
    }
}

#[async_trait]
impl Handler for Prerender {
    async fn run(&self, conn: Conn) -> Conn {
        let user_agent = conn.request_headers().get_str(KnownHeaderName::UserAgent);
        if !self.detector.should_prerender(user_agent, conn.path()) {
            return conn;
        }

        let forwarded_host = self
            .forwarded_host_header
            .as_ref()
            .and_then(|header| conn.request_headers().get_str(header.clone()));

        let Some(host) = render_url::resolve_host(
            conn.inner().host(),
            forwarded_host,
            &self.allowed_forwarded_hosts,
        ) else {
            log::debug!("passing an eligible request through because it has no host");
            return conn;
        };

        let scheme = if conn.is_secure() { "https" } else { "http" };
        let render_url = render_url::build(
            &self.proxy_url,
            scheme,
            host,
            conn.inner().path_and_query(),
            self.inject_shady_dom,
        );

        let render_url = match Url::parse(&render_url) {
            Ok(render_url) => render_url,
            Err(error) => {
                log::error!("could not parse render url {render_url}: {error}");
                return conn.with_status(Status::InternalServerError).halt();
            }
        };

        log::debug!(
            "prerendering {render_url} for user agent {:?}",
            user_agent.unwrap_or_default()
        );

        match self.fetch(render_url).await {
            Ok(body) => conn
                .with_status(Status::Ok)
                .with_body(body)
                .with_response_header(KnownHeaderName::ContentType, "text/html")
                .halt(),

            Err(Error::Io(error)) if error.kind() == io::ErrorKind::TimedOut => {
                log::error!("render request exceeded the {:?} timeout", self.timeout);
                conn.with_status(Status::GatewayTimeout).halt()
            }

            Err(error) => {
                log::error!("render request failed: {error}");
                conn.with_status(Status::BadGateway).halt()
            }
        }
    }
}

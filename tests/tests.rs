use async_io::Timer;
use std::time::Duration;
use trillium_prerender::Prerender;
use trillium_testing::{prelude::*, ServerConnector};

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Firefox/121.0";

// echoes back the request target so tests can observe exactly what url the
// handler submitted to the render service
async fn render_service(conn: Conn) -> Conn {
    let requested = conn.inner().path_and_query().to_string();
    conn.ok(format!("rendered:{requested}"))
}

fn prerender() -> Prerender {
    Prerender::new(
        ServerConnector::new(render_service),
        "http://render.example/render/",
    )
}

fn app(prerender: Prerender) -> impl trillium::Handler {
    (prerender, |conn: Conn| async move {
        conn.ok("origin response")
    })
}

#[test]
fn ordinary_browsers_pass_through() {
    let app = app(prerender());
    assert_ok!(
        get("/")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", BROWSER_UA)
            .on(&app),
        "origin response"
    );
}

#[test]
fn missing_or_empty_user_agent_passes_through() {
    let app = app(prerender());
    assert_ok!(
        get("/").with_request_header("host", "example.com").on(&app),
        "origin response"
    );
    assert_ok!(
        get("/")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", "")
            .on(&app),
        "origin response"
    );
}

#[test]
fn static_assets_pass_through_even_for_crawlers() {
    let app = app(prerender());
    assert_ok!(
        get("/logo.png")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        "origin response"
    );
}

#[test]
fn requests_without_a_host_pass_through() {
    let app = app(prerender());
    assert_ok!(
        get("/").with_request_header("user-agent", "Slackbot").on(&app),
        "origin response"
    );
}

#[test]
fn crawlers_receive_the_rendered_snapshot() {
    let app = app(prerender());
    assert_response!(
        get("/a?b=1")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        200,
        "rendered:/render/http%3A%2F%2Fexample.com%2Fa%3Fb%3D1",
        "content-type" => "text/html"
    );
}

#[test]
fn proxy_url_without_a_trailing_slash_is_normalized() {
    let app = app(Prerender::new(
        ServerConnector::new(render_service),
        "http://render.example/render",
    ));
    assert_ok!(
        get("/")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", "Twitterbot")
            .on(&app),
        "rendered:/render/http%3A%2F%2Fexample.com%2F"
    );
}

#[test]
fn shady_dom_marker_is_appended_to_render_requests() {
    let app = app(prerender().with_shady_dom_polyfill());
    assert_ok!(
        get("/")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        "rendered:/render/http%3A%2F%2Fexample.com%2F?wc-inject-shadydom=true"
    );
}

#[test]
fn extra_bot_user_agents_are_detected() {
    let app = app(prerender().with_extra_bot_user_agents(["googlebot"]));
    assert_ok!(
        get("/")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", "Googlebot/2.1")
            .on(&app),
        "rendered:/render/http%3A%2F%2Fexample.com%2F"
    );
}

#[test]
fn repeated_extra_calls_accumulate() {
    let app = app(
        prerender()
            .with_extra_bot_user_agents(["googlebot"])
            .with_extra_bot_user_agents(["bingpreview"]),
    );
    for user_agent in ["Googlebot/2.1", "BingPreview/1.0b", "Slackbot"] {
        assert_ok!(
            get("/")
                .with_request_header("host", "example.com")
                .with_request_header("user-agent", user_agent)
                .on(&app),
            "rendered:/render/http%3A%2F%2Fexample.com%2F"
        );
    }

    let app = self::app(
        prerender()
            .with_extra_excluded_extensions(["m3u8"])
            .with_extra_excluded_extensions(["webmanifest"]),
    );
    for path in ["/stream/index.m3u8", "/app.webmanifest", "/logo.png"] {
        assert_ok!(
            get(path)
                .with_request_header("host", "example.com")
                .with_request_header("user-agent", "Slackbot")
                .on(&app),
            "origin response"
        );
    }
}

#[test]
#[should_panic(expected = "could not convert the render service proxy url into a url")]
fn an_empty_proxy_url_fails_at_setup() {
    Prerender::new(ServerConnector::new(render_service), "");
}

#[test]
#[should_panic(expected = "cannot be a base")]
fn a_proxy_url_that_cannot_be_a_base_fails_at_setup() {
    Prerender::new(ServerConnector::new(render_service), "mailto:crawler@example.com");
}

#[test]
fn allow_listed_forwarded_host_is_used_for_the_render_url() {
    let app = app(prerender().with_allowed_forwarded_hosts(["example.com"]));
    assert_ok!(
        get("/")
            .with_request_header("host", "internal.local")
            .with_request_header("x-forwarded-host", "example.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        "rendered:/render/http%3A%2F%2Fexample.com%2F"
    );
}

#[test]
fn unlisted_forwarded_host_falls_back_to_the_declared_host() {
    let app = app(prerender().with_allowed_forwarded_hosts(["example.com"]));
    assert_ok!(
        get("/")
            .with_request_header("host", "internal.local")
            .with_request_header("x-forwarded-host", "evil.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        "rendered:/render/http%3A%2F%2Finternal.local%2F"
    );
}

#[test]
fn forwarded_host_is_ignored_without_an_allow_list() {
    let app = app(prerender());
    assert_ok!(
        get("/")
            .with_request_header("host", "internal.local")
            .with_request_header("x-forwarded-host", "example.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        "rendered:/render/http%3A%2F%2Finternal.local%2F"
    );
}

#[test]
fn custom_forwarded_host_header_name() {
    let app = app(
        prerender()
            .with_allowed_forwarded_hosts(["example.com"])
            .with_forwarded_host_header("x-real-host"),
    );
    assert_ok!(
        get("/")
            .with_request_header("host", "internal.local")
            .with_request_header("x-real-host", "example.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        "rendered:/render/http%3A%2F%2Fexample.com%2F"
    );
}

// the upstream status code is deliberately discarded: crawlers often
// mishandle non-200 responses, so even a render service error page is
// relayed as a success. see the crate docs.
#[test]
fn upstream_error_body_is_relayed_with_status_200() {
    let app = app(Prerender::new(
        ServerConnector::new(|conn: Conn| async move {
            conn.with_status(503)
                .with_body("<html>fallback</html>")
                .halt()
        }),
        "http://render.example/render/",
    ));
    assert_response!(
        get("/")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        200,
        "<html>fallback</html>",
        "content-type" => "text/html"
    );
}

#[test]
fn unresponsive_render_service_times_out_with_a_504() {
    let app = app(Prerender::new(
        ServerConnector::new(|conn: Conn| async move {
            Timer::after(Duration::from_secs(10)).await;
            conn.ok("far too late")
        }),
        "http://render.example/render/",
    )
    .with_timeout(Duration::from_millis(100)));

    assert_status!(
        get("/")
            .with_request_header("host", "example.com")
            .with_request_header("user-agent", "Slackbot")
            .on(&app),
        504
    );
}

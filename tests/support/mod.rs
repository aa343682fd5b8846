//! Fake CAS identity provider and face book directory for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use facescrape_core::{ClientOptions, Credentials, FaceScraper, SiteProfile};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GOOD_PASSWORD: &str = "right";
pub const SESSION_VALUE: &str = "sess-1";

/// Login form page carrying the hidden single-use tokens.
pub fn login_form_html() -> String {
    r#"<html><body><form id="fm1" method="post" action="/cas/login">
<input type="text" name="username" />
<input type="password" name="password" />
<input type="hidden" name="lt" value="LT-42-abc" />
<input type="hidden" name="execution" value="e1s1" />
<input type="hidden" name="_eventId" value="submit" />
</form></body></html>"#
        .to_string()
}

/// Serves the login form, setting the provider's own session cookie.
pub async fn mount_login_form(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cas/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "JSESSIONID=cas-1; Path=/cas")
                .set_body_string(login_form_html()),
        )
        .mount(server)
        .await;
}

/// Accepts [`GOOD_PASSWORD`] with a ticket redirect into the directory, and
/// re-renders the form for anything else.
pub async fn mount_credential_check(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/cas/login"))
        .and(body_string_contains(format!("password={GOOD_PASSWORD}")))
        .and(body_string_contains("lt=LT-42-abc"))
        .and(body_string_contains("execution=e1s1"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("set-cookie", "CASTGC=TGT-1-xyz; Path=/")
                .insert_header("location", "/pin/authenticate?ticket=ST-1"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cas/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<p class=\"errors\">Invalid credentials.</p>{}",
            login_form_html()
        )))
        .mount(server)
        .await;
}

/// Directory validates the ticket, grants its session, and lands on the
/// search form.
pub async fn mount_ticket_validation(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/pin/authenticate"))
        .and(query_param("ticket", "ST-1"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("set-cookie", format!("PHPSESSID={SESSION_VALUE}; Path=/"))
                .insert_header("location", "/searchform"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/searchform"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Search</h1>"))
        .mount(server)
        .await;
}

/// Mounts the complete happy-path handshake.
pub async fn mount_cas(server: &MockServer) {
    mount_login_form(server).await;
    mount_credential_check(server).await;
    mount_ticket_validation(server).await;
}

/// A scraper pointed at `server` with default network options.
pub fn scraper_for(server: &MockServer, password: &str) -> FaceScraper {
    scraper_with_options(server, password, &ClientOptions::default())
}

pub fn scraper_with_options(
    server: &MockServer,
    password: &str,
    options: &ClientOptions,
) -> FaceScraper {
    FaceScraper::with_config(
        Credentials::new("12345678", password),
        SiteProfile::with_base_url(&server.uri()),
        options,
    )
    .expect("client builds")
}

/// One photo-view search result entry.
pub fn result_entry(id: &str) -> String {
    format!(
        "<div class=\"photo\">\n  <a href=\"individual?id={id}\"><img src=\"thumbs/{id}.jpg\"></a>\n</div>\n"
    )
}

/// A record page; `concentration` of `None` omits that field entirely.
pub fn record_page(name: &str, house: &str, concentration: Option<&str>, email: &str) -> String {
    let concentration = concentration
        .map(|value| {
            format!(
                "<span class=\"field\">Concentration:</span><span class=\"value\">{value}</span><br>\n"
            )
        })
        .unwrap_or_default();
    format!(
        r#"<div class="individual">
<img alt="Image" width="250" src="photos/{email}.jpg" />
<span class="field">Name:</span><span class="value">{name}</span><br>
<span class="field">House:</span><span class="value">{house}</span><br>
<span class="field">Year:</span><span class="value">2016</span><br>
{concentration}<span class="field">Dorm Address:</span><span class="value">Weld 12<br/>Cambridge</span><br>
<a href="mailto:{email}">{email}</a>
</div>"#
    )
}

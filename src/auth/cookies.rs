// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token cookie handling.
//!
//! The refresh token travels in an `HttpOnly` cookie named `jid`, scoped to
//! `/`. Cross-site frontends need `SameSite=None`, which browsers only accept
//! together with `Secure`; without `Secure` the cookie falls back to `Lax`.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE: &str = "jid";

fn base_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Lax })
        .build()
}

/// Cookie carrying a freshly issued refresh token.
pub fn refresh_cookie(token: impl Into<String>, max_age: Duration, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(token.into(), secure);
    let seconds = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    cookie.set_max_age(time::Duration::seconds(seconds));
    cookie
}

/// Cookie that makes the browser drop the refresh token.
///
/// Added to the jar rather than removed from it, so the `Set-Cookie` is sent
/// even when the request carried no `jid`.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}

/// The refresh token from the request's cookies, if present and non-empty.
pub fn refresh_token_from(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

    fn jar_from(cookie_header: &'static str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(cookie_header));
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn refresh_cookie_is_http_only_with_max_age() {
        let cookie = refresh_cookie("abc.def.ghi", Duration::from_secs(604_800), true);

        assert_eq!(cookie.name(), "jid");
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604_800)));

        let header = cookie.to_string();
        assert!(header.starts_with("jid=abc.def.ghi"));
        assert!(header.contains("Max-Age=604800"));
    }

    #[test]
    fn insecure_cookie_uses_lax() {
        let cookie = refresh_cookie("t", Duration::from_secs(60), false);
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[test]
    fn reads_cookie_among_others() {
        let jar = jar_from("theme=dark; jid=tok.en.value; lang=en");
        assert_eq!(refresh_token_from(&jar).as_deref(), Some("tok.en.value"));
    }

    #[test]
    fn quoted_cookie_value_is_unwrapped() {
        let jar = jar_from("jid=\"tok.en.value\"");
        assert_eq!(refresh_token_from(&jar).as_deref(), Some("tok.en.value"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        assert_eq!(refresh_token_from(&CookieJar::new()), None);
        assert_eq!(refresh_token_from(&jar_from("jid=")), None);
    }
}

//! Authenticated HTTP session management.
//!
//! IRIDA hands out OAuth2 bearer tokens from a password grant against
//! `<base>/oauth/token`.  We keep the current token behind a lock, probe
//! the server before each request and renew the token transparently when
//! the probe fails.
//!

use std::sync::Mutex;

use clap::{crate_name, crate_version};
use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::ClientError;

/// How many times a request is re-issued on a dropped connection.
const MAX_RETRIES: usize = 5;

/// Decoded `oauth/token` response.  Anything else in there is noise.
///
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// An authenticated session against one IRIDA instance.
///
/// The base URL is validated eagerly in [`Session::new`] and the first
/// token is fetched there as well, so a bad URL or bad credentials surface
/// before any real work starts.
///
#[derive(Debug)]
pub struct Session {
    base_url: Url,
    client: Client,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
    token: Mutex<Option<String>>,
}

impl Session {
    /// Validate the base URL, build the HTTP client and authenticate.
    ///
    pub fn new(
        base_url: &str,
        client_id: &str,
        client_secret: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|_| ClientError::Connection(format!("{base} is not a valid URL")))?;

        let client = Client::builder()
            .user_agent(format!("{}/{}", crate_name!(), crate_version!()))
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let session = Session {
            base_url,
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            token: Mutex::new(None),
        };

        let token = session.authenticate()?;
        *session.token.lock().unwrap() = Some(token);
        Ok(session)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Authenticated GET.
    ///
    pub fn get(&self, url: &str) -> Result<Response, ClientError> {
        self.request(url, None)
    }

    /// Authenticated GET with an explicit `Accept` header, used to fetch
    /// raw file contents instead of their JSON metadata.
    ///
    pub fn get_with_accept(&self, url: &str, accept: &str) -> Result<Response, ClientError> {
        self.request(url, Some(accept))
    }

    fn request(&self, url: &str, accept: Option<&str>) -> Result<Response, ClientError> {
        let token = self.active_token()?;

        let mut last = None;
        for attempt in 1..=MAX_RETRIES {
            let mut req = self.client.get(url).bearer_auth(&token);
            if let Some(accept) = accept {
                req = req.header("accept", accept);
            }
            match req.send() {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_connect() || e.is_timeout() => {
                    debug!("attempt {attempt}/{MAX_RETRIES} on {url} failed: {e}");
                    last = Some(e);
                }
                Err(e) => return Err(ClientError::Connection(e.to_string())),
            }
        }
        Err(ClientError::Connection(
            last.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    /// Return a token known to be live, renewing it if the probe fails.
    ///
    /// Renewal is serialized behind the lock: only one renewal is in
    /// flight at a time, later callers reuse the fresh token.
    ///
    fn active_token(&self) -> Result<String, ClientError> {
        let mut guard = self.token.lock().unwrap();

        if let Some(token) = guard.as_ref() {
            if self.probe(token) {
                debug!("Existing session still works, going to reuse it.");
                return Ok(token.clone());
            }
            debug!("Token is probably expired, going to get a new session.");
        }

        let fresh = self.authenticate()?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    /// Cheap liveness check, an OPTIONS on the base URL.
    ///
    fn probe(&self, token: &str) -> bool {
        let resp = self
            .client
            .request(Method::OPTIONS, self.base_url.clone())
            .bearer_auth(token)
            .send();
        matches!(resp, Ok(resp) if resp.status() == StatusCode::OK)
    }

    /// Fetch a fresh bearer token with the password grant.
    ///
    fn authenticate(&self) -> Result<String, ClientError> {
        let url = self
            .base_url
            .join("oauth/token")
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        trace!("Fetching token through {url}…");

        let params = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        let resp = self.client.post(url).form(&params).send().map_err(|e| {
            ClientError::Connection(format!(
                "Could not connect to the IRIDA server, URL may be incorrect: {e}"
            ))
        })?;

        if !resp.status().is_success() {
            return Err(ClientError::Connection(format!(
                "Could not get access token from IRIDA, credentials may be incorrect ({})",
                resp.status()
            )));
        }

        // A 200 that is not a token (e.g. a login page) is deliberately
        // reported the same way as a connection problem.
        //
        let token: TokenResponse = resp.json().map_err(|_| {
            ClientError::Connection("Unexpected response from server, URL may be incorrect".into())
        })?;

        trace!("token acquired");
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn token_mock(server: &MockServer) -> httpmock::Mock {
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .json_body(json!({"access_token": "FOOBAR", "token_type": "bearer"}));
        })
    }

    fn probe_mock(server: &MockServer) -> httpmock::Mock {
        server.mock(|when, then| {
            when.method("OPTIONS").path("/");
            then.status(200);
        })
    }

    #[test]
    fn test_session_bad_url() {
        let s = Session::new("not an url", "id", "secret", "user", "pass");
        assert!(matches!(s, Err(ClientError::Connection(_))));
    }

    #[test]
    fn test_session_authenticate() {
        let server = MockServer::start();
        let m = token_mock(&server);

        let s = Session::new(&server.base_url(), "id", "secret", "user", "pass");
        m.assert();
        assert!(s.is_ok());
    }

    #[test]
    fn test_session_bad_token_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200).body("<html>not a token</html>");
        });

        let s = Session::new(&server.base_url(), "id", "secret", "user", "pass");
        assert!(matches!(s, Err(ClientError::Connection(_))));
    }

    #[test]
    fn test_session_bad_credentials() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(400);
        });

        let s = Session::new(&server.base_url(), "id", "secret", "user", "nope");
        assert!(matches!(s, Err(ClientError::Connection(_))));
    }

    #[test]
    fn test_session_get_carries_bearer() {
        let server = MockServer::start();
        token_mock(&server);
        probe_mock(&server);
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/api/thing")
                .header("authorization", "Bearer FOOBAR");
            then.status(200).body("ok");
        });

        let s = Session::new(&server.base_url(), "id", "secret", "user", "pass").unwrap();
        let resp = s.get(&server.url("/api/thing")).unwrap();
        m.assert();
        assert_eq!(StatusCode::OK, resp.status());
    }

    #[test]
    fn test_session_renews_on_failed_probe() {
        let server = MockServer::start();
        let tok = token_mock(&server);
        // Probe always rejects, so every request re-authenticates.
        //
        server.mock(|when, then| {
            when.method("OPTIONS").path("/");
            then.status(401);
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/thing");
            then.status(200);
        });

        let s = Session::new(&server.base_url(), "id", "secret", "user", "pass").unwrap();
        let _ = s.get(&server.url("/api/thing")).unwrap();

        // Once at construction, once for the failed probe.
        //
        tok.assert_hits(2);
    }
}

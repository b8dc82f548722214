//! HATEOAS link resolution.
//!
//! Every IRIDA response body is wrapped in a `resource` envelope carrying a
//! list of `links`; collection responses additionally carry `resources`
//! whose elements each have their own `links`.  All navigation goes through
//! [`resolve`], nothing in this crate builds URLs from templates except the
//! one documented shortcut in the client.
//!

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{ClientError, Session};

/// One hyperlink relation.
///
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// The `{"resource": ...}` wrapper around every response body.
///
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub resource: Resource,
}

#[derive(Debug, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub links: Vec<Link>,
    /// Collection elements, kept loosely typed: the field we match on is
    /// chosen by the caller at runtime.
    #[serde(default)]
    pub resources: Vec<Value>,
}

/// Field match used to single out one element of a resource collection.
///
#[derive(Clone, Debug)]
pub struct ResourceMatch {
    pub key: String,
    pub value: String,
}

impl ResourceMatch {
    /// The value is coerced to a string up front, comparisons are
    /// case-insensitive on both sides.
    ///
    pub fn new(key: &str, value: impl ToString) -> Self {
        ResourceMatch {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// GET `url` and decode the `resource` envelope.
///
/// Any HTTP-level failure or unexpected body shape is a
/// [`ClientError::ResourceParse`], distinct from a missing relation.
///
pub fn fetch_envelope(session: &Session, url: &str) -> Result<Envelope, ClientError> {
    let resp = session.get(url)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ClientError::ResourceParse(format!(
            "{url} responded with {status}"
        )));
    }
    let body = resp
        .text()
        .map_err(|e| ClientError::ResourceParse(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| {
        debug!("undecodable response from {url}: {body}");
        ClientError::ResourceParse(format!("{url}: {e}"))
    })
}

/// Resolve the `rel` relation at `url`.
///
/// Without a filter the top-level `links` list is scanned.  With one, the
/// first collection element whose `filter.key` field matches `filter.value`
/// is located first and `rel` is resolved against that element's `links`.
///
pub fn resolve(
    session: &Session,
    url: &str,
    rel: &str,
    filter: Option<&ResourceMatch>,
) -> Result<String, ClientError> {
    debug!("resolve: url={url} rel={rel}");
    let envelope = fetch_envelope(session, url)?;

    let links = match filter {
        Some(m) => matched_links(&envelope.resource.resources, m)?,
        None => envelope.resource.links,
    };
    href_for(rel, &links)
}

/// Find the first collection element matching `m` and return its links.
///
fn matched_links(resources: &[Value], m: &ResourceMatch) -> Result<Vec<Link>, ClientError> {
    let matched = resources.iter().find(|r| {
        r.get(&m.key)
            .map(|v| as_string(v).eq_ignore_ascii_case(&m.value))
            .unwrap_or(false)
    });

    let matched = match matched {
        Some(r) => r,
        None => {
            // Tell "no element carries that field at all" apart from
            // "no value matched".
            //
            if let Some(first) = resources.first() {
                if first.get(&m.key).is_none() {
                    return Err(ClientError::ResourceParse(format!(
                        "{} not found. Available keys: {}",
                        m.key,
                        keys_of(first)
                    )));
                }
            }
            return Err(ClientError::ValueNotFound(m.value.clone()));
        }
    };

    let links = matched.get("links").cloned().unwrap_or(Value::Null);
    serde_json::from_value(links)
        .map_err(|e| ClientError::ResourceParse(format!("links of matched resource: {e}")))
}

fn href_for(rel: &str, links: &[Link]) -> Result<String, ClientError> {
    match links.iter().find(|l| l.rel == rel) {
        Some(link) => Ok(link.href.clone()),
        None => {
            let available = links
                .iter()
                .map(|l| l.rel.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            debug!("{rel} not found in links. Available links: {available}");
            Err(ClientError::RelationNotFound {
                rel: rel.to_string(),
                available,
            })
        }
    }
}

/// Coerce a JSON scalar into the string we compare against.
///
fn as_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn keys_of(v: &Value) -> String {
    v.as_object()
        .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn setup(server: &MockServer) -> Session {
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .json_body(json!({"access_token": "FOOBAR", "token_type": "bearer"}));
        });
        server.mock(|when, then| {
            when.method("OPTIONS").path("/");
            then.status(200);
        });
        Session::new(&server.base_url(), "id", "secret", "user", "pass").unwrap()
    }

    #[test]
    fn test_resolve_top_level() {
        let server = MockServer::start();
        let session = setup(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({
                "resource": {
                    "links": [
                        {"rel": "projects", "href": "http://example.net/api/projects"},
                        {"rel": "analysisSubmissions", "href": "http://example.net/api/analysisSubmissions"}
                    ]
                }
            }));
        });

        let href = resolve(&session, &server.url("/api"), "projects", None).unwrap();
        assert_eq!("http://example.net/api/projects", href);
    }

    #[test]
    fn test_resolve_relation_not_found() {
        let server = MockServer::start();
        let session = setup(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({
                "resource": {
                    "links": [{"rel": "projects", "href": "http://example.net/api/projects"}]
                }
            }));
        });

        let err = resolve(&session, &server.url("/api"), "nope", None).unwrap_err();
        match err {
            ClientError::RelationNotFound { rel, available } => {
                assert_eq!("nope", rel);
                assert_eq!("projects", available);
            }
            e => panic!("wrong error: {e}"),
        }
    }

    #[test]
    fn test_resolve_filtered_numeric_identifier() {
        let server = MockServer::start();
        let session = setup(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/projects");
            then.status(200).json_body(json!({
                "resource": {
                    "links": [],
                    "resources": [
                        {
                            "identifier": 4,
                            "links": [{"rel": "project/analyses", "href": "http://example.net/p/4/analyses"}]
                        },
                        {
                            "identifier": 5,
                            "links": [{"rel": "project/analyses", "href": "http://example.net/p/5/analyses"}]
                        }
                    ]
                }
            }));
        });

        let m = ResourceMatch::new("identifier", 5);
        let href = resolve(
            &session,
            &server.url("/api/projects"),
            "project/analyses",
            Some(&m),
        )
        .unwrap();
        assert_eq!("http://example.net/p/5/analyses", href);
    }

    #[test]
    fn test_resolve_filtered_case_insensitive() {
        let server = MockServer::start();
        let session = setup(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/projects");
            then.status(200).json_body(json!({
                "resource": {
                    "links": [],
                    "resources": [{
                        "name": "Listeria Outbreak",
                        "links": [{"rel": "self", "href": "http://example.net/p/7"}]
                    }]
                }
            }));
        });

        let m = ResourceMatch::new("name", "listeria outbreak");
        let href = resolve(&session, &server.url("/api/projects"), "self", Some(&m)).unwrap();
        assert_eq!("http://example.net/p/7", href);
    }

    #[test]
    fn test_resolve_filtered_value_not_found() {
        let server = MockServer::start();
        let session = setup(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/projects");
            then.status(200).json_body(json!({
                "resource": {
                    "links": [],
                    "resources": [{"identifier": "4", "links": []}]
                }
            }));
        });

        let m = ResourceMatch::new("identifier", 99);
        let err = resolve(
            &session,
            &server.url("/api/projects"),
            "project/analyses",
            Some(&m),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::ValueNotFound(v) if v == "99"));
    }

    #[test]
    fn test_resolve_missing_envelope() {
        let server = MockServer::start();
        let session = setup(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({"not_resource": {}}));
        });

        let err = resolve(&session, &server.url("/api"), "projects", None).unwrap_err();
        assert!(matches!(err, ClientError::ResourceParse(_)));
    }

    #[test]
    fn test_as_string_coercion() {
        assert_eq!("5", as_string(&json!(5)));
        assert_eq!("abc", as_string(&json!("abc")));
        assert_eq!("true", as_string(&json!(true)));
    }
}

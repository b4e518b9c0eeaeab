//! `WWW-Authenticate` challenge parsing for registry requests that the
//! distribution client does not issue itself (manifest deletion).

use http_auth::parser::ChallengeParser;
use http_auth::ChallengeRef;
use serde::Deserialize;

/// Authentication scheme requested by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChallenge {
    /// Token auth: fetch a bearer token from `realm`.
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    /// Plain HTTP basic auth.
    Basic { realm: Option<String> },
}

impl AuthChallenge {
    /// Parse a `WWW-Authenticate` header value, taking the first Bearer or
    /// Basic challenge it lists.
    ///
    /// Returns `None` for unknown schemes or a bearer challenge without a realm.
    pub fn parse(header: &str) -> Option<Self> {
        ChallengeParser::new(header)
            .filter_map(|challenge| challenge.ok())
            .find_map(|challenge| Self::from_challenge(&challenge))
    }

    fn from_challenge(challenge: &ChallengeRef<'_>) -> Option<Self> {
        let param = |key: &str| {
            challenge
                .params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.to_unescaped())
        };

        if challenge.scheme.eq_ignore_ascii_case("bearer") {
            Some(AuthChallenge::Bearer {
                realm: param("realm")?,
                service: param("service"),
                scope: param("scope"),
            })
        } else if challenge.scheme.eq_ignore_ascii_case("basic") {
            Some(AuthChallenge::Basic {
                realm: param("realm"),
            })
        } else {
            None
        }
    }
}

/// Token endpoint response. Registries use either field name.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl TokenResponse {
    pub fn into_token(self) -> Option<String> {
        self.token
            .filter(|t| !t.is_empty())
            .or(self.access_token.filter(|t| !t.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_docker_hub_challenge() {
        let header = r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:nullstone/tf-provider-test:pull,push,delete""#;
        let challenge = AuthChallenge::parse(header).unwrap();
        assert_eq!(
            challenge,
            AuthChallenge::Bearer {
                realm: "https://auth.docker.io/token".to_string(),
                service: Some("registry.docker.io".to_string()),
                scope: Some("repository:nullstone/tf-provider-test:pull,push,delete".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_bearer_without_scope() {
        let header = r#"Bearer realm="https://ghcr.io/token", service="ghcr.io""#;
        match AuthChallenge::parse(header).unwrap() {
            AuthChallenge::Bearer { realm, service, scope } => {
                assert_eq!(realm, "https://ghcr.io/token");
                assert_eq!(service.as_deref(), Some("ghcr.io"));
                assert!(scope.is_none());
            }
            other => panic!("unexpected challenge: {:?}", other),
        }
    }

    #[test]
    fn test_parse_bearer_requires_realm() {
        assert!(AuthChallenge::parse(r#"Bearer service="x""#).is_none());
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(
            AuthChallenge::parse(r#"Basic realm="Registry Realm""#),
            Some(AuthChallenge::Basic {
                realm: Some("Registry Realm".to_string())
            })
        );
    }

    #[test]
    fn test_parse_escaped_values() {
        let header = r#"Bearer realm="https://r.example/token",service="say \"hi\"""#;
        match AuthChallenge::parse(header).unwrap() {
            AuthChallenge::Bearer { realm, service, .. } => {
                assert_eq!(realm, "https://r.example/token");
                assert_eq!(service.as_deref(), Some("say \"hi\""));
            }
            other => panic!("unexpected challenge: {:?}", other),
        }
    }

    #[test]
    fn test_parse_picks_first_supported_challenge() {
        let header = r#"Custom realm="other", Bearer realm="https://r.example/token""#;
        assert_eq!(
            AuthChallenge::parse(header),
            Some(AuthChallenge::Bearer {
                realm: "https://r.example/token".to_string(),
                service: None,
                scope: None,
            })
        );
    }

    #[test]
    fn test_parse_unknown_scheme() {
        assert!(AuthChallenge::parse("Negotiate abc").is_none());
        assert!(AuthChallenge::parse("").is_none());
    }

    #[test]
    fn test_token_response_field_names() {
        let r: TokenResponse = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(r.into_token().as_deref(), Some("abc"));

        let r: TokenResponse =
            serde_json::from_str(r#"{"access_token":"xyz","expires_in":300}"#).unwrap();
        assert_eq!(r.into_token().as_deref(), Some("xyz"));

        let r: TokenResponse = serde_json::from_str(r#"{"token":""}"#).unwrap();
        assert!(r.into_token().is_none());
    }
}

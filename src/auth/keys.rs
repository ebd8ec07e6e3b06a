use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use tracing::{debug, info, warn};

use super::{AuthError, Claims};
use crate::config::IdentityConfig;

/// Public signing material, loaded once at startup and never mutated
enum KeySet {
    /// A single configured key; the token `kid` is not consulted
    Static(DecodingKey),
    /// Provider JWKS keyed by `kid`
    Jwks(HashMap<String, DecodingKey>),
}

/// Verifies access tokens against the identity provider's public keys
pub struct TokenVerifier {
    keys: KeySet,
    validation: Validation,
}

impl TokenVerifier {
    /// Load key material as configured: a static PEM when present, otherwise
    /// the JWKS published at `https://{domain}/.well-known/jwks.json`.
    pub async fn load(config: &IdentityConfig) -> Result<Self, AuthError> {
        let algorithm = parse_algorithm(&config.algorithm)?;
        let issuer = config.domain.as_deref().map(issuer_for);

        let keys = match (&config.public_key_pem, &config.domain) {
            (Some(pem), _) => KeySet::Static(decoding_key_from_pem(pem, algorithm)?),
            (None, Some(domain)) => KeySet::Jwks(fetch_jwks(domain).await?),
            (None, None) => {
                return Err(AuthError::KeyMaterial(
                    "neither AUTH_PUBLIC_KEY_PEM nor AUTH0_DOMAIN is configured".to_string(),
                ))
            }
        };

        Ok(Self::with_keys(keys, algorithm, issuer, config.audience.clone()))
    }

    /// Build a verifier from a PEM encoded public key
    pub fn from_pem(
        pem: &str,
        algorithm: &str,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Result<Self, AuthError> {
        let algorithm = parse_algorithm(algorithm)?;
        let key = decoding_key_from_pem(pem, algorithm)?;
        Ok(Self::with_keys(KeySet::Static(key), algorithm, issuer, audience))
    }

    /// Build a verifier from an already fetched key set
    pub fn from_jwks(
        set: &JwkSet,
        algorithm: &str,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Result<Self, AuthError> {
        let algorithm = parse_algorithm(algorithm)?;
        let keys = keys_from_jwks(set)?;
        Ok(Self::with_keys(KeySet::Jwks(keys), algorithm, issuer, audience))
    }

    fn with_keys(
        keys: KeySet,
        algorithm: Algorithm,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Self {
        // Only the configured asymmetric algorithm is accepted
        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Self { keys, validation }
    }

    /// Decode and verify a token, returning its claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if !self.validation.algorithms.contains(&header.alg) {
            warn!("Rejected token signed with {:?}", header.alg);
            return Err(AuthError::InvalidToken(
                "unexpected signing algorithm".to_string(),
            ));
        }

        let key = match &self.keys {
            KeySet::Static(key) => key,
            KeySet::Jwks(keys) => header
                .kid
                .as_deref()
                .and_then(|kid| keys.get(kid))
                .ok_or(AuthError::UnknownKey)?,
        };

        let data = decode::<Claims>(token, key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => {
                AuthError::InvalidToken("incorrect claims, please check the audience and issuer".to_string())
            }
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        debug!("Verified token for subject {}", data.claims.sub);
        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key_count = match &self.keys {
            KeySet::Static(_) => 1,
            KeySet::Jwks(keys) => keys.len(),
        };
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("key_count", &key_count)
            .finish_non_exhaustive()
    }
}

pub fn issuer_for(domain: &str) -> String {
    format!("https://{}/", domain.trim_end_matches('/'))
}

fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    let algorithm = Algorithm::from_str(name)
        .map_err(|_| AuthError::KeyMaterial(format!("unknown algorithm {}", name)))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(AuthError::KeyMaterial(
            format!("symmetric algorithm {} is not accepted", name),
        )),
        other => Ok(other),
    }
}

fn decoding_key_from_pem(pem: &str, algorithm: Algorithm) -> Result<DecodingKey, AuthError> {
    let bytes = pem.as_bytes();
    let key = match algorithm {
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(bytes),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(bytes),
        _ => DecodingKey::from_rsa_pem(bytes),
    };
    key.map_err(|e| AuthError::KeyMaterial(format!("invalid public key: {}", e)))
}

fn keys_from_jwks(set: &JwkSet) -> Result<HashMap<String, DecodingKey>, AuthError> {
    let mut keys = HashMap::new();
    for jwk in &set.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            continue;
        };
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid, key);
            }
            Err(e) => warn!("Skipping unusable JWK {}: {}", kid, e),
        }
    }

    if keys.is_empty() {
        return Err(AuthError::KeyMaterial("JWKS contains no usable keys".to_string()));
    }
    Ok(keys)
}

async fn fetch_jwks(domain: &str) -> Result<HashMap<String, DecodingKey>, AuthError> {
    let url = url::Url::parse(&issuer_for(domain))
        .and_then(|base| base.join(".well-known/jwks.json"))
        .map_err(|e| AuthError::KeyMaterial(format!("invalid identity domain: {}", e)))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;

    let set = client
        .get(url.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AuthError::KeyMaterial(format!("failed to fetch {}: {}", url, e)))?
        .json::<JwkSet>()
        .await
        .map_err(|e| AuthError::KeyMaterial(format!("invalid JWKS document: {}", e)))?;

    let keys = keys_from_jwks(&set)?;
    info!("Loaded {} signing keys from {}", keys.len(), url);
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const PRIVATE_KEY: &str = include_str!("../../tests/fixtures/signing_key.pem");
    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/signing_key.pub.pem");
    const FOREIGN_KEY: &str = include_str!("../../tests/fixtures/foreign_key.pem");
    const AUDIENCE: &str = "kestrel-api";
    const DOMAIN: &str = "kestrel.test";

    fn verifier() -> TokenVerifier {
        TokenVerifier::from_pem(
            PUBLIC_KEY,
            "RS256",
            Some(issuer_for(DOMAIN)),
            Some(AUDIENCE.to_string()),
        )
        .unwrap()
    }

    fn claims(exp_offset: i64) -> serde_json::Value {
        json!({
            "sub": "auth0|player-one",
            "permissions": ["get:games"],
            "aud": AUDIENCE,
            "iss": issuer_for(DOMAIN),
            "exp": (Utc::now() + Duration::seconds(exp_offset)).timestamp(),
        })
    }

    fn sign(claims: &serde_json::Value, pem: &str) -> String {
        let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
        encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
    }

    #[test]
    fn verifies_signed_token() {
        let token = sign(&claims(3600), PRIVATE_KEY);
        let verified = verifier().verify(&token).unwrap();
        assert_eq!(verified.sub, "auth0|player-one");
        assert_eq!(verified.permissions, vec!["get:games".to_string()]);
    }

    #[test]
    fn rejects_expired_token() {
        let token = sign(&claims(-3600), PRIVATE_KEY);
        assert!(matches!(verifier().verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn rejects_token_signed_by_other_key() {
        let token = sign(&claims(3600), FOREIGN_KEY);
        assert!(matches!(verifier().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn rejects_symmetric_substitution() {
        // HS256 signed with the public key bytes as the shared secret
        let key = EncodingKey::from_secret(PUBLIC_KEY.as_bytes());
        let token = encode(&Header::new(Algorithm::HS256), &claims(3600), &key).unwrap();
        assert!(matches!(verifier().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn rejects_missing_permissions_claim() {
        let mut body = claims(3600);
        body.as_object_mut().unwrap().remove("permissions");
        let token = sign(&body, PRIVATE_KEY);
        assert!(matches!(verifier().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn rejects_wrong_audience() {
        let mut body = claims(3600);
        body["aud"] = json!("someone-else");
        let token = sign(&body, PRIVATE_KEY);
        assert!(matches!(verifier().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn selects_jwks_key_by_kid() {
        let set: JwkSet =
            serde_json::from_str(include_str!("../../tests/fixtures/jwks.json")).unwrap();
        let verifier =
            TokenVerifier::from_jwks(&set, "RS256", None, Some(AUDIENCE.to_string())).unwrap();
        let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap();

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some("kestrel-test-key".to_string());
        let token = encode(&header, &claims(3600), &key).unwrap();
        assert_eq!(verifier.verify(&token).unwrap().sub, "auth0|player-one");

        header.kid = Some("rotated-away".to_string());
        let token = encode(&header, &claims(3600), &key).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::UnknownKey)));
    }

    #[test]
    fn refuses_symmetric_configuration() {
        assert!(matches!(
            TokenVerifier::from_pem(PUBLIC_KEY, "HS256", None, None),
            Err(AuthError::KeyMaterial(_))
        ));
    }
}

// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Signed session tokens used as the MQTT password
//!
//! Tokens carry `aud`, `iat` and `exp` claims and are signed with the device
//! private key. A token is considered due for renewal `refresh_margin` before
//! it expires; the MQTT transport reconnects with a fresh one at that point.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;
use crate::error::{GatewayError, GatewayResult};

/// JWT claims expected by the broker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// A minted token and its validity window (Unix seconds)
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub value: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl SignedToken {
    /// True once `now` is inside the renewal margin (or past expiry)
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now.timestamp() >= self.expires_at - margin.num_seconds()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}

pub struct TokenMinter {
    audience: String,
    algorithm: Algorithm,
    key: EncodingKey,
    ttl: Duration,
    refresh_margin: Duration,
}

impl TokenMinter {
    /// Read and parse the signing key; any failure is fatal at startup
    pub fn from_config(config: &TokenConfig) -> GatewayResult<Self> {
        let pem = std::fs::read(&config.private_key_path).map_err(|e| {
            GatewayError::StartupFatal(format!(
                "cannot read signing key '{}': {}",
                config.private_key_path, e
            ))
        })?;

        Self::from_pem(
            &config.audience,
            &config.algorithm,
            &pem,
            Duration::seconds(config.ttl_seconds as i64),
            Duration::seconds(config.refresh_margin_seconds as i64),
        )
    }

    pub fn from_pem(
        audience: &str,
        algorithm: &str,
        pem: &[u8],
        ttl: Duration,
        refresh_margin: Duration,
    ) -> GatewayResult<Self> {
        let (algorithm, key) = match algorithm {
            "RS256" => (Algorithm::RS256, EncodingKey::from_rsa_pem(pem)),
            "ES256" => (Algorithm::ES256, EncodingKey::from_ec_pem(pem)),
            other => {
                return Err(GatewayError::StartupFatal(format!(
                    "unsupported token algorithm '{}'",
                    other
                )))
            }
        };
        let key = key.map_err(|e| {
            GatewayError::StartupFatal(format!("invalid {:?} signing key: {}", algorithm, e))
        })?;

        Ok(Self {
            audience: audience.to_string(),
            algorithm,
            key,
            ttl,
            refresh_margin,
        })
    }

    pub fn refresh_margin(&self) -> Duration {
        self.refresh_margin
    }

    pub fn mint(&self) -> GatewayResult<SignedToken> {
        self.mint_at(Utc::now())
    }

    pub fn mint_at(&self, now: DateTime<Utc>) -> GatewayResult<SignedToken> {
        let claims = TokenClaims {
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let value = encode(&Header::new(self.algorithm), &claims, &self.key)
            .map_err(|e| GatewayError::StartupFatal(format!("token signing failed: {}", e)))?;

        Ok(SignedToken {
            value,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Whether `token` should be replaced at `now`
    pub fn is_due(&self, token: &SignedToken, now: DateTime<Utc>) -> bool {
        token.needs_refresh(now, self.refresh_margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const EC_PRIVATE: &[u8] = include_bytes!("../../tests/fixtures/ec_private.pem");
    const EC_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/ec_public.pem");
    const RSA_PRIVATE: &[u8] = include_bytes!("../../tests/fixtures/rsa_private.pem");
    const RSA_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/rsa_public.pem");

    fn minter(algorithm: &str, pem: &[u8]) -> TokenMinter {
        TokenMinter::from_pem(
            "visionedgeiot",
            algorithm,
            pem,
            Duration::hours(24),
            Duration::hours(1),
        )
        .unwrap()
    }

    #[test]
    fn test_es256_token_claims() {
        let now = Utc::now();
        let token = minter("ES256", EC_PRIVATE).mint_at(now).unwrap();

        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_audience(&["visionedgeiot"]);
        let decoded = decode::<TokenClaims>(
            &token.value,
            &DecodingKey::from_ec_pem(EC_PUBLIC).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.aud, "visionedgeiot");
        assert_eq!(decoded.claims.iat, now.timestamp());
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 24 * 3600);
    }

    #[test]
    fn test_rs256_token_verifies() {
        let token = minter("RS256", RSA_PRIVATE).mint().unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["visionedgeiot"]);
        let decoded = decode::<TokenClaims>(
            &token.value,
            &DecodingKey::from_rsa_pem(RSA_PUBLIC).unwrap(),
            &validation,
        );
        assert!(decoded.is_ok());
    }

    #[test]
    fn test_refresh_window() {
        let minter = minter("ES256", EC_PRIVATE);
        let issued = Utc::now();
        let token = minter.mint_at(issued).unwrap();

        assert!(!minter.is_due(&token, issued));
        assert!(!minter.is_due(&token, issued + Duration::hours(22)));
        assert!(minter.is_due(&token, issued + Duration::hours(23)));
        assert!(!token.is_expired(issued + Duration::hours(23)));
        assert!(token.is_expired(issued + Duration::hours(24)));
    }

    #[test]
    fn test_invalid_key_is_fatal() {
        let result = TokenMinter::from_pem(
            "aud",
            "RS256",
            b"not a key",
            Duration::hours(1),
            Duration::minutes(5),
        );
        assert!(matches!(result, Err(GatewayError::StartupFatal(_))));
    }

    #[test]
    fn test_unknown_algorithm_is_fatal() {
        let result = TokenMinter::from_pem(
            "aud",
            "HS256",
            EC_PRIVATE,
            Duration::hours(1),
            Duration::minutes(5),
        );
        assert!(matches!(result, Err(GatewayError::StartupFatal(_))));
    }
}

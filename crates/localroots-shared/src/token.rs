//! Signed bearer tokens for the marketplace API.
//!
//! Claims are serialized as canonical JSON and signed with the issuer's
//! Ed25519 key.  Verification checks the signature first, then expiry, so a
//! tampered token is never treated as merely expired.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_TTL_SECS;
use crate::error::TokenError;
use crate::types::Role;

/// The signed portion of an [`AuthToken`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Account identifier (the storefront uses the email address).
    pub subject: String,
    /// Role the holder acts under.
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A verifiable bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub claims: TokenClaims,
    /// Ed25519 signature over the canonical JSON claims bytes.
    pub signature: Vec<u8>,
}

impl AuthToken {
    /// Issue a token valid for [`TOKEN_TTL_SECS`] from now.
    pub fn issue(signing_key: &SigningKey, subject: &str, role: Role) -> Self {
        Self::issue_with_ttl(signing_key, subject, role, Duration::seconds(TOKEN_TTL_SECS))
    }

    /// Issue a token with an explicit lifetime.
    pub fn issue_with_ttl(
        signing_key: &SigningKey,
        subject: &str,
        role: Role,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        let claims = TokenClaims {
            subject: subject.to_string(),
            role,
            issued_at: now,
            expires_at: now + ttl,
        };

        let payload = claims_bytes(&claims);
        let signature = signing_key.sign(&payload);

        Self {
            claims,
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// Encode the token as a URL-safe base64 string (the wire form handed to
    /// clients as the bearer credential).
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("token serialization");
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a wire-form token.  Decoding performs no verification.
    pub fn decode(encoded: &str) -> Result<Self, TokenError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Verify the signature against `issuer_key`, then check expiry.
    /// Returns the claims on success.
    pub fn verify(&self, issuer_key: &VerifyingKey) -> Result<&TokenClaims, TokenError> {
        let signature =
            Signature::from_slice(&self.signature).map_err(|_| TokenError::InvalidSignature)?;

        let payload = claims_bytes(&self.claims);
        issuer_key
            .verify(&payload, &signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        if Utc::now() > self.claims.expires_at {
            return Err(TokenError::Expired);
        }

        Ok(&self.claims)
    }
}

fn claims_bytes(claims: &TokenClaims) -> Vec<u8> {
    // serde_json emits struct fields in declaration order, so this is a
    // stable canonical form for signing.
    serde_json::to_vec(claims).expect("claims serialization")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn keypair() -> (SigningKey, VerifyingKey) {
        let signing = SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    #[test]
    fn valid_token_round_trips() {
        let (signing, verifying) = keypair();
        let token = AuthToken::issue(&signing, "amara@localroots.example", Role::Seller);

        let decoded = AuthToken::decode(&token.encode()).unwrap();
        let claims = decoded.verify(&verifying).unwrap();

        assert_eq!(claims.subject, "amara@localroots.example");
        assert_eq!(claims.role, Role::Seller);
    }

    #[test]
    fn tampered_claims_fail_verification() {
        let (signing, verifying) = keypair();
        let mut token = AuthToken::issue(&signing, "buyer@localroots.example", Role::Buyer);

        // Forge an elevated role after signing.
        token.claims.role = Role::Seller;

        assert!(matches!(
            token.verify(&verifying),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_issuer_key_fails_verification() {
        let (signing, _) = keypair();
        let (_, other_verifying) = keypair();
        let token = AuthToken::issue(&signing, "buyer@localroots.example", Role::Buyer);

        assert!(matches!(
            token.verify(&other_verifying),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let (signing, verifying) = keypair();
        let token = AuthToken::issue_with_ttl(
            &signing,
            "buyer@localroots.example",
            Role::Buyer,
            Duration::seconds(-60),
        );

        assert!(matches!(token.verify(&verifying), Err(TokenError::Expired)));
    }

    #[test]
    fn garbage_input_is_malformed() {
        assert!(matches!(
            AuthToken::decode("not-a-token!!"),
            Err(TokenError::Malformed(_))
        ));
    }
}

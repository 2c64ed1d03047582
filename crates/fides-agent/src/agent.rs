use fides_attestation::{create_attestation, Attestation};
use fides_crypto::KeyPair;
use fides_discovery::{RegisterIdentityRequest, RegistryClient, Resolver};
use fides_httpsig::{
    sign_request, verify_request, HttpMessage, SignOptions, VerificationOutcome, VerifyOptions,
};
use fides_identity::{Did, FileKeystore, Keystore};
use fides_trust::{CreateTrustRequest, CreateTrustResponse, PathResult, TrustScoreResponse};

use crate::config::AgentConfig;
use crate::error::AgentError;

/// A client-side protocol participant.
///
/// Owns a keystore rooted at the configured key directory; private keys are
/// loaded from it on demand for each signing operation and never cached in
/// the agent itself.
pub struct Agent {
    config: AgentConfig,
    keystore: FileKeystore,
    registry: RegistryClient,
    resolver: Resolver,
    http: reqwest::Client,
}

impl Agent {
    /// Build an agent from configuration, with a plaintext keystore.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let keystore = FileKeystore::new(&config.key_dir)?;
        Self::with_keystore(config, keystore)
    }

    /// Build an agent whose keystore encrypts private seeds.
    pub fn with_passphrase(
        config: AgentConfig,
        passphrase: impl Into<String>,
    ) -> Result<Self, AgentError> {
        let keystore = FileKeystore::with_passphrase(&config.key_dir, passphrase)?;
        Self::with_keystore(config, keystore)
    }

    fn with_keystore(config: AgentConfig, keystore: FileKeystore) -> Result<Self, AgentError> {
        let registry = RegistryClient::new(&config.discovery_url)?;
        let resolver = Resolver::new(RegistryClient::new(&config.discovery_url)?);
        let http = reqwest::Client::new();
        Ok(Self {
            config,
            keystore,
            registry,
            resolver,
            http,
        })
    }

    /// The active identifier this agent signs with.
    pub fn active_did(&self) -> Result<Did, AgentError> {
        let id = self
            .config
            .active_identifier
            .as_deref()
            .ok_or(AgentError::NoActiveIdentity)?;
        Did::new(id).map_err(AgentError::Key)
    }

    /// Generate a key pair, persist it, register the identity, and make it
    /// the active identifier.
    pub async fn mint_identity(
        &mut self,
        metadata: Option<serde_json::Value>,
        domain: Option<String>,
    ) -> Result<Did, AgentError> {
        let keypair = KeyPair::generate();
        let did = Did::from_public_key(&keypair.public_key());
        self.keystore.save(&did, &keypair)?;

        self.registry
            .register(&RegisterIdentityRequest {
                did: did.to_string(),
                public_key: keypair.public_key().to_hex(),
                metadata,
                domain,
            })
            .await?;

        self.config.active_identifier = Some(did.to_string());
        tracing::info!(did = %did, "identity minted and registered");
        Ok(did)
    }

    /// Sign an outgoing request with the active identity's key.
    pub fn sign(&self, request: &mut HttpMessage) -> Result<(), AgentError> {
        let did = self.active_did()?;
        let keypair = self.keystore.load(&did)?;
        sign_request(request, &keypair, &SignOptions::new(did.as_str()))?;
        Ok(())
    }

    /// Verify an incoming request claimed to be from `sender`, resolving
    /// the sender's public key through the discovery layer.
    pub async fn verify(
        &self,
        request: &impl fides_httpsig::CanonicalRequest,
        sender: &str,
        options: &VerifyOptions,
    ) -> Result<VerificationOutcome, AgentError> {
        let resolved = self.resolver.resolve(sender).await?;
        let key_bytes = fides_crypto::hex_decode(&resolved.public_key).map_err(|e| {
            fides_discovery::DiscoveryError::InvalidResponse(format!(
                "resolved key is not hex: {e}"
            ))
        })?;
        Ok(verify_request(request, &key_bytes, options))
    }

    /// Create a signed attestation for `subject` and submit it to the trust
    /// graph service.
    pub async fn attest(
        &self,
        subject: &str,
        trust_level: i64,
    ) -> Result<(Attestation, CreateTrustResponse), AgentError> {
        let did = self.active_did()?;
        let keypair = self.keystore.load(&did)?;
        let attestation = create_attestation(did.as_str(), subject, trust_level, &keypair)?;

        let request = CreateTrustRequest {
            issuer_did: attestation.issuer_did.clone(),
            subject_did: attestation.subject_did.clone(),
            trust_level: attestation.trust_level.into(),
            signature: attestation.signature.clone(),
            payload: attestation.payload.clone(),
            expires_at: None,
        };

        let response = self
            .http
            .post(format!("{}/v1/trust", self.config.trust_url))
            .json(&request)
            .send()
            .await?;
        let status = response.status().as_u16();
        if status != 201 {
            return Err(trust_rejection(status, response).await);
        }

        let created: CreateTrustResponse = response.json().await?;
        tracing::info!(
            issuer = %attestation.issuer_did,
            subject = %attestation.subject_did,
            level = attestation.trust_level,
            edge = created.id,
            "trust attestation published"
        );
        Ok((attestation, created))
    }

    /// Fetch the reputation score of an identifier.
    pub async fn reputation_of(&self, did: &str) -> Result<TrustScoreResponse, AgentError> {
        let response = self
            .http
            .get(format!("{}/v1/trust/{did}/score", self.config.trust_url))
            .send()
            .await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(trust_rejection(status, response).await);
        }
        Ok(response.json().await?)
    }

    /// Find the shortest trust path between two identifiers.
    pub async fn path_between(&self, from: &str, to: &str) -> Result<PathResult, AgentError> {
        let response = self
            .http
            .get(format!("{}/v1/trust/{from}/{to}", self.config.trust_url))
            .send()
            .await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(trust_rejection(status, response).await);
        }
        Ok(response.json().await?)
    }

    /// The configuration in effect.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

async fn trust_rejection(status: u16, response: reqwest::Response) -> AgentError {
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => format!("status {status}"),
    };
    AgentError::TrustService { status, message }
}

use url::Url;

use crate::error::SignatureError;
use crate::message::CanonicalRequest;

/// Parsed or to-be-serialized signature parameters.
///
/// Serialization order is fixed: components, `created`, `expires`, `nonce`
/// (when present), `keyid`, `alg`. Parsing accepts parameters in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParams {
    pub label: String,
    pub components: Vec<String>,
    pub created: u64,
    pub expires: u64,
    pub nonce: Option<String>,
    pub key_id: String,
    pub algorithm: String,
}

impl SignatureParams {
    /// The parameter member as it appears after the component list, e.g.
    /// `("@method" "@target-uri");created=1;expires=2;keyid="k";alg="ed25519"`.
    pub fn params_member(&self) -> String {
        let list = self
            .components
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(" ");

        let mut out = format!("({list});created={};expires={}", self.created, self.expires);
        if let Some(nonce) = &self.nonce {
            out.push_str(&format!(";nonce=\"{nonce}\""));
        }
        out.push_str(&format!(";keyid=\"{}\";alg=\"{}\"", self.key_id, self.algorithm));
        out
    }

    /// Serialize as a full `Signature-Input` header value.
    pub fn to_signature_input(&self) -> String {
        format!("{}={}", self.label, self.params_member())
    }

    /// Parse a `Signature-Input` header value of the form
    /// `label=(c1 c2 ...);k1=v1;...`.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let malformed = |msg: &str| SignatureError::MalformedSignatureInput(msg.to_string());

        let (label, rest) = header
            .split_once('=')
            .ok_or_else(|| malformed("missing label"))?;
        let label = label.trim();
        if label.is_empty() {
            return Err(malformed("empty label"));
        }

        let rest = rest.trim();
        if !rest.starts_with('(') {
            return Err(malformed("component list must start with '('"));
        }
        let close = rest
            .find(')')
            .ok_or_else(|| malformed("unterminated component list"))?;

        let components = rest[1..close]
            .split_whitespace()
            .map(|c| c.trim_matches('"').to_string())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();
        if components.is_empty() {
            return Err(malformed("empty component list"));
        }

        let mut created = None;
        let mut expires = None;
        let mut nonce = None;
        let mut key_id = None;
        let mut algorithm = None;

        for param in rest[close + 1..].split(';') {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, value) = param
                .split_once('=')
                .ok_or_else(|| malformed("parameter without value"))?;
            match name.trim() {
                "created" => {
                    created = Some(value.parse::<u64>().map_err(|_| {
                        malformed("created must be an unquoted integer")
                    })?)
                }
                "expires" => {
                    expires = Some(value.parse::<u64>().map_err(|_| {
                        malformed("expires must be an unquoted integer")
                    })?)
                }
                "nonce" => nonce = Some(unquote(value, "nonce")?),
                "keyid" => key_id = Some(unquote(value, "keyid")?),
                "alg" => algorithm = Some(unquote(value, "alg")?),
                // Unknown parameters are preserved by intermediaries but
                // carry no meaning here.
                _ => {}
            }
        }

        Ok(Self {
            label: label.to_string(),
            components,
            created: created.ok_or_else(|| malformed("missing created"))?,
            expires: expires.ok_or_else(|| malformed("missing expires"))?,
            nonce,
            key_id: key_id.ok_or_else(|| malformed("missing keyid"))?,
            algorithm: algorithm.ok_or_else(|| malformed("missing alg"))?,
        })
    }
}

fn unquote(value: &str, name: &str) -> Result<String, SignatureError> {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(value[1..value.len() - 1].to_string())
    } else {
        Err(SignatureError::MalformedSignatureInput(format!(
            "{name} must be double-quoted"
        )))
    }
}

/// Build the RFC 9421 signature base for a request.
///
/// One line per component in order, then the closing
/// `"@signature-params"` line.
pub fn signature_base(
    request: &impl CanonicalRequest,
    params: &SignatureParams,
) -> Result<String, SignatureError> {
    let mut lines = Vec::with_capacity(params.components.len() + 1);

    for component in &params.components {
        let value = if component.starts_with('@') {
            derived_component(request, component)?
        } else {
            request
                .header(component)
                .ok_or_else(|| SignatureError::MissingComponent(component.clone()))?
                .to_string()
        };
        lines.push(format!("\"{component}\": {value}"));
    }

    lines.push(format!(
        "\"@signature-params\": {}",
        params.params_member()
    ));
    Ok(lines.join("\n"))
}

fn derived_component(
    request: &impl CanonicalRequest,
    name: &str,
) -> Result<String, SignatureError> {
    match name {
        "@method" => Ok(request.method().to_uppercase()),
        "@target-uri" => Ok(request.target_uri().to_string()),
        "@authority" => {
            let url = parse_target(request)?;
            let host = url
                .host_str()
                .ok_or_else(|| SignatureError::InvalidTargetUri("missing host".into()))?;
            // Url::port() is None for the scheme's default port.
            Ok(match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
        }
        "@path" => {
            let url = parse_target(request)?;
            Ok(match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            })
        }
        other => Err(SignatureError::UnknownDerivedComponent(other.to_string())),
    }
}

fn parse_target(request: &impl CanonicalRequest) -> Result<Url, SignatureError> {
    Url::parse(request.target_uri())
        .map_err(|e| SignatureError::InvalidTargetUri(e.to_string()))
}

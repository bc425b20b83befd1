//! Configuration validation.

use std::path::PathBuf;

use super::TlsConfig;

/// Lowest accepted sampling temperature.
pub const MIN_TEMPERATURE: f32 = 0.6;
/// Highest accepted sampling temperature.
pub const MAX_TEMPERATURE: f32 = 1.2;

/// Build the TLS config, requiring cert and key together.
pub(super) fn validate_tls(
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => {
            Err("TLS certificate configured without a private key (TLS_KEY_PATH)".into())
        }
        (None, Some(_)) => {
            Err("TLS private key configured without a certificate (TLS_CERT_PATH)".into())
        }
    }
}

pub(super) fn validate_temperature(temperature: f32) -> Result<(), Box<dyn std::error::Error>> {
    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(format!(
            "Temperature {temperature} is out of range [{MIN_TEMPERATURE}, {MAX_TEMPERATURE}]"
        )
        .into());
    }
    Ok(())
}

/// The public URL must be an absolute http(s) URL.
pub(super) fn validate_public_url(
    public_url: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(raw) = public_url else {
        return Ok(());
    };

    let parsed = url::Url::parse(raw).map_err(|e| format!("Invalid PUBLIC_URL '{raw}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(format!("PUBLIC_URL must be an http(s) URL with a host, got '{raw}'").into());
    }
    Ok(())
}

pub(super) fn validate_mark_name(mark_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    if mark_name.trim().is_empty() {
        return Err("Mark name must not be empty".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_requires_both_paths() {
        assert!(validate_tls(None, None).unwrap().is_none());
        assert!(
            validate_tls(Some("cert.pem".into()), Some("key.pem".into()))
                .unwrap()
                .is_some()
        );
        assert!(validate_tls(Some("cert.pem".into()), None).is_err());
        assert!(validate_tls(None, Some("key.pem".into())).is_err());
    }

    #[test]
    fn test_temperature_range() {
        assert!(validate_temperature(0.6).is_ok());
        assert!(validate_temperature(0.8).is_ok());
        assert!(validate_temperature(1.2).is_ok());
        assert!(validate_temperature(0.5).is_err());
        assert!(validate_temperature(1.5).is_err());
    }

    #[test]
    fn test_public_url() {
        assert!(validate_public_url(&None).is_ok());
        assert!(validate_public_url(&Some("https://relay.example.com".into())).is_ok());
        assert!(validate_public_url(&Some("http://localhost:5050".into())).is_ok());
        assert!(validate_public_url(&Some("relay.example.com".into())).is_err());
        assert!(validate_public_url(&Some("wss://relay.example.com".into())).is_err());
    }

    #[test]
    fn test_mark_name() {
        assert!(validate_mark_name("responsePart").is_ok());
        assert!(validate_mark_name(" ").is_err());
    }
}

//! TLS configuration and certificate loading.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

fn ensure_exists(path: &Path, what: &str) -> io::Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} file not found: {}", what, path.display()),
        ))
    }
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> io::Result<RustlsConfig> {
    ensure_exists(cert_path, "Certificate")?;
    ensure_exists(key_path, "Private key")?;
    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Replace the certificate of a running listener in place.
///
/// On error the listener keeps serving the previous certificate.
pub async fn reload_tls_config(tls: &RustlsConfig, cert_path: &Path, key_path: &Path) -> io::Result<()> {
    ensure_exists(cert_path, "Certificate")?;
    ensure_exists(key_path, "Private key")?;
    tls.reload_from_pem_file(cert_path, key_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_files_are_reported() {
        let err = load_tls_config(Path::new("/no/cert.pem"), Path::new("/no/key.pem"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("Certificate"));
    }
}

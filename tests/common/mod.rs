//! Shared fixtures for live server tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use courier::server::Config;
use courier::{Client, tls};
use rustls::pki_types::ServerName;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// A self-signed certificate for `localhost`, written to a scratch directory.
pub struct TestCert {
    _dir: TempDir,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TestCert {
    pub fn generate() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_path = dir.path().join("lb.crt");
        let key_path = dir.path().join("lb.key");
        std::fs::write(&cert_path, certified.cert.pem()).unwrap();
        std::fs::write(&key_path, certified.key_pair.serialize_pem()).unwrap();
        Self {
            _dir: dir,
            cert_path,
            key_path,
        }
    }
}

/// Loopback config on an ephemeral port with the heartbeat disabled.
pub fn config(cert: &TestCert) -> Config {
    let mut config = Config::default();
    config.server.address = "127.0.0.1:0".to_string();
    config.tls.cert_path = cert.cert_path.clone();
    config.tls.key_path = cert.key_path.clone();
    config.heartbeat.enabled = false;
    config
}

pub fn client(addr: SocketAddr, cert: &TestCert) -> Client {
    let tls = tls::client_config(&cert.cert_path).unwrap();
    Client::with_tls_config(&addr.to_string(), "localhost", tls, Duration::from_secs(5)).unwrap()
}

/// Send raw bytes over TLS and return the first response line.
pub async fn raw_exchange(addr: SocketAddr, cert: &TestCert, request: &[u8]) -> String {
    let connector = TlsConnector::from(tls::client_config(&cert.cert_path).unwrap());
    let tcp = TcpStream::connect(addr).await.unwrap();
    let name = ServerName::try_from("localhost").unwrap();
    let mut stream = connector.connect(name, tcp).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.flush().await.unwrap();

    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line).await.unwrap();
    line
}

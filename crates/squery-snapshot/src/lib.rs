//! squery snapshot
//!
//! Decoder for virtual server snapshots.
//!
//! `serversnapshotcreate` answers with a [`RawSnapshot`]: a format version, a
//! salt and a base64 encoded, zstd compressed payload. [`RawSnapshot::decode`]
//! unpacks the payload and splits it into the sections of a [`Snapshot`].
//!
//! Only unencrypted snapshots are supported.
//!
//! # Example
//!
//! ```no_run
//! use squery_snapshot::RawSnapshot;
//!
//! fn summary(raw: &RawSnapshot) -> squery_snapshot::Result<()> {
//!     let snapshot = raw.decode()?;
//!     println!(
//!         "{}: {} channels, {} clients",
//!         snapshot.virtual_server.name,
//!         snapshot.channels.len(),
//!         snapshot.clients.len()
//!     );
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod model;
mod sections;

pub use error::{Result, SnapshotError};
pub use model::*;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use squery_core::{record, Request};

record! {
    /// A snapshot as exported by the server
    pub struct RawSnapshot {
        pub version: u32 => "version",
        pub salt: String => "salt",
        pub data: String => "data",
    }
}

impl RawSnapshot {
    /// Unpack the payload into its text form
    pub fn decode_to_string(&self) -> Result<String> {
        let compressed = BASE64.decode(self.data.trim())?;
        let text = zstd::decode_all(compressed.as_slice()).map_err(SnapshotError::Decompress)?;
        tracing::trace!(
            compressed = compressed.len(),
            decompressed = text.len(),
            "snapshot payload unpacked"
        );
        Ok(String::from_utf8(text)?)
    }

    /// Unpack the payload and decode every section
    pub fn decode(&self) -> Result<Snapshot> {
        let text = self.decode_to_string()?;
        sections::parse(&text)
    }

    /// Request deploying this snapshot onto virtual server `server_id`
    ///
    /// Server id 0 deploys into a new virtual server. An empty `password`
    /// is left out.
    pub fn deploy_request(&self, server_id: u32, keep_files: bool, password: &str) -> Request {
        let mut request = Request::new("serversnapshotdeploy").server(server_id);
        if keep_files {
            request = request.flag("keepfiles");
        }
        if !password.is_empty() {
            request = request.arg("password", password);
        }
        request
            .arg("version", self.version)
            .arg("salt", &self.salt)
            .arg("data", &self.data)
    }
}

/// Request a snapshot of virtual server `server_id`
///
/// The reply decodes into a [`RawSnapshot`]. An empty `password` is left out.
pub fn create_request(server_id: u32, password: &str) -> Request {
    let request = Request::new("serversnapshotcreate").server(server_id);
    if password.is_empty() {
        request
    } else {
        request.arg("password", password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(text: &str) -> String {
        let compressed = zstd::encode_all(text.as_bytes(), 0).unwrap();
        BASE64.encode(compressed)
    }

    #[test]
    fn test_decode_to_string() {
        let raw = RawSnapshot {
            version: 3,
            salt: String::new(),
            data: pack("virtualserver_name=Test end_virtualserver"),
        };
        assert_eq!(
            raw.decode_to_string().unwrap(),
            "virtualserver_name=Test end_virtualserver"
        );
    }

    #[test]
    fn test_invalid_base64() {
        let raw = RawSnapshot {
            data: "***".to_string(),
            ..Default::default()
        };
        assert!(matches!(raw.decode(), Err(SnapshotError::Base64(_))));
    }

    #[test]
    fn test_invalid_zstd() {
        let raw = RawSnapshot {
            data: BASE64.encode(b"not compressed"),
            ..Default::default()
        };
        assert!(matches!(
            raw.decode_to_string(),
            Err(SnapshotError::Decompress(_))
        ));
    }

    #[test]
    fn test_create_request() {
        assert_eq!(
            create_request(1, "").to_string(),
            "serversnapshotcreate\n"
        );
        assert_eq!(create_request(1, "").server_id, 1);
        assert_eq!(
            create_request(1, "s3cret").to_string(),
            "serversnapshotcreate password=s3cret\n"
        );
    }

    #[test]
    fn test_deploy_request() {
        let raw = RawSnapshot {
            version: 3,
            salt: "c2FsdA==".to_string(),
            data: "KLUv/QBY".to_string(),
        };
        let request = raw.deploy_request(0, true, "");
        assert_eq!(
            request.to_string(),
            "serversnapshotdeploy -keepfiles version=3 salt=c2FsdA== data=KLUv\\/QBY\n"
        );
    }
}

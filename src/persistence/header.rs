use super::error::PersistenceError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;

/// `"BLOG"` read as a little-endian u32.
pub const LOG_SIGNATURE: u32 = u32::from_le_bytes(*b"BLOG");
pub const LOG_VERSION: u32 = 1;
/// signature + version + architecture, all little-endian u32.
pub const LOG_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Architecture {
    X86 = 1,
    X64 = 2,
    Arm64 = 3,
}

impl Architecture {
    pub fn current() -> Self {
        if cfg!(target_arch = "x86") {
            Architecture::X86
        } else if cfg!(target_arch = "aarch64") {
            Architecture::Arm64
        } else {
            Architecture::X64
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, PersistenceError> {
        match tag {
            1 => Ok(Architecture::X86),
            2 => Ok(Architecture::X64),
            3 => Ok(Architecture::Arm64),
            other => Err(PersistenceError::UnknownArchitecture(other)),
        }
    }
}

/// Fixed descriptor written once at the start of every log session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogHeader {
    pub signature: u32,
    pub version: u32,
    pub architecture: Architecture,
}

impl LogHeader {
    /// Header describing logs produced by this build.
    pub fn current() -> Self {
        Self {
            signature: LOG_SIGNATURE,
            version: LOG_VERSION,
            architecture: Architecture::current(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(LOG_HEADER_LEN);
        buf.put_u32_le(self.signature);
        buf.put_u32_le(self.version);
        buf.put_u32_le(self.architecture.tag());
        buf.freeze()
    }

    pub fn decode(mut data: &[u8]) -> Result<Self, PersistenceError> {
        if data.len() < LOG_HEADER_LEN {
            return Err(PersistenceError::Truncated {
                needed: LOG_HEADER_LEN,
                available: data.len(),
            });
        }

        let signature = data.get_u32_le();
        if signature != LOG_SIGNATURE {
            return Err(PersistenceError::InvalidSignature(signature));
        }
        let version = data.get_u32_le();
        if version != LOG_VERSION {
            return Err(PersistenceError::UnsupportedVersion(version));
        }
        let architecture = Architecture::from_tag(data.get_u32_le())?;

        Ok(Self {
            signature,
            version,
            architecture,
        })
    }
}

impl Default for LogHeader {
    fn default() -> Self {
        Self::current()
    }
}

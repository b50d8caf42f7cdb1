//! v2 and v3 message headers: packing, parsing and frame assembly.
//!
//! v3 is the current dialect: a 24-byte plaintext header carrying a
//! one's-complement checksum, followed by the payload verbatim. v2 is the
//! legacy dialect: an 18-byte header DES-CBC-encrypted to 24 bytes on the
//! wire, with the payload encrypted as a separate CBC stream and `Len`
//! giving the ciphertext size.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::{checksum, crypto};

/// v3 header length on the wire.
pub const HEADER_V3_LEN: usize = 24;
/// v2 header length before encryption.
pub const HEADER_V2_LEN: usize = 18;
/// v2 header length on the wire (PKCS#7-padded to the DES block).
pub const HEADER_V2_LEN_ENC: usize = 24;

/// v3 version byte.
pub const MSGV3_VERSION: u8 = 0x30;
/// v2 version magic.
pub const MSGV2_MAGIC: u16 = 202;

/// A v3 message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderV3 {
    pub version: u8,
    pub reserved: u8,
    pub customer_id: u32,
    pub client_id: u32,
    pub orch_id: u16,
    pub mtype: u16,
    pub len: u32,
    pub transaction_id: u32,
}

impl HeaderV3 {
    /// Create a header for a payload of `len` bytes, version preset.
    pub fn new(customer_id: u32, client_id: u32, orch_id: u16, mtype: u16, len: u32) -> Self {
        Self {
            version: MSGV3_VERSION,
            reserved: 0,
            customer_id,
            client_id,
            orch_id,
            mtype,
            len,
            transaction_id: 0,
        }
    }

    /// Pack the header, computing the checksum in place.
    pub fn pack(&self) -> [u8; HEADER_V3_LEN] {
        self.pack_with_checksum(None)
    }

    /// Pack the header; `force_checksum` writes the supplied value instead
    /// of the computed one.
    pub fn pack_with_checksum(&self, force_checksum: Option<u16>) -> [u8; HEADER_V3_LEN] {
        let mut buf = BytesMut::with_capacity(HEADER_V3_LEN);
        buf.put_u8(self.version);
        buf.put_u8(self.reserved);
        buf.put_u16(0); // checksum slot
        buf.put_u32(self.customer_id);
        buf.put_u32(self.client_id);
        buf.put_u16(self.orch_id);
        buf.put_u16(self.mtype);
        buf.put_u32(self.len);
        buf.put_u32(self.transaction_id);

        let mut header = [0u8; HEADER_V3_LEN];
        header.copy_from_slice(&buf);
        match force_checksum {
            None => checksum::embed(&mut header),
            Some(v) => checksum::embed_forced(&mut header, v),
        }
        header
    }

    /// Parse and validate a v3 header.
    ///
    /// Fails when the slice is not exactly [`HEADER_V3_LEN`] bytes, the
    /// checksum does not verify, or the version byte is wrong.
    pub fn parse(hdata: &[u8]) -> Result<Self> {
        if hdata.len() != HEADER_V3_LEN {
            return Err(Error::bad_frame(format!(
                "v3 header must be {HEADER_V3_LEN} bytes, got {}",
                hdata.len()
            )));
        }
        if !checksum::verify(hdata) {
            return Err(Error::bad_frame("v3 header checksum mismatch"));
        }
        let mut buf = hdata;
        let version = buf.get_u8();
        let reserved = buf.get_u8();
        let _checksum = buf.get_u16();
        let header = Self {
            version,
            reserved,
            customer_id: buf.get_u32(),
            client_id: buf.get_u32(),
            orch_id: buf.get_u16(),
            mtype: buf.get_u16(),
            len: buf.get_u32(),
            transaction_id: buf.get_u32(),
        };
        if header.version != MSGV3_VERSION {
            return Err(Error::bad_frame(format!(
                "bad v3 version byte {:#04x}",
                header.version
            )));
        }
        Ok(header)
    }

    /// Assemble a complete v3 frame: header (with `len` set from the
    /// payload) followed by the payload verbatim.
    pub fn encode_frame(&self, payload: &[u8]) -> Bytes {
        self.encode_frame_with_checksum(payload, None)
    }

    /// [`Self::encode_frame`] with the conformance-test checksum override.
    pub fn encode_frame_with_checksum(&self, payload: &[u8], force_checksum: Option<u16>) -> Bytes {
        let header = Self {
            len: payload.len() as u32,
            ..*self
        };
        let mut frame = BytesMut::with_capacity(HEADER_V3_LEN + payload.len());
        frame.put_slice(&header.pack_with_checksum(force_checksum));
        frame.put_slice(payload);
        frame.freeze()
    }
}

/// A v2 message header (plaintext form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderV2 {
    pub ver_magic: u16,
    pub orch_id: u16,
    pub customer_id: u32,
    pub client_id: u16,
    pub mtype: u16,
    pub len: u32,
    pub transaction_id: u32,
}

impl HeaderV2 {
    pub fn new(customer_id: u32, client_id: u16, orch_id: u16, mtype: u16, len: u32) -> Self {
        Self {
            ver_magic: MSGV2_MAGIC,
            orch_id,
            customer_id,
            client_id,
            mtype,
            len,
            transaction_id: 0,
        }
    }

    fn pack_plain(&self) -> [u8; HEADER_V2_LEN] {
        let mut buf = BytesMut::with_capacity(HEADER_V2_LEN);
        buf.put_u16(self.ver_magic);
        buf.put_u16(self.orch_id);
        buf.put_u32(self.customer_id);
        buf.put_u16(self.client_id);
        buf.put_u16(self.mtype);
        buf.put_u32(self.len);
        buf.put_u32(self.transaction_id);
        let mut header = [0u8; HEADER_V2_LEN];
        header.copy_from_slice(&buf);
        header
    }

    /// Pack and encrypt the header to its 24-byte wire form.
    pub fn pack(&self) -> Vec<u8> {
        crypto::encrypt(&self.pack_plain())
    }

    /// Decrypt and parse a v2 wire header.
    ///
    /// Fails when the slice is not exactly [`HEADER_V2_LEN_ENC`] bytes,
    /// decryption/unpadding fails, or the magic is wrong.
    pub fn parse(enchdata: &[u8]) -> Result<Self> {
        if enchdata.len() != HEADER_V2_LEN_ENC {
            return Err(Error::bad_frame(format!(
                "v2 wire header must be {HEADER_V2_LEN_ENC} bytes, got {}",
                enchdata.len()
            )));
        }
        let hdata = crypto::decrypt(enchdata)?;
        if hdata.len() != HEADER_V2_LEN {
            return Err(Error::bad_frame(format!(
                "v2 header decrypts to {} bytes, want {HEADER_V2_LEN}",
                hdata.len()
            )));
        }
        let mut buf = &hdata[..];
        let header = Self {
            ver_magic: buf.get_u16(),
            orch_id: buf.get_u16(),
            customer_id: buf.get_u32(),
            client_id: buf.get_u16(),
            mtype: buf.get_u16(),
            len: buf.get_u32(),
            transaction_id: buf.get_u32(),
        };
        if header.ver_magic != MSGV2_MAGIC {
            return Err(Error::bad_frame(format!(
                "bad v2 magic {}",
                header.ver_magic
            )));
        }
        Ok(header)
    }

    /// Assemble a complete v2 frame: the plaintext payload is encrypted as
    /// its own CBC stream, `Len` is set to the ciphertext size, and the
    /// encrypted header is prepended.
    pub fn encode_frame(&self, payload: &[u8]) -> Bytes {
        let encpayload = if payload.is_empty() {
            Vec::new()
        } else {
            crypto::encrypt(payload)
        };
        let header = Self {
            len: encpayload.len() as u32,
            ..*self
        };
        let mut frame = BytesMut::with_capacity(HEADER_V2_LEN_ENC + encpayload.len());
        frame.put_slice(&header.pack());
        frame.put_slice(&encpayload);
        frame.freeze()
    }
}

/// Decrypt a v2 payload stream.
pub fn decrypt_payload_v2(cipher: &[u8]) -> Result<Vec<u8>> {
    crypto::decrypt(cipher)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_v3() -> HeaderV3 {
        HeaderV3 {
            version: MSGV3_VERSION,
            reserved: 0,
            customer_id: 1909622898,
            client_id: 1,
            orch_id: 19096,
            mtype: 635,
            len: 0,
            transaction_id: 365869,
        }
    }

    #[test]
    fn test_v3_pack_checksum_verifies() {
        let packed = sample_v3().pack();
        assert!(checksum::verify(&packed));
        assert_eq!(packed[0], 0x30);
    }

    #[test]
    fn test_v3_flip_any_byte_fails_parse() {
        let packed = sample_v3().pack();
        for i in 0..packed.len() {
            let mut corrupted = packed;
            corrupted[i] ^= 0x01;
            assert!(HeaderV3::parse(&corrupted).is_err(), "byte {i}");
        }
    }

    #[test]
    fn test_v3_round_trip() {
        let header = sample_v3();
        let parsed = HeaderV3::parse(&header.pack()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_v3_frame_round_trip_with_payload() {
        let payload = b"netId: 0";
        let header = sample_v3();
        let frame = header.encode_frame(payload);
        assert_eq!(frame.len(), HEADER_V3_LEN + payload.len());
        let parsed = HeaderV3::parse(&frame[..HEADER_V3_LEN]).unwrap();
        assert_eq!(parsed.len as usize, payload.len());
        assert_eq!(&frame[HEADER_V3_LEN..], payload);
    }

    #[test]
    fn test_v3_empty_payload_round_trip() {
        let frame = sample_v3().encode_frame(b"");
        assert_eq!(frame.len(), HEADER_V3_LEN);
        let parsed = HeaderV3::parse(&frame).unwrap();
        assert_eq!(parsed.len, 0);
    }

    #[test]
    fn test_v3_rejects_short_input() {
        assert!(HeaderV3::parse(&[0u8; 20]).is_err());
        assert!(HeaderV3::parse(&[0u8; 25]).is_err());
    }

    #[test]
    fn test_v3_rejects_wrong_version() {
        let mut header = sample_v3();
        header.version = 0x31;
        let packed = header.pack();
        // Checksum is fine, the version byte is not.
        assert!(checksum::verify(&packed));
        assert!(HeaderV3::parse(&packed).is_err());
    }

    #[test]
    fn test_v3_forced_checksum_fails_verify() {
        let packed = sample_v3().pack_with_checksum(Some(0xdead));
        assert!(!checksum::verify(&packed));
        assert!(HeaderV3::parse(&packed).is_err());

        let frame = sample_v3().encode_frame_with_checksum(b"x", Some(0xdead));
        assert!(HeaderV3::parse(&frame[..HEADER_V3_LEN]).is_err());
    }

    #[test]
    fn test_v2_header_round_trip() {
        let mut header = HeaderV2::new(7, 3, 1, 384, 0);
        header.transaction_id = 42;
        let wire = header.pack();
        assert_eq!(wire.len(), HEADER_V2_LEN_ENC);
        assert_eq!(HeaderV2::parse(&wire).unwrap(), header);
    }

    #[test]
    fn test_v2_frame_round_trip() {
        let payload = b"0123456789abcdef";
        let header = HeaderV2::new(7, 3, 1, 384, 0);
        let frame = header.encode_frame(payload);
        let parsed = HeaderV2::parse(&frame[..HEADER_V2_LEN_ENC]).unwrap();
        assert_eq!(parsed.len as usize, frame.len() - HEADER_V2_LEN_ENC);
        let plain = decrypt_payload_v2(&frame[HEADER_V2_LEN_ENC..]).unwrap();
        assert_eq!(plain, payload);
    }

    #[test]
    fn test_v2_rejects_wrong_magic() {
        let mut header = HeaderV2::new(7, 3, 1, 384, 0);
        header.ver_magic = 203;
        assert!(HeaderV2::parse(&header.pack()).is_err());
    }

    #[test]
    fn test_v2_rejects_bad_length() {
        assert!(HeaderV2::parse(&[0u8; 18]).is_err());
    }
}

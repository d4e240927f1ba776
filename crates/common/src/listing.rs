//! Listing data as it lives off chain (blob store) and on chain (escrow record)

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::crypto::{EncryptedPayload, PublicKey, WrappedKey};
use crate::error::ProtocolError;
use crate::seed::Seed;

/// Currency address meaning "pay in native HBAR"
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
/// Decimals of native HBAR amounts on the EVM relay
pub const HBAR_DECIMALS: u32 = 8;
/// Decimals assumed for ERC-20 currencies
pub const TOKEN_DECIMALS: u32 = 18;

/// Per-seed JSON document published to the blob store
///
/// Field names match the documents browser clients already publish, so this
/// round-trips with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub token_id: String,
    pub price: String,
    /// `ivB64:ciphertextB64`
    pub encrypted_payload: String,
    /// Content key wrapped for the seller, standard base64
    pub encrypted_key: String,
    /// Seller's derived public key, standard base64
    pub public_key: String,
    #[serde(default)]
    pub seller: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl ListingDocument {
    pub fn encrypted_payload(&self) -> Result<EncryptedPayload, ProtocolError> {
        Ok(self.encrypted_payload.parse::<EncryptedPayload>()?)
    }

    pub fn wrapped_key(&self) -> Result<WrappedKey, ProtocolError> {
        Ok(WrappedKey::from_base64(&self.encrypted_key)?)
    }

    pub fn public_key(&self) -> Result<PublicKey, ProtocolError> {
        Ok(PublicKey::from_base64(&self.public_key)?)
    }
}

/// Escrow status of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductStatus {
    Initial,
    Paid,
    CodeSent,
    Completed,
    CompletedPaidOut,
    Refunded,
    Unknown(u8),
}

impl From<u8> for ProductStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => ProductStatus::Initial,
            1 => ProductStatus::Paid,
            2 => ProductStatus::CodeSent,
            3 => ProductStatus::Completed,
            4 => ProductStatus::CompletedPaidOut,
            5 => ProductStatus::Refunded,
            other => ProductStatus::Unknown(other),
        }
    }
}

impl From<ProductStatus> for u8 {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::Initial => 0,
            ProductStatus::Paid => 1,
            ProductStatus::CodeSent => 2,
            ProductStatus::Completed => 3,
            ProductStatus::CompletedPaidOut => 4,
            ProductStatus::Refunded => 5,
            ProductStatus::Unknown(other) => other,
        }
    }
}

impl ProductStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProductStatus::Initial => "Initial",
            ProductStatus::Paid => "Paid",
            ProductStatus::CodeSent => "Code Sent",
            ProductStatus::Completed => "Completed",
            ProductStatus::CompletedPaidOut => "Completed Paidout",
            ProductStatus::Refunded => "Refunded",
            ProductStatus::Unknown(_) => "Unknown",
        }
    }

    /// No further transition is possible
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ProductStatus::CompletedPaidOut | ProductStatus::Refunded
        )
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ProductStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8((*self).into())
    }
}

impl<'de> Deserialize<'de> for ProductStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(u8::deserialize(deserializer)?.into())
    }
}

/// Escrow contract's record for one product, as returned by `products(id)`
///
/// Keys are the hex strings the contract stores; an empty string (or `0x`)
/// means "not set yet".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub seller: String,
    pub price: u128,
    pub currency: String,
    pub status: ProductStatus,
    pub file_id: Seed,
    pub buyer: String,
    pub seller_pub_key: String,
    pub buyer_pub_key: String,
    pub encrypted_sym_key: String,
    /// Seconds the seller has to send the code after payment
    pub send_code_window: u64,
    /// Seconds the buyer has to confirm after the code was sent
    pub confirm_window: u64,
    /// Unix seconds, 0 until paid
    pub paid_at: u64,
    /// Unix seconds, 0 until the code was sent
    pub code_sent_at: u64,
}

fn hex_is_empty(value: &str) -> bool {
    value.is_empty() || value == "0x"
}

impl ProductRecord {
    pub fn seller_public_key(&self) -> Result<PublicKey, ProtocolError> {
        Ok(PublicKey::from_hex(&self.seller_pub_key)?)
    }

    /// Buyer's public key, recorded at purchase
    pub fn buyer_public_key(&self) -> Result<PublicKey, ProtocolError> {
        if hex_is_empty(&self.buyer_pub_key) {
            return Err(ProtocolError::InvalidPublicKey(
                "product has no buyer public key".into(),
            ));
        }
        Ok(PublicKey::from_hex(&self.buyer_pub_key)?)
    }

    /// Content key wrapped for the buyer, recorded at delivery
    pub fn wrapped_key(&self) -> Result<WrappedKey, ProtocolError> {
        if hex_is_empty(&self.encrypted_sym_key) {
            return Err(ProtocolError::DecryptionFailure(
                "product has no delivered key".into(),
            ));
        }
        Ok(WrappedKey::from_hex(&self.encrypted_sym_key)?)
    }

    pub fn is_hbar(&self) -> bool {
        is_hbar(&self.currency)
    }

    /// Price in whole currency units, e.g. `"12.5"`
    pub fn formatted_price(&self) -> String {
        format_units(self.price, decimals_for(&self.currency))
    }
}

pub fn is_hbar(currency: &str) -> bool {
    currency.eq_ignore_ascii_case(ZERO_ADDRESS)
}

/// Decimals used to display and parse amounts of `currency`
pub fn decimals_for(currency: &str) -> u32 {
    if is_hbar(currency) {
        HBAR_DECIMALS
    } else {
        TOKEN_DECIMALS
    }
}

/// Render base units as a decimal string, trimming trailing zeros
pub fn format_units(value: u128, decimals: u32) -> String {
    let base = 10u128.pow(decimals);
    let whole = value / base;
    let frac = value % base;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[derive(Debug, thiserror::Error)]
#[error("invalid amount {0:?}")]
pub struct AmountError(pub String);

/// Parse a decimal string into base units
pub fn parse_units(value: &str, decimals: u32) -> Result<u128, AmountError> {
    let err = || AmountError(value.to_string());
    let value = value.trim();
    let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(err());
    }
    if frac.len() > decimals as usize
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(err());
    }
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| err())?
    };
    let frac_units: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse().map_err(|_| err())?
    };
    whole
        .checked_mul(10u128.pow(decimals))
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(err)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{ContentKey, SecretKey};

    #[test]
    fn test_status_codes() {
        for code in 0u8..=5 {
            let status = ProductStatus::from(code);
            assert!(!matches!(status, ProductStatus::Unknown(_)));
            assert_eq!(u8::from(status), code);
        }
        assert_eq!(ProductStatus::from(9), ProductStatus::Unknown(9));
        assert_eq!(ProductStatus::from(9).label(), "Unknown");
        assert_eq!(ProductStatus::CodeSent.to_string(), "Code Sent");
        assert!(ProductStatus::Refunded.is_final());
        assert!(!ProductStatus::Paid.is_final());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(0, 8), "0");
        assert_eq!(format_units(100_000_000, 8), "1");
        assert_eq!(format_units(1_250_000_000, 8), "12.5");
        assert_eq!(format_units(1, 8), "0.00000001");
        assert_eq!(format_units(1_500_000_000_000_000_000, 18), "1.5");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("12.5", 8).unwrap(), 1_250_000_000);
        assert_eq!(parse_units("1", 18).unwrap(), 10u128.pow(18));
        assert_eq!(parse_units(".5", 8).unwrap(), 50_000_000);
        assert!(parse_units("", 8).is_err());
        assert!(parse_units("1.123456789", 8).is_err());
        assert!(parse_units("-1", 8).is_err());
        assert!(parse_units("1e5", 8).is_err());
    }

    #[test]
    fn test_decimals_by_currency() {
        assert_eq!(decimals_for(ZERO_ADDRESS), HBAR_DECIMALS);
        assert_eq!(
            decimals_for("0x00000000000000000000000000000000004d2b1c"),
            TOKEN_DECIMALS
        );
    }

    #[test]
    fn test_listing_document_json_shape() {
        let json = r#"{
            "name": "Game key",
            "description": "Steam key",
            "tokenId": "0.0.0",
            "price": "12.5",
            "encryptedPayload": "AAAAAAAAAAAAAAAA:AAAAAAAAAAAAAAAAAAAAAA==",
            "encryptedKey": "AAAA",
            "publicKey": "AAAA",
            "seller": "0.0.1234",
            "createdAt": "2025-08-03T10:00:00.000Z"
        }"#;
        let doc: ListingDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.token_id, "0.0.0");
        assert!(doc.created_at.is_some());

        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("encryptedPayload").is_some());
        assert!(value.get("tokenId").is_some());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_listing_document_accessors() {
        let key = ContentKey::generate();
        let seller = SecretKey::generate().public();
        let doc = ListingDocument {
            name: "n".into(),
            description: String::new(),
            token_id: "0.0.0".into(),
            price: "1".into(),
            encrypted_payload: key.encrypt("p").unwrap().to_string(),
            encrypted_key: WrappedKey::wrap(&key, &seller).unwrap().to_base64(),
            public_key: seller.to_base64(),
            seller: String::new(),
            created_at: None,
        };
        assert!(doc.encrypted_payload().is_ok());
        assert!(doc.wrapped_key().is_ok());
        assert_eq!(doc.public_key().unwrap(), seller);

        let broken = ListingDocument {
            encrypted_key: "nope".into(),
            ..doc
        };
        assert_eq!(broken.wrapped_key().unwrap_err().kind(), "decryption_failure");
    }

    #[test]
    fn test_record_missing_keys() {
        let record = ProductRecord {
            seller: "0xabc".into(),
            price: 100_000_000,
            currency: ZERO_ADDRESS.into(),
            status: ProductStatus::Initial,
            file_id: Seed::new("abc123").unwrap(),
            buyer: String::new(),
            seller_pub_key: SecretKey::generate().public().to_hex(),
            buyer_pub_key: "0x".into(),
            encrypted_sym_key: String::new(),
            send_code_window: 0,
            confirm_window: 0,
            paid_at: 0,
            code_sent_at: 0,
        };
        assert!(record.seller_public_key().is_ok());
        assert!(record.buyer_public_key().is_err());
        assert!(record.wrapped_key().is_err());
        assert!(record.is_hbar());
        assert_eq!(record.formatted_price(), "1");
    }
}

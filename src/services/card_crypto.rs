//! AES-CBC/PKCS7 encryption of card fields for the partner charge endpoint.
//!
//! One random IV is drawn per card and shared by every field of that card;
//! the receiver decrypts each field with the transmitted IV and the shared
//! base64 key. Ciphertexts and IV are standard base64.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::models::PaymentInformation;

const IV_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CardCryptoError {
    #[error("encryption key is not valid base64: {0}")]
    InvalidKey(#[from] base64::DecodeError),

    #[error("encryption key must be 16, 24 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("IV must be 16 bytes")]
    InvalidIv,

    #[error("card expiry {0:?} is not MM/YY or MM/YYYY")]
    InvalidExpiry(String),

    #[error("ciphertext could not be decrypted")]
    Decrypt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedCard {
    pub iv: String,
    pub card_number: String,
    pub card_holder_name: String,
    pub cvv: String,
    pub expiry_date: String,
}

pub fn encrypt_card_details(
    card: &PaymentInformation,
    key_b64: &str,
) -> Result<EncryptedCard, CardCryptoError> {
    let key = decode_key(key_b64)?;
    let expiry = format_expiry(&card.expirydate)?;
    let iv: [u8; IV_LEN] = rand::random();

    Ok(EncryptedCard {
        iv: STANDARD.encode(iv),
        card_number: encrypt_field(&key, &iv, &card.cardnumber)?,
        card_holder_name: encrypt_field(&key, &iv, &card.cardholdername)?,
        cvv: encrypt_field(&key, &iv, &card.cvv)?,
        expiry_date: encrypt_field(&key, &iv, &expiry)?,
    })
}

/// `MM/YYYY` or `MM/YY` to the gateway's `MMYY`.
pub fn format_expiry(expiry: &str) -> Result<String, CardCryptoError> {
    let invalid = || CardCryptoError::InvalidExpiry(expiry.to_string());

    let (month, year) = expiry.trim().split_once('/').ok_or_else(invalid)?;
    let (month, year) = (month.trim(), year.trim());

    let month_num: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month_num)
        || !(year.len() == 2 || year.len() == 4)
        || !year.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    Ok(format!("{month_num:02}{}", &year[year.len() - 2..]))
}

pub fn encrypt_field(key: &[u8], iv: &[u8], plaintext: &str) -> Result<String, CardCryptoError> {
    if iv.len() != IV_LEN {
        return Err(CardCryptoError::InvalidIv);
    }
    let data = plaintext.as_bytes();
    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
            .map_err(|_| CardCryptoError::InvalidKeyLength(key.len()))?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(key, iv)
            .map_err(|_| CardCryptoError::InvalidKeyLength(key.len()))?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
            .map_err(|_| CardCryptoError::InvalidKeyLength(key.len()))?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        n => return Err(CardCryptoError::InvalidKeyLength(n)),
    };
    Ok(STANDARD.encode(ciphertext))
}

/// Reverses [`encrypt_field`] given the transmitted IV.
pub fn decrypt_field(
    ciphertext_b64: &str,
    iv_b64: &str,
    key_b64: &str,
) -> Result<String, CardCryptoError> {
    let key = decode_key(key_b64)?;
    let iv = STANDARD.decode(iv_b64).map_err(|_| CardCryptoError::InvalidIv)?;
    if iv.len() != IV_LEN {
        return Err(CardCryptoError::InvalidIv);
    }
    let ciphertext = STANDARD
        .decode(ciphertext_b64)
        .map_err(|_| CardCryptoError::Decrypt)?;

    let plaintext = match key.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(&key, &iv)
            .map_err(|_| CardCryptoError::InvalidKeyLength(key.len()))?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
        24 => cbc::Decryptor::<aes::Aes192>::new_from_slices(&key, &iv)
            .map_err(|_| CardCryptoError::InvalidKeyLength(key.len()))?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
        32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(&key, &iv)
            .map_err(|_| CardCryptoError::InvalidKeyLength(key.len()))?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
        n => return Err(CardCryptoError::InvalidKeyLength(n)),
    }
    .map_err(|_| CardCryptoError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CardCryptoError::Decrypt)
}

fn decode_key(key_b64: &str) -> Result<Vec<u8>, CardCryptoError> {
    let key = STANDARD.decode(key_b64.trim())?;
    match key.len() {
        16 | 24 | 32 => Ok(key),
        n => Err(CardCryptoError::InvalidKeyLength(n)),
    }
}
